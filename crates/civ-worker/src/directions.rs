//! Loading the directions file.
//!
//! The file is a JSON array of [`Direction`] records. A file that cannot be
//! read, does not parse, or contains an unusable direction is a fatal
//! startup error.

use std::path::Path;

use civ_types::Direction;

use crate::error::DirectionsError;

/// Read and validate the directions file at `path`.
pub fn load_directions(path: &Path) -> Result<Vec<Direction>, DirectionsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DirectionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_directions(&contents)
}

/// Parse and validate directions from a JSON string.
pub fn parse_directions(json: &str) -> Result<Vec<Direction>, DirectionsError> {
    let directions: Vec<Direction> = serde_json::from_str(json)?;
    for (index, direction) in directions.iter().enumerate() {
        validate(index, direction)?;
    }
    Ok(directions)
}

fn validate(index: usize, direction: &Direction) -> Result<(), DirectionsError> {
    let invalid = |reason: String| DirectionsError::Invalid { index, reason };

    if direction.product.trim().is_empty() {
        return Err(invalid(String::from("product name is empty")));
    }
    if direction.amount == 0 {
        return Err(invalid(format!("{} is produced in amounts of zero", direction.product)));
    }
    for input in &direction.inputs {
        if input.product.trim().is_empty() {
            return Err(invalid(format!(
                "an input of {} has an empty product name",
                direction.product
            )));
        }
        if input.store.trim().is_empty() {
            return Err(invalid(format!(
                "input {} of {} has no store address",
                input.product, direction.product
            )));
        }
        if input.amount == 0 {
            return Err(invalid(format!(
                "input {} of {} requires an amount of zero",
                input.product, direction.product
            )));
        }
    }
    Ok(())
}

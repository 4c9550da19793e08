//! Text rendering of a [`DiffState`].
//!
//! A frame clears the terminal and lists each worker followed by its
//! products, both sorted. A cell is the quantity right-aligned in three
//! columns; a product that changed less than one fade window ago also
//! gets an arrow and the signed delta in 24-bit color. The color starts
//! at full green (up) or red (down) and each channel falls linearly to
//! zero across the window. Once the window has elapsed the cell is the
//! plain quantity again.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::diff::DiffState;

/// ANSI sequence that homes the cursor and clears the screen.
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

const RISING: (u8, u8, u8) = (0, 255, 0);
const FALLING: (u8, u8, u8) = (255, 0, 0);

/// Scale each channel of `base` by `1 - age / fade`, clamped to `[0, 1]`.
///
/// Channels are truncated toward zero. A zero `fade` window yields black.
pub fn fade_color(base: (u8, u8, u8), age: Duration, fade: Duration) -> (u8, u8, u8) {
    let remaining = fade.saturating_sub(age).as_nanos();
    let window = fade.as_nanos();
    let scale = |channel: u8| -> u8 {
        u128::from(channel)
            .checked_mul(remaining)
            .and_then(|scaled| scaled.checked_div(window))
            .and_then(|value| u8::try_from(value).ok())
            .unwrap_or(0)
    };
    (scale(base.0), scale(base.1), scale(base.2))
}

/// Render one quantity cell.
///
/// `age` is the time since the last change, `None` if there never was one.
pub fn render_cell(amount: i64, delta: i64, age: Option<Duration>, fade: Duration) -> String {
    let number = format!("{amount:3}");
    let Some(age) = age.filter(|age| *age < fade) else {
        return format!("{number}   ");
    };
    if delta == 0 {
        return format!("{number}   ");
    }

    let (symbol, base) = if delta > 0 {
        ("↑", RISING)
    } else {
        ("↓", FALLING)
    };
    let (r, g, b) = fade_color(base, age, fade);
    let arrow = format!("{symbol}{delta:+}");
    format!("{number} {}", arrow.truecolor(r, g, b))
}

/// Render a full frame as of `now`.
pub fn render_frame(state: &DiffState, now: Instant, fade: Duration) -> String {
    let mut frame = String::from(CLEAR_SCREEN);
    for (worker, products) in state.workers() {
        let _ = writeln!(frame, "{worker}");
        for (product, diff) in products {
            let cell = render_cell(diff.current, diff.last_delta, diff.age(now), fade);
            let _ = writeln!(frame, "  {product:<20} {cell}");
        }
        frame.push('\n');
    }
    frame
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use civ_types::StateSnapshot;

    use super::*;

    const FADE: Duration = Duration::from_secs(5);

    fn wood(amount: &str) -> StateSnapshot {
        let mut snapshot = StateSnapshot {
            name: String::from("lumberjack-0"),
            ..StateSnapshot::default()
        };
        snapshot
            .annotations
            .insert(String::from("wood"), amount.to_owned());
        snapshot
    }

    fn wood_line(frame: &str) -> &str {
        frame.lines().find(|line| line.contains("wood")).unwrap()
    }

    #[test]
    fn fade_is_linear_per_channel() {
        assert_eq!(fade_color(RISING, Duration::ZERO, FADE), (0, 255, 0));
        assert_eq!(fade_color(RISING, Duration::from_secs(1), FADE), (0, 204, 0));
        assert_eq!(
            fade_color(FALLING, Duration::from_millis(2500), FADE),
            (127, 0, 0)
        );
        assert_eq!(fade_color(RISING, FADE, FADE), (0, 0, 0));
        assert_eq!(fade_color(RISING, Duration::from_secs(60), FADE), (0, 0, 0));
        assert_eq!(fade_color(RISING, Duration::ZERO, Duration::ZERO), (0, 0, 0));
    }

    #[test]
    fn cell_without_recent_change_is_plain() {
        assert_eq!(render_cell(12, 2, None, FADE), " 12   ");
        assert_eq!(render_cell(12, 2, Some(FADE), FADE), " 12   ");
        assert_eq!(render_cell(7, 0, Some(Duration::ZERO), FADE), "  7   ");
    }

    #[test]
    fn cell_shows_signed_delta_arrow() {
        let up = render_cell(12, 2, Some(Duration::ZERO), FADE);
        assert!(up.starts_with(" 12 "));
        assert!(up.contains("↑+2"));

        let down = render_cell(9, -3, Some(Duration::from_secs(1)), FADE);
        assert!(down.starts_with("  9 "));
        assert!(down.contains("↓-3"));
    }

    #[test]
    fn rising_change_fades_then_reverts() {
        let t0 = Instant::now();
        let at = |secs| t0 + Duration::from_secs(secs);
        let mut state = DiffState::new();

        state.record(&wood("10"), at(0));
        state.record(&wood("12"), at(1));
        let frame = render_frame(&state, at(1), FADE);
        assert!(wood_line(&frame).contains("↑+2"));

        state.record(&wood("12"), at(2));
        let frame = render_frame(&state, at(2), FADE);
        assert!(wood_line(&frame).contains("↑+2"));
        let diff = state.get("lumberjack-0", "wood").unwrap();
        assert_eq!(fade_color(RISING, diff.age(at(2)).unwrap(), FADE), (0, 204, 0));

        state.record(&wood("12"), at(6));
        let frame = render_frame(&state, at(6), FADE);
        let line = wood_line(&frame);
        assert!(line.contains("12"));
        assert!(!line.contains('↑'));
        assert!(!line.contains("+2"));
    }

    #[test]
    fn frame_is_sorted_and_starts_with_clear() {
        let now = Instant::now();
        let mut state = DiffState::new();
        let mut quarry = StateSnapshot {
            name: String::from("quarry-0"),
            ..StateSnapshot::default()
        };
        quarry.annotations.insert(String::from("stone"), String::from("3"));
        quarry.annotations.insert(String::from("gravel"), String::from("1"));
        state.record(&quarry, now);
        state.record(&wood("4"), now);

        let frame = render_frame(&state, now + FADE, FADE);
        assert!(frame.starts_with(CLEAR_SCREEN));
        let body: Vec<&str> = frame
            .trim_start_matches(CLEAR_SCREEN)
            .lines()
            .filter(|line| !line.is_empty())
            .collect();
        assert_eq!(
            body,
            vec![
                "lumberjack-0",
                "  wood                   4   ",
                "quarry-0",
                "  gravel                 1   ",
                "  stone                  3   ",
            ]
        );
    }

    #[test]
    fn empty_state_renders_only_clear() {
        let frame = render_frame(&DiffState::new(), Instant::now(), FADE);
        assert_eq!(frame, CLEAR_SCREEN);
    }
}

//! Live diff view over a kingdom's worker inventories.
//!
//! Two tasks share one [`DiffState`]:
//!
//! - the **consumer** reads snapshots from a directory watch stream and is
//!   the only writer, recording each quantity change with its delta and
//!   the instant it was seen
//! - the **renderer** redraws the whole view on a fixed tick, highlighting
//!   recent changes with an arrow whose color fades out over the fade
//!   window
//!
//! Both stop when the shared cancellation token fires. The consumer also
//! stops when the stream ends.

pub mod diff;
pub mod render;
pub mod watcher;

pub use diff::{DiffState, ProductDiff};
pub use render::{fade_color, render_cell, render_frame};
pub use watcher::{WatchConfig, WatchError, run_consumer, run_renderer, watch};

//! Small text helpers shared by the feed renderer and the backend adapter.

mod text;

pub use text::{strip_control_chars, tail_lines};

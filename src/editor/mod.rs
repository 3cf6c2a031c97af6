//! Message editing: buffer layout, editor launch and the edit workflow.

pub mod buffer;
pub mod launcher;
pub mod session;

pub use buffer::{SCISSORS_LINE, parse_buffer, render_buffer, split_warnings};
pub use launcher::{EditorLauncher, GitEditor};
pub use session::{AbortReason, DraftedMessage, EditorOutcome, PresentedBuffer};

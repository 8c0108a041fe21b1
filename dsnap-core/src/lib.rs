//! Foundation crate for dsnap: the shared error type, the external command
//! runner used by cloud providers, and the user-facing output macros.

pub mod command;
pub mod error;
pub mod output_macros;

pub use command::{is_tool_installed, render_command, run_capture, CommandOutput};
pub use error::{Result, SnapError};

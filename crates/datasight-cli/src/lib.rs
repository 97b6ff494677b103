// Library interface for datasight-cli, shared by the binary and the
// integration tests.

pub mod app;
pub mod commands;
pub mod render;

// Re-export commonly used items for easier testing
pub use commands::{handle_command, CommandResult};
pub use render::render_event;

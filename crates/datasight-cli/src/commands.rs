use datasight_core::session::ChartKind;

/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Quit the application.
    Quit,
    /// Ingest these paths and start an analysis.
    Upload(Vec<String>),
    /// Clear the conversation, keeping the dataset memory.
    Restart,
    /// Recompute next-step suggestions.
    Suggestions,
    /// Commentary for one chart of the latest visualization.
    Explain(ChartKind),
    /// Treat the text as a raw speech transcript.
    Voice(String),
    /// Show provider, conversation and token usage.
    ShowStatus,
    /// Not a command - treat as regular input.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/restart" | "/new" => CommandResult::Restart,
        "/upload" | "/u" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /upload <path> [path...]".into())
            } else {
                CommandResult::Upload(arg.split_whitespace().map(str::to_string).collect())
            }
        }
        "/suggestions" | "/s" => CommandResult::Suggestions,
        "/explain" => match ChartKind::parse(arg) {
            Some(kind) => CommandResult::Explain(kind),
            None => CommandResult::Message("Usage: /explain <pie|line|bar>".into()),
        },
        "/voice" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /voice <transcript>".into())
            } else {
                CommandResult::Voice(arg.to_string())
            }
        }
        "/status" => CommandResult::ShowStatus,
        "/version" => CommandResult::Message(format!("DataSight CLI v{}", env!("CARGO_PKG_VERSION"))),

        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn show_help() -> CommandResult {
    let help_text = "\
DataSight commands

  ANALYSIS
    /upload <paths...>, /u    Upload files and analyze them
    /explain <pie|line|bar>   Detailed commentary for a chart
    /suggestions, /s          Refresh next-step suggestions

  CONVERSATION
    /voice <transcript>       Send a spoken question (filler words removed)
    /restart, /new            Clear the chat (dataset memory is kept)
    /status                   Show provider, history and token usage

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Quit

Anything else is sent as a question about your data.";

    CommandResult::Message(help_text.into())
}

use clap::{Parser, Subcommand};

/// Marketing automation rule engine.
///
/// Serves the batch endpoint over HTTP, or runs a single pass and exits.
#[derive(Parser, Debug)]
#[command(name = "adpilot-server", about = "Marketing automation rule engine")]
pub struct Cli {
    /// Configuration profile; prefixes every env var (e.g. PROD_PG_HOST)
    #[arg(long, env = "ADPILOT_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server and, when AUTOMATION_CRON is set, the scheduler
    Serve,
    /// Process every active rule once and print the summary as JSON
    RunOnce,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "announcement-server")]
#[command(about = "Plays whitelisted announcement audio on request")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    // Run the HTTP server (default when no subcommand is given)
    Serve(ServeArgs),
    // Generate an API token, store its hash and print it once
    IssueToken(IssueTokenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Directory holding the announcement files
    #[arg(long, default_value = "audio")]
    pub audio_dir: PathBuf,

    // JSON file with hashed API tokens
    #[arg(long, default_value = "auth_tokens.json")]
    pub token_file: PathBuf,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 30)]
    pub rate_limit: usize,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Largest accepted request body in bytes
    #[arg(long, default_value_t = 1024)]
    pub max_body: usize,

    // Per-player timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub playback_timeout: u64,

    // Reject /play requests without a valid API token
    #[arg(long)]
    pub require_auth: bool,

    // Expose prometheus metrics at /metrics
    #[arg(long)]
    pub metrics: bool,

    // How often idle rate-limit windows are dropped, in seconds
    #[arg(long, default_value_t = 300)]
    pub eviction_interval: u64,
}

#[derive(Args, Debug, Clone)]
pub struct IssueTokenArgs {
    // Name the token is stored under
    #[arg(short, long, default_value = "default")]
    pub name: String,

    // JSON file with hashed API tokens
    #[arg(long, default_value = "auth_tokens.json")]
    pub token_file: PathBuf,
}

impl Cli {
    // Subcommand to run, falling back to `serve` with the top-level flags
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_appliance_settings() {
        let cli = Cli::parse_from(["announcement-server"]);
        match cli.into_command() {
            Command::Serve(args) => {
                assert_eq!(args.port, 8080);
                assert_eq!(args.rate_limit, 30);
                assert_eq!(args.rate_window, 60);
                assert_eq!(args.max_body, 1024);
                assert_eq!(args.playback_timeout, 30);
                assert!(!args.require_auth);
                assert!(!args.metrics);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn issue_token_subcommand_parses_name() {
        let cli = Cli::parse_from(["announcement-server", "issue-token", "--name", "kiosk"]);
        match cli.into_command() {
            Command::IssueToken(args) => {
                assert_eq!(args.name, "kiosk");
                assert_eq!(args.token_file, PathBuf::from("auth_tokens.json"));
            }
            other => panic!("expected issue-token, got {other:?}"),
        }
    }

    #[test]
    fn flags_before_a_subcommand_are_rejected() {
        let parsed = Cli::try_parse_from(["announcement-server", "--require-auth", "serve"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["announcement-server", "--port", "9000", "issue-token"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn top_level_flags_still_work_without_subcommand() {
        let cli = Cli::parse_from(["announcement-server", "--require-auth", "--port", "9000"]);
        match cli.into_command() {
            Command::Serve(args) => {
                assert!(args.require_auth);
                assert_eq!(args.port, 9000);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn serve_subcommand_accepts_flags() {
        let cli = Cli::parse_from(["announcement-server", "serve", "--port", "9000", "--require-auth"]);
        match cli.into_command() {
            Command::Serve(args) => {
                assert_eq!(args.port, 9000);
                assert!(args.require_auth);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }
}

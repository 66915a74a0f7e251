use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Audio playback timeout")]
    Timeout,
    #[error("Error playing audio: {0}")]
    Exhausted(String),
}

// One way of playing a file: program plus the args that go before the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

// Result of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    Failed(String),
}

// omxplayer on the Pi's local output, then mpg123, then aplay for wav files
pub fn default_candidates() -> Vec<PlayerCommand> {
    vec![
        PlayerCommand::new("omxplayer", &["-o", "local"]),
        PlayerCommand::new("mpg123", &[]),
        PlayerCommand::new("aplay", &[]),
    ]
}

// Tries each candidate in order until one exits cleanly.
//
// A missing program or a non-zero exit moves on to the next candidate.
// A timeout ends the whole attempt.
#[derive(Debug, Clone)]
pub struct Player {
    candidates: Vec<PlayerCommand>,
    timeout: Duration,
}

impl Player {
    pub fn new(candidates: Vec<PlayerCommand>, timeout: Duration) -> Self {
        Self { candidates, timeout }
    }

    pub fn with_defaults(timeout: Duration) -> Self {
        Self::new(default_candidates(), timeout)
    }

    pub async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let mut last_cause = String::from("no player configured");

        for candidate in &self.candidates {
            match self.attempt(candidate, path).await? {
                Outcome::Success => {
                    tracing::debug!(player = %candidate.program, "playback finished");
                    return Ok(());
                }
                Outcome::NotFound => {
                    tracing::debug!(player = %candidate.program, "player not installed");
                    last_cause = format!("{} not found", candidate.program);
                }
                Outcome::Failed(cause) => {
                    tracing::warn!(player = %candidate.program, "player failed: {}", cause);
                    last_cause = cause;
                }
            }
        }

        Err(PlaybackError::Exhausted(last_cause))
    }

    async fn attempt(&self, candidate: &PlayerCommand, path: &Path) -> Result<Outcome, PlaybackError> {
        let child = Command::new(&candidate.program)
            .args(&candidate.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Outcome::NotFound),
            Err(e) => return Ok(Outcome::Failed(format!("{}: {}", candidate.program, e))),
        };

        // dropping the future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output,
            Err(_) => {
                tracing::error!(player = %candidate.program, timeout = ?self.timeout, "player timed out");
                return Err(PlaybackError::Timeout);
            }
        };

        match output {
            Ok(out) if out.status.success() => Ok(Outcome::Success),
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    Ok(Outcome::Failed(format!("{} exited with {}", candidate.program, out.status)))
                } else {
                    Ok(Outcome::Failed(format!(
                        "{} exited with {}: {}",
                        candidate.program, out.status, stderr
                    )))
                }
            }
            Err(e) => Ok(Outcome::Failed(format!("{}: {}", candidate.program, e))),
        }
    }
}

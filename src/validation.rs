use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Announcements the server is willing to play
pub const DEFAULT_ALLOWED_AUDIO: [&str; 3] = [
    "dog-arrived.mp3",
    "owner-arrived-to-collect.mp3",
    "assistance-required.mp3",
];

lazy_static! {
    // letters, digits, dots and hyphens only - no separators, no shell metacharacters
    static ref SAFE_NAME: Regex = Regex::new(r"^[A-Za-z0-9.-]+$").unwrap();
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No audio file specified")]
    Empty,
    #[error("Invalid audio file name")]
    InvalidName,
    #[error("Audio file not allowed: {0}")]
    NotAllowed(String),
}

// Checks requested names against the whitelist and maps them into the audio dir
#[derive(Debug, Clone)]
pub struct RequestValidator {
    audio_dir: PathBuf,
    allowed: HashSet<String>,
}

impl RequestValidator {
    pub fn new<I, S>(audio_dir: impl Into<PathBuf>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            audio_dir: audio_dir.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_defaults(audio_dir: impl Into<PathBuf>) -> Self {
        Self::new(audio_dir, DEFAULT_ALLOWED_AUDIO)
    }

    // Emptiness, then pattern, then whitelist. The returned path may not exist;
    // callers check that separately.
    pub fn validate(&self, name: &str) -> Result<PathBuf, ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::Empty);
        }
        if !SAFE_NAME.is_match(name) {
            return Err(ValidationError::InvalidName);
        }
        if !self.allowed.contains(name) {
            return Err(ValidationError::NotAllowed(name.to_string()));
        }

        // the pattern already excludes separators; keep only the last component anyway
        let file_name = Path::new(name)
            .file_name()
            .ok_or(ValidationError::InvalidName)?;

        Ok(self.audio_dir.join(file_name))
    }

    // Create the audio directory and drop a README listing the expected files.
    // An existing README is left alone.
    pub fn prepare_audio_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.audio_dir)?;

        let readme = self.audio_dir.join("README.txt");
        if !readme.exists() {
            let mut names: Vec<&str> = self.allowed.iter().map(String::as_str).collect();
            names.sort_unstable();

            let mut text = String::from("Place announcement audio files here:\n");
            for name in names {
                text.push_str(&format!("- {}\n", name));
            }
            text.push_str("\nFiles are played by name via POST /play {\"audio\": \"<file>\"}\n");
            std::fs::write(&readme, text)?;
        }

        tracing::info!("Audio directory: {}", self.audio_dir.display());
        Ok(())
    }
}

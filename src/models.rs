use serde::{Deserialize, Serialize};

// POST /play body
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct PlayRequest {
    // null and missing both count as "no file"
    #[serde(default)]
    pub audio: Option<String>,
}

// POST /play success body
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PlayResponse {
    pub message: String,
}

impl PlayResponse {
    pub fn playing(name: &str) -> Self {
        Self {
            message: format!("Playing {}", name),
        }
    }
}

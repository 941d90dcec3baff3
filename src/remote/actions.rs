//! Immediate (not debounced) server actions: recorder transport, presets, notes

use super::{SynthClient, TransportError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

const RECORDER_PATH: &str = "/api/recorder";
const PRESETS_PATH: &str = "/api/presets";
const PUSH_PATH: &str = "/api/input/push";
const RELEASE_PATH: &str = "/api/input/release";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderAction {
    Record,
    Stop,
    Clear,
}

impl RecorderAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RecorderAction::Record => "record",
            RecorderAction::Stop => "stop",
            RecorderAction::Clear => "clear",
        }
    }
}

impl fmt::Display for RecorderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecorderAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(RecorderAction::Record),
            "stop" => Ok(RecorderAction::Stop),
            "clear" => Ok(RecorderAction::Clear),
            other => Err(format!("unknown recorder action '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresetSummary {
    pub name: String,
}

/// `{"status": "ok"|"failed", ...}` envelope of preset responses
#[derive(Debug, Deserialize)]
struct PresetReply {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    presets: Vec<PresetSummary>,
    #[serde(default)]
    updated: bool,
}

impl SynthClient {
    /// Start/stop recording or clear `track`
    pub async fn recorder_action(&self, action: RecorderAction, track: i64) -> Result<(), TransportError> {
        info!("Recorder {} on track {}", action, track);
        self.post_json(RECORDER_PATH, &json!({"action": action.as_str(), "track": track}))
            .await
            .map(|_| ())
    }

    pub async fn list_presets(&self) -> Result<Vec<PresetSummary>, TransportError> {
        let reply = self.preset_request(json!({"method": "list"})).await?;
        Ok(reply.presets)
    }

    /// Store the server's current configuration; true if an existing preset was overwritten
    pub async fn save_preset(&self, name: &str) -> Result<bool, TransportError> {
        let reply = self.preset_request(json!({"method": "save", "name": name})).await?;
        info!("Saved preset '{}'", name);
        Ok(reply.updated)
    }

    /// Apply a stored preset on the server; groups must be refreshed afterwards
    pub async fn load_preset(&self, name: &str) -> Result<(), TransportError> {
        self.preset_request(json!({"method": "load", "preset": name})).await?;
        info!("Loaded preset '{}'", name);
        Ok(())
    }

    async fn preset_request(&self, body: Value) -> Result<PresetReply, TransportError> {
        let url = format!("{}{}", self.base_url(), PRESETS_PATH);
        let text = self.post_json(PRESETS_PATH, &body).await?;
        let reply: PresetReply = serde_json::from_str(&text).map_err(|e| TransportError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if reply.status != "ok" {
            return Err(TransportError::Rejected {
                url,
                message: reply.message.unwrap_or(reply.status),
            });
        }
        Ok(reply)
    }

    /// Note on, e.g. `C4`
    pub async fn push_note(&self, note: &str) -> Result<(), TransportError> {
        debug!("Note on {}", note);
        self.post_json(PUSH_PATH, &json!({"key": note})).await.map(|_| ())
    }

    pub async fn release_note(&self, note: &str) -> Result<(), TransportError> {
        debug!("Note off {}", note);
        self.post_json(RELEASE_PATH, &json!({"key": note})).await.map(|_| ())
    }
}

//! Configuration management for the synth surface
//!
//! Loads and validates the YAML configuration file. Every field has a
//! default, so an empty file (or no file at all) is a valid configuration.

use crate::knob::{GestureMode, DEFAULT_SENSITIVITY_PX};
use crate::sync::DEFAULT_DEBOUNCE_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub surface: SurfaceConfig,
}

/// Synth server connection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the synth's HTTP API
    pub url: String,
    pub request_timeout_ms: u64,
}

/// Reconciliation timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period after the last edit before a write fires
    pub debounce_ms: u64,
    /// Recorder state refresh period
    pub poll_interval_ms: u64,
}

/// Knob widgets and panel layout
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub knob_size: f64,
    /// Drag distance covering a knob's full range
    pub sensitivity_px: f64,
    pub gesture_mode: GestureKind,
    /// Oscillators shown (the server's array may be longer)
    pub oscillators: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    Vertical,
    Angular,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_ms: 2000,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: 2000,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            knob_size: 80.0,
            sensitivity_px: DEFAULT_SENSITIVITY_PX,
            gesture_mode: GestureKind::Vertical,
            oscillators: 4,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl SurfaceConfig {
    /// Gesture mode for a knob `size` pixels wide
    pub fn gesture_mode(&self, size: f64) -> GestureMode {
        match self.gesture_mode {
            GestureKind::Vertical => GestureMode::vertical(self.sensitivity_px),
            GestureKind::Angular => GestureMode::Angular {
                center: crate::knob::Point::new(size / 2.0, size / 2.0),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path))?
        };

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let url = self.server.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("server.url must be an http(s) URL, got '{}'", self.server.url);
        }
        if self.server.request_timeout_ms == 0 {
            anyhow::bail!("server.request_timeout_ms must be positive");
        }

        if self.sync.poll_interval_ms < 100 {
            anyhow::bail!(
                "sync.poll_interval_ms {} is too short (minimum 100)",
                self.sync.poll_interval_ms
            );
        }

        if !self.surface.knob_size.is_finite() || self.surface.knob_size < 20.0 {
            anyhow::bail!("surface.knob_size must be at least 20 pixels");
        }
        if !self.surface.sensitivity_px.is_finite() || self.surface.sensitivity_px < 1.0 {
            anyhow::bail!("surface.sensitivity_px must be at least 1 pixel");
        }
        if !(1..=16).contains(&self.surface.oscillators) {
            anyhow::bail!(
                "surface.oscillators must be between 1 and 16, got {}",
                self.surface.oscillators
            );
        }

        Ok(())
    }
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

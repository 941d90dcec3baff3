//! Loopback simulator of the synth server's HTTP API
//!
//! Serves the same endpoints as the audio engine, backed by in-memory state,
//! so the surface can run without it (`--simulate`). Default port: 8080

use crate::groups::{EffectsConfig, Oscillator, Waveform, WireFormat};
use crate::keyboard::ALL_NOTES;
use crate::sync::ParameterGroup;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default simulator port, same as the synth server
pub const DEFAULT_SIM_PORT: u16 = 8080;

const SAMPLE_RATE: u32 = 44100;

/// Recorder transport as the server reports it
#[derive(Debug, Clone, Serialize)]
pub struct RecorderState {
    pub track: i64,
    pub bpm: i64,
    /// `"on"` / `"off"`
    pub metronome: String,
    pub recording: bool,
}

/// A saved preset
#[derive(Debug, Clone, Serialize)]
pub struct StoredPreset {
    pub name: String,
    pub datetime: String,
    pub configuration: Value,
}

/// Shared state for simulator handlers
pub struct SimState {
    config: RwLock<Value>,
    oscillators: RwLock<Vec<Value>>,
    recorder: RwLock<RecorderState>,
    presets: RwLock<Vec<StoredPreset>>,
    held_notes: RwLock<BTreeSet<String>>,
}

impl SimState {
    /// Default synth with `oscillators` oscillators
    pub fn new(oscillators: usize) -> Self {
        let effects = EffectsConfig::default();
        let mut config = effects.encode_patch(EffectsConfig::fields());
        deep_merge(&mut config, &json!({"echo": {"sampleRate": SAMPLE_RATE}}));

        let oscillators = (0..oscillators)
            .map(|index| {
                let mut body = Oscillator::new(index).encode_patch(Oscillator::fields());
                if let Value::Object(map) = &mut body {
                    map.remove("id");
                }
                body
            })
            .collect();

        Self {
            config: RwLock::new(config),
            oscillators: RwLock::new(oscillators),
            recorder: RwLock::new(RecorderState {
                track: 1,
                bpm: 120,
                metronome: "off".to_string(),
                recording: false,
            }),
            presets: RwLock::new(Vec::new()),
            held_notes: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn config(&self) -> Value {
        self.config.read().clone()
    }

    pub fn oscillators(&self) -> Vec<Value> {
        self.oscillators.read().clone()
    }

    pub fn recorder(&self) -> RecorderState {
        self.recorder.read().clone()
    }

    pub fn held_notes(&self) -> Vec<String> {
        self.held_notes.read().iter().cloned().collect()
    }

    /// Everything a preset captures
    fn configuration(&self) -> Value {
        json!({
            "config": self.config(),
            "oscillators": self.oscillators(),
        })
    }

    fn apply_configuration(&self, configuration: &Value) -> bool {
        let (Some(config), Some(Value::Array(oscillators))) =
            (configuration.get("config"), configuration.get("oscillators"))
        else {
            return false;
        };
        *self.config.write() = config.clone();
        *self.oscillators.write() = oscillators.clone();
        true
    }
}

/// Recursively merge `patch` into `target`; non-object values replace
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                deep_merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    fn not_found(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Build the simulator router
pub fn build_router(state: Arc<SimState>) -> Router {
    Router::new()
        .route("/api/config", get(get_config).post(post_config))
        .route("/api/oscillators", get(get_oscillators).post(post_oscillator))
        .route("/api/recorder", get(get_recorder).post(post_recorder))
        .route("/api/presets", post(post_presets))
        .route("/api/input/push", post(push_note))
        .route("/api/input/release", post(release_note))
        .route("/api/health", get(health_check))
        .with_state(state)
}

/// GET /api/config - Global effects configuration
async fn get_config(State(state): State<Arc<SimState>>) -> Json<Value> {
    Json(state.config())
}

/// POST /api/config - Merge the provided leaves
async fn post_config(
    State(state): State<Arc<SimState>>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    if !body.is_object() {
        return Err(ApiError::bad_request("expected a JSON object"));
    }
    debug!("Config update: {}", body);
    deep_merge(&mut state.config.write(), &body);
    Ok(StatusCode::OK)
}

/// GET /api/oscillators - All oscillators, in index order
async fn get_oscillators(State(state): State<Arc<SimState>>) -> Json<Vec<Value>> {
    Json(state.oscillators())
}

/// POST /api/oscillators - Update the oscillator named by `id`
async fn post_oscillator(
    State(state): State<Arc<SimState>>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let id = body
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::bad_request("Missing 'id'"))? as usize;

    if let Some(sound) = body.get("sound") {
        let valid = sound.as_str().map(|s| s.parse::<Waveform>().is_ok()).unwrap_or(false);
        if !valid {
            return Err(ApiError::bad_request(format!("Unknown sound {}", sound)));
        }
    }

    let mut oscillators = state.oscillators.write();
    let osc = oscillators
        .get_mut(id)
        .ok_or_else(|| ApiError::not_found("Invalid ID"))?;

    let mut patch = Map::new();
    for key in ["volume", "sound", "octave", "detune"] {
        if let Some(value) = body.get(key) {
            patch.insert(key.to_string(), value.clone());
        }
    }
    debug!("Oscillator {} update: {:?}", id, patch);
    deep_merge(osc, &Value::Object(patch));
    Ok(StatusCode::OK)
}

/// GET /api/recorder - Transport state
async fn get_recorder(State(state): State<Arc<SimState>>) -> Json<RecorderState> {
    Json(state.recorder())
}

#[derive(Debug, Deserialize)]
struct RecorderRequest {
    action: String,
    track: Option<i64>,
    bpm: Option<i64>,
    metronome: Option<String>,
}

/// POST /api/recorder - `set`, `record`, `stop` or `clear`
async fn post_recorder(
    State(state): State<Arc<SimState>>,
    Json(req): Json<RecorderRequest>,
) -> Result<StatusCode, ApiError> {
    let mut recorder = state.recorder.write();
    if let Some(track) = req.track {
        if !(1..=4).contains(&track) {
            return Err(ApiError::bad_request(format!("Invalid track {}", track)));
        }
    }

    match req.action.as_str() {
        "set" => {
            if let Some(track) = req.track {
                recorder.track = track;
            }
            if let Some(bpm) = req.bpm {
                recorder.bpm = bpm;
            }
            if let Some(metronome) = req.metronome {
                recorder.metronome = metronome;
            }
        }
        "record" => {
            if let Some(track) = req.track {
                recorder.track = track;
            }
            recorder.recording = true;
        }
        "stop" => recorder.recording = false,
        "clear" => info!("Cleared track {}", req.track.unwrap_or(recorder.track)),
        other => return Err(ApiError::bad_request(format!("Unknown action '{}'", other))),
    }
    Ok(StatusCode::OK)
}

/// POST /api/presets - `list`, `save` or `load`
async fn post_presets(
    State(state): State<Arc<SimState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let method = body
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("'method' field required"))?;

    match method {
        "list" => {
            let names: Vec<Value> = state
                .presets
                .read()
                .iter()
                .map(|p| json!({"name": p.name}))
                .collect();
            Ok(Json(json!({"status": "ok", "presets": names})))
        }
        "save" => {
            let name = body
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::bad_request("'name' field required"))?;
            let preset = StoredPreset {
                name: name.to_string(),
                datetime: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                configuration: state.configuration(),
            };
            let mut presets = state.presets.write();
            let updated = match presets.iter_mut().find(|p| p.name == name) {
                Some(existing) => {
                    *existing = preset;
                    true
                }
                None => {
                    presets.push(preset);
                    false
                }
            };
            info!("Saved preset '{}'", name);
            Ok(Json(json!({"status": "ok", "updated": updated})))
        }
        "load" => {
            let name = body
                .get("preset")
                .and_then(Value::as_str)
                .ok_or_else(|| ApiError::bad_request("'preset' field required in request body"))?;
            let configuration = state
                .presets
                .read()
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.configuration.clone());
            let reply = match configuration {
                Some(c) if state.apply_configuration(&c) => {
                    info!("Loaded preset '{}'", name);
                    json!({"status": "ok", "message": "Preset loaded"})
                }
                Some(_) => json!({"status": "failed", "message": "Invalid preset"}),
                None => json!({"status": "failed", "message": "Preset not found"}),
            };
            Ok(Json(reply))
        }
        other => Err(ApiError::bad_request(format!("Unknown method '{}'", other))),
    }
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    key: String,
}

fn check_note(key: &str) -> Result<(), ApiError> {
    if ALL_NOTES.contains(&key) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Unknown note '{}'", key)))
    }
}

/// POST /api/input/push - Note on
async fn push_note(
    State(state): State<Arc<SimState>>,
    Json(req): Json<NoteRequest>,
) -> Result<StatusCode, ApiError> {
    check_note(&req.key)?;
    debug!("Note on {}", req.key);
    state.held_notes.write().insert(req.key);
    Ok(StatusCode::OK)
}

/// POST /api/input/release - Note off
async fn release_note(
    State(state): State<Arc<SimState>>,
    Json(req): Json<NoteRequest>,
) -> Result<StatusCode, ApiError> {
    check_note(&req.key)?;
    state.held_notes.write().remove(&req.key);
    Ok(StatusCode::OK)
}

/// GET /api/health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Bind and serve in the background; returns the bound address
pub async fn spawn_server(state: Arc<SimState>, port: u16) -> Result<(SocketAddr, JoinHandle<()>)> {
    let router = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind simulator on {}", addr))?;
    let local = listener.local_addr().context("Simulator has no local address")?;
    info!("Synth simulator listening on http://{}", local);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Simulator server error: {}", e);
        }
    });

    Ok((local, handle))
}

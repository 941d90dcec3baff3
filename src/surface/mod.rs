//! The control surface: one engine per parameter group plus its knobs
//!
//! Panels:
//! - `fx`: global effects config
//! - `osc1`..`oscN`: oscillators
//! - `rec`: recorder transport (the only polled group)

pub mod binding;
pub mod format;
pub mod panels;

pub use binding::{KnobBinding, DEFAULT_KNOB_SIZE};
pub use format::{format_frequency, ValueFormat};

use crate::config::AppConfig;
use crate::groups::{EffectsConfig, Oscillator, RecorderTransport, WireFormat};
use crate::keyboard::ALL_NOTES;
use crate::remote::{PresetSummary, RecorderAction, SynthClient, TransportError};
use crate::scale::DomainError;
use crate::sync::{EngineOptions, GroupActor, GroupHandle, LoadState, ParamValue, ParameterGroup};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Panel address as typed at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelId {
    Effects,
    /// Zero-based oscillator index
    Oscillator(usize),
    Recorder,
}

impl FromStr for PanelId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "fx" | "effects" => return Ok(PanelId::Effects),
            "rec" | "recorder" => return Ok(PanelId::Recorder),
            _ => {}
        }
        let number = s
            .strip_prefix("osc")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n >= 1)
            .ok_or_else(|| anyhow!("Unknown panel '{}' (fx, osc1.., rec)", s))?;
        Ok(PanelId::Oscillator(number - 1))
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelId::Effects => write!(f, "fx"),
            PanelId::Oscillator(i) => write!(f, "osc{}", i + 1),
            PanelId::Recorder => write!(f, "rec"),
        }
    }
}

/// A group's engine with the knobs bound to it
pub struct Panel<G: ParameterGroup> {
    pub handle: GroupHandle<G>,
    pub knobs: Vec<KnobBinding<G>>,
}

fn matches_knob<G: ParameterGroup>(knob: &KnobBinding<G>, name: &str) -> bool {
    knob.label.eq_ignore_ascii_case(name)
        || knob.field.to_string().eq_ignore_ascii_case(name)
        || knob.label.replace(' ', "-").eq_ignore_ascii_case(name)
}

impl<G: ParameterGroup> Panel<G> {
    pub fn new(handle: GroupHandle<G>, knobs: Vec<KnobBinding<G>>) -> Self {
        Self { handle, knobs }
    }

    /// Knob by label (`Echo mix`, `echo-mix`) or field path (`echo.mix`)
    pub fn knob(&self, name: &str) -> Result<&KnobBinding<G>> {
        self.knobs
            .iter()
            .find(|k| matches_knob(k, name))
            .ok_or_else(|| anyhow!("No knob '{}'", name))
    }
}

/// Type-erased panel operations, so the surface can address any panel
#[async_trait]
pub trait Controls: Send + Sync {
    fn title(&self) -> String;

    /// Drag a knob by `dy` pixels (up is positive), `sweep_px` pixels per full
    /// range; returns the value sent
    fn drag(&mut self, knob: &str, dy: f64, sweep_px: f64) -> Result<Option<f64>>;

    /// Move a knob by whole steps
    fn turn(&self, knob: &str, steps: i32) -> Result<Option<f64>>;

    /// Edit any field by its wire path from user input
    async fn set(&self, field: &str, input: &str) -> Result<()>;

    async fn flush(&self) -> Result<(), TransportError>;

    fn refresh(&self);

    async fn shutdown(&self);

    fn render(&self) -> Vec<String>;
}

#[async_trait]
impl<G: ParameterGroup> Controls for Panel<G> {
    fn title(&self) -> String {
        let view = self.handle.view();
        let mut title = view.local.label();
        match &view.load {
            LoadState::Loaded => {}
            other => title.push_str(&format!(" [{}]", other)),
        }
        if view.pending {
            title.push_str(" *");
        }
        if let Some(err) = &view.last_error {
            title.push_str(&format!(" (last error: {})", err));
        }
        title
    }

    fn drag(&mut self, knob: &str, dy: f64, sweep_px: f64) -> Result<Option<f64>> {
        let snapshot = self.handle.view().local;
        let binding = self
            .knobs
            .iter_mut()
            .find(|k| matches_knob(k, knob))
            .ok_or_else(|| anyhow!("No knob '{}'", knob))?;
        let (from, to) = binding.drag_path(&snapshot, dy, sweep_px);
        binding.begin(from, &snapshot);
        let sent = binding.drag(to, &self.handle);
        binding.end();
        Ok(sent)
    }

    fn turn(&self, knob: &str, steps: i32) -> Result<Option<f64>> {
        let snapshot = self.handle.view().local;
        Ok(self.knob(knob)?.step(&snapshot, steps, &self.handle))
    }

    async fn set(&self, field: &str, input: &str) -> Result<()> {
        let field = G::field_named(field).ok_or_else(|| {
            let known: Vec<String> = G::fields().iter().map(|f| f.to_string()).collect();
            anyhow!("Unknown field '{}' (one of: {})", field, known.join(", "))
        })?;
        self.handle.try_edit(field, ParamValue::parse(input)).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.handle.flush().await
    }

    fn refresh(&self) {
        self.handle.refresh();
    }

    async fn shutdown(&self) {
        self.handle.shutdown().await;
    }

    fn render(&self) -> Vec<String> {
        let snapshot = self.handle.view().local;
        let mut lines = vec![self.title()];
        for knob in &self.knobs {
            let indicator = knob.indicator(&snapshot);
            lines.push(format!(
                "  {:<14} {:>12}  {:>5.1}°",
                knob.label,
                knob.display(&snapshot),
                indicator.angle_degrees
            ));
        }
        for &field in G::fields() {
            if !self.knobs.iter().any(|k| k.field == field) {
                lines.push(format!("  {:<14} {:>12}", field.to_string(), snapshot.get(field)));
            }
        }
        lines
    }
}

/// All panels of the synth, connected to one server
pub struct Surface {
    client: Arc<SynthClient>,
    /// Drag distance covering a knob's full range
    sensitivity_px: f64,
    pub effects: Panel<EffectsConfig>,
    pub oscillators: Vec<Panel<Oscillator>>,
    pub recorder: Panel<RecorderTransport>,
}

fn spawn_panel<G: WireFormat>(
    initial: G,
    client: &Arc<SynthClient>,
    options: EngineOptions,
    knobs: Vec<KnobBinding<G>>,
    config: &AppConfig,
) -> Panel<G> {
    let knobs = knobs
        .into_iter()
        .map(|k| {
            let size = k.size * config.surface.knob_size / DEFAULT_KNOB_SIZE;
            k.with_size(size).with_mode(config.surface.gesture_mode(size))
        })
        .collect();
    Panel::new(GroupActor::spawn(initial, Arc::clone(client), options), knobs)
}

impl Surface {
    /// Spawn one engine per group; each starts by loading from the server
    pub fn start(client: Arc<SynthClient>, config: &AppConfig) -> Result<Self, DomainError> {
        let edits = EngineOptions {
            debounce: config.sync.debounce(),
            poll_interval: None,
        };
        let polled = EngineOptions {
            poll_interval: Some(config.sync.poll_interval()),
            ..edits
        };

        let effects = spawn_panel(EffectsConfig::default(), &client, edits, panels::effects_knobs()?, config);
        let oscillators = (0..config.surface.oscillators)
            .map(|index| {
                Ok(spawn_panel(
                    Oscillator::new(index),
                    &client,
                    edits,
                    panels::oscillator_knobs()?,
                    config,
                ))
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let recorder = spawn_panel(
            RecorderTransport::default(),
            &client,
            polled,
            panels::recorder_knobs()?,
            config,
        );

        info!(
            "Surface started against {} ({} oscillators)",
            client.base_url(),
            oscillators.len()
        );

        Ok(Self {
            client,
            sensitivity_px: config.surface.sensitivity_px,
            effects,
            oscillators,
            recorder,
        })
    }

    pub fn client(&self) -> &SynthClient {
        &self.client
    }

    pub fn panel(&self, id: PanelId) -> Result<&dyn Controls> {
        Ok(match id {
            PanelId::Effects => &self.effects,
            PanelId::Oscillator(i) => self
                .oscillators
                .get(i)
                .ok_or_else(|| anyhow!("No oscillator {}", i + 1))?,
            PanelId::Recorder => &self.recorder,
        })
    }

    pub fn panel_mut(&mut self, id: PanelId) -> Result<&mut dyn Controls> {
        let count = self.oscillators.len();
        Ok(match id {
            PanelId::Effects => &mut self.effects,
            PanelId::Oscillator(i) => self
                .oscillators
                .get_mut(i)
                .ok_or_else(|| anyhow!("No oscillator {} ({} configured)", i + 1, count))?,
            PanelId::Recorder => &mut self.recorder,
        })
    }

    fn panels(&self) -> Vec<&dyn Controls> {
        let mut panels: Vec<&dyn Controls> = vec![&self.effects];
        panels.extend(self.oscillators.iter().map(|p| p as &dyn Controls));
        panels.push(&self.recorder);
        panels
    }

    /// Drag a knob by `dy` pixels, up being positive
    pub fn drag(&mut self, id: PanelId, knob: &str, dy: f64) -> Result<Option<f64>> {
        let sweep_px = self.sensitivity_px;
        self.panel_mut(id)?.drag(knob, dy, sweep_px)
    }

    pub fn turn(&self, id: PanelId, knob: &str, steps: i32) -> Result<Option<f64>> {
        self.panel(id)?.turn(knob, steps)
    }

    pub async fn set(&self, id: PanelId, field: &str, input: &str) -> Result<()> {
        self.panel(id)?.set(field, input).await
    }

    /// Send every pending write now
    pub async fn flush_all(&self) -> Result<(), TransportError> {
        let mut first_error = None;
        for panel in self.panels() {
            if let Err(e) = panel.flush().await {
                warn!("Flush of {} failed: {}", panel.title(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn refresh_all(&self) {
        for panel in self.panels() {
            panel.refresh();
        }
    }

    /// Silence any note left held by a previous session
    pub async fn release_all_notes(&self) -> Result<(), TransportError> {
        for note in ALL_NOTES {
            self.client.release_note(note).await?;
        }
        debug!("Released {} notes", ALL_NOTES.len());
        Ok(())
    }

    pub async fn list_presets(&self) -> Result<Vec<PresetSummary>, TransportError> {
        self.client.list_presets().await
    }

    /// Save the server state, including edits still in their debounce window
    pub async fn save_preset(&self, name: &str) -> Result<bool, TransportError> {
        self.flush_all().await?;
        self.client.save_preset(name).await
    }

    /// Load a preset, then re-read every group
    pub async fn load_preset(&self, name: &str) -> Result<(), TransportError> {
        self.flush_all().await?;
        self.client.load_preset(name).await?;
        info!("Loaded preset '{}'", name);
        self.refresh_all();
        Ok(())
    }

    /// Transport action on the recorder's selected track
    pub async fn recorder_action(&self, action: RecorderAction) -> Result<(), TransportError> {
        self.recorder.handle.flush().await?;
        let track = self.recorder.handle.view().local.track;
        self.client.recorder_action(action, track).await?;
        self.recorder.handle.refresh();
        Ok(())
    }

    pub async fn note_on(&self, note: &str) -> Result<(), TransportError> {
        self.client.push_note(note).await
    }

    pub async fn note_off(&self, note: &str) -> Result<(), TransportError> {
        self.client.release_note(note).await
    }

    pub fn render(&self) -> Vec<Vec<String>> {
        self.panels().iter().map(|p| p.render()).collect()
    }

    /// Flush and stop every engine
    pub async fn shutdown(&self) {
        for panel in self.panels() {
            panel.shutdown().await;
        }
        info!("Surface stopped");
    }

    /// Wait until every group has left the loading state
    pub async fn wait_loaded(&self) -> Result<()> {
        async fn settled<G: ParameterGroup>(handle: &GroupHandle<G>) -> Result<Option<String>> {
            let mut rx = handle.subscribe();
            let load = rx
                .wait_for(|v| v.load != LoadState::Loading)
                .await
                .map_err(|_| anyhow!("{} engine stopped while loading", handle.view().local.label()))?
                .load
                .clone();
            Ok(match load {
                LoadState::Failed(reason) => Some(format!("{}: {}", handle.view().local.label(), reason)),
                _ => None,
            })
        }

        let mut failed = Vec::new();
        failed.extend(settled(&self.effects.handle).await?);
        for osc in &self.oscillators {
            failed.extend(settled(&osc.handle).await?);
        }
        failed.extend(settled(&self.recorder.handle).await?);

        if !failed.is_empty() {
            bail!("Some groups failed to load: {}", failed.join("; "));
        }
        Ok(())
    }
}

//! Test fixtures: a three-knob group and an in-memory remote

use super::group::ParameterGroup;
use super::types::{EditError, ParamValue};
use crate::remote::{Remote, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EchoField {
    Gain,
    Feedback,
    Mix,
    /// Observed only
    Level,
}

impl fmt::Display for EchoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EchoField::Gain => "gain",
            EchoField::Feedback => "feedback",
            EchoField::Mix => "mix",
            EchoField::Level => "level",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoGroup {
    pub gain: f64,
    pub feedback: f64,
    pub mix: f64,
    pub level: f64,
}

impl EchoGroup {
    pub fn new(gain: f64, feedback: f64, mix: f64) -> Self {
        Self {
            gain,
            feedback,
            mix,
            level: 0.0,
        }
    }
}

impl Default for EchoGroup {
    fn default() -> Self {
        Self::new(0.5, 0.5, 0.5)
    }
}

impl ParameterGroup for EchoGroup {
    type Field = EchoField;

    fn label(&self) -> String {
        "echo".to_string()
    }

    fn fields() -> &'static [EchoField] {
        &[EchoField::Gain, EchoField::Feedback, EchoField::Mix, EchoField::Level]
    }

    fn get(&self, field: EchoField) -> ParamValue {
        match field {
            EchoField::Gain => self.gain.into(),
            EchoField::Feedback => self.feedback.into(),
            EchoField::Mix => self.mix.into(),
            EchoField::Level => self.level.into(),
        }
    }

    fn set(&mut self, field: EchoField, value: ParamValue) -> Result<(), EditError> {
        let n = value
            .as_number()
            .ok_or_else(|| EditError::wrong_kind(field, "number", &value))?;
        match field {
            EchoField::Gain => self.gain = n,
            EchoField::Feedback => self.feedback = n,
            EchoField::Mix => self.mix = n,
            EchoField::Level => self.level = n,
        }
        Ok(())
    }

    fn is_editable(field: EchoField) -> bool {
        field != EchoField::Level
    }
}

/// A write the fake server received
#[derive(Debug, Clone)]
pub struct SentWrite {
    pub at: Instant,
    pub fields: Vec<(EchoField, ParamValue)>,
}

/// In-memory server for one [`EchoGroup`]
pub struct FakeRemote {
    state: Mutex<EchoGroup>,
    sent: Mutex<Vec<SentWrite>>,
    fetches: Mutex<u32>,
    fetch_delay: Duration,
    send_delay: Duration,
    fail_fetch: Mutex<bool>,
    fail_send: Mutex<bool>,
}

impl FakeRemote {
    pub fn new(state: EchoGroup) -> Self {
        Self {
            state: Mutex::new(state),
            sent: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            fetch_delay: Duration::ZERO,
            send_delay: Duration::ZERO,
            fail_fetch: Mutex::new(false),
            fail_send: Mutex::new(false),
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Writes take effect `delay` after they are received
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn failing_fetch(self) -> Self {
        *self.fail_fetch.lock() = true;
        self
    }

    pub fn set_send_failure(&self, fail: bool) {
        *self.fail_send.lock() = fail;
    }

    /// Change server-side state, as another client would
    pub fn set_server_state(&self, state: EchoGroup) {
        *self.state.lock() = state;
    }

    pub fn server_state(&self) -> EchoGroup {
        self.state.lock().clone()
    }

    pub fn sent(&self) -> Vec<SentWrite> {
        self.sent.lock().clone()
    }

    pub fn fetch_count(&self) -> u32 {
        *self.fetches.lock()
    }
}

#[async_trait]
impl Remote<EchoGroup> for FakeRemote {
    async fn fetch(&self, _template: &EchoGroup) -> Result<EchoGroup, TransportError> {
        *self.fetches.lock() += 1;
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if *self.fail_fetch.lock() {
            return Err(TransportError::Unavailable("connection refused".into()));
        }
        Ok(self.state.lock().clone())
    }

    async fn send(&self, snapshot: &EchoGroup, changed: &[EchoField]) -> Result<(), TransportError> {
        self.sent.lock().push(SentWrite {
            at: Instant::now(),
            fields: changed.iter().map(|&f| (f, snapshot.get(f))).collect(),
        });
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if *self.fail_send.lock() {
            return Err(TransportError::Status {
                url: "/api/echo".into(),
                status: 500,
            });
        }
        let mut state = self.state.lock();
        for &f in changed {
            let _ = state.set(f, snapshot.get(f));
        }
        Ok(())
    }
}

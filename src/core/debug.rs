use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

const START_MESSAGE: &str = "Start debug.";
const STOP_MESSAGE: &str = "Stop debug.";

/// One line of the debug trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// UTC time with microsecond precision
    pub timestamp: String,
    pub message: String,
}

/// Snapshot of a debug session as returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugReport {
    /// Accumulated transport time in seconds
    pub time: f64,
    pub count: u64,
    pub trace: Vec<TraceEntry>,
}

#[derive(Debug, Default)]
struct SessionState {
    active: bool,
    total_time: f64,
    request_count: u64,
    trace: Vec<TraceEntry>,
}

impl SessionState {
    fn push(&mut self, message: String) {
        self.trace.push(TraceEntry {
            timestamp: trace_timestamp(),
            message,
        });
    }
}

/// Timing, request count and trace accumulated across requests of one client.
///
/// The whole record sits behind a single mutex so a count increment and its
/// trace entry always land together. The trace is append-only; two entries
/// with the same timestamp both survive, in call order.
#[derive(Debug, Default)]
pub struct DebugSession {
    state: Mutex<Option<SessionState>>,
}

impl DebugSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SessionState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize on first use, mark active and log "Start debug."
    pub fn start(&self) {
        let mut guard = self.lock();
        let state = guard.get_or_insert_with(SessionState::default);
        state.active = true;
        state.push(START_MESSAGE.to_string());
        debug!(entries = state.trace.len(), "debug session started");
    }

    /// Log "Stop debug." and deactivate; nothing happens when not active.
    pub fn stop(&self) {
        let mut guard = self.lock();
        if let Some(state) = guard.as_mut().filter(|state| state.active) {
            state.push(STOP_MESSAGE.to_string());
            state.active = false;
            debug!(
                count = state.request_count,
                time = state.total_time,
                "debug session stopped"
            );
        }
    }

    /// Drop all accumulated data, then start again.
    ///
    /// A reset session is always active afterwards, with "Start debug." as
    /// its only trace entry.
    pub fn reset(&self) {
        {
            let mut guard = self.lock();
            *guard = Some(SessionState::default());
        }
        self.start();
    }

    /// Count one finished request. Ignored unless the session is active.
    pub fn record_request(&self, elapsed_seconds: f64, url: &str) {
        let mut guard = self.lock();
        if let Some(state) = guard.as_mut().filter(|state| state.active) {
            state.request_count += 1;
            state.total_time += elapsed_seconds;
            state.push(format!("Request | {}", url));
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().as_ref().is_some_and(|state| state.active)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Current totals and trace, zeroed if the session never started.
    pub fn report(&self) -> DebugReport {
        self.lock()
            .as_ref()
            .map(|state| DebugReport {
                time: state.total_time,
                count: state.request_count,
                trace: state.trace.clone(),
            })
            .unwrap_or_default()
    }
}

fn trace_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

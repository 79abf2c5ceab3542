//! Deployment event sink
//!
//! Provisioning and deployment report progress as `{status, message}` events to
//! an injected [`EventSink`]. The status set is closed; messages are free-form
//! JSON (usually a string, sometimes a raw service response).

use std::sync::{Arc, Mutex};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Event status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStatus {
    DeployInfo,
    DeploySuccess,
    DeployError,
    ProvisionInfo,
    ProvisionSuccess,
    ProvisionError,
    ProvisionErrorDetails,
    ProvisionWarning,
}

impl DeployStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::DeployInfo => "DEPLOY_INFO",
            DeployStatus::DeploySuccess => "DEPLOY_SUCCESS",
            DeployStatus::DeployError => "DEPLOY_ERROR",
            DeployStatus::ProvisionInfo => "PROVISION_INFO",
            DeployStatus::ProvisionSuccess => "PROVISION_SUCCESS",
            DeployStatus::ProvisionError => "PROVISION_ERROR",
            DeployStatus::ProvisionErrorDetails => "PROVISION_ERROR_DETAILS",
            DeployStatus::ProvisionWarning => "PROVISION_WARNING",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DeployStatus::DeployError
                | DeployStatus::ProvisionError
                | DeployStatus::ProvisionErrorDetails
        )
    }
}

/// A single progress event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployEvent {
    pub status: DeployStatus,
    pub message: serde_json::Value,
}

impl DeployEvent {
    /// The message as display text; strings are shown without quotes
    pub fn message_text(&self) -> String {
        match &self.message {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Receiver of deployment events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DeployEvent);
}

/// Cloneable handle used by every component to report events
#[derive(Clone)]
pub struct EventLogger {
    sink: Arc<dyn EventSink>,
}

impl EventLogger {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Logger forwarding to `tracing`
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn log(&self, status: DeployStatus, message: impl Into<serde_json::Value>) {
        self.sink.emit(DeployEvent {
            status,
            message: message.into(),
        });
    }

    /// Log a serializable value (service responses and the like)
    pub fn log_value<T: Serialize>(&self, status: DeployStatus, value: &T) {
        let message = serde_json::to_value(value)
            .unwrap_or_else(|e| serde_json::Value::String(format!("<unserializable: {}>", e)));
        self.log(status, message);
    }
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger").finish_non_exhaustive()
    }
}

/// Sink that writes events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: DeployEvent) {
        let status = event.status.as_str();
        let text = event.message_text();
        match event.status {
            s if s.is_error() => error!(status = status, "{}", text),
            DeployStatus::ProvisionWarning => warn!(status = status, "{}", text),
            _ => info!(status = status, "{}", text),
        }
    }
}

/// Sink that prints events to the terminal, colored by status
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: DeployEvent) {
        let text = event.message_text();
        match event.status {
            s if s.is_error() => eprintln!("{}", text.red()),
            DeployStatus::ProvisionWarning => println!("{}", text.yellow()),
            DeployStatus::DeploySuccess | DeployStatus::ProvisionSuccess => {
                println!("{}", text.green())
            }
            _ => println!("{}", text),
        }
    }
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DeployEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeployEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages of every event with the given status, as text
    pub fn messages(&self, status: DeployStatus) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.status == status)
            .map(|e| e.message_text())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: DeployEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&DeployStatus::ProvisionErrorDetails).unwrap();
        assert_eq!(json, "\"PROVISION_ERROR_DETAILS\"");
        assert_eq!(DeployStatus::ProvisionErrorDetails.as_str(), "PROVISION_ERROR_DETAILS");
    }

    #[test]
    fn test_recording_sink_collects_events() {
        let sink = Arc::new(RecordingSink::new());
        let logger = EventLogger::new(sink.clone());

        logger.log(DeployStatus::DeployInfo, "hello");
        logger.log_value(DeployStatus::ProvisionInfo, &serde_json::json!({"a": 1}));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message_text(), "hello");
        assert_eq!(events[1].message_text(), r#"{"a":1}"#);
    }
}

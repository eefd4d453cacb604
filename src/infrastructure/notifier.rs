use crate::domain::ports::{Notifier, NotifyEvent};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// Default notifier: logs the event instead of sending email. Outbound
/// delivery is an external collaborator; the core only needs the seam.
#[derive(Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, event: NotifyEvent) -> Result<()> {
        tracing::info!(?event, "notification");
        Ok(())
    }
}

/// Records every event it is handed. Test double for asserting what was
/// (or was not) notified.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifyEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotifyEvent) -> Result<()> {
        self.events
            .lock()
            .expect("notifier lock poisoned")
            .push(event);
        Ok(())
    }
}

/// Always fails. Exercises the rule that a broken mail pipeline never rolls
/// back the state transition that triggered it.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _event: NotifyEvent) -> Result<()> {
        Err(CoreError::ExternalService("smtp relay down".to_string()))
    }
}

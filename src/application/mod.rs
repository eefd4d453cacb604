pub mod assessments;
pub mod ledger;
pub mod projector;

use crate::domain::ports::{Notifier, NotifyEvent};

/// Fires a notification and swallows failures: email is best-effort and must
/// never roll back the state transition that produced the event.
pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, event: NotifyEvent) {
    if let Err(e) = notifier.notify(event).await {
        tracing::warn!(error = %e, "notification delivery failed");
    }
}

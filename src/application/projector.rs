use super::notify_best_effort;
use crate::domain::enrollment::{SettlementEvent, SettlementOutcome};
use crate::domain::ports::{
    EnrollmentStore, EnrollmentStoreRef, GrantOutcome, NotifierRef, NotifyEvent,
};
use crate::error::Result;

/// Derives enrollment records from payment settlements.
///
/// The projector is the only writer of enrollment state. Applying the same
/// settlement twice (a retried webhook, a second approval racing the first)
/// leaves the enrollment and the per-course counter exactly as a single
/// application would: the store's `grant` upsert is idempotent and the
/// counter only moves on a first-time grant.
pub struct EnrollmentProjector {
    enrollments: EnrollmentStoreRef,
    notifier: NotifierRef,
}

impl EnrollmentProjector {
    pub fn new(enrollments: EnrollmentStoreRef, notifier: NotifierRef) -> Self {
        Self {
            enrollments,
            notifier,
        }
    }

    pub async fn apply(&self, event: &SettlementEvent) -> Result<()> {
        match event.outcome {
            // Enrollment is only ever granted; a failed settlement leaves
            // whatever enrollment state exists untouched.
            SettlementOutcome::Failed => {
                tracing::debug!(
                    student = %event.student,
                    course = %event.course,
                    "settlement failed, no enrollment change"
                );
                Ok(())
            }
            SettlementOutcome::Completed => {
                let outcome = self
                    .enrollments
                    .grant(event.student, event.course, event.method, event.settled_at)
                    .await?;

                if outcome == GrantOutcome::Granted {
                    self.enrollments.increment_enrolled(event.course).await?;
                    tracing::info!(
                        student = %event.student,
                        course = %event.course,
                        method = ?event.method,
                        "enrollment granted"
                    );
                    notify_best_effort(
                        self.notifier.as_ref(),
                        NotifyEvent::EnrollmentGranted {
                            student: event.student,
                            course: event.course,
                        },
                    )
                    .await;
                }
                Ok(())
            }
        }
    }
}

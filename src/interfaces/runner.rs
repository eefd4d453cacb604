use super::json::scenario::{Operation, Scenario};
use crate::application::assessments::AssessmentEngine;
use crate::application::ledger::PaymentLedger;
use crate::domain::actor::Actor;
use crate::domain::course::Course;
use crate::domain::payment::OfflineEvidence;
use crate::domain::ports::{
    ActorStore, ActorStoreRef, CourseStore, CourseStoreRef, PaymentStore, PaymentStoreRef,
};
use crate::error::{CoreError, Result};
use crate::infrastructure::gateway::MockGateway;
use std::sync::Arc;

/// Replays a scenario against the application services.
///
/// The runner plays the roles the real deployment splits across HTTP
/// handlers and the gateway's webhook: it resolves pending orders and signs
/// the simulated callback itself.
pub struct ScenarioRunner {
    ledger: Arc<PaymentLedger>,
    engine: Arc<AssessmentEngine>,
    payments: PaymentStoreRef,
    actors: ActorStoreRef,
    courses: CourseStoreRef,
    gateway: Arc<MockGateway>,
}

impl ScenarioRunner {
    pub fn new(
        ledger: Arc<PaymentLedger>,
        engine: Arc<AssessmentEngine>,
        payments: PaymentStoreRef,
        actors: ActorStoreRef,
        courses: CourseStoreRef,
        gateway: Arc<MockGateway>,
    ) -> Self {
        Self {
            ledger,
            engine,
            payments,
            actors,
            courses,
            gateway,
        }
    }

    /// Seeds actors, courses and tests. Tests go through the authoring path
    /// so the same guards apply as in production use.
    pub async fn seed(&self, scenario: &Scenario) -> Result<()> {
        for seed in &scenario.actors {
            let mut actor = Actor::new(seed.id, seed.role);
            actor.active = seed.active;
            self.actors.insert(actor).await?;
        }
        for seed in &scenario.courses {
            let mut course = Course::new(seed.id, seed.instructor, seed.price);
            course.published = seed.published;
            self.courses.insert(course).await?;
        }
        for seed in &scenario.tests {
            let id = self
                .engine
                .create_test(
                    seed.creator,
                    seed.course,
                    &seed.title,
                    seed.settings.clone().into_settings(),
                )
                .await?;
            self.engine
                .update_questions(seed.creator, id, seed.questions.clone())
                .await?;
            if seed.publish {
                self.engine.publish(seed.creator, id).await?;
            }
        }
        Ok(())
    }

    /// Applies one operation; returns a short human-readable outcome line.
    pub async fn apply(&self, operation: &Operation) -> Result<String> {
        match operation {
            Operation::InitiateOnline { student, course } => {
                let initiated = self.ledger.initiate_online(*student, *course).await?;
                Ok(format!(
                    "payment {} initiated ({})",
                    initiated.payment, initiated.order_ref
                ))
            }
            Operation::VerifyOnline {
                student,
                course,
                forge_signature,
            } => {
                let pending = self
                    .payments
                    .find_pending(*student, *course)
                    .await?
                    .ok_or_else(|| {
                        CoreError::NotFound(format!(
                            "no pending payment for student {student} and course {course}"
                        ))
                    })?;
                let order_ref = pending.order_ref().ok_or_else(|| {
                    CoreError::Conflict(format!("payment {} has no gateway order", pending.id))
                })?;
                let payment_ref = format!("pay_{}", pending.id);
                let signature = if *forge_signature {
                    "forged".to_string()
                } else {
                    self.gateway.sign(order_ref, &payment_ref)
                };
                let verified = self
                    .ledger
                    .verify_online(order_ref, &payment_ref, &signature)
                    .await?;
                Ok(format!(
                    "payment {} verified ({:?})",
                    verified.payment, verified.status
                ))
            }
            Operation::RequestOffline {
                student,
                course,
                bank_name,
                transaction_id,
                transaction_date,
                evidence_ref,
                notes,
            } => {
                let id = self
                    .ledger
                    .request_offline(
                        *student,
                        *course,
                        OfflineEvidence {
                            bank_name: bank_name.clone(),
                            transaction_id: transaction_id.clone(),
                            transaction_date: *transaction_date,
                            evidence_ref: evidence_ref.clone(),
                            notes: notes.clone(),
                        },
                    )
                    .await?;
                Ok(format!("payment {id} requested"))
            }
            Operation::Approve { actor, payment } => {
                let id = self.ledger.approve(*actor, *payment).await?;
                Ok(format!("payment {id} approved"))
            }
            Operation::Reject {
                actor,
                payment,
                reason,
            } => {
                let id = self.ledger.reject(*actor, *payment, reason).await?;
                Ok(format!("payment {id} rejected"))
            }
            Operation::Cancel { actor, payment } => {
                let id = self.ledger.cancel(*actor, *payment).await?;
                Ok(format!("payment {id} cancelled"))
            }
            Operation::Refund { actor, payment } => {
                let id = self.ledger.refund(*actor, *payment).await?;
                Ok(format!("payment {id} refunded"))
            }
            Operation::Submit {
                student,
                test,
                answers,
                time_taken_secs,
            } => {
                let view = self
                    .engine
                    .submit(*student, *test, answers, *time_taken_secs)
                    .await?;
                Ok(format!(
                    "attempt {} recorded (number {})",
                    view.id, view.attempt_number
                ))
            }
        }
    }
}

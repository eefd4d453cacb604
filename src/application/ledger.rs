use super::{notify_best_effort, projector::EnrollmentProjector};
use crate::domain::access::{Action, Resource, can_access};
use crate::domain::actor::Actor;
use crate::domain::course::Course;
use crate::domain::enrollment::{SettlementEvent, SettlementOutcome};
use crate::domain::ids::{ActorId, CourseId, PaymentId};
use crate::domain::payment::{
    Amount, OfflineEvidence, Payment, PaymentMethod, PaymentStatus,
};
use crate::domain::ports::{
    ActorStore, ActorStoreRef, ClockRef, CourseStore, CourseStoreRef, EnrollmentStore,
    EnrollmentStoreRef, NotifyEvent, PaymentGateway, PaymentGatewayRef, PaymentStore,
    PaymentStoreRef,
};
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;

const CURRENCY: &str = "INR";

/// Result of `initiate_online`.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiatedPayment {
    pub payment: PaymentId,
    pub order_ref: String,
    pub amount: Decimal,
}

/// Result of `verify_online`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub payment: PaymentId,
    pub status: PaymentStatus,
    pub enrollment_granted: bool,
}

/// Owns the payment lifecycle: the gateway-verified online path and the
/// manually-approved offline path. Every state transition is a conditional
/// write ("only if still pending"), so concurrent settlements of the same
/// payment yield exactly one success; the loser observes `Conflict`.
pub struct PaymentLedger {
    payments: PaymentStoreRef,
    enrollments: EnrollmentStoreRef,
    actors: ActorStoreRef,
    courses: CourseStoreRef,
    gateway: PaymentGatewayRef,
    notifier: crate::domain::ports::NotifierRef,
    projector: Arc<EnrollmentProjector>,
    clock: ClockRef,
}

impl PaymentLedger {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payments: PaymentStoreRef,
        enrollments: EnrollmentStoreRef,
        actors: ActorStoreRef,
        courses: CourseStoreRef,
        gateway: PaymentGatewayRef,
        notifier: crate::domain::ports::NotifierRef,
        projector: Arc<EnrollmentProjector>,
        clock: ClockRef,
    ) -> Self {
        Self {
            payments,
            enrollments,
            actors,
            courses,
            gateway,
            notifier,
            projector,
            clock,
        }
    }

    /// Starts an online checkout: asks the gateway for an order, then records
    /// a pending payment carrying the order reference.
    ///
    /// The gateway call happens before the local write; a gateway timeout
    /// leaves no ledger entry behind. The store's one-pending guard makes the
    /// existence check and the insert a single atomic unit, so N concurrent
    /// checkouts for the same (student, course) admit exactly one.
    pub async fn initiate_online(
        &self,
        student: ActorId,
        course: CourseId,
    ) -> Result<InitiatedPayment> {
        let actor = self.actor(student).await?;
        let course = self.course(course).await?;
        if !can_access(&actor, Action::View, Resource::Course(&course)) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not purchase course {}",
                actor.id, course.id
            )));
        }
        self.check_not_already_payable(&actor, &course).await?;

        let amount = Amount::new(course.price)?;
        let receipt = format!("rcpt_{}_{}", course.id, actor.id);
        let order_ref = self
            .gateway
            .create_order(amount.value(), CURRENCY, &receipt)
            .await?;

        let id = self.payments.allocate_id().await?;
        let payment = Payment::new_online(
            id,
            actor.id,
            course.id,
            amount,
            order_ref.clone(),
            self.clock.now(),
        );
        self.payments.create_pending(payment).await?;

        tracing::info!(payment = %id, student = %actor.id, course = %course.id, "online payment initiated");
        Ok(InitiatedPayment {
            payment: id,
            order_ref,
            amount: amount.value(),
        })
    }

    /// Settles (or fails) a pending online payment against the gateway's
    /// signature. Idempotent: re-invocation on an already-terminal payment
    /// returns the stored terminal state without re-emitting a settlement.
    pub async fn verify_online(
        &self,
        order_ref: &str,
        gateway_payment_ref: &str,
        signature: &str,
    ) -> Result<VerifiedPayment> {
        let payment = self
            .payments
            .find_by_order_ref(order_ref)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("no payment for order {order_ref}")))?;

        if payment.status.is_terminal() {
            return Ok(VerifiedPayment {
                payment: payment.id,
                status: payment.status,
                enrollment_granted: payment.status == PaymentStatus::Completed,
            });
        }

        let valid = self
            .gateway
            .signature_valid(order_ref, gateway_payment_ref, signature)
            .await?;

        if !valid {
            let mut failed = payment.clone();
            failed.fail()?;
            // A concurrent verify may have settled it first; the signature
            // failure then reports the terminal state instead.
            match self
                .payments
                .update_if_status(failed, PaymentStatus::Pending)
                .await
            {
                Ok(()) => {
                    tracing::warn!(payment = %payment.id, order = order_ref, "gateway signature mismatch");
                    return Err(CoreError::GatewayVerification {
                        order_ref: order_ref.to_string(),
                    });
                }
                Err(CoreError::Conflict(_)) => return self.reload_terminal(payment.id).await,
                Err(e) => return Err(e),
            }
        }

        let mut settled = payment.clone();
        settled.settle_online(gateway_payment_ref.to_string(), signature.to_string())?;
        match self
            .payments
            .update_if_status(settled, PaymentStatus::Pending)
            .await
        {
            Ok(()) => {}
            // Lost the race to another verify; report what won.
            Err(CoreError::Conflict(_)) => return self.reload_terminal(payment.id).await,
            Err(e) => return Err(e),
        }

        self.project(&payment, SettlementOutcome::Completed).await?;
        tracing::info!(payment = %payment.id, order = order_ref, "online payment verified");
        Ok(VerifiedPayment {
            payment: payment.id,
            status: PaymentStatus::Completed,
            enrollment_granted: true,
        })
    }

    /// Records an offline (bank transfer) payment request awaiting manual
    /// approval. Same preconditions as the online path; no gateway call.
    pub async fn request_offline(
        &self,
        student: ActorId,
        course: CourseId,
        evidence: OfflineEvidence,
    ) -> Result<PaymentId> {
        evidence.validate()?;
        let actor = self.actor(student).await?;
        let course = self.course(course).await?;
        if !can_access(&actor, Action::View, Resource::Course(&course)) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not purchase course {}",
                actor.id, course.id
            )));
        }
        self.check_not_already_payable(&actor, &course).await?;

        let id = self.payments.allocate_id().await?;
        let payment = Payment::new_offline(
            id,
            actor.id,
            course.id,
            Amount::new(course.price)?,
            evidence,
            self.clock.now(),
        );
        self.payments.create_pending(payment).await?;

        tracing::info!(payment = %id, student = %actor.id, course = %course.id, "offline payment requested");
        Ok(id)
    }

    /// Approves a pending offline payment, settling it and granting the
    /// enrollment. Exactly one of two concurrent approvals succeeds.
    pub async fn approve(&self, actor: ActorId, payment: PaymentId) -> Result<PaymentId> {
        let (actor, payment, course) = self.load_for_review(actor, payment).await?;
        if !can_access(
            &actor,
            Action::Approve,
            Resource::Payment { payment: &payment, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not approve payment {}",
                actor.id, payment.id
            )));
        }
        Self::require_reviewable(&payment)?;

        let mut approved = payment.clone();
        approved.approve(actor.id, self.clock.now())?;
        self.payments
            .update_if_status(approved, PaymentStatus::Pending)
            .await?;

        self.project(&payment, SettlementOutcome::Completed).await?;
        tracing::info!(payment = %payment.id, approver = %actor.id, "offline payment approved");
        notify_best_effort(
            self.notifier.as_ref(),
            NotifyEvent::PaymentApproved {
                payment: payment.id,
                student: payment.student,
            },
        )
        .await;
        Ok(payment.id)
    }

    /// Rejects a pending offline payment with a reason. No enrollment is
    /// touched: failed settlements never mutate enrollment state.
    pub async fn reject(
        &self,
        actor: ActorId,
        payment: PaymentId,
        reason: &str,
    ) -> Result<PaymentId> {
        if reason.trim().is_empty() {
            return Err(CoreError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }
        let (actor, payment, course) = self.load_for_review(actor, payment).await?;
        if !can_access(
            &actor,
            Action::Reject,
            Resource::Payment { payment: &payment, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not reject payment {}",
                actor.id, payment.id
            )));
        }
        Self::require_reviewable(&payment)?;

        let mut rejected = payment.clone();
        rejected.reject(actor.id, self.clock.now(), reason.to_string())?;
        self.payments
            .update_if_status(rejected, PaymentStatus::Pending)
            .await?;

        self.project(&payment, SettlementOutcome::Failed).await?;
        tracing::info!(payment = %payment.id, rejecter = %actor.id, reason, "offline payment rejected");
        notify_best_effort(
            self.notifier.as_ref(),
            NotifyEvent::PaymentRejected {
                payment: payment.id,
                student: payment.student,
                reason: reason.to_string(),
            },
        )
        .await;
        Ok(payment.id)
    }

    /// Cancels a pending payment, freeing the one-pending slot so the
    /// student can start over.
    pub async fn cancel(&self, actor: ActorId, payment: PaymentId) -> Result<PaymentId> {
        let actor = self.actor(actor).await?;
        let payment = self.payment(payment).await?;
        let course = self.course(payment.course).await?;
        if !can_access(
            &actor,
            Action::Cancel,
            Resource::Payment { payment: &payment, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not cancel payment {}",
                actor.id, payment.id
            )));
        }

        let mut cancelled = payment.clone();
        cancelled.cancel()?;
        self.payments
            .update_if_status(cancelled, PaymentStatus::Pending)
            .await?;
        tracing::info!(payment = %payment.id, "payment cancelled");
        Ok(payment.id)
    }

    /// Refunds a completed payment. The enrollment itself is not revoked
    /// here; revocation is a separate product decision.
    pub async fn refund(&self, actor: ActorId, payment: PaymentId) -> Result<PaymentId> {
        let actor = self.actor(actor).await?;
        let payment = self.payment(payment).await?;
        let course = self.course(payment.course).await?;
        if !can_access(
            &actor,
            Action::Refund,
            Resource::Payment { payment: &payment, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not refund payment {}",
                actor.id, payment.id
            )));
        }

        let mut refunded = payment.clone();
        refunded.refund()?;
        self.payments
            .update_if_status(refunded, PaymentStatus::Completed)
            .await?;
        tracing::info!(payment = %payment.id, "payment refunded");
        Ok(payment.id)
    }

    async fn project(&self, payment: &Payment, outcome: SettlementOutcome) -> Result<()> {
        self.projector
            .apply(&SettlementEvent {
                student: payment.student,
                course: payment.course,
                method: payment.method,
                outcome,
                settled_at: self.clock.now(),
            })
            .await
    }

    /// Conflict if access is already granted or a checkout is already
    /// underway. The store's create-time guard re-checks the pending half
    /// atomically; this early check just gives a clean error before the
    /// gateway round-trip.
    async fn check_not_already_payable(&self, actor: &Actor, course: &Course) -> Result<()> {
        if self.enrollments.has_completed(actor.id, course.id).await? {
            return Err(CoreError::Conflict(format!(
                "student {} is already enrolled in course {}",
                actor.id, course.id
            )));
        }
        if self
            .payments
            .find_pending(actor.id, course.id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "a pending payment already exists for student {} and course {}",
                actor.id, course.id
            )));
        }
        Ok(())
    }

    fn require_reviewable(payment: &Payment) -> Result<()> {
        if payment.method != PaymentMethod::Offline {
            return Err(CoreError::Conflict(format!(
                "payment {} is not an offline payment",
                payment.id
            )));
        }
        if payment.status != PaymentStatus::Pending {
            return Err(CoreError::Conflict(format!(
                "payment {} is not pending (status {:?})",
                payment.id, payment.status
            )));
        }
        Ok(())
    }

    async fn reload_terminal(&self, id: PaymentId) -> Result<VerifiedPayment> {
        let current = self.payment(id).await?;
        Ok(VerifiedPayment {
            payment: current.id,
            status: current.status,
            enrollment_granted: current.status == PaymentStatus::Completed,
        })
    }

    async fn load_for_review(
        &self,
        actor: ActorId,
        payment: PaymentId,
    ) -> Result<(Actor, Payment, Course)> {
        let actor = self.actor(actor).await?;
        let payment = self.payment(payment).await?;
        let course = self.course(payment.course).await?;
        Ok((actor, payment, course))
    }

    async fn actor(&self, id: ActorId) -> Result<Actor> {
        let mut actor = self
            .actors
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("actor {id}")))?;
        // Hydrate the completed-enrollment set so capability checks stay pure.
        actor.enrolled_courses = self
            .enrollments
            .completed_courses(id)
            .await?
            .into_iter()
            .collect();
        Ok(actor)
    }

    async fn course(&self, id: CourseId) -> Result<Course> {
        self.courses
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("course {id}")))
    }

    async fn payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("payment {id}")))
    }
}

use super::actor::Actor;
use super::attempt::{Attempt, NewAttempt};
use super::course::Course;
use super::enrollment::Enrollment;
use super::ids::{ActorId, AttemptId, CourseId, PaymentId, TestId};
use super::payment::{Payment, PaymentStatus};
use crate::domain::assessment::Test;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Read-only directory of actors. Profile CRUD lives outside this core.
#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn get(&self, id: ActorId) -> Result<Option<Actor>>;
    async fn insert(&self, actor: Actor) -> Result<()>;
}

/// Read-only course catalog. Course CRUD lives outside this core.
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn get(&self, id: CourseId) -> Result<Option<Course>>;
    async fn insert(&self, course: Course) -> Result<()>;
}

/// Payment ledger storage.
///
/// The conditional operations are the serialization points of the core: each
/// one must be atomic with respect to concurrent callers (single critical
/// section or equivalent uniqueness constraint), so races fail closed with
/// `Conflict` instead of writing twice.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn allocate_id(&self) -> Result<PaymentId>;

    /// Inserts a new pending payment, enforcing the one-pending-payment
    /// invariant: fails `Conflict` if a pending payment already exists for
    /// the same (student, course).
    async fn create_pending(&self, payment: Payment) -> Result<()>;

    /// Conditional write: replaces the stored payment only if its current
    /// status equals `expected`. `Conflict` otherwise, `NotFound` if absent.
    async fn update_if_status(&self, payment: Payment, expected: PaymentStatus) -> Result<()>;

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn find_by_order_ref(&self, order_ref: &str) -> Result<Option<Payment>>;
    async fn find_pending(&self, student: ActorId, course: CourseId) -> Result<Option<Payment>>;
    async fn all(&self) -> Result<Vec<Payment>>;
}

/// Result of an idempotent enrollment grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// First completed enrollment for this (student, course).
    Granted,
    /// An enrollment existed but its status/method was refreshed.
    Updated,
    /// A completed enrollment with the same method already existed.
    Unchanged,
}

/// Enrollment projection storage. Written only by the enrollment projector.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Idempotent upsert to a completed enrollment. Reports whether the
    /// grant was new so the caller can bump aggregates exactly once.
    async fn grant(
        &self,
        student: ActorId,
        course: CourseId,
        method: super::payment::PaymentMethod,
        at: DateTime<Utc>,
    ) -> Result<GrantOutcome>;

    async fn get(&self, student: ActorId, course: CourseId) -> Result<Option<Enrollment>>;
    async fn has_completed(&self, student: ActorId, course: CourseId) -> Result<bool>;
    async fn completed_courses(&self, student: ActorId) -> Result<Vec<CourseId>>;

    /// Per-course enrolled-student counter, incremented by the projector
    /// exactly once per granted enrollment.
    async fn increment_enrolled(&self, course: CourseId) -> Result<u64>;
    async fn enrolled_count(&self, course: CourseId) -> Result<u64>;

    async fn all(&self) -> Result<Vec<Enrollment>>;
}

/// Test storage.
#[async_trait]
pub trait TestStore: Send + Sync {
    async fn allocate_id(&self) -> Result<TestId>;
    async fn insert(&self, test: Test) -> Result<()>;
    async fn update(&self, test: Test) -> Result<()>;
    async fn get(&self, id: TestId) -> Result<Option<Test>>;
}

/// Attempt storage. Append-only.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Atomically counts prior attempts for (test, student), fails
    /// `Conflict` when the quota is spent, and otherwise persists the
    /// attempt with the next 1-based `attempt_number`. Two concurrent calls
    /// racing for the last slot produce exactly one success.
    async fn append(&self, attempt: NewAttempt, max_attempts: u32) -> Result<Attempt>;

    async fn count(&self, test: TestId, student: ActorId) -> Result<u32>;
    async fn has_attempts(&self, test: TestId) -> Result<bool>;
    async fn get(&self, id: AttemptId) -> Result<Option<Attempt>>;
    async fn all(&self) -> Result<Vec<Attempt>>;
}

/// The external payment gateway collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a gateway order; called before any local write so a timeout
    /// leaves no dangling ledger entry.
    async fn create_order(&self, amount: Decimal, currency: &str, receipt: &str)
    -> Result<String>;

    /// Recomputes the gateway signature for (order, payment) and compares.
    async fn signature_valid(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> Result<bool>;
}

/// Events worth an email. Delivery is best-effort: a failing notifier never
/// rolls back the state transition that produced the event.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    EnrollmentGranted { student: ActorId, course: CourseId },
    PaymentApproved { payment: PaymentId, student: ActorId },
    PaymentRejected { payment: PaymentId, student: ActorId, reason: String },
    AttemptGraded { attempt: AttemptId, student: ActorId, is_passed: bool },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotifyEvent) -> Result<()>;
}

/// Injectable time source so availability windows are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type ActorStoreRef = Arc<dyn ActorStore>;
pub type CourseStoreRef = Arc<dyn CourseStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type EnrollmentStoreRef = Arc<dyn EnrollmentStore>;
pub type TestStoreRef = Arc<dyn TestStore>;
pub type AttemptStoreRef = Arc<dyn AttemptStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type ClockRef = Arc<dyn Clock>;

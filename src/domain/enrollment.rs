use super::ids::{ActorId, CourseId};
use super::payment::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Completed,
    Failed,
}

/// The derived grant of course access. At most one completed enrollment may
/// exist per (student, course); it is the sole gate for assessment access and
/// is only ever written by the enrollment projector.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Enrollment {
    pub student: ActorId,
    pub course: CourseId,
    pub payment_status: EnrollmentStatus,
    pub payment_method: PaymentMethod,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn grants_access(&self) -> bool {
        self.payment_status == EnrollmentStatus::Completed
    }
}

/// Outcome half of a settlement: a payment reached a terminal status.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Completed,
    Failed,
}

/// Emitted by the payment ledger when a payment settles; consumed by the
/// enrollment projector. Replay-safe: applying the same event twice leaves
/// enrollment state and counters unchanged.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SettlementEvent {
    pub student: ActorId,
    pub course: CourseId,
    pub method: PaymentMethod,
    pub outcome: SettlementOutcome,
    pub settled_at: DateTime<Utc>,
}

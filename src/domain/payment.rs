use super::ids::{ActorId, CourseId, PaymentId};
use crate::error::{CoreError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A positive monetary amount.
///
/// Wrapper around `rust_decimal::Decimal` so ledger entries can never carry a
/// zero or negative charge.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CoreError::Validation("amount must be positive".to_string()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    /// Terminal statuses are immutable except for the explicit
    /// completed-to-refunded transition.
    pub fn is_terminal(&self) -> bool {
        *self != Self::Pending
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Online,
    Offline,
}

/// Events that may move a payment between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    Settle,
    Fail,
    Cancel,
    Refund,
}

/// The allow-list of legal status transitions. Every pair not listed here is
/// a `Conflict`; there is no other way to change a payment's status.
pub fn transition(current: PaymentStatus, event: PaymentEvent) -> Result<PaymentStatus> {
    use PaymentEvent::*;
    use PaymentStatus::*;
    match (current, event) {
        (Pending, Settle) => Ok(Completed),
        (Pending, Fail) => Ok(Failed),
        (Pending, Cancel) => Ok(Cancelled),
        (Completed, Refund) => Ok(Refunded),
        (status, event) => Err(CoreError::Conflict(format!(
            "payment transition {event:?} not allowed from status {status:?}"
        ))),
    }
}

/// Gateway references for the online path.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct GatewayDetails {
    pub order_ref: String,
    pub gateway_payment_ref: Option<String>,
    pub signature: Option<String>,
}

/// Bank-transfer evidence for the offline path.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OfflineEvidence {
    pub bank_name: String,
    pub transaction_id: String,
    pub transaction_date: NaiveDate,
    pub evidence_ref: String,
    pub notes: Option<String>,
}

impl OfflineEvidence {
    pub fn validate(&self) -> Result<()> {
        if self.bank_name.trim().is_empty() {
            return Err(CoreError::Validation("bank name is required".to_string()));
        }
        if self.transaction_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "bank transaction id is required".to_string(),
            ));
        }
        if self.evidence_ref.trim().is_empty() {
            return Err(CoreError::Validation(
                "payment evidence reference is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A ledger entry. Created pending, moved exactly once to a terminal status
/// through [`transition`]; the stamp fields record who settled it and why.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub student: ActorId,
    pub course: CourseId,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub gateway: Option<GatewayDetails>,
    pub offline: Option<OfflineEvidence>,
    pub approved_by: Option<ActorId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<ActorId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new_online(
        id: PaymentId,
        student: ActorId,
        course: CourseId,
        amount: Amount,
        order_ref: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student,
            course,
            amount,
            method: PaymentMethod::Online,
            status: PaymentStatus::Pending,
            gateway: Some(GatewayDetails {
                order_ref,
                gateway_payment_ref: None,
                signature: None,
            }),
            offline: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            created_at,
        }
    }

    pub fn new_offline(
        id: PaymentId,
        student: ActorId,
        course: CourseId,
        amount: Amount,
        evidence: OfflineEvidence,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student,
            course,
            amount,
            method: PaymentMethod::Offline,
            status: PaymentStatus::Pending,
            gateway: None,
            offline: Some(evidence),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            created_at,
        }
    }

    pub fn order_ref(&self) -> Option<&str> {
        self.gateway.as_ref().map(|g| g.order_ref.as_str())
    }

    /// Settles the online payment, recording the gateway payment reference
    /// and signature that verified.
    pub fn settle_online(&mut self, payment_ref: String, signature: String) -> Result<()> {
        self.status = transition(self.status, PaymentEvent::Settle)?;
        if let Some(gateway) = self.gateway.as_mut() {
            gateway.gateway_payment_ref = Some(payment_ref);
            gateway.signature = Some(signature);
        }
        Ok(())
    }

    pub fn approve(&mut self, approver: ActorId, at: DateTime<Utc>) -> Result<()> {
        self.status = transition(self.status, PaymentEvent::Settle)?;
        self.approved_by = Some(approver);
        self.approved_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, rejecter: ActorId, at: DateTime<Utc>, reason: String) -> Result<()> {
        self.status = transition(self.status, PaymentEvent::Fail)?;
        self.rejected_by = Some(rejecter);
        self.rejected_at = Some(at);
        self.rejection_reason = Some(reason);
        Ok(())
    }

    pub fn fail(&mut self) -> Result<()> {
        self.status = transition(self.status, PaymentEvent::Fail)?;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.status = transition(self.status, PaymentEvent::Cancel)?;
        Ok(())
    }

    pub fn refund(&mut self) -> Result<()> {
        self.status = transition(self.status, PaymentEvent::Refund)?;
        Ok(())
    }
}

use crate::domain::ports::PaymentGateway;
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-process stand-in for the hosted payment gateway.
///
/// Orders live in memory; the signature over (order, payment) is the
/// hex-encoded SHA-256 of `secret || order_ref || payment_ref`, the same
/// scheme the real gateway would compute on its side. Verification recomputes
/// and compares, so a tampered or cross-wired signature fails closed.
pub struct MockGateway {
    secret: String,
    orders: Mutex<HashMap<String, Decimal>>,
    next_order: AtomicU64,
    fail_orders: bool,
}

impl MockGateway {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            orders: Mutex::new(HashMap::new()),
            next_order: AtomicU64::new(1),
            fail_orders: false,
        }
    }

    /// A gateway whose `create_order` always errors, for exercising the
    /// unreachable-gateway path.
    pub fn unreachable() -> Self {
        Self {
            fail_orders: true,
            ..Self::new("unused")
        }
    }

    fn compute_signature(&self, order_ref: &str, payment_ref: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(order_ref.as_bytes());
        hasher.update(payment_ref.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// What the gateway would send in its webhook: the valid signature for a
    /// given (order, payment) pair. Test helper.
    pub fn sign(&self, order_ref: &str, payment_ref: &str) -> String {
        self.compute_signature(order_ref, payment_ref)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        amount: Decimal,
        _currency: &str,
        _receipt: &str,
    ) -> Result<String> {
        if self.fail_orders {
            return Err(CoreError::ExternalService(
                "payment gateway unreachable".to_string(),
            ));
        }
        let order_ref = format!("order_{}", self.next_order.fetch_add(1, Ordering::Relaxed));
        self.orders
            .lock()
            .expect("gateway order lock poisoned")
            .insert(order_ref.clone(), amount);
        Ok(order_ref)
    }

    async fn signature_valid(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> Result<bool> {
        Ok(self.compute_signature(order_ref, payment_ref) == signature)
    }
}

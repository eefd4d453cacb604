use crate::domain::attempt::{Attempt, NewAttempt};
use crate::domain::enrollment::{Enrollment, EnrollmentStatus};
use crate::domain::ids::{ActorId, AttemptId, CourseId, PaymentId, TestId};
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::{
    AttemptStore, EnrollmentStore, GrantOutcome, PaymentStore, TestStore,
};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payments.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for enrollments.
pub const CF_ENROLLMENTS: &str = "enrollments";
/// Column Family for tests.
pub const CF_TESTS: &str = "tests";
/// Column Family for attempts.
pub const CF_ATTEMPTS: &str = "attempts";
/// Column Family for sequences and counters.
pub const CF_META: &str = "meta";

/// A persistent store implementation using RocksDB.
///
/// Entities are stored as JSON values under big-endian integer keys in one
/// Column Family each. RocksDB gives durability but not multi-key
/// transactions, so the conditional operations (`create_pending`,
/// `update_if_status`, `append`, `grant`) serialize through a single write
/// gate; point reads go straight to the DB.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_PAYMENTS, CF_ENROLLMENTS, CF_TESTS, CF_ATTEMPTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            CoreError::Internal(Box::new(std::io::Error::other(format!(
                "column family {name} not found"
            ))))
        })
    }

    fn put_json<T: serde::Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key, bytes)?;
        Ok(())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Bumps and returns a named sequence. Callers hold the write gate.
    fn next_seq(&self, name: &str) -> Result<u64> {
        let key = format!("seq_{name}");
        let current = self
            .get_json::<u64>(CF_META, key.as_bytes())?
            .unwrap_or(0);
        let next = current + 1;
        self.put_json(CF_META, key.as_bytes(), &next)?;
        Ok(next)
    }

    fn enrollment_key(student: ActorId, course: CourseId) -> [u8; 8] {
        let mut key = [0u8; 8];
        key[..4].copy_from_slice(&student.0.to_be_bytes());
        key[4..].copy_from_slice(&course.0.to_be_bytes());
        key
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn allocate_id(&self) -> Result<PaymentId> {
        let _gate = self.write_gate.lock().await;
        Ok(PaymentId(self.next_seq("payment")?))
    }

    async fn create_pending(&self, payment: Payment) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let existing: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        let duplicate = existing.iter().any(|p| {
            p.student == payment.student
                && p.course == payment.course
                && p.status == PaymentStatus::Pending
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "a pending payment already exists for student {} and course {}",
                payment.student, payment.course
            )));
        }
        self.put_json(CF_PAYMENTS, &payment.id.0.to_be_bytes(), &payment)
    }

    async fn update_if_status(&self, payment: Payment, expected: PaymentStatus) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let key = payment.id.0.to_be_bytes();
        let current: Payment = self
            .get_json(CF_PAYMENTS, &key)?
            .ok_or_else(|| CoreError::NotFound(format!("payment {}", payment.id)))?;
        if current.status != expected {
            return Err(CoreError::Conflict(format!(
                "payment {} is {:?}, expected {:?}",
                payment.id, current.status, expected
            )));
        }
        self.put_json(CF_PAYMENTS, &key, &payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, &id.0.to_be_bytes())
    }

    async fn find_by_order_ref(&self, order_ref: &str) -> Result<Option<Payment>> {
        let all: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        Ok(all.into_iter().find(|p| p.order_ref() == Some(order_ref)))
    }

    async fn find_pending(&self, student: ActorId, course: CourseId) -> Result<Option<Payment>> {
        let all: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        Ok(all.into_iter().find(|p| {
            p.student == student && p.course == course && p.status == PaymentStatus::Pending
        }))
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        let mut all: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        all.sort_by_key(|p| p.id);
        Ok(all)
    }
}

#[async_trait]
impl EnrollmentStore for RocksDBStore {
    async fn grant(
        &self,
        student: ActorId,
        course: CourseId,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> Result<GrantOutcome> {
        let _gate = self.write_gate.lock().await;
        let key = Self::enrollment_key(student, course);
        match self.get_json::<Enrollment>(CF_ENROLLMENTS, &key)? {
            None => {
                let enrollment = Enrollment {
                    student,
                    course,
                    payment_status: EnrollmentStatus::Completed,
                    payment_method: method,
                    enrolled_at: at,
                };
                self.put_json(CF_ENROLLMENTS, &key, &enrollment)?;
                Ok(GrantOutcome::Granted)
            }
            Some(mut existing) => {
                if existing.payment_status == EnrollmentStatus::Completed
                    && existing.payment_method == method
                {
                    Ok(GrantOutcome::Unchanged)
                } else {
                    existing.payment_status = EnrollmentStatus::Completed;
                    existing.payment_method = method;
                    self.put_json(CF_ENROLLMENTS, &key, &existing)?;
                    Ok(GrantOutcome::Updated)
                }
            }
        }
    }

    async fn get(&self, student: ActorId, course: CourseId) -> Result<Option<Enrollment>> {
        self.get_json(CF_ENROLLMENTS, &Self::enrollment_key(student, course))
    }

    async fn has_completed(&self, student: ActorId, course: CourseId) -> Result<bool> {
        Ok(EnrollmentStore::get(self, student, course)
            .await?
            .is_some_and(|e| e.grants_access()))
    }

    async fn completed_courses(&self, student: ActorId) -> Result<Vec<CourseId>> {
        let all: Vec<Enrollment> = self.scan(CF_ENROLLMENTS)?;
        Ok(all
            .into_iter()
            .filter(|e| e.student == student && e.grants_access())
            .map(|e| e.course)
            .collect())
    }

    async fn increment_enrolled(&self, course: CourseId) -> Result<u64> {
        let _gate = self.write_gate.lock().await;
        let key = format!("enrolled_{course}");
        let next = self
            .get_json::<u64>(CF_META, key.as_bytes())?
            .unwrap_or(0)
            + 1;
        self.put_json(CF_META, key.as_bytes(), &next)?;
        Ok(next)
    }

    async fn enrolled_count(&self, course: CourseId) -> Result<u64> {
        let key = format!("enrolled_{course}");
        Ok(self.get_json::<u64>(CF_META, key.as_bytes())?.unwrap_or(0))
    }

    async fn all(&self) -> Result<Vec<Enrollment>> {
        let mut all: Vec<Enrollment> = self.scan(CF_ENROLLMENTS)?;
        all.sort_by_key(|e| (e.student, e.course));
        Ok(all)
    }
}

#[async_trait]
impl TestStore for RocksDBStore {
    async fn allocate_id(&self) -> Result<TestId> {
        let _gate = self.write_gate.lock().await;
        Ok(TestId(self.next_seq("test")? as u32))
    }

    async fn insert(&self, test: crate::domain::assessment::Test) -> Result<()> {
        self.put_json(CF_TESTS, &test.id.0.to_be_bytes(), &test)
    }

    async fn update(&self, test: crate::domain::assessment::Test) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        let key = test.id.0.to_be_bytes();
        if self
            .get_json::<crate::domain::assessment::Test>(CF_TESTS, &key)?
            .is_none()
        {
            return Err(CoreError::NotFound(format!("test {}", test.id)));
        }
        self.put_json(CF_TESTS, &key, &test)
    }

    async fn get(&self, id: TestId) -> Result<Option<crate::domain::assessment::Test>> {
        self.get_json(CF_TESTS, &id.0.to_be_bytes())
    }
}

#[async_trait]
impl AttemptStore for RocksDBStore {
    async fn append(&self, attempt: NewAttempt, max_attempts: u32) -> Result<Attempt> {
        let _gate = self.write_gate.lock().await;
        let all: Vec<Attempt> = self.scan(CF_ATTEMPTS)?;
        let used = all
            .iter()
            .filter(|a| a.test == attempt.test && a.student == attempt.student)
            .count() as u32;
        if used >= max_attempts {
            return Err(CoreError::Conflict(format!(
                "attempt quota exhausted for test {} and student {} ({used}/{max_attempts})",
                attempt.test, attempt.student
            )));
        }

        let id = AttemptId(self.next_seq("attempt")?);
        let stored = Attempt::from_grade_sheet(
            id,
            attempt.test,
            attempt.student,
            attempt.course,
            attempt.sheet,
            attempt.time_taken_secs,
            used + 1,
            attempt.submitted_at,
        );
        self.put_json(CF_ATTEMPTS, &id.0.to_be_bytes(), &stored)?;
        Ok(stored)
    }

    async fn count(&self, test: TestId, student: ActorId) -> Result<u32> {
        let all: Vec<Attempt> = self.scan(CF_ATTEMPTS)?;
        Ok(all
            .iter()
            .filter(|a| a.test == test && a.student == student)
            .count() as u32)
    }

    async fn has_attempts(&self, test: TestId) -> Result<bool> {
        let all: Vec<Attempt> = self.scan(CF_ATTEMPTS)?;
        Ok(all.iter().any(|a| a.test == test))
    }

    async fn get(&self, id: AttemptId) -> Result<Option<Attempt>> {
        self.get_json(CF_ATTEMPTS, &id.0.to_be_bytes())
    }

    async fn all(&self) -> Result<Vec<Attempt>> {
        let mut all: Vec<Attempt> = self.scan(CF_ATTEMPTS)?;
        all.sort_by_key(|a| a.id);
        Ok(all)
    }
}

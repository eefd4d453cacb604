use crate::domain::actor::Actor;
use crate::domain::assessment::Test;
use crate::domain::attempt::{Attempt, NewAttempt};
use crate::domain::course::Course;
use crate::domain::enrollment::{Enrollment, EnrollmentStatus};
use crate::domain::ids::{ActorId, AttemptId, CourseId, PaymentId, TestId};
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::{
    ActorStore, AttemptStore, CourseStore, EnrollmentStore, GrantOutcome, PaymentStore, TestStore,
};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory actor directory.
#[derive(Default, Clone)]
pub struct InMemoryActorStore {
    actors: Arc<RwLock<HashMap<ActorId, Actor>>>,
}

impl InMemoryActorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActorStore for InMemoryActorStore {
    async fn get(&self, id: ActorId) -> Result<Option<Actor>> {
        Ok(self.actors.read().await.get(&id).cloned())
    }

    async fn insert(&self, actor: Actor) -> Result<()> {
        self.actors.write().await.insert(actor.id, actor);
        Ok(())
    }
}

/// In-memory course catalog.
#[derive(Default, Clone)]
pub struct InMemoryCourseStore {
    courses: Arc<RwLock<HashMap<CourseId, Course>>>,
}

impl InMemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for InMemoryCourseStore {
    async fn get(&self, id: CourseId) -> Result<Option<Course>> {
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn insert(&self, course: Course) -> Result<()> {
        self.courses.write().await.insert(course.id, course);
        Ok(())
    }
}

/// Thread-safe in-memory payment ledger storage.
///
/// The write lock is the serialization point: `create_pending` and
/// `update_if_status` run their check and their write inside one critical
/// section, which is what makes the one-pending-payment and
/// transition-only-from-pending invariants hold under concurrent callers.
#[derive(Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            payments: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn allocate_id(&self) -> Result<PaymentId> {
        Ok(PaymentId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    async fn create_pending(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        let duplicate = payments.values().any(|p| {
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
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn update_if_status(&self, payment: Payment, expected: PaymentStatus) -> Result<()> {
        let mut payments = self.payments.write().await;
        let current = payments
            .get(&payment.id)
            .ok_or_else(|| CoreError::NotFound(format!("payment {}", payment.id)))?;
        if current.status != expected {
            return Err(CoreError::Conflict(format!(
                "payment {} is {:?}, expected {:?}",
                payment.id, current.status, expected
            )));
        }
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn find_by_order_ref(&self, order_ref: &str) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.order_ref() == Some(order_ref))
            .cloned())
    }

    async fn find_pending(&self, student: ActorId, course: CourseId) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| {
                p.student == student && p.course == course && p.status == PaymentStatus::Pending
            })
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        let mut all: Vec<Payment> = self.payments.read().await.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }
}

#[derive(Default)]
struct EnrollmentState {
    enrollments: HashMap<(ActorId, CourseId), Enrollment>,
    counters: HashMap<CourseId, u64>,
}

/// Thread-safe in-memory enrollment projection storage.
#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    state: Arc<RwLock<EnrollmentState>>,
}

impl InMemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn grant(
        &self,
        student: ActorId,
        course: CourseId,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> Result<GrantOutcome> {
        let mut state = self.state.write().await;
        match state.enrollments.get_mut(&(student, course)) {
            None => {
                state.enrollments.insert(
                    (student, course),
                    Enrollment {
                        student,
                        course,
                        payment_status: EnrollmentStatus::Completed,
                        payment_method: method,
                        enrolled_at: at,
                    },
                );
                Ok(GrantOutcome::Granted)
            }
            Some(existing) => {
                if existing.payment_status == EnrollmentStatus::Completed
                    && existing.payment_method == method
                {
                    Ok(GrantOutcome::Unchanged)
                } else {
                    existing.payment_status = EnrollmentStatus::Completed;
                    existing.payment_method = method;
                    Ok(GrantOutcome::Updated)
                }
            }
        }
    }

    async fn get(&self, student: ActorId, course: CourseId) -> Result<Option<Enrollment>> {
        Ok(self
            .state
            .read()
            .await
            .enrollments
            .get(&(student, course))
            .cloned())
    }

    async fn has_completed(&self, student: ActorId, course: CourseId) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .enrollments
            .get(&(student, course))
            .is_some_and(Enrollment::grants_access))
    }

    async fn completed_courses(&self, student: ActorId) -> Result<Vec<CourseId>> {
        Ok(self
            .state
            .read()
            .await
            .enrollments
            .values()
            .filter(|e| e.student == student && e.grants_access())
            .map(|e| e.course)
            .collect())
    }

    async fn increment_enrolled(&self, course: CourseId) -> Result<u64> {
        let mut state = self.state.write().await;
        let counter = state.counters.entry(course).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn enrolled_count(&self, course: CourseId) -> Result<u64> {
        Ok(*self.state.read().await.counters.get(&course).unwrap_or(&0))
    }

    async fn all(&self) -> Result<Vec<Enrollment>> {
        let mut all: Vec<Enrollment> = self
            .state
            .read()
            .await
            .enrollments
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|e| (e.student, e.course));
        Ok(all)
    }
}

/// Thread-safe in-memory test storage.
#[derive(Clone)]
pub struct InMemoryTestStore {
    tests: Arc<RwLock<HashMap<TestId, Test>>>,
    next_id: Arc<AtomicU32>,
}

impl InMemoryTestStore {
    pub fn new() -> Self {
        Self {
            tests: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }
}

#[async_trait]
impl TestStore for InMemoryTestStore {
    async fn allocate_id(&self) -> Result<TestId> {
        Ok(TestId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    async fn insert(&self, test: Test) -> Result<()> {
        self.tests.write().await.insert(test.id, test);
        Ok(())
    }

    async fn update(&self, test: Test) -> Result<()> {
        let mut tests = self.tests.write().await;
        if !tests.contains_key(&test.id) {
            return Err(CoreError::NotFound(format!("test {}", test.id)));
        }
        tests.insert(test.id, test);
        Ok(())
    }

    async fn get(&self, id: TestId) -> Result<Option<Test>> {
        Ok(self.tests.read().await.get(&id).cloned())
    }
}

#[derive(Default)]
struct AttemptState {
    by_id: HashMap<AttemptId, Attempt>,
    by_pair: HashMap<(TestId, ActorId), Vec<AttemptId>>,
}

/// Thread-safe in-memory attempt storage.
///
/// `append` counts, checks the quota and assigns the next attempt number
/// inside one write-lock critical section, standing in for the
/// (test, student, attempt_number) uniqueness constraint a relational store
/// would enforce.
#[derive(Clone)]
pub struct InMemoryAttemptStore {
    state: Arc<RwLock<AttemptState>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(AttemptState::default())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn append(&self, attempt: NewAttempt, max_attempts: u32) -> Result<Attempt> {
        let mut state = self.state.write().await;
        let key = (attempt.test, attempt.student);
        let used = state.by_pair.get(&key).map_or(0, |v| v.len()) as u32;
        if used >= max_attempts {
            return Err(CoreError::Conflict(format!(
                "attempt quota exhausted for test {} and student {} ({used}/{max_attempts})",
                attempt.test, attempt.student
            )));
        }

        let id = AttemptId(self.next_id.fetch_add(1, Ordering::Relaxed));
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
        state.by_pair.entry(key).or_default().push(id);
        state.by_id.insert(id, stored.clone());
        Ok(stored)
    }

    async fn count(&self, test: TestId, student: ActorId) -> Result<u32> {
        Ok(self
            .state
            .read()
            .await
            .by_pair
            .get(&(test, student))
            .map_or(0, |v| v.len()) as u32)
    }

    async fn has_attempts(&self, test: TestId) -> Result<bool> {
        Ok(self
            .state
            .read()
            .await
            .by_pair
            .iter()
            .any(|((t, _), ids)| *t == test && !ids.is_empty()))
    }

    async fn get(&self, id: AttemptId) -> Result<Option<Attempt>> {
        Ok(self.state.read().await.by_id.get(&id).cloned())
    }

    async fn all(&self) -> Result<Vec<Attempt>> {
        let mut all: Vec<Attempt> = self.state.read().await.by_id.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }
}

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use coursegate::application::assessments::AssessmentEngine;
use coursegate::application::ledger::PaymentLedger;
use coursegate::application::projector::EnrollmentProjector;
use coursegate::domain::actor::{Actor, Role};
use coursegate::domain::assessment::{
    AnswerInput, Difficulty, Question, QuestionOption, TestSettings,
};
use coursegate::domain::course::Course;
use coursegate::domain::enrollment::{SettlementEvent, SettlementOutcome};
use coursegate::domain::ids::{ActorId, CourseId, OptionId, QuestionId, TestId};
use coursegate::domain::payment::{OfflineEvidence, PaymentMethod};
use coursegate::domain::ports::{ActorStore, CourseStore};
use coursegate::infrastructure::clock::FixedClock;
use coursegate::infrastructure::gateway::MockGateway;
use coursegate::infrastructure::in_memory::{
    InMemoryActorStore, InMemoryAttemptStore, InMemoryCourseStore, InMemoryEnrollmentStore,
    InMemoryPaymentStore, InMemoryTestStore,
};
use coursegate::infrastructure::notifier::RecordingNotifier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const SUPERADMIN: ActorId = ActorId(1);
pub const OWNER: ActorId = ActorId(2);
pub const STUDENT: ActorId = ActorId(10);
pub const COURSE: CourseId = CourseId(1);

/// The full service stack over in-memory stores, with a controllable clock
/// and a recording notifier.
pub struct App {
    pub ledger: Arc<PaymentLedger>,
    pub engine: Arc<AssessmentEngine>,
    pub projector: Arc<EnrollmentProjector>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub enrollments: Arc<InMemoryEnrollmentStore>,
    pub tests: Arc<InMemoryTestStore>,
    pub attempts: Arc<InMemoryAttemptStore>,
    pub actors: Arc<InMemoryActorStore>,
    pub courses: Arc<InMemoryCourseStore>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
}

pub fn app() -> App {
    build(Arc::new(MockGateway::new("test-secret")))
}

/// Same stack, but every gateway order creation fails.
pub fn app_with_unreachable_gateway() -> App {
    build(Arc::new(MockGateway::unreachable()))
}

fn build(gateway: Arc<MockGateway>) -> App {
    let payments = Arc::new(InMemoryPaymentStore::new());
    let enrollments = Arc::new(InMemoryEnrollmentStore::new());
    let tests = Arc::new(InMemoryTestStore::new());
    let attempts = Arc::new(InMemoryAttemptStore::new());
    let actors = Arc::new(InMemoryActorStore::new());
    let courses = Arc::new(InMemoryCourseStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
    ));

    let projector = Arc::new(EnrollmentProjector::new(
        enrollments.clone(),
        notifier.clone(),
    ));
    let ledger = Arc::new(PaymentLedger::new(
        payments.clone(),
        enrollments.clone(),
        actors.clone(),
        courses.clone(),
        gateway.clone(),
        notifier.clone(),
        projector.clone(),
        clock.clone(),
    ));
    let engine = Arc::new(AssessmentEngine::new(
        tests.clone(),
        attempts.clone(),
        enrollments.clone(),
        actors.clone(),
        courses.clone(),
        notifier.clone(),
        clock.clone(),
    ));

    App {
        ledger,
        engine,
        projector,
        payments,
        enrollments,
        tests,
        attempts,
        actors,
        courses,
        gateway,
        notifier,
        clock,
    }
}

impl App {
    /// Seeds the usual cast: a superadmin, a course owner with one published
    /// course at 2999, and a student.
    pub async fn seed_defaults(&self) {
        self.seed_actor(SUPERADMIN, Role::SuperAdmin).await;
        self.seed_actor(OWNER, Role::CourseOwner).await;
        self.seed_actor(STUDENT, Role::Student).await;
        self.seed_course(COURSE, OWNER, dec!(2999)).await;
    }

    pub async fn seed_actor(&self, id: ActorId, role: Role) {
        self.actors.insert(Actor::new(id, role)).await.unwrap();
    }

    pub async fn seed_course(&self, id: CourseId, instructor: ActorId, price: Decimal) {
        self.courses
            .insert(Course::new(id, instructor, price))
            .await
            .unwrap();
    }

    /// Creates, fills and publishes a test with `count` one-mark questions
    /// where option 1 is always the correct one.
    pub async fn seed_published_test(
        &self,
        course: CourseId,
        creator: ActorId,
        count: u32,
        passing_marks: u32,
        max_attempts: u32,
    ) -> TestId {
        let id = self
            .engine
            .create_test(
                creator,
                course,
                "Midterm",
                TestSettings {
                    passing_marks,
                    max_attempts,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        self.engine
            .update_questions(creator, id, one_mark_questions(count))
            .await
            .unwrap();
        self.engine.publish(creator, id).await.unwrap();
        id
    }

    /// Grants an enrollment directly through the projector, as a settled
    /// payment would.
    pub async fn enroll(&self, student: ActorId, course: CourseId) {
        self.projector
            .apply(&SettlementEvent {
                student,
                course,
                method: PaymentMethod::Online,
                outcome: SettlementOutcome::Completed,
                settled_at: Utc::now(),
            })
            .await
            .unwrap();
    }
}

pub fn one_mark_questions(count: u32) -> Vec<Question> {
    (1..=count)
        .map(|i| Question {
            id: QuestionId(i),
            text: format!("q{i}"),
            options: vec![
                QuestionOption {
                    id: OptionId(1),
                    text: "right".to_string(),
                    is_correct: true,
                },
                QuestionOption {
                    id: OptionId(2),
                    text: "wrong".to_string(),
                    is_correct: false,
                },
            ],
            marks: 1,
            difficulty: Difficulty::Easy,
        })
        .collect()
}

/// Answers the first `correct` questions right and the rest wrong.
pub fn answers(total: u32, correct: u32) -> Vec<AnswerInput> {
    (1..=total)
        .map(|i| AnswerInput {
            question: QuestionId(i),
            selected_option: if i <= correct { OptionId(1) } else { OptionId(2) },
        })
        .collect()
}

pub fn evidence() -> OfflineEvidence {
    OfflineEvidence {
        bank_name: "First Bank".to_string(),
        transaction_id: "TXN-1001".to_string(),
        transaction_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        evidence_ref: "uploads/receipt-1001.png".to_string(),
        notes: Some("paid at branch".to_string()),
    }
}

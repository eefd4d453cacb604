use crate::domain::actor::Role;
use crate::domain::assessment::{AnswerInput, Question, TestSettings};
use crate::domain::ids::{ActorId, CourseId, PaymentId, TestId};
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// Actor seed row.
#[derive(Debug, Deserialize, Clone)]
pub struct ActorSeed {
    pub id: ActorId,
    pub role: Role,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Course seed row.
#[derive(Debug, Deserialize, Clone)]
pub struct CourseSeed {
    pub id: CourseId,
    pub instructor: ActorId,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub published: bool,
}

/// Test seed row: authored and (optionally) published before operations run.
#[derive(Debug, Deserialize, Clone)]
pub struct TestSeed {
    pub course: CourseId,
    pub creator: ActorId,
    pub title: String,
    #[serde(default)]
    pub settings: TestSettingsSeed,
    pub questions: Vec<Question>,
    #[serde(default = "default_true")]
    pub publish: bool,
}

/// Settings with scenario-friendly defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TestSettingsSeed {
    pub duration_mins: Option<u32>,
    pub passing_marks: Option<u32>,
    pub max_attempts: Option<u32>,
    pub show_results: Option<bool>,
    pub show_correct_answers: Option<bool>,
}

impl TestSettingsSeed {
    pub fn into_settings(self) -> TestSettings {
        let defaults = TestSettings::default();
        TestSettings {
            duration_mins: self.duration_mins.unwrap_or(defaults.duration_mins),
            passing_marks: self.passing_marks.unwrap_or(defaults.passing_marks),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            show_results: self.show_results.unwrap_or(defaults.show_results),
            show_correct_answers: self
                .show_correct_answers
                .unwrap_or(defaults.show_correct_answers),
            ..defaults
        }
    }
}

/// One operation to replay against the core.
///
/// Payment ids refer to allocation order (the first created payment is 1).
/// `verify_online` resolves the student's pending order itself and simulates
/// the gateway callback; `forge_signature` exercises the mismatch path.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    InitiateOnline {
        student: ActorId,
        course: CourseId,
    },
    VerifyOnline {
        student: ActorId,
        course: CourseId,
        #[serde(default)]
        forge_signature: bool,
    },
    RequestOffline {
        student: ActorId,
        course: CourseId,
        bank_name: String,
        transaction_id: String,
        transaction_date: NaiveDate,
        evidence_ref: String,
        #[serde(default)]
        notes: Option<String>,
    },
    Approve {
        actor: ActorId,
        payment: PaymentId,
    },
    Reject {
        actor: ActorId,
        payment: PaymentId,
        reason: String,
    },
    Cancel {
        actor: ActorId,
        payment: PaymentId,
    },
    Refund {
        actor: ActorId,
        payment: PaymentId,
    },
    Submit {
        student: ActorId,
        test: TestId,
        answers: Vec<AnswerInput>,
        #[serde(default)]
        time_taken_secs: u32,
    },
}

/// A full scenario file: seed data plus an ordered operation list.
#[derive(Debug, Deserialize, Clone)]
pub struct Scenario {
    #[serde(default)]
    pub actors: Vec<ActorSeed>,
    #[serde(default)]
    pub courses: Vec<CourseSeed>,
    #[serde(default)]
    pub tests: Vec<TestSeed>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Scenario {
    /// Reads a scenario from any `Read` source (e.g. File, Stdin).
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }
}

fn default_true() -> bool {
    true
}

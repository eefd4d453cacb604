use super::ids::{ActorId, CourseId, OptionId, QuestionId, TestId};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct QuestionOption {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub marks: u32,
    pub difficulty: Difficulty,
}

impl Question {
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "question {} has no text",
                self.id
            )));
        }
        if self.options.len() < MIN_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(CoreError::Validation(format!(
                "question {} must have {MIN_OPTIONS}-{MAX_OPTIONS} options, has {}",
                self.id,
                self.options.len()
            )));
        }
        let correct = self.options.iter().filter(|o| o.is_correct).count();
        if correct != 1 {
            return Err(CoreError::Validation(format!(
                "question {} must have exactly one correct option, has {correct}",
                self.id
            )));
        }
        if self.marks == 0 {
            return Err(CoreError::Validation(format!(
                "question {} must be worth at least one mark",
                self.id
            )));
        }
        Ok(())
    }

    pub fn option(&self, id: OptionId) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Presentation and result-disclosure settings, editable at any time.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TestSettings {
    pub duration_mins: u32,
    pub passing_marks: u32,
    pub max_attempts: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub shuffle_questions: bool,
    pub show_results: bool,
    pub show_correct_answers: bool,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            duration_mins: 60,
            passing_marks: 0,
            max_attempts: 1,
            start_date: None,
            end_date: None,
            shuffle_questions: false,
            show_results: true,
            show_correct_answers: false,
        }
    }
}

impl TestSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(CoreError::Validation(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(CoreError::Validation(
                "availability window ends before it starts".to_string(),
            ));
        }
        Ok(())
    }
}

/// A timed, multi-attempt assessment attached to a course.
///
/// `total_marks` is recomputed whenever the question set changes; the
/// question set itself freezes once the first attempt exists (enforced by the
/// assessment engine, which owns the attempt count).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Test {
    pub id: TestId,
    pub course: CourseId,
    pub creator: ActorId,
    pub title: String,
    pub questions: Vec<Question>,
    pub total_marks: u32,
    pub settings: TestSettings,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl Test {
    pub fn new(
        id: TestId,
        course: CourseId,
        creator: ActorId,
        title: String,
        settings: TestSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            id,
            course,
            creator,
            title,
            questions: Vec::new(),
            total_marks: 0,
            settings,
            published: false,
            published_at: None,
        })
    }

    /// Replaces the question set and recomputes `total_marks`.
    pub fn replace_questions(&mut self, questions: Vec<Question>) -> Result<()> {
        for question in &questions {
            question.validate()?;
        }
        let mut seen = std::collections::HashSet::new();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(CoreError::Validation(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
        }
        self.total_marks = questions.iter().map(|q| q.marks).sum();
        self.questions = questions;
        Ok(())
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn publish(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.questions.is_empty() {
            return Err(CoreError::Validation(
                "cannot publish a test with no questions".to_string(),
            ));
        }
        self.published = true;
        self.published_at = Some(at);
        Ok(())
    }

    /// Whether the test accepts submissions at `now`: published and inside
    /// the optional availability window (bounds inclusive).
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if !self.published {
            return false;
        }
        if let Some(start) = self.settings.start_date
            && now < start
        {
            return false;
        }
        if let Some(end) = self.settings.end_date
            && now > end
        {
            return false;
        }
        true
    }
}

/// One answer in a submission: which option the student picked.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct AnswerInput {
    pub question: QuestionId,
    pub selected_option: OptionId,
}

/// Per-question grading outcome.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct GradedAnswer {
    pub question: QuestionId,
    pub selected_option: OptionId,
    pub is_correct: bool,
    pub marks_obtained: u32,
}

/// Result of grading one submission against a test snapshot.
#[derive(Debug, PartialEq, Clone)]
pub struct GradeSheet {
    pub answers: Vec<GradedAnswer>,
    pub total_marks: u32,
    pub marks_obtained: u32,
    pub percentage: u32,
    pub is_passed: bool,
}

/// Deterministic grading: a pure function of the test's question set and the
/// submitted answers. Unknown question or option ids are a validation error;
/// answering the same question twice is too. Unanswered questions score zero.
pub fn grade(test: &Test, answers: &[AnswerInput]) -> Result<GradeSheet> {
    let mut seen = std::collections::HashSet::new();
    let mut graded = Vec::with_capacity(answers.len());
    let mut marks_obtained = 0u32;

    for answer in answers {
        if !seen.insert(answer.question) {
            return Err(CoreError::Validation(format!(
                "question {} answered more than once",
                answer.question
            )));
        }
        let question = test.question(answer.question).ok_or_else(|| {
            CoreError::Validation(format!(
                "question {} does not belong to test {}",
                answer.question, test.id
            ))
        })?;
        let option = question.option(answer.selected_option).ok_or_else(|| {
            CoreError::Validation(format!(
                "option {} does not belong to question {}",
                answer.selected_option, answer.question
            ))
        })?;

        let is_correct = option.is_correct;
        let marks = if is_correct { question.marks } else { 0 };
        marks_obtained += marks;
        graded.push(GradedAnswer {
            question: answer.question,
            selected_option: answer.selected_option,
            is_correct,
            marks_obtained: marks,
        });
    }

    let percentage = if test.total_marks == 0 {
        0
    } else {
        ((marks_obtained as f64 / test.total_marks as f64) * 100.0).round() as u32
    };

    Ok(GradeSheet {
        answers: graded,
        total_marks: test.total_marks,
        marks_obtained,
        percentage,
        is_passed: marks_obtained >= test.settings.passing_marks,
    })
}

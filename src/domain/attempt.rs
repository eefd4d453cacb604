use super::assessment::{GradeSheet, GradedAnswer, Test};
use super::ids::{ActorId, AttemptId, CourseId, OptionId, QuestionId, TestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One graded submission of a test. Append-only: never mutated after
/// creation. `attempt_number` is the 1-based sequence per (test, student),
/// unique and never reused.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Attempt {
    pub id: AttemptId,
    pub test: TestId,
    pub student: ActorId,
    pub course: CourseId,
    pub answers: Vec<GradedAnswer>,
    pub total_marks: u32,
    pub marks_obtained: u32,
    pub percentage: u32,
    pub is_passed: bool,
    pub time_taken_secs: u32,
    pub attempt_number: u32,
    pub submitted_at: DateTime<Utc>,
}

impl Attempt {
    pub fn from_grade_sheet(
        id: AttemptId,
        test: TestId,
        student: ActorId,
        course: CourseId,
        sheet: GradeSheet,
        time_taken_secs: u32,
        attempt_number: u32,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            test,
            student,
            course,
            answers: sheet.answers,
            total_marks: sheet.total_marks,
            marks_obtained: sheet.marks_obtained,
            percentage: sheet.percentage,
            is_passed: sheet.is_passed,
            time_taken_secs,
            attempt_number,
            submitted_at,
        }
    }
}

/// A graded submission waiting for its sequence number. The attempt store
/// assigns `id` and `attempt_number` atomically at write time.
#[derive(Debug, PartialEq, Clone)]
pub struct NewAttempt {
    pub test: TestId,
    pub student: ActorId,
    pub course: CourseId,
    pub sheet: GradeSheet,
    pub time_taken_secs: u32,
    pub submitted_at: DateTime<Utc>,
}

/// One answer as disclosed to a student, shaped by the test's flags.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AnswerView {
    pub question: QuestionId,
    pub selected_option: OptionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<OptionId>,
}

/// The response shape for an attempt.
///
/// Students never see correctness data the test owner disabled: scores require
/// `show_results`, per-answer correct options additionally require
/// `show_correct_answers`. Course owners and superadmins always get the full
/// view.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AttemptView {
    pub id: AttemptId,
    pub test: TestId,
    pub student: ActorId,
    pub attempt_number: u32,
    pub time_taken_secs: u32,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_passed: Option<bool>,
    pub answers: Vec<AnswerView>,
}

impl AttemptView {
    /// Builds the student-facing view honoring the test's disclosure flags.
    pub fn for_student(attempt: &Attempt, test: &Test) -> Self {
        let show_results = test.settings.show_results;
        let show_answers = show_results && test.settings.show_correct_answers;
        Self::shaped(attempt, test, show_results, show_answers)
    }

    /// Full view for the course owner or a superadmin.
    pub fn full(attempt: &Attempt, test: &Test) -> Self {
        Self::shaped(attempt, test, true, true)
    }

    fn shaped(attempt: &Attempt, test: &Test, show_results: bool, show_answers: bool) -> Self {
        let answers = attempt
            .answers
            .iter()
            .map(|a| AnswerView {
                question: a.question,
                selected_option: a.selected_option,
                is_correct: show_results.then_some(a.is_correct),
                marks_obtained: show_results.then_some(a.marks_obtained),
                correct_option: if show_answers {
                    test.question(a.question)
                        .and_then(|q| q.options.iter().find(|o| o.is_correct))
                        .map(|o| o.id)
                } else {
                    None
                },
            })
            .collect();

        Self {
            id: attempt.id,
            test: attempt.test,
            student: attempt.student,
            attempt_number: attempt.attempt_number,
            time_taken_secs: attempt.time_taken_secs,
            submitted_at: attempt.submitted_at,
            total_marks: show_results.then_some(attempt.total_marks),
            marks_obtained: show_results.then_some(attempt.marks_obtained),
            percentage: show_results.then_some(attempt.percentage),
            is_passed: show_results.then_some(attempt.is_passed),
            answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::{
        AnswerInput, Difficulty, Question, QuestionOption, TestSettings, grade,
    };

    fn fixture() -> (Test, Attempt) {
        let mut test = Test::new(
            TestId(1),
            CourseId(1),
            ActorId(2),
            "Quiz".to_string(),
            TestSettings {
                show_results: true,
                show_correct_answers: true,
                ..Default::default()
            },
        )
        .unwrap();
        test.replace_questions(vec![Question {
            id: QuestionId(1),
            text: "q1".to_string(),
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
            marks: 2,
            difficulty: Difficulty::Easy,
        }])
        .unwrap();
        test.publish(Utc::now()).unwrap();

        let sheet = grade(
            &test,
            &[AnswerInput {
                question: QuestionId(1),
                selected_option: OptionId(2),
            }],
        )
        .unwrap();
        let attempt = Attempt::from_grade_sheet(
            AttemptId(1),
            test.id,
            ActorId(10),
            test.course,
            sheet,
            120,
            1,
            Utc::now(),
        );
        (test, attempt)
    }

    #[test]
    fn test_view_discloses_per_flags() {
        let (mut test, attempt) = fixture();

        let view = AttemptView::for_student(&attempt, &test);
        assert_eq!(view.marks_obtained, Some(0));
        assert_eq!(view.answers[0].is_correct, Some(false));
        assert_eq!(view.answers[0].correct_option, Some(OptionId(1)));

        test.settings.show_correct_answers = false;
        let view = AttemptView::for_student(&attempt, &test);
        assert_eq!(view.answers[0].is_correct, Some(false));
        assert_eq!(view.answers[0].correct_option, None);

        test.settings.show_results = false;
        let view = AttemptView::for_student(&attempt, &test);
        assert_eq!(view.marks_obtained, None);
        assert_eq!(view.is_passed, None);
        assert_eq!(view.answers[0].is_correct, None);
        // Selected option is always the student's own input.
        assert_eq!(view.answers[0].selected_option, OptionId(2));
    }

    #[test]
    fn test_full_view_ignores_flags() {
        let (mut test, attempt) = fixture();
        test.settings.show_results = false;
        test.settings.show_correct_answers = false;

        let view = AttemptView::full(&attempt, &test);
        assert_eq!(view.marks_obtained, Some(0));
        assert_eq!(view.answers[0].correct_option, Some(OptionId(1)));
    }
}

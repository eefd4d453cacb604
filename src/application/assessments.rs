use super::notify_best_effort;
use crate::domain::access::{Action, Resource, can_access};
use crate::domain::actor::{Actor, Role};
use crate::domain::assessment::{AnswerInput, Question, Test, TestSettings, grade};
use crate::domain::attempt::{AttemptView, NewAttempt};
use crate::domain::course::Course;
use crate::domain::ids::{ActorId, AttemptId, CourseId, TestId};
use crate::domain::ports::{
    ActorStore, ActorStoreRef, AttemptStore, AttemptStoreRef, ClockRef, CourseStore,
    CourseStoreRef, EnrollmentStore, EnrollmentStoreRef, NotifierRef, NotifyEvent, TestStore,
    TestStoreRef,
};
use crate::error::{CoreError, Result};

/// Owns test publish/availability and attempt submission/grading.
///
/// Enrollment (via the projector's records) is the sole access gate for
/// attempts; the attempt quota is enforced at write time by the store so a
/// race for the last slot accepts exactly one submission.
pub struct AssessmentEngine {
    tests: TestStoreRef,
    attempts: AttemptStoreRef,
    enrollments: EnrollmentStoreRef,
    actors: ActorStoreRef,
    courses: CourseStoreRef,
    notifier: NotifierRef,
    clock: ClockRef,
}

impl AssessmentEngine {
    pub fn new(
        tests: TestStoreRef,
        attempts: AttemptStoreRef,
        enrollments: EnrollmentStoreRef,
        actors: ActorStoreRef,
        courses: CourseStoreRef,
        notifier: NotifierRef,
        clock: ClockRef,
    ) -> Self {
        Self {
            tests,
            attempts,
            enrollments,
            actors,
            courses,
            notifier,
            clock,
        }
    }

    // ---- authoring ----

    pub async fn create_test(
        &self,
        actor: ActorId,
        course: CourseId,
        title: &str,
        settings: TestSettings,
    ) -> Result<TestId> {
        let actor = self.actor(actor).await?;
        let course = self.course(course).await?;
        if !can_access(&actor, Action::Edit, Resource::Course(&course)) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not author tests for course {}",
                actor.id, course.id
            )));
        }

        let id = self.tests.allocate_id().await?;
        let test = Test::new(id, course.id, actor.id, title.to_string(), settings)?;
        self.tests.insert(test).await?;
        tracing::info!(test = %id, course = %course.id, "test created");
        Ok(id)
    }

    /// Replaces the question set (and recomputes total marks). Rejected with
    /// `Conflict` once any attempt references the test: graded history must
    /// stay comparable to the questions it was graded against.
    pub async fn update_questions(
        &self,
        actor: ActorId,
        test: TestId,
        questions: Vec<Question>,
    ) -> Result<()> {
        let (actor, mut test, course) = self.load_for_edit(actor, test).await?;
        if !can_access(
            &actor,
            Action::Edit,
            Resource::Test { test: &test, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not edit test {}",
                actor.id, test.id
            )));
        }
        if self.attempts.has_attempts(test.id).await? {
            return Err(CoreError::Conflict(format!(
                "test {} already has attempts; its questions are locked",
                test.id
            )));
        }

        test.replace_questions(questions)?;
        self.tests.update(test).await
    }

    /// Duration, window, disclosure flags and quota stay editable even after
    /// attempts exist; only the question set freezes.
    pub async fn update_settings(
        &self,
        actor: ActorId,
        test: TestId,
        settings: TestSettings,
    ) -> Result<()> {
        settings.validate()?;
        let (actor, mut test, course) = self.load_for_edit(actor, test).await?;
        if !can_access(
            &actor,
            Action::Edit,
            Resource::Test { test: &test, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not edit test {}",
                actor.id, test.id
            )));
        }
        test.settings = settings;
        self.tests.update(test).await
    }

    pub async fn publish(&self, actor: ActorId, test: TestId) -> Result<()> {
        let (actor, mut test, course) = self.load_for_edit(actor, test).await?;
        if !can_access(
            &actor,
            Action::Edit,
            Resource::Test { test: &test, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not publish test {}",
                actor.id, test.id
            )));
        }
        test.publish(self.clock.now())?;
        let id = test.id;
        self.tests.update(test).await?;
        tracing::info!(test = %id, "test published");
        Ok(())
    }

    // ---- availability & attempts ----

    pub async fn attempts_used(&self, test: TestId, student: ActorId) -> Result<u32> {
        self.attempts.count(test, student).await
    }

    /// Active window AND quota left AND completed enrollment.
    pub async fn can_attempt(&self, test: TestId, student: ActorId) -> Result<bool> {
        let test = self.test(test).await?;
        if !test.is_active(self.clock.now()) {
            return Ok(false);
        }
        if self.attempts.count(test.id, student).await? >= test.settings.max_attempts {
            return Ok(false);
        }
        self.enrollments.has_completed(student, test.course).await
    }

    /// Grades and persists one submission.
    ///
    /// Order of gates: capability (`Forbidden`), availability window
    /// (`Forbidden`), spent quota (`Conflict`), answer validation
    /// (`Validation`), then the atomic quota'd append, which re-checks the
    /// quota under the write lock so a race for the last slot accepts exactly
    /// one submission. Grading itself is a pure function of the test snapshot
    /// and the answers.
    pub async fn submit(
        &self,
        student: ActorId,
        test: TestId,
        answers: &[AnswerInput],
        time_taken_secs: u32,
    ) -> Result<AttemptView> {
        let actor = self.actor(student).await?;
        let test = self.test(test).await?;
        let course = self.course(test.course).await?;

        if !can_access(
            &actor,
            Action::Attempt,
            Resource::Test { test: &test, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not attempt test {}",
                actor.id, test.id
            )));
        }

        let now = self.clock.now();
        if !test.is_active(now) {
            return Err(CoreError::Forbidden(format!(
                "test {} is not accepting submissions",
                test.id
            )));
        }

        if self.attempts.count(test.id, actor.id).await? >= test.settings.max_attempts {
            return Err(CoreError::Conflict(format!(
                "attempt quota exhausted for test {} and student {}",
                test.id, actor.id
            )));
        }

        let sheet = grade(&test, answers)?;
        let attempt = self
            .attempts
            .append(
                NewAttempt {
                    test: test.id,
                    student: actor.id,
                    course: test.course,
                    sheet,
                    time_taken_secs,
                    submitted_at: now,
                },
                test.settings.max_attempts,
            )
            .await?;

        tracing::info!(
            attempt = %attempt.id,
            test = %test.id,
            student = %actor.id,
            number = attempt.attempt_number,
            marks = attempt.marks_obtained,
            "attempt graded"
        );
        notify_best_effort(
            self.notifier.as_ref(),
            NotifyEvent::AttemptGraded {
                attempt: attempt.id,
                student: actor.id,
                is_passed: attempt.is_passed,
            },
        )
        .await;

        Ok(AttemptView::for_student(&attempt, &test))
    }

    /// Graded view of an attempt. The owning student gets the flag-shaped
    /// view; the course owner and superadmins see everything.
    pub async fn attempt_detail(&self, actor: ActorId, attempt: AttemptId) -> Result<AttemptView> {
        let actor = self.actor(actor).await?;
        let attempt = self
            .attempts
            .get(attempt)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("attempt {attempt}")))?;
        let test = self.test(attempt.test).await?;
        let course = self.course(attempt.course).await?;

        if !can_access(
            &actor,
            Action::View,
            Resource::Attempt { attempt: &attempt, course: &course },
        ) {
            return Err(CoreError::Forbidden(format!(
                "actor {} may not view attempt {}",
                actor.id, attempt.id
            )));
        }

        Ok(match actor.role {
            Role::Student => AttemptView::for_student(&attempt, &test),
            Role::CourseOwner | Role::SuperAdmin => AttemptView::full(&attempt, &test),
        })
    }

    // ---- lookups ----

    async fn load_for_edit(
        &self,
        actor: ActorId,
        test: TestId,
    ) -> Result<(Actor, Test, Course)> {
        let actor = self.actor(actor).await?;
        let test = self.test(test).await?;
        let course = self.course(test.course).await?;
        Ok((actor, test, course))
    }

    async fn actor(&self, id: ActorId) -> Result<Actor> {
        let mut actor = self
            .actors
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("actor {id}")))?;
        actor.enrolled_courses = self
            .enrollments
            .completed_courses(id)
            .await?
            .into_iter()
            .collect();
        Ok(actor)
    }

    async fn course(&self, id: CourseId) -> Result<Course> {
        self.courses
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("course {id}")))
    }

    async fn test(&self, id: TestId) -> Result<Test> {
        self.tests
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("test {id}")))
    }
}

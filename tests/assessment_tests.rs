mod common;

use chrono::{TimeZone, Utc};
use common::{COURSE, OWNER, STUDENT, SUPERADMIN, answers, app, one_mark_questions};
use coursegate::domain::actor::Role;
use coursegate::domain::assessment::TestSettings;
use coursegate::domain::ids::{ActorId, OptionId, QuestionId};
use coursegate::error::CoreError;

#[tokio::test]
async fn test_submit_grades_and_records_attempt() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;
    let test = app.seed_published_test(COURSE, OWNER, 5, 3, 3).await;

    let view = app
        .engine
        .submit(STUDENT, test, &answers(5, 3), 420)
        .await
        .unwrap();

    assert_eq!(view.attempt_number, 1);
    assert_eq!(view.marks_obtained, Some(3));
    assert_eq!(view.total_marks, Some(5));
    assert_eq!(view.percentage, Some(60));
    assert_eq!(view.is_passed, Some(true));
    assert_eq!(app.engine.attempts_used(test, STUDENT).await.unwrap(), 1);
}

#[tokio::test]
async fn test_attempt_quota_is_enforced() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 1).await;

    assert!(app.engine.can_attempt(test, STUDENT).await.unwrap());
    app.engine
        .submit(STUDENT, test, &answers(2, 0), 60)
        .await
        .unwrap();

    assert!(!app.engine.can_attempt(test, STUDENT).await.unwrap());
    // A failed score does not buy another try.
    assert!(matches!(
        app.engine.submit(STUDENT, test, &answers(2, 2), 60).await,
        Err(CoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_submit_outside_publish_window() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 3).await;

    // The fixed clock sits at 2024-06-15 12:00.
    app.engine
        .update_settings(
            OWNER,
            test,
            TestSettings {
                passing_marks: 1,
                max_attempts: 3,
                start_date: Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        app.engine.submit(STUDENT, test, &answers(2, 2), 60).await,
        Err(CoreError::Forbidden(_))
    ));

    // The window bounds are inclusive.
    app.engine
        .update_settings(
            OWNER,
            test,
            TestSettings {
                passing_marks: 1,
                max_attempts: 3,
                end_date: Some(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    app.engine
        .submit(STUDENT, test, &answers(2, 2), 60)
        .await
        .unwrap();

    app.clock
        .set(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 1).unwrap());
    assert!(matches!(
        app.engine.submit(STUDENT, test, &answers(2, 2), 60).await,
        Err(CoreError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_submit_requires_enrollment() {
    let app = app();
    app.seed_defaults().await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 3).await;

    assert!(matches!(
        app.engine.submit(STUDENT, test, &answers(2, 2), 60).await,
        Err(CoreError::Forbidden(_))
    ));
    assert_eq!(app.engine.attempts_used(test, STUDENT).await.unwrap(), 0);
}

#[tokio::test]
async fn test_submit_is_student_only() {
    let app = app();
    app.seed_defaults().await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 3).await;

    // Privileged roles can see everything but never sit the test: an owner
    // previewing their own quiz must not leave a graded attempt behind.
    assert!(matches!(
        app.engine.submit(OWNER, test, &answers(2, 2), 60).await,
        Err(CoreError::Forbidden(_))
    ));
    assert!(matches!(
        app.engine.submit(SUPERADMIN, test, &answers(2, 2), 60).await,
        Err(CoreError::Forbidden(_))
    ));
    assert_eq!(app.engine.attempts_used(test, OWNER).await.unwrap(), 0);
    assert_eq!(app.engine.attempts_used(test, SUPERADMIN).await.unwrap(), 0);

    // No attempt was recorded, so the question set is still editable.
    app.engine
        .update_questions(OWNER, test, one_mark_questions(3))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_spent_quota_reported_before_answer_validation() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 1).await;

    app.engine
        .submit(STUDENT, test, &answers(2, 1), 60)
        .await
        .unwrap();

    // With the quota spent, even a malformed sheet reads as Conflict: the
    // quota check runs before the answers are looked at.
    let mut bad = answers(2, 2);
    bad[1].question = QuestionId(99);
    assert!(matches!(
        app.engine.submit(STUDENT, test, &bad, 60).await,
        Err(CoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_submit_rejects_malformed_answers() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 5).await;

    // Unknown question id.
    let mut bad = answers(2, 2);
    bad[1].question = QuestionId(99);
    assert!(matches!(
        app.engine.submit(STUDENT, test, &bad, 60).await,
        Err(CoreError::Validation(_))
    ));

    // Unknown option id.
    let mut bad = answers(2, 2);
    bad[1].selected_option = OptionId(99);
    assert!(matches!(
        app.engine.submit(STUDENT, test, &bad, 60).await,
        Err(CoreError::Validation(_))
    ));

    // Duplicate answer for one question.
    let mut bad = answers(2, 2);
    bad[1].question = QuestionId(1);
    assert!(matches!(
        app.engine.submit(STUDENT, test, &bad, 60).await,
        Err(CoreError::Validation(_))
    ));

    // Validation failures never consume quota.
    assert_eq!(app.engine.attempts_used(test, STUDENT).await.unwrap(), 0);
}

#[tokio::test]
async fn test_questions_lock_after_first_attempt() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;
    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 3).await;

    app.engine
        .submit(STUDENT, test, &answers(2, 1), 60)
        .await
        .unwrap();

    assert!(matches!(
        app.engine
            .update_questions(OWNER, test, one_mark_questions(3))
            .await,
        Err(CoreError::Conflict(_))
    ));

    // Settings changes stay open.
    app.engine
        .update_settings(
            OWNER,
            test,
            TestSettings {
                passing_marks: 2,
                max_attempts: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_authoring_requires_ownership() {
    let app = app();
    app.seed_defaults().await;
    app.seed_actor(ActorId(3), Role::CourseOwner).await;

    assert!(matches!(
        app.engine
            .create_test(ActorId(3), COURSE, "Hijack", TestSettings::default())
            .await,
        Err(CoreError::Forbidden(_))
    ));
    assert!(matches!(
        app.engine
            .create_test(STUDENT, COURSE, "Hijack", TestSettings::default())
            .await,
        Err(CoreError::Forbidden(_))
    ));

    let test = app.seed_published_test(COURSE, OWNER, 2, 1, 3).await;
    assert!(matches!(
        app.engine
            .update_settings(ActorId(3), test, TestSettings::default())
            .await,
        Err(CoreError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_publish_requires_questions() {
    let app = app();
    app.seed_defaults().await;

    let test = app
        .engine
        .create_test(OWNER, COURSE, "Empty", TestSettings::default())
        .await
        .unwrap();
    assert!(matches!(
        app.engine.publish(OWNER, test).await,
        Err(CoreError::Validation(_))
    ));

    // An unpublished test cannot be attempted even by an enrolled student.
    app.enroll(STUDENT, COURSE).await;
    app.engine
        .update_questions(OWNER, test, one_mark_questions(2))
        .await
        .unwrap();
    assert!(matches!(
        app.engine.submit(STUDENT, test, &answers(2, 2), 60).await,
        Err(CoreError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_attempt_detail_respects_disclosure_flags() {
    let app = app();
    app.seed_defaults().await;
    app.enroll(STUDENT, COURSE).await;

    let test = app
        .engine
        .create_test(
            OWNER,
            COURSE,
            "Quiz",
            TestSettings {
                passing_marks: 1,
                max_attempts: 3,
                show_results: false,
                show_correct_answers: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    app.engine
        .update_questions(OWNER, test, one_mark_questions(2))
        .await
        .unwrap();
    app.engine.publish(OWNER, test).await.unwrap();

    let submitted = app
        .engine
        .submit(STUDENT, test, &answers(2, 1), 60)
        .await
        .unwrap();
    // With results hidden the student sees only that the attempt exists.
    assert_eq!(submitted.marks_obtained, None);
    assert_eq!(submitted.percentage, None);
    assert_eq!(submitted.is_passed, None);
    assert!(submitted.answers.iter().all(|a| a.is_correct.is_none()));
    assert!(submitted.answers.iter().all(|a| a.correct_option.is_none()));

    let detail = app.engine.attempt_detail(STUDENT, submitted.id).await.unwrap();
    assert_eq!(detail.marks_obtained, None);

    // The course owner always gets the full sheet.
    let full = app.engine.attempt_detail(OWNER, submitted.id).await.unwrap();
    assert_eq!(full.marks_obtained, Some(1));
    assert_eq!(full.total_marks, Some(2));
    assert!(full.answers.iter().all(|a| a.correct_option.is_some()));

    // Other students are kept out entirely.
    app.seed_actor(ActorId(11), Role::Student).await;
    app.enroll(ActorId(11), COURSE).await;
    assert!(matches!(
        app.engine.attempt_detail(ActorId(11), submitted.id).await,
        Err(CoreError::Forbidden(_))
    ));
}

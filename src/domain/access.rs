use super::actor::{Actor, Role};
use super::attempt::Attempt;
use super::course::Course;
use super::payment::Payment;
use crate::domain::assessment::Test;

/// What the actor wants to do with the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Attempt,
    Edit,
    Approve,
    Reject,
    Cancel,
    Refund,
}

/// The resource under evaluation, with just enough context to decide.
/// Plain references only: no store lookup happens inside the check.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Course(&'a Course),
    Test { test: &'a Test, course: &'a Course },
    Payment { payment: &'a Payment, course: &'a Course },
    Attempt { attempt: &'a Attempt, course: &'a Course },
}

impl Resource<'_> {
    fn course(&self) -> &Course {
        match self {
            Resource::Course(course) => course,
            Resource::Test { course, .. } => course,
            Resource::Payment { course, .. } => course,
            Resource::Attempt { course, .. } => course,
        }
    }
}

/// The capability model: one pure function over (actor, action, resource).
///
/// Precedence: inactive actors are denied; attempting is reserved for
/// students acting on their own behalf, whatever the role; superadmins are
/// otherwise always allowed; course owners are allowed on anything attached
/// to a course they instruct; students get the narrow read/attempt/cancel
/// rules below. Every operation in the core runs this before mutating
/// anything.
pub fn can_access(actor: &Actor, action: Action, resource: Resource<'_>) -> bool {
    if !actor.active {
        return false;
    }
    if action == Action::Attempt && actor.role != Role::Student {
        return false;
    }
    match actor.role {
        Role::SuperAdmin => true,
        Role::CourseOwner => resource.course().instructor == actor.id,
        Role::Student => student_rules(actor, action, resource),
    }
}

fn student_rules(actor: &Actor, action: Action, resource: Resource<'_>) -> bool {
    match resource {
        Resource::Course(course) => action == Action::View && course.published,
        Resource::Test { test, course } => {
            matches!(action, Action::View | Action::Attempt)
                && test.published
                && actor.is_enrolled(course.id)
        }
        // Students act on their own payments only, and never as reviewers.
        Resource::Payment { payment, .. } => {
            matches!(action, Action::View | Action::Cancel) && payment.student == actor.id
        }
        Resource::Attempt { attempt, .. } => {
            action == Action::View && attempt.student == actor.id
        }
    }
}

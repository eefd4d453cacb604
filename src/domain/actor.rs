use super::ids::{ActorId, CourseId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    #[serde(rename = "course_owner")]
    CourseOwner,
    #[serde(rename = "superadmin")]
    SuperAdmin,
}

/// The acting identity behind every operation in the core.
///
/// `enrolled_courses` carries the set of courses for which this actor holds a
/// completed enrollment, so capability checks stay pure (no store lookup).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
    pub active: bool,
    #[serde(default)]
    pub enrolled_courses: HashSet<CourseId>,
}

impl Actor {
    pub fn new(id: ActorId, role: Role) -> Self {
        Self {
            id,
            role,
            active: true,
            enrolled_courses: HashSet::new(),
        }
    }

    pub fn is_enrolled(&self, course: CourseId) -> bool {
        self.enrolled_courses.contains(&course)
    }
}

use super::ids::{ActorId, CourseId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Course reference data. The core reads instructor ownership, price and the
/// published flag; everything else about a course lives outside this crate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Course {
    pub id: CourseId,
    pub instructor: ActorId,
    pub price: Decimal,
    pub published: bool,
}

impl Course {
    pub fn new(id: CourseId, instructor: ActorId, price: Decimal) -> Self {
        Self {
            id,
            instructor,
            price,
            published: true,
        }
    }
}

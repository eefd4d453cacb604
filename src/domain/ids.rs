use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $inner:ty) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                Self(v)
            }
        }
    };
}

id_type!(
    /// Identifies an actor (student, course owner or superadmin).
    ActorId,
    u32
);
id_type!(
    /// Identifies a course. Courses are referenced, never mutated, by this core.
    CourseId,
    u32
);
id_type!(
    /// Identifies a payment in the ledger.
    PaymentId,
    u64
);
id_type!(
    /// Identifies a test (a timed, multi-attempt assessment).
    TestId,
    u32
);
id_type!(
    /// Identifies an attempt record.
    AttemptId,
    u64
);
id_type!(
    /// Identifies a question within a test.
    QuestionId,
    u32
);
id_type!(
    /// Identifies an option within a question.
    OptionId,
    u32
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_eq() {
        let a = ActorId(7);
        assert_eq!(a, ActorId::from(7));
        assert_eq!(a.to_string(), "7");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = PaymentId(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: PaymentId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }
}

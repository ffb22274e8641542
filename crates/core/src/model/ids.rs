use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a Course
    CourseId
);
numeric_id!(
    /// Unique identifier for a Module within the catalogue
    ModuleId
);
numeric_id!(
    /// Unique identifier for a ModuleCompletion record
    CompletionId
);
numeric_id!(
    /// Unique identifier for a CourseEnrollment
    EnrollmentId
);
numeric_id!(
    /// Unique identifier for a Learner account
    LearnerId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_id_display() {
        let id = ModuleId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "ModuleId(42)");
    }

    #[test]
    fn course_id_from_str() {
        let id: CourseId = " 123 ".parse().unwrap();
        assert_eq!(id, CourseId::new(123));
    }

    #[test]
    fn learner_id_from_str_invalid() {
        let err = "not-a-number".parse::<LearnerId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse LearnerId from string");
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&EnrollmentId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: CompletionId = serde_json::from_str("9").unwrap();
        assert_eq!(back.value(), 9);
    }
}

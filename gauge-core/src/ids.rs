//! Identifier newtypes.
//!
//! Catalog, session and result identifiers are UUIDv7 so they sort by creation
//! time. Candidate, team and occupation identifiers come from outside the engine
//! and are kept as opaque strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new time-ordered identifier using UUIDv7.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Get the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a competency in the catalog.
    CompetencyId
);
uuid_id!(
    /// Identifier of a behavioral indicator.
    IndicatorId
);
uuid_id!(
    /// Identifier of a question (item).
    QuestionId
);
uuid_id!(
    /// Identifier of an answer option within a question.
    OptionId
);
uuid_id!(
    /// Identifier of a test template.
    TemplateId
);
uuid_id!(
    /// Identifier of one assessment attempt.
    SessionId
);
uuid_id!(
    /// Identifier of a scored result.
    ResultId
);

string_id!(
    /// Identity of the person taking an assessment.
    CandidateId
);
string_id!(
    /// Identifier of a team used by team-fit assembly.
    TeamId
);
string_id!(
    /// Occupational classification code (O*NET SOC, e.g. `15-1252.00`).
    OccupationCode
);

/// UUIDv7 wrapper for time-ordered event IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new time-ordered event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Extract the timestamp embedded in the UUIDv7.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.0.get_timestamp().map(|ts| {
            let (secs, nanos) = ts.to_unix();
            DateTime::from_timestamp(secs as i64, nanos).unwrap_or_else(Utc::now)
        })
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_time_ordered() {
        let first = QuestionId::new();
        let second = QuestionId::new();
        assert!(first < second);
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let id = OccupationCode::new("15-1252.00");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"15-1252.00\"");
    }

    #[test]
    fn event_id_has_timestamp() {
        let id = EventId::new();
        let ts = id.timestamp().expect("v7 carries a timestamp");
        assert!((Utc::now() - ts).num_seconds().abs() < 5);
    }
}

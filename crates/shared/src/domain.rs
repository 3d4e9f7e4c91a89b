use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(SessionId);
id_newtype!(AccountId);
id_newtype!(CourseId);
id_newtype!(UserId);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: raw.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Instructor, Role::Student];

    pub const fn index(self) -> usize {
        match self {
            Role::Admin => 0,
            Role::Instructor => 1,
            Role::Student => 2,
        }
    }

    /// Staff roles see meeting links without a registration record.
    pub const fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Instructor)
    }
}

string_enum!(Role, "role", {
    Admin => "admin",
    Instructor => "instructor",
    Student => "student",
});

/// Lifecycle status as reported by the session catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

string_enum!(BackendStatus, "session status", {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    None,
    Registered,
    Attended,
    Absent,
}

string_enum!(AttendanceStatus, "attendance status", {
    None => "none",
    Registered => "registered",
    Attended => "attended",
    Absent => "absent",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Disabled,
}

string_enum!(AccountStatus, "account status", {
    Active => "active",
    Disabled => "disabled",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_strings_case_insensitively() {
        assert_eq!(
            " In_Progress ".parse::<BackendStatus>(),
            Ok(BackendStatus::InProgress)
        );
        assert_eq!("STUDENT".parse::<Role>(), Ok(Role::Student));
    }

    #[test]
    fn rejects_unknown_role() {
        let err = "owner".parse::<Role>().expect_err("must fail");
        assert_eq!(err.to_string(), "unknown role 'owner'");
    }

    #[test]
    fn role_indices_are_dense() {
        let indices: Vec<usize> = Role::ALL.iter().map(|role| role.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&SessionId(42)).expect("json");
        assert_eq!(json, "42");
    }
}

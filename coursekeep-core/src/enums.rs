//! Enum types for coursekeep records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLES
// ============================================================================

/// Application role granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    Admin,
    Instructor,
    Student,
}

impl AppRole {
    /// All roles, in privilege order.
    pub const ALL: [AppRole; 3] = [AppRole::Admin, AppRole::Instructor, AppRole::Student];

    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Admin => "admin",
            AppRole::Instructor => "instructor",
            AppRole::Student => "student",
        }
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for AppRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(AppRole::Admin),
            "instructor" => Ok(AppRole::Instructor),
            "student" => Ok(AppRole::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// ============================================================================
// RESOURCE KINDS
// ============================================================================

/// The user-scoped relational facts kept in sync with the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Enrollment,
    LessonProgress,
    InstructorFollow,
    SavedPost,
    RoleAssignment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Enrollment,
        ResourceKind::LessonProgress,
        ResourceKind::InstructorFollow,
        ResourceKind::SavedPost,
        ResourceKind::RoleAssignment,
    ];

    /// Remote table holding this resource.
    pub fn table(&self) -> &'static str {
        match self {
            ResourceKind::Enrollment => "enrollments",
            ResourceKind::LessonProgress => "lesson_progress",
            ResourceKind::InstructorFollow => "instructor_follows",
            ResourceKind::SavedPost => "saved_posts",
            ResourceKind::RoleAssignment => "user_roles",
        }
    }

    /// Column carrying the resource key.
    pub fn key_column(&self) -> &'static str {
        match self {
            ResourceKind::Enrollment | ResourceKind::LessonProgress => "course_id",
            ResourceKind::InstructorFollow => "instructor_id",
            ResourceKind::SavedPost => "post_id",
            ResourceKind::RoleAssignment => "role",
        }
    }

    /// Column carrying the secondary key, for resources that have one.
    pub fn sub_key_column(&self) -> Option<&'static str> {
        match self {
            ResourceKind::LessonProgress => Some("lesson_id"),
            _ => None,
        }
    }

    /// Column carrying the creation time.
    pub fn created_column(&self) -> &'static str {
        match self {
            ResourceKind::Enrollment => "enrolled_at",
            ResourceKind::LessonProgress => "completed_at",
            _ => "created_at",
        }
    }

    /// Column carrying the owning user.
    pub fn owner_column(&self) -> &'static str {
        "user_id"
    }

    /// Human-readable noun used in notices and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Enrollment => "enrollment",
            ResourceKind::LessonProgress => "lesson progress",
            ResourceKind::InstructorFollow => "instructor follow",
            ResourceKind::SavedPost => "saved post",
            ResourceKind::RoleAssignment => "role",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Ordering applied to a full fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOrder {
    /// Newest first by the resource's creation column.
    CreatedAtDesc,
    /// Whatever order the remote store returns.
    Unordered,
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Goal lifecycle. Every value except `Archived` counts as active; archiving
/// is one-way and only happens through [`super::repo::archive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    Archived,
}

impl GoalStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "to_do" => Some(Self::ToDo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    pub fn is_archived(self) -> bool {
        self == Self::Archived
    }
}

/// Declared low to high; Postgres orders the enum the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl GoalPriority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A `goals` row joined with its creator's email.
#[derive(Debug, Clone, FromRow)]
pub struct GoalRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    pub due_date: Option<Date>,
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
}

/// Writable columns, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalFields {
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    pub due_date: Option<Date>,
    pub category_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&GoalStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(GoalStatus::parse("to_do"), Some(GoalStatus::ToDo));
        assert_eq!(GoalStatus::parse("ToDo"), None);
        assert_eq!(GoalStatus::default(), GoalStatus::ToDo);
        assert!(GoalStatus::Archived.is_archived());
        assert!(!GoalStatus::Done.is_archived());
    }

    #[test]
    fn priority_wire_names() {
        assert_eq!(serde_json::to_string(&GoalPriority::Critical).unwrap(), "\"critical\"");
        assert_eq!(GoalPriority::parse(" high "), Some(GoalPriority::High));
        assert_eq!(GoalPriority::parse("urgent"), None);
        assert_eq!(GoalPriority::default(), GoalPriority::Medium);
    }
}

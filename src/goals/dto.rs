use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{GoalPriority, GoalRow, GoalStatus};
use crate::auth::dto::PublicUser;
use crate::validate::nullable;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Body for create, PUT and PATCH. Everything arrives optional so that
/// missing or malformed values are reported per field.
#[derive(Debug, Default, Deserialize)]
pub struct GoalRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct GoalResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    #[serde(with = "iso_date::option")]
    pub due_date: Option<Date>,
    pub category: Uuid,
    pub user: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

impl From<GoalRow> for GoalResponse {
    fn from(r: GoalRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            status: r.status,
            priority: r.priority,
            due_date: r.due_date,
            category: r.category_id,
            user: PublicUser {
                id: r.user_id,
                email: r.user_email,
            },
            created: r.created,
            updated: r.updated,
        }
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BoardRole {
    Owner,
    Writer,
    Reader,
}

impl BoardRole {
    /// Owners and writers may add categories and goals.
    pub fn can_write(self) -> bool {
        matches!(self, BoardRole::Owner | BoardRole::Writer)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BoardParticipant {
    pub id: Uuid,
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub role: BoardRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

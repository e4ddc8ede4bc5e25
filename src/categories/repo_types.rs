use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A `goal_categories` row joined with its owner's email.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub title: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub board_id: Uuid,
    pub is_deleted: bool,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
}

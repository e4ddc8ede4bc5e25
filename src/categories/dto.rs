use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::CategoryRow;
use crate::auth::dto::PublicUser;
use crate::validate::nullable;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub board: Option<String>,
}

/// `board` is fixed at creation; only the title can change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    pub ordering: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub title: String,
    pub board: Uuid,
    pub user: PublicUser,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

impl From<CategoryRow> for CategoryResponse {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            board: r.board_id,
            user: PublicUser {
                id: r.user_id,
                email: r.user_email,
            },
            is_deleted: r.is_deleted,
            created: r.created,
            updated: r.updated,
        }
    }
}

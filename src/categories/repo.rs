use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::CategoryRow;
use crate::boards::repo_types::BoardRole;
use crate::listing::{self, OrderTerm, Pagination};

const COLUMNS: &str = "c.id, c.title, c.user_id, u.email AS user_email, c.board_id, \
                       c.is_deleted, c.created, c.updated";

pub const ORDERING_FIELDS: &[(&str, &str)] = &[("title", "c.title"), ("created", "c.created")];
pub const DEFAULT_ORDERING: &[OrderTerm] = &[OrderTerm {
    column: "c.title",
    descending: false,
}];
pub const SEARCH_COLUMNS: &[&str] = &["c.title"];

#[derive(Debug, Default)]
pub struct CategoryListParams<'a> {
    pub ordering: Option<&'a str>,
    pub search: Option<&'a str>,
    pub page: Pagination,
}

/// `SELECT` over the categories `user_id` may see: owned and not deleted.
fn scoped_select(user_id: Uuid) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {COLUMNS} FROM goal_categories c JOIN users u ON u.id = c.user_id WHERE c.user_id = "
    ));
    qb.push_bind(user_id);
    qb.push(" AND NOT c.is_deleted");
    qb
}

pub fn list_query(user_id: Uuid, params: &CategoryListParams<'_>) -> QueryBuilder<'static, Postgres> {
    let mut qb = scoped_select(user_id);
    listing::push_search(&mut qb, listing::search_patterns(params.search), SEARCH_COLUMNS);
    let order = listing::parse_ordering(params.ordering, ORDERING_FIELDS, DEFAULT_ORDERING);
    listing::push_order_by(&mut qb, &order, "c.id");
    listing::push_pagination(&mut qb, params.page);
    qb
}

pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    params: &CategoryListParams<'_>,
) -> anyhow::Result<Vec<CategoryRow>> {
    let rows = list_query(user_id, params)
        .build_query_as::<CategoryRow>()
        .fetch_all(db)
        .await
        .context("list categories")?;
    Ok(rows)
}

pub async fn find_for_user(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<CategoryRow>> {
    let mut qb = scoped_select(user_id);
    qb.push(" AND c.id = ");
    qb.push_bind(id);
    let row = qb
        .build_query_as::<CategoryRow>()
        .fetch_optional(db)
        .await
        .context("find category")?;
    Ok(row)
}

pub async fn insert(db: &PgPool, user_id: Uuid, board_id: Uuid, title: &str) -> anyhow::Result<CategoryRow> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        r#"
        WITH c AS (
            INSERT INTO goal_categories (title, user_id, board_id)
            VALUES ($1, $2, $3)
            RETURNING *
        )
        SELECT {COLUMNS} FROM c JOIN users u ON u.id = c.user_id
        "#
    ))
    .bind(title)
    .bind(user_id)
    .bind(board_id)
    .fetch_one(db)
    .await
    .context("insert category")?;
    Ok(row)
}

/// Updates the title of a category in the caller's scope.
pub async fn update_title(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    title: &str,
) -> anyhow::Result<Option<CategoryRow>> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        r#"
        WITH c AS (
            UPDATE goal_categories
               SET title = $3, updated = now()
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            RETURNING *
        )
        SELECT {COLUMNS} FROM c JOIN users u ON u.id = c.user_id
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(title)
    .fetch_optional(db)
    .await
    .context("update category")?;
    Ok(row)
}

/// Flags the category as deleted; the row stays. Returns the flagged row, or
/// `None` when the category is outside the caller's scope.
pub async fn soft_delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<CategoryRow>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        r#"
        WITH c AS (
            UPDATE goal_categories
               SET is_deleted = TRUE, updated = now()
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted
            RETURNING *
        )
        SELECT {COLUMNS} FROM c JOIN users u ON u.id = c.user_id
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .context("soft delete category")?;

    tx.commit().await.context("commit tx")?;
    Ok(row)
}

/// The caller's role on the board of a non-deleted category, or `None` when
/// the category is gone or the caller does not participate in its board.
pub async fn board_role_for_category(
    db: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
) -> anyhow::Result<Option<BoardRole>> {
    let role = sqlx::query_scalar::<_, BoardRole>(
        r#"
        SELECT p.role
          FROM goal_categories c
          JOIN boards b ON b.id = c.board_id AND NOT b.is_deleted
          JOIN board_participants p ON p.board_id = c.board_id AND p.user_id = $1
         WHERE c.id = $2 AND NOT c.is_deleted
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .fetch_optional(db)
    .await
    .context("category board role")?;
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_scopes_to_owner_and_live_rows() {
        let params = CategoryListParams {
            ordering: Some("-created"),
            search: Some("health"),
            page: Pagination::default(),
        };
        let qb = list_query(Uuid::new_v4(), &params);
        let sql = qb.sql();
        assert!(sql.contains("WHERE c.user_id = $1 AND NOT c.is_deleted"));
        assert!(sql.contains("AND (c.title ILIKE $2)"));
        assert!(sql.ends_with("ORDER BY c.created DESC, c.id ASC"));
    }

    #[test]
    fn list_query_defaults_to_title() {
        let qb = list_query(Uuid::new_v4(), &CategoryListParams::default());
        assert!(qb.sql().ends_with("ORDER BY c.title ASC, c.id ASC"));
        assert!(!qb.sql().contains("ILIKE"));
    }
}

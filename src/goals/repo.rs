use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::filters::GoalFilter;
use super::repo_types::{GoalFields, GoalRow};
use crate::listing::{self, OrderTerm, Pagination};

const COLUMNS: &str = "g.id, g.title, g.description, g.status, g.priority, g.due_date, \
                       g.category_id, g.user_id, u.email AS user_email, g.created, g.updated";

pub const ORDERING_FIELDS: &[(&str, &str)] = &[
    ("title", "g.title"),
    ("created", "g.created"),
    ("due_date", "g.due_date"),
    ("priority", "g.priority"),
];
pub const DEFAULT_ORDERING: &[OrderTerm] = &[OrderTerm {
    column: "g.title",
    descending: false,
}];
pub const SEARCH_COLUMNS: &[&str] = &["g.title", "g.description"];

#[derive(Debug, Default)]
pub struct GoalListParams<'a> {
    pub ordering: Option<&'a str>,
    pub search: Option<&'a str>,
    pub filter: GoalFilter,
    pub page: Pagination,
}

/// A goal is visible to `user_id` when all of these hold:
/// the user participates in the board of the goal's category,
/// the goal is not archived,
/// the category is not deleted.
///
/// Expects `goals` aliased `g` and its category aliased `c`.
pub fn push_visible_to(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid) {
    qb.push("EXISTS (SELECT 1 FROM board_participants p WHERE p.board_id = c.board_id AND p.user_id = ");
    qb.push_bind(user_id);
    qb.push(")");
    qb.push(" AND g.status <> 'archived'");
    qb.push(" AND NOT c.is_deleted");
}

fn visible_select(user_id: Uuid) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {COLUMNS} FROM goals g \
         JOIN goal_categories c ON c.id = g.category_id \
         JOIN users u ON u.id = g.user_id \
         WHERE "
    ));
    push_visible_to(&mut qb, user_id);
    qb
}

pub fn list_query(user_id: Uuid, params: &GoalListParams<'_>) -> QueryBuilder<'static, Postgres> {
    let mut qb = visible_select(user_id);
    params.filter.push_sql(&mut qb);
    listing::push_search(&mut qb, listing::search_patterns(params.search), SEARCH_COLUMNS);
    let order = listing::parse_ordering(params.ordering, ORDERING_FIELDS, DEFAULT_ORDERING);
    listing::push_order_by(&mut qb, &order, "g.id");
    listing::push_pagination(&mut qb, params.page);
    qb
}

pub async fn list_visible(
    db: &PgPool,
    user_id: Uuid,
    params: &GoalListParams<'_>,
) -> anyhow::Result<Vec<GoalRow>> {
    let rows = list_query(user_id, params)
        .build_query_as::<GoalRow>()
        .fetch_all(db)
        .await
        .context("list goals")?;
    Ok(rows)
}

pub async fn find_visible(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<GoalRow>> {
    let mut qb = visible_select(user_id);
    qb.push(" AND g.id = ");
    qb.push_bind(id);
    let row = qb
        .build_query_as::<GoalRow>()
        .fetch_optional(db)
        .await
        .context("find goal")?;
    Ok(row)
}

pub async fn insert(db: &PgPool, user_id: Uuid, fields: &GoalFields) -> anyhow::Result<GoalRow> {
    anyhow::ensure!(!fields.status.is_archived(), "goals cannot be created archived");
    let row = sqlx::query_as::<_, GoalRow>(&format!(
        r#"
        WITH g AS (
            INSERT INTO goals (title, description, status, priority, due_date, category_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
        )
        SELECT {COLUMNS} FROM g JOIN users u ON u.id = g.user_id
        "#
    ))
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.status)
    .bind(fields.priority)
    .bind(fields.due_date)
    .bind(fields.category_id)
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("insert goal")?;
    Ok(row)
}

/// `UPDATE goals g ... FROM goal_categories c` scoped to goals visible to
/// `user_id`, returning the joined row.
fn scoped_update(user_id: Uuid, id: Uuid, set: impl FnOnce(&mut QueryBuilder<'static, Postgres>)) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("WITH changed AS (UPDATE goals g SET ");
    set(&mut qb);
    qb.push(", updated = now() FROM goal_categories c WHERE c.id = g.category_id AND g.id = ");
    qb.push_bind(id);
    qb.push(" AND ");
    push_visible_to(&mut qb, user_id);
    qb.push(format!(
        " RETURNING g.*) SELECT {COLUMNS} FROM changed g JOIN users u ON u.id = g.user_id"
    ));
    qb
}

pub fn update_query(user_id: Uuid, id: Uuid, fields: &GoalFields) -> QueryBuilder<'static, Postgres> {
    let fields = fields.clone();
    scoped_update(user_id, id, move |qb| {
        qb.push("title = ");
        qb.push_bind(fields.title);
        qb.push(", description = ");
        qb.push_bind(fields.description);
        qb.push(", status = ");
        qb.push_bind(fields.status);
        qb.push(", priority = ");
        qb.push_bind(fields.priority);
        qb.push(", due_date = ");
        qb.push_bind(fields.due_date);
        qb.push(", category_id = ");
        qb.push_bind(fields.category_id);
    })
}

/// Writes every field of a visible goal. Never archives: that transition
/// belongs to [`archive`].
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    fields: &GoalFields,
) -> anyhow::Result<Option<GoalRow>> {
    anyhow::ensure!(!fields.status.is_archived(), "goals are archived through archive()");
    let row = update_query(user_id, id, fields)
        .build_query_as::<GoalRow>()
        .fetch_optional(db)
        .await
        .context("update goal")?;
    Ok(row)
}

pub fn archive_query(user_id: Uuid, id: Uuid) -> QueryBuilder<'static, Postgres> {
    scoped_update(user_id, id, |qb| {
        qb.push("status = 'archived'");
    })
}

/// Moves a visible goal to `archived`; the row stays. `None` when the goal
/// is outside the caller's scope (including already archived).
pub async fn archive(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<GoalRow>> {
    let mut tx = db.begin().await.context("begin tx")?;
    let row = archive_query(user_id, id)
        .build_query_as::<GoalRow>()
        .fetch_optional(&mut *tx)
        .await
        .context("archive goal")?;
    tx.commit().await.context("commit tx")?;
    Ok(row)
}

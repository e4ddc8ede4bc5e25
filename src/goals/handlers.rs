use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{GoalRequest, GoalResponse},
    filters::{GoalFilter, GoalListQuery},
    repo::{self, GoalListParams},
    repo_types::GoalRow,
    services::{check_category_access, check_goal_write, resolve_fields, WriteMode},
};
use crate::{
    auth::AuthUser,
    categories,
    error::{ApiError, ApiResult},
    extract::{JsonBody, QueryParams},
    listing::{PageQuery, Pagination},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/goals/goal/create", post(create_goal))
        .route("/goals/goal/list", get(list_goals))
        .route(
            "/goals/goal/:id",
            get(get_goal)
                .put(put_goal)
                .patch(patch_goal)
                .delete(delete_goal),
        )
}

async fn ensure_category_writable(state: &AppState, user_id: Uuid, category_id: Uuid) -> ApiResult<()> {
    let role = categories::repo::board_role_for_category(&state.db, user_id, category_id).await?;
    check_category_access(category_id, role)
}

/// The goal as `user_id` sees it, provided they may also change it.
async fn writable_goal(state: &AppState, user_id: Uuid, id: Uuid) -> ApiResult<GoalRow> {
    let goal = repo::find_visible(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let role = categories::repo::board_role_for_category(&state.db, user_id, goal.category_id).await?;
    if let Err(e) = check_goal_write(role) {
        warn!(%user_id, goal_id = %id, "goal change without write access");
        return Err(e);
    }
    Ok(goal)
}

#[instrument(skip(state, body))]
pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<GoalRequest>,
) -> ApiResult<(StatusCode, Json<GoalResponse>)> {
    let fields = resolve_fields(body, WriteMode::Create)?;
    ensure_category_writable(&state, user_id, fields.category_id).await?;

    let row = repo::insert(&state.db, user_id, &fields).await?;
    info!(%user_id, goal_id = %row.id, category_id = %row.category_id, "goal created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state))]
pub async fn list_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<GoalListQuery>,
    QueryParams(page): QueryParams<PageQuery>,
) -> ApiResult<Json<Vec<GoalResponse>>> {
    let params = GoalListParams {
        ordering: q.ordering.as_deref(),
        search: q.search.as_deref(),
        filter: GoalFilter::from_query(&q)?,
        page: Pagination::from_query(&page)?,
    };
    let rows = repo::list_visible(&state.db, user_id, &params).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GoalResponse>> {
    let row = repo::find_visible(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, body))]
pub async fn put_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<GoalRequest>,
) -> ApiResult<Json<GoalResponse>> {
    update(&state, user_id, id, body, false).await
}

#[instrument(skip(state, body))]
pub async fn patch_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<GoalRequest>,
) -> ApiResult<Json<GoalResponse>> {
    update(&state, user_id, id, body, true).await
}

async fn update(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    body: GoalRequest,
    partial: bool,
) -> ApiResult<Json<GoalResponse>> {
    let current = writable_goal(state, user_id, id).await?;

    let mode = if partial {
        WriteMode::Patch(&current)
    } else {
        WriteMode::Replace(&current)
    };
    let fields = resolve_fields(body, mode)?;
    if fields.category_id != current.category_id {
        ensure_category_writable(state, user_id, fields.category_id).await?;
    }

    let row = repo::update(&state.db, user_id, id, &fields)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(%user_id, goal_id = %id, "goal updated");
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    writable_goal(&state, user_id, id).await?;
    let row = repo::archive(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(%user_id, goal_id = %row.id, "goal archived");
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CategoryListQuery, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest},
    repo::{self, CategoryListParams},
};
use crate::{
    auth::AuthUser,
    boards,
    error::{ApiError, ApiResult, FieldErrors},
    extract::{JsonBody, QueryParams},
    listing::{PageQuery, Pagination},
    state::AppState,
    validate,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/goals/goal_category/create", post(create_category))
        .route("/goals/goal_category/list", get(list_categories))
        .route(
            "/goals/goal_category/:id",
            get(get_category)
                .put(put_category)
                .patch(patch_category)
                .delete(delete_category),
        )
}

#[instrument(skip(state, body))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<CategoryResponse>)> {
    let mut errors = FieldErrors::new();
    let title = validate::required_title(&mut errors, body.title.as_deref());
    let board_id = validate::required_ref(&mut errors, "board", body.board.as_deref());
    errors.into_result()?;
    let Some(board_id) = board_id else {
        return Err(ApiError::field("board", validate::REQUIRED));
    };

    match boards::repo::role_of(&state.db, user_id, board_id).await? {
        Some(role) if role.can_write() => {}
        Some(_) => {
            warn!(%user_id, %board_id, "category create on read-only board");
            return Err(ApiError::field(
                "board",
                "You must be an owner or writer of this board.",
            ));
        }
        None => return Err(ApiError::field("board", "Board not found.")),
    }

    let row = repo::insert(&state.db, user_id, board_id, &title).await?;
    info!(%user_id, category_id = %row.id, "category created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<CategoryListQuery>,
    QueryParams(page): QueryParams<PageQuery>,
) -> ApiResult<Json<Vec<CategoryResponse>>> {
    let params = CategoryListParams {
        ordering: q.ordering.as_deref(),
        search: q.search.as_deref(),
        page: Pagination::from_query(&page)?,
    };
    let rows = repo::list_for_user(&state.db, user_id, &params).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CategoryResponse>> {
    let row = repo::find_for_user(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, body))]
pub async fn put_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateCategoryRequest>,
) -> ApiResult<Json<CategoryResponse>> {
    update(&state, user_id, id, body, false).await
}

#[instrument(skip(state, body))]
pub async fn patch_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<UpdateCategoryRequest>,
) -> ApiResult<Json<CategoryResponse>> {
    update(&state, user_id, id, body, true).await
}

async fn update(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    body: UpdateCategoryRequest,
    partial: bool,
) -> ApiResult<Json<CategoryResponse>> {
    // Scope check first so an invalid body never reveals whether the id exists.
    let current = repo::find_for_user(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let mut errors = FieldErrors::new();
    let raw_title = body.title.as_ref().map(Option::as_deref);
    let title = validate::nullable_title(&mut errors, raw_title, partial);
    errors.into_result()?;

    let Some(title) = title else {
        return Ok(Json(current.into()));
    };
    let row = repo::update_title(&state.db, user_id, id, &title)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(%user_id, category_id = %id, "category updated");
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let row = repo::soft_delete(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(%user_id, category_id = %row.id, "category soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

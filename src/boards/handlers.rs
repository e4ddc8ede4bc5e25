use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{BoardDetails, CreateBoardRequest, ParticipantRequest},
    repo,
    repo_types::{Board, BoardParticipant, BoardRole},
};
use crate::{
    auth::{repo_types::User, AuthUser},
    error::{ApiError, ApiResult, FieldErrors},
    extract::JsonBody,
    state::AppState,
    validate,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/goals/board/create", post(create_board))
        .route("/goals/board/list", get(list_boards))
        .route("/goals/board/:id", get(get_board).delete(delete_board))
        .route("/goals/board/:id/participants", put(put_participant))
}

#[instrument(skip(state, body))]
pub async fn create_board(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    let mut errors = FieldErrors::new();
    let title = validate::required_title(&mut errors, body.title.as_deref());
    errors.into_result()?;

    let board = repo::create_with_owner(&state.db, &title, user_id).await?;
    info!(%user_id, board_id = %board.id, "board created");
    Ok((StatusCode::CREATED, Json(board)))
}

/// The board, provided `user_id` owns it. Other participants get 403 and
/// everyone else 404.
async fn owned_board(state: &AppState, user_id: Uuid, id: Uuid) -> ApiResult<Board> {
    let (board, role) = repo::find_for_user(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if role != BoardRole::Owner {
        warn!(%user_id, board_id = %board.id, "board change by non-owner");
        return Err(ApiError::Forbidden("Only the board owner can change this board".into()));
    }
    Ok(board)
}

#[instrument(skip(state))]
pub async fn list_boards(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<Board>>> {
    Ok(Json(repo::list_for_user(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_board(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardDetails>> {
    let (board, _) = repo::find_for_user(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let participants = repo::list_participants(&state.db, board.id).await?;
    Ok(Json(BoardDetails {
        board,
        participants,
    }))
}

#[instrument(skip(state, body))]
pub async fn put_participant(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<ParticipantRequest>,
) -> ApiResult<Json<BoardParticipant>> {
    let board = owned_board(&state, user_id, id).await?;

    let mut errors = FieldErrors::new();
    let (target, new_role) = match (body.user, body.role) {
        (Some(target), Some(new_role)) => (target, new_role),
        (user, role) => {
            if user.is_none() {
                errors.add("user", validate::REQUIRED);
            }
            if role.is_none() {
                errors.add("role", validate::REQUIRED);
            }
            return Err(ApiError::Validation(errors));
        }
    };
    if new_role == BoardRole::Owner {
        errors.add("role", "The owner role cannot be granted.");
    }
    if target == user_id {
        errors.add("user", "You cannot change your own role.");
    }
    errors.into_result()?;

    if User::find_by_id(&state.db, target).await?.is_none() {
        return Err(ApiError::field("user", "User not found."));
    }

    let participant = repo::upsert_participant(&state.db, board.id, target, new_role).await?;
    info!(%user_id, board_id = %board.id, participant = %target, role = ?new_role, "participant updated");
    Ok(Json(participant))
}

#[instrument(skip(state))]
pub async fn delete_board(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let board = owned_board(&state, user_id, id).await?;
    repo::soft_delete(&state.db, board.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(%user_id, board_id = %board.id, "board soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

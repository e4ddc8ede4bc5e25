use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Board, BoardParticipant, BoardRole};

/// Insert a board and its owner participant in one transaction.
pub async fn create_with_owner(db: &PgPool, title: &str, owner_id: Uuid) -> anyhow::Result<Board> {
    let mut tx = db.begin().await.context("begin tx")?;

    let board = sqlx::query_as::<_, Board>(
        r#"
        INSERT INTO boards (title)
        VALUES ($1)
        RETURNING id, title, is_deleted, created, updated
        "#,
    )
    .bind(title)
    .fetch_one(&mut *tx)
    .await
    .context("insert board")?;

    upsert_participant_tx(&mut tx, board.id, owner_id, BoardRole::Owner).await?;

    tx.commit().await.context("commit tx")?;
    Ok(board)
}

pub async fn upsert_participant_tx(
    tx: &mut Transaction<'_, Postgres>,
    board_id: Uuid,
    user_id: Uuid,
    role: BoardRole,
) -> anyhow::Result<BoardParticipant> {
    let participant = sqlx::query_as::<_, BoardParticipant>(
        r#"
        INSERT INTO board_participants (board_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (board_id, user_id)
        DO UPDATE SET role = EXCLUDED.role, updated = now()
        RETURNING id, board_id, user_id, role, created, updated
        "#,
    )
    .bind(board_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(&mut **tx)
    .await
    .context("upsert board participant")?;
    Ok(participant)
}

pub async fn upsert_participant(
    db: &PgPool,
    board_id: Uuid,
    user_id: Uuid,
    role: BoardRole,
) -> anyhow::Result<BoardParticipant> {
    let mut tx = db.begin().await.context("begin tx")?;
    let participant = upsert_participant_tx(&mut tx, board_id, user_id, role).await?;
    tx.commit().await.context("commit tx")?;
    Ok(participant)
}

/// Marks the board deleted, soft-deletes its categories and archives their
/// goals in one transaction. `None` when the board is already gone.
pub async fn soft_delete(db: &PgPool, board_id: Uuid) -> anyhow::Result<Option<Board>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let board = sqlx::query_as::<_, Board>(
        r#"
        UPDATE boards
           SET is_deleted = TRUE, updated = now()
         WHERE id = $1 AND NOT is_deleted
        RETURNING id, title, is_deleted, created, updated
        "#,
    )
    .bind(board_id)
    .fetch_optional(&mut *tx)
    .await
    .context("soft delete board")?;
    let Some(board) = board else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        UPDATE goals g
           SET status = 'archived', updated = now()
          FROM goal_categories c
         WHERE c.id = g.category_id AND c.board_id = $1 AND g.status <> 'archived'
        "#,
    )
    .bind(board_id)
    .execute(&mut *tx)
    .await
    .context("archive board goals")?;

    sqlx::query(
        r#"
        UPDATE goal_categories
           SET is_deleted = TRUE, updated = now()
         WHERE board_id = $1 AND NOT is_deleted
        "#,
    )
    .bind(board_id)
    .execute(&mut *tx)
    .await
    .context("soft delete board categories")?;

    tx.commit().await.context("commit tx")?;
    Ok(Some(board))
}

/// Non-deleted boards the user participates in, by title.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Board>> {
    let rows = sqlx::query_as::<_, Board>(
        r#"
        SELECT b.id, b.title, b.is_deleted, b.created, b.updated
          FROM boards b
         WHERE NOT b.is_deleted
           AND EXISTS (
                SELECT 1 FROM board_participants p
                 WHERE p.board_id = b.id AND p.user_id = $1
           )
         ORDER BY b.title ASC, b.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list boards for user")?;
    Ok(rows)
}

/// The board plus the requester's role, if the requester participates.
pub async fn find_for_user(
    db: &PgPool,
    user_id: Uuid,
    board_id: Uuid,
) -> anyhow::Result<Option<(Board, BoardRole)>> {
    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        board: Board,
        role: BoardRole,
    }

    let row = sqlx::query_as::<_, Row>(
        r#"
        SELECT b.id, b.title, b.is_deleted, b.created, b.updated, p.role
          FROM boards b
          JOIN board_participants p ON p.board_id = b.id AND p.user_id = $1
         WHERE b.id = $2 AND NOT b.is_deleted
        "#,
    )
    .bind(user_id)
    .bind(board_id)
    .fetch_optional(db)
    .await
    .context("find board for user")?;
    Ok(row.map(|r| (r.board, r.role)))
}

pub async fn list_participants(db: &PgPool, board_id: Uuid) -> anyhow::Result<Vec<BoardParticipant>> {
    let rows = sqlx::query_as::<_, BoardParticipant>(
        r#"
        SELECT id, board_id, user_id, role, created, updated
          FROM board_participants
         WHERE board_id = $1
         ORDER BY created ASC, id ASC
        "#,
    )
    .bind(board_id)
    .fetch_all(db)
    .await
    .context("list board participants")?;
    Ok(rows)
}

/// Role of `user_id` on a non-deleted board.
pub async fn role_of(db: &PgPool, user_id: Uuid, board_id: Uuid) -> anyhow::Result<Option<BoardRole>> {
    let role = sqlx::query_scalar::<_, BoardRole>(
        r#"
        SELECT p.role
          FROM board_participants p
          JOIN boards b ON b.id = p.board_id
         WHERE p.user_id = $1 AND p.board_id = $2 AND NOT b.is_deleted
        "#,
    )
    .bind(user_id)
    .bind(board_id)
    .fetch_optional(db)
    .await
    .context("board role lookup")?;
    Ok(role)
}

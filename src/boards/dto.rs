use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Board, BoardParticipant, BoardRole};

#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantRequest {
    #[serde(default)]
    pub user: Option<Uuid>,
    #[serde(default)]
    pub role: Option<BoardRole>,
}

#[derive(Debug, Serialize)]
pub struct BoardDetails {
    #[serde(flatten)]
    pub board: Board,
    pub participants: Vec<BoardParticipant>,
}

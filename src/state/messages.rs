use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use cricket_api::{Match, Scorecard};

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadScorecard { game_id: String },
    /// Fetch trailing result windows `1..=windows`.
    LoadMoreHistory { windows: u32 },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    HistoryExtended { completed: Vec<Match> },
    ScorecardLoaded { scorecard: Scorecard },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    FocusGained,
}

use crate::app::{App, MenuItem};
use crate::state::engine::MatchEngine;
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Returns true when the user asked to quit.
pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    engine: &MatchEngine,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    let mut guard = app.lock().await;

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => return true,

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Matches),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Scorecard),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Match list
        (MenuItem::Matches, Char('l') | KeyCode::Right, _) => guard.state.matches.next_chip(),
        (MenuItem::Matches, Char('h') | KeyCode::Left, _) => guard.state.matches.prev_chip(),
        (MenuItem::Matches, Char('j') | KeyCode::Down, _) => guard.state.matches.select_down(),
        (MenuItem::Matches, Char('k') | KeyCode::Up, _) => guard.state.matches.select_up(),
        (MenuItem::Matches, KeyCode::Enter, _) => {
            if let Some(game_id) = guard.open_selected_scorecard() {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::LoadScorecard { game_id })
                    .await;
            }
        }
        (MenuItem::Matches, Char('m'), _) => {
            let windows = guard.extend_history();
            drop(guard);
            let _ = network_requests
                .send(NetworkRequest::LoadMoreHistory { windows })
                .await;
        }

        // Scorecard
        (MenuItem::Scorecard, Char('j') | KeyCode::Down, _) => {
            guard.state.scorecard.scroll_offset =
                guard.state.scorecard.scroll_offset.saturating_add(1);
        }
        (MenuItem::Scorecard, Char('k') | KeyCode::Up, _) => {
            guard.state.scorecard.scroll_offset =
                guard.state.scorecard.scroll_offset.saturating_sub(1);
        }
        (MenuItem::Scorecard, KeyCode::Esc, _) => guard.update_tab(MenuItem::Matches),

        // Global
        (_, Char('r'), _) => engine.resume(),
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }

    false
}

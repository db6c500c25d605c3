use crate::state::app_settings::AppSettings;
use crate::state::app_state::AppState;
use cricket_api::{Match, MergedView, Scorecard};
use log::info;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Matches,
    Scorecard,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self { state: AppState::new(), settings }
    }

    // -----------------------------------------------------------------------
    // Engine and network updates, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_view_published(&mut self, view: Arc<MergedView>) {
        self.state.matches.set_view(view);
    }

    pub fn on_history_extended(&mut self, completed: Vec<Match>) {
        self.state.last_error = None;
        info!(
            "history now spans {} extra windows, {} completed matches",
            self.state.matches.history_windows,
            completed.len()
        );
    }

    pub fn on_scorecard_loaded(&mut self, scorecard: Scorecard) {
        self.state.last_error = None;
        let changed = self
            .state
            .scorecard
            .scorecard
            .as_ref()
            .is_none_or(|s| s.game_id != scorecard.game_id);
        self.state.scorecard.scorecard = Some(scorecard);
        if changed {
            self.state.scorecard.scroll_offset = 0;
        }
    }

    pub fn on_error(&mut self, message: String) {
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Match list
    // -----------------------------------------------------------------------

    /// Game id of the highlighted match, switching to the Scorecard tab.
    pub fn open_selected_scorecard(&mut self) -> Option<String> {
        let selected = self.state.matches.selected_match()?;
        let game_id = selected.game_id.clone();
        self.state.scorecard.title = selected.title();
        self.update_tab(MenuItem::Scorecard);
        Some(game_id)
    }

    /// One more trailing results window. Returns the new total to request.
    pub fn extend_history(&mut self) -> u32 {
        self.state.matches.history_windows += 1;
        self.state.matches.history_windows
    }
}

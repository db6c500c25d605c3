use crate::app::MenuItem;
use cricket_api::priority::{self, ALL_CHIP_ID, ChipCount};
use cricket_api::{Match, MergedView, Scorecard};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Match list state
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MatchListState {
    pub view: Arc<MergedView>,
    pub chips: Vec<ChipCount>,
    /// Index into `chips`.
    pub selected_chip: usize,
    /// Rows shown under the selected chip, in priority order.
    pub rows: Vec<Match>,
    pub selected: usize,
    /// Extra trailing result windows loaded on top of the default one.
    pub history_windows: u32,
}

impl Default for MatchListState {
    fn default() -> Self {
        Self {
            view: Arc::default(),
            chips: priority::chips(&[]),
            selected_chip: 0,
            rows: Vec::new(),
            selected: 0,
            history_windows: 0,
        }
    }
}

impl MatchListState {
    /// Take a freshly published view. The chip and the selected match are kept
    /// when they still exist.
    pub fn set_view(&mut self, view: Arc<MergedView>) {
        let chip_id = self.selected_chip_id();
        let selected_id = self.selected_match().map(|m| m.game_id.clone());

        self.view = view;
        self.chips = priority::chips(&self.view.matches());
        self.selected_chip = self
            .chips
            .iter()
            .position(|c| c.id == chip_id)
            .unwrap_or(0);
        self.rebuild_rows();

        self.selected = selected_id
            .and_then(|id| self.rows.iter().position(|m| m.game_id == id))
            .unwrap_or(self.selected)
            .min(self.rows.len().saturating_sub(1));
    }

    pub fn selected_chip_id(&self) -> &'static str {
        self.chips
            .get(self.selected_chip)
            .map_or(ALL_CHIP_ID, |c| c.id)
    }

    pub fn next_chip(&mut self) {
        self.selected_chip = (self.selected_chip + 1) % self.chips.len().max(1);
        self.on_chip_changed();
    }

    pub fn prev_chip(&mut self) {
        let len = self.chips.len().max(1);
        self.selected_chip = (self.selected_chip + len - 1) % len;
        self.on_chip_changed();
    }

    pub fn select_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_match(&self) -> Option<&Match> {
        self.rows.get(self.selected)
    }

    fn on_chip_changed(&mut self) {
        self.rebuild_rows();
        self.selected = 0;
    }

    fn rebuild_rows(&mut self) {
        let chip_id = self.selected_chip_id();
        self.rows = self
            .view
            .entries
            .iter()
            .map(|e| &e.game)
            .filter(|m| priority::chip_matches(chip_id, m))
            .cloned()
            .collect();
        priority::sort_by_priority(&mut self.rows);
    }
}

// ---------------------------------------------------------------------------
// Scorecard state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScorecardState {
    pub scorecard: Option<Scorecard>,
    /// "IND vs AUS" of the match the scorecard belongs to.
    pub title: String,
    pub scroll_offset: u16,
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub matches: MatchListState,
    pub scorecard: ScorecardState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub mod client;
pub mod feed;
pub mod priority;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types, independent of the provider wire format
// ---------------------------------------------------------------------------

/// One cricket fixture. `game_id` is the identity key across every bucket and cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub game_id: String,
    pub series_id: String,
    pub series_name: String,
    pub parent_series_name: String,
    pub championship_name: String,
    pub event_state: EventState,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub participants: [Participant; 2],
    pub event_format: String, // "T20", "ODI", "Test"
    pub event_name: String,   // "3rd T20I"
    pub short_event_status: String,
    pub event_status: String,
    pub venue: String,
    pub league_code: String,
    /// Provider-supplied ordering hint. Only trusted below the classifier's sanity limit.
    pub priority_hint: Option<u32>,
}

impl Match {
    pub fn is_live(&self) -> bool {
        self.event_state == EventState::Live
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.event_state, EventState::Completed | EventState::Result)
    }

    pub fn winner(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.highlight)
    }

    /// "IND vs AUS", falling back to full names and then to "TBC".
    pub fn title(&self) -> String {
        let [a, b] = &self.participants;
        format!("{} vs {}", a.label(), b.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub value: String, // "287/6 (50)"
    pub highlight: bool,
}

impl Participant {
    pub fn label(&self) -> &str {
        if !self.short_name.is_empty() {
            &self.short_name
        } else if !self.name.is_empty() {
            &self.name
        } else {
            "TBC"
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventState {
    #[default]
    Upcoming,
    Live,
    Completed,
    Result,
}

impl EventState {
    pub fn label(&self) -> &'static str {
        match self {
            EventState::Upcoming => "UPCOMING",
            EventState::Live => "LIVE",
            EventState::Completed => "COMPLETED",
            EventState::Result => "RESULT",
        }
    }
}

/// The three independently polled collections that make up the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Live,
    Upcoming,
    Completed,
}

/// One merged-view row, tagged with the bucket that supplied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub source: Bucket,
    pub game: Match,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedView {
    pub entries: Vec<ViewEntry>,
}

impl MergedView {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, game_id: &str) -> Option<&ViewEntry> {
        self.entries.iter().find(|e| e.game.game_id == game_id)
    }

    pub fn from_bucket(&self, bucket: Bucket) -> impl Iterator<Item = &Match> {
        self.entries
            .iter()
            .filter(move |e| e.source == bucket)
            .map(|e| &e.game)
    }

    pub fn matches(&self) -> Vec<Match> {
        self.entries.iter().map(|e| e.game.clone()).collect()
    }
}

/// Inclusive calendar window sent to the provider as `YYYYMMDD-YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// Window 0 ends today; window k is the `days`-long stretch immediately before window k-1.
    /// Dates saturate at the calendar limits instead of overflowing.
    pub fn trailing(today: NaiveDate, index: u32, days: u32) -> Self {
        let days = u64::from(days.max(1));
        let index = u64::from(index);
        if index == 0 {
            return Self { from: days_before(today, days), to: today };
        }
        Self {
            from: days_before(today, days.saturating_mul(index + 1)),
            to: days_before(today, days.saturating_mul(index).saturating_add(1)),
        }
    }

    pub fn forward(today: NaiveDate, days: u32) -> Self {
        let to = today.checked_add_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MAX);
        Self { from: today, to }
    }

    pub fn query_value(&self) -> String {
        format!("{}-{}", self.from.format("%Y%m%d"), self.to.format("%Y%m%d"))
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Innings-by-innings scorecard, fetched on demand.
#[derive(Debug, Clone, Default)]
pub struct Scorecard {
    pub game_id: String,
    pub innings: Vec<Innings>,
}

#[derive(Debug, Clone, Default)]
pub struct Innings {
    pub batting_team: String,
    pub total: u16,
    pub wickets: u8,
    pub overs: String,
    pub batters: Vec<BatterLine>,
    pub bowlers: Vec<BowlerLine>,
}

#[derive(Debug, Clone, Default)]
pub struct BatterLine {
    pub name: String,
    pub runs: u16,
    pub balls: u16,
    pub fours: u8,
    pub sixes: u8,
    pub dismissal: String, // "c Smith b Starc", "not out"
}

#[derive(Debug, Clone, Default)]
pub struct BowlerLine {
    pub name: String,
    pub overs: String,
    pub maidens: u8,
    pub runs: u16,
    pub wickets: u8,
}

use chrono::NaiveDate;
use cricket_api::{Bucket, Match, MergedView, ViewEntry};
use std::collections::{BTreeMap, HashMap};

/// The three match buckets. `live` and `upcoming` are replaced wholesale on every
/// successful fetch; `completed` only ever grows (upsert by game id).
#[derive(Debug, Default)]
pub struct MatchStore {
    live: Vec<Match>,
    upcoming: Vec<Match>,
    completed: BTreeMap<String, Match>,
}

impl MatchStore {
    pub fn replace_live(&mut self, matches: Vec<Match>) {
        self.live = matches;
    }

    pub fn replace_upcoming(&mut self, matches: Vec<Match>) {
        self.upcoming = matches;
    }

    /// Upsert into the completed bucket. Returns how many ids were new.
    pub fn merge_completed(&mut self, matches: Vec<Match>) -> usize {
        let before = self.completed.len();
        for m in matches {
            self.completed.insert(m.game_id.clone(), m);
        }
        self.completed.len() - before
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.upcoming.is_empty() && self.completed.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn completed(&self) -> Vec<Match> {
        self.completed.values().cloned().collect()
    }

    /// Overlay completed → upcoming → live. A later bucket overwrites an earlier
    /// entry in place, so an id appears once no matter how many buckets hold it.
    pub fn recompute(&self) -> MergedView {
        let mut entries: Vec<ViewEntry> = Vec::with_capacity(
            self.completed.len() + self.upcoming.len() + self.live.len(),
        );
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(entries.capacity());

        let layers = [
            (Bucket::Completed, self.completed.values().collect::<Vec<_>>()),
            (Bucket::Upcoming, self.upcoming.iter().collect()),
            (Bucket::Live, self.live.iter().collect()),
        ];

        for (source, matches) in layers {
            for game in matches {
                let entry = ViewEntry { source, game: game.clone() };
                match index.get(game.game_id.as_str()) {
                    Some(&i) => entries[i] = entry,
                    None => {
                        index.insert(game.game_id.as_str(), entries.len());
                        entries.push(entry);
                    }
                }
            }
        }

        MergedView { entries }
    }

    /// Seed the buckets from a cached view so the precedence merge can supersede
    /// it bucket by bucket as fresh data arrives. Completed entries that finished
    /// before `completed_since` are dropped; undated ones are kept. Returns how many
    /// entries were dropped.
    pub fn rehydrate(&mut self, view: MergedView, completed_since: NaiveDate) -> usize {
        let mut dropped = 0;
        for entry in view.entries {
            match entry.source {
                Bucket::Live => self.live.push(entry.game),
                Bucket::Upcoming => self.upcoming.push(entry.game),
                Bucket::Completed if finished_before(&entry.game, completed_since) => dropped += 1,
                Bucket::Completed => {
                    self.completed.insert(entry.game.game_id.clone(), entry.game);
                }
            }
        }
        dropped
    }
}

fn finished_before(game: &Match, day: NaiveDate) -> bool {
    game.end_date
        .or(game.start_date)
        .is_some_and(|d| d.date_naive() < day)
}

//! Match ranking and filter categories.
//!
//! Every match is classified once into a [`Tier`]; the numeric priority and the
//! filter chip are both projections of that tier, so the two can never disagree.
//! Lower priority values are shown first.

use crate::Match;

/// Matches at or below this priority are highlighted as featured.
pub const FEATURED_THRESHOLD: u32 = 59;

/// Provider hints at or above this value are treated as noise.
const PRIORITY_HINT_LIMIT: u32 = 100;

const WARM_UP_PATTERNS: &[&str] = &[
    "warm-up",
    "warm up",
    "warmup",
    "practice match",
    "tour match",
    "qualifier",
    "qualifying",
];

const ICC_GLOBAL_EVENTS: &[&str] = &[
    "t20 world cup",
    "cricket world cup",
    "odi world cup",
    "champions trophy",
    "world test championship",
];

const ICC_SECONDARY_EVENTS: &[&str] = &[
    "asia cup",
    "world cup league",
    "challenge league",
    "asian games",
    "commonwealth games",
];

/// Ordered: earlier leagues sort ahead of later ones.
const PREMIUM_LEAGUES: &[&str] = &[
    "indian premier league",
    "women's premier league",
    "big bash league",
    "the hundred",
    "pakistan super league",
    "sa20",
    "caribbean premier league",
    "major league cricket",
    "international league t20",
    "bangladesh premier league",
    "lanka premier league",
];

/// Provider team ids for the full-member men's sides.
const TOP_TIER_TEAMS: &[&str] = &[
    "1",  // Australia
    "3",  // England
    "4",  // India
    "5",  // New Zealand
    "6",  // Pakistan
    "7",  // South Africa
    "8",  // Sri Lanka
    "9",  // West Indies
    "25", // Bangladesh
    "40", // Afghanistan
];

const TOP_TIER_WOMEN_TEAMS: &[&str] = &[
    "1026", // Australia Women
    "1028", // England Women
    "1029", // India Women
    "1030", // New Zealand Women
    "1032", // South Africa Women
    "1034", // West Indies Women
];

/// Where a match sits in the ranking ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    WarmUp,
    /// 0 = senior men, 1 = senior women, 2 = under-19.
    IccGlobal(u8),
    TopBilateral,
    IccSecondary,
    /// Index into the premium league table.
    PremiumLeague(u8),
    WomenBilateral,
    Hinted(u32),
    International,
    Women,
    Youth,
    Domestic,
}

impl Tier {
    pub fn priority(self) -> u32 {
        match self {
            Tier::IccGlobal(sub) => 10 + u32::from(sub),
            Tier::TopBilateral => 20,
            Tier::IccSecondary => 30,
            Tier::PremiumLeague(rank) => 40 + u32::from(rank),
            Tier::WomenBilateral => 60,
            Tier::WarmUp => 900,
            Tier::Hinted(hint) => 100 + hint,
            Tier::International => 200,
            Tier::Women => 210,
            Tier::Youth => 220,
            Tier::Domestic => 999,
        }
    }

    pub fn chip(self) -> Chip {
        match self {
            Tier::IccGlobal(_) | Tier::IccSecondary => Chip::Icc,
            Tier::TopBilateral | Tier::International => Chip::International,
            Tier::PremiumLeague(_) => Chip::Leagues,
            Tier::WomenBilateral | Tier::Women => Chip::Women,
            Tier::Youth => Chip::Youth,
            Tier::WarmUp => Chip::WarmUps,
            Tier::Hinted(_) => Chip::Other,
            Tier::Domestic => Chip::Domestic,
        }
    }
}

/// Filter category shown in the chip bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chip {
    Icc,
    International,
    Leagues,
    Women,
    Youth,
    WarmUps,
    Other,
    Domestic,
}

/// Fixed display order, independent of which categories are populated.
pub const CHIP_ORDER: [Chip; 8] = [
    Chip::Icc,
    Chip::International,
    Chip::Leagues,
    Chip::Women,
    Chip::Youth,
    Chip::WarmUps,
    Chip::Other,
    Chip::Domestic,
];

impl Chip {
    pub fn id(self) -> &'static str {
        match self {
            Chip::Icc => "icc",
            Chip::International => "international",
            Chip::Leagues => "leagues",
            Chip::Women => "women",
            Chip::Youth => "youth",
            Chip::WarmUps => "warmups",
            Chip::Other => "other",
            Chip::Domestic => "domestic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Chip::Icc => "ICC",
            Chip::International => "International",
            Chip::Leagues => "Leagues",
            Chip::Women => "Women",
            Chip::Youth => "Youth",
            Chip::WarmUps => "Warm-ups",
            Chip::Other => "Other",
            Chip::Domestic => "Domestic",
        }
    }
}

pub const ALL_CHIP_ID: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipCount {
    pub id: &'static str,
    pub label: &'static str,
    pub count: usize,
}

pub fn classify(m: &Match) -> Tier {
    let names = [
        m.championship_name.as_str(),
        m.parent_series_name.as_str(),
        m.series_name.as_str(),
        m.event_name.as_str(),
    ]
    .map(str::to_lowercase);
    let named = |patterns: &[&str]| {
        names
            .iter()
            .any(|n| patterns.iter().any(|p| n.contains(p)))
    };

    if named(WARM_UP_PATTERNS) {
        return Tier::WarmUp;
    }

    if let Some(sub) = icc_global_sub_tier(&names) {
        return Tier::IccGlobal(sub);
    }

    let both_in = |allowlist: &[&str]| {
        m.participants
            .iter()
            .all(|p| !p.id.is_empty() && allowlist.contains(&p.id.as_str()))
    };

    if both_in(TOP_TIER_TEAMS) {
        return Tier::TopBilateral;
    }

    if named(ICC_SECONDARY_EVENTS) {
        return Tier::IccSecondary;
    }

    if let Some(rank) = PREMIUM_LEAGUES
        .iter()
        .position(|league| names.iter().any(|n| n.contains(league)))
    {
        return Tier::PremiumLeague(rank as u8);
    }

    if both_in(TOP_TIER_WOMEN_TEAMS) {
        return Tier::WomenBilateral;
    }

    if let Some(hint) = m.priority_hint.filter(|&h| h < PRIORITY_HINT_LIMIT) {
        return Tier::Hinted(hint);
    }

    let code = m.league_code.to_ascii_uppercase();
    if code.contains("U19") || code.contains("YOUTH") {
        Tier::Youth
    } else if code.contains("WOMEN") || code == "W" {
        Tier::Women
    } else if code.starts_with("INT") {
        Tier::International
    } else {
        Tier::Domestic
    }
}

fn icc_global_sub_tier(names: &[String]) -> Option<u8> {
    let event = names.iter().find(|n| {
        ICC_GLOBAL_EVENTS.iter().any(|p| n.contains(p)) && !n.contains("league")
    })?;
    if event.contains("u19") || event.contains("under 19") || event.contains("under-19") {
        Some(2)
    } else if event.contains("women") {
        Some(1)
    } else {
        Some(0)
    }
}

pub fn priority(m: &Match) -> u32 {
    classify(m).priority()
}

pub fn chip(m: &Match) -> Chip {
    classify(m).chip()
}

pub fn is_featured(m: &Match) -> bool {
    priority(m) <= FEATURED_THRESHOLD
}

/// Stable sort by priority, then start time; matches without a start time go last.
pub fn sort_by_priority(matches: &mut [Match]) {
    matches.sort_by_cached_key(|m| {
        (
            priority(m),
            m.start_date.map_or(i64::MAX, |d| d.timestamp()),
        )
    });
}

/// Category counts for the chip bar: "All" first, then populated chips in display order.
pub fn chips(matches: &[Match]) -> Vec<ChipCount> {
    let mut counts = [0usize; CHIP_ORDER.len()];
    for m in matches {
        let c = chip(m);
        if let Some(idx) = CHIP_ORDER.iter().position(|&o| o == c) {
            counts[idx] += 1;
        }
    }

    let mut out = vec![ChipCount { id: ALL_CHIP_ID, label: "All", count: matches.len() }];
    out.extend(
        CHIP_ORDER
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(c, count)| ChipCount { id: c.id(), label: c.label(), count }),
    );
    out
}

/// True when `m` belongs under the chip with this id ("all" matches everything).
pub fn chip_matches(chip_id: &str, m: &Match) -> bool {
    chip_id == ALL_CHIP_ID || chip(m).id() == chip_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Participant;
    use chrono::{TimeZone, Utc};

    fn named(series: &str) -> Match {
        Match {
            game_id: series.to_owned(),
            series_name: series.to_owned(),
            ..Default::default()
        }
    }

    fn between(a: &str, b: &str) -> Match {
        let mut m = named("bilateral series");
        m.participants = [
            Participant { id: a.into(), ..Default::default() },
            Participant { id: b.into(), ..Default::default() },
        ];
        m
    }

    #[test]
    fn icc_events_rank_above_everything() {
        let men = named("ICC Men's T20 World Cup 2026");
        let women = named("ICC Women's Cricket World Cup");
        let u19 = named("ICC Under 19 Cricket World Cup");
        assert_eq!(classify(&men), Tier::IccGlobal(0));
        assert_eq!(classify(&women), Tier::IccGlobal(1));
        assert_eq!(classify(&u19), Tier::IccGlobal(2));
        assert!(priority(&men) < priority(&women));
        assert!(priority(&women) < priority(&u19));
        assert!(priority(&u19) < priority(&between("4", "1")));
    }

    #[test]
    fn world_cup_league_is_a_secondary_event() {
        let m = named("ICC Cricket World Cup League 2");
        assert_eq!(classify(&m), Tier::IccSecondary);
        assert_eq!(chip(&m), Chip::Icc);
    }

    #[test]
    fn qualifier_is_demoted_below_premium_leagues_even_for_top_teams() {
        let mut qualifier = between("4", "1");
        qualifier.series_name = "T20 World Cup Qualifier".into();
        let ipl = named("Indian Premier League 2026");
        assert_eq!(classify(&qualifier), Tier::WarmUp);
        assert!(priority(&qualifier) > priority(&ipl));
        assert!(priority(&qualifier) < priority(&named("Ranji Trophy")));
    }

    #[test]
    fn warm_ups_rank_below_every_tagged_band() {
        let mut warm_up = named("Tour Match: England Lions v India A");
        warm_up.league_code = "U19".into();
        let mut hinted = named("Some Series");
        hinted.priority_hint = Some(99);
        assert_eq!(classify(&warm_up), Tier::WarmUp);
        assert!(priority(&warm_up) > priority(&hinted));
        assert!(priority(&warm_up) > Tier::Youth.priority());
        assert!(priority(&warm_up) < Tier::Domestic.priority());
    }

    #[test]
    fn premium_leagues_keep_fixed_relative_order() {
        let ipl = priority(&named("Indian Premier League"));
        let bbl = priority(&named("Big Bash League"));
        let cpl = priority(&named("Caribbean Premier League"));
        assert!(ipl < bbl && bbl < cpl);
        assert_eq!(chip(&named("The Hundred Men's Competition")), Chip::Leagues);
    }

    #[test]
    fn top_tier_bilaterals_need_both_teams_on_the_allowlist() {
        assert_eq!(classify(&between("4", "1")), Tier::TopBilateral);
        assert_ne!(classify(&between("4", "999")), Tier::TopBilateral);
        assert_eq!(classify(&between("1029", "1026")), Tier::WomenBilateral);
        assert!(priority(&named("Indian Premier League")) < priority(&between("1029", "1026")));
    }

    #[test]
    fn hint_is_used_only_below_the_limit() {
        let mut m = named("Some Cup");
        m.priority_hint = Some(5);
        assert_eq!(classify(&m), Tier::Hinted(5));
        assert_eq!(priority(&m), 105);
        m.priority_hint = Some(5000);
        assert_eq!(classify(&m), Tier::Domestic);
    }

    #[test]
    fn league_code_bands() {
        let mut m = named("Tri-series");
        m.league_code = "INTL".into();
        assert_eq!(classify(&m), Tier::International);
        m.league_code = "WOMEN".into();
        assert_eq!(classify(&m), Tier::Women);
        m.league_code = "U19".into();
        assert_eq!(classify(&m), Tier::Youth);
    }

    #[test]
    fn empty_match_falls_to_lowest_band() {
        let m = Match::default();
        assert_eq!(classify(&m), Tier::Domestic);
        assert_eq!(priority(&m), 999);
        assert_eq!(chip(&m), Chip::Domestic);
    }

    #[test]
    fn classification_is_deterministic() {
        let m = named("ICC Champions Trophy");
        let first = (priority(&m), chip(&m));
        for _ in 0..5 {
            assert_eq!((priority(&m), chip(&m)), first);
        }
        assert_eq!(m, named("ICC Champions Trophy"));
    }

    #[test]
    fn featured_always_maps_to_a_high_priority_chip() {
        let samples = [
            named("ICC Men's T20 World Cup"),
            named("Asia Cup"),
            named("Lanka Premier League"),
            between("4", "1"),
            named("T20 World Cup Qualifier"),
            between("1029", "1026"),
            named("Ranji Trophy"),
        ];
        for m in &samples {
            if is_featured(m) {
                assert!(
                    matches!(chip(m), Chip::Icc | Chip::International | Chip::Leagues),
                    "{} is featured but chipped {:?}",
                    m.series_name,
                    chip(m)
                );
            }
        }
        assert!(!is_featured(&named("T20 World Cup Qualifier")));
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let mut a = named("Ranji Trophy");
        a.game_id = "a".into();
        a.start_date = Some(start);
        let mut b = a.clone();
        b.game_id = "b".into();
        let mut early = named("Ranji Trophy");
        early.game_id = "early".into();
        early.start_date = Some(start - chrono::Duration::hours(1));
        let icc = named("ICC Champions Trophy");

        let mut list = vec![a.clone(), b.clone(), early, icc];
        sort_by_priority(&mut list);
        let ids: Vec<&str> = list.iter().map(|m| m.game_id.as_str()).collect();
        assert_eq!(ids, ["ICC Champions Trophy", "early", "a", "b"]);

        let mut swapped = vec![b, a];
        sort_by_priority(&mut swapped);
        assert_eq!(swapped[0].game_id, "b");
    }

    #[test]
    fn chips_are_ordered_counted_and_sparse() {
        let matches = vec![
            named("Ranji Trophy"),
            named("Indian Premier League"),
            named("ICC Champions Trophy"),
            named("Big Bash League"),
        ];
        let chips = chips(&matches);
        let ids: Vec<&str> = chips.iter().map(|c| c.id).collect();
        assert_eq!(ids, ["all", "icc", "leagues", "domestic"]);
        assert_eq!(chips[0].count, 4);
        let sum: usize = chips.iter().skip(1).map(|c| c.count).sum();
        assert_eq!(sum, matches.len());
    }

    #[test]
    fn chips_for_empty_list_is_just_all() {
        assert_eq!(
            chips(&[]),
            vec![ChipCount { id: "all", label: "All", count: 0 }]
        );
    }
}

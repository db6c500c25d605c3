/// Provider wire types: serde shapes for deserializing feed responses.
/// These map to our clean domain types via the mapping functions in client.rs.
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Match list  (methodtype=3, filtered by gamestate or daterange)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MatchesResponse {
    pub matches: Option<Vec<FeedMatch>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedMatch {
    #[serde(default, deserialize_with = "lenient_string")]
    pub game_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub series_id: Option<String>,
    pub series_name: Option<String>,
    pub parent_series_name: Option<String>,
    pub championship_name: Option<String>,
    /// "L", "U", "C", "R" on most payloads; some older ones spell the state out.
    pub event_state: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub participants: Option<Vec<FeedParticipant>>,
    pub event_format: Option<String>,
    pub event_name: Option<String>,
    pub short_event_status: Option<String>,
    pub event_status: Option<String>,
    pub venue_name: Option<String>,
    #[serde(rename = "leagguecode")]
    pub league_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub priority: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedParticipant {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub highlight: Option<bool>,
}

// ---------------------------------------------------------------------------
// Scorecard
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScorecardResponse {
    pub innings: Option<Vec<FeedInnings>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedInnings {
    pub batting_team: Option<String>,
    pub total: Option<String>,
    pub wickets: Option<String>,
    pub overs: Option<String>,
    pub batsmen: Option<Vec<FeedBatter>>,
    pub bowlers: Option<Vec<FeedBowler>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedBatter {
    pub name: Option<String>,
    pub runs: Option<String>,
    pub balls: Option<String>,
    pub fours: Option<String>,
    pub sixes: Option<String>,
    pub how_out: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeedBowler {
    pub name: Option<String>,
    pub overs: Option<String>,
    pub maidens: Option<String>,
    pub runs: Option<String>,
    pub wickets: Option<String>,
}

/// The provider sends numbers either bare or quoted depending on the endpoint;
/// anything that is neither becomes `None` instead of failing the whole payload.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::String(s)) => Some(s.eq_ignore_ascii_case("true")),
        _ => None,
    })
}

use crate::feed::{FeedInnings, FeedMatch, FeedParticipant, MatchesResponse, ScorecardResponse};
use crate::{
    BatterLine, BowlerLine, DateWindow, EventState, Innings, Match, Participant, Scorecard,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_FEED_URL: &str = "https://www.wisden.com/default.aspx";
const DEFAULT_SCORECARD_URL: &str = "https://www.wisden.com/cricket/v1/game/scorecard";
const DEFAULT_CLIENT_ID: &str = "crictui";
const MAX_ATTEMPTS: u32 = 2;

/// Where requests go. The relay, when set, receives every target URL as its `url` parameter.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub feed_url: String,
    pub scorecard_url: String,
    pub client_id: String,
    pub proxy_url: Option<String>,
    pub bypass_proxy_cache: bool,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_owned(),
            scorecard_url: DEFAULT_SCORECARD_URL.to_owned(),
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            proxy_url: None,
            bypass_proxy_cache: false,
        }
    }
}

/// Cricket feed client, optionally routed through a CORS relay.
#[derive(Debug, Clone)]
pub struct CricketApi {
    client: Client,
    endpoints: ApiEndpoints,
    timeout: Duration,
    retry_backoff: Duration,
}

impl Default for CricketApi {
    fn default() -> Self {
        Self::new(ApiEndpoints::default())
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl ApiError {
    /// Worth one more attempt within the same polling cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(..) | ApiError::Parsing(..) => true,
            ApiError::Api(e, _) => e
                .status()
                .map(|s| s.is_server_error() || s.as_u16() == 429)
                .unwrap_or(true),
            ApiError::NotFound(_) | ApiError::Other(_) => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl CricketApi {
    pub fn new(endpoints: ApiEndpoints) -> Self {
        Self {
            client: Client::builder()
                .user_agent("crictui/0.1 (terminal cricket scores)")
                .build()
                .unwrap_or_default(),
            endpoints,
            timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Matches currently in progress (gamestate=1).
    pub async fn fetch_live(&self) -> ApiResult<Vec<Match>> {
        let url = self.feed_url(&[("gamestate", "1".to_owned())])?;
        self.fetch_matches(&url).await
    }

    /// Scheduled matches inside the forward window (gamestate=2).
    pub async fn fetch_upcoming(&self, window: DateWindow) -> ApiResult<Vec<Match>> {
        let url = self.feed_url(&[
            ("gamestate", "2".to_owned()),
            ("daterange", window.query_value()),
        ])?;
        self.fetch_matches(&url).await
    }

    /// Completed matches inside a trailing window. Results use a bare date range.
    pub async fn fetch_results(&self, window: DateWindow) -> ApiResult<Vec<Match>> {
        let url = self.feed_url(&[("daterange", window.query_value())])?;
        self.fetch_matches(&url).await
    }

    pub async fn fetch_scorecard(&self, game_id: &str) -> ApiResult<Scorecard> {
        let target = Url::parse_with_params(
            &self.endpoints.scorecard_url,
            &[
                ("client_id", self.endpoints.client_id.as_str()),
                ("feed_format", "json"),
                ("lang", "en"),
                ("game_id", game_id),
            ],
        )
        .map_err(|e| ApiError::Other(format!("bad scorecard url: {e}")))?;
        let url = self.route(target)?;
        let raw: ScorecardResponse = self.get_with_retry(&url).await?;
        let innings = raw.innings.unwrap_or_default();
        if innings.is_empty() {
            return Err(ApiError::NotFound(format!("no scorecard for game {game_id}")));
        }
        Ok(map_scorecard(game_id, innings))
    }

    async fn fetch_matches(&self, url: &str) -> ApiResult<Vec<Match>> {
        let raw: MatchesResponse = self.get_with_retry(url).await?;
        let matches: Vec<Match> = raw
            .matches
            .unwrap_or_default()
            .iter()
            .filter_map(map_feed_match)
            .collect();
        debug!("{} matches from {url}", matches.len());
        Ok(matches)
    }

    fn feed_url(&self, filters: &[(&str, String)]) -> ApiResult<String> {
        let mut params: Vec<(&str, &str)> = vec![
            ("methodtype", "3"),
            ("client", self.endpoints.client_id.as_str()),
            ("sport", "1"),
            ("league", "0"),
            ("timezone", "0530"),
            ("language", "en"),
        ];
        params.extend(filters.iter().map(|(k, v)| (*k, v.as_str())));
        let target = Url::parse_with_params(&self.endpoints.feed_url, &params)
            .map_err(|e| ApiError::Other(format!("bad feed url: {e}")))?;
        self.route(target)
    }

    /// Wrap a provider URL for the relay, or pass it through when no relay is configured.
    fn route(&self, target: Url) -> ApiResult<String> {
        let Some(proxy) = self.endpoints.proxy_url.as_deref() else {
            return Ok(target.into());
        };
        let mut params = vec![("url", target.as_str())];
        if self.endpoints.bypass_proxy_cache {
            params.push(("nocache", "1"));
        }
        Url::parse_with_params(proxy, &params)
            .map(String::from)
            .map_err(|e| ApiError::Other(format!("bad proxy url {proxy}: {e}")))
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let mut attempt = 1;
        loop {
            match self.get(url).await {
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = self.retry_backoff * attempt;
                    warn!("attempt {attempt} failed, retrying in {delay:?}: {e}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        // Client errors are surfaced, not defaulted: an empty payload would wipe a bucket.
        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: provider wire types → clean domain types
// ---------------------------------------------------------------------------

fn map_feed_match(raw: &FeedMatch) -> Option<Match> {
    let game_id = raw.game_id.as_deref().map(str::trim).unwrap_or_default();
    if game_id.is_empty() {
        debug!("dropping feed match without gameId: {:?}", raw.event_name);
        return None;
    }

    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let participants = raw.participants.as_deref().unwrap_or_default();

    Some(Match {
        game_id: game_id.to_owned(),
        series_id: text(&raw.series_id),
        series_name: text(&raw.series_name),
        parent_series_name: text(&raw.parent_series_name),
        championship_name: text(&raw.championship_name),
        event_state: raw.event_state.as_deref().map(parse_event_state).unwrap_or_default(),
        start_date: raw.start_date.as_deref().and_then(parse_timestamp),
        end_date: raw.end_date.as_deref().and_then(parse_timestamp),
        participants: [
            participants.first().map(map_participant).unwrap_or_default(),
            participants.get(1).map(map_participant).unwrap_or_default(),
        ],
        event_format: text(&raw.event_format),
        event_name: text(&raw.event_name),
        short_event_status: text(&raw.short_event_status),
        event_status: text(&raw.event_status),
        venue: text(&raw.venue_name),
        league_code: text(&raw.league_code),
        priority_hint: raw.priority,
    })
}

fn map_participant(p: &FeedParticipant) -> Participant {
    Participant {
        id: p.id.clone().unwrap_or_default(),
        name: p.name.clone().unwrap_or_default(),
        short_name: p.short_name.clone().unwrap_or_default(),
        value: p.value.clone().unwrap_or_default(),
        highlight: p.highlight.unwrap_or(false),
    }
}

fn parse_event_state(s: &str) -> EventState {
    match s.trim().to_ascii_uppercase().as_str() {
        "L" | "LIVE" => EventState::Live,
        "C" | "COMPLETED" => EventState::Completed,
        "R" | "RESULT" => EventState::Result,
        _ => EventState::Upcoming,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn map_scorecard(game_id: &str, innings: Vec<FeedInnings>) -> Scorecard {
    let innings = innings
        .into_iter()
        .map(|inn| Innings {
            batting_team: inn.batting_team.unwrap_or_default(),
            total: parse_num(inn.total.as_deref()),
            wickets: parse_num(inn.wickets.as_deref()),
            overs: inn.overs.unwrap_or_default(),
            batters: inn
                .batsmen
                .unwrap_or_default()
                .into_iter()
                .map(|b| BatterLine {
                    name: b.name.unwrap_or_default(),
                    runs: parse_num(b.runs.as_deref()),
                    balls: parse_num(b.balls.as_deref()),
                    fours: parse_num(b.fours.as_deref()),
                    sixes: parse_num(b.sixes.as_deref()),
                    dismissal: b.how_out.unwrap_or_else(|| "not out".to_owned()),
                })
                .collect(),
            bowlers: inn
                .bowlers
                .unwrap_or_default()
                .into_iter()
                .map(|b| BowlerLine {
                    name: b.name.unwrap_or_default(),
                    overs: b.overs.unwrap_or_default(),
                    maidens: parse_num(b.maidens.as_deref()),
                    runs: parse_num(b.runs.as_deref()),
                    wickets: parse_num(b.wickets.as_deref()),
                })
                .collect(),
        })
        .collect();

    Scorecard { game_id: game_id.to_owned(), innings }
}

fn parse_num<T: std::str::FromStr + Default>(s: Option<&str>) -> T {
    s.and_then(|v| v.trim().parse().ok()).unwrap_or_default()
}

//! Wire types for The Odds API v4 `/sports/{sport}/odds` responses.

use serde::Deserialize;

/// One event (match) with its bookmaker markets.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEvent {
    /// Provider event id.
    pub id: String,
    /// Sport key (e.g. "soccer_epl").
    #[serde(default)]
    pub sport_key: Option<String>,
    /// Kickoff (RFC 3339).
    #[serde(default)]
    pub commence_time: Option<String>,
    /// Home team name.
    pub home_team: String,
    /// Away team name.
    pub away_team: String,
    /// Bookmakers pricing this event.
    #[serde(default)]
    pub bookmakers: Vec<ApiBookmaker>,
}

/// One bookmaker's markets for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiBookmaker {
    /// Bookmaker key (e.g. "williamhill").
    pub key: String,
    /// Bookmaker display name.
    pub title: String,
    /// Last update (RFC 3339).
    #[serde(default)]
    pub last_update: Option<String>,
    /// Markets offered.
    #[serde(default)]
    pub markets: Vec<ApiMarket>,
}

/// One market of one bookmaker.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMarket {
    /// Market key ("h2h" for match result).
    pub key: String,
    /// Last update (RFC 3339).
    #[serde(default)]
    pub last_update: Option<String>,
    /// Priced outcomes.
    #[serde(default)]
    pub outcomes: Vec<ApiOutcome>,
}

/// One priced outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiOutcome {
    /// Outcome name (team name or "Draw").
    pub name: String,
    /// Price as number or string, in the requested odds format.
    pub price: serde_json::Value,
}

impl ApiOutcome {
    /// Price as text; anything but a number or string becomes empty and is
    /// rejected downstream as unparseable.
    pub fn price_text(&self) -> String {
        match &self.price {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            _ => String::new(),
        }
    }
}

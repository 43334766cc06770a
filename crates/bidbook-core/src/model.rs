// Ledger entities: teams, players, and bid records.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// A bidding franchise and its purse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Team {
    pub id: i64,
    /// Unique display name.
    pub name: String,
    /// The spending cap the team started the auction with.
    pub initial_budget: i64,
    /// What is left to spend. Negative only after a lossy budget edit.
    pub current_budget: i64,
    pub created_at: String,
}

impl Team {
    /// Amount already committed to settled sales.
    pub fn spent(&self) -> i64 {
        self.initial_budget - self.current_budget
    }
}

/// Settlement state of a player.
///
/// The stored `is_sold` flag of earlier databases meant both "sold to a team"
/// and "went unsold"; the two cases are kept apart here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    /// On the block, no team, no price.
    Available,
    /// Sold: has an owning team and a sale price.
    Assigned,
    /// Went through the auction without a buyer.
    PassedOver,
}

impl PlayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerStatus::Available => "available",
            PlayerStatus::Assigned => "assigned",
            PlayerStatus::PassedOver => "passed_over",
        }
    }

    pub fn from_str_status(s: &str) -> Option<Self> {
        match s {
            "available" => Some(PlayerStatus::Available),
            "assigned" => Some(PlayerStatus::Assigned),
            "passed_over" => Some(PlayerStatus::PassedOver),
            _ => None,
        }
    }

    /// The legacy flag: true for every state except Available.
    pub fn is_sold(&self) -> bool {
        !matches!(self, PlayerStatus::Available)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for PlayerStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PlayerStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        PlayerStatus::from_str_status(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown player status `{text}`").into()))
    }
}

/// An auctionable player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i64,
    pub name: String,
    /// Free-text playing role (Batsman, Bowler, Wicket-Keeper, ...).
    pub role: String,
    pub base_price: i64,
    pub jersey_no: Option<i64>,
    pub status: PlayerStatus,
    /// Owning team; present iff `status` is Assigned.
    pub team_id: Option<i64>,
    /// Hammer price; present iff `status` is Assigned.
    pub sold_price: Option<i64>,
    pub created_at: String,
}

impl Player {
    pub fn is_sold(&self) -> bool {
        self.status.is_sold()
    }
}

// Serialized by hand so API consumers written against the `is_sold` flag
// keep working alongside the explicit status.
impl Serialize for Player {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Player", 10)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("role", &self.role)?;
        s.serialize_field("base_price", &self.base_price)?;
        s.serialize_field("jersey_no", &self.jersey_no)?;
        s.serialize_field("status", &self.status)?;
        s.serialize_field("is_sold", &self.is_sold())?;
        s.serialize_field("team_id", &self.team_id)?;
        s.serialize_field("sold_price", &self.sold_price)?;
        s.serialize_field("created_at", &self.created_at)?;
        s.end()
    }
}

/// One ledger line: an advisory bid or the binding sale bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidRecord {
    pub id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub bid_amount: i64,
    pub bid_time: String,
}

/// A team to register, with its full purse.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub initial_budget: i64,
}

/// Catalogue fields for a new player.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    pub role: String,
    pub base_price: i64,
    #[serde(default)]
    pub jersey_no: Option<i64>,
}

/// Partial edit of a player's catalogue fields. Settlement fields are only
/// changed through the settlement operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub base_price: Option<i64>,
    #[serde(default)]
    pub jersey_no: Option<i64>,
}

/// Current UTC time in the text format stored by the ledger. Millisecond
/// precision keeps lexical order equal to chronological order.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

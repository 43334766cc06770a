// Read-only views over the ledger. Nothing here is cached; every call
// recomputes from the store.

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use crate::db::{player_from_row, team_from_row, Ledger, PLAYER_COLUMNS, TEAM_COLUMNS};
use crate::error::Result;
use crate::model::{Player, PlayerStatus, Team};

/// A team together with the players it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRoster {
    #[serde(flatten)]
    pub team: Team,
    pub players: Vec<Player>,
}

/// A ledger line joined with the names it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub bid_amount: i64,
    pub bid_time: String,
    pub player_name: String,
    pub player_role: String,
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSale {
    pub name: String,
    pub role: String,
    pub sold_price: i64,
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuctionStats {
    pub total_sold: i64,
    pub total_spent: i64,
    pub most_expensive_player: Option<TopSale>,
}

/// Per-team spending overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub id: i64,
    pub name: String,
    pub initial_budget: i64,
    pub players_count: i64,
    /// Sum of the sale prices of the team's players.
    pub total_spent: i64,
    pub remaining_budget: i64,
    /// Mean sale price rounded to the nearest unit; 0 for an empty roster.
    pub average_price: i64,
}

impl Ledger {
    /// Every team with its Assigned players, teams ordered by id.
    pub fn teams_with_rosters(&self) -> Result<Vec<TeamRoster>> {
        let conn = self.conn();
        let teams = query_teams(&conn)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE team_id = ?1 AND status = ?2 ORDER BY id"
        ))?;
        let mut rosters = Vec::with_capacity(teams.len());
        for team in teams {
            let players = stmt
                .query_map(params![team.id, PlayerStatus::Assigned], player_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rosters.push(TeamRoster { team, players });
        }
        debug!(teams = rosters.len(), "Loaded team rosters");
        Ok(rosters)
    }

    pub fn list_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        query_players(&conn, "1 = 1", params![])
    }

    /// Players still on the block.
    pub fn available_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        query_players(&conn, "status = ?1", params![PlayerStatus::Available])
    }

    /// Case-insensitive substring match on the player name. `%` and `_` in
    /// the term are matched literally. A blank term returns every player.
    pub fn search_players(&self, term: &str) -> Result<Vec<Player>> {
        let term = term.trim();
        if term.is_empty() {
            return self.list_players();
        }
        let conn = self.conn();
        query_players(&conn, "instr(lower(name), lower(?1)) > 0", params![term])
    }

    /// The bid ledger, newest first.
    pub fn auction_history(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT h.id, h.player_id, h.team_id, h.bid_amount, h.bid_time,
                    p.name, p.role, t.name
             FROM auction_history h
             JOIN players p ON p.id = h.player_id
             JOIN teams t ON t.id = h.team_id
             ORDER BY h.bid_time DESC, h.id DESC",
        )?;
        let history = stmt
            .query_map([], |row| {
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    player_id: row.get(1)?,
                    team_id: row.get(2)?,
                    bid_amount: row.get(3)?,
                    bid_time: row.get(4)?,
                    player_name: row.get(5)?,
                    player_role: row.get(6)?,
                    team_name: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(history)
    }

    pub fn stats(&self) -> Result<AuctionStats> {
        let conn = self.conn();
        let (total_sold, total_spent): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(sold_price), 0) FROM players WHERE status = ?1",
            params![PlayerStatus::Assigned],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = conn.prepare(
            "SELECT p.name, p.role, p.sold_price, t.name
             FROM players p
             JOIN teams t ON t.id = p.team_id
             WHERE p.status = ?1
             ORDER BY p.sold_price DESC, p.id
             LIMIT 1",
        )?;
        let most_expensive_player = stmt
            .query_map(params![PlayerStatus::Assigned], |row| {
                Ok(TopSale {
                    name: row.get(0)?,
                    role: row.get(1)?,
                    sold_price: row.get(2)?,
                    team_name: row.get(3)?,
                })
            })?
            .next()
            .transpose()?;

        Ok(AuctionStats {
            total_sold,
            total_spent,
            most_expensive_player,
        })
    }

    pub fn team_summaries(&self) -> Result<Vec<TeamSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.initial_budget, t.current_budget,
                    COUNT(p.id), COALESCE(SUM(p.sold_price), 0)
             FROM teams t
             LEFT JOIN players p ON p.team_id = t.id AND p.status = ?1
             GROUP BY t.id
             ORDER BY t.id",
        )?;
        let summaries = stmt
            .query_map(params![PlayerStatus::Assigned], |row| {
                let players_count: i64 = row.get(4)?;
                let total_spent: i64 = row.get(5)?;
                Ok(TeamSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    initial_budget: row.get(2)?,
                    remaining_budget: row.get(3)?,
                    players_count,
                    total_spent,
                    average_price: average_price(total_spent, players_count),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }
}

fn average_price(total: i64, count: i64) -> i64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as i64
    }
}

fn query_teams(conn: &Connection) -> Result<Vec<Team>> {
    let mut stmt = conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY id"))?;
    let teams = stmt
        .query_map([], team_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(teams)
}

fn query_players(conn: &Connection, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Player>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE {filter} ORDER BY id"
    ))?;
    let players = stmt
        .query_map(args, player_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(players)
}

// Currency migration: rescale every purse and sale price onto a canonical
// budget, keeping each team's spent-to-budget ratio.

use rusqlite::params;
use serde::Serialize;
use tracing::info;

use crate::db::{team_from_row, Ledger, TEAM_COLUMNS};
use crate::error::{require_positive, Result};
use crate::model::PlayerStatus;

/// How one team was moved onto the canonical scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRescale {
    pub team_id: i64,
    pub name: String,
    pub scale: f64,
    pub old_initial: i64,
    pub old_current: i64,
    pub new_spent: i64,
    pub new_current: i64,
    pub players_rescaled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub canonical_budget: i64,
    pub canonical_base_price: i64,
    /// Players whose base price was reset.
    pub players_repriced: usize,
    /// Sale prices rewritten across all teams.
    pub players_rescaled: usize,
    pub teams: Vec<TeamRescale>,
}

/// Scale factor from a team's current cap to the canonical one. A team
/// already on the canonical cap, or with a non-positive cap, keeps scale 1.
pub fn team_scale(old_initial: i64, canonical_budget: i64) -> f64 {
    if old_initial == canonical_budget || old_initial <= 0 {
        1.0
    } else {
        canonical_budget as f64 / old_initial as f64
    }
}

/// Multiply and round half away from zero (`f64::round`).
pub fn rescale_amount(amount: i64, scale: f64) -> i64 {
    (amount as f64 * scale).round() as i64
}

/// New `(spent, current)` for a team on the canonical cap. An overspent team
/// is clamped to a zero purse, so its deficit is not carried over.
pub fn rescale_purse(old_initial: i64, old_current: i64, canonical_budget: i64) -> (i64, i64) {
    let scale = team_scale(old_initial, canonical_budget);
    let new_spent = rescale_amount(old_initial - old_current, scale);
    let new_current = (canonical_budget - new_spent).max(0);
    (new_spent, new_current)
}

impl Ledger {
    /// Move the whole ledger onto a canonical currency scale.
    ///
    /// Every base price becomes `canonical_base_price`; every team's cap
    /// becomes `canonical_budget` with its spend rescaled by the team's own
    /// factor, and every sale price of its players is rescaled by the same
    /// factor. Prices are rounded independently, so a team's rescaled sale
    /// prices need not sum exactly to its rescaled spend.
    ///
    /// Runs as a single transaction across all teams and players; any
    /// failure leaves the store exactly as it was.
    pub fn migrate_to_canonical_scale(
        &self,
        canonical_budget: i64,
        canonical_base_price: i64,
    ) -> Result<MigrationReport> {
        let canonical_budget = require_positive("canonical_budget", Some(canonical_budget))?;
        let canonical_base_price =
            require_positive("canonical_base_price", Some(canonical_base_price))?;

        let report = self.write_tx(|tx| {
            let players_repriced =
                tx.execute("UPDATE players SET base_price = ?1", params![canonical_base_price])?;

            let teams = {
                let mut stmt = tx.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY id"))?;
                let rows = stmt
                    .query_map([], team_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };

            let mut rescaled = Vec::with_capacity(teams.len());
            for team in teams {
                let scale = team_scale(team.initial_budget, canonical_budget);
                let (new_spent, new_current) =
                    rescale_purse(team.initial_budget, team.current_budget, canonical_budget);

                tx.execute(
                    "UPDATE teams SET initial_budget = ?1, current_budget = ?2 WHERE id = ?3",
                    params![canonical_budget, new_current, team.id],
                )?;

                let sales: Vec<(i64, i64)> = {
                    let mut stmt = tx.prepare(
                        "SELECT id, sold_price FROM players
                         WHERE team_id = ?1 AND status = ?2 AND sold_price IS NOT NULL",
                    )?;
                    let rows = stmt
                        .query_map(params![team.id, PlayerStatus::Assigned], |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                };
                for &(player_id, price) in &sales {
                    tx.execute(
                        "UPDATE players SET sold_price = ?1 WHERE id = ?2",
                        params![rescale_amount(price, scale), player_id],
                    )?;
                }

                rescaled.push(TeamRescale {
                    team_id: team.id,
                    name: team.name,
                    scale,
                    old_initial: team.initial_budget,
                    old_current: team.current_budget,
                    new_spent,
                    new_current,
                    players_rescaled: sales.len(),
                });
            }

            Ok(MigrationReport {
                canonical_budget,
                canonical_base_price,
                players_repriced,
                players_rescaled: rescaled.iter().map(|t| t.players_rescaled).sum(),
                teams: rescaled,
            })
        })?;

        for team in &report.teams {
            info!(
                team_id = team.team_id,
                scale = team.scale,
                old_initial = team.old_initial,
                old_current = team.old_current,
                new_current = team.new_current,
                players = team.players_rescaled,
                "Team rescaled"
            );
        }
        info!(
            canonical_budget,
            canonical_base_price,
            teams = report.teams.len(),
            repriced = report.players_repriced,
            rescaled = report.players_rescaled,
            "Currency migration committed"
        );
        Ok(report)
    }
}

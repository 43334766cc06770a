// Settlement engine: bids, sales, releases, resets, and administrative
// deletes. Every operation is one IMMEDIATE transaction; a failure rolls back
// every row it touched.

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{fetch_player, fetch_team, rename_team_in, Ledger};
use crate::error::{require_non_empty, require_positive, LedgerError, Result};
use crate::model::{now_timestamp, BidRecord, Player, PlayerStatus, Team};

/// Everything a completed sale changed.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub player: Player,
    pub team: Team,
    /// The binding ledger line recorded for the sale.
    pub bid: BidRecord,
}

/// Result of returning a player to the pool.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReceipt {
    pub player: Player,
    pub team: Team,
    pub refunded: i64,
}

/// Row counts touched by a full reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    pub players_reset: usize,
    pub teams_reset: usize,
    pub bids_cleared: usize,
}

impl Ledger {
    /// Record an advisory bid. Bids never reserve funds; the budget is only
    /// checked when the sale settles.
    pub fn place_bid(&self, player_id: i64, team_id: i64, bid_amount: i64) -> Result<BidRecord> {
        let player_id = require_positive("player_id", Some(player_id))?;
        let team_id = require_positive("team_id", Some(team_id))?;
        let bid_amount = require_positive("bid_amount", Some(bid_amount))?;

        let bid = self.write_tx(|tx| {
            fetch_player(tx, player_id)?;
            fetch_team(tx, team_id)?;
            append_bid(tx, player_id, team_id, bid_amount)
        })?;
        info!(bid_id = bid.id, player_id, team_id, bid_amount, "Bid recorded");
        Ok(bid)
    }

    /// Sell `player_id` to `team_id` for `sold_price`.
    ///
    /// Debits the team, assigns the player, and appends the binding bid in
    /// one transaction. The debit is conditional on the budget still
    /// covering the price at write time, so two sales racing against one
    /// team cannot both succeed.
    pub fn settle_sale(&self, player_id: i64, team_id: i64, sold_price: i64) -> Result<SaleReceipt> {
        let player_id = require_positive("player_id", Some(player_id))?;
        let team_id = require_positive("team_id", Some(team_id))?;
        let sold_price = require_positive("sold_price", Some(sold_price))?;

        let result = self.write_tx(|tx| {
            let team = fetch_team(tx, team_id)?;
            let player = fetch_player(tx, player_id)?;

            if player.status == PlayerStatus::Assigned {
                return Err(LedgerError::InvalidState(format!(
                    "player {player_id} is already sold to team {}",
                    player.team_id.unwrap_or_default()
                )));
            }

            let insufficient = LedgerError::InsufficientFunds {
                team_id,
                available: team.current_budget,
                requested: sold_price,
            };
            if team.current_budget < sold_price {
                return Err(insufficient);
            }

            let debited = tx.execute(
                "UPDATE teams SET current_budget = current_budget - ?1
                 WHERE id = ?2 AND current_budget >= ?1",
                params![sold_price, team_id],
            )?;
            if debited == 0 {
                return Err(insufficient);
            }

            tx.execute(
                "UPDATE players SET status = ?1, team_id = ?2, sold_price = ?3 WHERE id = ?4",
                params![PlayerStatus::Assigned, team_id, sold_price, player_id],
            )?;
            let bid = append_bid(tx, player_id, team_id, sold_price)?;

            Ok(SaleReceipt {
                player: fetch_player(tx, player_id)?,
                team: fetch_team(tx, team_id)?,
                bid,
            })
        });

        match &result {
            Ok(receipt) => info!(
                player_id,
                team_id,
                sold_price,
                remaining = receipt.team.current_budget,
                "Player sold"
            ),
            Err(e) => warn!(player_id, team_id, sold_price, error = %e, "Sale rejected"),
        }
        result
    }

    /// Mark a player as having gone unsold.
    ///
    /// Only an Available player changes state. A sold player keeps its team
    /// and price, and a passed-over player stays passed over.
    pub fn mark_passed_over(&self, player_id: i64) -> Result<Player> {
        let player_id = require_positive("player_id", Some(player_id))?;

        self.write_tx(|tx| {
            let player = fetch_player(tx, player_id)?;
            if player.status != PlayerStatus::Available {
                info!(player_id, status = %player.status, "Pass-over left player unchanged");
                return Ok(player);
            }
            tx.execute(
                "UPDATE players SET status = ?1 WHERE id = ?2",
                params![PlayerStatus::PassedOver, player_id],
            )?;
            info!(player_id, "Player passed over");
            fetch_player(tx, player_id)
        })
    }

    /// Undo a sale: refund the exact sale price to the owning team and put
    /// the player back on the block.
    pub fn release(&self, player_id: i64) -> Result<ReleaseReceipt> {
        let player_id = require_positive("player_id", Some(player_id))?;

        let result = self.write_tx(|tx| {
            let player = fetch_player(tx, player_id)?;
            let (team_id, price) = match (player.status, player.team_id, player.sold_price) {
                (PlayerStatus::Assigned, Some(team_id), Some(price)) => (team_id, price),
                _ => {
                    return Err(LedgerError::InvalidState(format!(
                        "player {player_id} has no owning team"
                    )))
                }
            };

            tx.execute(
                "UPDATE teams SET current_budget = current_budget + ?1 WHERE id = ?2",
                params![price, team_id],
            )?;
            tx.execute(
                "UPDATE players SET status = ?1, team_id = NULL, sold_price = NULL WHERE id = ?2",
                params![PlayerStatus::Available, player_id],
            )?;

            Ok(ReleaseReceipt {
                player: fetch_player(tx, player_id)?,
                team: fetch_team(tx, team_id)?,
                refunded: price,
            })
        });

        match &result {
            Ok(r) => info!(player_id, team_id = r.team.id, refunded = r.refunded, "Player released"),
            Err(e) => warn!(player_id, error = %e, "Release rejected"),
        }
        result
    }

    /// Return the whole auction to its starting point: every player
    /// Available, every purse full, the ledger empty. Identities survive.
    pub fn reset_all(&self) -> Result<ResetSummary> {
        let summary = self.write_tx(|tx| {
            let players_reset = tx.execute(
                "UPDATE players SET status = ?1, team_id = NULL, sold_price = NULL",
                params![PlayerStatus::Available],
            )?;
            let teams_reset = tx.execute("UPDATE teams SET current_budget = initial_budget", [])?;
            let bids_cleared = tx.execute("DELETE FROM auction_history", [])?;
            Ok(ResetSummary {
                players_reset,
                teams_reset,
                bids_cleared,
            })
        })?;
        info!(
            players = summary.players_reset,
            teams = summary.teams_reset,
            bids = summary.bids_cleared,
            "Auction reset"
        );
        Ok(summary)
    }

    /// Change a team's spending cap while keeping the absolute amount it has
    /// already spent. A cap below that amount leaves `current_budget`
    /// negative; it is not clamped.
    pub fn edit_team_budget(&self, team_id: i64, new_initial_budget: i64) -> Result<Team> {
        let new_initial_budget = require_positive("initial_budget", Some(new_initial_budget))?;
        self.write_tx(|tx| {
            recap_team(tx, team_id, new_initial_budget)?;
            fetch_team(tx, team_id)
        })
    }

    /// Rename and/or re-cap a team. Both changes commit together or not at
    /// all; at least one must be given.
    pub fn update_team(
        &self,
        team_id: i64,
        name: Option<&str>,
        new_initial_budget: Option<i64>,
    ) -> Result<Team> {
        if name.is_none() && new_initial_budget.is_none() {
            return Err(LedgerError::Validation(
                "nothing to update: expected `name` and/or `initial_budget`".into(),
            ));
        }
        let name = name.map(|n| require_non_empty("name", n)).transpose()?;
        let new_initial_budget = new_initial_budget
            .map(|b| require_positive("initial_budget", Some(b)))
            .transpose()?;

        self.write_tx(|tx| {
            fetch_team(tx, team_id)?;
            if let Some(name) = name {
                rename_team_in(tx, team_id, name)?;
            }
            if let Some(budget) = new_initial_budget {
                recap_team(tx, team_id, budget)?;
            }
            let team = fetch_team(tx, team_id)?;
            info!(team_id, name = %team.name, initial_budget = team.initial_budget, "Team updated");
            Ok(team)
        })
    }

    /// Delete a team and its ledger lines. Refused while any player still
    /// points at the team, whatever that player's state. Returns the number
    /// of bids removed.
    pub fn delete_team(&self, team_id: i64) -> Result<usize> {
        self.write_tx(|tx| {
            fetch_team(tx, team_id)?;
            let owned: i64 = tx.query_row(
                "SELECT COUNT(*) FROM players WHERE team_id = ?1",
                params![team_id],
                |row| row.get(0),
            )?;
            if owned > 0 {
                warn!(team_id, owned, "Team delete blocked by owned players");
                return Err(LedgerError::Conflict(format!(
                    "team {team_id} still owns {owned} player(s)"
                )));
            }
            let bids = tx.execute("DELETE FROM auction_history WHERE team_id = ?1", params![team_id])?;
            tx.execute("DELETE FROM teams WHERE id = ?1", params![team_id])?;
            info!(team_id, bids, "Team deleted");
            Ok(bids)
        })
    }

    /// Delete a player and its ledger lines. A sold player's price is not
    /// refunded to its team. Returns the number of bids removed.
    pub fn delete_player(&self, player_id: i64) -> Result<usize> {
        self.write_tx(|tx| {
            let player = fetch_player(tx, player_id)?;
            if let (Some(team_id), Some(price)) = (player.team_id, player.sold_price) {
                warn!(player_id, team_id, price, "Deleting sold player without refund");
            }
            let bids = tx.execute(
                "DELETE FROM auction_history WHERE player_id = ?1",
                params![player_id],
            )?;
            tx.execute("DELETE FROM players WHERE id = ?1", params![player_id])?;
            info!(player_id, bids, "Player deleted");
            Ok(bids)
        })
    }

    /// Remove one ledger line. Budgets and player state are not touched.
    pub fn delete_bid(&self, bid_id: i64) -> Result<()> {
        self.write_tx(|tx| {
            let removed = tx.execute("DELETE FROM auction_history WHERE id = ?1", params![bid_id])?;
            if removed == 0 {
                return Err(LedgerError::not_found("bid", bid_id));
            }
            info!(bid_id, "Bid deleted");
            Ok(())
        })
    }
}

fn recap_team(conn: &Connection, team_id: i64, new_initial_budget: i64) -> Result<()> {
    let team = fetch_team(conn, team_id)?;
    let spent = team.spent();
    let new_current = new_initial_budget - spent;
    if new_current < 0 {
        warn!(
            team_id,
            spent,
            new_initial_budget,
            "Budget cap below amount already spent, purse goes negative"
        );
    }
    conn.execute(
        "UPDATE teams SET initial_budget = ?1, current_budget = ?2 WHERE id = ?3",
        params![new_initial_budget, new_current, team_id],
    )?;
    info!(team_id, new_initial_budget, new_current, "Team budget edited");
    Ok(())
}

fn append_bid(conn: &Connection, player_id: i64, team_id: i64, amount: i64) -> Result<BidRecord> {
    let bid_time = now_timestamp();
    conn.execute(
        "INSERT INTO auction_history (player_id, team_id, bid_amount, bid_time)
         VALUES (?1, ?2, ?3, ?4)",
        params![player_id, team_id, amount, bid_time],
    )?;
    Ok(BidRecord {
        id: conn.last_insert_rowid(),
        player_id,
        team_id,
        bid_amount: amount,
        bid_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewPlayer, NewTeam};

    struct Fixture {
        ledger: Ledger,
        team_a: i64,
        team_b: i64,
        player_1: i64,
        player_2: i64,
    }

    /// Two teams with 10000 each, two available players.
    fn fixture() -> Fixture {
        let ledger = Ledger::open(":memory:").expect("in-memory ledger should open");
        let team_a = ledger
            .create_team(&NewTeam {
                name: "Team A".into(),
                initial_budget: 10_000,
            })
            .unwrap()
            .id;
        let team_b = ledger
            .create_team(&NewTeam {
                name: "Team B".into(),
                initial_budget: 10_000,
            })
            .unwrap()
            .id;
        let player_1 = ledger
            .create_player(&NewPlayer {
                name: "Hardik Pandya".into(),
                role: "All-Rounder".into(),
                base_price: 100,
                jersey_no: Some(33),
            })
            .unwrap()
            .id;
        let player_2 = ledger
            .create_player(&NewPlayer {
                name: "Mohammed Shami".into(),
                role: "Bowler".into(),
                base_price: 100,
                jersey_no: None,
            })
            .unwrap()
            .id;
        Fixture {
            ledger,
            team_a,
            team_b,
            player_1,
            player_2,
        }
    }

    fn bid_count(ledger: &Ledger) -> i64 {
        ledger
            .conn()
            .query_row("SELECT COUNT(*) FROM auction_history", [], |row| row.get(0))
            .unwrap()
    }

    // ------------------------------------------------------------------
    // place_bid
    // ------------------------------------------------------------------

    #[test]
    fn place_bid_appends_without_touching_budget() {
        let f = fixture();
        let bid = f.ledger.place_bid(f.player_1, f.team_a, 50_000).unwrap();
        assert!(bid.id > 0);
        assert_eq!(bid.bid_amount, 50_000);

        // Advisory: even a bid above the purse is recorded and nothing is debited.
        assert_eq!(f.ledger.get_team(f.team_a).unwrap().current_budget, 10_000);
        assert_eq!(
            f.ledger.get_player(f.player_1).unwrap().status,
            PlayerStatus::Available
        );
        assert_eq!(bid_count(&f.ledger), 1);
    }

    #[test]
    fn place_bid_requires_every_field() {
        let f = fixture();
        for (p, t, a) in [(0, f.team_a, 10), (f.player_1, 0, 10), (f.player_1, f.team_a, 0)] {
            let err = f.ledger.place_bid(p, t, a).unwrap_err();
            assert_eq!(err.kind(), "validation");
        }
        assert_eq!(bid_count(&f.ledger), 0);
    }

    #[test]
    fn place_bid_unknown_team_is_not_found() {
        let f = fixture();
        let err = f.ledger.place_bid(f.player_1, 99, 10).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "team", id: 99 }));
    }

    // ------------------------------------------------------------------
    // settle_sale
    // ------------------------------------------------------------------

    #[test]
    fn settle_sale_debits_assigns_and_records() {
        let f = fixture();
        let receipt = f.ledger.settle_sale(f.player_1, f.team_a, 4_000).unwrap();

        assert_eq!(receipt.team.current_budget, 6_000);
        assert_eq!(receipt.player.status, PlayerStatus::Assigned);
        assert_eq!(receipt.player.team_id, Some(f.team_a));
        assert_eq!(receipt.player.sold_price, Some(4_000));
        assert_eq!(receipt.bid.bid_amount, 4_000);
        assert_eq!(receipt.bid.team_id, f.team_a);
        assert_eq!(bid_count(&f.ledger), 1);
    }

    #[test]
    fn settle_sale_exact_budget_is_allowed() {
        let f = fixture();
        let receipt = f.ledger.settle_sale(f.player_1, f.team_a, 10_000).unwrap();
        assert_eq!(receipt.team.current_budget, 0);
    }

    #[test]
    fn settle_sale_over_budget_changes_nothing() {
        let f = fixture();
        let err = f.ledger.settle_sale(f.player_1, f.team_a, 12_000).unwrap_err();
        match err {
            LedgerError::InsufficientFunds {
                team_id,
                available,
                requested,
            } => {
                assert_eq!(team_id, f.team_a);
                assert_eq!(available, 10_000);
                assert_eq!(requested, 12_000);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(f.ledger.get_team(f.team_a).unwrap().current_budget, 10_000);
        assert_eq!(
            f.ledger.get_player(f.player_1).unwrap().status,
            PlayerStatus::Available
        );
        assert_eq!(bid_count(&f.ledger), 0);
    }

    #[test]
    fn settle_sale_unknown_team_or_player() {
        let f = fixture();
        assert!(matches!(
            f.ledger.settle_sale(f.player_1, 77, 10).unwrap_err(),
            LedgerError::NotFound { entity: "team", .. }
        ));
        assert!(matches!(
            f.ledger.settle_sale(77, f.team_a, 10).unwrap_err(),
            LedgerError::NotFound { entity: "player", .. }
        ));
        assert_eq!(f.ledger.get_team(f.team_a).unwrap().current_budget, 10_000);
    }

    #[test]
    fn settle_sale_zero_price_is_validation() {
        let f = fixture();
        let err = f.ledger.settle_sale(f.player_1, f.team_a, 0).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn second_sale_of_same_player_is_rejected() {
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 1_000).unwrap();
        let err = f.ledger.settle_sale(f.player_1, f.team_b, 2_000).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState(_)), "got {err:?}");

        let player = f.ledger.get_player(f.player_1).unwrap();
        assert_eq!(player.team_id, Some(f.team_a));
        assert_eq!(f.ledger.get_team(f.team_b).unwrap().current_budget, 10_000);
    }

    #[test]
    fn passed_over_player_can_be_sold_later() {
        let f = fixture();
        f.ledger.mark_passed_over(f.player_2).unwrap();
        let receipt = f.ledger.settle_sale(f.player_2, f.team_b, 500).unwrap();
        assert_eq!(receipt.player.status, PlayerStatus::Assigned);
        assert_eq!(receipt.team.current_budget, 9_500);
    }

    // ------------------------------------------------------------------
    // mark_passed_over
    // ------------------------------------------------------------------

    #[test]
    fn mark_passed_over_from_available() {
        let f = fixture();
        let player = f.ledger.mark_passed_over(f.player_1).unwrap();
        assert_eq!(player.status, PlayerStatus::PassedOver);
        assert!(player.is_sold());
        assert!(player.team_id.is_none());
    }

    #[test]
    fn mark_passed_over_leaves_sold_player_alone() {
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 3_000).unwrap();
        let player = f.ledger.mark_passed_over(f.player_1).unwrap();
        assert_eq!(player.status, PlayerStatus::Assigned);
        assert_eq!(player.team_id, Some(f.team_a));
        assert_eq!(player.sold_price, Some(3_000));
        assert_eq!(f.ledger.get_team(f.team_a).unwrap().current_budget, 7_000);
    }

    #[test]
    fn mark_passed_over_missing_player() {
        let f = fixture();
        assert_eq!(f.ledger.mark_passed_over(404).unwrap_err().kind(), "not_found");
        assert_eq!(f.ledger.mark_passed_over(0).unwrap_err().kind(), "validation");
    }

    // ------------------------------------------------------------------
    // release
    // ------------------------------------------------------------------

    #[test]
    fn release_refunds_exact_price() {
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 4_000).unwrap();
        let receipt = f.ledger.release(f.player_1).unwrap();

        assert_eq!(receipt.refunded, 4_000);
        assert_eq!(receipt.team.current_budget, 10_000);
        assert_eq!(receipt.player.status, PlayerStatus::Available);
        assert!(receipt.player.team_id.is_none());
        assert!(receipt.player.sold_price.is_none());
        // The sale's ledger line stays; history is append-only.
        assert_eq!(bid_count(&f.ledger), 1);
    }

    #[test]
    fn release_without_owner_is_invalid_state() {
        let f = fixture();
        assert!(matches!(
            f.ledger.release(f.player_1).unwrap_err(),
            LedgerError::InvalidState(_)
        ));
        f.ledger.mark_passed_over(f.player_1).unwrap();
        assert!(matches!(
            f.ledger.release(f.player_1).unwrap_err(),
            LedgerError::InvalidState(_)
        ));
        assert_eq!(f.ledger.release(999).unwrap_err().kind(), "not_found");
    }

    // ------------------------------------------------------------------
    // reset_all
    // ------------------------------------------------------------------

    #[test]
    fn reset_restores_everything_and_is_idempotent() {
        let f = fixture();
        f.ledger.place_bid(f.player_2, f.team_b, 300).unwrap();
        f.ledger.settle_sale(f.player_1, f.team_a, 4_000).unwrap();
        f.ledger.mark_passed_over(f.player_2).unwrap();

        let first = f.ledger.reset_all().unwrap();
        assert_eq!(first.players_reset, 2);
        assert_eq!(first.teams_reset, 2);
        assert_eq!(first.bids_cleared, 2);

        let second = f.ledger.reset_all().unwrap();
        assert_eq!(second.bids_cleared, 0);

        for id in [f.player_1, f.player_2] {
            let p = f.ledger.get_player(id).unwrap();
            assert_eq!(p.status, PlayerStatus::Available);
            assert!(p.team_id.is_none());
        }
        for id in [f.team_a, f.team_b] {
            let t = f.ledger.get_team(id).unwrap();
            assert_eq!(t.current_budget, t.initial_budget);
        }
        assert_eq!(bid_count(&f.ledger), 0);
    }

    // ------------------------------------------------------------------
    // edit_team_budget
    // ------------------------------------------------------------------

    #[test]
    fn edit_budget_preserves_absolute_spend() {
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 4_000).unwrap();
        let team = f.ledger.edit_team_budget(f.team_a, 20_000).unwrap();
        assert_eq!(team.initial_budget, 20_000);
        assert_eq!(team.current_budget, 16_000);
    }

    #[test]
    fn edit_budget_below_spend_goes_negative() {
        // Known lossy edge: the purse is not clamped at zero.
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 4_000).unwrap();
        let team = f.ledger.edit_team_budget(f.team_a, 3_000).unwrap();
        assert_eq!(team.initial_budget, 3_000);
        assert_eq!(team.current_budget, -1_000);

        // A negative purse cannot pay for anything.
        let err = f.ledger.settle_sale(f.player_2, f.team_a, 1).unwrap_err();
        assert_eq!(err.kind(), "insufficient_funds");
    }

    #[test]
    fn edit_budget_validation_and_missing_team() {
        let f = fixture();
        assert_eq!(f.ledger.edit_team_budget(f.team_a, 0).unwrap_err().kind(), "validation");
        assert_eq!(f.ledger.edit_team_budget(55, 100).unwrap_err().kind(), "not_found");
    }

    // ------------------------------------------------------------------
    // update_team
    // ------------------------------------------------------------------

    #[test]
    fn update_team_renames_and_recaps_together() {
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 4_000).unwrap();
        let team = f
            .ledger
            .update_team(f.team_a, Some("  Royal Challengers "), Some(20_000))
            .unwrap();
        assert_eq!(team.name, "Royal Challengers");
        assert_eq!(team.initial_budget, 20_000);
        assert_eq!(team.current_budget, 16_000);
    }

    #[test]
    fn update_team_rolls_back_rename_when_recap_fails() {
        let f = fixture();
        f.ledger
            .conn()
            .execute_batch(
                "CREATE TRIGGER block_recap BEFORE UPDATE OF initial_budget ON teams
                 BEGIN SELECT RAISE(ABORT, 'recap blocked'); END;",
            )
            .unwrap();

        let err = f
            .ledger
            .update_team(f.team_a, Some("Renamed"), Some(12_000))
            .unwrap_err();
        assert_eq!(err.kind(), "internal");

        let team = f.ledger.get_team(f.team_a).unwrap();
        assert_eq!(team.name, "Team A");
        assert_eq!(team.initial_budget, 10_000);
    }

    #[test]
    fn update_team_validates_before_writing() {
        let f = fixture();
        let err = f.ledger.update_team(f.team_a, Some("Renamed"), Some(0)).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(f.ledger.get_team(f.team_a).unwrap().name, "Team A");

        assert_eq!(f.ledger.update_team(f.team_a, None, None).unwrap_err().kind(), "validation");
        assert_eq!(f.ledger.update_team(f.team_a, Some("  "), None).unwrap_err().kind(), "validation");
        assert_eq!(f.ledger.update_team(404, Some("Ghost"), None).unwrap_err().kind(), "not_found");
        assert_eq!(
            f.ledger.update_team(f.team_a, Some("Team B"), None).unwrap_err().kind(),
            "conflict"
        );
    }

    // ------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------

    #[test]
    fn delete_team_blocked_until_players_released() {
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 1_000).unwrap();
        f.ledger.place_bid(f.player_2, f.team_a, 200).unwrap();

        let err = f.ledger.delete_team(f.team_a).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(f.ledger.get_team(f.team_a).is_ok());

        f.ledger.release(f.player_1).unwrap();
        let removed = f.ledger.delete_team(f.team_a).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(f.ledger.get_team(f.team_a).unwrap_err().kind(), "not_found");
        assert_eq!(bid_count(&f.ledger), 0);
    }

    #[test]
    fn delete_missing_team_is_not_found() {
        let f = fixture();
        assert_eq!(f.ledger.delete_team(1234).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn delete_sold_player_does_not_refund() {
        // Known lossy edge: the team's spend stays on the books.
        let f = fixture();
        f.ledger.settle_sale(f.player_1, f.team_a, 2_500).unwrap();
        let removed = f.ledger.delete_player(f.player_1).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(f.ledger.get_player(f.player_1).unwrap_err().kind(), "not_found");
        assert_eq!(f.ledger.get_team(f.team_a).unwrap().current_budget, 7_500);

        // With the player gone nothing references the team any more.
        assert!(f.ledger.delete_team(f.team_a).is_ok());
    }

    #[test]
    fn delete_bid_removes_single_line() {
        let f = fixture();
        let first = f.ledger.place_bid(f.player_1, f.team_a, 100).unwrap();
        f.ledger.place_bid(f.player_1, f.team_b, 200).unwrap();

        f.ledger.delete_bid(first.id).unwrap();
        assert_eq!(bid_count(&f.ledger), 1);
        assert_eq!(f.ledger.delete_bid(first.id).unwrap_err().kind(), "not_found");
    }
}

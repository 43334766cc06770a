// SQLite ledger store: schema, legacy upgrade, and catalogue administration.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{info, warn};

use crate::error::{require_non_empty, require_positive, LedgerError, Result};
use crate::model::{now_timestamp, NewPlayer, NewTeam, Player, PlayerUpdate, Team};

pub(crate) const TEAM_COLUMNS: &str =
    "id, name, initial_budget, current_budget, COALESCE(created_at, '')";

pub(crate) const PLAYER_COLUMNS: &str = "id, name, role, base_price, jersey_no, status, team_id, \
     sold_price, COALESCE(created_at, '')";

/// DDL for the players table. Parameterised on the table name so the legacy
/// upgrade can build the replacement table under a temporary name.
fn players_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            role       TEXT NOT NULL,
            base_price INTEGER NOT NULL,
            jersey_no  INTEGER,
            status     TEXT NOT NULL DEFAULT 'available',
            team_id    INTEGER REFERENCES teams(id),
            sold_price INTEGER,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            CHECK (
                (status = 'available'   AND team_id IS NULL     AND sold_price IS NULL) OR
                (status = 'assigned'    AND team_id IS NOT NULL AND sold_price IS NOT NULL) OR
                (status = 'passed_over' AND team_id IS NULL     AND sold_price IS NULL)
            )
        );"
    )
}

/// SQLite-backed storage for teams, players, and the bid ledger.
///
/// The connection sits behind a mutex and is acquired per operation; the
/// guard (and any open transaction) is released on every exit path.
pub struct Ledger {
    conn: Mutex<Connection>,
    path: String,
}

impl Ledger {
    /// Open (or create) a ledger at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral database (useful for tests).
    ///
    /// Databases from earlier releases, whose players table
    /// carries an `is_sold` flag instead of a `status` column, are upgraded
    /// in place.
    pub fn open(path: &str) -> Result<Self> {
        let mut conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                name           TEXT NOT NULL UNIQUE,
                initial_budget INTEGER NOT NULL,
                current_budget INTEGER NOT NULL,
                created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            {players}

            CREATE TABLE IF NOT EXISTS auction_history (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id  INTEGER NOT NULL REFERENCES players(id),
                team_id    INTEGER NOT NULL REFERENCES teams(id),
                bid_amount INTEGER NOT NULL,
                bid_time   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            ",
            players = players_ddl("players"),
        ))?;

        Self::upgrade_legacy_players(&mut conn)?;

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_history_bid_time ON auction_history(bid_time);
             CREATE INDEX IF NOT EXISTS idx_history_player ON auction_history(player_id);
             CREATE INDEX IF NOT EXISTS idx_history_team ON auction_history(team_id);
             CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_string(),
        })
    }

    /// Rebuild a legacy players table (boolean `is_sold`, maybe no
    /// `jersey_no`) into the status-tagged layout.
    ///
    /// No-op when the `status` column already exists. Follows SQLite's
    /// create-copy-drop-rename procedure with foreign keys switched off, since
    /// the history table references players by id and ids are preserved.
    fn upgrade_legacy_players(conn: &mut Connection) -> Result<()> {
        let has_status = conn.prepare("SELECT status FROM players LIMIT 0").is_ok();
        if has_status {
            return Ok(());
        }

        let has_jersey = conn.prepare("SELECT jersey_no FROM players LIMIT 0").is_ok();
        let jersey_expr = if has_jersey { "jersey_no" } else { "NULL" };
        warn!("Legacy players table detected, upgrading to status column");

        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "
            {ddl}

            INSERT INTO players_new
                (id, name, role, base_price, jersey_no, status, team_id, sold_price, created_at)
            SELECT
                id, name, role, base_price, {jersey_expr},
                CASE
                    WHEN COALESCE(is_sold, 0) = 0 THEN 'available'
                    WHEN team_id IS NOT NULL AND sold_price IS NOT NULL THEN 'assigned'
                    ELSE 'passed_over'
                END,
                CASE WHEN COALESCE(is_sold, 0) <> 0 AND team_id IS NOT NULL AND sold_price IS NOT NULL
                     THEN team_id END,
                CASE WHEN COALESCE(is_sold, 0) <> 0 AND team_id IS NOT NULL AND sold_price IS NOT NULL
                     THEN sold_price END,
                COALESCE(created_at, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            FROM players;

            DROP TABLE players;
            ALTER TABLE players_new RENAME TO players;

            UPDATE auction_history
               SET bid_time = replace(bid_time, ' ', 'T') || 'Z'
             WHERE bid_time NOT LIKE '%T%';
            ",
            ddl = players_ddl("players_new"),
        ))?;
        tx.commit()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        info!("Legacy players table upgraded");
        Ok(())
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("ledger mutex poisoned")
    }

    /// Run `f` inside an IMMEDIATE transaction: the write lock is taken up
    /// front, so a read-check-write sequence cannot interleave with another
    /// writer. Commits on `Ok`; any `Err` drops the transaction, which rolls
    /// it back.
    pub(crate) fn write_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// The path this ledger was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    /// Register a team with a full purse (`current_budget = initial_budget`).
    pub fn create_team(&self, team: &NewTeam) -> Result<Team> {
        let name = require_non_empty("name", &team.name)?;
        let budget = require_positive("initial_budget", Some(team.initial_budget))?;

        let created = self.write_tx(|tx| {
            let id = insert_team(tx, name, budget)?;
            fetch_team(tx, id)
        })?;
        info!(team_id = created.id, name = %created.name, budget, "Team created");
        Ok(created)
    }

    /// Change a team's display name. Budgets are untouched.
    pub fn rename_team(&self, team_id: i64, name: &str) -> Result<Team> {
        let name = require_non_empty("name", name)?;
        self.write_tx(|tx| {
            rename_team_in(tx, team_id, name)?;
            fetch_team(tx, team_id)
        })
    }

    pub fn get_team(&self, team_id: i64) -> Result<Team> {
        let conn = self.conn();
        fetch_team(&conn, team_id)
    }

    /// All teams ordered by id.
    pub fn list_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY id"))?;
        let teams = stmt
            .query_map([], team_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Add a player to the catalogue in the Available state.
    pub fn create_player(&self, player: &NewPlayer) -> Result<Player> {
        let name = require_non_empty("name", &player.name)?;
        let role = require_non_empty("role", &player.role)?;
        let base_price = require_positive("base_price", Some(player.base_price))?;

        let created = self.write_tx(|tx| {
            let id = insert_player(tx, name, role, base_price, player.jersey_no)?;
            fetch_player(tx, id)
        })?;
        info!(player_id = created.id, name = %created.name, "Player created");
        Ok(created)
    }

    /// Edit catalogue fields. Fields left as `None` keep their value; the
    /// settlement columns are never touched here.
    pub fn update_player(&self, player_id: i64, update: &PlayerUpdate) -> Result<Player> {
        let name = update
            .name
            .as_deref()
            .map(|n| require_non_empty("name", n))
            .transpose()?;
        let role = update
            .role
            .as_deref()
            .map(|r| require_non_empty("role", r))
            .transpose()?;
        let base_price = update
            .base_price
            .map(|p| require_positive("base_price", Some(p)))
            .transpose()?;

        self.write_tx(|tx| {
            let current = fetch_player(tx, player_id)?;
            tx.execute(
                "UPDATE players SET name = ?1, role = ?2, base_price = ?3, jersey_no = ?4
                 WHERE id = ?5",
                params![
                    name.unwrap_or(&current.name),
                    role.unwrap_or(&current.role),
                    base_price.unwrap_or(current.base_price),
                    update.jersey_no.or(current.jersey_no),
                    player_id,
                ],
            )?;
            fetch_player(tx, player_id)
        })
    }

    pub fn get_player(&self, player_id: i64) -> Result<Player> {
        let conn = self.conn();
        fetch_player(&conn, player_id)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Insert the seed roster in one transaction, but only into a ledger with
    /// no teams yet. Returns `true` when rows were inserted.
    pub fn seed_if_empty(&self, teams: &[NewTeam], players: &[NewPlayer]) -> Result<bool> {
        let seeded = self.write_tx(|tx| {
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(false);
            }
            for team in teams {
                let name = require_non_empty("name", &team.name)?;
                let budget = require_positive("initial_budget", Some(team.initial_budget))?;
                insert_team(tx, name, budget)?;
            }
            for player in players {
                let name = require_non_empty("name", &player.name)?;
                let role = require_non_empty("role", &player.role)?;
                let base_price = require_positive("base_price", Some(player.base_price))?;
                insert_player(tx, name, role, base_price, player.jersey_no)?;
            }
            Ok(true)
        })?;

        if seeded {
            info!(
                teams = teams.len(),
                players = players.len(),
                "Seeded initial auction roster"
            );
        }
        Ok(seeded)
    }
}

// ----------------------------------------------------------------------
// Row helpers shared by the engine modules
// ----------------------------------------------------------------------

pub(crate) fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        initial_budget: row.get(2)?,
        current_budget: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        base_price: row.get(3)?,
        jersey_no: row.get(4)?,
        status: row.get(5)?,
        team_id: row.get(6)?,
        sold_price: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn fetch_team(conn: &Connection, team_id: i64) -> Result<Team> {
    conn.query_row(
        &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?1"),
        params![team_id],
        team_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("team", team_id))
}

pub(crate) fn fetch_player(conn: &Connection, player_id: i64) -> Result<Player> {
    conn.query_row(
        &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
        params![player_id],
        player_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("player", player_id))
}

fn insert_team(conn: &Connection, name: &str, budget: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO teams (name, initial_budget, current_budget, created_at)
         VALUES (?1, ?2, ?2, ?3)",
        params![name, budget, now_timestamp()],
    )
    .map_err(|e| unique_to_conflict(e, name))?;
    Ok(conn.last_insert_rowid())
}

fn insert_player(
    conn: &Connection,
    name: &str,
    role: &str,
    base_price: i64,
    jersey_no: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO players (name, role, base_price, jersey_no, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, role, base_price, jersey_no, now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Translate a UNIQUE violation on the team name into `Conflict`; every
/// other store error passes through.
/// Rename inside an open transaction. `name` must already be trimmed.
pub(crate) fn rename_team_in(conn: &Connection, team_id: i64, name: &str) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE teams SET name = ?1 WHERE id = ?2",
            params![name, team_id],
        )
        .map_err(|e| unique_to_conflict(e, name))?;
    if changed == 0 {
        return Err(LedgerError::not_found("team", team_id));
    }
    Ok(())
}

fn unique_to_conflict(err: rusqlite::Error, name: &str) -> LedgerError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            LedgerError::Conflict(format!("team name `{name}` is already taken"))
        }
        _ => LedgerError::Store(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayerStatus;

    /// Helper: create a fresh in-memory ledger for each test.
    fn test_ledger() -> Ledger {
        Ledger::open(":memory:").expect("in-memory ledger should open")
    }

    fn new_team(name: &str, budget: i64) -> NewTeam {
        NewTeam {
            name: name.into(),
            initial_budget: budget,
        }
    }

    fn new_player(name: &str) -> NewPlayer {
        NewPlayer {
            name: name.into(),
            role: "Batsman".into(),
            base_price: 2_000_000,
            jersey_no: None,
        }
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let ledger = test_ledger();
        let conn = ledger.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"teams".to_string()));
        assert!(tables.contains(&"players".to_string()));
        assert!(tables.contains(&"auction_history".to_string()));
    }

    #[test]
    fn foreign_keys_enforced() {
        let ledger = test_ledger();
        let conn = ledger.conn();
        let result = conn.execute(
            "INSERT INTO auction_history (player_id, team_id, bid_amount) VALUES (999, 999, 10)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn status_check_rejects_assigned_without_team() {
        let ledger = test_ledger();
        let player = ledger.create_player(&new_player("KL Rahul")).unwrap();
        let conn = ledger.conn();
        let result = conn.execute(
            "UPDATE players SET status = 'assigned' WHERE id = ?1",
            params![player.id],
        );
        assert!(result.is_err(), "assigned without a team must violate the CHECK");
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    #[test]
    fn create_team_starts_with_full_purse() {
        let ledger = test_ledger();
        let team = ledger.create_team(&new_team("Mumbai Indians", 10_000)).unwrap();
        assert!(team.id > 0);
        assert_eq!(team.initial_budget, 10_000);
        assert_eq!(team.current_budget, 10_000);
        assert!(!team.created_at.is_empty());
    }

    #[test]
    fn duplicate_team_name_is_conflict() {
        let ledger = test_ledger();
        ledger.create_team(&new_team("Mumbai Indians", 10_000)).unwrap();
        let err = ledger
            .create_team(&new_team("Mumbai Indians", 5_000))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)), "got {err:?}");
        assert_eq!(ledger.list_teams().unwrap().len(), 1);
    }

    #[test]
    fn create_team_rejects_blank_name_and_zero_budget() {
        let ledger = test_ledger();
        assert!(matches!(
            ledger.create_team(&new_team("  ", 100)).unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            ledger.create_team(&new_team("Chennai", 0)).unwrap_err(),
            LedgerError::Validation(_)
        ));
    }

    #[test]
    fn rename_team_checks_existence_and_uniqueness() {
        let ledger = test_ledger();
        let a = ledger.create_team(&new_team("A", 100)).unwrap();
        ledger.create_team(&new_team("B", 100)).unwrap();

        let renamed = ledger.rename_team(a.id, "Alpha").unwrap();
        assert_eq!(renamed.name, "Alpha");
        assert_eq!(renamed.current_budget, 100);

        assert!(matches!(
            ledger.rename_team(a.id, "B").unwrap_err(),
            LedgerError::Conflict(_)
        ));
        assert!(matches!(
            ledger.rename_team(404, "Gamma").unwrap_err(),
            LedgerError::NotFound { entity: "team", id: 404 }
        ));
    }

    #[test]
    fn get_team_not_found() {
        let ledger = test_ledger();
        let err = ledger.get_team(7).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    #[test]
    fn create_player_is_available() {
        let ledger = test_ledger();
        let player = ledger
            .create_player(&NewPlayer {
                jersey_no: Some(45),
                ..new_player("Rohit Sharma")
            })
            .unwrap();
        assert_eq!(player.status, PlayerStatus::Available);
        assert_eq!(player.jersey_no, Some(45));
        assert!(player.team_id.is_none());
        assert!(player.sold_price.is_none());
    }

    #[test]
    fn update_player_changes_only_given_fields() {
        let ledger = test_ledger();
        let player = ledger.create_player(&new_player("Jasprit Bumrah")).unwrap();

        let updated = ledger
            .update_player(
                player.id,
                &PlayerUpdate {
                    role: Some("Bowler".into()),
                    jersey_no: Some(93),
                    ..PlayerUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Jasprit Bumrah");
        assert_eq!(updated.role, "Bowler");
        assert_eq!(updated.base_price, 2_000_000);
        assert_eq!(updated.jersey_no, Some(93));
        assert_eq!(updated.status, PlayerStatus::Available);
    }

    #[test]
    fn update_player_rejects_zero_price() {
        let ledger = test_ledger();
        let player = ledger.create_player(&new_player("MS Dhoni")).unwrap();
        let err = ledger
            .update_player(
                player.id,
                &PlayerUpdate {
                    base_price: Some(0),
                    ..PlayerUpdate::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn update_missing_player_is_not_found() {
        let ledger = test_ledger();
        let err = ledger.update_player(3, &PlayerUpdate::default()).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "player", id: 3 }));
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    #[test]
    fn seed_only_into_empty_ledger() {
        let ledger = test_ledger();
        let teams = vec![new_team("Mumbai Indians", 10_000_000), new_team("Chennai Super Kings", 10_000_000)];
        let players = vec![new_player("Virat Kohli"), new_player("KL Rahul")];

        assert!(ledger.seed_if_empty(&teams, &players).unwrap());
        assert!(!ledger.seed_if_empty(&teams, &players).unwrap());

        assert_eq!(ledger.list_teams().unwrap().len(), 2);
        let conn = ledger.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn seed_with_invalid_row_inserts_nothing() {
        let ledger = test_ledger();
        let teams = vec![new_team("Good", 100), new_team("Bad", 0)];
        assert!(ledger.seed_if_empty(&teams, &[]).is_err());
        assert!(ledger.list_teams().unwrap().is_empty());
    }

    // ------------------------------------------------------------------
    // Legacy upgrade
    // ------------------------------------------------------------------

    #[test]
    fn legacy_database_is_upgraded_in_place() {
        let db_path = std::env::temp_dir().join(format!("bidbook_legacy_{}.db", std::process::id()));
        let db_path_str = db_path.to_str().unwrap();
        let _ = std::fs::remove_file(&db_path);

        // Pre-status schema with an is_sold flag.
        {
            let conn = Connection::open(db_path_str).unwrap();
            conn.execute_batch(
                "CREATE TABLE teams (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    initial_budget INTEGER NOT NULL,
                    current_budget INTEGER NOT NULL,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                );
                CREATE TABLE players (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    role TEXT NOT NULL,
                    base_price INTEGER NOT NULL,
                    sold_price INTEGER,
                    team_id INTEGER,
                    is_sold BOOLEAN DEFAULT 0,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    FOREIGN KEY (team_id) REFERENCES teams (id)
                );
                CREATE TABLE auction_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    player_id INTEGER NOT NULL,
                    team_id INTEGER NOT NULL,
                    bid_amount INTEGER NOT NULL,
                    bid_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    FOREIGN KEY (player_id) REFERENCES players (id),
                    FOREIGN KEY (team_id) REFERENCES teams (id)
                );
                INSERT INTO teams (name, initial_budget, current_budget)
                    VALUES ('Mumbai Indians', 10000000, 8000000);
                INSERT INTO players (name, role, base_price, sold_price, team_id, is_sold)
                    VALUES ('Virat Kohli', 'Batsman', 2000000, 2000000, 1, 1);
                INSERT INTO players (name, role, base_price, is_sold)
                    VALUES ('Rohit Sharma', 'Batsman', 2000000, 1);
                INSERT INTO players (name, role, base_price)
                    VALUES ('Jasprit Bumrah', 'Bowler', 2000000);
                INSERT INTO auction_history (player_id, team_id, bid_amount, bid_time)
                    VALUES (1, 1, 2000000, '2025-03-01 10:00:00');",
            )
            .unwrap();
        }

        let ledger = Ledger::open(db_path_str).expect("upgrade should succeed");

        let kohli = ledger.get_player(1).unwrap();
        assert_eq!(kohli.status, PlayerStatus::Assigned);
        assert_eq!(kohli.team_id, Some(1));
        assert_eq!(kohli.sold_price, Some(2_000_000));
        assert!(kohli.jersey_no.is_none());

        let rohit = ledger.get_player(2).unwrap();
        assert_eq!(rohit.status, PlayerStatus::PassedOver);
        assert!(rohit.team_id.is_none());

        let bumrah = ledger.get_player(3).unwrap();
        assert_eq!(bumrah.status, PlayerStatus::Available);

        {
            let conn = ledger.conn();
            let bid_time: String = conn
                .query_row("SELECT bid_time FROM auction_history WHERE id = 1", [], |row| row.get(0))
                .unwrap();
            assert_eq!(bid_time, "2025-03-01T10:00:00Z");

            // Foreign keys are back on after the rebuild.
            let fk: i64 = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(fk, 1);
        }

        // New catalogue rows use the upgraded layout.
        let added = ledger
            .create_player(&NewPlayer {
                jersey_no: Some(7),
                ..new_player("MS Dhoni")
            })
            .unwrap();
        assert_eq!(added.id, 4);
        assert_eq!(added.jersey_no, Some(7));

        drop(ledger);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(format!("{}-wal", db_path_str));
        let _ = std::fs::remove_file(format!("{}-shm", db_path_str));
    }

    #[test]
    fn reopening_current_schema_is_noop() {
        let db_path = std::env::temp_dir().join(format!("bidbook_reopen_{}.db", std::process::id()));
        let db_path_str = db_path.to_str().unwrap();
        let _ = std::fs::remove_file(&db_path);

        {
            let ledger = Ledger::open(db_path_str).unwrap();
            ledger.create_team(&new_team("Royal Challengers", 500)).unwrap();
        }
        let ledger = Ledger::open(db_path_str).unwrap();
        assert_eq!(ledger.list_teams().unwrap().len(), 1);
        assert_eq!(ledger.path(), db_path_str);

        drop(ledger);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(format!("{}-wal", db_path_str));
        let _ = std::fs::remove_file(format!("{}-shm", db_path_str));
    }
}

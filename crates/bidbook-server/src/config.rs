// Configuration loading and validation (bidbook.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bidbook_core::model::{NewPlayer, NewTeam};
use serde::Deserialize;
use thiserror::Error;

/// Name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "bidbook.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// bidbook.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub assets: AssetsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub migration: MigrationConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    pub dir: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for `bidbook.log`. Falls back to the platform data dir.
    #[serde(default)]
    pub dir: Option<String>,
}

/// Target units for the currency migration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MigrationConfig {
    pub canonical_budget: i64,
    pub canonical_base_price: i64,
}

/// Roster inserted into an empty ledger on first start.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub teams: Vec<SeedTeam>,
    #[serde(default)]
    pub players: Vec<SeedPlayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTeam {
    pub name: String,
    pub budget: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPlayer {
    pub name: String,
    pub role: String,
    pub base_price: i64,
    #[serde(default)]
    pub jersey_no: Option<i64>,
}

impl SeedConfig {
    pub fn new_teams(&self) -> Vec<NewTeam> {
        self.teams
            .iter()
            .map(|t| NewTeam {
                name: t.name.clone(),
                initial_budget: t.budget,
            })
            .collect()
    }

    pub fn new_players(&self) -> Vec<NewPlayer> {
        self.players
            .iter()
            .map(|p| NewPlayer {
                name: p.name.clone(),
                role: p.role.clone(),
                base_price: p.base_price,
                jersey_no: p.jersey_no,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/bidbook.toml` relative to `base_dir`.
///
/// Relative database, asset and log paths are resolved against `base_dir`.
/// This does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let mut config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    if config.database.path != ":memory:" {
        config.database.path = resolve(base_dir, &config.database.path);
    }
    config.assets.dir = resolve(base_dir, &config.assets.dir);
    config.logging.dir = config.logging.dir.as_deref().map(|d| resolve(base_dir, d));

    Ok(config)
}

/// Copy `defaults/bidbook.toml` to `config/bidbook.toml` unless a config is
/// already there. Returns the path written, or `None` when nothing was copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let shipped = base_dir.join("defaults").join(CONFIG_FILE);
    let target = base_dir.join("config").join(CONFIG_FILE);

    if target.exists() {
        return Ok(None);
    }
    if !shipped.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {CONFIG_FILE} in {}/config or {}/defaults; \
                 pass --config-dir or run from the server crate directory",
                base_dir.display(),
                base_dir.display()
            ),
        });
    }

    let copy_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", shipped.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_error)?;
    }
    let content = std::fs::read(&shipped).map_err(copy_error)?;

    // create_new so a config written between the check and here is kept.
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            std::io::Write::write_all(&mut dest, &content).map_err(copy_error)?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(copy_error(e)),
    }
}

/// Copy missing defaults, then load from `base_dir`.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn resolve(base_dir: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        path.to_string()
    } else {
        base_dir.join(p).to_string_lossy().into_owned()
    }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port", "must be greater than 0"));
    }
    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host", "must not be empty"));
    }
    if config.database.path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }
    if config.assets.dir.trim().is_empty() {
        return Err(invalid("assets.dir", "must not be empty"));
    }
    if config
        .logging
        .dir
        .as_deref()
        .is_some_and(|d| d.trim().is_empty())
    {
        return Err(invalid("logging.dir", "must not be empty when set"));
    }

    let m = &config.migration;
    if m.canonical_budget <= 0 {
        return Err(invalid(
            "migration.canonical_budget",
            format!("must be > 0, got {}", m.canonical_budget),
        ));
    }
    if m.canonical_base_price <= 0 {
        return Err(invalid(
            "migration.canonical_base_price",
            format!("must be > 0, got {}", m.canonical_base_price),
        ));
    }

    let mut names = HashSet::new();
    for (i, team) in config.seed.teams.iter().enumerate() {
        let name = team.name.trim();
        if name.is_empty() {
            return Err(invalid(format!("seed.teams[{i}].name"), "must not be empty"));
        }
        if team.budget <= 0 {
            return Err(invalid(
                format!("seed.teams[{i}].budget"),
                format!("must be > 0, got {}", team.budget),
            ));
        }
        if !names.insert(name) {
            return Err(invalid(
                format!("seed.teams[{i}].name"),
                format!("duplicate team name `{name}`"),
            ));
        }
    }

    for (i, player) in config.seed.players.iter().enumerate() {
        if player.name.trim().is_empty() {
            return Err(invalid(format!("seed.players[{i}].name"), "must not be empty"));
        }
        if player.role.trim().is_empty() {
            return Err(invalid(format!("seed.players[{i}].role"), "must not be empty"));
        }
        if player.base_price <= 0 {
            return Err(invalid(
                format!("seed.players[{i}].base_price"),
                format!("must be > 0, got {}", player.base_price),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

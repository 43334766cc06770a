// Offline export of the ledger: one workbook, one worksheet per entity set.

use std::collections::HashSet;
use std::path::Path;

use bidbook_core::{Ledger, LedgerError};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Workbook tools reject sheet names longer than this.
pub const SHEET_NAME_MAX_LEN: usize = 31;

const INVALID_SHEET_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

const HISTORY_COLUMNS: &[&str] = &[
    "id",
    "player_id",
    "team_id",
    "bid_amount",
    "bid_time",
    "player_name",
    "player_role",
    "team_name",
];

const PLAYER_COLUMNS: &[&str] = &[
    "id",
    "name",
    "role",
    "base_price",
    "jersey_no",
    "status",
    "is_sold",
    "team_id",
    "sold_price",
    "created_at",
];

const TEAM_COLUMNS: &[&str] = &["id", "name", "initial_budget", "current_budget", "created_at"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("workbook error in {path}: {source}")]
    Xlsx { path: String, source: XlsxError },

    #[error("failed to flatten {sheet} row: {source}")]
    Row {
        sheet: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One written worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSheet {
    pub sheet: String,
    pub rows: usize,
}

/// Make `name` a legal, unused sheet name and record it in `existing`.
///
/// Forbidden characters are dropped, the result is cut to 31 characters, an
/// empty result becomes `sheet`, and a taken name gets `_1`, `_2`, ...
/// appended, shortening the base so the whole still fits.
pub fn sanitize_sheet_name(name: &str, existing: &mut HashSet<String>) -> String {
    let base: String = name
        .chars()
        .filter(|c| !INVALID_SHEET_CHARS.contains(c))
        .take(SHEET_NAME_MAX_LEN)
        .collect();
    let base = if base.is_empty() { "sheet".to_string() } else { base };

    let mut candidate = base.clone();
    let mut i = 1;
    while existing.contains(&candidate) {
        let suffix = format!("_{i}");
        let allowed = SHEET_NAME_MAX_LEN - suffix.len();
        candidate = base.chars().take(allowed).chain(suffix.chars()).collect();
        i += 1;
    }
    existing.insert(candidate.clone());
    candidate
}

/// Write `columns` as a header row followed by one row per record. The header
/// is written even when there are no rows. Absent values leave the cell blank.
fn write_rows<T: Serialize>(
    worksheet: &mut Worksheet,
    columns: &[&str],
    rows: &[T],
) -> Result<(), RowError> {
    for (c, column) in columns.iter().enumerate() {
        worksheet.write_string(0, c as u16, *column)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let record = serde_json::to_value(row)?;
        let row_num = (r + 1) as u32;
        for (c, column) in columns.iter().enumerate() {
            let col = c as u16;
            match record.get(*column) {
                Some(Value::Number(n)) => {
                    if let Some(n) = n.as_f64() {
                        worksheet.write_number(row_num, col, n)?;
                    }
                }
                Some(Value::String(s)) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Some(other @ (Value::Array(_) | Value::Object(_))) => {
                    worksheet.write_string(row_num, col, other.to_string())?;
                }
                Some(Value::Null) | None => {}
            }
        }
    }
    Ok(())
}

enum RowError {
    Xlsx(XlsxError),
    Json(serde_json::Error),
}

impl From<XlsxError> for RowError {
    fn from(e: XlsxError) -> Self {
        RowError::Xlsx(e)
    }
}

impl From<serde_json::Error> for RowError {
    fn from(e: serde_json::Error) -> Self {
        RowError::Json(e)
    }
}

struct SheetWriter<'a> {
    workbook: Workbook,
    path: &'a Path,
    used: HashSet<String>,
    written: Vec<ExportedSheet>,
}

impl<'a> SheetWriter<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            workbook: Workbook::new(),
            path,
            used: HashSet::new(),
            written: Vec::new(),
        }
    }

    fn xlsx_error(&self, source: XlsxError) -> ExportError {
        ExportError::Xlsx {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn add<T: Serialize>(&mut self, table: &str, columns: &[&str], rows: &[T]) -> Result<(), ExportError> {
        let sheet = sanitize_sheet_name(table, &mut self.used);
        let worksheet = self.workbook.add_worksheet();
        let result = match worksheet.set_name(sheet.as_str()) {
            Ok(worksheet) => write_rows(worksheet, columns, rows),
            Err(e) => Err(RowError::Xlsx(e)),
        };
        match result {
            Ok(()) => {}
            Err(RowError::Xlsx(e)) => return Err(self.xlsx_error(e)),
            Err(RowError::Json(source)) => return Err(ExportError::Row { sheet, source }),
        }
        info!(sheet = %sheet, rows = rows.len(), "Exported sheet");
        self.written.push(ExportedSheet {
            sheet,
            rows: rows.len(),
        });
        Ok(())
    }

    fn save(mut self) -> Result<Vec<ExportedSheet>, ExportError> {
        if let Err(e) = self.workbook.save(self.path) {
            return Err(self.xlsx_error(e));
        }
        Ok(self.written)
    }
}

/// Dump history, players and teams (in that alphabetical order) into one
/// workbook at `out_path`, creating its parent directory if needed. Reads
/// are not wrapped in a transaction.
pub fn export_ledger(ledger: &Ledger, out_path: &Path) -> Result<Vec<ExportedSheet>, ExportError> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ExportError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let mut writer = SheetWriter::new(out_path);
    writer.add("auction_history", HISTORY_COLUMNS, &ledger.auction_history()?)?;
    writer.add("players", PLAYER_COLUMNS, &ledger.list_players()?)?;
    writer.add("teams", TEAM_COLUMNS, &ledger.list_teams()?)?;
    let sheets = writer.save()?;
    info!(path = %out_path.display(), sheets = sheets.len(), "Workbook written");
    Ok(sheets)
}

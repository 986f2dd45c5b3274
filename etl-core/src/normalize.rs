use thiserror::Error;

use crate::cell::Cell;
use crate::recordset::RecordSet;

/// Where to find the country identifier in a source, and what to call it
/// once found. Sources disagree on naming ("pais", "nombre_pais", accented
/// variants), so resolution walks `aliases` in priority order.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub key_column: String,
    pub aliases: Vec<String>,
}

impl KeySpec {
    pub fn new(key_column: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            key_column: key_column.into(),
            aliases,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("no country column found among aliases {aliases:?}")]
    NoAliasColumn { aliases: Vec<String> },
}

/// Returns the column holding the country identifier: the canonical key
/// column if already present, otherwise the first alias that matches.
pub fn resolve_key_column<'a>(columns: &'a [String], spec: &KeySpec) -> Option<&'a str> {
    if let Some(found) = columns.iter().find(|c| **c == spec.key_column) {
        return Some(found.as_str());
    }
    spec.aliases
        .iter()
        .find_map(|alias| columns.iter().find(|c| *c == alias))
        .map(|s| s.as_str())
}

/// Canonicalizes the join key: renames the resolved alias column to
/// `spec.key_column` and rewrites each value to its trimmed, lowercased
/// string form. Missing values are left missing; absence is the signal
/// that a record must be excluded before joining, not an error.
pub fn normalize_keys(mut set: RecordSet, spec: &KeySpec) -> Result<RecordSet, NormalizeError> {
    let key_idx = match resolve_key_column(set.columns(), spec) {
        Some(name) => {
            let name = name.to_string();
            set.rename_column(&name, &spec.key_column);
            set.column_index(&spec.key_column)
        }
        None => None,
    };
    let Some(key_idx) = key_idx else {
        return Err(NormalizeError::NoAliasColumn {
            aliases: spec.aliases.clone(),
        });
    };

    set.map_column(key_idx, |cell| match cell.as_display_string() {
        Some(raw) => Cell::Text(raw.trim().to_lowercase()),
        None => cell,
    });

    Ok(set)
}

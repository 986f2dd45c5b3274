use std::collections::HashMap;

use thiserror::Error;

use crate::cell::Cell;
use crate::recordset::RecordSet;

#[derive(Error, Debug, PartialEq)]
pub enum JoinError {
    #[error("record set has no `{key}` column to join on")]
    MissingKeyColumn { key: String },
}

/// Inner join on the key column: only rows whose key appears on both sides
/// survive. Duplicate keys on either side produce the full cross-product of
/// matching rows.
pub fn inner_join(
    left: &RecordSet,
    right: &RecordSet,
    key: &str,
    suffix: &str,
) -> Result<RecordSet, JoinError> {
    join(left, right, key, suffix, false)
}

/// Outer join on the key column: the union of key values. Left rows without
/// a match keep their cells and get nulls for the incoming columns;
/// unmatched incoming rows are appended with nulls for the left columns.
/// Never loses a row of `left`.
pub fn outer_join(
    left: &RecordSet,
    right: &RecordSet,
    key: &str,
    suffix: &str,
) -> Result<RecordSet, JoinError> {
    join(left, right, key, suffix, true)
}

fn join(
    left: &RecordSet,
    right: &RecordSet,
    key: &str,
    suffix: &str,
    keep_unmatched: bool,
) -> Result<RecordSet, JoinError> {
    let left_key = left.column_index(key).ok_or_else(|| JoinError::MissingKeyColumn {
        key: key.to_string(),
    })?;
    let right_key = right.column_index(key).ok_or_else(|| JoinError::MissingKeyColumn {
        key: key.to_string(),
    })?;

    // The incoming side loses its key column; colliding names get the
    // source suffix, the running result keeps the bare name.
    let mut columns = left.columns().to_vec();
    for (idx, name) in right.columns().iter().enumerate() {
        if idx == right_key {
            continue;
        }
        if left.has_column(name) {
            columns.push(format!("{}_{}", name, suffix));
        } else {
            columns.push(name.clone());
        }
    }
    let mut out = RecordSet::new(columns);

    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows().iter().enumerate() {
        if let Some(k) = row[right_key].as_display_string() {
            by_key.entry(k).or_default().push(idx);
        }
    }

    let right_width = right.columns().len() - 1;
    let mut matched_right = vec![false; right.len()];

    for row in left.rows() {
        let matches = row[left_key]
            .as_display_string()
            .and_then(|k| by_key.get(&k));
        match matches {
            Some(indices) => {
                for &right_idx in indices {
                    matched_right[right_idx] = true;
                    let mut merged = row.clone();
                    merged.extend(cells_without_key(&right.rows()[right_idx], right_key));
                    out.push_row(merged);
                }
            }
            None if keep_unmatched => {
                let mut merged = row.clone();
                merged.extend(std::iter::repeat(Cell::Null).take(right_width));
                out.push_row(merged);
            }
            None => {}
        }
    }

    if keep_unmatched {
        let left_width = left.columns().len();
        for (right_idx, was_matched) in matched_right.iter().enumerate() {
            if *was_matched {
                continue;
            }
            let row = &right.rows()[right_idx];
            let mut merged = vec![Cell::Null; left_width];
            merged[left_key] = row[right_key].clone();
            merged.extend(cells_without_key(row, right_key));
            out.push_row(merged);
        }
    }

    Ok(out)
}

fn cells_without_key(row: &[Cell], key_idx: usize) -> impl Iterator<Item = Cell> + '_ {
    row.iter()
        .enumerate()
        .filter(move |(idx, _)| *idx != key_idx)
        .map(|(_, cell)| cell.clone())
}

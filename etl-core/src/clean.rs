use crate::recordset::RecordSet;

/// Drops every row with a null or absent value in any column. This is the
/// conservative, no-configuration policy applied to all sources before
/// integration; shrinking a set to zero rows is not an error.
pub fn drop_incomplete(mut set: RecordSet) -> RecordSet {
    set.retain_rows(|row| row.iter().all(|cell| !cell.is_missing()));
    set
}

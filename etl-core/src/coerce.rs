use crate::cell::Cell;
use crate::recordset::RecordSet;

/// Flattens every cell into a form the warehouse sink can store: driver
/// identifiers become their hex string, nested documents become compact
/// JSON text, absent fields become plain nulls. Scalars pass through
/// unchanged, so applying this twice is the same as applying it once.
pub fn coerce(mut set: RecordSet) -> RecordSet {
    set.map_cells(coerce_cell);
    set
}

fn coerce_cell(cell: Cell) -> Cell {
    match cell {
        Cell::Id(oid) => Cell::Text(oid.to_hex()),
        // serde_json's Display is a deterministic compact encoding and is
        // total over any Value, including arrays and other composites.
        Cell::Nested(value) => Cell::Text(value.to_string()),
        Cell::Absent => Cell::Null,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use serde_json::json;

    fn one_cell(cell: Cell) -> RecordSet {
        let mut set = RecordSet::new(vec!["v".to_string()]);
        set.push_row(vec![cell]);
        set
    }

    #[test]
    fn object_ids_become_hex_text() {
        let oid = ObjectId::new();
        let set = coerce(one_cell(Cell::Id(oid)));
        assert_eq!(set.rows()[0][0], Cell::Text(oid.to_hex()));
    }

    #[test]
    fn nested_documents_become_json_text() {
        let set = coerce(one_cell(Cell::Nested(json!({"hotel": 80, "comida": 25}))));
        let Cell::Text(text) = &set.rows()[0][0] else {
            panic!("expected text cell");
        };
        assert!(text.contains("\"hotel\":80"));
    }

    #[test]
    fn absent_becomes_null_and_scalars_pass_through() {
        let set = coerce(one_cell(Cell::Absent));
        assert_eq!(set.rows()[0][0], Cell::Null);

        let set = coerce(one_cell(Cell::Int(7)));
        assert_eq!(set.rows()[0][0], Cell::Int(7));
    }

    #[test]
    fn coercion_is_idempotent() {
        let mut set = RecordSet::new(vec!["a".to_string(), "b".to_string()]);
        set.push_row(vec![
            Cell::Id(ObjectId::new()),
            Cell::Nested(json!(["x", 1])),
        ]);
        set.push_row(vec![Cell::Absent, Cell::Float(1.5)]);

        let once = coerce(set);
        let twice = coerce(once.clone());
        assert_eq!(once, twice);
    }
}

use tracing::{info, warn};

use crate::clean::drop_incomplete;
use crate::coerce::coerce;
use crate::join::{inner_join, outer_join};
use crate::normalize::{normalize_keys, KeySpec};
use crate::recordset::RecordSet;

/// The full transform: canonicalize the join key on both relational sets,
/// drop incomplete rows, inner-join them, fold each document collection in
/// with an outer join, then coerce the result into warehouse-ready rows.
///
/// Per-set problems never abort the run: a relational set that cannot be
/// keyed contributes nothing, and a collection without a resolvable
/// country column is skipped.
pub fn integrate(
    population: RecordSet,
    aging: RecordSet,
    aging_suffix: &str,
    folds: Vec<(String, RecordSet)>,
    spec: &KeySpec,
) -> RecordSet {
    let population = prepare(population, "population table", spec);
    let aging = prepare(aging, "aging table", spec);

    let mut running = match inner_join(&population, &aging, &spec.key_column, aging_suffix) {
        Ok(set) => set,
        Err(e) => {
            warn!("primary join failed: {}", e);
            RecordSet::new(vec![spec.key_column.clone()])
        }
    };
    info!(rows = running.len(), "primary join complete");

    for (name, incoming) in folds {
        let incoming = match normalize_keys(incoming, spec) {
            Ok(set) => drop_incomplete(set),
            Err(e) => {
                warn!(collection = %name, "skipping fold-in: {}", e);
                continue;
            }
        };
        running = match outer_join(&running, &incoming, &spec.key_column, &name) {
            Ok(joined) => joined,
            Err(e) => {
                warn!(collection = %name, "skipping fold-in: {}", e);
                continue;
            }
        };
        info!(collection = %name, rows = running.len(), "folded in collection");
    }

    coerce(running)
}

fn prepare(set: RecordSet, label: &str, spec: &KeySpec) -> RecordSet {
    match normalize_keys(set, spec) {
        Ok(set) => drop_incomplete(set),
        Err(e) => {
            warn!("{}: {}; treating as empty", label, e);
            RecordSet::new(vec![spec.key_column.clone()])
        }
    }
}

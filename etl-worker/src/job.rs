use chrono::Utc;
use tracing::{error, info};

use etl_core::integrate::integrate;
use etl_core::{Cell, RecordSet};

use crate::config::Config;
use crate::loader::{LoadError, LoadOutcome, Loader};
use crate::sink::PostgresWarehouse;
use crate::source::document::DocumentSource;
use crate::source::postgres::RelationalSource;

#[derive(Debug)]
pub struct RunReport {
    pub population_rows: usize,
    pub aging_rows: usize,
    pub collections: usize,
    pub unified_rows: usize,
    pub outcome: LoadOutcome,
}

/// One full extract-transform-load pass. Fully sequential: each stage
/// materializes its output before the next begins, and both source
/// connections are released before the transform stages run.
///
/// Per-source failures are absorbed here: a source that cannot be reached
/// or read contributes nothing and the run carries on with the rest. Only
/// failing to persist the result at all is an error.
pub async fn run(config: &Config) -> Result<RunReport, LoadError> {
    let (population, aging) = extract_relational(config).await;
    let folds = extract_documents(config).await;

    let population_rows = population.len();
    let aging_rows = aging.len();
    let collections = folds.len();

    let spec = config.key_spec();
    let mut unified = integrate(population, aging, &config.aging_table, folds, &spec);
    unified.push_constant_column("run_date", Cell::Date(Utc::now().date_naive()));
    info!(
        rows = unified.len(),
        columns = unified.columns().len(),
        "integration complete"
    );

    let sink = PostgresWarehouse::new(&config.warehouse_url, config.insert_chunk_size);
    let loader = Loader::new(sink, &config.warehouse_table, &config.fallback_path);
    let outcome = loader.load(&unified).await?;

    Ok(RunReport {
        population_rows,
        aging_rows,
        collections,
        unified_rows: unified.len(),
        outcome,
    })
}

async fn extract_relational(config: &Config) -> (RecordSet, RecordSet) {
    let source = match RelationalSource::connect(&config.database_url, config.max_pg_connections)
        .await
    {
        Ok(source) => source,
        Err(e) => {
            error!("relational source unavailable, continuing without it: {}", e);
            return (RecordSet::default(), RecordSet::default());
        }
    };

    let population = fetch_or_empty(&source, &config.population_table).await;
    let aging = fetch_or_empty(&source, &config.aging_table).await;
    source.close().await;

    (population, aging)
}

async fn fetch_or_empty(source: &RelationalSource, table: &str) -> RecordSet {
    match source.fetch_table(table).await {
        Ok(set) => {
            info!(table = table, rows = set.len(), "extracted relational table");
            set
        }
        Err(e) => {
            error!(
                table = table,
                "extraction failed, contributing an empty set: {}", e
            );
            RecordSet::default()
        }
    }
}

async fn extract_documents(config: &Config) -> Vec<(String, RecordSet)> {
    let source = match DocumentSource::connect(&config.document_url, &config.document_database)
        .await
    {
        Ok(source) => source,
        Err(e) => {
            error!("document source unavailable, continuing without it: {}", e);
            return Vec::new();
        }
    };

    let names = match source.collection_names().await {
        Ok(names) => names,
        Err(e) => {
            error!("listing collections failed, continuing without documents: {}", e);
            Vec::new()
        }
    };

    let mut folds = Vec::with_capacity(names.len());
    for name in names {
        match source.fetch_collection(&name).await {
            Ok(set) => {
                info!(collection = %name, rows = set.len(), "extracted collection");
                folds.push((name, set));
            }
            Err(e) => {
                error!(collection = %name, "extraction failed, skipping collection: {}", e);
            }
        }
    }
    source.close().await;

    folds
}

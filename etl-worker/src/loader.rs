use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use etl_core::RecordSet;

use crate::sink::{SinkError, WarehouseSink};

/// Both destinations failed. This is the only condition the run surfaces
/// as a hard failure.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("warehouse write failed ({sink}) and so did the fallback file: {file}")]
    FallbackFailed { sink: SinkError, file: csv::Error },
}

#[derive(Debug, PartialEq)]
pub enum LoadOutcome {
    Warehouse { table: String, rows: usize },
    Fallback { path: PathBuf, rows: usize },
}

/// Final stage: write the unified rows to the warehouse, falling back to a
/// delimited file when the sink fails. Always returns a definite outcome;
/// a sink failure never propagates past this boundary.
pub struct Loader<S> {
    sink: S,
    table: String,
    fallback_path: PathBuf,
}

impl<S: WarehouseSink> Loader<S> {
    pub fn new(sink: S, table: impl Into<String>, fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            sink,
            table: table.into(),
            fallback_path: fallback_path.into(),
        }
    }

    pub async fn load(&self, set: &RecordSet) -> Result<LoadOutcome, LoadError> {
        match self.sink.replace_table(&self.table, set).await {
            Ok(()) => Ok(LoadOutcome::Warehouse {
                table: self.table.clone(),
                rows: set.len(),
            }),
            Err(sink) => {
                error!("warehouse write failed, falling back to file: {}", sink);
                match write_delimited(&self.fallback_path, set) {
                    Ok(()) => {
                        info!(path = %self.fallback_path.display(), "wrote fallback file");
                        Ok(LoadOutcome::Fallback {
                            path: self.fallback_path.clone(),
                            rows: set.len(),
                        })
                    }
                    Err(file) => Err(LoadError::FallbackFailed { sink, file }),
                }
            }
        }
    }
}

fn write_delimited(path: &Path, set: &RecordSet) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(set.columns())?;
    for row in set.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use etl_core::Cell;

    struct FailingSink;

    #[async_trait]
    impl WarehouseSink for FailingSink {
        async fn replace_table(&self, _table: &str, _set: &RecordSet) -> Result<(), SinkError> {
            Err(SinkError::Connection {
                error: sqlx::Error::PoolClosed,
            })
        }
    }

    struct AcceptingSink;

    #[async_trait]
    impl WarehouseSink for AcceptingSink {
        async fn replace_table(&self, _table: &str, _set: &RecordSet) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn unified() -> RecordSet {
        let mut set = RecordSet::new(vec!["pais".to_string(), "pop".to_string()]);
        set.push_row(vec![Cell::Text("peru".to_string()), Cell::Int(100)]);
        set.push_row(vec![Cell::Text("chile".to_string()), Cell::Null]);
        set
    }

    #[tokio::test]
    async fn sink_success_reports_the_warehouse_outcome() {
        let loader = Loader::new(AcceptingSink, "integrated_data", "unused.csv");
        let outcome = loader.load(&unified()).await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Warehouse {
                table: "integrated_data".to_string(),
                rows: 2
            }
        );
    }

    #[tokio::test]
    async fn sink_failure_writes_the_fallback_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("integrated_data.csv");

        let loader = Loader::new(FailingSink, "integrated_data", path.clone());
        let outcome = loader.load(&unified()).await.unwrap();

        assert_eq!(
            outcome,
            LoadOutcome::Fallback {
                path: path.clone(),
                rows: 2
            }
        );

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "pais,pop");
        assert_eq!(lines[1], "peru,100");
        // missing cells render as empty fields
        assert_eq!(lines[2], "chile,");
    }

    #[tokio::test]
    async fn double_failure_is_the_only_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("fallback.csv");

        let loader = Loader::new(FailingSink, "integrated_data", path);
        let err = loader.load(&unified()).await.unwrap_err();
        assert!(matches!(err, LoadError::FallbackFailed { .. }));
    }
}

use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::{Client, Database};
use tracing::debug;

use etl_core::{Cell, RecordSet};

use super::SourceError;

/// Read-only extraction from the document source. Collections hold
/// free-form documents; the only field contract the pipeline relies on is
/// a country-name field somewhere in the alias set.
pub struct DocumentSource {
    client: Client,
    database: Database,
}

impl DocumentSource {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, SourceError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|error| SourceError::Document { error })?;
        let database = client.database(database);

        Ok(Self { client, database })
    }

    /// Collection names, sorted so fold-in order and collision suffixes
    /// are deterministic from run to run.
    pub async fn collection_names(&self) -> Result<Vec<String>, SourceError> {
        let mut names = self
            .database
            .list_collection_names(None)
            .await
            .map_err(|error| SourceError::Document { error })?;
        names.sort();

        Ok(names)
    }

    pub async fn fetch_collection(&self, name: &str) -> Result<RecordSet, SourceError> {
        let cursor = self
            .database
            .collection::<Document>(name)
            .find(None, None)
            .await
            .map_err(|error| SourceError::CollectionRead {
                collection: name.to_string(),
                error,
            })?;
        let documents: Vec<Document> = cursor.try_collect().await.map_err(|error| {
            SourceError::CollectionRead {
                collection: name.to_string(),
                error,
            }
        })?;

        debug!(collection = name, documents = documents.len(), "fetched collection");
        Ok(documents_to_recordset(&documents))
    }

    pub async fn close(self) {
        self.client.shutdown().await;
    }
}

/// Unions the field sets of all documents into one tabular record set,
/// in first-seen field order, filling the fields a document lacks with
/// `Cell::Absent`.
pub fn documents_to_recordset(documents: &[Document]) -> RecordSet {
    let mut columns: Vec<String> = Vec::new();
    for document in documents {
        for key in document.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut set = RecordSet::new(columns);
    for document in documents {
        let cells = set
            .columns()
            .iter()
            .map(|column| match document.get(column) {
                Some(value) => bson_to_cell(value),
                None => Cell::Absent,
            })
            .collect();
        set.push_row(cells);
    }

    set
}

fn bson_to_cell(value: &Bson) -> Cell {
    match value {
        Bson::Null => Cell::Null,
        Bson::Boolean(v) => Cell::Bool(*v),
        Bson::Int32(v) => Cell::Int(i64::from(*v)),
        Bson::Int64(v) => Cell::Int(*v),
        Bson::Double(v) => Cell::Float(*v),
        Bson::String(v) => Cell::Text(v.clone()),
        Bson::ObjectId(v) => Cell::Id(*v),
        Bson::DateTime(v) => Cell::Timestamp(v.to_chrono()),
        // embedded documents, arrays and the rarer bson types stay loose
        // until the coercion stage flattens them
        other => Cell::Nested(other.clone().into_relaxed_extjson()),
    }
}

use thiserror::Error;

pub mod document;
pub mod postgres;

/// Errors from the two extraction sides. The job absorbs all of these:
/// a failed connection or read contributes an empty record set and the
/// run continues with whatever sources succeeded.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("relational connection failed with: {error}")]
    Connection { error: sqlx::Error },

    #[error("reading table {table} failed with: {error}")]
    TableRead { table: String, error: sqlx::Error },

    #[error("document database error: {error}")]
    Document { error: mongodb::error::Error },

    #[error("reading collection {collection} failed with: {error}")]
    CollectionRead {
        collection: String,
        error: mongodb::error::Error,
    },
}

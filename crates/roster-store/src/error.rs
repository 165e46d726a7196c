use thiserror::Error;

/// Errors that can occur when interacting with the roster store.
#[derive(Error, Debug)]
pub enum DbError {
    /// Malformed, oversized, or empty required input. Raised before any I/O.
    #[error("invalid parameter '{field}': {reason}")]
    InvalidParam { field: &'static str, reason: String },

    /// The handle cannot run statements (e.g. its pool was closed).
    #[error("invalid database handle")]
    InvalidHandle,

    #[error("{entity} '{key}' not found")]
    RecordNotFound { entity: &'static str, key: String },

    /// An ancestor of the node is missing from the store.
    #[error("parent of org '{name}' not found")]
    ParentRecordNotFound { name: String },

    /// More than one row matched a lookup that must be unique.
    #[error("more than one {entity} matches '{key}'")]
    RecordNotUnique { entity: &'static str, key: String },

    /// An in-memory ancestor chain nests beyond the supported depth.
    #[error("org hierarchy above '{name}' is deeper than {max} levels")]
    HierarchyTooDeep { name: String, max: usize },

    /// Stored parent references loop back to an org already visited.
    #[error("org '{id}' is its own ancestor")]
    HierarchyCycle { id: String },

    #[error("failed to create table {table}: {source}")]
    TableCreateFailed {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Identifier minting collided; the operation is safe to retry.
    #[error("could not assign a new identifier to '{name}', try again")]
    RetryableCreate { name: String },

    /// Database driver or target missing from the configuration
    #[error("database driver/target missing from configuration")]
    NullDbConfig,

    #[error("unsupported database driver '{0}'")]
    InvalidDriver(String),

    #[error("invalid database credentials in configuration")]
    InvalidCredentials,

    /// Failed to connect to the database
    #[error("failed to open database at {target}: {source}")]
    ConnectionFailed {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// I/O error during database setup
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLx error during query execution
    #[error("database query error: {0}")]
    Query(#[from] sqlx::Error),
}

impl DbError {
    pub(crate) fn invalid(field: &'static str, reason: impl ToString) -> Self {
        Self::InvalidParam {
            field,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::RecordNotFound { entity, key: key.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}

/// Result type alias for database operations
pub type DbResult<T> = Result<T, DbError>;

use thiserror::Error;

/// Errors produced by the store layer itself (opening the backing, running
/// migrations, raw key-value access).  Slot decode failures never surface
/// here; they soft-fail to an empty collection at the mutation gateway.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding the backing was poisoned by a panicking thread.
    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// User-visible failures of a domain mutation.  These are ordinary return
/// values, not exceptions: callers render them, they never retry them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    /// A required field is missing or invalid.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced record does not exist.
    #[error("Record not found")]
    NotFound,

    /// The caller does not own the record it tried to change.
    #[error("Operation not permitted for this user")]
    NotOwner,
}

/// User-visible failures of a wallet operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The derived balance does not cover the requested amount.
    #[error("Insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: f64, requested: f64 },

    /// The payout method is permanently unavailable; callers surface this as
    /// a non-retryable notice.
    #[error("Payout method unavailable: {0}")]
    MethodUnavailable(String),
}

/// Errors raised by a mapper while keying, dumping, or writing objects.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// No stored row exists for the key.
    #[error("row not found: {0}")]
    NotFound(String),

    /// A row with the same key is already stored.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The stored row no longer matches the previous dump supplied with an
    /// update (concurrent modification).
    #[error("stale update for {0}: stored row differs from previous dump")]
    Conflict(String),

    /// The dump does not carry the configured key field.
    #[error("dump has no usable key field `{0}`")]
    MissingKey(String),

    /// Serialization of a domain object failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No mapper is registered for the requested domain object type.
    #[error("no mapper registered for {0}")]
    Unregistered(&'static str),

    /// A mapper is registered for the type but it is not of the requested kind.
    #[error("mapper registered for {0} has a different type")]
    MapperMismatch(&'static str),

    /// Failure reported by the storage backend behind the mapper.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

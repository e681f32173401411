pub mod blob;
pub mod carrier;

/// Error taxonomy shared by every fulfillment component.
///
/// The rule is "fail the specific operation, never silently skip a state
/// transition"; the one exception (notification enqueue) is handled at the
/// call site, not here.
#[derive(Debug, thiserror::Error)]
pub enum FulfillError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Carrier request failed: {message} (upstream status: {status:?})")]
    Carrier {
        status: Option<u16>,
        message: String,
    },
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Timed out: {0}")]
    Timeout(String),
}

pub type FulfillResult<T> = Result<T, FulfillError>;

impl FulfillError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

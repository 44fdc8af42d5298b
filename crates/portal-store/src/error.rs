/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing storage could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

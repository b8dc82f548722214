use thiserror::Error;

/// Custom error type for the client, allow us to differentiate between
/// the failure kinds callers react to.
///
#[derive(Debug, Error)]
pub enum ClientError {
    /// Unreachable host, malformed base URL or rejected credentials.
    #[error("Can not connect to IRIDA: {0}")]
    Connection(String),
    /// Response body did not have the expected envelope shape.
    #[error("Response from IRIDA could not be parsed: {0}")]
    ResourceParse(String),
    /// The expected link relation is absent from a well-formed response.
    #[error("{rel} not found in links. Available links: {available}")]
    RelationNotFound { rel: String, available: String },
    /// No element of a resource collection matched the requested value.
    #[error("{0} not found")]
    ValueNotFound(String),
    /// The addressed resource does not exist on the server.
    #[error("Resource doesn't exist: {0}")]
    ResourceNotFound(String),
}

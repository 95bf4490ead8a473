use std::fmt;

/// Errors surfaced when the event store cannot accept a write or serve
/// a read. Never swallowed: a failed write leaves no partial state.
#[derive(Debug)]
pub enum StoreError {
    /// The backend rejected or could not complete a write.
    WriteFailed(String),

    /// The backend could not serve a read.
    ReadFailed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::WriteFailed(detail) =>
                write!(f, "event store write failed: {detail}"),
            StoreError::ReadFailed(detail) =>
                write!(f, "event store read failed: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors returned when a capture cannot be ingested.
#[derive(Debug)]
pub enum IngestError {
    /// Tenant host was empty; every event belongs to a host.
    EmptyHost,

    /// The store could not persist the event.
    Store(StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::EmptyHost =>
                write!(f, "tenant host must not be empty"),
            IngestError::Store(err) =>
                write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Store(err) => Some(err),
            IngestError::EmptyHost => None,
        }
    }
}

/// Errors returned by guarded relay queries.
#[derive(Debug)]
pub enum QueryError {
    /// Caller's capability does not satisfy the operation; the
    /// underlying query never ran.
    Unauthorized,

    /// The store could not serve the read.
    Store(StoreError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Unauthorized =>
                write!(f, "caller lacks the required capability"),
            QueryError::Store(err) =>
                write!(f, "{err}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Store(err) => Some(err),
            QueryError::Unauthorized => None,
        }
    }
}

impl From<AuthError> for QueryError {
    fn from(_: AuthError) -> Self {
        QueryError::Unauthorized
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        QueryError::Store(err)
    }
}

/// Capability check failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Caller's capability does not satisfy the operation.
    Unauthorized,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthorized =>
                write!(f, "caller lacks the required capability"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Final outcome of a forwarding attempt.
///
/// Forwarding is best-effort: the outcome is recorded out-of-band and
/// never reaches the caller whose event produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    Forwarded,
    Failed(ForwardFailure),
}

/// Reasons why a forwarding attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardFailure {
    Timeout,
    Network,
    RemoteError,
    ClientError,
}

impl fmt::Display for ForwardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardFailure::Timeout =>
                write!(f, "request timed out"),
            ForwardFailure::Network =>
                write!(f, "network error"),
            ForwardFailure::RemoteError =>
                write!(f, "target returned error"),
            ForwardFailure::ClientError =>
                write!(f, "target rejected the copy (non-retryable)"),
        }
    }
}

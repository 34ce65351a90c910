use thiserror::Error;

#[derive(Error, Debug)]
pub enum RriError {
    #[error("could not connect to RRI server: {0}")]
    Connect(#[source] Box<RriError>),

    #[error("login failed: {0}")]
    Auth(#[source] Box<RriError>),

    #[error("SendQuery() failed: {0}")]
    Query(#[source] Box<RriError>),

    #[error("invalid response from RRI")]
    UnsuccessfulResponse,

    #[error("RRI connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("RRI protocol error: {0}")]
    Protocol(String),

    #[error("RRI server rejected {action}: {reason}")]
    Rejected { action: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl RriError {
    pub fn connect(cause: RriError) -> Self {
        RriError::Connect(Box::new(cause))
    }

    pub fn auth(cause: RriError) -> Self {
        RriError::Auth(Box::new(cause))
    }

    pub fn query(cause: RriError) -> Self {
        RriError::Query(Box::new(cause))
    }

    /// Splits the error into the words of an `ERROR:` report line: the
    /// phase that failed followed by the underlying cause, if any.
    pub fn messages(&self) -> Vec<String> {
        match self {
            RriError::Connect(cause) => {
                vec!["could not connect to RRI server:".to_string(), cause.to_string()]
            }
            RriError::Auth(cause) => vec!["login failed:".to_string(), cause.to_string()],
            RriError::Query(cause) => vec!["SendQuery() failed:".to_string(), cause.to_string()],
            other => vec![other.to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, RriError>;

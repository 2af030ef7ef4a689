use std::error::Error as StdError;
use std::io;

/// How a transport-level failure came about
///
/// Only the first four kinds are worth retrying; everything else is
/// treated as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    ConnectionReset,
    DnsTemporary,
    ConnectionRefused,
    Other,
}

impl TransportErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, TransportErrorKind::Other)
    }

    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                TransportErrorKind::ConnectionReset
            }
            io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
            _ if err
                .to_string()
                .contains("Temporary failure in name resolution") =>
            {
                TransportErrorKind::DnsTemporary
            }
            _ => TransportErrorKind::Other,
        }
    }

    /// Walk an error's source chain looking for an I/O cause we recognise.
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        let mut current = Some(err);

        while let Some(err) = current {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                let kind = Self::from_io(io_err);
                if kind != TransportErrorKind::Other {
                    return kind;
                }
            }
            current = err.source();
        }

        TransportErrorKind::Other
    }
}

/// Errors that can occur while delivering a single mail.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The provider lacks credentials or its client could not be built.
    #[error("{provider} is not configured: {reason}")]
    NotConfigured {
        provider: &'static str,
        reason: String,
    },

    /// Sender or recipient address could not be parsed, or the body was rejected.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Network-level failure talking to the provider.
    #[error("transport error ({kind:?}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// The provider's API answered with a non-success status.
    #[error("API error from {provider}: status={status}, body={body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Other(String),
}

impl NotifyError {
    pub fn is_transient(&self) -> bool {
        matches!(self, NotifyError::Transport { kind, .. } if kind.is_transient())
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::classify(&err)
        };

        NotifyError::Transport {
            kind,
            message: err.to_string(),
        }
    }

    pub fn from_smtp(err: lettre::transport::smtp::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else {
            TransportErrorKind::classify(&err)
        };

        NotifyError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;

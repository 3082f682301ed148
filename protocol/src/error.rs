use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A request the server explicitly rejected.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ProtocolError {
    /// `ERROR`: the server did not recognize the command.
    #[error("ERROR")]
    Generic,
    /// `CLIENT_ERROR <msg>`: the request was malformed.
    #[error("CLIENT_ERROR {0}")]
    Client(String),
    /// `SERVER_ERROR <msg>`: the server failed. It may close the connection
    /// right after sending this line.
    #[error("SERVER_ERROR {0}")]
    Server(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The response did not match the grammar of the command that was sent.
    /// The stream framing can no longer be trusted.
    #[error("malformed response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("could not resolve host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode(message.into())
    }

    /// Whether the connection that produced this error must be discarded.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Protocol(ProtocolError::Server(_)) => true,
            Error::Protocol(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ProtocolError::Generic.to_string(), "ERROR");
        assert_eq!(
            Error::from(ProtocolError::Client("bad data chunk".to_string())).to_string(),
            "CLIENT_ERROR bad data chunk"
        );
        assert_eq!(
            Error::decode("FOO").to_string(),
            "malformed response: FOO"
        );
    }

    #[test]
    fn test_resolve_keeps_source() {
        use std::error::Error as _;

        let err = Error::Resolve {
            host: "nohost".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
        };
        assert_eq!(
            err.to_string(),
            "could not resolve host nohost: no addresses found"
        );
        assert_eq!(err.source().unwrap().to_string(), "no addresses found");
    }

    #[test]
    fn test_is_fatal() {
        assert!(!Error::from(ProtocolError::Generic).is_fatal());
        assert!(!Error::from(ProtocolError::Client("x".to_string())).is_fatal());
        assert!(Error::from(ProtocolError::Server("out of memory".to_string())).is_fatal());
        assert!(Error::decode("x").is_fatal());
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert!(Error::from(eof).is_fatal());
    }
}

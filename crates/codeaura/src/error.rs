use codeaura_core::error::ErrorKind;

#[derive(thiserror::Error, Debug, Clone, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Convert a transport failure into the form carried by an AI result
    pub fn into_kind(self) -> ErrorKind {
        match self {
            Error::Network(message) | Error::Config(message) => ErrorKind::Network { message },
            Error::Backend { status, message } => ErrorKind::Backend { status, message },
            Error::Decode(message) => ErrorKind::Network {
                message: format!("invalid response body: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_keeps_status_and_message() {
        let kind = Error::Backend {
            status: 404,
            message: "Not Found".to_string(),
        }
        .into_kind();
        assert_eq!(
            kind,
            ErrorKind::Backend {
                status: 404,
                message: "Not Found".to_string()
            }
        );
    }

    #[test]
    fn test_network_error_maps_to_network_kind() {
        let kind = Error::Network("connection refused".to_string()).into_kind();
        assert_eq!(
            kind.to_string(),
            "Request failed: connection refused".to_string()
        );
    }
}

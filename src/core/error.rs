use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Relay error: {0}")]
    RelayError(String),

    #[error("{what} timed out")]
    TimedOut { what: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Not connected to relay")]
    NotConnected,

    #[error("Action cancelled by user")]
    Cancelled,

    #[error("Summarization service error: {0}")]
    SummaryError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        fn io_path() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/relay.toml")?)
        }
        assert!(matches!(io_path(), Err(AssistantError::IoError(_))));

        fn serde_path() -> Result<serde_json::Value> {
            Ok(serde_json::from_str("not json")?)
        }
        assert!(matches!(serde_path(), Err(AssistantError::SerdeError(_))));
    }

    #[test]
    fn test_user_facing_messages() {
        let timed_out = AssistantError::TimedOut {
            what: "employee search".into(),
        };
        assert_eq!(timed_out.to_string(), "employee search timed out");
        assert_eq!(
            AssistantError::Cancelled.to_string(),
            "Action cancelled by user"
        );
    }
}

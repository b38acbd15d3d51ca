use thiserror::Error;

use crashwatch_core::SourceError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] crashwatch_core::ValidationError),

    #[error("quote unavailable: {}", summary(.0))]
    Quote(SourceError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Server(#[from] crashwatch_web::WebError),
}

fn summary(error: &SourceError) -> String {
    error.summary()
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Quote(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) | Self::Server(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashwatch_core::{ProviderId, ValidationError};

    #[test]
    fn exit_codes_follow_error_category() {
        let validation = CliError::Validation(ValidationError::UnknownIndicator {
            value: String::from("pe"),
        });
        let quote = CliError::Quote(SourceError::network(ProviderId::Yahoo, "reset"));
        let io = CliError::Io(std::io::Error::other("broken pipe"));

        assert_eq!(validation.exit_code(), 2);
        assert_eq!(quote.exit_code(), 3);
        assert_eq!(io.exit_code(), 10);
        assert_eq!(quote.to_string(), "quote unavailable: NETWORK_ERROR: reset");
    }
}

//! Engine error type.

use hecs::Entity;
use thiserror::Error;

use evacsim_logic::config::ConfigError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scenario parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid controller configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("unknown agent {0:?}")]
    UnknownAgent(Entity),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_joined() {
        let err = SimError::InvalidConfig(vec![
            ConfigError::NotPositive {
                field: "stuck.step",
                value: 0.0,
            },
            ConfigError::CorridorWidths {
                narrow: 200.0,
                wide: 80.0,
            },
        ]);
        let text = err.to_string();
        assert!(text.contains("stuck.step"));
        assert!(text.contains("; "));
    }
}

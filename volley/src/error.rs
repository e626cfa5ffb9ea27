use thiserror::Error;
use volley_core::ConfigError;

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("Invalid scenario configuration: {0}")]
    Config(#[from] ConfigError),
}

use tessera_api::error::CodecError;
use tessera_harness::HarnessError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Codec(#[from] CodecError),

    #[error("{0}")]
    Harness(#[from] HarnessError),

    #[error("scenario '{scenario}': {message}")]
    Value { scenario: String, message: String },

    #[error("{failed} of {total} scenarios failed")]
    Failed { failed: usize, total: usize },
}

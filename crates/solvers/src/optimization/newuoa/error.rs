use super::{ConfigError, sample::Failure};

/// Errors that can occur during a NEWUOA run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("model error: {0}")]
    Model(Box<dyn std::error::Error + Send + Sync>),

    #[error("problem error: {0}")]
    Problem(Box<dyn std::error::Error + Send + Sync>),

    #[error("solver stopped before any evaluation gave a finite objective")]
    NoEvaluations,
}

impl<ME, PE> From<Failure<ME, PE>> for Error
where
    ME: std::error::Error + Send + Sync + 'static,
    PE: std::error::Error + Send + Sync + 'static,
{
    fn from(err: Failure<ME, PE>) -> Self {
        match err {
            Failure::Model(e) => Error::Model(Box::new(e)),
            Failure::Input(e) | Failure::Objective(e) => Error::Problem(Box::new(e)),
        }
    }
}

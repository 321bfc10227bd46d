use thiserror::Error;

/// Centralized error type for run-terminating failures.
///
/// Per-municipality failures never appear here: the sweep loop captures
/// them as `Outcome::Failure` and keeps going. Only directory resolution
/// and a completely empty harvest abort the run.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("diretório de municípios indisponível: {0}")]
    DirectoryUnavailable(String),

    #[error("nenhum dado coletado ({processed} municípios processados)")]
    NoDataCollected { processed: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Alias for fallible operations in the sweep pipeline
pub type SweepResult<T> = Result<T, SweepError>;

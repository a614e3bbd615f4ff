use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmfdError {
    #[error("Solver diverged at iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Energy group mismatch: expected {expected}, got {got}")]
    GroupMismatch { expected: usize, got: usize },

    #[error("Mesh cell out of bounds: cell={cell}, cells={cells}")]
    CellOutOfBounds { cell: usize, cells: usize },

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),
}

pub type CmfdResult<T> = Result<T, CmfdError>;

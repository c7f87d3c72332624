use packscript::CompileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    /// Input the user has to fix, such as an empty structure.
    #[error("{0}")]
    User(String),
    #[error("palette entry {index} is malformed: {reason}")]
    MalformedBlock { index: usize, reason: String },
    #[error("could not upgrade block {name}: {reason}")]
    Upgrade { name: String, reason: String },
    #[error("failed to compile entity script: {0}")]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

pub type PackResult<T> = Result<T, PackError>;

use thiserror::Error;

/// Failure while lowering a procedure. None of these are recoverable: a
/// procedure that fails to compile must not produce partial output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("variable \"{name}\" was not bound")]
    UnresolvedBinding { name: String },
    #[error("index out of bounds: \"{name}\" has {length} entries, index {index} does not exist")]
    IndexOutOfRange {
        name: String,
        index: i64,
        length: usize,
    },
    #[error("\"{name}\" has no field \"{field}\"")]
    FieldNotFound { name: String, field: String },
    #[error("\"{name}\" is a {kind} and cannot be indexed")]
    NotIndexable { name: String, kind: &'static str },
    #[error("\"{name}\" is not a scalar and cannot be substituted directly")]
    NotScalar { name: String },
    #[error("cannot apply '{operator}' to non-numeric binding \"{name}\"")]
    NonNumericAdjustment { name: String, operator: String },
    #[error("loop over \"{variable}\" does not have compile-time constant integer bounds")]
    NonConstantLoopBound { variable: String },
    #[error("unsupported loop header: {message}")]
    UnsupportedLoop { message: String },
    #[error("variable declarations are not supported outside loop headers")]
    UnsupportedDeclaration,
}
impl CompileError {
    pub(crate) fn syntax<M: Into<String>>(position: usize, message: M) -> Self {
        CompileError::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Failure while evaluating emitted code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] CompileError),
    #[error("unknown function \"{0}\"")]
    UnknownFunction(String),
    #[error("unsupported construct: {0}")]
    Unsupported(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

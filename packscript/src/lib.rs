pub mod array;
pub mod ast;
pub mod emit;
pub mod environment;
pub mod error;
pub mod eval;
pub mod lex;
pub mod lower;
pub mod variant;

pub use array::{ArrayEncoder, SPLITTING_THRESHOLD};
pub use environment::Bindings;
pub use error::{CompileError, EvalError};
pub use variant::Value;

/// Compiles a procedure into loop-free target code with every placeholder
/// substituted from `bindings`.
pub fn compile(source: &str, bindings: &Bindings) -> Result<String, CompileError> {
    compile_with_limit(source, bindings, lower::ITERATION_LIMIT)
}

/// Like [`compile`], failing once loops would unroll more than
/// `iteration_limit` iterations in total.
pub fn compile_with_limit(
    source: &str,
    bindings: &Bindings,
    iteration_limit: usize,
) -> Result<String, CompileError> {
    let program = ast::parse_program(source)?;
    let lowered = lower::lower_with_limit(&program, bindings, iteration_limit)?;
    Ok(emit::emit_statements(&lowered))
}

/// Compiles a single expression, such as a transition guard.
pub fn compile_expression(source: &str, bindings: &Bindings) -> Result<String, CompileError> {
    let program = ast::parse_program(source)?;
    let lowered = lower::lower(&program, bindings)?;
    match lowered.as_slice() {
        [lower::Lowered::Eval(expression)] => Ok(emit::emit_expression(expression)),
        _ => Err(CompileError::syntax(0, "expected a single expression")),
    }
}

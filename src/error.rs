//! The two-severity error taxonomy from spec §7, typed with `thiserror`
//! rather than the source's ad hoc diagnostic-stream strings, matching
//! `freddiehaddad-oxidized`'s use of `thiserror` for library error types.

use thiserror::Error;

/// Errors raised by the reader. Always non-fatal: recovered by the REPL's
/// top-level loop.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("unexpected close paren")]
    UnexpectedCloseParen,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("malformed # directive: {0}")]
    MalformedHashDirective(String),
    #[error("string literal exceeds buffer capacity of {0} bytes")]
    StringBufferOverflow(usize),
    #[error("stray '.' outside of a dotted pair")]
    StrayDot,
    #[error("integer literal {0} does not fit in a fixnum")]
    FixnumOverflow(String),
}

/// Errors raised by the evaluator and primitives. Always non-fatal.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("wrong type argument: {0}")]
    WrongType(String),
    #[error("wrong number of arguments to {0}")]
    WrongArgCount(String),
    #[error("unbound variable: {0}")]
    UnboundVariable(String),
    #[error("ill-formed special form: {0}")]
    IllFormedSpecialForm(String),
    #[error("invalid expression type: {0}")]
    InvalidExpressionType(String),
    #[error("unknown function type applied: {0}")]
    UnknownFunctionType(String),
    #[error("{0}")]
    Reader(#[from] ReaderError),
    #[error("interrupted")]
    Interrupted,
    /// `named-let` is a deliberate non-feature (see the original spec's
    /// Open Questions): using it is "sorry, not supported", not a crash.
    #[error("sorry, named let is not supported")]
    NamedLetUnsupported,
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Unrecoverable errors. Logged at `error` and the process exits 1.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("failed to allocate heap of {0} cells")]
    HeapAllocationFailed(usize),
    #[error("failed to allocate required singleton: {0}")]
    SingletonAllocationFailed(&'static str),
    #[error("out of memory: garbage collection reclaimed no cells")]
    OutOfMemory,
    #[error("failed to load init script {0}: {1}")]
    InitScriptFailed(String, String),
    #[error("read buffer overflow ({0} bytes)")]
    ReadBufferOverflow(usize),
}

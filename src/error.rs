//! Error types for reading and compilation.
//!
//! Compile-time structural errors are ordinary typed results: a malformed
//! form fails the compile and nothing else. Runtime calling-convention
//! violations are not represented here: in the checked safety mode they are
//! diagnosed and abort the process (see `runtime`), and in the unchecked
//! mode they are undefined behavior.

use std::fmt;

/// Compile-time structural error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The expression handed to `compile_lambda` is not a lambda form.
    NotALambda,
    /// Parameter list is not a (possibly dotted) list of symbols.
    MalformedParams,
    /// The same name is bound twice in one parameter list.
    DuplicateParameter(String),
    /// A lambda with no body expressions.
    EmptyBody,
    /// The body is not a proper list of expressions.
    MalformedBody,
    /// `if` without exactly test, then, and else sub-expressions.
    MalformedIf,
    /// `quote` without exactly one datum.
    MalformedQuote,
    /// An application form that is not a proper list.
    ImproperCall,
    /// Cranelift failed to build or finalize the function.
    Codegen(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::NotALambda => write!(f, "expected a lambda form"),
            CompileError::MalformedParams => {
                write!(f, "parameter list must be a list of symbols, optionally dotted")
            }
            CompileError::DuplicateParameter(name) => {
                write!(f, "duplicate parameter name '{}'", name)
            }
            CompileError::EmptyBody => write!(f, "lambda body must have at least one expression"),
            CompileError::MalformedBody => write!(f, "lambda body is not a proper list"),
            CompileError::MalformedIf => {
                write!(f, "if requires exactly a test, a then, and an else expression")
            }
            CompileError::MalformedQuote => write!(f, "quote requires exactly one datum"),
            CompileError::ImproperCall => write!(f, "application is not a proper list"),
            CompileError::Codegen(msg) => write!(f, "code generation failed: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}

/// Reader error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Input ended in the middle of a datum.
    UnexpectedEof,
    /// A character that cannot start or continue a datum here.
    UnexpectedChar(char),
    /// Closing delimiter with no open list.
    UnbalancedParen,
    /// String literal without a closing quote.
    UnterminatedString,
    /// A dot in a position other than before the final list element.
    MisplacedDot,
    /// `#` followed by something unrecognized.
    BadHashSyntax(String),
    /// Integer literal out of fixnum range.
    IntegerOverflow(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::UnexpectedEof => write!(f, "unexpected end of input"),
            ReadError::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            ReadError::UnbalancedParen => write!(f, "unbalanced closing parenthesis"),
            ReadError::UnterminatedString => write!(f, "unterminated string literal"),
            ReadError::MisplacedDot => write!(f, "misplaced dot in list"),
            ReadError::BadHashSyntax(s) => write!(f, "unrecognized #-syntax: #{}", s),
            ReadError::IntegerOverflow(s) => write!(f, "integer literal out of range: {}", s),
        }
    }
}

impl std::error::Error for ReadError {}

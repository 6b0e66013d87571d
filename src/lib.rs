//! # Vesper - A JIT-Compiled Lisp
//!
//! Vesper compiles each lambda literal straight to native code with
//! Cranelift at the moment it is evaluated. There is no interpreter and
//! no bytecode stage: a lambda expression goes in, a function pointer
//! comes out.
//!
//! ## Quick Start
//!
//! ```
//! use vesper::{read_str, Compiler, SafetyMode, SymbolTable, Value};
//!
//! let mut symbols = SymbolTable::new();
//! let mut compiler = Compiler::new(&mut symbols, SafetyMode::Checked).unwrap();
//!
//! let expr = read_str("(lambda (x) x)", &mut symbols).unwrap();
//! let identity = compiler.compile_lambda(expr).unwrap();
//! let result = unsafe { identity.call(&[Value::fixnum(42)]) };
//! assert_eq!(result, Value::fixnum(42));
//! ```
//!
//! ## Architecture
//!
//! 1. **Reader** - Parse S-expressions from text
//! 2. **Compiler** - Translate lambda literals to Cranelift IR, one
//!    native function per literal, inner literals first
//! 3. **Runtime** - Tagged one-word values, closure objects, and the
//!    helpers generated code calls back into
//!
//! Values are single machine words with a tag in the low four bits.
//! Closures pair a capture record with a native entry point; free
//! variables of nested lambdas are resolved at compile time and threaded
//! through every intermediate closure.

pub mod compiler;
pub mod error;
pub mod reader;
pub mod runtime;
pub mod symbols;
pub mod value;

pub use compiler::{CompiledLambda, Compiler, SafetyMode};
pub use error::{CompileError, ReadError};
pub use reader::{read_all, read_str};
pub use runtime::call_closure;
pub use symbols::SymbolTable;
pub use value::repr::{Tag, Value};
pub use value::{cons, list};

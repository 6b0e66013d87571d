//! Per-lambda JIT compiler: lambda expressions -> Cranelift IR -> native code.
//!
//! Each lambda literal compiles to one native function. Nested literals
//! compile depth-first: the inner function is defined and finalized
//! before the outer function's code resumes, and the inner entry address
//! is embedded in the outer function as an immediate.
//!
//! Compiled code calls back into the runtime through the `vesper_rt_*`
//! helpers, registered with the JIT by name and declared as imports.

mod call;
mod captures;
mod closure;
mod expr;
mod lambda;
mod scope;

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{AbiParam, Signature};
use cranelift_codegen::isa::CallConv;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};

use crate::error::CompileError;
use crate::runtime;
use crate::symbols::SymbolTable;
use crate::value::heap;
use crate::value::repr::Value;

use scope::ScopeStack;

/// Whether generated code carries runtime guards.
///
/// `Checked` call sites verify the callee is a closure, and every
/// prologue verifies the argument count. `Unchecked` omits both; a
/// violated contract is then undefined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SafetyMode {
    #[default]
    Checked,
    Unchecked,
}

/// Pre-declared runtime helper function IDs.
pub(crate) struct RuntimeHelpers {
    pub(crate) gather_rest: FuncId,
    pub(crate) alloc_env: FuncId,
    pub(crate) make_closure: FuncId,
    pub(crate) check_closure: FuncId,
    pub(crate) check_arity_exact: FuncId,
    pub(crate) check_arity_min: FuncId,
}

/// The interned special-form symbols, compared by identity during
/// dispatch.
pub(crate) struct Specials {
    pub(crate) lambda: Value,
    pub(crate) if_: Value,
    pub(crate) quote: Value,
}

/// JIT compiler for lambda expressions.
///
/// Owns the `JITModule` holding every function it has compiled; dropping
/// the compiler frees the executable memory, so compiled lambdas and the
/// closures made from them must not outlive it.
pub struct Compiler {
    module: JITModule,
    helpers: RuntimeHelpers,
    specials: Specials,
    safety: SafetyMode,
    next_lambda: u32,
}

impl Compiler {
    pub fn new(symbols: &mut SymbolTable, safety: SafetyMode) -> Result<Self, CompileError> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("use_colocated_libcalls", "false")
            .map_err(|e| CompileError::Codegen(e.to_string()))?;
        flag_builder
            .set("is_pic", "false")
            .map_err(|e| CompileError::Codegen(e.to_string()))?;
        flag_builder
            .set("opt_level", "speed")
            .map_err(|e| CompileError::Codegen(e.to_string()))?;

        let isa_builder =
            cranelift_native::builder().map_err(|e| CompileError::Codegen(e.to_string()))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| CompileError::Codegen(e.to_string()))?;

        let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());

        builder.symbol(
            "vesper_rt_gather_rest",
            runtime::vesper_rt_gather_rest as *const u8,
        );
        builder.symbol(
            "vesper_rt_alloc_env",
            runtime::vesper_rt_alloc_env as *const u8,
        );
        builder.symbol(
            "vesper_rt_make_closure",
            runtime::vesper_rt_make_closure as *const u8,
        );
        builder.symbol(
            "vesper_rt_check_closure",
            runtime::vesper_rt_check_closure as *const u8,
        );
        builder.symbol(
            "vesper_rt_check_arity_exact",
            runtime::vesper_rt_check_arity_exact as *const u8,
        );
        builder.symbol(
            "vesper_rt_check_arity_min",
            runtime::vesper_rt_check_arity_min as *const u8,
        );

        let mut module = JITModule::new(builder);
        let helpers = Self::declare_helpers(&mut module)?;

        let specials = Specials {
            lambda: symbols.intern("lambda"),
            if_: symbols.intern("if"),
            quote: symbols.intern("quote"),
        };

        Ok(Compiler {
            module,
            helpers,
            specials,
            safety,
            next_lambda: 0,
        })
    }

    /// The signature every compiled lambda and every indirect call site
    /// agree on: (env, nargs, args_ptr) -> value bits, all i64.
    pub(crate) fn entry_signature(&self) -> Signature {
        let mut sig = self.module.make_signature();
        sig.call_conv = CallConv::SystemV;
        sig.params.push(AbiParam::new(I64)); // capture record pointer
        sig.params.push(AbiParam::new(I64)); // argument count
        sig.params.push(AbiParam::new(I64)); // argument array pointer
        sig.returns.push(AbiParam::new(I64));
        sig
    }

    fn declare_helpers(module: &mut JITModule) -> Result<RuntimeHelpers, CompileError> {
        let mut unary_sig = module.make_signature();
        unary_sig.params.push(AbiParam::new(I64));
        unary_sig.returns.push(AbiParam::new(I64));

        let mut binary_sig = module.make_signature();
        binary_sig.params.push(AbiParam::new(I64));
        binary_sig.params.push(AbiParam::new(I64));
        binary_sig.returns.push(AbiParam::new(I64));

        let mut ternary_sig = module.make_signature();
        ternary_sig.params.push(AbiParam::new(I64));
        ternary_sig.params.push(AbiParam::new(I64));
        ternary_sig.params.push(AbiParam::new(I64));
        ternary_sig.returns.push(AbiParam::new(I64));

        // guards return nothing
        let mut check1_sig = module.make_signature();
        check1_sig.params.push(AbiParam::new(I64));

        let mut check2_sig = module.make_signature();
        check2_sig.params.push(AbiParam::new(I64));
        check2_sig.params.push(AbiParam::new(I64));

        let declare =
            |module: &mut JITModule, name: &str, sig: &Signature| -> Result<FuncId, CompileError> {
                module
                    .declare_function(name, Linkage::Import, sig)
                    .map_err(|e| CompileError::Codegen(e.to_string()))
            };

        Ok(RuntimeHelpers {
            gather_rest: declare(module, "vesper_rt_gather_rest", &ternary_sig)?,
            alloc_env: declare(module, "vesper_rt_alloc_env", &unary_sig)?,
            make_closure: declare(module, "vesper_rt_make_closure", &binary_sig)?,
            check_closure: declare(module, "vesper_rt_check_closure", &check1_sig)?,
            check_arity_exact: declare(module, "vesper_rt_check_arity_exact", &check2_sig)?,
            check_arity_min: declare(module, "vesper_rt_check_arity_min", &check2_sig)?,
        })
    }

    /// Compile a `(lambda params body...)` expression to native code.
    ///
    /// The expression must be a top-level literal: any free variables
    /// resolve to global cells, never to captures.
    pub fn compile_lambda(&mut self, expr: Value) -> Result<CompiledLambda, CompileError> {
        if !(expr.is_pair() && unsafe { expr.as_cons_unchecked() }.car() == self.specials.lambda) {
            return Err(CompileError::NotALambda);
        }
        let mut scopes = ScopeStack::new();
        let unit = lambda::compile_lambda_literal(self, &mut scopes, expr, None)?;
        debug_assert!(unit.captures.is_empty(), "top-level lambda cannot capture");
        Ok(CompiledLambda {
            entry: unit.entry,
            fixed: unit.fixed,
            has_rest: unit.has_rest,
        })
    }

    pub fn safety(&self) -> SafetyMode {
        self.safety
    }

    pub(crate) fn fresh_lambda_name(&mut self) -> String {
        let n = self.next_lambda;
        self.next_lambda += 1;
        format!("lambda_{}", n)
    }
}

/// A compiled top-level lambda.
///
/// Holds the entry address of the generated code. The `Compiler` that
/// produced it must stay alive for as long as this (or any closure made
/// from it) is called.
#[derive(Debug, PartialEq)]
pub struct CompiledLambda {
    entry: *const u8,
    fixed: usize,
    has_rest: bool,
}

impl CompiledLambda {
    /// Number of fixed parameters.
    pub fn fixed_params(&self) -> usize {
        self.fixed
    }

    /// Whether a rest parameter collects excess arguments.
    pub fn has_rest(&self) -> bool {
        self.has_rest
    }

    /// Wrap the entry point into a closure value. Top-level lambdas
    /// capture nothing, so the environment is null.
    pub fn to_closure(&self) -> Value {
        heap::alloc_closure(std::ptr::null_mut(), self.entry)
    }

    /// Invoke the compiled code directly.
    ///
    /// # Safety
    /// The `Compiler` that produced this lambda must still be alive. In
    /// the unchecked safety mode the argument count must also satisfy
    /// the declared arity.
    pub unsafe fn call(&self, args: &[Value]) -> Value {
        let entry: runtime::EntryFn = std::mem::transmute(self.entry);
        Value::from_bits(entry(std::ptr::null(), args.len() as u64, args.as_ptr()))
    }
}

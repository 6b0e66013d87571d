//! Compilation of a single lambda literal into a native function.

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{InstBuilder, MemFlags, UserFuncName};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{Linkage, Module};

use crate::error::CompileError;
use crate::value::repr::Value;

use super::expr::FunctionCx;
use super::scope::{ScopeFrame, ScopeStack};
use super::{Compiler, SafetyMode};

/// Result of compiling one lambda literal.
pub(crate) struct CompiledUnit {
    /// Finalized native entry point.
    pub(crate) entry: *const u8,
    /// Captured free variables in dense record order. The enclosing
    /// frame supplies these at materialization time; empty for a closed
    /// literal.
    pub(crate) captures: Vec<Value>,
    pub(crate) fixed: usize,
    pub(crate) has_rest: bool,
}

struct ParamSpec {
    fixed: Vec<Value>,
    rest: Option<Value>,
}

/// Walk `(a b c)`, `(a b . rest)`, or a bare symbol (all-rest).
fn parse_params(params: Value) -> Result<ParamSpec, CompileError> {
    let mut fixed = Vec::new();
    let mut cursor = params;
    while cursor.is_pair() {
        let cell = unsafe { cursor.as_cons_unchecked() };
        let name = cell.car();
        if !name.is_symbol() {
            return Err(CompileError::MalformedParams);
        }
        fixed.push(name);
        cursor = cell.cdr();
    }
    let rest = if cursor.is_nil() {
        None
    } else if cursor.is_symbol() {
        Some(cursor)
    } else {
        return Err(CompileError::MalformedParams);
    };
    Ok(ParamSpec { fixed, rest })
}

/// Compile `form`, a `(lambda params body...)` pair, into a native
/// function. `parent` is the index of the enclosing scope frame, `None`
/// at top level.
///
/// Nested literals recurse through the expression compiler back into
/// this function, so the inner function is fully defined and finalized
/// before the enclosing function's body continues.
pub(crate) fn compile_lambda_literal(
    compiler: &mut Compiler,
    scopes: &mut ScopeStack,
    form: Value,
    parent: Option<usize>,
) -> Result<CompiledUnit, CompileError> {
    let rest_of_form = unsafe { form.as_cons_unchecked() }.cdr();
    if !rest_of_form.is_pair() {
        return Err(CompileError::MalformedParams);
    }
    let (params_form, body_form) = {
        let cell = unsafe { rest_of_form.as_cons_unchecked() };
        (cell.car(), cell.cdr())
    };
    let params = parse_params(params_form)?;
    let body = body_form
        .list_to_vec()
        .ok_or(CompileError::MalformedBody)?;
    if body.is_empty() {
        return Err(CompileError::EmptyBody);
    }

    let sig = compiler.entry_signature();
    let name = compiler.fresh_lambda_name();
    let func_id = compiler
        .module
        .declare_function(&name, Linkage::Local, &sig)
        .map_err(|e| CompileError::Codegen(e.to_string()))?;

    let mut ctx = compiler.module.make_context();
    ctx.func.signature = sig;
    ctx.func.name = UserFuncName::user(0, func_id.as_u32());

    let mut fb_ctx = FunctionBuilderContext::new();
    let captures;
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut fb_ctx);
        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);
        builder.seal_block(entry_block);

        let env_ptr = builder.block_params(entry_block)[0];
        let nargs = builder.block_params(entry_block)[1];
        let args_ptr = builder.block_params(entry_block)[2];

        let frame = scopes.push_frame(ScopeFrame::new(parent, env_ptr, nargs, args_ptr));

        if compiler.safety == SafetyMode::Checked {
            let check = if params.rest.is_some() {
                compiler.helpers.check_arity_min
            } else {
                compiler.helpers.check_arity_exact
            };
            let check_ref = compiler.module.declare_func_in_func(check, builder.func);
            let expected = builder.ins().iconst(I64, params.fixed.len() as i64);
            builder.ins().call(check_ref, &[expected, nargs]);
        }

        // spill each fixed parameter into its own binding slot
        for (i, &name) in params.fixed.iter().enumerate() {
            let v = builder
                .ins()
                .load(I64, MemFlags::trusted(), args_ptr, (i * 8) as i32);
            let slot = ScopeFrame::alloc_binding_slot(&mut builder);
            builder.ins().stack_store(v, slot, 0);
            scopes.frame_mut(frame).bind(name, slot)?;
        }

        if let Some(rest_name) = params.rest {
            let gather_ref = compiler
                .module
                .declare_func_in_func(compiler.helpers.gather_rest, builder.func);
            let fixed = builder.ins().iconst(I64, params.fixed.len() as i64);
            let call = builder.ins().call(gather_ref, &[args_ptr, nargs, fixed]);
            let rest_list = builder.inst_results(call)[0];
            let slot = ScopeFrame::alloc_binding_slot(&mut builder);
            builder.ins().stack_store(rest_list, slot, 0);
            scopes.frame_mut(frame).bind(rest_name, slot)?;
        }

        let mut cx = FunctionCx {
            compiler: &mut *compiler,
            scopes: &mut *scopes,
            builder,
            frame,
        };
        let mut result = cx.compile_expr(body[0])?;
        for &expr in &body[1..] {
            result = cx.compile_expr(expr)?;
        }
        cx.builder.ins().return_(&[result]);
        cx.builder.finalize();

        captures = scopes.pop_frame(frame).into_captures();
    }

    compiler
        .module
        .define_function(func_id, &mut ctx)
        .map_err(|e| CompileError::Codegen(e.to_string()))?;
    compiler
        .module
        .finalize_definitions()
        .map_err(|e| CompileError::Codegen(e.to_string()))?;
    let entry = compiler.module.get_finalized_function(func_id);

    Ok(CompiledUnit {
        entry,
        captures,
        fixed: params.fixed.len(),
        has_rest: params.rest.is_some(),
    })
}

//! Closure materialization in the enclosing function.
//!
//! After an inner lambda is compiled, the enclosing function must build
//! the closure value at runtime: allocate the capture record, fill it
//! with the captured values as resolved in the enclosing frame, and pair
//! it with the inner entry address. A literal that captures nothing
//! skips the allocation entirely and carries a null record.

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{self, InstBuilder, MemFlags};
use cranelift_module::Module;

use crate::error::CompileError;

use super::expr::FunctionCx;
use super::lambda::CompiledUnit;

pub(crate) fn materialize(
    cx: &mut FunctionCx,
    unit: &CompiledUnit,
) -> Result<ir::Value, CompileError> {
    let env = if unit.captures.is_empty() {
        cx.builder.ins().iconst(I64, 0)
    } else {
        let alloc_ref = cx
            .compiler
            .module
            .declare_func_in_func(cx.compiler.helpers.alloc_env, cx.builder.func);
        let len = cx.builder.ins().iconst(I64, unit.captures.len() as i64);
        let call = cx.builder.ins().call(alloc_ref, &[len]);
        let env = cx.builder.inst_results(call)[0];
        for (idx, &sym) in unit.captures.iter().enumerate() {
            // resolving here may thread the capture further outward
            let v = cx.compile_ref(sym)?;
            cx.builder
                .ins()
                .store(MemFlags::trusted(), v, env, (idx * 8) as i32);
        }
        env
    };

    let make_ref = cx
        .compiler
        .module
        .declare_func_in_func(cx.compiler.helpers.make_closure, cx.builder.func);
    let entry = cx.builder.ins().iconst(I64, unit.entry as i64);
    let call = cx.builder.ins().call(make_ref, &[env, entry]);
    Ok(cx.builder.inst_results(call)[0])
}

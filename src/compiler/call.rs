//! Native call sequence for a procedure application.
//!
//! The callee and every argument are evaluated in source order, each
//! staged onto the simulated operand stack so nested applications cannot
//! clobber partial results. They come back off in reverse immediately
//! before the call, landing in an argument array the callee receives by
//! address. The entry pointer and capture record are loaded straight out
//! of the closure object, so a call is two loads and an indirect jump.

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{self, InstBuilder, MemFlags, StackSlotData, StackSlotKind};
use cranelift_module::Module;
use smallvec::SmallVec;

use crate::error::CompileError;
use crate::value::repr::{Value, TAG_MASK};

use super::expr::FunctionCx;
use super::SafetyMode;

pub(crate) fn compile_call(cx: &mut FunctionCx, form: Value) -> Result<ir::Value, CompileError> {
    let items: SmallVec<[Value; 8]> = {
        let mut out = SmallVec::new();
        let mut cursor = form;
        while cursor.is_pair() {
            let cell = unsafe { cursor.as_cons_unchecked() };
            out.push(cell.car());
            cursor = cell.cdr();
        }
        if !cursor.is_nil() {
            return Err(CompileError::ImproperCall);
        }
        out
    };
    let nargs = items.len() - 1;

    // stage callee then arguments, left to right
    for &item in &items {
        let v = cx.compile_expr(item)?;
        let frame = cx.scopes.frame_mut(cx.frame);
        frame.push(&mut cx.builder, v);
    }

    // unstage in reverse into the argument array
    let args_addr = if nargs > 0 {
        let slot = cx.builder.create_sized_stack_slot(StackSlotData::new(
            StackSlotKind::ExplicitSlot,
            (nargs * 8) as u32,
            0,
        ));
        for i in (0..nargs).rev() {
            let v = cx.scopes.frame_mut(cx.frame).pop(&mut cx.builder);
            cx.builder.ins().stack_store(v, slot, (i * 8) as i32);
        }
        cx.builder.ins().stack_addr(I64, slot, 0)
    } else {
        cx.builder.ins().iconst(I64, 0)
    };
    let callee = cx.scopes.frame_mut(cx.frame).pop(&mut cx.builder);

    if cx.compiler.safety == SafetyMode::Checked {
        let check_ref = cx
            .compiler
            .module
            .declare_func_in_func(cx.compiler.helpers.check_closure, cx.builder.func);
        cx.builder.ins().call(check_ref, &[callee]);
    }

    // strip the tag, then the closure object is (env, entry)
    let obj = cx.builder.ins().band_imm(callee, !(TAG_MASK as i64));
    let env = cx.builder.ins().load(I64, MemFlags::trusted(), obj, 0);
    let entry = cx.builder.ins().load(I64, MemFlags::trusted(), obj, 8);

    let sig = cx.compiler.entry_signature();
    let sig_ref = cx.builder.import_signature(sig);
    let nargs_val = cx.builder.ins().iconst(I64, nargs as i64);
    let call = cx
        .builder
        .ins()
        .call_indirect(sig_ref, entry, &[env, nargs_val, args_addr]);
    Ok(cx.builder.inst_results(call)[0])
}

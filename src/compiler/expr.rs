//! Expression compilation within one function body.
//!
//! `FunctionCx` carries everything needed while emitting one function:
//! the compiler (module and helper ids), the scope stack, the Cranelift
//! builder, and the index of the frame being compiled. Nested lambda
//! literals recurse back through the lambda driver with a fresh builder,
//! so the borrow of this one is never live across an inner compile.

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{self, InstBuilder, MemFlags};
use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_frontend::FunctionBuilder;

use crate::error::CompileError;
use crate::value::heap;
use crate::value::repr::{Value, VAL_FALSE};

use super::captures::{self, Resolution};
use super::scope::ScopeStack;
use super::{call, closure, lambda, Compiler};

pub(crate) struct FunctionCx<'a, 'b> {
    pub(crate) compiler: &'a mut Compiler,
    pub(crate) scopes: &'a mut ScopeStack,
    pub(crate) builder: FunctionBuilder<'b>,
    pub(crate) frame: usize,
}

impl<'a, 'b> FunctionCx<'a, 'b> {
    /// Compile one expression, yielding its value bits.
    pub(crate) fn compile_expr(&mut self, expr: Value) -> Result<ir::Value, CompileError> {
        if expr.is_pair() {
            let head = unsafe { expr.as_cons_unchecked() }.car();
            if head == self.compiler.specials.lambda {
                self.compile_lambda_literal(expr)
            } else if head == self.compiler.specials.if_ {
                self.compile_if(expr)
            } else if head == self.compiler.specials.quote {
                self.compile_quote(expr)
            } else {
                call::compile_call(self, expr)
            }
        } else if expr.is_symbol() {
            self.compile_ref(expr)
        } else {
            Ok(self.compile_literal(expr))
        }
    }

    /// Emit a load for a variable reference.
    pub(crate) fn compile_ref(&mut self, sym: Value) -> Result<ir::Value, CompileError> {
        match captures::resolve(self.scopes, self.frame, sym) {
            Resolution::Local(slot) => Ok(self.builder.ins().stack_load(I64, slot, 0)),
            Resolution::Capture(idx) => {
                let env = self.scopes.frame(self.frame).env_ptr;
                Ok(self
                    .builder
                    .ins()
                    .load(I64, MemFlags::trusted(), env, (idx * 8) as i32))
            }
            Resolution::Global => {
                // bake the global cell address into the code; the slot
                // address is stable for the life of the process
                let slot = unsafe { sym.as_symbol_unchecked() }.global_slot_addr();
                let addr = self.builder.ins().iconst(I64, slot as i64);
                Ok(self.builder.ins().load(I64, MemFlags::trusted(), addr, 0))
            }
        }
    }

    /// Self-evaluating datum: the value word itself is the immediate.
    /// Heap data baked into code must never be reclaimed.
    fn compile_literal(&mut self, datum: Value) -> ir::Value {
        if datum.is_heap() {
            heap::register_permanent(datum);
        }
        self.builder.ins().iconst(I64, datum.to_bits() as i64)
    }

    /// `(quote datum)`
    fn compile_quote(&mut self, form: Value) -> Result<ir::Value, CompileError> {
        let rest = unsafe { form.as_cons_unchecked() }.cdr();
        if !rest.is_pair() {
            return Err(CompileError::MalformedQuote);
        }
        let cell = unsafe { rest.as_cons_unchecked() };
        if !cell.cdr().is_nil() {
            return Err(CompileError::MalformedQuote);
        }
        Ok(self.compile_literal(cell.car()))
    }

    /// `(if test then else)`
    ///
    /// Only `#f` is false. Exactly one arm executes; both jump to a
    /// merge block carrying the result as a block parameter.
    fn compile_if(&mut self, form: Value) -> Result<ir::Value, CompileError> {
        let parts = unsafe { form.as_cons_unchecked() }
            .cdr()
            .list_to_vec()
            .ok_or(CompileError::MalformedIf)?;
        let (test, then_expr, else_expr) = match parts[..] {
            [test, then_expr, else_expr] => (test, then_expr, else_expr),
            _ => return Err(CompileError::MalformedIf),
        };

        let test_val = self.compile_expr(test)?;
        let is_false = self
            .builder
            .ins()
            .icmp_imm(IntCC::Equal, test_val, VAL_FALSE as i64);

        let then_block = self.builder.create_block();
        let else_block = self.builder.create_block();
        let merge_block = self.builder.create_block();
        self.builder.append_block_param(merge_block, I64);

        self.builder
            .ins()
            .brif(is_false, else_block, &[], then_block, &[]);

        self.builder.switch_to_block(then_block);
        self.builder.seal_block(then_block);
        let then_val = self.compile_expr(then_expr)?;
        self.builder.ins().jump(merge_block, &[then_val]);

        self.builder.switch_to_block(else_block);
        self.builder.seal_block(else_block);
        let else_val = self.compile_expr(else_expr)?;
        self.builder.ins().jump(merge_block, &[else_val]);

        self.builder.switch_to_block(merge_block);
        self.builder.seal_block(merge_block);
        Ok(self.builder.block_params(merge_block)[0])
    }

    /// Nested `(lambda ...)`: compile the inner function depth-first,
    /// then materialize its closure here in the enclosing function.
    fn compile_lambda_literal(&mut self, form: Value) -> Result<ir::Value, CompileError> {
        let unit = lambda::compile_lambda_literal(
            &mut *self.compiler,
            &mut *self.scopes,
            form,
            Some(self.frame),
        )?;
        closure::materialize(self, &unit)
    }
}

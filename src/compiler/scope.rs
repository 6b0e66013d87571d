//! Lexical scope frames and the simulated operand stack.
//!
//! One `ScopeFrame` exists per lambda literal being compiled. Frames are
//! held in a `ScopeStack` and reference their parent by index, so capture
//! resolution can walk and mutate intermediate frames while an inner
//! lambda is on top.
//!
//! Each frame also carries a simulated operand stack of 8-byte spill
//! slots. Pushing past the high-water mark allocates a fresh slot in the
//! function's stack frame; popping reuses slots, so stack discipline nets
//! to zero extra depth across a call.

use cranelift_codegen::ir::types::I64;
use cranelift_codegen::ir::{self, InstBuilder, StackSlot, StackSlotData, StackSlotKind};
use cranelift_frontend::FunctionBuilder;
use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::value::repr::Value;

/// Compile-time scope for a single lambda literal.
pub(crate) struct ScopeFrame {
    /// Parameter and rest-name bindings, keyed by interned symbol word.
    bindings: FxHashMap<u64, StackSlot>,
    /// Captured free variables, keyed by symbol word, memoized on first
    /// resolution.
    captures: FxHashMap<u64, usize>,
    /// Capture symbols in dense index order. `captures[capture_order[i]]
    /// == i` always holds.
    capture_order: Vec<Value>,
    /// Index of the enclosing frame in the `ScopeStack`, `None` for a
    /// top-level lambda.
    pub(crate) parent: Option<usize>,
    /// Operand spill slots, reused up to the high-water mark.
    stack_slots: Vec<StackSlot>,
    stack_depth: usize,
    /// Entry values of the compiled function this frame belongs to.
    pub(crate) env_ptr: ir::Value,
    pub(crate) nargs: ir::Value,
    pub(crate) args_ptr: ir::Value,
}

impl ScopeFrame {
    pub(crate) fn new(
        parent: Option<usize>,
        env_ptr: ir::Value,
        nargs: ir::Value,
        args_ptr: ir::Value,
    ) -> Self {
        ScopeFrame {
            bindings: FxHashMap::default(),
            captures: FxHashMap::default(),
            capture_order: Vec::new(),
            parent,
            stack_slots: Vec::new(),
            stack_depth: 0,
            env_ptr,
            nargs,
            args_ptr,
        }
    }

    /// Bind `sym` to a slot. Rebinding the same name in one frame is a
    /// parameter-list error.
    pub(crate) fn bind(&mut self, sym: Value, slot: StackSlot) -> Result<(), CompileError> {
        debug_assert!(sym.is_symbol());
        if self.bindings.insert(sym.to_bits(), slot).is_some() {
            let name = unsafe { sym.as_symbol_unchecked() }.name().to_owned();
            return Err(CompileError::DuplicateParameter(name));
        }
        Ok(())
    }

    pub(crate) fn lookup_local(&self, sym: Value) -> Option<StackSlot> {
        self.bindings.get(&sym.to_bits()).copied()
    }

    pub(crate) fn lookup_capture(&self, sym: Value) -> Option<usize> {
        self.captures.get(&sym.to_bits()).copied()
    }

    /// Assign the next dense capture index to `sym`.
    pub(crate) fn add_capture(&mut self, sym: Value) -> usize {
        debug_assert!(!self.captures.contains_key(&sym.to_bits()));
        let idx = self.capture_order.len();
        self.captures.insert(sym.to_bits(), idx);
        self.capture_order.push(sym);
        idx
    }

    pub(crate) fn capture_order(&self) -> &[Value] {
        &self.capture_order
    }

    pub(crate) fn into_captures(self) -> Vec<Value> {
        self.capture_order
    }

    /// Spill a value onto the operand stack.
    pub(crate) fn push(&mut self, builder: &mut FunctionBuilder, v: ir::Value) {
        if self.stack_depth == self.stack_slots.len() {
            let slot = builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                8,
                0,
            ));
            self.stack_slots.push(slot);
        }
        builder.ins().stack_store(v, self.stack_slots[self.stack_depth], 0);
        self.stack_depth += 1;
    }

    /// Reload the most recently pushed value.
    pub(crate) fn pop(&mut self, builder: &mut FunctionBuilder) -> ir::Value {
        debug_assert!(self.stack_depth > 0, "operand stack underflow");
        self.stack_depth -= 1;
        builder.ins().stack_load(I64, self.stack_slots[self.stack_depth], 0)
    }

    /// Allocate a dedicated 8-byte slot outside the operand stack, used
    /// for parameter bindings.
    pub(crate) fn alloc_binding_slot(builder: &mut FunctionBuilder) -> StackSlot {
        builder.create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, 8, 0))
    }
}

/// Stack of live scope frames, outermost first.
#[derive(Default)]
pub(crate) struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub(crate) fn new() -> Self {
        ScopeStack { frames: Vec::new() }
    }

    /// Push a frame and return its index.
    pub(crate) fn push_frame(&mut self, frame: ScopeFrame) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }

    /// Pop the innermost frame. Callers must pop the frame they pushed.
    pub(crate) fn pop_frame(&mut self, index: usize) -> ScopeFrame {
        debug_assert_eq!(index, self.frames.len() - 1);
        self.frames.pop().unwrap()
    }

    pub(crate) fn frame(&self, index: usize) -> &ScopeFrame {
        &self.frames[index]
    }

    pub(crate) fn frame_mut(&mut self, index: usize) -> &mut ScopeFrame {
        &mut self.frames[index]
    }
}

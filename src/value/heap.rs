//! Heap objects behind the tagged word, and the minimal memory-manager
//! surface the compiler depends on: allocate a cons cell, register a value
//! as a permanent root, test whether a value is heap-allocated.
//!
//! Every object here is 16-byte aligned (the tag bits live in the low
//! nibble of its address) and is leaked on allocation; reclamation belongs
//! to an external collector. The permanent-root registry exists because the
//! compiler bakes raw object addresses into machine code: a registered
//! value must never be collected or relocated.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};

use crate::value::repr::{TAG_CLOSURE, TAG_CONS, TAG_STRING, TAG_SYMBOL, TAG_VECTOR};
use crate::value::Value;

// =============================================================================
// Cons Cell
// =============================================================================

/// An ordered pair of value words. The tag is immutable; the payload is
/// mutable through the explicit accessors.
#[repr(C, align(16))]
pub struct ConsCell {
    car: Cell<Value>,
    cdr: Cell<Value>,
}

impl ConsCell {
    #[inline]
    pub fn car(&self) -> Value {
        self.car.get()
    }

    #[inline]
    pub fn cdr(&self) -> Value {
        self.cdr.get()
    }

    #[inline]
    pub fn set_car(&self, v: Value) {
        self.car.set(v);
    }

    #[inline]
    pub fn set_cdr(&self, v: Value) {
        self.cdr.set(v);
    }
}

/// Allocate a cons cell.
#[inline]
pub fn alloc_cons(car: Value, cdr: Value) -> Value {
    let cell = Box::leak(Box::new(ConsCell {
        car: Cell::new(car),
        cdr: Cell::new(cdr),
    }));
    unsafe { Value::from_heap_ptr(cell as *const ConsCell as *const (), TAG_CONS) }
}

// =============================================================================
// Closure
// =============================================================================

/// A closure object: a capture record (possibly null) paired with a native
/// entry point.
///
/// Field order is part of the binary contract: the call emitter masks the
/// tag bits off a closure word and loads `env` at offset 0 and `entry` at
/// offset 8. Changing this layout requires changing the generated call
/// sequence.
#[repr(C, align(16))]
pub struct ClosureObj {
    env: *mut Value,
    entry: *const u8,
}

impl ClosureObj {
    /// The capture record, or null when the closure captures nothing.
    #[inline]
    pub fn env(&self) -> *mut Value {
        self.env
    }

    /// The native entry point.
    #[inline]
    pub fn entry(&self) -> *const u8 {
        self.entry
    }

    /// Read a captured value by its capture index.
    ///
    /// # Safety
    /// The index must be within the capture record this closure was
    /// materialized with, and the record must be non-null.
    #[inline]
    pub unsafe fn capture(&self, index: usize) -> Value {
        *self.env.add(index)
    }
}

/// Allocate a closure object pairing `env` (null for a closure with no
/// captures) with a native entry point.
#[inline]
pub fn alloc_closure(env: *mut Value, entry: *const u8) -> Value {
    let obj = Box::leak(Box::new(ClosureObj { env, entry }));
    unsafe { Value::from_heap_ptr(obj as *const ClosureObj as *const (), TAG_CLOSURE) }
}

/// Allocate a capture record of `len` value words, initialized to the
/// unspecified sentinel. Returns null for a zero-length record.
pub fn alloc_capture_record(len: usize) -> *mut Value {
    if len == 0 {
        return std::ptr::null_mut();
    }
    let layout = Layout::array::<Value>(len)
        .and_then(|l| l.align_to(16))
        .expect("capture record layout");
    let ptr = unsafe { std::alloc::alloc(layout) } as *mut Value;
    assert!(!ptr.is_null(), "capture record allocation failed");
    for i in 0..len {
        unsafe { ptr.add(i).write(Value::UNSPECIFIED) };
    }
    ptr
}

// =============================================================================
// Symbol
// =============================================================================

/// An interned symbol: its print name plus its global-value slot.
///
/// The slot is the global table's storage for this symbol. Its address is
/// stable for the process lifetime (symbols are interned once and leaked),
/// so generated code loads globals straight from an immediate address and
/// observes later redefinition through the same slot.
#[repr(C, align(16))]
pub struct SymbolObj {
    global: Cell<Value>,
    name: Box<str>,
}

impl SymbolObj {
    pub(crate) fn new(name: &str) -> &'static SymbolObj {
        Box::leak(Box::new(SymbolObj {
            global: Cell::new(Value::UNBOUND),
            name: name.into(),
        }))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current global value, the unbound sentinel when never defined.
    #[inline]
    pub fn global(&self) -> Value {
        self.global.get()
    }

    #[inline]
    pub fn set_global(&self, v: Value) {
        self.global.set(v);
    }

    /// Stable address of the global slot, suitable for baking into
    /// generated code.
    #[inline]
    pub fn global_slot_addr(&self) -> *mut Value {
        self.global.as_ptr()
    }

    pub(crate) fn as_value(&'static self) -> Value {
        unsafe { Value::from_heap_ptr(self as *const SymbolObj as *const (), TAG_SYMBOL) }
    }
}

// =============================================================================
// String & Vector
// =============================================================================

/// An immutable heap string.
#[repr(align(16))]
pub struct StringObj {
    text: Box<str>,
}

impl StringObj {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Allocate a string object. Strings are not interned: two equal string
/// literals are distinct objects and compare unequal under identity.
pub fn alloc_string(s: &str) -> Value {
    let obj = Box::leak(Box::new(StringObj { text: s.into() }));
    unsafe { Value::from_heap_ptr(obj as *const StringObj as *const (), TAG_STRING) }
}

/// A mutable heap vector.
#[repr(align(16))]
pub struct VectorObj {
    elements: RefCell<Vec<Value>>,
}

impl VectorObj {
    #[inline]
    pub fn elements(&self) -> &RefCell<Vec<Value>> {
        &self.elements
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }
}

/// Allocate a vector object.
pub fn alloc_vector(elements: Vec<Value>) -> Value {
    let obj = Box::leak(Box::new(VectorObj {
        elements: RefCell::new(elements),
    }));
    unsafe { Value::from_heap_ptr(obj as *const VectorObj as *const (), TAG_VECTOR) }
}

// =============================================================================
// Permanent Roots
// =============================================================================

thread_local! {
    static PERMANENT_ROOTS: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
}

/// Register a value as a permanent root: never collected, never relocated.
///
/// Required whenever a heap value's address is embedded as an immediate in
/// generated code (quoted data, heap literals); the collector does not
/// rewrite machine code.
pub fn register_permanent(v: Value) {
    if v.is_heap() {
        PERMANENT_ROOTS.with(|roots| roots.borrow_mut().push(v));
    }
}

/// Number of registered permanent roots on this thread.
pub fn permanent_root_count() -> usize {
    PERMANENT_ROOTS.with(|roots| roots.borrow().len())
}

// =============================================================================
// Tests
// =============================================================================

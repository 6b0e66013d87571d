//! Tagged value words and the heap objects behind them.

pub mod heap;
pub mod repr;

pub use heap::{
    alloc_capture_record, alloc_closure, alloc_cons, alloc_string, alloc_vector,
    permanent_root_count, register_permanent, ClosureObj, ConsCell, StringObj, SymbolObj,
    VectorObj,
};
pub use repr::{Tag, Value, FIXNUM_MAX, FIXNUM_MIN};

/// Create a cons cell (convenience function).
#[inline]
pub fn cons(car: Value, cdr: Value) -> Value {
    heap::alloc_cons(car, cdr)
}

/// Create a proper list from values.
pub fn list(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .fold(Value::NIL, |acc, v| cons(v, acc))
}

/// Reverse a proper list into a fresh list.
pub fn reverse(mut lst: Value) -> Value {
    let mut out = Value::NIL;
    while let Some(cell) = lst.as_cons() {
        out = cons(cell.car(), out);
        lst = cell.cdr();
    }
    out
}

//! Runtime support functions called from generated code.
//!
//! Every `vesper_rt_*` function is registered with the JIT by name and
//! declared as an imported function in each compiled unit that needs it.
//! They take and return raw `u64` value bits because they sit on the
//! boundary with generated machine code.
//!
//! The check helpers enforce the checked safety mode. A violation is not
//! recoverable mid-call, so they print a diagnostic and abort the process.

use crate::value::heap;
use crate::value::repr::Value;
use crate::value::{cons, reverse};

/// Entry point of every compiled lambda.
///
/// `env` points at the capture record (null when the lambda captures
/// nothing), `nargs` is the number of values in `args`.
pub type EntryFn = unsafe extern "C" fn(env: *const Value, nargs: u64, args: *const Value) -> u64;

/// Collect arguments `fixed..nargs` into a fresh list for a rest
/// parameter. Conses while walking forward, which builds the list
/// reversed, then reverses once.
///
/// # Safety
/// `args` must point at `nargs` valid value words.
#[no_mangle]
pub unsafe extern "C" fn vesper_rt_gather_rest(
    args: *const u64,
    nargs: u64,
    fixed: u64,
) -> u64 {
    let mut lst = Value::NIL;
    let mut i = fixed;
    while i < nargs {
        lst = cons(Value::from_bits(*args.add(i as usize)), lst);
        i += 1;
    }
    reverse(lst).to_bits()
}

/// Allocate a capture record of `len` value slots.
#[no_mangle]
pub extern "C" fn vesper_rt_alloc_env(len: u64) -> *mut Value {
    heap::alloc_capture_record(len as usize)
}

/// Wrap an environment pointer and entry address into a closure value.
#[no_mangle]
pub extern "C" fn vesper_rt_make_closure(env: *mut Value, entry: *const u8) -> u64 {
    heap::alloc_closure(env, entry).to_bits()
}

/// Checked-mode guard in front of every call site.
#[no_mangle]
pub extern "C" fn vesper_rt_check_closure(bits: u64) {
    let v = unsafe { Value::from_bits(bits) };
    if !v.is_closure() {
        eprintln!("fatal: attempt to call a non-closure value: {}", v);
        std::process::abort();
    }
}

/// Checked-mode arity guard for fixed-arity lambdas.
#[no_mangle]
pub extern "C" fn vesper_rt_check_arity_exact(expected: u64, got: u64) {
    if got != expected {
        eprintln!("fatal: wrong number of arguments: expected {}, got {}", expected, got);
        std::process::abort();
    }
}

/// Checked-mode arity guard for lambdas with a rest parameter.
#[no_mangle]
pub extern "C" fn vesper_rt_check_arity_min(expected: u64, got: u64) {
    if got < expected {
        eprintln!(
            "fatal: wrong number of arguments: expected at least {}, got {}",
            expected, got
        );
        std::process::abort();
    }
}

/// Invoke a closure value from host code.
///
/// # Safety
/// `f` must be a closure produced by this crate's compiler, and the
/// module that compiled it must still be alive.
pub unsafe fn call_closure(f: Value, args: &[Value]) -> Value {
    debug_assert!(f.is_closure());
    let obj = f.as_closure_unchecked();
    let entry: EntryFn = std::mem::transmute(obj.entry());
    let bits = entry(obj.env() as *const Value, args.len() as u64, args.as_ptr());
    Value::from_bits(bits)
}

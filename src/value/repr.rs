//! Low-bit tagged value representation
//!
//! Every runtime value is one machine word. Heap objects are aligned to
//! 16-byte boundaries, which frees the low 4 bits of every pointer for a
//! primary type tag:
//!
//! Fixnum:  payload << 4 | 0   (60-bit signed integer, no allocation)
//! Hitag:   secondary << 4 | 1 (bool, char, unspecified, unbound)
//! Cons:    ptr | 2            (a cons word with a null payload is `()`)
//! Obj:     ptr | 3            (boxed number / foreign object, external)
//! Closure: ptr | 4
//! Symbol:  ptr | 5
//! Vector:  ptr | 6
//! String:  ptr | 7
//!
//! With the hitag, bits 4..8 select the secondary kind and the payload
//! starts at bit 8 (bool) or bit 32 (char).
//!
//! The empty list is deliberately NOT a distinct tag: "is this a cons
//! reference" is a low-bit compare, "is this the empty list" is a
//! whole-word compare against `NIL`.

use crate::value::heap::{ClosureObj, ConsCell, StringObj, SymbolObj, VectorObj};

// =============================================================================
// Tag Constants
// =============================================================================

/// Mask covering the primary tag bits.
pub const TAG_MASK: u64 = 0xF;

pub const TAG_FIXNUM: u64 = 0;
pub const TAG_HITAG: u64 = 1;
pub const TAG_CONS: u64 = 2;
pub const TAG_OBJ: u64 = 3;
pub const TAG_CLOSURE: u64 = 4;
pub const TAG_SYMBOL: u64 = 5;
pub const TAG_VECTOR: u64 = 6;
pub const TAG_STRING: u64 = 7;

/// Secondary tag field: bits 4..8 when the primary tag is `TAG_HITAG`.
const HITAG_MASK: u64 = 0xF0;
const HITAG_BOOL: u64 = 0x10;
const HITAG_CHAR: u64 = 0x20;
const HITAG_UNSPECIFIED: u64 = 0x30;
const HITAG_UNBOUND: u64 = 0x40;

/// The empty list: a cons reference with a null payload.
pub const VAL_NIL: u64 = TAG_CONS;

pub const VAL_FALSE: u64 = HITAG_BOOL | TAG_HITAG;
pub const VAL_TRUE: u64 = (1 << 8) | HITAG_BOOL | TAG_HITAG;
pub const VAL_UNSPECIFIED: u64 = HITAG_UNSPECIFIED | TAG_HITAG;
pub const VAL_UNBOUND: u64 = HITAG_UNBOUND | TAG_HITAG;

/// Maximum 60-bit signed integer (2^59 - 1)
pub const FIXNUM_MAX: i64 = (1 << 59) - 1;

/// Minimum 60-bit signed integer (-2^59)
pub const FIXNUM_MIN: i64 = -(1 << 59);

// =============================================================================
// Value Struct
// =============================================================================

/// Core value type: one tagged machine word.
///
/// This is exactly 8 bytes and implements Copy. Equality is bitwise word
/// equality, i.e. *identity*: two freshly allocated cons cells holding the
/// same elements are unequal, while equal fixnums are always equal. Callers
/// must not conflate this with structural equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

// Compile-time size assertion
const _: () = assert!(std::mem::size_of::<Value>() == 8);

/// Primary classification of a value word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Fixnum,
    Bool,
    Char,
    Unspecified,
    Unbound,
    /// Cons reference; the empty list classifies as `Cons` with a null
    /// payload (check `is_nil` separately).
    Cons,
    Obj,
    Closure,
    Symbol,
    Vector,
    String,
}

impl Value {
    // =========================================================================
    // Constants
    // =========================================================================

    pub const NIL: Value = Value(VAL_NIL);
    pub const TRUE: Value = Value(VAL_TRUE);
    pub const FALSE: Value = Value(VAL_FALSE);
    pub const UNSPECIFIED: Value = Value(VAL_UNSPECIFIED);
    pub const UNBOUND: Value = Value(VAL_UNBOUND);

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a fixnum value.
    ///
    /// # Panics
    /// Debug-asserts that the integer fits the 60-bit payload.
    #[inline]
    pub fn fixnum(n: i64) -> Self {
        debug_assert!(
            (FIXNUM_MIN..=FIXNUM_MAX).contains(&n),
            "fixnum {} out of 60-bit range [{}, {}]",
            n,
            FIXNUM_MIN,
            FIXNUM_MAX
        );
        Value(((n as u64) << 4) | TAG_FIXNUM)
    }

    /// Create a fixnum, returning None when the payload does not fit.
    #[inline]
    pub fn try_fixnum(n: i64) -> Option<Self> {
        if (FIXNUM_MIN..=FIXNUM_MAX).contains(&n) {
            Some(Value(((n as u64) << 4) | TAG_FIXNUM))
        } else {
            None
        }
    }

    /// Create a boolean value.
    #[inline]
    pub fn bool(b: bool) -> Self {
        if b {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    /// Create a character value.
    #[inline]
    pub fn char(c: char) -> Self {
        Value(((c as u64) << 32) | HITAG_CHAR | TAG_HITAG)
    }

    /// Tag a 16-byte-aligned heap pointer.
    ///
    /// # Safety
    /// The pointer must be 16-byte aligned and must remain valid; the tag
    /// must be one of the heap reference tags.
    #[inline]
    pub(crate) unsafe fn from_heap_ptr(ptr: *const (), tag: u64) -> Self {
        let addr = ptr as u64;
        debug_assert!(addr & TAG_MASK == 0, "heap pointer not 16-byte aligned");
        Value(addr | tag)
    }

    // =========================================================================
    // Type Predicates
    // =========================================================================

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0 == VAL_NIL
    }

    #[inline]
    pub fn is_fixnum(&self) -> bool {
        self.0 & TAG_MASK == TAG_FIXNUM
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        self.0 == VAL_TRUE || self.0 == VAL_FALSE
    }

    #[inline]
    pub fn is_char(&self) -> bool {
        self.0 & (HITAG_MASK | TAG_MASK) == (HITAG_CHAR | TAG_HITAG)
    }

    #[inline]
    pub fn is_unspecified(&self) -> bool {
        self.0 == VAL_UNSPECIFIED
    }

    #[inline]
    pub fn is_unbound(&self) -> bool {
        self.0 == VAL_UNBOUND
    }

    /// Check for the cons reference tag. True for the empty list as well;
    /// use `is_pair` for a non-empty cons.
    #[inline]
    pub fn is_cons(&self) -> bool {
        self.0 & TAG_MASK == TAG_CONS
    }

    /// Check for a non-empty cons reference.
    #[inline]
    pub fn is_pair(&self) -> bool {
        self.is_cons() && !self.is_nil()
    }

    #[inline]
    pub fn is_closure(&self) -> bool {
        self.0 & TAG_MASK == TAG_CLOSURE
    }

    #[inline]
    pub fn is_symbol(&self) -> bool {
        self.0 & TAG_MASK == TAG_SYMBOL
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        self.0 & TAG_MASK == TAG_VECTOR
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        self.0 & TAG_MASK == TAG_STRING
    }

    /// Check whether this word carries a heap reference. The empty list does
    /// not (its payload is null).
    #[inline]
    pub fn is_heap(&self) -> bool {
        matches!(
            self.0 & TAG_MASK,
            TAG_OBJ | TAG_CLOSURE | TAG_SYMBOL | TAG_VECTOR | TAG_STRING
        ) || self.is_pair()
    }

    /// Check if this value is truthy. Only `#f` is false: the empty list,
    /// zero, and everything else are truthy.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        self.0 != VAL_FALSE
    }

    /// Classify this word into its primary variant.
    pub fn classify(&self) -> Tag {
        match self.0 & TAG_MASK {
            TAG_FIXNUM => Tag::Fixnum,
            TAG_HITAG => match self.0 & HITAG_MASK {
                HITAG_BOOL => Tag::Bool,
                HITAG_CHAR => Tag::Char,
                HITAG_UNBOUND => Tag::Unbound,
                _ => Tag::Unspecified,
            },
            TAG_CONS => Tag::Cons,
            TAG_OBJ => Tag::Obj,
            TAG_CLOSURE => Tag::Closure,
            TAG_SYMBOL => Tag::Symbol,
            TAG_VECTOR => Tag::Vector,
            _ => Tag::String,
        }
    }

    // =========================================================================
    // Unchecked Extractors
    // =========================================================================
    //
    // The unchecked path is the one generated code and hot runtime helpers
    // use; a tag mismatch is undefined behavior. The checked wrappers below
    // are for diagnostics and host-side code.

    /// # Safety
    /// The value must be a fixnum.
    #[inline]
    pub unsafe fn as_fixnum_unchecked(self) -> i64 {
        (self.0 as i64) >> 4
    }

    /// Strip the tag bits, leaving the heap address.
    #[inline]
    pub(crate) fn untagged(self) -> u64 {
        self.0 & !TAG_MASK
    }

    /// # Safety
    /// The value must be a non-empty cons reference.
    #[inline]
    pub unsafe fn as_cons_unchecked(self) -> &'static ConsCell {
        &*(self.untagged() as *const ConsCell)
    }

    /// # Safety
    /// The value must be a closure reference.
    #[inline]
    pub unsafe fn as_closure_unchecked(self) -> &'static ClosureObj {
        &*(self.untagged() as *const ClosureObj)
    }

    /// # Safety
    /// The value must be a symbol reference.
    #[inline]
    pub unsafe fn as_symbol_unchecked(self) -> &'static SymbolObj {
        &*(self.untagged() as *const SymbolObj)
    }

    /// # Safety
    /// The value must be a string reference.
    #[inline]
    pub unsafe fn as_string_unchecked(self) -> &'static StringObj {
        &*(self.untagged() as *const StringObj)
    }

    /// # Safety
    /// The value must be a vector reference.
    #[inline]
    pub unsafe fn as_vector_unchecked(self) -> &'static VectorObj {
        &*(self.untagged() as *const VectorObj)
    }

    // =========================================================================
    // Checked Extractors
    // =========================================================================

    #[inline]
    pub fn as_fixnum(&self) -> Option<i64> {
        if self.is_fixnum() {
            Some(unsafe { self.as_fixnum_unchecked() })
        } else {
            None
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.0 {
            VAL_TRUE => Some(true),
            VAL_FALSE => Some(false),
            _ => None,
        }
    }

    #[inline]
    pub fn as_char(&self) -> Option<char> {
        if self.is_char() {
            char::from_u32((self.0 >> 32) as u32)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_cons(&self) -> Option<&'static ConsCell> {
        if self.is_pair() {
            Some(unsafe { self.as_cons_unchecked() })
        } else {
            None
        }
    }

    #[inline]
    pub fn as_closure(&self) -> Option<&'static ClosureObj> {
        if self.is_closure() {
            Some(unsafe { self.as_closure_unchecked() })
        } else {
            None
        }
    }

    #[inline]
    pub fn as_symbol(&self) -> Option<&'static SymbolObj> {
        if self.is_symbol() {
            Some(unsafe { self.as_symbol_unchecked() })
        } else {
            None
        }
    }

    #[inline]
    pub fn as_string(&self) -> Option<&'static str> {
        if self.is_string() {
            Some(unsafe { self.as_string_unchecked() }.text())
        } else {
            None
        }
    }

    #[inline]
    pub fn as_vector(&self) -> Option<&'static VectorObj> {
        if self.is_vector() {
            Some(unsafe { self.as_vector_unchecked() })
        } else {
            None
        }
    }

    // =========================================================================
    // Raw Bits
    // =========================================================================

    /// Get the raw word. These bits are what generated code traffics in.
    #[inline]
    pub fn to_bits(&self) -> u64 {
        self.0
    }

    /// Reconstruct a value from raw bits.
    ///
    /// # Safety
    /// The bits must be a valid Value encoding.
    #[inline]
    pub unsafe fn from_bits(bits: u64) -> Self {
        Value(bits)
    }

    /// Check if this value is a proper list.
    pub fn is_list(&self) -> bool {
        let mut current = *self;
        loop {
            if current.is_nil() {
                return true;
            }
            match current.as_cons() {
                Some(cell) => current = cell.cdr(),
                None => return false,
            }
        }
    }

    /// Convert a proper list to a Vec, `None` for improper lists.
    pub fn list_to_vec(&self) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = *self;
        loop {
            if current.is_nil() {
                return Some(result);
            }
            let cell = current.as_cons()?;
            result.push(cell.car());
            current = cell.cdr();
        }
    }

    /// Get a human-readable type name.
    pub fn type_name(&self) -> &'static str {
        if self.is_nil() {
            return "nil";
        }
        match self.classify() {
            Tag::Fixnum => "fixnum",
            Tag::Bool => "boolean",
            Tag::Char => "char",
            Tag::Unspecified => "unspecified",
            Tag::Unbound => "unbound",
            Tag::Cons => "pair",
            Tag::Obj => "object",
            Tag::Closure => "closure",
            Tag::Symbol => "symbol",
            Tag::Vector => "vector",
            Tag::String => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_nil() {
            return write!(f, "()");
        }
        match self.classify() {
            Tag::Fixnum => write!(f, "{}", unsafe { self.as_fixnum_unchecked() }),
            Tag::Bool => write!(f, "{}", if *self == Value::TRUE { "#t" } else { "#f" }),
            Tag::Char => match self.as_char() {
                Some(c) => write!(f, "#\\{}", c),
                None => write!(f, "#\\?"),
            },
            Tag::Unspecified => write!(f, "#<unspecified>"),
            Tag::Unbound => write!(f, "#<unbound>"),
            Tag::Cons => {
                write!(f, "(")?;
                let mut current = *self;
                loop {
                    let cell = unsafe { current.as_cons_unchecked() };
                    write!(f, "{}", cell.car())?;
                    let rest = cell.cdr();
                    if rest.is_nil() {
                        break;
                    } else if rest.is_pair() {
                        write!(f, " ")?;
                        current = rest;
                    } else {
                        write!(f, " . {}", rest)?;
                        break;
                    }
                }
                write!(f, ")")
            }
            Tag::Obj => write!(f, "#<object>"),
            Tag::Closure => write!(f, "#<closure>"),
            Tag::Symbol => write!(f, "{}", unsafe { self.as_symbol_unchecked() }.name()),
            Tag::Vector => {
                let vec = unsafe { self.as_vector_unchecked() };
                write!(f, "#(")?;
                for (i, v) in vec.elements().borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Tag::String => write!(f, "\"{}\"", unsafe { self.as_string_unchecked() }.text()),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

// =============================================================================
// Tests
// =============================================================================

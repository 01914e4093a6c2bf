//! Tagged values crossing the native/script boundary.
//!
//! ## Memory management model
//!
//! Heap-backed variants (`String`, `List`, `Table`, `Object`, `Function`) are
//! `Rc`-backed, so cloning a `Value` is a reference-count bump and dropping
//! the last clone is the final release. An owned [`NativeObject`] runs its
//! binding's deinit hook at that final release, exactly once; borrowed
//! objects never run it. There is no cycle collector: script-visible values
//! must stay acyclic, which holds because bound objects only point down into
//! core-owned state, never back at containers that hold them.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::script::{
    binding::BoundMethod, object::NativeObject, table::Table, weakref::WeakHandle,
};

/// Type tag used by binding descriptors to declare parameter and return
/// types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TypeTag {
    /// 8-bit signed integer.
    S8,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit signed integer.
    S16,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit signed integer.
    S32,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit signed integer.
    S64,
    /// 64-bit unsigned integer.
    U64,
    /// 64-bit float.
    F64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Opaque bound native struct.
    Object,
    /// Ordered heterogeneous list.
    List,
    /// Ordered key/value table.
    Table,
    /// Weak reference handle into a context's arena.
    WeakRef,
    /// Callable bound method.
    Function,
    /// No value.
    Void,
}

impl TypeTag {
    /// Stable, script-visible name of the tag.
    pub fn name(self) -> &'static str {
        match self {
            Self::S8 => "s8",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::U16 => "u16",
            Self::S32 => "s32",
            Self::U32 => "u32",
            Self::S64 => "s64",
            Self::U64 => "u64",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Object => "object",
            Self::List => "list",
            Self::Table => "table",
            Self::WeakRef => "weakref",
            Self::Function => "function",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged value that can cross the native/script boundary losslessly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 8-bit signed integer.
    S8(i8),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit signed integer.
    S16(i16),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit signed integer.
    S32(i32),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit signed integer.
    S64(i64),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 64-bit float.
    F64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    String(Rc<str>),
    /// Opaque handle to a bound native struct.
    Object(NativeObject),
    /// Ordered heterogeneous list.
    List(Rc<RefCell<Vec<Value>>>),
    /// Ordered key/value table.
    Table(Rc<RefCell<Table>>),
    /// Weak reference handle; dereference through the owning context.
    WeakRef(WeakHandle),
    /// Method bound to a specific object, callable from scripts.
    Function(Rc<BoundMethod>),
    /// No value.
    Void,
}

impl Value {
    /// Returns the tag of this value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::S8(_) => TypeTag::S8,
            Self::U8(_) => TypeTag::U8,
            Self::S16(_) => TypeTag::S16,
            Self::U16(_) => TypeTag::U16,
            Self::S32(_) => TypeTag::S32,
            Self::U32(_) => TypeTag::U32,
            Self::S64(_) => TypeTag::S64,
            Self::U64(_) => TypeTag::U64,
            Self::F64(_) => TypeTag::F64,
            Self::Bool(_) => TypeTag::Bool,
            Self::String(_) => TypeTag::String,
            Self::Object(_) => TypeTag::Object,
            Self::List(_) => TypeTag::List,
            Self::Table(_) => TypeTag::Table,
            Self::WeakRef(_) => TypeTag::WeakRef,
            Self::Function(_) => TypeTag::Function,
            Self::Void => TypeTag::Void,
        }
    }

    /// Returns the script-visible name of this value's type.
    pub fn type_name(&self) -> &'static str {
        self.type_tag().name()
    }

    /// Allocates the zero value of a tag.
    ///
    /// Handle tags (`Object`, `WeakRef`, `Function`) have no zero value and
    /// yield `None`; those are only produced by binding or context
    /// operations.
    pub fn zeroed(tag: TypeTag) -> Option<Self> {
        match tag {
            TypeTag::S8 => Some(Self::S8(0)),
            TypeTag::U8 => Some(Self::U8(0)),
            TypeTag::S16 => Some(Self::S16(0)),
            TypeTag::U16 => Some(Self::U16(0)),
            TypeTag::S32 => Some(Self::S32(0)),
            TypeTag::U32 => Some(Self::U32(0)),
            TypeTag::S64 => Some(Self::S64(0)),
            TypeTag::U64 => Some(Self::U64(0)),
            TypeTag::F64 => Some(Self::F64(0.0)),
            TypeTag::Bool => Some(Self::Bool(false)),
            TypeTag::String => Some(Self::String("".into())),
            TypeTag::List => Some(Self::List(Rc::new(RefCell::new(Vec::new())))),
            TypeTag::Table => Some(Self::Table(Rc::new(RefCell::new(Table::new())))),
            TypeTag::Void => Some(Self::Void),
            TypeTag::Object | TypeTag::WeakRef | TypeTag::Function => None,
        }
    }

    /// Returns the integer content of an integer variant, widened.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::S8(v) => Some(i128::from(*v)),
            Self::U8(v) => Some(i128::from(*v)),
            Self::S16(v) => Some(i128::from(*v)),
            Self::U16(v) => Some(i128::from(*v)),
            Self::S32(v) => Some(i128::from(*v)),
            Self::U32(v) => Some(i128::from(*v)),
            Self::S64(v) => Some(i128::from(*v)),
            Self::U64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Coerces this value to the declared tag, or `None` when the value does
    /// not fit.
    ///
    /// Integers convert between widths when the content is in range; `F64`
    /// additionally accepts any integer. Nothing else converts.
    pub fn coerce(&self, tag: TypeTag) -> Option<Self> {
        if self.type_tag() == tag {
            return Some(self.clone());
        }
        let int = self.as_integer();
        match (tag, int) {
            (TypeTag::S8, Some(v)) => i8::try_from(v).ok().map(Self::S8),
            (TypeTag::U8, Some(v)) => u8::try_from(v).ok().map(Self::U8),
            (TypeTag::S16, Some(v)) => i16::try_from(v).ok().map(Self::S16),
            (TypeTag::U16, Some(v)) => u16::try_from(v).ok().map(Self::U16),
            (TypeTag::S32, Some(v)) => i32::try_from(v).ok().map(Self::S32),
            (TypeTag::U32, Some(v)) => u32::try_from(v).ok().map(Self::U32),
            (TypeTag::S64, Some(v)) => i64::try_from(v).ok().map(Self::S64),
            (TypeTag::U64, Some(v)) => u64::try_from(v).ok().map(Self::U64),
            (TypeTag::F64, Some(v)) => Some(Self::F64(v as f64)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S8(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::S16(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::S32(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::S64(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "\"{}\"", v),
            Self::Object(obj) => write!(f, "<{}>", obj.type_name()),
            Self::List(elements) => {
                let items: Vec<String> =
                    elements.borrow().iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Table(table) => write!(f, "{}", table.borrow()),
            Self::WeakRef(handle) => {
                write!(f, "<weakref {}:{}>", handle.slot(), handle.generation())
            }
            Self::Function(method) => write!(f, "<method {}>", method.method()),
            Self::Void => write!(f, "void"),
        }
    }
}

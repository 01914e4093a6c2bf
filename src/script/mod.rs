//! Engine-agnostic scripting layer: typed values, struct bindings, the
//! per-session context, and the multi-engine registry.

pub mod binding;
pub mod context;
pub mod engine;
pub mod error;
pub mod object;
pub mod table;
pub mod value;
pub mod weakref;

pub use binding::{BindingBuilder, BindingRegistry, BoundMethod, ConstValue, Param};
pub use context::ScriptContext;
pub use engine::{Debugger, DebuggerInfo, DebuggerReason, ScriptBridge, ScriptEngine};
pub use error::ScriptError;
pub use object::NativeObject;
pub use table::{Table, TableKey};
pub use value::{TypeTag, Value};
pub use weakref::WeakHandle;

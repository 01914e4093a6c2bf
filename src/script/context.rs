//! Per-session script execution context.
//!
//! A context owns the script-visible root namespace and the weak-reference
//! arena. It is explicit per-session state: created empty, mutated only
//! through the attach/detach operations, destroyed with the session. Nothing
//! here is ambient or process-wide.

use crate::script::{
    binding::BindingRegistry,
    error::ScriptError,
    table::{Table, TableKey},
    value::Value,
    weakref::{WeakHandle, WeakTable},
};

/// Reserved global name of the attached core adapter.
pub const GLOBAL_EMU: &str = "emu";
/// Reserved global name of the logger sink.
pub const GLOBAL_CONSOLE: &str = "console";
/// Reserved global name of the UI library.
pub const GLOBAL_UI: &str = "ui";

/// The per-session environment scripts execute against.
#[derive(Debug, Default)]
pub struct ScriptContext {
    globals: Table,
    weakrefs: WeakTable,
}

impl ScriptContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces a named entry in the root namespace.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(TableKey::str(name), value);
    }

    /// Looks up a named entry in the root namespace.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(&TableKey::str(name)).cloned()
    }

    /// Returns the existing entry when it is already an object of the
    /// expected type; otherwise installs and returns a freshly constructed
    /// one.
    pub fn ensure_global(
        &mut self,
        name: &str,
        type_name: &'static str,
    ) -> Result<Value, ScriptError> {
        if let Some(Value::Object(obj)) = self.get_global(name) {
            if obj.type_name() == type_name {
                return Ok(Value::Object(obj));
            }
        }
        let fresh = Value::Object(BindingRegistry::global().construct(type_name)?);
        self.set_global(name, fresh.clone());
        Ok(fresh)
    }

    /// Deletes a named entry. Dropping the entry releases it; an owned
    /// object whose last handle this was runs its deinit hook here.
    pub fn remove_global(&mut self, name: &str) -> bool {
        self.globals.remove(&TableKey::str(name)).is_some()
    }

    /// Iterates the root namespace in insertion order.
    pub fn globals(&self) -> impl Iterator<Item = (&TableKey, &Value)> {
        self.globals.iter()
    }

    /// Registers `value` for indirect access and returns its handle.
    pub fn make_weak(&mut self, value: Value) -> WeakHandle {
        self.weakrefs.insert(value)
    }

    /// Invalidates a weak handle. The referenced value is released;
    /// clearing an already-invalid handle is a no-op.
    pub fn clear_weak(&mut self, handle: WeakHandle) -> bool {
        self.weakrefs.clear(handle)
    }

    /// Dereferences a weak handle. Invalidated handles resolve to `None`.
    pub fn access_weak(&self, handle: WeakHandle) -> Option<Value> {
        self.weakrefs.get(handle).cloned()
    }

    /// Dereferences a weak handle the caller requires to be live.
    /// Invalidated handles are an error rather than an absent value.
    pub fn expect_weak(&self, handle: WeakHandle) -> Result<Value, ScriptError> {
        self.access_weak(handle)
            .ok_or(ScriptError::InvalidWeakReference {
                slot: handle.slot(),
                generation: handle.generation(),
            })
    }

    /// Number of live weak-reference entries.
    pub fn live_weak_count(&self) -> usize {
        self.weakrefs.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove_global() {
        let mut ctx = ScriptContext::new();
        ctx.set_global("answer", Value::S32(42));
        assert_eq!(ctx.get_global("answer"), Some(Value::S32(42)));
        ctx.set_global("answer", Value::S32(43));
        assert_eq!(ctx.get_global("answer"), Some(Value::S32(43)));
        assert!(ctx.remove_global("answer"));
        assert!(!ctx.remove_global("answer"));
        assert_eq!(ctx.get_global("answer"), None);
    }

    #[test]
    fn test_weak_roundtrip_through_context() {
        let mut ctx = ScriptContext::new();
        let handle = ctx.make_weak(Value::String("rom".into()));
        assert_eq!(ctx.access_weak(handle), Some(Value::String("rom".into())));
        assert!(ctx.clear_weak(handle));
        assert_eq!(ctx.access_weak(handle), None);
        assert!(!ctx.clear_weak(handle));
    }

    #[test]
    fn test_expect_weak_reports_stale_handle() {
        let mut ctx = ScriptContext::new();
        let handle = ctx.make_weak(Value::S32(1));
        assert_eq!(ctx.expect_weak(handle), Ok(Value::S32(1)));
        ctx.clear_weak(handle);
        assert_eq!(
            ctx.expect_weak(handle),
            Err(ScriptError::InvalidWeakReference {
                slot: handle.slot(),
                generation: handle.generation(),
            })
        );
    }

    #[test]
    fn test_globals_iteration_order() {
        let mut ctx = ScriptContext::new();
        ctx.set_global("emu", Value::Void);
        ctx.set_global("console", Value::Void);
        let names: Vec<String> = ctx.globals().map(|(k, _)| k.to_string()).collect();
        assert_eq!(names, vec!["\"emu\"", "\"console\""]);
    }
}

//! Bridge error taxonomy.
//!
//! Every failure a script can observe is a value of [`ScriptError`]. Binding
//! dispatch errors are reported back to the invoking script as catchable
//! failures, never as panics.

/// Errors surfaced by the scripting bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    /// Name lookup on a bound object found neither a method nor a field.
    #[error("no method or field named `{name}` on `{type_name}`")]
    NoSuchMethodOrField {
        /// Bound type the lookup was performed on.
        type_name: &'static str,
        /// The name that failed to resolve.
        name: String,
    },

    /// A bound call received the wrong number of arguments, or an argument
    /// that does not fit its declared type tag.
    #[error("bad arguments to `{type_name}.{method}`: {detail}")]
    ArityOrTypeMismatch {
        /// Bound type the method belongs to.
        type_name: &'static str,
        /// Method being invoked.
        method: &'static str,
        /// Human-readable description of the mismatch.
        detail: String,
    },

    /// A script resource could not be opened or read.
    #[error("cannot open script resource `{name}`: {reason}")]
    ResourceUnopenable {
        /// Resource name as given to the registry.
        name: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// Every installed engine was offered the resource and none both
    /// recognized and loaded it.
    #[error("no installed engine claimed `{name}`")]
    NoEngineClaimedResource {
        /// Resource name as given to the registry.
        name: String,
    },

    /// No installed engine could resolve the symbol.
    #[error("symbol `{name}` not found in any installed engine")]
    SymbolNotFound {
        /// The symbol that was looked up.
        name: String,
    },

    /// A weak reference was dereferenced after invalidation. Plain reads
    /// resolve to absent instead; this only surfaces when a caller insisted
    /// on the value.
    #[error("weak reference {slot}:{generation} is no longer valid")]
    InvalidWeakReference {
        /// Arena slot the handle pointed at.
        slot: u32,
        /// Generation the handle was issued with.
        generation: u32,
    },

    /// A type name was used that has never been registered with the binding
    /// registry, or has no default constructor where one is required.
    #[error("type `{type_name}` is not registered or not constructible")]
    UnknownType {
        /// The offending type name.
        type_name: String,
    },
}

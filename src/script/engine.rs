//! Script-engine plugins and the multi-engine registry.
//!
//! The bridge is engine-agnostic: any number of independently implemented
//! engines can be installed, and lifecycle/debugger events are broadcast to
//! all of them. Engines are kept in registration order, and that order is
//! the documented iteration order; engines must still not depend on their
//! position relative to each other.

use std::{cell::RefCell, fs, rc::Rc};

use crate::script::error::ScriptError;

/// Why a debugger halted execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerReason {
    /// Halted by explicit user request.
    Manual,
    /// Halted because a debugger was attached.
    Attached,
    /// A breakpoint was hit.
    Breakpoint,
    /// A watchpoint was hit.
    Watchpoint,
    /// An illegal opcode was executed.
    IllegalOp,
}

/// Context delivered with a debugger-stop broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebuggerInfo {
    /// Address execution halted at.
    pub address: u32,
    /// Memory segment of `address`, where segmentation applies.
    pub segment: i32,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

/// Contract every pluggable script engine implements.
///
/// All callbacks run synchronously on the thread driving the emulated core;
/// an engine must return before the core advances. Bounding long-running
/// script loops (step limits and the like) is the engine's own
/// responsibility.
pub trait ScriptEngine {
    /// One-time initialization with a reference back to the registry.
    /// Returning `false` declines installation and the engine is discarded.
    fn init(&mut self, bridge: &ScriptBridge) -> bool;

    /// Name the engine registers under.
    fn name(&self) -> &str;

    /// Whether this engine recognizes the resource as one of its scripts.
    fn is_script(&self, name: &str, source: &[u8]) -> bool;

    /// Loads a recognized script. Returning `false` lets other engines try.
    fn load_script(&mut self, name: &str, source: &[u8]) -> bool;

    /// Per-frame/per-tick execution signal.
    fn run(&mut self);

    /// Resolves a script-defined symbol to a value.
    fn lookup_symbol(&self, name: &str) -> Option<i32>;

    /// Debugger-stop broadcast. Optional; the default ignores it.
    fn debugger_entered(&mut self, _reason: DebuggerReason, _info: &DebuggerInfo) {}

    /// Teardown hook, run exactly once per installed engine: when another
    /// engine replaces it under the same name, and for every remaining
    /// engine when the registry is dropped. Optional; the default ignores
    /// it.
    fn deinit(&mut self) {}
}

/// A debugger component that can be attached to the registry.
///
/// Attach/detach keep the mutual relationship consistent in both
/// directions: the bridge holds at most one debugger, and the debugger is
/// always told when it gains or loses that slot.
pub trait Debugger {
    /// Called when this debugger takes the registry's debugger slot.
    fn attached(&mut self);

    /// Called when this debugger loses the registry's debugger slot.
    fn detached(&mut self);
}

/// Registry of installed script engines plus the optional debugger slot.
#[derive(Default)]
pub struct ScriptBridge {
    engines: Vec<Box<dyn ScriptEngine>>,
    debugger: Option<Rc<RefCell<dyn Debugger>>>,
}

impl ScriptBridge {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an engine. The engine's `init` runs first; if it declines,
    /// the engine is discarded and `false` is returned. Installing a second
    /// engine under an already-taken name deinitializes the prior one and
    /// replaces it in place.
    pub fn install(&mut self, mut engine: Box<dyn ScriptEngine>) -> bool {
        if !engine.init(self) {
            log::warn!(target: "script", "engine `{}` declined init, discarding", engine.name());
            return false;
        }
        let name = engine.name().to_owned();
        if let Some(pos) = self.engines.iter().position(|e| e.name() == name) {
            self.engines[pos].deinit();
            self.engines[pos] = engine;
        } else {
            self.engines.push(engine);
        }
        true
    }

    /// Names of the installed engines, in registration order.
    pub fn engine_names(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_owned()).collect()
    }

    /// Number of installed engines.
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Broadcasts the per-frame execution signal to every engine.
    pub fn run(&mut self) {
        for engine in &mut self.engines {
            engine.run();
        }
    }

    /// Opens the named resource and offers it to the installed engines.
    ///
    /// Loading is a bounded, synchronous open-read-close; the contents are
    /// read once and every probe sees the same bytes.
    pub fn load_script(&mut self, name: &str) -> Result<(), ScriptError> {
        let source = fs::read(name).map_err(|err| ScriptError::ResourceUnopenable {
            name: name.to_owned(),
            reason: err.to_string(),
        })?;
        self.load_script_source(name, &source)
    }

    /// Offers an already-read resource to the installed engines.
    ///
    /// Claim rule, preserved from the original bridge: engines are probed in
    /// order until one both recognizes and successfully loads the resource.
    /// An engine that recognizes it but fails to load does not stop later
    /// engines from being probed; after a successful claim no further engine
    /// is invoked.
    pub fn load_script_source(&mut self, name: &str, source: &[u8]) -> Result<(), ScriptError> {
        let mut claimed = false;
        for engine in &mut self.engines {
            if !claimed && engine.is_script(name, source) {
                claimed = engine.load_script(name, source);
            }
        }
        if claimed {
            Ok(())
        } else {
            log::warn!(target: "script", "no engine claimed `{}`", name);
            Err(ScriptError::NoEngineClaimedResource {
                name: name.to_owned(),
            })
        }
    }

    /// Asks each engine in turn for a symbol; the first success wins.
    pub fn lookup_symbol(&self, name: &str) -> Result<i32, ScriptError> {
        let mut found = None;
        for engine in &self.engines {
            if found.is_none() {
                found = engine.lookup_symbol(name);
            }
        }
        found.ok_or_else(|| ScriptError::SymbolNotFound {
            name: name.to_owned(),
        })
    }

    /// Broadcasts a debugger-stop event to every engine. The caller
    /// guarantees the core is suspended for the duration, so the state the
    /// engines observe is stable.
    pub fn debugger_entered(&mut self, reason: DebuggerReason, info: &DebuggerInfo) {
        for engine in &mut self.engines {
            engine.debugger_entered(reason, info);
        }
    }

    /// Attaches a debugger, detaching any previously attached one first.
    /// Re-attaching the current debugger is a no-op.
    pub fn attach_debugger(&mut self, debugger: Rc<RefCell<dyn Debugger>>) {
        if let Some(current) = &self.debugger {
            if Rc::ptr_eq(current, &debugger) {
                return;
            }
        }
        self.detach_debugger();
        debugger.borrow_mut().attached();
        self.debugger = Some(debugger);
    }

    /// Detaches the current debugger, if any.
    pub fn detach_debugger(&mut self) {
        if let Some(debugger) = self.debugger.take() {
            debugger.borrow_mut().detached();
        }
    }

    /// The currently attached debugger.
    pub fn debugger(&self) -> Option<Rc<RefCell<dyn Debugger>>> {
        self.debugger.clone()
    }
}

impl Drop for ScriptBridge {
    fn drop(&mut self) {
        for engine in &mut self.engines {
            engine.deinit();
        }
    }
}

//! corescript: the scripting bridge of a hardware-emulation engine.
//!
//! Lets independently implemented script engines observe and control a
//! running emulated machine (registers, segmented memory, savestates, a
//! debugger, and a text-console UI) through one engine-agnostic,
//! introspectable object model.
//!
//! The [`script`] module is the engine-agnostic half: tagged values, the
//! declarative binding layer, the per-session context with its weak
//! reference arena, and the multi-engine registry. The [`emu`] module binds
//! an emulated core into that model: the core adapter published as the
//! `emu` global, segment-aware memory translators, and the `console`/`ui`
//! globals.

pub mod emu;
pub mod script;

pub use script::error::ScriptError;

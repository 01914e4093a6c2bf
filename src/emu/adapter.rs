//! Republishes an emulated core into the script namespace.
//!
//! The adapter is the global `emu` object. It synthesizes a `memory` table
//! of weakly-referenced [`MemoryTranslator`]s keyed by block name, and
//! forwards every other name to the core's own bound surface, so scripts
//! call core operations directly on `emu`.
//!
//! The memory map is rebuilt whenever the core reports changed geometry
//! (media insert/swap). Rebuilding invalidates every existing weak handle
//! first, so script-held handles observe absence, never stale translators.

use std::{cell::RefCell, rc::Rc};

use crate::emu::memory;
use crate::emu::{SaveStateFlags, SharedCore};
use crate::script::{
    BindingBuilder, BindingRegistry, ConstValue, NativeObject, Param, ScriptContext, ScriptError,
    Table, TableKey, TypeTag, Value,
    binding::Call,
    context::GLOBAL_EMU,
};

pub(crate) const CORE_TYPE: &str = "Core";
pub(crate) const CORE_ADAPTER_TYPE: &str = "CoreAdapter";

/// The bound object scripts reach through the `emu` global.
pub struct CoreAdapter {
    core: SharedCore,
    memory: Rc<RefCell<Table>>,
}

impl CoreAdapter {
    fn new(core: SharedCore) -> Self {
        Self {
            core,
            memory: Rc::new(RefCell::new(Table::new())),
        }
    }

    /// The adapter's memory-map table: block name to weak translator
    /// reference.
    pub fn memory(&self) -> Rc<RefCell<Table>> {
        self.memory.clone()
    }
}

fn core_object(core: &SharedCore) -> NativeObject {
    ensure_core_binding();
    NativeObject::owned(CORE_TYPE, core.clone())
}

fn this_core<'a>(call: &'a Call<'_>) -> Result<&'a SharedCore, ScriptError> {
    call.this::<SharedCore>()
}

fn core_platform(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::S32(this_core(call)?.borrow().platform()))
}

fn core_current_frame(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this_core(call)?.borrow().frame_counter()))
}

fn core_frame_cycles(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::S32(this_core(call)?.borrow().frame_cycles()))
}

fn core_frequency(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::S32(this_core(call)?.borrow().frequency()))
}

fn core_game_title(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::String(this_core(call)?.borrow().game_title().into()))
}

fn core_game_code(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::String(this_core(call)?.borrow().game_code().into()))
}

fn core_run_frame(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?.borrow_mut().run_frame();
    Ok(Value::Void)
}

fn core_step(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?.borrow_mut().step();
    Ok(Value::Void)
}

fn core_set_keys(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?.borrow_mut().set_keys(call.arg_u32(0)?);
    Ok(Value::Void)
}

fn core_add_keys(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?.borrow_mut().add_keys(call.arg_u32(0)?);
    Ok(Value::Void)
}

fn core_clear_keys(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?.borrow_mut().clear_keys(call.arg_u32(0)?);
    Ok(Value::Void)
}

fn core_get_keys(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this_core(call)?.borrow().get_keys()))
}

fn core_read8(call: &Call<'_>) -> Result<Value, ScriptError> {
    let value = this_core(call)?.borrow_mut().bus_read8(call.arg_u32(0)?);
    Ok(Value::U32(u32::from(value)))
}

fn core_read16(call: &Call<'_>) -> Result<Value, ScriptError> {
    let value = this_core(call)?.borrow_mut().bus_read16(call.arg_u32(0)?);
    Ok(Value::U32(u32::from(value)))
}

fn core_read32(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(
        this_core(call)?.borrow_mut().bus_read32(call.arg_u32(0)?),
    ))
}

fn core_read_range(call: &Call<'_>) -> Result<Value, ScriptError> {
    let core = this_core(call)?;
    let address = call.arg_u32(0)?;
    let length = call.arg_u32(1)?;
    let mut core = core.borrow_mut();
    let bytes: Vec<Value> = (0..length)
        .map(|offset| Value::U8(core.bus_read8(address.wrapping_add(offset))))
        .collect();
    Ok(Value::List(Rc::new(bytes.into())))
}

fn core_write8(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?
        .borrow_mut()
        .bus_write8(call.arg_u32(0)?, call.arg_u8(1)?);
    Ok(Value::Void)
}

fn core_write16(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?
        .borrow_mut()
        .bus_write16(call.arg_u32(0)?, call.arg_u16(1)?);
    Ok(Value::Void)
}

fn core_write32(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?
        .borrow_mut()
        .bus_write32(call.arg_u32(0)?, call.arg_u32(1)?);
    Ok(Value::Void)
}

fn core_read_register(call: &Call<'_>) -> Result<Value, ScriptError> {
    let name = call.arg_str(0)?;
    match this_core(call)?.borrow().read_register(&name) {
        Some(value) => Ok(Value::S32(value)),
        None => Ok(Value::Void),
    }
}

fn core_write_register(call: &Call<'_>) -> Result<Value, ScriptError> {
    let name = call.arg_str(0)?;
    this_core(call)?
        .borrow_mut()
        .write_register(&name, call.arg_i32(1)?);
    Ok(Value::Void)
}

fn core_save_state_slot(call: &Call<'_>) -> Result<Value, ScriptError> {
    let slot = call.arg_i32(0)?;
    let flags = SaveStateFlags::from_bits(call.arg_i32(1)? as u32);
    Ok(Value::Bool(
        this_core(call)?.borrow_mut().save_state(slot, flags),
    ))
}

fn core_load_state_slot(call: &Call<'_>) -> Result<Value, ScriptError> {
    let slot = call.arg_i32(0)?;
    let flags = SaveStateFlags::from_bits(call.arg_i32(1)? as u32);
    Ok(Value::Bool(
        this_core(call)?.borrow_mut().load_state(slot, flags),
    ))
}

fn core_screenshot(call: &Call<'_>) -> Result<Value, ScriptError> {
    this_core(call)?.borrow_mut().take_screenshot();
    Ok(Value::Void)
}

fn ensure_core_binding() {
    BindingRegistry::global().register_if_absent(CORE_TYPE, || {
        let address = || Param::required("address", TypeTag::U32);
        BindingBuilder::new(CORE_TYPE)
            .doc("Get which platform is being emulated")
            .method("platform", vec![], core_platform)
            .doc("Get the number of the current frame")
            .method("currentFrame", vec![], core_current_frame)
            .doc("Get the number of cycles per frame")
            .method("frameCycles", vec![], core_frame_cycles)
            .doc("Get the number of cycles per second")
            .method("frequency", vec![], core_frequency)
            .doc("Get internal title of the game from the ROM header")
            .method("getGameTitle", vec![], core_game_title)
            .doc("Get internal product code for the game from the ROM header")
            .method("getGameCode", vec![], core_game_code)
            .doc("Run until the next frame")
            .method("runFrame", vec![], core_run_frame)
            .doc("Run a single instruction")
            .method("step", vec![], core_step)
            .doc("Set the currently active keys")
            .method(
                "setKeys",
                vec![Param::required("keys", TypeTag::U32)],
                core_set_keys,
            )
            .doc("Add keys to the currently active key list")
            .method(
                "addKeys",
                vec![Param::required("keys", TypeTag::U32)],
                core_add_keys,
            )
            .doc("Remove keys from the currently active key list")
            .method(
                "clearKeys",
                vec![Param::required("keys", TypeTag::U32)],
                core_clear_keys,
            )
            .doc("Get the currently active keys")
            .method("getKeys", vec![], core_get_keys)
            .doc("Read an 8-bit value from the given bus address")
            .method("read8", vec![address()], core_read8)
            .doc("Read a 16-bit value from the given bus address")
            .method("read16", vec![address()], core_read16)
            .doc("Read a 32-bit value from the given bus address")
            .method("read32", vec![address()], core_read32)
            .doc("Read byte range from the given offset")
            .method(
                "readRange",
                vec![address(), Param::required("length", TypeTag::U32)],
                core_read_range,
            )
            .doc("Write an 8-bit value to the given bus address")
            .method(
                "write8",
                vec![address(), Param::required("value", TypeTag::U8)],
                core_write8,
            )
            .doc("Write a 16-bit value to the given bus address")
            .method(
                "write16",
                vec![address(), Param::required("value", TypeTag::U16)],
                core_write16,
            )
            .doc("Write a 32-bit value to the given bus address")
            .method(
                "write32",
                vec![address(), Param::required("value", TypeTag::U32)],
                core_write32,
            )
            .doc("Read the value of the register with the given name")
            .method(
                "readRegister",
                vec![Param::required("regName", TypeTag::String)],
                core_read_register,
            )
            .doc("Write the value of the register with the given name")
            .method(
                "writeRegister",
                vec![
                    Param::required("regName", TypeTag::String),
                    Param::required("value", TypeTag::S32),
                ],
                core_write_register,
            )
            .doc("Save state to the slot number")
            .method(
                "saveStateSlot",
                vec![
                    Param::required("slot", TypeTag::S32),
                    Param::defaulted(
                        "flags",
                        TypeTag::S32,
                        ConstValue::S32(SaveStateFlags::save_default().bits() as i32),
                    ),
                ],
                core_save_state_slot,
            )
            .doc("Load state from the slot number")
            .method(
                "loadStateSlot",
                vec![
                    Param::required("slot", TypeTag::S32),
                    Param::defaulted(
                        "flags",
                        TypeTag::S32,
                        ConstValue::S32(SaveStateFlags::load_default().bits() as i32),
                    ),
                ],
                core_load_state_slot,
            )
            .doc("Save a screenshot")
            .method("screenshot", vec![], core_screenshot)
            .build()
    });
}

fn adapter_memory(obj: &NativeObject) -> Value {
    match obj.downcast_ref::<CoreAdapter>() {
        Some(adapter) => Value::Table(adapter.memory()),
        None => Value::Void,
    }
}

fn adapter_core(obj: &NativeObject) -> Value {
    match obj.downcast_ref::<CoreAdapter>() {
        Some(adapter) => Value::Object(core_object(&adapter.core)),
        None => Value::Void,
    }
}

fn adapter_cast(obj: &NativeObject) -> Option<NativeObject> {
    obj.downcast_ref::<CoreAdapter>()
        .map(|adapter| core_object(&adapter.core))
}

fn adapter_deinit(data: &dyn std::any::Any) {
    if let Some(adapter) = data.downcast_ref::<CoreAdapter>() {
        adapter.memory.borrow_mut().clear();
    }
}

fn ensure_adapter_binding() {
    BindingRegistry::global().register_if_absent(CORE_ADAPTER_TYPE, || {
        BindingBuilder::new(CORE_ADAPTER_TYPE)
            .doc("Table of memory adapters, keyed by block name")
            .field("memory", adapter_memory)
            .field("_core", adapter_core)
            .cast(adapter_cast)
            .deinit(adapter_deinit)
            .build()
    });
}

fn clear_memory_map(context: &mut ScriptContext, adapter: &CoreAdapter) {
    let handles: Vec<_> = adapter
        .memory
        .borrow()
        .iter()
        .filter_map(|(_, value)| match value {
            Value::WeakRef(handle) => Some(*handle),
            _ => None,
        })
        .collect();
    for handle in handles {
        context.clear_weak(handle);
    }
    adapter.memory.borrow_mut().clear();
}

fn populate_memory_map(context: &mut ScriptContext, adapter: &CoreAdapter) {
    let blocks = adapter.core.borrow().list_memory_blocks();
    for block in blocks {
        let name = block.name.clone();
        let translator = memory::translator_object(adapter.core.clone(), block);
        let handle = context.make_weak(Value::Object(translator));
        adapter
            .memory
            .borrow_mut()
            .insert(TableKey::str(&name), Value::WeakRef(handle));
    }
}

/// Builds a core adapter for `core`, populates its memory map, and installs
/// it as the `emu` global.
pub fn attach_core(context: &mut ScriptContext, core: SharedCore) {
    ensure_core_binding();
    ensure_adapter_binding();
    let adapter = CoreAdapter::new(core);
    populate_memory_map(context, &adapter);
    context.set_global(GLOBAL_EMU, Value::Object(NativeObject::owned(
        CORE_ADAPTER_TYPE,
        adapter,
    )));
}

/// Clears and repopulates the attached adapter's memory map from the core's
/// current geometry. Call whenever the core reports its memory layout
/// changed. No-op when nothing is attached.
pub fn rebuild_memory_map(context: &mut ScriptContext) {
    let Some(Value::Object(obj)) = context.get_global(GLOBAL_EMU) else {
        return;
    };
    let Some(adapter) = obj.downcast_ref::<CoreAdapter>() else {
        return;
    };
    clear_memory_map(context, adapter);
    populate_memory_map(context, adapter);
}

/// Clears the attached adapter's memory map (invalidating every weak
/// handle) and removes the `emu` global. No-op when nothing is attached.
pub fn detach_core(context: &mut ScriptContext) {
    let Some(Value::Object(obj)) = context.get_global(GLOBAL_EMU) else {
        return;
    };
    if let Some(adapter) = obj.downcast_ref::<CoreAdapter>() {
        clear_memory_map(context, adapter);
    }
    context.remove_global(GLOBAL_EMU);
}

//! Segmented-address translation over one memory block.
//!
//! A translator turns a linear address into a `(segment_address, segment)`
//! pair for its bound block, reproducing bank-switched semantics: two linear
//! addresses one segment size apart land on the same segment address in
//! different segments. For blocks with a fixed prefix (`segment_start`),
//! nonzero segments are offset past the prefix.

use std::rc::Rc;

use crate::emu::{MemoryBlock, SharedCore};
use crate::script::{
    BindingBuilder, BindingRegistry, NativeObject, Param, ScriptError, TypeTag, Value,
    binding::Call,
};

/// Script-visible type name of the translator binding.
pub(crate) const MEMORY_TRANSLATOR_TYPE: &str = "MemoryTranslator";

/// Byte/halfword/word access to one memory block through segment-aware
/// translation. Stateless beyond its block and core binding.
pub struct MemoryTranslator {
    core: SharedCore,
    block: MemoryBlock,
}

impl MemoryTranslator {
    /// Binds a translator to one block of one core.
    pub fn new(core: SharedCore, block: MemoryBlock) -> Self {
        Self { core, block }
    }

    /// The bound block.
    pub fn block(&self) -> &MemoryBlock {
        &self.block
    }

    /// Translates a linear address into a `(segment_address, segment)` pair.
    pub fn translate(&self, address: u32) -> (u32, i32) {
        let segment_size = self.block.segment_size();
        let segment = (address / segment_size) as i32;
        let mut segment_address = address % segment_size + self.block.start;
        if let Some(segment_start) = self.block.segment_start {
            if segment != 0 {
                segment_address += segment_start - self.block.start;
            }
        }
        (segment_address, segment)
    }

    /// Reads a byte at a linear address.
    pub fn read8(&self, address: u32) -> u8 {
        let (segment_address, segment) = self.translate(address);
        self.core.borrow_mut().raw_read8(segment_address, segment)
    }

    /// Reads a halfword at a linear address.
    pub fn read16(&self, address: u32) -> u16 {
        let (segment_address, segment) = self.translate(address);
        self.core.borrow_mut().raw_read16(segment_address, segment)
    }

    /// Reads a word at a linear address.
    pub fn read32(&self, address: u32) -> u32 {
        let (segment_address, segment) = self.translate(address);
        self.core.borrow_mut().raw_read32(segment_address, segment)
    }

    /// Writes a byte at a linear address.
    pub fn write8(&self, address: u32, value: u8) {
        let (segment_address, segment) = self.translate(address);
        self.core
            .borrow_mut()
            .raw_write8(segment_address, segment, value);
    }

    /// Writes a halfword at a linear address.
    pub fn write16(&self, address: u32, value: u16) {
        let (segment_address, segment) = self.translate(address);
        self.core
            .borrow_mut()
            .raw_write16(segment_address, segment, value);
    }

    /// Writes a word at a linear address.
    pub fn write32(&self, address: u32, value: u32) {
        let (segment_address, segment) = self.translate(address);
        self.core
            .borrow_mut()
            .raw_write32(segment_address, segment, value);
    }

    /// Reads `length` bytes starting at a linear address, translating each
    /// address individually. No bounds clamping: out-of-range addresses are
    /// forwarded to the core as-is.
    pub fn read_range(&self, address: u32, length: u32) -> Vec<u8> {
        (0..length)
            .map(|offset| self.read8(address.wrapping_add(offset)))
            .collect()
    }
}

fn this<'a>(call: &'a Call<'_>) -> Result<&'a MemoryTranslator, ScriptError> {
    call.this::<MemoryTranslator>()
}

fn mt_read8(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(u32::from(this(call)?.read8(call.arg_u32(0)?))))
}

fn mt_read16(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(u32::from(this(call)?.read16(call.arg_u32(0)?))))
}

fn mt_read32(call: &Call<'_>) -> Result<Value, ScriptError> {
    Ok(Value::U32(this(call)?.read32(call.arg_u32(0)?)))
}

fn mt_read_range(call: &Call<'_>) -> Result<Value, ScriptError> {
    let bytes = this(call)?.read_range(call.arg_u32(0)?, call.arg_u32(1)?);
    let list: Vec<Value> = bytes.into_iter().map(Value::U8).collect();
    Ok(Value::List(Rc::new(list.into())))
}

fn mt_write8(call: &Call<'_>) -> Result<Value, ScriptError> {
    this(call)?.write8(call.arg_u32(0)?, call.arg_u8(1)?);
    Ok(Value::Void)
}

fn mt_write16(call: &Call<'_>) -> Result<Value, ScriptError> {
    this(call)?.write16(call.arg_u32(0)?, call.arg_u16(1)?);
    Ok(Value::Void)
}

fn mt_write32(call: &Call<'_>) -> Result<Value, ScriptError> {
    this(call)?.write32(call.arg_u32(0)?, call.arg_u32(1)?);
    Ok(Value::Void)
}

/// Registers the translator binding if it is not installed yet.
pub(crate) fn ensure_binding() {
    BindingRegistry::global().register_if_absent(MEMORY_TRANSLATOR_TYPE, || {
        BindingBuilder::new(MEMORY_TRANSLATOR_TYPE)
            .doc("Read an 8-bit value from the given offset")
            .method(
                "read8",
                vec![Param::required("address", TypeTag::U32)],
                mt_read8,
            )
            .doc("Read a 16-bit value from the given offset")
            .method(
                "read16",
                vec![Param::required("address", TypeTag::U32)],
                mt_read16,
            )
            .doc("Read a 32-bit value from the given offset")
            .method(
                "read32",
                vec![Param::required("address", TypeTag::U32)],
                mt_read32,
            )
            .doc("Read byte range from the given offset")
            .method(
                "readRange",
                vec![
                    Param::required("address", TypeTag::U32),
                    Param::required("length", TypeTag::U32),
                ],
                mt_read_range,
            )
            .doc("Write an 8-bit value to the given offset")
            .method(
                "write8",
                vec![
                    Param::required("address", TypeTag::U32),
                    Param::required("value", TypeTag::U8),
                ],
                mt_write8,
            )
            .doc("Write a 16-bit value to the given offset")
            .method(
                "write16",
                vec![
                    Param::required("address", TypeTag::U32),
                    Param::required("value", TypeTag::U16),
                ],
                mt_write16,
            )
            .doc("Write a 32-bit value to the given offset")
            .method(
                "write32",
                vec![
                    Param::required("address", TypeTag::U32),
                    Param::required("value", TypeTag::U32),
                ],
                mt_write32,
            )
            .build()
    });
}

/// Wraps a translator as an owned bound object.
pub(crate) fn translator_object(core: SharedCore, block: MemoryBlock) -> NativeObject {
    ensure_binding();
    NativeObject::owned(MEMORY_TRANSLATOR_TYPE, MemoryTranslator::new(core, block))
}

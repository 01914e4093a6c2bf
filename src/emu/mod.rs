//! The emulated-core contract and everything bound on top of it: segmented
//! memory translation, the core adapter and its memory map, and the console
//! and UI globals.

use std::{cell::RefCell, rc::Rc};

pub mod adapter;
pub mod console;
pub mod memory;
pub mod ui;

pub use adapter::{attach_core, detach_core, rebuild_memory_map};
pub use console::{attach_console, detach_console};
pub use memory::MemoryTranslator;
pub use ui::{TextBuffer, set_text_buffer_factory};

/// Shared handle to an emulated core. The bridge is single-threaded; every
/// script-visible mutation happens on the thread stepping the core.
pub type SharedCore = Rc<RefCell<dyn Core>>;

/// A named, possibly bank-switched contiguous range of the emulated address
/// space.
///
/// When `segment_start` is set the range is segmented: the bytes between
/// `start` and `segment_start` are a fixed (unbanked) prefix, and the rest
/// repeats once per segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    /// First address of the block.
    pub start: u32,
    /// One past the last address of the block.
    pub end: u32,
    /// Start of the banked region, when the block is segmented.
    pub segment_start: Option<u32>,
    /// Internal name the block is keyed by in the memory map.
    pub name: String,
}

impl MemoryBlock {
    /// An unsegmented block. The range must be nonempty.
    pub fn flat(name: &str, start: u32, end: u32) -> Self {
        debug_assert!(start < end, "empty memory block `{}`", name);
        Self {
            start,
            end,
            segment_start: None,
            name: name.to_owned(),
        }
    }

    /// A segmented block with a fixed prefix ending at `segment_start`.
    /// The banked region past the prefix must be nonempty.
    pub fn segmented(name: &str, start: u32, end: u32, segment_start: u32) -> Self {
        debug_assert!(
            start <= segment_start && segment_start < end,
            "degenerate banked region in memory block `{}`",
            name
        );
        Self {
            start,
            end,
            segment_start: Some(segment_start),
            name: name.to_owned(),
        }
    }

    /// Size of one segment: the full span, minus the fixed prefix when
    /// segmentation is in use. Nonzero for every block the constructors
    /// accept; translation divides by it.
    pub fn segment_size(&self) -> u32 {
        let mut size = self.end - self.start;
        if let Some(segment_start) = self.segment_start {
            size -= segment_start - self.start;
        }
        size
    }
}

/// Savestate category mask.
///
/// Categories compose bitwise; the named defaults reproduce the original
/// bridge's behavior (save everything, load everything except persistent
/// save data).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveStateFlags(u32);

impl SaveStateFlags {
    /// Screenshot embedded in the state.
    pub const SCREENSHOT: Self = Self(1);
    /// Persistent save data (battery/flash saves).
    pub const SAVEDATA: Self = Self(2);
    /// Active cheat set.
    pub const CHEATS: Self = Self(4);
    /// Real-time clock state.
    pub const RTC: Self = Self(8);
    /// State metadata (creation time, emulator version).
    pub const METADATA: Self = Self(16);
    /// Every category.
    pub const ALL: Self = Self(0x1F);

    /// Default mask for saving: all categories.
    pub fn save_default() -> Self {
        Self::ALL
    }

    /// Default mask for loading: everything except persistent save data.
    pub fn load_default() -> Self {
        Self::ALL.without(Self::SAVEDATA)
    }

    /// Raw bit representation.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Reconstructs a mask from raw bits, dropping unknown bits.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Whether every category in `other` is present.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// This mask with the categories of `other` removed.
    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

/// Read/write/register/savestate/frame-stepping contract of an emulated
/// core, consumed by the bridge.
///
/// `raw_*` accessors are segment-aware and address a specific bank of a
/// memory block; `bus_*` accessors go through the CPU-visible bus. Bounds
/// checking is the core's business: the bridge forwards out-of-range
/// accesses unmodified.
pub trait Core {
    /// Current memory geometry. May change on media load/unload; callers
    /// must rebuild anything derived from an earlier list.
    fn list_memory_blocks(&self) -> Vec<MemoryBlock>;

    /// Reads a byte from a segment-addressed location.
    fn raw_read8(&mut self, address: u32, segment: i32) -> u8;
    /// Reads a halfword from a segment-addressed location.
    fn raw_read16(&mut self, address: u32, segment: i32) -> u16;
    /// Reads a word from a segment-addressed location.
    fn raw_read32(&mut self, address: u32, segment: i32) -> u32;
    /// Writes a byte to a segment-addressed location.
    fn raw_write8(&mut self, address: u32, segment: i32, value: u8);
    /// Writes a halfword to a segment-addressed location.
    fn raw_write16(&mut self, address: u32, segment: i32, value: u16);
    /// Writes a word to a segment-addressed location.
    fn raw_write32(&mut self, address: u32, segment: i32, value: u32);

    /// Reads a byte over the CPU-visible bus.
    fn bus_read8(&mut self, address: u32) -> u8;
    /// Reads a halfword over the CPU-visible bus.
    fn bus_read16(&mut self, address: u32) -> u16;
    /// Reads a word over the CPU-visible bus.
    fn bus_read32(&mut self, address: u32) -> u32;
    /// Writes a byte over the CPU-visible bus.
    fn bus_write8(&mut self, address: u32, value: u8);
    /// Writes a halfword over the CPU-visible bus.
    fn bus_write16(&mut self, address: u32, value: u16);
    /// Writes a word over the CPU-visible bus.
    fn bus_write32(&mut self, address: u32, value: u32);

    /// Reads a CPU register by name; unknown names yield `None`.
    fn read_register(&self, name: &str) -> Option<i32>;
    /// Writes a CPU register by name. Unknown names are ignored.
    fn write_register(&mut self, name: &str, value: i32);

    /// Internal title from the loaded media's header.
    fn game_title(&self) -> String;
    /// Internal product code from the loaded media's header.
    fn game_code(&self) -> String;

    /// Runs until the next frame boundary.
    fn run_frame(&mut self);
    /// Runs a single instruction.
    fn step(&mut self);

    /// Replaces the active key mask.
    fn set_keys(&mut self, keys: u32);
    /// Adds keys to the active mask.
    fn add_keys(&mut self, keys: u32);
    /// Removes keys from the active mask.
    fn clear_keys(&mut self, keys: u32);
    /// The active key mask.
    fn get_keys(&self) -> u32;

    /// Saves state to a numbered slot. Returns `false` on failure.
    fn save_state(&mut self, slot: i32, flags: SaveStateFlags) -> bool;
    /// Loads state from a numbered slot. Returns `false` on failure.
    fn load_state(&mut self, slot: i32, flags: SaveStateFlags) -> bool;

    /// Captures a screenshot through the host.
    fn take_screenshot(&mut self);

    /// Host-defined identifier of the emulated platform.
    fn platform(&self) -> i32;
    /// Number of the current frame.
    fn frame_counter(&self) -> u32;
    /// Cycles per frame.
    fn frame_cycles(&self) -> i32;
    /// Cycles per second.
    fn frequency(&self) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_size_flat() {
        let block = MemoryBlock::flat("wram", 0x0200_0000, 0x0204_0000);
        assert_eq!(block.segment_size(), 0x4_0000);
    }

    #[test]
    fn test_segment_size_with_fixed_prefix() {
        let block = MemoryBlock::segmented("rom", 0x0800_0000, 0x0800_8000, 0x0800_2000);
        assert_eq!(block.segment_size(), 0x6000);
    }

    #[test]
    #[should_panic(expected = "empty memory block")]
    fn test_flat_block_rejects_empty_range() {
        let _ = MemoryBlock::flat("bad", 0x0200_0000, 0x0200_0000);
    }

    #[test]
    #[should_panic(expected = "degenerate banked region")]
    fn test_segmented_block_rejects_empty_banked_region() {
        let _ = MemoryBlock::segmented("bad", 0x0800_0000, 0x0800_8000, 0x0800_8000);
    }

    #[test]
    fn test_savestate_defaults() {
        assert!(SaveStateFlags::save_default().contains(SaveStateFlags::SAVEDATA));
        assert!(!SaveStateFlags::load_default().contains(SaveStateFlags::SAVEDATA));
        assert!(SaveStateFlags::load_default().contains(SaveStateFlags::RTC));
    }

    #[test]
    fn test_savestate_bits_roundtrip() {
        let flags = SaveStateFlags::ALL.without(SaveStateFlags::CHEATS);
        assert_eq!(SaveStateFlags::from_bits(flags.bits()), flags);
        assert_eq!(SaveStateFlags::from_bits(u32::MAX), SaveStateFlags::ALL);
    }
}

//! Shared fixtures: a scriptable mock core and recording script engines.
#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
};

use corescript::emu::{Core, MemoryBlock, SaveStateFlags};
use corescript::script::{DebuggerInfo, DebuggerReason, ScriptBridge, ScriptEngine};

/// Snapshot captured by [`MockCore::save_state`].
#[derive(Debug, Clone)]
struct SavedState {
    frame: u32,
    savedata: Option<i32>,
}

/// In-memory core with just enough behavior to exercise the bridge:
/// byte-addressable raw/bus memory, a key mask, named registers, and
/// slot-based savestates with category flags.
pub struct MockCore {
    pub blocks: Vec<MemoryBlock>,
    pub raw: HashMap<(u32, i32), u8>,
    pub bus: HashMap<u32, u8>,
    pub registers: HashMap<String, i32>,
    pub keys: u32,
    pub frame: u32,
    pub savedata: i32,
    pub screenshots: u32,
    states: HashMap<i32, SavedState>,
}

impl MockCore {
    pub fn new(blocks: Vec<MemoryBlock>) -> Self {
        Self {
            blocks,
            raw: HashMap::new(),
            bus: HashMap::new(),
            registers: HashMap::new(),
            keys: 0,
            frame: 0,
            savedata: 0,
            screenshots: 0,
            states: HashMap::new(),
        }
    }

    pub fn shared(blocks: Vec<MemoryBlock>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(blocks)))
    }
}

impl Core for MockCore {
    fn list_memory_blocks(&self) -> Vec<MemoryBlock> {
        self.blocks.clone()
    }

    fn raw_read8(&mut self, address: u32, segment: i32) -> u8 {
        self.raw.get(&(address, segment)).copied().unwrap_or(0)
    }
    fn raw_read16(&mut self, address: u32, segment: i32) -> u16 {
        u16::from(self.raw_read8(address, segment))
            | u16::from(self.raw_read8(address + 1, segment)) << 8
    }
    fn raw_read32(&mut self, address: u32, segment: i32) -> u32 {
        u32::from(self.raw_read16(address, segment))
            | u32::from(self.raw_read16(address + 2, segment)) << 16
    }
    fn raw_write8(&mut self, address: u32, segment: i32, value: u8) {
        self.raw.insert((address, segment), value);
    }
    fn raw_write16(&mut self, address: u32, segment: i32, value: u16) {
        self.raw_write8(address, segment, value as u8);
        self.raw_write8(address + 1, segment, (value >> 8) as u8);
    }
    fn raw_write32(&mut self, address: u32, segment: i32, value: u32) {
        self.raw_write16(address, segment, value as u16);
        self.raw_write16(address + 2, segment, (value >> 16) as u16);
    }

    fn bus_read8(&mut self, address: u32) -> u8 {
        self.bus.get(&address).copied().unwrap_or(0)
    }
    fn bus_read16(&mut self, address: u32) -> u16 {
        u16::from(self.bus_read8(address)) | u16::from(self.bus_read8(address + 1)) << 8
    }
    fn bus_read32(&mut self, address: u32) -> u32 {
        u32::from(self.bus_read16(address)) | u32::from(self.bus_read16(address + 2)) << 16
    }
    fn bus_write8(&mut self, address: u32, value: u8) {
        self.bus.insert(address, value);
    }
    fn bus_write16(&mut self, address: u32, value: u16) {
        self.bus_write8(address, value as u8);
        self.bus_write8(address + 1, (value >> 8) as u8);
    }
    fn bus_write32(&mut self, address: u32, value: u32) {
        self.bus_write16(address, value as u16);
        self.bus_write16(address + 2, (value >> 16) as u16);
    }

    fn read_register(&self, name: &str) -> Option<i32> {
        self.registers.get(name).copied()
    }
    fn write_register(&mut self, name: &str, value: i32) {
        if self.registers.contains_key(name) {
            self.registers.insert(name.to_owned(), value);
        }
    }

    fn game_title(&self) -> String {
        "TESTGAME".to_owned()
    }
    fn game_code(&self) -> String {
        "CSTE".to_owned()
    }

    fn run_frame(&mut self) {
        self.frame += 1;
    }
    fn step(&mut self) {}

    fn set_keys(&mut self, keys: u32) {
        self.keys = keys;
    }
    fn add_keys(&mut self, keys: u32) {
        self.keys |= keys;
    }
    fn clear_keys(&mut self, keys: u32) {
        self.keys &= !keys;
    }
    fn get_keys(&self) -> u32 {
        self.keys
    }

    fn save_state(&mut self, slot: i32, flags: SaveStateFlags) -> bool {
        let savedata = flags
            .contains(SaveStateFlags::SAVEDATA)
            .then_some(self.savedata);
        self.states.insert(
            slot,
            SavedState {
                frame: self.frame,
                savedata,
            },
        );
        true
    }

    fn load_state(&mut self, slot: i32, flags: SaveStateFlags) -> bool {
        let Some(state) = self.states.get(&slot).cloned() else {
            return false;
        };
        self.frame = state.frame;
        if flags.contains(SaveStateFlags::SAVEDATA) {
            if let Some(savedata) = state.savedata {
                self.savedata = savedata;
            }
        }
        true
    }

    fn take_screenshot(&mut self) {
        self.screenshots += 1;
    }

    fn platform(&self) -> i32 {
        1
    }
    fn frame_counter(&self) -> u32 {
        self.frame
    }
    fn frame_cycles(&self) -> i32 {
        280_896
    }
    fn frequency(&self) -> i32 {
        16_777_216
    }
}

/// What a [`RecordingEngine`] does when offered a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBehavior {
    /// `is_script` returns false.
    Rejects,
    /// Recognizes the script but fails to load it.
    FailsToLoad,
    /// Recognizes and loads the script.
    Loads,
}

/// Script engine that records every callback into a shared event log.
pub struct RecordingEngine {
    name: &'static str,
    accept_init: bool,
    behavior: LoadBehavior,
    symbols: HashMap<String, i32>,
    events: Rc<RefCell<Vec<String>>>,
}

impl RecordingEngine {
    pub fn new(
        name: &'static str,
        behavior: LoadBehavior,
        events: Rc<RefCell<Vec<String>>>,
    ) -> Box<Self> {
        Box::new(Self {
            name,
            accept_init: true,
            behavior,
            symbols: HashMap::new(),
            events,
        })
    }

    pub fn declining(name: &'static str, events: Rc<RefCell<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            name,
            accept_init: false,
            behavior: LoadBehavior::Rejects,
            symbols: HashMap::new(),
            events,
        })
    }

    pub fn with_symbol(mut self: Box<Self>, symbol: &str, value: i32) -> Box<Self> {
        self.symbols.insert(symbol.to_owned(), value);
        self
    }

    fn record(&self, event: &str) {
        self.events.borrow_mut().push(format!("{}:{}", self.name, event));
    }
}

impl ScriptEngine for RecordingEngine {
    fn init(&mut self, _bridge: &ScriptBridge) -> bool {
        self.record("init");
        self.accept_init
    }

    fn name(&self) -> &str {
        self.name
    }

    fn is_script(&self, name: &str, _source: &[u8]) -> bool {
        self.record(&format!("is_script {}", name));
        self.behavior != LoadBehavior::Rejects
    }

    fn load_script(&mut self, name: &str, _source: &[u8]) -> bool {
        self.record(&format!("load {}", name));
        self.behavior == LoadBehavior::Loads
    }

    fn run(&mut self) {
        self.record("run");
    }

    fn lookup_symbol(&self, name: &str) -> Option<i32> {
        self.record(&format!("lookup {}", name));
        self.symbols.get(name).copied()
    }

    fn debugger_entered(&mut self, reason: DebuggerReason, info: &DebuggerInfo) {
        self.record(&format!("debugger {:?}@{:#x}", reason, info.address));
    }

    fn deinit(&mut self) {
        self.record("deinit");
    }
}

// NDB - Native Process Debugger
// Copyright (C) 2024 The NDB Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::collections::HashMap;

use ndb_common::{ModuleInfo, ModuleParty, OsBlockKind, Pointer, SourceLine, Value, ViewKind};
use parking_lot::RwLock;
use tracing::debug;

use super::DebugContext;

/// An in-memory [`DebugContext`] that simulates a suspended debuggee.
///
/// Used by the engine's tests and by the `ndb-expr` sandbox binary. The
/// simulated target is assembled with the builder-style `with_*` methods;
/// registers, memory and user variables stay mutable afterwards, the module
/// table and line table do not.
#[derive(Default)]
pub struct SimulatedContext {
    registers: RwLock<HashMap<String, Pointer>>,
    /// Disjoint mapped regions, keyed by base address.
    memory: RwLock<Vec<MemoryRegion>>,
    modules: Vec<ModuleInfo>,
    symbols: HashMap<String, Pointer>,
    selections: RwLock<HashMap<ViewKind, Pointer>>,
    user_variables: RwLock<HashMap<String, Value>>,
    lines: Vec<LineRange>,
    peb: Pointer,
    teb: Pointer,
}

struct MemoryRegion {
    base: Pointer,
    bytes: Vec<u8>,
}

struct LineRange {
    start: Pointer,
    len: Pointer,
    module: String,
    line: u64,
}

impl SimulatedContext {
    /// An empty target: no registers, no mappings, no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a register with an initial value.
    pub fn with_register(self, name: &str, value: Pointer) -> Self {
        self.registers.write().insert(name.to_ascii_lowercase(), value);
        self
    }

    /// Map a region of memory with the given contents.
    pub fn with_memory(self, base: Pointer, bytes: Vec<u8>) -> Self {
        self.memory.write().push(MemoryRegion { base, bytes });
        self
    }

    /// Map a zero-filled region of `len` bytes.
    pub fn with_zeroed_memory(self, base: Pointer, len: usize) -> Self {
        self.with_memory(base, vec![0; len])
    }

    /// Add a loaded module. The module table stays ordered by base address.
    pub fn with_module(mut self, name: &str, base: Pointer, size: Pointer, party: ModuleParty) -> Self {
        self.modules.push(ModuleInfo { base, size, name: name.to_string(), party });
        self.modules.sort_by_key(|m| m.base);
        self
    }

    /// Add a symbol.
    pub fn with_symbol(mut self, name: &str, addr: Pointer) -> Self {
        self.symbols.insert(name.to_ascii_lowercase(), addr);
        self
    }

    /// Set a view's selection address.
    pub fn with_selection(self, view: ViewKind, addr: Pointer) -> Self {
        self.selections.write().insert(view, addr);
        self
    }

    /// Set the PEB and TEB base addresses.
    pub fn with_os_blocks(mut self, peb: Pointer, teb: Pointer) -> Self {
        self.peb = peb;
        self.teb = teb;
        self
    }

    /// Add a debug-line record covering `len` bytes starting at `start`.
    pub fn with_source_line(mut self, module: &str, line: u64, start: Pointer, len: Pointer) -> Self {
        self.lines.push(LineRange { start, len, module: module.to_string(), line });
        self
    }

    /// Move a view's selection, the way the presentation layer does between
    /// evaluations.
    pub fn select(&self, view: ViewKind, addr: Pointer) {
        self.selections.write().insert(view, addr);
    }

    fn region_index(&self, addr: Pointer, len: usize) -> Option<(usize, usize)> {
        let memory = self.memory.read();
        for (i, region) in memory.iter().enumerate() {
            let offset = addr.wrapping_sub(region.base) as usize;
            let in_bounds = addr >= region.base
                && offset.checked_add(len).is_some_and(|end| end <= region.bytes.len());
            if in_bounds {
                return Some((i, offset));
            }
        }
        None
    }
}

impl DebugContext for SimulatedContext {
    fn register(&self, name: &str) -> Option<Pointer> {
        self.registers.read().get(&name.to_ascii_lowercase()).copied()
    }

    fn set_register(&self, name: &str, value: Pointer) -> bool {
        let mut registers = self.registers.write();
        match registers.get_mut(&name.to_ascii_lowercase()) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn read_memory(&self, addr: Pointer, len: usize) -> Option<Vec<u8>> {
        let (i, offset) = self.region_index(addr, len)?;
        let memory = self.memory.read();
        Some(memory[i].bytes[offset..offset + len].to_vec())
    }

    fn write_memory(&self, addr: Pointer, bytes: &[u8]) -> bool {
        let Some((i, offset)) = self.region_index(addr, bytes.len()) else {
            return false;
        };
        let mut memory = self.memory.write();
        memory[i].bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        debug!(addr = format_args!("{addr:#x}"), len = bytes.len(), "simulated memory write");
        true
    }

    fn lookup_symbol(&self, name: &str) -> Option<Pointer> {
        self.symbols.get(&name.to_ascii_lowercase()).copied()
    }

    fn module_at(&self, addr: Pointer) -> Option<ModuleInfo> {
        self.modules.iter().find(|m| m.contains(addr)).cloned()
    }

    fn module_by_name(&self, name: &str) -> Option<ModuleInfo> {
        self.modules.iter().find(|m| m.name.eq_ignore_ascii_case(name)).cloned()
    }

    fn selection(&self, view: ViewKind) -> Pointer {
        self.selections.read().get(&view).copied().unwrap_or(0)
    }

    fn user_variable(&self, name: &str) -> Option<Value> {
        self.user_variables.read().get(&name.to_ascii_lowercase()).copied()
    }

    fn set_user_variable(&self, name: &str, value: Value) {
        self.user_variables.write().insert(name.to_ascii_lowercase(), value);
    }

    fn os_block(&self, kind: OsBlockKind) -> Pointer {
        match kind {
            OsBlockKind::Peb => self.peb,
            OsBlockKind::Teb => self.teb,
        }
    }

    fn source_line(&self, addr: Pointer) -> Option<SourceLine> {
        self.lines
            .iter()
            .find(|l| addr >= l.start && addr.wrapping_sub(l.start) < l.len)
            .map(|l| SourceLine { module: l.module.clone(), line: l.line, line_start: l.start })
    }

    fn line_address(&self, module: &str, line: u64) -> Option<Pointer> {
        self.lines
            .iter()
            .find(|l| l.line == line && l.module.eq_ignore_ascii_case(module))
            .map(|l| l.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_roundtrip() {
        let ctx = SimulatedContext::new().with_register("RAX", 7);
        assert_eq!(ctx.register("rax"), Some(7));
        assert!(ctx.set_register("rax", 9));
        assert_eq!(ctx.register("RAX"), Some(9));
        assert!(!ctx.set_register("no_such_reg", 1));
    }

    #[test]
    fn test_memory_bounds() {
        let ctx = SimulatedContext::new().with_memory(0x1000, vec![1, 2, 3, 4]);
        assert_eq!(ctx.read_memory(0x1000, 4), Some(vec![1, 2, 3, 4]));
        assert_eq!(ctx.read_memory(0x1002, 2), Some(vec![3, 4]));
        // Reads crossing the end of the region fault.
        assert_eq!(ctx.read_memory(0x1002, 4), None);
        assert_eq!(ctx.read_memory(0x2000, 1), None);
    }

    #[test]
    fn test_memory_write() {
        let ctx = SimulatedContext::new().with_zeroed_memory(0x1000, 8);
        assert!(ctx.write_memory(0x1002, &[0xaa, 0xbb]));
        assert_eq!(ctx.read_memory(0x1000, 4), Some(vec![0, 0, 0xaa, 0xbb]));
        assert!(!ctx.write_memory(0x1007, &[1, 2]));
    }

    #[test]
    fn test_module_lookup() {
        let ctx = SimulatedContext::new()
            .with_module("app.exe", 0x400000, 0x10000, ModuleParty::User)
            .with_module("ntdll.dll", 0x7ff000000000, 0x1000, ModuleParty::System);
        assert_eq!(ctx.module_at(0x400123).unwrap().name, "app.exe");
        assert_eq!(ctx.module_at(0x7ff000000fff).unwrap().party, ModuleParty::System);
        assert!(ctx.module_at(0x1).is_none());
        assert_eq!(ctx.module_by_name("NTDLL.DLL").unwrap().base, 0x7ff000000000);
    }

    #[test]
    fn test_selection_mutation() {
        let ctx = SimulatedContext::new().with_selection(ViewKind::Dump, 0x1000);
        assert_eq!(ctx.selection(ViewKind::Dump), 0x1000);
        assert_eq!(ctx.selection(ViewKind::Stack), 0);
        ctx.select(ViewKind::Dump, 0x2000);
        assert_eq!(ctx.selection(ViewKind::Dump), 0x2000);
    }

    #[test]
    fn test_line_table_bidirectional() {
        let ctx = SimulatedContext::new().with_source_line("app.exe", 10, 0x401000, 5);
        let line = ctx.source_line(0x401003).unwrap();
        assert_eq!(line.line, 10);
        assert_eq!(line.displacement(0x401003), 3);
        assert_eq!(ctx.line_address("app.exe", 10), Some(0x401000));
        assert!(ctx.source_line(0x401005).is_none());
    }

    #[test]
    fn test_user_variables_case_insensitive() {
        let ctx = SimulatedContext::new();
        assert!(ctx.user_variable("mine").is_none());
        ctx.set_user_variable("Mine", Value::new(3));
        assert_eq!(ctx.user_variable("MINE"), Some(Value::new(3)));
    }
}

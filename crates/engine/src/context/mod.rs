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

//! The contract between the expression engine and the surrounding debugger.
//!
//! The evaluator only ever reaches the target process through
//! [`DebugContext`]; it never touches the OS directly. Implementations must
//! return internally consistent data for the duration of one evaluation
//! (registers, memory and selections read while the target is suspended,
//! access serialized against the presentation thread). Memory operations may
//! legitimately fail — an unmapped page is an ordinary evaluation error, not
//! a panic.

use ndb_common::{ModuleInfo, OsBlockKind, Pointer, SourceLine, Value, ViewKind};

mod simulated;
pub use simulated::SimulatedContext;

/// Read/write view of a suspended debuggee, provided by the debugger session.
///
/// All methods take `&self`; implementations serialize interior mutation.
/// Lookups are case-insensitive where the underlying namespace is
/// (registers, symbols, module names).
pub trait DebugContext {
    /// Read a CPU register by name. `None` if no such register.
    fn register(&self, name: &str) -> Option<Pointer>;

    /// Write a CPU register. `false` if the register does not exist or is
    /// read-only.
    fn set_register(&self, name: &str, value: Pointer) -> bool;

    /// Read `len` bytes of debuggee memory. `None` on fault (unmapped page,
    /// protected region, process gone).
    fn read_memory(&self, addr: Pointer, len: usize) -> Option<Vec<u8>>;

    /// Write bytes to debuggee memory. `false` on fault.
    fn write_memory(&self, addr: Pointer, bytes: &[u8]) -> bool;

    /// Resolve a symbol or module-qualified export name to its address.
    fn lookup_symbol(&self, name: &str) -> Option<Pointer>;

    /// The loaded module containing `addr`, if any.
    fn module_at(&self, addr: Pointer) -> Option<ModuleInfo>;

    /// A loaded module by file name, for resolving a bare module name to its
    /// base address.
    fn module_by_name(&self, name: &str) -> Option<ModuleInfo>;

    /// The address currently selected in the given view.
    fn selection(&self, view: ViewKind) -> Pointer;

    /// Read a named user variable. `None` if it was never assigned.
    fn user_variable(&self, name: &str) -> Option<Value>;

    /// Create or overwrite a named user variable. Variables persist for the
    /// debugging session.
    fn set_user_variable(&self, name: &str, value: Value);

    /// Base address of an OS control block (PEB/TEB) of the debuggee.
    fn os_block(&self, kind: OsBlockKind) -> Pointer;

    /// The debug-line record covering `addr`, if source info exists for it.
    fn source_line(&self, addr: Pointer) -> Option<SourceLine>;

    /// The start address of a given line in a given module; the reverse
    /// direction of [`source_line`](Self::source_line).
    fn line_address(&self, module: &str, line: u64) -> Option<Pointer>;
}

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

/// The debugger views that maintain a selected address.
///
/// Each view tracks exactly one pointer-width selection address, mutated by
/// the presentation layer between evaluations and read by the
/// `disasmsel()` / `dumpsel()` / `stacksel()` built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// The disassembly view.
    Disasm,
    /// The memory-dump view.
    Dump,
    /// The stack view.
    Stack,
}

/// OS-maintained control structures whose base addresses are queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsBlockKind {
    /// The debuggee's process environment block.
    Peb,
    /// The current thread's thread environment block.
    Teb,
}

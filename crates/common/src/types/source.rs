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

use crate::types::Pointer;

/// A debug-line record mapping an address range to a source line.
///
/// `line_start` is the first address covered by the line, so the byte
/// displacement of an address `a` within the line is `a - line_start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Module the line belongs to.
    pub module: String,
    /// One-based line number. Line 0 is reserved for "no mapping".
    pub line: u64,
    /// Address of the first instruction of the line.
    pub line_start: Pointer,
}

impl SourceLine {
    /// Byte offset of `addr` from the start of this line.
    pub fn displacement(&self, addr: Pointer) -> Pointer {
        addr.wrapping_sub(self.line_start)
    }
}

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

use std::fmt;

use crate::types::Pointer;

/// Classification of a loaded module, used to decide stepping behavior.
///
/// The numeric representation is part of the expression-language surface:
/// `modparty(addr)` returns it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ModuleParty {
    /// Project code; steppable.
    #[default]
    User = 0,
    /// OS or system library code, typically skipped during
    /// step-over-system-code.
    System = 1,
    /// Address not covered by any loaded module.
    Unknown = 2,
}

impl fmt::Display for ModuleParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::System => write!(f, "system"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A loaded module of the debuggee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Base address the module is mapped at.
    pub base: Pointer,
    /// Size of the mapping in bytes.
    pub size: Pointer,
    /// File name of the module (e.g. `ntdll.dll`).
    pub name: String,
    /// User/system classification, read from module metadata.
    pub party: ModuleParty,
}

impl ModuleInfo {
    /// Whether `addr` falls inside this module's mapping.
    pub fn contains(&self, addr: Pointer) -> bool {
        addr >= self.base && addr.wrapping_sub(self.base) < self.size
    }
}

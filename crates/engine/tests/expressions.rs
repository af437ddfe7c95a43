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

//! End-to-end expression tests against a fully populated simulated target.

use ndb_common::{ModuleParty, Pointer, Value, ViewKind};
use ndb_engine::{evaluate, DebugContext, EvalError, MemoryAccessKind, SimulatedContext};
use pretty_assertions::assert_eq;

/// A simulated 64-bit process with a user module, a system module, symbols,
/// registers, stack memory, view selections and a line table.
fn target() -> SimulatedContext {
    SimulatedContext::new()
        .with_register("rax", 0x1234)
        .with_register("rbx", 0x10)
        .with_register("rsp", 0x7000)
        .with_register("rip", 0x140001050)
        .with_register("eflags", 0x246)
        .with_memory(0x7000, 0xdeadbeefu64.to_le_bytes().to_vec())
        .with_zeroed_memory(0x7008, 0x100)
        .with_module("app.exe", 0x140000000, 0x26000, ModuleParty::User)
        .with_module("ntdll.dll", 0x7ffc10000000, 0x1f8000, ModuleParty::System)
        .with_symbol("main", 0x140001000)
        .with_symbol("entry", 0x140001050)
        .with_selection(ViewKind::Disasm, 0x140001050)
        .with_selection(ViewKind::Dump, 0x7000)
        .with_selection(ViewKind::Stack, 0x7000)
        .with_os_blocks(0x9000, 0xa000)
        .with_source_line("app.exe", 37, 0x140001000, 0x20)
}

fn eval(text: &str) -> Result<Value, EvalError> {
    evaluate(text, &target())
}

fn eval_value(text: &str) -> Pointer {
    eval(text).unwrap().value
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval_value("1+2*3"), 7);
    assert_eq!(eval_value("(1+2)*3"), 9);
    assert_eq!(eval_value("20-8/4"), 18);
    assert_eq!(eval_value("7%4+1"), 4);
}

#[test]
fn bitwise_and_comparison_precedence() {
    // AND binds tighter than OR; equality binds tighter than xor.
    assert_eq!(eval_value("1|2&3"), 3);
    assert_eq!(eval_value("4^4==4"), 5);
}

#[test]
fn division_by_zero() {
    assert_eq!(eval("5/0"), Err(EvalError::DivisionByZero));
    assert_eq!(eval("rax%(rbx-rbx)"), Err(EvalError::DivisionByZero));
}

#[test]
fn undefined_identifier() {
    assert_eq!(
        eval("no_such_name"),
        Err(EvalError::UndefinedIdentifier("no_such_name".into()))
    );
}

#[test]
fn register_reads() {
    assert_eq!(eval_value("rax"), 0x1234);
    assert_eq!(eval_value("rax+rbx"), 0x1244);
    assert_eq!(eval_value("EFLAGS"), 0x246);
}

#[test]
fn register_assignment_is_silent_and_persists() {
    let ctx = target();
    let result = evaluate("rax=0xdead", &ctx).unwrap();
    assert_eq!(result.value, 0xdead);
    assert!(result.silent);
    assert_eq!(evaluate("rax", &ctx).unwrap().value, 0xdead);
}

#[test]
fn user_variable_lifecycle() {
    let ctx = target();
    evaluate("counter=3", &ctx).unwrap();
    assert_eq!(evaluate("counter+1", &ctx).unwrap().value, 4);
    evaluate("counter=counter*10", &ctx).unwrap();
    assert_eq!(evaluate("counter", &ctx).unwrap().value, 30);
}

#[test]
fn memory_reads_all_widths() {
    assert_eq!(eval_value("[rsp]"), 0xdeadbeef);
    assert_eq!(eval_value("*rsp"), 0xdeadbeef);
    assert_eq!(eval_value("@rsp"), 0xdeadbeef);
    assert_eq!(eval_value("dword:[rsp]"), 0xdeadbeef);
    assert_eq!(eval_value("word:[rsp]"), 0xbeef);
    assert_eq!(eval_value("byte:[rsp]"), 0xef);
    assert_eq!(eval_value("qword:[rsp]"), 0xdeadbeef);
}

#[test]
fn indexed_memory_reads() {
    let ctx = target()
        .with_memory(0x8000, {
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&0x11u64.to_le_bytes());
            bytes.extend_from_slice(&0x22u64.to_le_bytes());
            bytes
        })
        .with_symbol("table", 0x8000);
    assert_eq!(evaluate("table[0]", &ctx).unwrap().value, 0x11);
    assert_eq!(evaluate("table[1]", &ctx).unwrap().value, 0x22);
}

#[test]
fn memory_fault_reports_address_and_kind() {
    assert_eq!(
        eval("[0]"),
        Err(EvalError::MemoryAccess { address: 0, kind: MemoryAccessKind::Read })
    );
    assert_eq!(
        eval("[0xbad0000]=1"),
        Err(EvalError::MemoryAccess { address: 0xbad0000, kind: MemoryAccessKind::Write })
    );
}

#[test]
fn memory_fault_leaves_no_residue() {
    let ctx = target();
    assert!(evaluate("[0]", &ctx).is_err());
    // Reads and writes after a fault behave normally.
    assert_eq!(evaluate("[rsp]", &ctx).unwrap().value, 0xdeadbeef);
    evaluate("[0x7008]=42", &ctx).unwrap();
    assert_eq!(evaluate("[0x7008]", &ctx).unwrap().value, 42);
}

#[test]
fn memory_write_widths() {
    let ctx = target();
    evaluate("[0x7008]=0x1122334455667788", &ctx).unwrap();
    evaluate("word:[0x7008]=0xaabb", &ctx).unwrap();
    assert_eq!(evaluate("[0x7008]", &ctx).unwrap().value, 0x112233445566aabb);
}

#[test]
fn short_circuit_logicals() {
    // The right operand never runs, so the undefined call cannot fail.
    assert_eq!(eval_value("0 && undefinedFunc()"), 0);
    assert_eq!(eval_value("1 || undefinedFunc()"), 1);
    assert_eq!(
        eval("0 || undefinedFunc()"),
        Err(EvalError::UndefinedFunction("undefinedFunc".into()))
    );
}

#[test]
fn short_circuit_suppresses_writes() {
    let ctx = target();
    evaluate("0 && (rax=0)", &ctx).unwrap();
    assert_eq!(evaluate("rax", &ctx).unwrap().value, 0x1234);
}

#[test]
fn conditional_breakpoint_style_expressions() {
    // The shapes users type into condition fields.
    assert_eq!(eval_value("rax==0x1234 && [rsp]!=0"), 1);
    assert_eq!(eval_value("rax>0x2000 || rbx==0x10"), 1);
    assert_eq!(eval_value("!(rax&1)"), 1);
}

#[test]
fn bswap_involution() {
    assert_eq!(eval_value("bswap(0x0102030405060708)"), 0x0807060504030201);
    assert_eq!(eval_value("bswap(bswap(rax))"), 0x1234);
    assert_eq!(eval_value("bswap(0)"), 0);
}

#[test]
fn module_functions() {
    assert_eq!(eval_value("modparty(0x140001000)"), 0);
    assert_eq!(eval_value("modparty(0x7ffc10000000)"), 1);
    assert_eq!(eval_value("modparty(0x1)"), 2);
    assert_eq!(eval_value("modbase(rip)"), 0x140000000);
    assert_eq!(eval_value("modsize(rip)"), 0x26000);
}

#[test]
fn module_name_resolves_to_base() {
    assert_eq!(eval_value("\"app.exe\""), 0x140000000);
    assert_eq!(eval_value("\"ntdll.dll\"+0x1000"), 0x7ffc10001000);
}

#[test]
fn symbol_resolution() {
    assert_eq!(eval_value("main"), 0x140001000);
    assert_eq!(eval_value("entry-main"), 0x50);
}

#[test]
fn source_line_functions() {
    let ctx = target();
    assert_eq!(evaluate("srcline(0x140001008)", &ctx).unwrap().value, 37);
    // Displacement is relative to the line's first instruction, and the
    // line-start address plus the displacement gives the address back.
    assert_eq!(evaluate("srcdisp(0x140001008)", &ctx).unwrap().value, 8);
    assert_eq!(evaluate("srcdisp(0x140001000)", &ctx).unwrap().value, 0);
    let line = evaluate("srcline(0x140001008)", &ctx).unwrap().value;
    let start = ctx.line_address("app.exe", line).unwrap();
    assert_eq!(start + evaluate("srcdisp(0x140001008)", &ctx).unwrap().value, 0x140001008);
}

#[test]
fn source_line_outside_table_is_zero() {
    assert_eq!(eval_value("srcline(0x7ffc10000000)"), 0);
    assert_eq!(eval_value("srcdisp(0x7ffc10000000)"), 0);
}

#[test]
fn selection_functions() {
    assert_eq!(eval_value("disasmsel()"), 0x140001050);
    assert_eq!(eval_value("dumpsel()"), 0x7000);
    assert_eq!(eval_value("stacksel()"), 0x7000);
    // Selections track the UI; re-selecting changes the value.
    let ctx = target();
    ctx.select(ViewKind::Disasm, 0x140002000);
    assert_eq!(evaluate("disasmsel()", &ctx).unwrap().value, 0x140002000);
}

#[test]
fn os_block_functions() {
    assert_eq!(eval_value("peb()"), 0x9000);
    assert_eq!(eval_value("teb()"), 0xa000);
    // Callable bare, like a pseudo-register.
    assert_eq!(eval_value("peb"), 0x9000);
    assert_eq!(eval_value("teb"), 0xa000);
}

#[test]
fn sized_read_functions() {
    assert_eq!(eval_value("readbyte(rsp)"), 0xef);
    assert_eq!(eval_value("readword(rsp)"), 0xbeef);
    assert_eq!(eval_value("readdword(rsp)"), 0xdeadbeef);
    assert_eq!(eval_value("readqword(rsp)"), 0xdeadbeef);
    assert_eq!(eval_value("readptr(rsp)"), 0xdeadbeef);
}

#[test]
fn hex_literal_forms() {
    assert_eq!(eval_value("0x140000000"), 0x140000000);
    assert_eq!(eval_value("0ffh"), 0xff);
    assert_eq!(eval_value("10+6"), 16);
}

#[test]
fn function_names_are_case_insensitive() {
    assert_eq!(eval_value("BSWAP(1)"), 1 << 56);
    assert_eq!(eval_value("ModParty(rip)"), 0);
}

#[test]
fn assignment_chain() {
    let ctx = target();
    assert_eq!(evaluate("rbx=rax=1", &ctx).unwrap().value, 1);
    assert_eq!(evaluate("rax", &ctx).unwrap().value, 1);
    assert_eq!(evaluate("rbx", &ctx).unwrap().value, 1);
}

#[test]
fn syntax_errors_carry_offsets() {
    match eval("1+2)") {
        Err(EvalError::Syntax { offset, .. }) => assert_eq!(offset, 3),
        other => panic!("expected syntax error, got {other:?}"),
    }
    match eval("1 # 2") {
        Err(EvalError::Lexical { offset, character }) => {
            assert_eq!(offset, 2);
            assert_eq!(character, '#');
        }
        other => panic!("expected lexical error, got {other:?}"),
    }
}

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

//! Expression sandbox.
//!
//! Runs the evaluation engine against a simulated target described entirely
//! on the command line, for trying out expressions without a debuggee:
//!
//! ```text
//! ndb-expr --reg rax=0x1234 --mem 0x7000=efbeadde "rax+byte:[0x7000]"
//! ```

use std::io::{self, BufRead, Write};

use clap::Parser;
use eyre::{bail, eyre, Result, WrapErr};
use ndb_common::{logging, normalize_expression, ModuleParty, Pointer, ViewKind};
use ndb_engine::{ExpressionEvaluator, SimulatedContext};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "ndb-expr", about = "Evaluate debugger expressions against a simulated target")]
struct Cli {
    /// Register definition, `name=value` (value is decimal or 0x-hex)
    #[arg(long = "reg", value_name = "NAME=VALUE")]
    registers: Vec<String>,

    /// Memory region, `addr=hexbytes` (e.g. `0x7000=efbeadde`)
    #[arg(long = "mem", value_name = "ADDR=HEXBYTES")]
    memory: Vec<String>,

    /// Loaded module, `name:base:size:party` (party: user|system)
    #[arg(long = "module", value_name = "NAME:BASE:SIZE:PARTY")]
    modules: Vec<String>,

    /// Symbol definition, `name=addr`
    #[arg(long = "sym", value_name = "NAME=ADDR")]
    symbols: Vec<String>,

    /// View selection, `view=addr` (view: disasm|dump|stack)
    #[arg(long = "sel", value_name = "VIEW=ADDR")]
    selections: Vec<String>,

    /// PEB base address
    #[arg(long, value_name = "ADDR")]
    peb: Option<String>,

    /// TEB base address
    #[arg(long, value_name = "ADDR")]
    teb: Option<String>,

    /// Source line range, `module:line:start:len`
    #[arg(long = "line", value_name = "MODULE:LINE:START:LEN")]
    lines: Vec<String>,

    /// Read expressions from stdin after the positional ones
    #[arg(long)]
    repl: bool,

    /// Write logs to file as well as the console
    #[arg(long)]
    log_file: bool,

    /// Expressions to evaluate
    #[arg(value_name = "EXPR")]
    expressions: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging("ndb-expr", cli.log_file)?;

    let ctx = build_context(&cli)?;
    let evaluator = ExpressionEvaluator::new();

    let mut failed = false;
    for expression in &cli.expressions {
        failed |= !run_one(&evaluator, &ctx, expression);
    }

    if cli.repl {
        repl(&evaluator, &ctx)?;
    }

    if failed {
        bail!("one or more expressions failed");
    }
    Ok(())
}

/// Evaluate one expression and print the result. Returns false on failure.
fn run_one(evaluator: &ExpressionEvaluator, ctx: &SimulatedContext, raw: &str) -> bool {
    let text = normalize_expression(raw);
    match evaluator.eval(&text, ctx) {
        Ok(value) if value.silent => true,
        Ok(value) => {
            println!("{text} = {:#x} ({})", value.value, value.value);
            if !value.valid {
                println!("  (value is not valid)");
            }
            true
        }
        Err(err) => {
            eprintln!("{text}: {err}");
            false
        }
    }
}

fn repl(evaluator: &ExpressionEvaluator, ctx: &SimulatedContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "q" | "quit" | "exit") {
            return Ok(());
        }
        run_one(evaluator, ctx, line);
    }
}

/// Build the simulated target from the command-line description.
fn build_context(cli: &Cli) -> Result<SimulatedContext> {
    let mut ctx = SimulatedContext::new();

    for spec in &cli.registers {
        let (name, value) = split_pair(spec, '=')?;
        ctx = ctx.with_register(name, parse_pointer(value)?);
    }
    for spec in &cli.memory {
        let (addr, bytes) = split_pair(spec, '=')?;
        let bytes = hex::decode(bytes).wrap_err_with(|| format!("bad hex bytes in '{spec}'"))?;
        ctx = ctx.with_memory(parse_pointer(addr)?, bytes);
    }
    for spec in &cli.modules {
        let parts: Vec<&str> = spec.split(':').collect();
        let [name, base, size, party] = parts[..] else {
            bail!("expected name:base:size:party, got '{spec}'");
        };
        let party = match party {
            "user" => ModuleParty::User,
            "system" => ModuleParty::System,
            other => bail!("unknown module party '{other}' (expected user|system)"),
        };
        ctx = ctx.with_module(name, parse_pointer(base)?, parse_pointer(size)?, party);
    }
    for spec in &cli.symbols {
        let (name, addr) = split_pair(spec, '=')?;
        ctx = ctx.with_symbol(name, parse_pointer(addr)?);
    }
    for spec in &cli.selections {
        let (view, addr) = split_pair(spec, '=')?;
        let view = match view {
            "disasm" => ViewKind::Disasm,
            "dump" => ViewKind::Dump,
            "stack" => ViewKind::Stack,
            other => bail!("unknown view '{other}' (expected disasm|dump|stack)"),
        };
        ctx = ctx.with_selection(view, parse_pointer(addr)?);
    }
    if cli.peb.is_some() || cli.teb.is_some() {
        let peb = cli.peb.as_deref().map(parse_pointer).transpose()?.unwrap_or(0);
        let teb = cli.teb.as_deref().map(parse_pointer).transpose()?.unwrap_or(0);
        ctx = ctx.with_os_blocks(peb, teb);
    }
    for spec in &cli.lines {
        let parts: Vec<&str> = spec.split(':').collect();
        let [module, line, start, len] = parts[..] else {
            bail!("expected module:line:start:len, got '{spec}'");
        };
        ctx = ctx.with_source_line(
            module,
            parse_pointer(line)?,
            parse_pointer(start)?,
            parse_pointer(len)?,
        );
    }

    debug!("simulated target built");
    Ok(ctx)
}

fn split_pair(spec: &str, sep: char) -> Result<(&str, &str)> {
    spec.split_once(sep)
        .ok_or_else(|| eyre!("expected KEY{sep}VALUE, got '{spec}'"))
}

fn parse_pointer(text: &str) -> Result<Pointer> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => Pointer::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.wrap_err_with(|| format!("bad number '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer() {
        assert_eq!(parse_pointer("42").unwrap(), 42);
        assert_eq!(parse_pointer("0x1234").unwrap(), 0x1234);
        assert_eq!(parse_pointer(" 0X10 ").unwrap(), 0x10);
        assert!(parse_pointer("zzz").is_err());
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("rax=5", '=').unwrap(), ("rax", "5"));
        assert!(split_pair("rax", '=').is_err());
    }

    #[test]
    fn test_build_context_from_flags() {
        let cli = Cli::parse_from([
            "ndb-expr",
            "--reg",
            "rax=0x10",
            "--mem",
            "0x7000=efbeadde",
            "--module",
            "app.exe:0x140000000:0x1000:user",
            "--sym",
            "main=0x140000100",
            "--sel",
            "dump=0x7000",
            "--peb",
            "0x9000",
        ]);
        let ctx = build_context(&cli).unwrap();
        let evaluator = ExpressionEvaluator::new();
        assert_eq!(evaluator.eval("rax", &ctx).unwrap().value, 0x10);
        assert_eq!(evaluator.eval("dword:[0x7000]", &ctx).unwrap().value, 0xdeadbeef);
        assert_eq!(evaluator.eval("modparty(main)", &ctx).unwrap().value, 0);
        assert_eq!(evaluator.eval("dumpsel()+peb()", &ctx).unwrap().value, 0x10000);
    }
}

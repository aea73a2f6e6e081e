//! CLI entry point for the `thumbsim` binary.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use regex as _;
use serde as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use thumb_core::InstructionRegistry;
use thumb_run::session::{DEFAULT_STACK_SIZE, DEFAULT_STACK_TOP};
use thumb_run::{LoadError, Program, Session, SessionConfig, StopReason};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_STEPS: u64 = 10_000_000;

const USAGE_TEXT: &str = "\
Usage: thumbsim <command> [options]

Commands:
  run   <listing> [options]  Execute a disassembly listing
  check <listing>            Resolve every listed instruction without running

Options (run):
  --entry <symbol|0xaddr>    First instruction (default: main, _start, lowest)
  --stack-top <addr>         Initial stack pointer (default: 0x20010000)
  --stack-size <bytes>       Zeroed stack bytes below the top (default: 0x10000)
  --max-steps <n>            Step budget (default: 10000000)
  --counters                 Collect and print execution counters
  --dump-state               Print final registers and flags as JSON
  -v, --verbose              Debug logging (RUST_LOG overrides)
  -h, --help                 Show this help message

Exit status is the program's status on a clean stop, 1 otherwise.

Examples:
  thumbsim run app.lst
  thumbsim run app.lst --entry reset_handler --dump-state
  thumbsim check app.lst
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    entry: Option<String>,
    stack_top: u32,
    stack_size: u32,
    max_steps: u64,
    counters: bool,
    dump_state: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct CheckArgs {
    input: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "check" => parse_check_args(args)
            .map(Command::Check)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_number(flag: &str, value: Option<OsString>) -> Result<u64, String> {
    let value = value.ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("invalid value for {flag}: {text}"))
}

fn parse_address(flag: &str, value: Option<OsString>) -> Result<u32, String> {
    let number = parse_number(flag, value)?;
    u32::try_from(number).map_err(|_| format!("value for {flag} does not fit 32 bits"))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut parsed = RunArgs {
        input: PathBuf::new(),
        entry: None,
        stack_top: DEFAULT_STACK_TOP,
        stack_size: DEFAULT_STACK_SIZE,
        max_steps: DEFAULT_MAX_STEPS,
        counters: false,
        dump_state: false,
        verbose: false,
    };

    while let Some(arg) = args.next() {
        let flag = arg.to_string_lossy().to_string();
        match flag.as_str() {
            "--help" | "-h" => return Err(USAGE_TEXT.to_string()),
            "--verbose" | "-v" => parsed.verbose = true,
            "--counters" => parsed.counters = true,
            "--dump-state" => parsed.dump_state = true,
            "--entry" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --entry".to_string())?;
                parsed.entry = Some(value.to_string_lossy().to_string());
            }
            "--stack-top" => parsed.stack_top = parse_address(&flag, args.next())?,
            "--stack-size" => parsed.stack_size = parse_address(&flag, args.next())?,
            "--max-steps" => parsed.max_steps = parse_number(&flag, args.next())?,
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            _ => {
                if input.is_some() {
                    return Err("multiple input paths provided".to_string());
                }
                input = Some(PathBuf::from(arg));
            }
        }
    }

    parsed.input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(parsed)
}

fn parse_check_args(args: impl Iterator<Item = OsString>) -> Result<CheckArgs, String> {
    let mut input: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(CheckArgs { input })
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report_load_error(e: &LoadError) {
    match e {
        LoadError::Listing(listing) => eprintln!("{listing}"),
        other => eprintln!("error: {other}"),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn exit_status(stop: &StopReason) -> i32 {
    match stop {
        StopReason::Exited(status) => i32::from(status.unsigned() as u8),
        _ => 1,
    }
}

fn run_program(args: &RunArgs) -> Result<i32, i32> {
    let program = Program::load(&args.input).map_err(|e| {
        report_load_error(&e);
        1
    })?;
    let config = SessionConfig {
        entry: args.entry.clone(),
        stack_top: args.stack_top,
        stack_size: args.stack_size,
        collect_counters: args.counters,
    };
    let mut session = Session::new(program, &config).map_err(|e| {
        report_load_error(&e);
        1
    })?;

    let outcome = session.run(args.max_steps);
    match &outcome.stop {
        StopReason::Exited(_) => {}
        StopReason::Fault(_) | StopReason::NoInstruction(_) => {
            let pc = session.engine().pc();
            let line = session.program().instruction(pc).map(|i| i.line);
            match line {
                Some(line) => eprintln!(
                    "{}:{line}: error: {} at {pc:#010x}",
                    args.input.display(),
                    outcome.stop
                ),
                None => eprintln!("error: {}", outcome.stop),
            }
        }
        StopReason::StepLimit => eprintln!("error: {} after {} steps", outcome.stop, outcome.steps),
    }

    if args.counters && !args.dump_state {
        if let Some(counters) = session.engine().counters() {
            eprintln!(
                "executed {} skipped {} faults {}",
                counters.executed,
                counters.skipped,
                counters.total_faults()
            );
            for (entry, hits) in counters.hottest().into_iter().take(10) {
                eprintln!("{hits:>10}  {entry}");
            }
        }
    }

    if args.dump_state {
        match serde_json::to_string_pretty(&session.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize state: {e}");
                return Err(1);
            }
        }
    }

    Ok(exit_status(&outcome.stop))
}

fn run_check(args: &CheckArgs) -> Result<(), i32> {
    let program = Program::load(&args.input).map_err(|e| {
        report_load_error(&e);
        1
    })?;
    let registry = InstructionRegistry::standard().map_err(|e| {
        error!(%e, "instruction registry failed to build");
        1
    })?;

    let mut failures = 0_usize;
    for listed in program.instructions() {
        if let Err(fault) = registry.resolve(&listed.mnemonic, &listed.operands, listed.address) {
            failures += 1;
            eprintln!(
                "{}:{}: error: {} {}: {fault}",
                args.input.display(),
                listed.line,
                listed.mnemonic,
                listed.operands
            );
        }
    }

    println!(
        "Checked {} instructions in {}: {failures} failed",
        program.len(),
        args.input.display()
    );
    if failures == 0 {
        Ok(())
    } else {
        Err(1)
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => {
            init_tracing(args.verbose);
            run_program(&args).unwrap_or_else(|code| code)
        }
        Ok(ParseResult::Command(Command::Check(args))) => {
            init_tracing(false);
            match run_check(&args) {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use thumb_core::{Fault, Word};

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_run_command_with_options() {
        let result = parse_run_args(
            os(&[
                "app.lst",
                "--entry",
                "reset",
                "--stack-top",
                "0x20004000",
                "--max-steps",
                "500",
                "--dump-state",
                "-v",
            ])
            .into_iter(),
        )
        .expect("valid run args should parse");

        assert_eq!(
            result,
            RunArgs {
                input: PathBuf::from("app.lst"),
                entry: Some("reset".into()),
                stack_top: 0x2000_4000,
                stack_size: DEFAULT_STACK_SIZE,
                max_steps: 500,
                counters: false,
                dump_state: true,
                verbose: true,
            }
        );
    }

    #[test]
    fn parses_check_command() {
        let result = parse_check_args(os(&["app.lst"]).into_iter())
            .expect("valid check args should parse");
        assert_eq!(
            result,
            CheckArgs {
                input: PathBuf::from("app.lst"),
            }
        );
    }

    #[test]
    fn parses_help_flag() {
        let result =
            parse_args(os(&["--help"]).into_iter()).expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_command() {
        let error = parse_args(os(&["build"]).into_iter())
            .expect_err("unknown command should fail parse");
        assert!(error.contains("unknown command"));
    }

    #[test]
    fn rejects_bad_numbers() {
        let error = parse_run_args(os(&["app.lst", "--stack-top", "0x1_0000_0000"]).into_iter())
            .expect_err("out of range");
        assert!(error.contains("--stack-top"));
        let error = parse_run_args(os(&["app.lst", "--max-steps"]).into_iter())
            .expect_err("missing value");
        assert!(error.contains("missing value"));
    }

    #[test]
    fn parse_run_missing_input() {
        let error = parse_run_args(std::iter::empty()).expect_err("missing input should fail");
        assert!(error.contains("missing input"));
    }

    #[test]
    fn exit_status_follows_the_stop_reason() {
        assert_eq!(exit_status(&StopReason::Exited(Word::new(3))), 3);
        assert_eq!(exit_status(&StopReason::Exited(Word::new(0x101))), 1);
        assert_eq!(exit_status(&StopReason::StepLimit), 1);
        assert_eq!(
            exit_status(&StopReason::Fault(Fault::invalid("x"))),
            1
        );
    }
}

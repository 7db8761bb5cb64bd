//! CLI entry point for the `ibp` branch-prediction workbench.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use ibp_core::{
    iteration_table, verify, ConfigError, CounterMode, PaceControl, Pacer, PredictorConfig, Session,
    SiteAccuracy, Stepper, TraceEvent, TraceSink, DEFAULT_HISTORY_BITS, DEFAULT_TABLE_SIZE,
};
use ibp_frontend::load;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: ibp <command> [options]

Commands:
  check <input>            Parse and scope-check a program
  run   <input> [options]  Step a program through the branch predictor

Run options:
      --steps <N>        Statements to execute (default: 100)
      --table-size <M>   Entries per predictor table (default: 16)
      --counter <1|2>    Counter width in bits (default: 2)
      --history <P>      Global history bits; 2^P tables (default: 2)
      --seed <S>         Seed for rand(..) (default: 0)
      --delay-ms <D>     Pause between steps in milliseconds (default: 0)
      --trace            Print every execution event to stderr
  -h, --help             Show this help message

Inputs ending in .md contribute only their ```ibp fenced blocks.

Examples:
  ibp check loop.ibp
  ibp run loop.ibp --steps 500 --counter 1 --history 0
  ibp run lesson.md --delay-ms 250 --trace
";

const DEFAULT_STEPS: u32 = 100;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Check(CheckArgs),
    Run(RunArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct CheckArgs {
    input: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    steps: u32,
    table_size: Option<i64>,
    counter: Option<String>,
    history: Option<i64>,
    seed: u64,
    delay_ms: u64,
    trace: bool,
}

impl RunArgs {
    fn predictor_config(&self) -> Result<PredictorConfig, ConfigError> {
        if self.table_size.is_none() && self.counter.is_none() && self.history.is_none() {
            return Ok(PredictorConfig::default());
        }
        let table_size = self
            .table_size
            .unwrap_or_else(|| i64::try_from(DEFAULT_TABLE_SIZE).unwrap_or(i64::MAX));
        let counter = self
            .counter
            .clone()
            .unwrap_or_else(|| CounterMode::default().bits().to_string());
        let history = self
            .history
            .unwrap_or_else(|| i64::from(DEFAULT_HISTORY_BITS));
        PredictorConfig::from_raw(table_size, &counter, history)
    }
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
        "check" => parse_check_args(args)
            .map(Command::Check)
            .map(ParseResult::Command),
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
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

fn flag_value<T: FromStr>(flag: &str, value: Option<OsString>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    text.trim()
        .parse()
        .map_err(|_| format!("invalid value for {flag}: {text}"))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut run = RunArgs {
        input: PathBuf::new(),
        steps: DEFAULT_STEPS,
        table_size: None,
        counter: None,
        history: None,
        seed: 0,
        delay_ms: 0,
        trace: false,
    };

    while let Some(arg) = args.next() {
        let flag = arg.to_string_lossy().to_string();
        match flag.as_str() {
            "--help" | "-h" => return Err(USAGE_TEXT.to_string()),
            "--trace" => run.trace = true,
            "--steps" => run.steps = flag_value(&flag, args.next())?,
            "--table-size" => run.table_size = Some(flag_value(&flag, args.next())?),
            "--counter" => run.counter = Some(flag_value(&flag, args.next())?),
            "--history" => run.history = Some(flag_value(&flag, args.next())?),
            "--seed" => run.seed = flag_value(&flag, args.next())?,
            "--delay-ms" => run.delay_ms = flag_value(&flag, args.next())?,
            other if other.starts_with('-') => return Err(format!("unknown option: {other}")),
            _ => {
                if input.is_some() {
                    return Err("multiple input paths provided".to_string());
                }
                input = Some(PathBuf::from(arg));
            }
        }
    }

    run.input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(run)
}

struct SleepPacer {
    delay: Duration,
}

impl Pacer for SleepPacer {
    fn pause(&mut self) -> PaceControl {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        PaceControl::Continue
    }
}

struct StderrTrace {
    enabled: bool,
}

impl TraceSink for StderrTrace {
    fn on_event(&mut self, event: TraceEvent) {
        if self.enabled {
            eprintln!("trace: {}", describe_event(event));
        }
    }
}

fn describe_event(event: TraceEvent) -> String {
    match event {
        TraceEvent::StatementExecuted { lines } => format!("line {lines}"),
        TraceEvent::BranchResolved { pc, taken } => {
            format!("branch pc={pc} {}", outcome_word(taken))
        }
        TraceEvent::PredictionRecorded {
            pc,
            predicted,
            correct,
        } => format!(
            "predict pc={pc} {} ({})",
            outcome_word(predicted),
            if correct { "hit" } else { "miss" }
        ),
        TraceEvent::IterationStarted { iteration } => format!("iteration {iteration}"),
    }
}

const fn outcome_word(taken: bool) -> &'static str {
    if taken {
        "taken"
    } else {
        "not-taken"
    }
}

fn format_accuracy(site: SiteAccuracy) -> String {
    site.ratio().map_or_else(
        || format!("{}/{} (n/a)", site.correct, site.total),
        |ratio| format!("{}/{} ({:.1}%)", site.correct, site.total, ratio * 100.0),
    )
}

fn run_check(args: &CheckArgs) -> Result<(), i32> {
    let loaded = load(&args.input).map_err(|e| {
        eprintln!("{e}");
        1
    })?;

    if let Err(e) = verify(&iteration_table(0), &loaded.program) {
        eprintln!("{}: error: {e}", args.input.display());
        return Err(1);
    }

    println!(
        "{}: ok ({} top-level statements, {} branch sites)",
        args.input.display(),
        loaded.program.statements().len(),
        loaded.program.branch_sites().len()
    );
    Ok(())
}

fn run_program(args: &RunArgs) -> Result<(), i32> {
    let loaded = load(&args.input).map_err(|e| {
        eprintln!("{e}");
        1
    })?;
    let config = args.predictor_config().map_err(|e| {
        eprintln!("error: invalid predictor configuration: {e}");
        1
    })?;

    let mut session = Session::with_seed(config, args.seed);
    let report = |e: ibp_core::SessionError| {
        eprintln!("{}: error: {e}", args.input.display());
        1
    };
    session.compile(loaded.program).map_err(report)?;
    let ticket = session.begin_auto_run(args.steps).map_err(report)?;
    let mut pacer = SleepPacer {
        delay: Duration::from_millis(args.delay_ms),
    };
    let mut trace = StderrTrace {
        enabled: args.trace,
    };
    let executed = session
        .run_paced(ticket, &mut pacer, &mut trace)
        .map_err(report)?;

    print_report(&session, executed);
    Ok(())
}

fn print_report(session: &Session, executed: u32) {
    let bank = session.bank();
    let config = bank.config();
    let iteration = session.stepper().map_or(0, Stepper::iteration);

    println!(
        "Executed {executed} statements, now in iteration {iteration} \
         (predictor: {} entries, {}, {} history bits)",
        config.table_size(),
        config.mode(),
        config.history_bits()
    );
    if config.history_bits() > 0 {
        println!("History: {}", bank.history_string());
    }

    for (index, table) in bank.tables().iter().enumerate() {
        let cells: Vec<&str> = table.entries().iter().map(|state| state.label()).collect();
        println!("Table {index}: {}", cells.join(" "));
    }

    let accuracy = session.accuracy();
    println!("Accuracy: {}", format_accuracy(accuracy.global()));
    for (pc, site) in accuracy.sites() {
        println!("  line {pc}: {}", format_accuracy(site));
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Check(args))) => match run_check(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Run(args))) => match run_program(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
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

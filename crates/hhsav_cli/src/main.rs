use std::fs;
use std::path::{Path as FsPath, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use hhsav_core::config::EditorConfig;
use hhsav_core::core_api::{ApplyOutcome, EditMode, Engine, Rejection, Session};
use hhsav_core::diagnostics::{Diagnostic, RuleEngine, TextCheck, auto_fix};
use hhsav_core::label_format::format_path_label;
use hhsav_core::overlay::OverlayAction;
use hhsav_core::parser;
use hhsav_core::path::Path;
use serde_json::{Value as JsonValue, json};
use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "HHSAV_LOG";
const DEFAULT_FIX_PASSES: usize = 8;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML file with lock policies, input validation and log settings.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the selected part of a save as editor text.
    Show {
        #[arg(value_name = "SAVE")]
        save: PathBuf,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Diagnose a JSON text file the way the editor would.
    Check {
        #[arg(value_name = "TEXT")]
        text: PathBuf,
        /// Selected path the text belongs to; used for bare field values.
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Repeatedly apply suggested repairs to a JSON text file.
    Fix {
        #[arg(value_name = "TEXT")]
        text: PathBuf,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long, default_value_t = DEFAULT_FIX_PASSES)]
        passes: usize,
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Replace the value at --path with the contents of --text.
    Apply {
        #[arg(value_name = "SAVE")]
        save: PathBuf,
        #[arg(long)]
        path: String,
        #[arg(long, value_name = "FILE")]
        text: PathBuf,
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
        /// Record the edit as coming from a form field rather than the JSON view.
        #[arg(long)]
        input_mode: bool,
    },
    /// Write a single JSON value at --path, creating the next list slot if needed.
    Set {
        #[arg(value_name = "SAVE")]
        save: PathBuf,
        #[arg(long)]
        path: String,
        #[arg(long)]
        value: String,
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {e}", path.display());
            process::exit(2);
        }),
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::Show { save, path, json } => {
            let session = open_session(&config, &save, &path);
            run_show(&session, json);
        }
        Command::Check { text, path, json } => {
            let text = read_text(&text);
            process::exit(run_check(&text, &Path::parse(&path), json));
        }
        Command::Fix {
            text,
            path,
            passes,
            output,
        } => {
            let text = read_text(&text);
            process::exit(run_fix(&text, &Path::parse(&path), passes, output.as_deref()));
        }
        Command::Apply {
            save,
            path,
            text,
            output,
            input_mode,
        } => {
            let mut session = open_session(&config, &save, &path);
            if input_mode {
                session.set_mode(EditMode::Input);
            }
            let text = read_text(&text);
            let outcome = session.apply(&text);
            finish_edit(&session, outcome, &save, &output);
        }
        Command::Set {
            save,
            path,
            value,
            output,
        } => {
            let mut session = open_session(&config, &save, "");
            session.set_mode(EditMode::Input);
            let value: JsonValue = parser::parse_document(&value).unwrap_or_else(|e| {
                eprintln!("Error parsing --value: {e}");
                process::exit(2);
            });
            let target = Path::parse_against(session.document(), &path);
            let outcome = session.set_nested_value(&target, value).unwrap_or_else(|e| {
                eprintln!("Error setting {path}: {e}");
                process::exit(1);
            });
            finish_edit(&session, outcome, &save, &output);
        }
    }
}

fn init_logging(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn read_text(path: &FsPath) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        process::exit(1);
    })
}

fn open_session(config: &EditorConfig, save: &FsPath, path: &str) -> Session {
    let engine = Engine::with_config(config.clone()).unwrap_or_else(|e| {
        eprintln!("Error loading lock policies: {e}");
        process::exit(2);
    });
    let bytes = fs::read(save).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", save.display());
        process::exit(1);
    });
    let mut session = engine.open_bytes(bytes).unwrap_or_else(|e| {
        eprintln!("Error parsing save file: {}", save.display());
        eprintln!("  {e}");
        process::exit(1);
    });
    session.select_str(path).unwrap_or_else(|e| {
        eprintln!("Error selecting {path:?}: {e}");
        process::exit(1);
    });
    session
}

fn run_show(session: &Session, json: bool) {
    let text = session.selected_text().unwrap_or_else(|e| {
        eprintln!("Error reading selection: {e}");
        process::exit(1);
    });
    let label = format_path_label(session.selection());
    let locked = session.highlight_fields();

    if json {
        let rendered = json!({
            "path": session.selection().to_string(),
            "label": label,
            "locked": locked,
            "value": session.selected_value().ok(),
        });
        print_json(&rendered);
        return;
    }

    println!("# {label}");
    if !locked.is_empty() {
        println!("# locked: {}", locked.join(", "));
    }
    println!("{text}");
}

/// Exit status 1 when the text fails to parse or carries a blocking finding.
fn run_check(text: &str, selected: &Path, json: bool) -> i32 {
    let check = RuleEngine::new().check(text, selected);
    let (parses, diagnostics) = match &check {
        TextCheck::Parsed { advisories, .. } => (true, advisories.clone()),
        TextCheck::Failed { diagnostic, .. } => (false, vec![diagnostic.clone()]),
    };
    let blocked = !parses || diagnostics.iter().any(|d| d.rule.blocks_apply());

    if json {
        let mut rendered = json!({
            "parses": parses,
            "diagnostics": diagnostics,
        });
        if let TextCheck::Failed { error, .. } = &check {
            rendered["error"] = json!({
                "message": error.message,
                "line": error.line,
                "column": error.column,
            });
        }
        print_json(&rendered);
    } else {
        if let TextCheck::Failed { error, .. } = &check {
            println!("parse error: {error}");
        }
        for diagnostic in &diagnostics {
            print_diagnostic(diagnostic);
        }
        if !blocked && diagnostics.is_empty() {
            println!("ok");
        }
    }

    i32::from(blocked)
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    println!(
        "{} line={} cols={}..{}",
        diagnostic.note(),
        diagnostic.line,
        diagnostic.start_column,
        diagnostic.end_column
    );
    println!("  before: {}", diagnostic.before_text);
    if diagnostic.has_fix() {
        println!("  after:  {}", diagnostic.after_text);
    }
}

fn run_fix(text: &str, selected: &Path, passes: usize, output: Option<&FsPath>) -> i32 {
    let report = auto_fix(text, selected, passes);
    for diagnostic in &report.applied {
        eprintln!("fixed {} on line {}", diagnostic.note(), diagnostic.line);
    }

    match output {
        Some(path) => fs::write(path, &report.text).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", path.display());
            process::exit(1);
        }),
        None => print!("{}", report.text),
    }

    if report.parses {
        0
    } else {
        eprintln!("text still does not parse");
        1
    }
}

fn finish_edit(session: &Session, outcome: ApplyOutcome, save: &FsPath, output: &FsPath) {
    let advisories = match outcome {
        ApplyOutcome::Rejected(rejection) => {
            print_rejection(&rejection);
            process::exit(1);
        }
        ApplyOutcome::Accepted {
            note, advisories, ..
        } => {
            if let Some(note) = note {
                println!("{note}");
            }
            advisories
        }
    };
    for diagnostic in &advisories {
        eprintln!("warning: {} on line {}", diagnostic.note(), diagnostic.line);
    }

    let compress = fs::read(save)
        .map(|bytes| parser::is_compressed(&bytes))
        .unwrap_or(false);
    let bytes = session.to_bytes(compress).unwrap_or_else(|e| {
        eprintln!("Error creating modified save bytes: {e}");
        process::exit(1);
    });
    fs::write(output, bytes).unwrap_or_else(|e| {
        eprintln!("Error writing {}: {e}", output.display());
        process::exit(1);
    });
    println!("Wrote edited save to {}", output.display());
}

fn print_rejection(rejection: &Rejection) {
    let overlay = &rejection.overlay;
    eprintln!("{}: {}", overlay.title, rejection.note);
    for line in overlay.message.lines() {
        eprintln!("  {line}");
    }
    if let Some(before) = &overlay.before {
        eprintln!("  before: {before}");
    }
    if let Some(after) = &overlay.after {
        eprintln!("  after:  {after}");
    }
    for action in &overlay.actions {
        match action {
            OverlayAction::AutoFix { label, line, .. } => {
                eprintln!("  [{label}] available for line {line}");
            }
        }
    }
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

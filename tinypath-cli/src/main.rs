use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind, Source};
use tinypath::{CompileError, Value};
use tinypath_data_model::{Format, ParseError};
use tinypath_format_json::Json;
use tracing::debug;

fn report_config() -> Config {
    Config::default().with_index_type(IndexType::Byte)
}

fn report_parse_errors(source: &str, errors: &[ParseError]) {
    for error in errors {
        let filename = &*error.span.filename;
        let span = error.span.start..error.span.end;
        let _ = Report::build(ReportKind::Error, (filename, span.clone()))
            .with_config(report_config())
            .with_message(&error.message)
            .with_label(Label::new((filename, span)).with_message("error occurred here"))
            .finish()
            .eprint((filename, Source::from(source)));
    }
}

fn display_compile_error(path: &str, error: &CompileError) {
    let source_id = "path";
    let end = (error.position + error.text.len()).max(error.position + 1);
    let span = error.position..end;
    let found = error.found();

    let _ = Report::build(ReportKind::Error, (source_id, span.clone()))
        .with_config(report_config().with_color(true))
        .with_message(error.message())
        .with_label(
            Label::new((source_id, span))
                .with_message(format!("found {}", found.fg(Color::Red)))
                .with_color(Color::Red),
        )
        .finish()
        .eprint((source_id, Source::from(path)));
}

#[derive(clap::Parser)]
#[command(name = "tinypath", version, about = "Select values from JSON documents with $.path expressions")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); TINYPATH_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Evaluate a path against a JSON document (read from stdin by default)
    Query {
        path: String,
        /// Raw JSON text
        #[arg(short, long, conflicts_with = "file")]
        json: Option<String>,
        /// JSON file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print the tokens of a path
    Tokens { path: String },
    /// Print the compiled program of a path as JSON
    Compile { path: String },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("TINYPATH_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_document(json: Option<String>, file: Option<PathBuf>) -> anyhow::Result<(String, String)> {
    if let Some(json) = json {
        return Ok((json, "<json>".to_owned()));
    }
    if let Some(file) = file {
        let source = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        return Ok((source, file.display().to_string()));
    }
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("reading stdin")?;
    Ok((source, "<stdin>".to_owned()))
}

fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Query { path, json, file } => {
            let program = match tinypath::compile(&path) {
                Ok(program) => program,
                Err(error) => {
                    display_compile_error(&path, &error);
                    return Ok(ExitCode::FAILURE);
                }
            };
            let (source, filename) = read_document(json, file)?;
            let document: Value = match Json.parse(&source, &filename) {
                Ok(document) => document,
                Err(errors) => {
                    eprintln!("Failed to parse JSON:");
                    report_parse_errors(&source, &errors);
                    return Ok(ExitCode::FAILURE);
                }
            };
            debug!(%program, %filename, "evaluating");
            match tinypath::evaluate(&program, &document) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&*result)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(error) => {
                    eprintln!("error: {error}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Tokens { path } => {
            for token in tinypath_parser::tokenize(&path) {
                println!("{:>4}  {:<14} {:?}", token.position, format!("{:?}", token.kind), token.text);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compile { path } => match tinypath::compile(&path) {
            Ok(program) => {
                println!("{}", serde_json::to_string_pretty(&program)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(error) => {
                display_compile_error(&path, &error);
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

fn main() -> ExitCode {
    use clap::Parser;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

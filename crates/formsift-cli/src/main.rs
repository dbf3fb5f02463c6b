//! formsift — extract structured records from OCR'd police and medico-legal forms.

use std::path::PathBuf;

use formsift_core::FamilyRegistry;
use formsift_runtime::{load_document, stdin_document, BatchRunner, Document};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
formsift — field extraction for FIR, medical examination and witness statement forms

Usage: formsift <command> [options]

Commands:
  extract [options] <file>...   Extract one JSON record per file ('-' reads stdin)
  families [--families DIR]     List the configured document families
  help                          Show this help message

Extract options:
  --family <name|auto>          Family to extract as (default: auto-detect)
  --families <dir>              Load family tables from a directory
  --pretty                      Pretty-print JSON output

Environment:
  FORMSIFT_FAMILY_DIR           Directory of family tables (overridden by --families)
  FORMSIFT_WORKERS              Maximum documents extracted concurrently
  RUST_LOG                      Log filter (default: info)";

/// Parsed `extract` options.
#[derive(Debug, Default, PartialEq)]
struct ExtractArgs {
    family: Option<String>,
    families_dir: Option<PathBuf>,
    pretty: bool,
    inputs: Vec<String>,
}

fn parse_extract_args(args: &[String]) -> anyhow::Result<ExtractArgs> {
    let mut parsed = ExtractArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--family" => {
                let family = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--family needs a value"))?;
                parsed.family = (family != "auto").then(|| family.clone());
            }
            "--families" => {
                let dir = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--families needs a directory"))?;
                parsed.families_dir = Some(PathBuf::from(dir));
            }
            "--pretty" => parsed.pretty = true,
            flag if flag.starts_with("--") => anyhow::bail!("Unknown option: {}", flag),
            input => parsed.inputs.push(input.to_string()),
        }
    }
    if parsed.inputs.is_empty() {
        anyhow::bail!("No input files. Use 'formsift help' for usage.");
    }
    Ok(parsed)
}

fn load_registry(families_dir: Option<&PathBuf>) -> anyhow::Result<FamilyRegistry> {
    let registry = match families_dir {
        Some(dir) => FamilyRegistry::from_dir(dir)?,
        None => FamilyRegistry::from_env()?,
    };
    Ok(registry)
}

fn families_dir_flag(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|a| a == "--families")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}

fn print_json(value: &serde_json::Value, pretty: bool) -> anyhow::Result<()> {
    let line = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", line);
    Ok(())
}

async fn run_extract(args: ExtractArgs) -> anyhow::Result<bool> {
    let registry = load_registry(args.families_dir.as_ref())?;
    if let Some(family) = &args.family {
        registry.get(family)?;
    }
    let runner = BatchRunner::new(registry)?;

    let mut documents = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let document: Document = if input == "-" {
            stdin_document()?
        } else {
            load_document(&PathBuf::from(input))?
        };
        documents.push(match &args.family {
            Some(family) => document.with_family(family),
            None => document,
        });
    }

    info!("Extracting {} document(s)", documents.len());
    let report = runner.run(documents).await;

    for record in &report.records {
        print_json(&record.to_output(), args.pretty)?;
    }
    for failure in &report.failures {
        print_json(&serde_json::to_value(failure)?, args.pretty)?;
    }
    Ok(report.failures.is_empty())
}

fn run_families(args: &[String]) -> anyhow::Result<()> {
    let registry = load_registry(families_dir_flag(args).as_ref())?;
    for family in registry.iter() {
        println!(
            "{:<18} {:>3} fields  {}",
            family.family,
            family.labels.len(),
            family.description
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        println!("{}", USAGE);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "extract" => {
            let extract_args = parse_extract_args(&args[2..])?;
            let all_extracted = run_extract(extract_args).await?;
            std::process::exit(if all_extracted { 0 } else { 2 });
        }
        "families" => run_families(&args[2..]),
        "--help" | "-h" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}. Use 'formsift help' for usage.", other);
            std::process::exit(1);
        }
    }
}

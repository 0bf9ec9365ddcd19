mod render;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ipt_core::{RulesetDiff, RulesetSummary};
use ipt_save::{DEFAULT_DUMP_FILE, DumpLoader, Family, SaveCapture};
use render::{OutputFormat, render_chain, render_ruleset};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iptparse")]
#[command(version, about = "Parse iptables-save dumps into structured rulesets", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a saved dump and print the ruleset
    Parse {
        /// Dump file, or - for stdin
        #[arg(short, long, default_value = DEFAULT_DUMP_FILE)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Per-table and per-chain counts
    Summary {
        #[arg(short, long, default_value = DEFAULT_DUMP_FILE)]
        file: PathBuf,
    },
    /// Print the rules of one chain
    Chain {
        #[arg(short, long, default_value = DEFAULT_DUMP_FILE)]
        file: PathBuf,
        #[arg(short, long, default_value = "filter")]
        table: String,
        #[arg(short, long)]
        chain: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Compare two dumps; exits 1 when they differ
    Diff {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
    },
    /// Run iptables-save and parse its output
    Capture {
        /// Save program to run instead of iptables-save / ip6tables-save
        #[arg(long)]
        program: Option<String>,
        #[arg(long)]
        ipv6: bool,
        #[arg(short, long)]
        table: Option<String>,
        /// Include packet and byte counters
        #[arg(short, long)]
        counters: bool,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Parse { file, format } => {
            let ruleset = DumpLoader::new().load_ruleset(&file)?;
            print!("{}", render_ruleset(&ruleset, format)?);
        }
        Commands::Summary { file } => {
            let ruleset = DumpLoader::new().load_ruleset(&file)?;
            RulesetSummary::from_ruleset(&ruleset).display();
        }
        Commands::Chain {
            file,
            table,
            chain,
            format,
        } => handle_chain(&file, &table, &chain, format)?,
        Commands::Diff { old, new } => {
            if !handle_diff(&old, &new)? {
                std::process::exit(1);
            }
        }
        Commands::Capture {
            program,
            ipv6,
            table,
            counters,
            format,
        } => {
            let family = if ipv6 { Family::V6 } else { Family::V4 };
            let check_available = program.is_none();
            let mut capture = match program {
                Some(program) => SaveCapture::with_program(program),
                None => SaveCapture::new(family),
            }
            .counters(counters);
            if let Some(table) = table {
                capture = capture.table(table);
            }

            tokio::runtime::Runtime::new()?.block_on(async {
                handle_capture(&capture, check_available, format).await
            })?;
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_chain(
    file: &std::path::Path,
    table: &str,
    chain: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let ruleset = DumpLoader::new().load_ruleset(file)?;
    let table_ref = ruleset
        .table(table)
        .with_context(|| format!("Table '{}' not found in {:?}", table, file))?;
    let chain_ref = table_ref
        .chain(chain)
        .with_context(|| format!("Chain '{}' not found in table '{}'", chain, table))?;

    print!("{}", render_chain(chain_ref, format)?);
    Ok(())
}

/// Returns whether the two dumps parse to the same ruleset.
fn handle_diff(old: &std::path::Path, new: &std::path::Path) -> anyhow::Result<bool> {
    let loader = DumpLoader::new();
    let old_ruleset = loader.load_ruleset(old)?;
    let new_ruleset = loader.load_ruleset(new)?;

    let diff = RulesetDiff::between_labeled(
        &old_ruleset,
        &new_ruleset,
        &old.display().to_string(),
        &new.display().to_string(),
    )?;
    debug!(matches = diff.matches, "compared rulesets");
    match &diff.diff {
        None => println!("✅ Rulesets match"),
        Some(text) => print!("{}", text),
    }

    Ok(diff.matches)
}

async fn handle_capture(
    capture: &SaveCapture,
    check_available: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if check_available && !capture.is_available().await {
        anyhow::bail!(
            "{} is not available; install iptables or pass --program",
            capture.program()
        );
    }

    let ruleset = capture.capture_ruleset().await?;
    print!("{}", render_ruleset(&ruleset, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dump_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const DUMP: &str = "*filter\n:INPUT DROP [0:0]\n-A INPUT -i lo -j ACCEPT\nCOMMIT\n";

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn capture_flags_parse() {
        let cli = Cli::try_parse_from(["iptparse", "capture", "--ipv6", "-t", "nat", "-c"]).unwrap();
        match cli.command {
            Commands::Capture {
                ipv6,
                table,
                counters,
                program,
                format,
            } => {
                assert!(ipv6);
                assert!(counters);
                assert_eq!(table.as_deref(), Some("nat"));
                assert!(program.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected capture command"),
        }
    }

    #[test]
    fn diff_of_identical_dumps_matches() {
        let old = dump_file(DUMP);
        let new = dump_file(DUMP);
        assert!(handle_diff(old.path(), new.path()).unwrap());
    }

    #[test]
    fn diff_detects_policy_change() {
        let old = dump_file(DUMP);
        let new = dump_file(&DUMP.replace("INPUT DROP", "INPUT ACCEPT"));
        assert!(!handle_diff(old.path(), new.path()).unwrap());
    }

    #[test]
    fn missing_chain_is_reported() {
        let file = dump_file(DUMP);
        let err = handle_chain(file.path(), "filter", "OUTPUT", OutputFormat::Text).unwrap_err();
        assert!(err.to_string().contains("Chain 'OUTPUT' not found"));

        assert!(handle_chain(file.path(), "filter", "INPUT", OutputFormat::Text).is_ok());
    }
}

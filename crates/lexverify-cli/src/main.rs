mod display;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use lexverify_core::RuleSet;
use lexverify_engine::{Engine, ReferenceGraph};
use lexverify_store::JsonStore;
use tracing::{Level, info};

use crate::report::ReportFormat;

#[derive(Parser)]
#[command(name = "lexverify")]
#[command(about = "Verify a statutory interpretation against a provision corpus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a claim and write a verdict report
    Check(CheckArgs),

    /// List provisions, reference edges and dangling references
    Graph {
        #[arg(long, env = "LEXVERIFY_DATA_DIR")]
        data_dir: PathBuf,

        /// Show what one provision depends on and what depends on it
        #[arg(long)]
        provision: Option<String>,

        /// Hop limit for the dependency chain
        #[arg(long, default_value_t = 8)]
        depth: usize,
    },

    /// Print the built-in rule set, or validate and print one from a file
    Ruleset {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Directory of provision JSON files
    #[arg(long, env = "LEXVERIFY_DATA_DIR")]
    data_dir: PathBuf,

    /// Claim JSON file
    #[arg(long)]
    claim: PathBuf,

    /// Precedent records JSON file
    #[arg(long)]
    precedents: Option<PathBuf>,

    /// Rule set JSON file (defaults to the built-in v1 table)
    #[arg(long, env = "LEXVERIFY_RULESET")]
    ruleset: Option<PathBuf>,

    /// Externally computed text-support score, replacing the clause count
    #[arg(long)]
    text_score: Option<u32>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    format: ReportFormat,

    /// Directory for the timestamped report
    #[arg(long, default_value = "reports")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    info!("lexverify v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Check(args) => cmd_check(args),
        Commands::Graph {
            data_dir,
            provision,
            depth,
        } => cmd_graph(&data_dir, provision.as_deref(), depth),
        Commands::Ruleset { file } => cmd_ruleset(file.as_deref()),
    }
}

fn load_ruleset(path: Option<&Path>) -> anyhow::Result<RuleSet> {
    match path {
        Some(p) => {
            RuleSet::from_path(p).with_context(|| format!("loading rule set {}", p.display()))
        }
        None => Ok(RuleSet::default()),
    }
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let engine = Engine::new(load_ruleset(args.ruleset.as_deref())?)
        .context("rule set is not usable by this engine")?;

    let store = JsonStore::open(&args.data_dir)?;
    let provisions = store.load_provisions()?;
    let claim = JsonStore::load_claim(&args.claim)?;
    let precedents = args
        .precedents
        .as_deref()
        .map(JsonStore::load_precedents)
        .transpose()?;

    let verdict = engine
        .evaluate_with_text(&provisions, &claim, precedents.as_deref(), args.text_score)
        .context("evaluation aborted")?;

    let rendered = report::render(&verdict, args.format)?;
    let path = report::write_report(
        &args.output_dir,
        args.format,
        &rendered,
        Local::now().naive_local(),
    )?;

    display::print_summary(&verdict);
    println!();
    println!("Report written to {}", path.display());
    Ok(())
}

fn cmd_graph(data_dir: &Path, provision: Option<&str>, depth: usize) -> anyhow::Result<()> {
    let provisions = JsonStore::open(data_dir)?.load_provisions()?;
    let graph = ReferenceGraph::build(&provisions).context("building reference graph")?;
    match provision {
        Some(id) => {
            let idx = graph
                .index_of(id)
                .with_context(|| format!("provision {id} is not in {}", data_dir.display()))?;
            display::print_dependencies(&graph, idx, depth);
        }
        None => display::print_graph(&graph),
    }
    Ok(())
}

fn cmd_ruleset(file: Option<&Path>) -> anyhow::Result<()> {
    let ruleset = load_ruleset(file)?;
    // Resolve checks and principles against the engine registries.
    Engine::new(ruleset.clone()).context("rule set is not usable by this engine")?;
    println!("{}", ruleset.to_json_pretty()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn package_metadata_comes_from_the_workspace() {
        assert_eq!(Cli::command().get_version(), Some("0.1.0"));
        assert_eq!(env!("CARGO_PKG_LICENSE"), "AGPL-3.0-or-later");
        assert_eq!(env!("CARGO_PKG_REPOSITORY"), "");
    }

    #[test]
    fn check_defaults_to_markdown_in_reports() {
        let cli = Cli::try_parse_from(["lexverify", "check", "--data-dir", "d", "--claim", "c.json"])
            .unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.format, ReportFormat::Markdown);
                assert_eq!(args.output_dir, PathBuf::from("reports"));
                assert!(args.precedents.is_none());
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn check_writes_a_report() {
        let tmp = tempfile::tempdir().unwrap();
        let data = data_dir();
        cmd_check(CheckArgs {
            data_dir: data.join("provisions"),
            claim: data.join("claims").join("single-dividend.json"),
            precedents: Some(data.join("precedents.json")),
            ruleset: Some(data.join("..").join("rulesets").join("v1.json")),
            text_score: None,
            format: ReportFormat::Json,
            output_dir: tmp.path().to_path_buf(),
        })
        .unwrap();
        let written: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[test]
    fn missing_data_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = cmd_graph(&tmp.path().join("absent"), None, 8);
        assert!(result.is_err());
    }

    #[test]
    fn graph_accepts_a_provision_filter() {
        let cli = Cli::try_parse_from([
            "lexverify",
            "graph",
            "--data-dir",
            "d",
            "--provision",
            "Regulation 143",
        ])
        .unwrap();
        match cli.command {
            Commands::Graph {
                provision, depth, ..
            } => {
                assert_eq!(provision.as_deref(), Some("Regulation 143"));
                assert_eq!(depth, RuleSet::default().traversal_depth);
            }
            _ => panic!("expected graph"),
        }
    }

    #[test]
    fn graph_lists_dependencies_of_a_known_provision() {
        let provisions = data_dir().join("provisions");
        cmd_graph(&provisions, None, 8).unwrap();
        cmd_graph(&provisions, Some("Regulation 143"), 8).unwrap();
    }

    #[test]
    fn unknown_provision_is_an_error() {
        let err = cmd_graph(&data_dir().join("provisions"), Some("Article 999"), 8).unwrap_err();
        assert!(err.to_string().contains("Article 999"));
    }
}

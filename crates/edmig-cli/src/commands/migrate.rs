//! Migrate command
//!
//! Usage: edmig migrate --strategy <ID> [-d <ID>]... [-i <ID>]... [--dry-run] [--yes]

use clap::Args;
use edmig_core::model::DocumentId;
use edmig_core::orchestrator::{AssumeYes, Confirm, MigrationReport};
use edmig_core::render::TemplatePipeline;
use edmig_core::{
    Collaborators, MigrationOrchestrator, MigrationRequest, MigrationSettings, MissingOldPolicy,
    StrategyDescriptor,
};
use edmig_store::SqliteRepo;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{FileConfig, Overrides, ResolvedConfig};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Target naming strategy
    #[arg(long)]
    pub strategy: String,

    /// Target strategy option as KEY=VALUE (repeatable)
    #[arg(long = "strategy-option", value_parser = parse_option)]
    pub strategy_options: Vec<(String, String)>,

    /// Strategy the stored names follow now (overrides [naming] current)
    #[arg(long)]
    pub current: Option<String>,

    /// Document to migrate (repeatable; default: all migratable documents)
    #[arg(short = 'd', long = "document", value_parser = parse_document_id)]
    pub documents: Vec<DocumentId>,

    /// Document to skip (repeatable)
    #[arg(short = 'i', long = "ignore", value_parser = parse_document_id)]
    pub ignore: Vec<DocumentId>,

    /// Admin account the previews render as
    #[arg(short, long, default_value = "admin")]
    pub user: String,

    /// Report the renames without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Continue past render failures without asking
    #[arg(short, long)]
    pub yes: bool,

    /// What to do when an old editable record is missing: warn (skip it) or fail
    #[arg(long, default_value = "warn")]
    pub on_missing: MissingOldPolicy,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Site domain (overrides [site] domain)
    #[arg(long)]
    pub domain: Option<String>,

    /// Default URL scheme (overrides [site] scheme)
    #[arg(long)]
    pub scheme: Option<String>,

    /// Store database (overrides [store] db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Config file (default: ./edmig.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_document_id(value: &str) -> Result<DocumentId, String> {
    value.parse().map_err(|e| format!("{}", e))
}

fn parse_option(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", value)),
    }
}

/// Asks on stderr, reads the answer from stdin; anything but yes declines
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        let mut stderr = std::io::stderr();
        if write!(stderr, "{} [y/N] ", question).is_err() || stderr.flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Execute migrate command, returning the process exit status
pub fn execute(args: MigrateArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let file = FileConfig::load(args.config.as_deref())?;
    let config = ResolvedConfig::merge(
        file,
        Overrides {
            db: args.db.clone(),
            domain: args.domain.clone(),
            scheme: args.scheme.clone(),
            current: args.current.clone(),
        },
    );
    tracing::debug!(db = %config.db.display(), current = %config.current, "Resolved configuration");

    if !config.db.exists() {
        return Err(format!("Store database not found: {}", config.db.display()).into());
    }
    let repo = SqliteRepo::open(&config.db)?;
    let pipeline = TemplatePipeline::new(&repo);

    let mut target = StrategyDescriptor::new(args.strategy.clone());
    for (key, value) in &args.strategy_options {
        target = target.with_option(key.clone(), value.clone());
    }

    let mut request = MigrationRequest::new(target, args.user.clone());
    request.documents = args.documents.clone();
    request.ignore = args.ignore.clone();
    request.dry_run = args.dry_run;
    request.missing_old_policy = args.on_missing;

    let mut settings =
        MigrationSettings::new(StrategyDescriptor::new(config.current.clone()), config.domain);
    settings.scheme = config.scheme;

    let collaborators = Collaborators {
        documents: &repo,
        elements: &repo,
        users: &repo,
        pipeline: &pipeline,
    };
    let mut orchestrator = MigrationOrchestrator::new(collaborators, settings);
    let report = if args.yes {
        orchestrator.run(&request, &mut AssumeYes)
    } else {
        orchestrator.run(&request, &mut StdinConfirm)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report, &config.current));
    }

    Ok(report.exit_code())
}

/// Human-readable report
fn render_report(report: &MigrationReport, current: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Run {}: {} -> {}\n",
        report.run_id, current, report.target
    ));

    if !report.rendered.is_empty() || !report.failures.is_empty() {
        out.push_str(&format!(
            "Rendered {} documents, {} failed\n",
            report.rendered.len(),
            report.failures.len()
        ));
    }
    for failure in &report.failures {
        out.push_str(&format!(
            "  ! {} ({}): {}\n",
            failure.path, failure.document_id, failure.message
        ));
    }

    for missing in &report.missing {
        out.push_str(&format!(
            "  ? [{}] {} not found, skipped\n",
            missing.document_id, missing.old_name
        ));
    }

    if let Some(applied) = &report.applied {
        let verb = if applied.dry_run {
            "Would rename"
        } else {
            "Renamed"
        };
        for rename in &applied.renames {
            out.push_str(&format!(
                "  {} [{}] {} -> {}\n",
                verb, rename.document_id, rename.old_name, rename.new_name
            ));
        }
    }

    out.push_str(&report.outcome.summary());
    out.push('\n');
    if let Some(hint) = report.outcome.hint() {
        out.push_str(&format!("Hint: {}\n", hint));
    }
    out
}

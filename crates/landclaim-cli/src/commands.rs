use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use landclaim_store::{DataStore, FlatFileDataStore, LoadedData, StoreConfig};
use serde::Serialize;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::resolve(cli.config.as_deref(), cli.root.clone())?;
    let format = cli.format;
    match cli.command {
        Command::Load => cmd_load(&config, &format),
        Command::NextId => cmd_next_id(&config, &format),
        Command::Migrate(args) => cmd_migrate(&config, args, &format),
    }
}

fn open_store(config: &CliConfig, store: StoreConfig) -> anyhow::Result<FlatFileDataStore> {
    let root = store.root.clone();
    FlatFileDataStore::open(
        store,
        Arc::new(config.world_registry()),
        Arc::new(config.name_resolver()),
    )
    .with_context(|| format!("cannot open data store at {}", root.display()))
}

#[derive(Debug, Serialize)]
struct LoadSummary {
    root: PathBuf,
    schema_version: u32,
    upgraded_to: Option<u32>,
    claims: usize,
    subdivisions: usize,
    admin_claims: usize,
    groups: usize,
    renamed_claims: usize,
    deleted_files: Vec<String>,
    skipped_files: Vec<String>,
    orphans_dropped: usize,
    players_renamed: usize,
}

impl LoadSummary {
    fn new(root: PathBuf, loaded: &LoadedData) -> Self {
        let report = &loaded.report;
        let claims = loaded.claims.len();
        Self {
            root,
            schema_version: report.schema_version,
            upgraded_to: report.upgraded_to,
            claims,
            subdivisions: loaded.claims.total_claims() - claims,
            admin_claims: loaded.claims.iter().filter(|c| c.is_admin_claim()).count(),
            groups: loaded.group_bonuses.len(),
            renamed_claims: report.renamed_claims.len(),
            deleted_files: report.deleted_files.clone(),
            skipped_files: report.skipped_files.clone(),
            orphans_dropped: report.orphans_dropped.len(),
            players_renamed: report.players_renamed,
        }
    }
}

fn cmd_load(config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let existed = FlatFileDataStore::has_data(&config.store.root);
    let store = open_store(config, config.store.clone())?;
    let loaded = store.load().context("failed to load claim data")?;
    let summary = LoadSummary::new(config.store.root.clone(), &loaded);

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if !existed {
        println!(
            "{} Created new data store in {}",
            "✓".green().bold(),
            summary.root.display().to_string().bold()
        );
    }
    println!("Schema version: {}", summary.schema_version.to_string().cyan());
    if let Some(version) = summary.upgraded_to {
        println!(
            "{} Upgraded claim data to schema {}",
            "✓".green().bold(),
            version.to_string().cyan()
        );
    }
    println!(
        "Claims: {} top-level ({} administrative), {} subdivisions",
        summary.claims.to_string().bold(),
        summary.admin_claims,
        summary.subdivisions
    );
    println!("Groups: {}", summary.groups.to_string().bold());
    if summary.renamed_claims > 0 {
        println!(
            "  {} {} claim files renamed to new IDs",
            "renamed:".yellow(),
            summary.renamed_claims
        );
    }
    if summary.players_renamed > 0 {
        println!("  {} {} player files keyed by ID", "renamed:".yellow(), summary.players_renamed);
    }
    for name in &summary.deleted_files {
        println!("  {} {}", "deleted:".red(), name);
    }
    for name in &summary.skipped_files {
        println!("  {} {}", "skipped:".yellow(), name);
    }
    if summary.orphans_dropped > 0 {
        println!(
            "  {} {} subdivisions with a missing parent",
            "dropped:".red(),
            summary.orphans_dropped
        );
    }
    Ok(())
}

fn cmd_next_id(config: &CliConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let store = open_store(config, config.store.clone())?;
    let id = store.allocate_claim_id();
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "claim_id": id.get() })),
        OutputFormat::Text => println!("{}", id.to_string().yellow().bold()),
    }
    Ok(())
}

/// Compares resolved paths when both exist, so `data` and `./data` match.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn cmd_migrate(config: &CliConfig, args: MigrateArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let source_root = &config.store.root;
    if !FlatFileDataStore::has_data(source_root) {
        bail!("no flat-file data at {}", source_root.display());
    }
    if same_directory(&args.target, source_root) {
        bail!("target must differ from the source root");
    }

    let source = open_store(config, config.store.clone())?;
    let loaded = source.load().context("failed to load source data")?;
    let target = open_store(
        config,
        StoreConfig {
            root: args.target.clone(),
            ..config.store.clone()
        },
    )?;

    let report = source.migrate_data(&loaded, &target);

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} Migrated into {}", "✓".green().bold(), args.target.display().to_string().bold());
    println!("  Claims: {}", report.claims);
    println!("  Groups: {}", report.groups);
    println!("  Players: {}", report.players);
    println!("  Next claim ID: {}", report.next_claim_id.to_string().cyan());
    for name in &report.skipped_player_files {
        println!("  {} {}", "skipped:".yellow(), name);
    }
    match (&report.claims_backup, &report.players_backup) {
        (Some(claims), Some(players)) => {
            println!("Old data kept in {} and {}", claims.display(), players.display());
        }
        _ => println!("{} Could not move the old data directories; see log", "!".red().bold()),
    }
    Ok(())
}

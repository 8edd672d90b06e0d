use std::io::Write;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use tally_store::{LedgerStore, LinkMatrix, RecordReader, RecordWriter};
use tally_types::{format_timestamp, Category};
use tracing::info;

use crate::cli::*;
use crate::config::{load_seed, ConsoleConfig, Seed};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    let seed = match &cli.seed {
        Some(path) => load_seed(path)?,
        None => Seed::new(),
    };
    let store = build_store(&config, seed)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&store, &cli.command, cli.format, &mut out)
}

/// Build a store from the config's allowlist and the seed records.
///
/// Each allowlist rule and each seeded category goes through the store's
/// own operations, so the audit chain reflects how the store was loaded.
pub fn build_store(config: &ConsoleConfig, seed: Seed) -> anyhow::Result<LedgerStore> {
    let store = LedgerStore::with_config(config.store.clone())?;
    for draft in &config.allowlist {
        store
            .upsert_allowlist(draft.clone(), &config.actor)
            .with_context(|| format!("allowlist rule {:?}", draft.cidr))?;
    }
    for (category, records) in seed {
        let count = records.len();
        store
            .replace(category, records, &config.actor)
            .with_context(|| format!("seeding {category} records"))?;
        info!(%category, count, "seeded");
    }
    Ok(store)
}

pub fn execute(
    store: &LedgerStore,
    command: &Command,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::List(args) => cmd_list(store, args.category, format, out),
        Command::Export(args) => cmd_export(store, args.category, format, out),
        Command::Audit => cmd_audit(store, format, out),
        Command::CheckIp(args) => cmd_check_ip(store, &args.address, format, out),
        Command::Matrix(args) => cmd_matrix(store, args.from, args.to, format, out),
    }
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn cmd_list(
    store: &LedgerStore,
    category: Category,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let records = store.list(category)?;
    if format == OutputFormat::Json {
        return write_json(out, &records);
    }
    if records.is_empty() {
        writeln!(out, "No {category} records.")?;
        return Ok(());
    }
    for record in &records {
        write!(
            out,
            "{:>4}  {}  {}",
            record.order,
            record.name.bold(),
            record.id.as_str().dimmed()
        )?;
        if !record.tags.is_empty() {
            write!(out, "  [{}]", record.tags.join(", ").cyan())?;
        }
        writeln!(out)?;
        if let Some(description) = &record.description {
            writeln!(out, "        {description}")?;
        }
    }
    Ok(())
}

fn cmd_export(
    store: &LedgerStore,
    category: Category,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let rows = store.export_rows(category)?;
    if format == OutputFormat::Json {
        return write_json(out, &rows);
    }
    for row in rows {
        writeln!(out, "{}", row.join("\t"))?;
    }
    Ok(())
}

#[derive(Serialize)]
struct AuditReport<'a> {
    entries: &'a [tally_types::AuditEntry],
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn cmd_audit(store: &LedgerStore, format: OutputFormat, out: &mut impl Write) -> anyhow::Result<()> {
    let entries = store.audit_log()?;
    let broken = store.verify_audit_report()?;

    if format == OutputFormat::Json {
        let report = AuditReport {
            entries: &entries,
            valid: broken.is_none(),
            error: broken.map(|e| e.to_string()),
        };
        return write_json(out, &report);
    }

    if entries.is_empty() {
        writeln!(out, "Audit trail: no entries.")?;
    }
    for (index, entry) in entries.iter().enumerate() {
        let short_hash = entry.hash.get(..12).unwrap_or(&entry.hash);
        writeln!(
            out,
            "{:>4}  {}  {}  {}  {}  {}",
            index,
            format_timestamp(&entry.created_at).dimmed(),
            entry.action.yellow(),
            entry.details,
            entry.actor,
            short_hash.dimmed()
        )?;
    }
    match broken {
        None => writeln!(out, "{} Audit chain verified ({} entries)", "✓".green().bold(), entries.len())?,
        Some(err) => writeln!(out, "{} Audit chain broken: {err}", "✗".red().bold())?,
    }
    Ok(())
}

fn cmd_check_ip(
    store: &LedgerStore,
    address: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let allowed = store.is_allowed(address)?;
    let rules = store.allowlist()?.len();
    if format == OutputFormat::Json {
        return write_json(
            out,
            &serde_json::json!({ "address": address, "allowed": allowed, "rules": rules }),
        );
    }
    let verdict = if allowed {
        "allowed".green().bold()
    } else {
        "denied".red().bold()
    };
    write!(out, "{address}: {verdict}")?;
    if rules == 0 {
        write!(out, " (allowlist empty)")?;
    }
    writeln!(out)?;
    Ok(())
}

fn cmd_matrix(
    store: &LedgerStore,
    from: Category,
    to: Category,
    format: OutputFormat,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let matrix = store.link_matrix(from, to)?;
    if format == OutputFormat::Json {
        return write_json(out, &matrix);
    }
    write_matrix_text(&matrix, out)
}

fn write_matrix_text(matrix: &LinkMatrix, out: &mut impl Write) -> anyhow::Result<()> {
    if matrix.rows.is_empty() || matrix.columns.is_empty() {
        writeln!(out, "No {} or {} records to cross-reference.", matrix.from, matrix.to)?;
        return Ok(());
    }
    let width = matrix
        .rows
        .iter()
        .map(|label| label.name.chars().count())
        .max()
        .unwrap_or(0);

    write!(out, "{:width$}", "")?;
    for column in &matrix.columns {
        write!(out, "  {}", column.name.bold())?;
    }
    writeln!(out)?;
    for (label, cells) in matrix.rows.iter().zip(&matrix.cells) {
        write!(out, "{:width$}", label.name)?;
        for (column, linked) in matrix.columns.iter().zip(cells) {
            let cell_width = column.name.chars().count();
            let mark = if *linked { "x" } else { "." };
            write!(out, "  {mark:^cell_width$}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "{} links", matrix.link_count())?;
    Ok(())
}

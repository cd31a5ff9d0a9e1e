//! Cache command - inspect and maintain the environment cache

use crate::cache::{CacheStore, EntryInfo, FsStore};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{RunxError, RunxResult};
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> RunxResult<()> {
    let store = FsStore::new(config.cache.dir(), config.cache.expiration_days);

    match args.action {
        CacheAction::List { format } => list_entries(&store, format),
        CacheAction::Sweep { dry_run } => sweep_entries(&store, dry_run),
        CacheAction::Clear { yes } => clear_entries(&store, yes),
    }
}

fn list_entries(store: &FsStore, format: OutputFormat) -> RunxResult<()> {
    let entries = store.entries()?;

    if entries.is_empty() {
        println!("No cached environments.");
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[EntryInfo]) {
    println!("{:<20} {:<10} {:<20}", "FINGERPRINT", "STATE", "CREATED");
    println!("{}", "-".repeat(50));

    for entry in entries {
        let state_display = if entry.expired {
            style("expired").yellow().to_string()
        } else {
            style("ready").green().to_string()
        };
        let created = entry.created_at.format("%Y-%m-%d %H:%M").to_string();
        println!("{:<20} {:<10} {:<20}", entry.fingerprint, state_display, created);
    }

    println!();
    println!("Total: {} environment(s)", entries.len());
}

fn print_json(entries: &[EntryInfo]) -> RunxResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson {
        fingerprint: String,
        state: &'static str,
        created_at: String,
    }

    let json_entries: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            fingerprint: e.fingerprint.to_string(),
            state: if e.expired { "expired" } else { "ready" },
            created_at: e.created_at.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_entries)?);
    Ok(())
}

fn print_plain(entries: &[EntryInfo]) {
    for entry in entries {
        println!("{}", entry.fingerprint);
    }
}

fn sweep_entries(store: &FsStore, dry_run: bool) -> RunxResult<()> {
    if dry_run {
        let expired: Vec<_> = store
            .entries()?
            .into_iter()
            .filter(|e| e.expired)
            .collect();
        if expired.is_empty() {
            println!("Nothing to sweep.");
        } else {
            for entry in &expired {
                println!("Would remove {}", entry.fingerprint);
            }
            println!("{} environment(s) would be removed", expired.len());
        }
        return Ok(());
    }

    let reaped = store.sweep()?;
    if reaped.is_empty() {
        println!("Nothing to sweep.");
    } else {
        println!(
            "{} Removed {} expired environment(s)",
            style("✓").green(),
            reaped.len()
        );
    }
    Ok(())
}

fn clear_entries(store: &FsStore, yes: bool) -> RunxResult<()> {
    let entries = store.entries()?;
    if entries.is_empty() {
        println!("No cached environments.");
        return Ok(());
    }

    if !yes {
        print!("Remove {} cached environment(s)? [y/N] ", entries.len());
        io::stdout()
            .flush()
            .map_err(|e| RunxError::io("flushing stdout", e))?;
        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .map_err(|e| RunxError::io("reading confirmation", e))?;
        if !matches!(answer.trim(), "y" | "Y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    for entry in &entries {
        store.clear(&entry.fingerprint)?;
    }
    println!(
        "{} Removed {} environment(s)",
        style("✓").green(),
        entries.len()
    );
    Ok(())
}

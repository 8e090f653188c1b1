//! Cache command - inspect or clear cached compile results

use super::print_json;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::compile::{CacheEntry, CompileCache};
use crate::config::{Config, ConfigManager};
use crate::error::OlResult;
use crate::ui::{self, UiContext};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub fn execute(args: CacheArgs, config: &Config) -> OlResult<()> {
    let cache = CompileCache::open(&ConfigManager::state_dir(config), config.cache.max_entries)?;

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format),
        CacheAction::Clear { yes } => {
            clear_entries(&UiContext::detect().with_auto_yes(yes), cache)
        }
    }
}

#[derive(Serialize)]
struct EntryJson<'a> {
    key: &'a str,
    outputs: Vec<&'a str>,
    expires_at: Option<String>,
    fresh: bool,
}

fn list_entries(cache: &CompileCache, format: OutputFormat) -> OlResult<()> {
    let now = Utc::now();

    if cache.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "No cached compile results"),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(cache, now),
        OutputFormat::Json => {
            let entries: Vec<EntryJson> = cache
                .entries()
                .map(|(key, entry)| EntryJson {
                    key,
                    outputs: entry.outputs.kinds().collect(),
                    expires_at: entry.expires_at().map(|t| t.to_rfc3339()),
                    fresh: entry.is_fresh(now),
                })
                .collect();
            print_json(&entries)?;
        }
        OutputFormat::Plain => {
            for (key, _) in cache.entries() {
                println!("{}", key);
            }
        }
    }

    Ok(())
}

fn print_table(cache: &CompileCache, now: DateTime<Utc>) {
    println!(
        "{:<52} {:<8} {:<18} {}",
        style("KEY").bold(),
        style("STATE").bold(),
        style("EXPIRES").bold(),
        style("OUTPUTS").bold()
    );
    println!("{}", "-".repeat(100));

    for (key, entry) in cache.entries() {
        let state = if entry.is_fresh(now) {
            style("fresh").green()
        } else {
            style("stale").dim()
        };
        println!(
            "{:<52} {:<8} {:<18} {}",
            key,
            state,
            expires_label(entry),
            entry.outputs.kinds().collect::<Vec<_>>().join(", ")
        );
    }

    println!();
    println!("Total: {} entr{}", cache.len(), if cache.len() == 1 { "y" } else { "ies" });
}

fn expires_label(entry: &CacheEntry) -> String {
    entry
        .expires_at()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn clear_entries(ctx: &UiContext, mut cache: CompileCache) -> OlResult<()> {
    if cache.is_empty() {
        ui::step_info(ctx, "Compile cache is already empty");
        return Ok(());
    }

    let prompt = format!("Remove {} cached compile result(s)?", cache.len());
    if !ui::confirm(ctx, &prompt, false)? {
        ui::step_info(ctx, "Cancelled");
        return Ok(());
    }

    let removed = cache.clear()?;
    ui::step_ok(ctx, &format!("Removed {} cached compile result(s)", removed));
    Ok(())
}

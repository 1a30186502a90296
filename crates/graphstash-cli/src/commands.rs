//! Subcommand handlers.
//!
//! Each handler takes the workspace and parsed arguments and returns the
//! text to print, so handlers can be tested without capturing stdout.

use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow, bail};
use graphstash_store::{
    ActivityKind, KeyValueStore, ProjectStorage, SqliteKeyValueStore, StorageConfig, Workspace,
    templates,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::cli::{HistoryAction, PrefAction, ProjectAction, TemplateAction};
use crate::helpers::{parse_pref_value, read_input};

// ═══════════════════════════════════════════════════════════════════════
//  projects
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_projects(ws: &Workspace, hamming: bool, action: ProjectAction) -> Result<String> {
    let projects = ws.project_set(hamming);

    match action {
        ProjectAction::List => {
            let all = projects.get_all()?;
            if all.is_empty() {
                return Ok("No saved projects.".to_string());
            }
            let mut out = String::new();
            for name in projects.names()? {
                if let Some(record) = all.get(&name) {
                    writeln!(out, "  {:<32} {}", record.name, record.display_timestamp)?;
                }
            }
            Ok(out.trim_end().to_string())
        }

        ProjectAction::Show { name } => {
            let record = projects
                .get(&name)?
                .ok_or_else(|| anyhow!("no project named {name:?}"))?;
            Ok(serde_json::to_string_pretty(&record)?)
        }

        ProjectAction::Save {
            name,
            file,
            template,
        } => {
            let payload = match (template, file) {
                (Some(template), _) => {
                    let found = templates::find(&template)
                        .ok_or_else(|| anyhow!("no template named {template:?}"))?;
                    serde_json::to_value(found)?
                }
                (None, Some(file)) => {
                    let raw = read_input(&file)?;
                    serde_json::from_str::<Value>(&raw)
                        .with_context(|| format!("{} is not valid JSON", file.display()))?
                }
                (None, None) => bail!("either a payload file or --template is required"),
            };

            let record = projects.save(&name, payload)?;
            record_activity(ws, ActivityKind::Save, &format!("saved {name}"), projects, &name);
            if projects.get(&name)?.is_none() {
                warn!(name = %name, "project was evicted immediately; check the system clock");
                return Ok(format!(
                    "Saved {name:?} but it was older than every retained project and was evicted."
                ));
            }
            Ok(format!("Saved {:?} at {}.", record.name, record.display_timestamp))
        }

        ProjectAction::Delete { name } => {
            if projects.delete(&name)? {
                record_activity(ws, ActivityKind::Delete, &format!("deleted {name}"), projects, &name);
                Ok(format!("Deleted {name:?}."))
            } else {
                Ok(format!("No project named {name:?}."))
            }
        }

        ProjectAction::Export { out } => {
            let exported = projects.export()?;
            let count = projects.get_stats()?.count;
            record_activity(ws, ActivityKind::Export, &format!("exported {count} projects"), projects, "");
            match out {
                Some(path) => {
                    std::fs::write(&path, &exported)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    Ok(format!("Exported {count} projects to {}.", path.display()))
                }
                None => Ok(exported),
            }
        }

        ProjectAction::Import { file } => {
            let raw = read_input(&file)?;
            let result = projects.import(&raw);
            if !result.success {
                bail!(
                    "import failed: {}",
                    result.error.unwrap_or_else(|| "unknown error".into())
                );
            }
            let count = projects.get_stats()?.count;
            record_activity(ws, ActivityKind::Import, &format!("imported {count} projects"), projects, "");
            Ok(format!("Imported {count} projects into {}.", projects.key()))
        }

        ProjectAction::Stats => {
            let stats = projects.get_stats()?;
            Ok(format!(
                "{}: {} / {} projects, {} KB",
                projects.key(),
                stats.count,
                projects.max_items(),
                stats.size_kb
            ))
        }

        ProjectAction::Clear => {
            projects.clear()?;
            Ok(format!("Cleared {}.", projects.key()))
        }
    }
}

/// Append a history entry for a project mutation. History is best-effort:
/// a full store must not fail the project operation that already succeeded.
fn record_activity(
    ws: &Workspace,
    kind: ActivityKind,
    description: &str,
    projects: &ProjectStorage,
    name: &str,
) {
    let payload = json!({ "dataset": projects.key(), "name": name });
    if let Err(err) = ws.history.add(kind, description, payload) {
        warn!(%err, "failed to record activity");
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  history
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_history(ws: &Workspace, action: HistoryAction) -> Result<String> {
    match action {
        HistoryAction::List { limit } => {
            let entries = match limit {
                Some(n) => ws.history.recent(n)?,
                None => ws.history.get_all()?,
            };
            if entries.is_empty() {
                return Ok("No activity recorded.".to_string());
            }
            let mut out = String::new();
            for entry in entries {
                writeln!(
                    out,
                    "  {}  {:<9} {}",
                    entry.display_timestamp, entry.kind, entry.description
                )?;
            }
            Ok(out.trim_end().to_string())
        }

        HistoryAction::Add { kind, description } => {
            let entry = ws
                .history
                .add(ActivityKind::from(kind), description, json!({}))?;
            Ok(format!("Recorded {} at {}.", entry.kind, entry.display_timestamp))
        }

        HistoryAction::Clear => {
            ws.history.clear()?;
            Ok("History cleared.".to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  prefs
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_prefs(ws: &Workspace, action: PrefAction) -> Result<String> {
    match action {
        PrefAction::List => {
            let mut out = String::new();
            for (key, value) in ws.preferences.get_all()? {
                writeln!(out, "  {key:<18} {value}")?;
            }
            Ok(out.trim_end().to_string())
        }

        PrefAction::Get { key } => match ws.preferences.get(&key)? {
            Some(value) => Ok(value.to_string()),
            None => bail!("unknown preference {key:?}"),
        },

        PrefAction::Set { key, value } => {
            let value = parse_pref_value(&value);
            ws.preferences.set(&key, value.clone())?;
            info!(key = %key, "preference updated");
            Ok(format!("{key} = {value}"))
        }

        PrefAction::Reset => {
            ws.preferences.reset()?;
            Ok("Preferences reset to defaults.".to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  templates
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_templates(action: TemplateAction) -> Result<String> {
    match action {
        TemplateAction::List { category } => {
            let mut out = String::new();
            for template in templates::catalog()
                .iter()
                .filter(|t| category.as_deref().is_none_or(|c| t.category == c))
            {
                writeln!(
                    out,
                    "  {:<16} [{}] {}",
                    template.name, template.category, template.description
                )?;
            }
            if out.is_empty() {
                bail!("no templates in that category");
            }
            Ok(out.trim_end().to_string())
        }

        TemplateAction::Show { name } => {
            let template =
                templates::find(&name).ok_or_else(|| anyhow!("no template named {name:?}"))?;
            let mut out = String::new();
            writeln!(out, "{} ({})", template.name, template.category)?;
            writeln!(out, "{}", template.description)?;
            writeln!(out, "nodes: {}", template.node_labels().join(", "))?;
            for (a, b) in template.edge_pairs() {
                writeln!(out, "  {a} - {b}")?;
            }
            Ok(out.trim_end().to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  status
// ═══════════════════════════════════════════════════════════════════════

pub fn handle_status(
    ws: &Workspace,
    store: &SqliteKeyValueStore,
    config: &StorageConfig,
) -> Result<String> {
    let used = store.used_bytes()?;
    let quota = match config.quota_bytes {
        Some(q) => format!("{:.2} KB", q as f64 / 1024.0),
        None => "unbounded".to_string(),
    };

    let mut out = String::new();
    writeln!(out, "Store:     {:.2} KB used of {quota}", used as f64 / 1024.0)?;
    writeln!(out, "Keys:      {}", store.keys()?.join(", "))?;
    for projects in [&ws.projects, &ws.hamming_projects] {
        let stats = projects.get_stats()?;
        writeln!(
            out,
            "{:<10} {} / {} projects, {} KB",
            format!("{}:", projects.key()),
            stats.count,
            projects.max_items(),
            stats.size_kb
        )?;
    }
    writeln!(
        out,
        "History:   {} / {} entries",
        ws.history.get_all()?.len(),
        ws.history.max_entries()
    )?;
    Ok(out.trim_end().to_string())
}

// ── tests ────────────────────────────────────────────────────────────

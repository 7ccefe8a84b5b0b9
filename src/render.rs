//! Plain-text rendering of view state.
//!
//! Every function returns a `String` so the CLI, the interactive session and
//! the tests share one presentation. Nothing here talks to the network.

use std::fmt::Write;

use chrono::{DateTime, NaiveDateTime};

use crate::error::UploadError;
use crate::models::{Document, ServiceStatus, UploadResult};
use crate::state::{DatasetCatalog, OpState, SearchOutcome, UploadInput, UploadView};

const UNTAGGED: &str = "(untagged)";

/// The results area for any search state.
pub fn render_search_state(state: &OpState<SearchOutcome>) -> String {
    match state {
        OpState::Idle => "No results yet. Try a search!\n".to_string(),
        OpState::Pending => "Searching...\n".to_string(),
        OpState::Failed(message) => format!("Error: {}\n", message),
        OpState::Succeeded(outcome) => render_results(outcome),
    }
}

/// Ranked results. Slots whose document could not be fetched are skipped;
/// the rank shown is still the slot's position in the service's ranking.
pub fn render_results(outcome: &SearchOutcome) -> String {
    let mut out = String::new();

    if outcome.visible_count() == 0 {
        out.push_str("No results.\n");
        return out;
    }

    let shown = outcome.visible_count();
    match outcome.total_found {
        Some(total) => {
            let _ = writeln!(
                out,
                "Results for \"{}\" ({} of {} found)",
                outcome.query, shown, total
            );
        }
        None => {
            let _ = writeln!(out, "Results for \"{}\" ({})", outcome.query, shown);
        }
    }
    out.push('\n');

    for (index, slot, doc) in outcome.visible() {
        let title = doc.title().unwrap_or(UNTAGGED);
        match slot.score {
            Some(score) => {
                let _ = writeln!(out, "{:>2}. {}  [score {:.3}]", index + 1, title, score);
            }
            None => {
                let _ = writeln!(out, "{:>2}. {}", index + 1, title);
            }
        }
        let _ = writeln!(out, "    {}", doc.content);
        let _ = writeln!(out, "    id: {}", slot.id);
        out.push('\n');
    }

    out
}

/// Dataset table. The selected dataset (or the default row) is marked with `*`.
pub fn render_datasets(catalog: &DatasetCatalog) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<6} {:<28} {:<14} {:>9} {:>10}   {}",
        "ID", "NAME", "TYPE", "RECORDS", "SIZE", "CREATED"
    );
    let _ = writeln!(out, "  {}", "-".repeat(90));

    let default_mark = if catalog.selected.is_none() { '*' } else { ' ' };
    let _ = writeln!(out, "{} {:<6} {}", default_mark, "-", "(default dataset)");

    for ds in &catalog.datasets {
        let mark = if catalog.selected == Some(ds.id) { '*' } else { ' ' };
        let size = ds
            .file_size
            .map(format_bytes)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{} {:<6} {:<28} {:<14} {:>9} {:>10}   {}",
            mark,
            ds.id,
            truncate(&ds.name, 28),
            truncate(&ds.data_type, 14),
            ds.total_records,
            size,
            format_created_at(&ds.created_at)
        );
    }

    if catalog.datasets.is_empty() {
        out.push_str("\n  No datasets uploaded yet.\n");
    }

    out
}

/// The upload panel's status line(s).
pub fn render_upload(view: &UploadView) -> String {
    match &view.state {
        OpState::Idle => String::new(),
        OpState::Pending => "Uploading...\n".to_string(),
        OpState::Failed(err) => render_upload_error(err),
        OpState::Succeeded(result) => render_upload_result(result),
    }
}

/// The upload form as the user is filling it in.
pub fn render_upload_form(view: &UploadView) -> String {
    if !view.panel_open {
        return "Upload panel closed.\n".to_string();
    }
    let mut out = String::new();
    let name = if view.form.dataset_name.is_empty() {
        "(not set)"
    } else {
        view.form.dataset_name.as_str()
    };
    let _ = writeln!(out, "Upload dataset");
    let _ = writeln!(out, "  name:  {}", name);
    match &view.form.input {
        UploadInput::File(None) => {
            let _ = writeln!(out, "  file:  (none selected)");
        }
        UploadInput::File(Some(file)) => {
            let _ = writeln!(out, "  file:  {}", file.path.display());
        }
        UploadInput::Text(text) => {
            let _ = writeln!(out, "  text:  {} characters", text.chars().count());
        }
    }
    out.push_str(&render_upload(view));
    out
}

pub fn render_upload_error(err: &UploadError) -> String {
    format!("Error: {}\n", err)
}

pub fn render_upload_result(result: &UploadResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dataset \"{}\" created (id {})", result.name, result.dataset_id);
    let _ = writeln!(out, "  type:     {}", result.data_type);
    let _ = writeln!(out, "  records:  {}", result.total_records);
    let _ = writeln!(
        out,
        "  format:   {} ({:.0}% confidence)",
        result.format_detected.kind,
        result.format_detected.confidence.clamp(0.0, 1.0) * 100.0
    );
    if !result.sample_records.is_empty() {
        let _ = writeln!(out, "  samples:  {}", result.sample_records.len());
    }
    out
}

/// Full view of one document, for `zs get`.
pub fn render_document(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str("--- Document ---\n");
    if let Some(id) = doc.id {
        let _ = writeln!(out, "id:    {}", id);
    }
    let tags = if doc.tags.is_empty() {
        UNTAGGED.to_string()
    } else {
        doc.tags.join(", ")
    };
    let _ = writeln!(out, "tags:  {}", tags);
    out.push('\n');
    out.push_str("--- Content ---\n");
    let _ = writeln!(out, "{}", doc.content);
    out
}

/// One line per document, for `zs docs`.
pub fn render_document_list(docs: &[Document]) -> String {
    if docs.is_empty() {
        return "No documents.\n".to_string();
    }
    let mut out = String::new();
    for doc in docs {
        let id = doc
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string());
        let _ = writeln!(
            out,
            "{:>8}  {:<20} {}",
            id,
            truncate(doc.title().unwrap_or(UNTAGGED), 20),
            truncate(&doc.content, 60)
        );
    }
    out
}

pub fn render_status(base_url: &str, status: &ServiceStatus) -> String {
    match &status.version {
        Some(version) => format!("{}  {} (version {})\n", base_url, status.message, version),
        None => format!("{}  {}\n", base_url, status.message),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// The service emits either RFC 3339 or a naive ISO timestamp; anything
/// else is shown verbatim.
fn format_created_at(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

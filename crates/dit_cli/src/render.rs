//! Plain-text rendering for terminal output.

use dit_core::{ContributionWindow, Severity, TimelineEntry, TodoItem, WindowStatus};

fn glyph(severity: Severity) -> char {
    match severity {
        Severity::None => '·',
        Severity::Level1 => '░',
        Severity::Level2 => '▒',
        Severity::Level3 => '▓',
        Severity::Level4 | Severity::Level5Plus => '█',
    }
}

pub fn todo_line(todo: &TodoItem) -> String {
    let mark = if todo.is_done { 'x' } else { ' ' };
    format!("[{mark}] {} {}", todo.id, todo.text)
}

/// One line per day, oldest first, then a total.
pub fn graph(window: &ContributionWindow) -> String {
    let mut out = String::new();
    for bucket in &window.buckets {
        out.push_str(&format!(
            "{} {:>3} {}\n",
            bucket.date.format("%Y-%m-%d(%a)"),
            bucket.commit_count,
            glyph(bucket.severity())
        ));
    }
    out.push_str(&format!(
        "{} commits in {} days\n",
        window.total_commits(),
        window.len()
    ));
    if let WindowStatus::StorageUnavailable { reason } = &window.status {
        out.push_str(&format!("storage unavailable: {reason}\n"));
    }
    out
}

/// Column-major grid: each column is one week, oldest column first.
pub fn widget(entry: &TimelineEntry) -> String {
    let rows = entry.family.rows() as usize;
    let columns = entry.family.columns() as usize;
    let cells: Vec<char> = entry
        .window
        .buckets
        .iter()
        .map(|bucket| glyph(bucket.severity()))
        .collect();

    let mut out = String::new();
    for row in 0..rows {
        let line: String = (0..columns)
            .filter_map(|column| cells.get(column * rows + row))
            .collect();
        out.push_str(&line);
        out.push('\n');
    }
    if entry.stale {
        out.push_str("(stale)\n");
    } else if entry.window.is_degraded() {
        out.push_str("(storage unavailable)\n");
    }
    out
}

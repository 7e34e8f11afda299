//! Plain-text rendering of command results.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use crate::commands::{Listing, TreeView};
use crate::vfs::{NodeKind, RemoteNode};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const NAME_WIDTH: usize = 40;

/// Human-readable size with one decimal, `B` through `PB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in SIZE_UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} PB")
}

fn kind_marker(node: &RemoteNode) -> &'static str {
    match node.kind {
        NodeKind::Folder => "📁",
        NodeKind::File => "📄",
        NodeKind::NativeDocument(_) => "📝",
    }
}

pub fn render_listing(listing: &Listing) -> String {
    let mut out = format!("📂 {}\n", listing.path);
    if listing.entries.is_empty() {
        out.push_str("Empty folder\n");
        return out;
    }
    for node in &listing.entries {
        let size = node.size.map(format_size).unwrap_or_else(|| "-".to_string());
        let modified = node
            .modified_time
            .as_deref()
            .map(|time| time.get(..10).unwrap_or(time))
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "{} {:<width$} {:>10}  {}",
            kind_marker(node),
            node.name,
            size,
            modified,
            width = NAME_WIDTH
        );
    }
    let count = listing.entries.len();
    let _ = writeln!(out, "{count} item{}", if count == 1 { "" } else { "s" });
    out
}

pub fn render_tree(view: &TreeView) -> String {
    let mut out = format!("📂 {}\n", view.path);
    if view.lines.is_empty() {
        out.push_str("Empty folder\n");
        return out;
    }
    for line in &view.lines {
        let _ = writeln!(out, "{line}");
    }
    out
}

/// Single-line percentage indicator on stderr, rewritten in place.
pub struct ProgressLine {
    label: String,
    last_percent: Option<u32>,
}

impl ProgressLine {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last_percent: None,
        }
    }

    pub fn for_path(verb: &str, path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(format!("{verb} {name}"))
    }

    pub fn update(&mut self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}: {percent:>3}%", self.label);
        if percent == 100 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

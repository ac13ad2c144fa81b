use crate::edge::NodeKey;
use crate::kind::RecordKind;
use crate::query::ContextListing;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::SEARCH, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn record_created(id: &str) {
    println!("{} {}", Icons::NEW.style(theme().success.clone()), id);
}

pub fn record_updated(old_id: &str, new_id: &str) {
    if old_id == new_id {
        println!("{} {}", Icons::MOD.style(theme().warn.clone()), new_id);
    } else {
        println!("{} {} -> {}", Icons::MOD.style(theme().warn.clone()), old_id.style(theme().muted.clone()), new_id);
    }
}

pub fn record_deleted(id: &str) {
    println!("{} {}", Icons::DEL.style(theme().error.clone()), id);
}

/// One record line, prefixed with its kind marker and line number
pub fn record(kind: RecordKind, line_number: usize, text: &str) {
    println!(
        "{} {} {}",
        Icons::kind(kind),
        format!("{:>6}", line_number).style(theme().muted.clone()),
        text.style(theme().kind(kind))
    );
}

/// Referenced identifiers that have no record
pub fn missing(keys: &[NodeKey]) {
    for key in keys {
        println!("{} {}", Icons::MISSING.style(theme().error.clone()), dim(&key.to_string()));
    }
}

/// Context listing with per-kind colors
pub fn listing(listing: &ContextListing, indented: bool, numbered: bool) {
    for entry in &listing.entries {
        let number = if numbered {
            format!("{:>6}\t", entry.line_number).style(theme().muted.clone()).to_string()
        } else {
            String::new()
        };
        let indent = if indented { "  ".repeat(entry.depth) } else { String::new() };
        println!("{}{}{}", number, indent, entry.text.style(theme().kind(entry.kind)));
    }
    if !listing.missing.is_empty() {
        section("Missing");
        missing(&listing.missing);
    }
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

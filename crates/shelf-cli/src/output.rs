//! Human-readable and JSON rendering of command results.

use serde::Serialize;

use shelf_core::{NoteItem, StarItem};
use shelf_store::Stats;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn star_line(star: &StarItem) -> String {
    let mut line = format!("{}  [{}]  {}", star.id, star.content_type, star.title);
    if !star.tags.is_empty() {
        let tags: Vec<_> = star.tags.iter().map(|t| format!("#{}", t)).collect();
        line.push_str("  ");
        line.push_str(&tags.join(" "));
    }
    if star.note_id.is_some() {
        line.push_str("  (note)");
    }
    line
}

pub fn note_block(note: &NoteItem) -> String {
    let mut block = format!(
        "{}  {}  [{}]{}\n  updated {}",
        note.id,
        note.content_title,
        note.content_type,
        if note.ai_enhanced { "  enhanced" } else { "" },
        note.updated_at.format("%Y-%m-%d %H:%M")
    );
    for (label, text) in [
        ("thoughts", &note.thoughts),
        ("questions", &note.questions),
        ("todos", &note.todos),
    ] {
        if !text.trim().is_empty() {
            block.push_str(&format!("\n  {}: {}", label, text.trim()));
        }
    }
    block
}

pub fn print_stars(stars: &[StarItem], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(stars);
    }
    if stars.is_empty() {
        println!("No stars yet.");
    }
    for star in stars {
        println!("{}", star_line(star));
    }
    Ok(())
}

pub fn print_notes(notes: &[NoteItem], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(notes);
    }
    if notes.is_empty() {
        println!("No notes yet.");
    }
    for note in notes {
        println!("{}", note_block(note));
    }
    Ok(())
}

pub fn print_stats(stats: &Stats, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(stats);
    }
    println!("Stars:          {}", stats.total_stars);
    println!("Notes:          {}", stats.total_notes);
    println!("Pending notes:  {}", stats.pending_notes);
    println!("Orphan notes:   {}", stats.orphan_notes);
    for (content_type, count) in &stats.stars_by_type {
        println!("  {:<12}{}", content_type.as_str(), count);
    }
    if !stats.top_tags.is_empty() {
        let tags: Vec<_> = stats
            .top_tags
            .iter()
            .map(|(tag, count)| format!("{} ({})", tag, count))
            .collect();
        println!("Top tags:       {}", tags.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shelf_core::{ContentType, NoteDraft};

    fn star() -> StarItem {
        StarItem::new(
            "github-tokio-rs-tokio",
            "tokio",
            "https://github.com/tokio-rs/tokio",
            ContentType::Repo,
            "2024-02-10",
            Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_star_line() {
        let mut s = star().with_tags(["async", "rust"]);
        assert_eq!(
            star_line(&s),
            "github-tokio-rs-tokio  [repo]  tokio  #async #rust"
        );
        s.note_id = Some("n".to_string());
        assert!(star_line(&s).ends_with("(note)"));
    }

    #[test]
    fn test_note_block_skips_empty_sections() {
        let note = NoteDraft::for_star(&star())
            .with_text("fast", "", "benchmark")
            .into_note(Utc.with_ymd_and_hms(2024, 2, 11, 9, 0, 0).unwrap());
        let block = note_block(&note);
        assert!(block.contains("thoughts: fast"));
        assert!(block.contains("todos: benchmark"));
        assert!(!block.contains("questions"));
        assert!(block.contains("updated 2024-02-11 09:00"));
    }
}

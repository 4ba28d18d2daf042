//! Aggregates over both collections. Derived on demand, never persisted.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use shelf_core::defaults::TOP_TAGS_LIMIT;
use shelf_core::{ContentType, NoteItem, StarItem};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_stars: usize,
    pub total_notes: usize,
    /// Notes not enhanced yet.
    pub pending_notes: usize,
    /// Notes whose content is no longer starred.
    pub orphan_notes: usize,
    pub stars_by_type: BTreeMap<ContentType, usize>,
    /// Most used tags, by count descending then name.
    pub top_tags: Vec<(String, usize)>,
}

pub fn compute(stars: &[StarItem], notes: &[NoteItem]) -> Stats {
    let starred: HashSet<&str> = stars.iter().map(|s| s.id.as_str()).collect();

    let mut stars_by_type = BTreeMap::new();
    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for star in stars {
        *stars_by_type.entry(star.content_type).or_insert(0) += 1;
        for tag in &star.tags {
            *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut top_tags: Vec<(String, usize)> = tag_counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    top_tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_tags.truncate(TOP_TAGS_LIMIT);

    Stats {
        total_stars: stars.len(),
        total_notes: notes.len(),
        pending_notes: notes.iter().filter(|n| !n.ai_enhanced).count(),
        orphan_notes: notes
            .iter()
            .filter(|n| !starred.contains(n.content_id.as_str()))
            .count(),
        stars_by_type,
        top_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shelf_core::NoteDraft;

    fn star(id: &str, content_type: ContentType, tags: &[&str]) -> StarItem {
        StarItem::new(
            id,
            id,
            "https://example.com",
            content_type,
            "2024-02-10",
            Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap(),
        )
        .with_tags(tags.iter().copied())
    }

    #[test]
    fn test_empty() {
        assert_eq!(compute(&[], &[]), Stats::default());
    }

    #[test]
    fn test_counts() {
        let stars = vec![
            star("a", ContentType::Repo, &["rust", "cli"]),
            star("b", ContentType::Repo, &["rust"]),
            star("c", ContentType::Paper, &["ml"]),
        ];
        let now = Utc.with_ymd_and_hms(2024, 2, 11, 0, 0, 0).unwrap();
        let mut enhanced = NoteDraft::for_star(&stars[0]).into_note(now);
        enhanced.ai_enhanced = true;
        let orphan = NoteDraft {
            content_id: "gone".to_string(),
            ..Default::default()
        }
        .into_note(now);

        let stats = compute(&stars, &[enhanced, orphan]);

        assert_eq!(stats.total_stars, 3);
        assert_eq!(stats.total_notes, 2);
        assert_eq!(stats.pending_notes, 1);
        assert_eq!(stats.orphan_notes, 1);
        assert_eq!(stats.stars_by_type[&ContentType::Repo], 2);
        assert_eq!(stats.stars_by_type[&ContentType::Paper], 1);
        assert!(!stats.stars_by_type.contains_key(&ContentType::Model));
        assert_eq!(
            stats.top_tags,
            vec![
                ("rust".to_string(), 2),
                ("cli".to_string(), 1),
                ("ml".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_top_tags_are_limited() {
        let stars: Vec<_> = (0..15)
            .map(|i| {
                let tag = format!("tag-{:02}", i);
                star(&format!("s{}", i), ContentType::Post, &[tag.as_str()])
            })
            .collect();
        let stats = compute(&stars, &[]);
        assert_eq!(stats.top_tags.len(), TOP_TAGS_LIMIT);
        assert_eq!(stats.top_tags[0].0, "tag-00");
    }
}

// Merge and dedup helpers shared by the full refresh and the live reducer.

use std::collections::HashSet;

use super::models::FeedItem;

/// Sort newest-first by creation time. Stable, so items with equal
/// timestamps keep their source order.
pub fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}

/// Drop every item whose id was already seen earlier in the list.
///
/// Returns the number of items removed.
pub fn dedup_by_id(items: &mut Vec<FeedItem>) -> usize {
    let before = items.len();
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.id().to_string()));
    before - items.len()
}

/// Build a full-refresh list from the three per-source results.
///
/// Sources are concatenated, sorted newest-first, then deduplicated so the
/// one-row-per-id invariant holds even if the backend returns overlaps.
pub fn merge_sources(sources: impl IntoIterator<Item = Vec<FeedItem>>) -> Vec<FeedItem> {
    let mut merged: Vec<FeedItem> = sources.into_iter().flatten().collect();
    sort_newest_first(&mut merged);
    dedup_by_id(&mut merged);
    merged
}

pub fn position_of(items: &[FeedItem], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

pub fn contains_id(items: &[FeedItem], id: &str) -> bool {
    position_of(items, id).is_some()
}

/// Find the row that represents `original_id` for bump purposes.
///
/// That is the original itself if listed, otherwise a standalone recast row
/// of the same original (inserted earlier because the original was never
/// fetched). Recites are their own cards and are never bump targets.
pub fn bump_target(items: &[FeedItem], original_id: &str) -> Option<usize> {
    position_of(items, original_id).or_else(|| {
        items.iter().position(|item| {
            matches!(item, FeedItem::Recast(r) if r.original_post_id == original_id)
        })
    })
}

/// Move the row at `index` to the front, keeping the relative order of the rest.
pub fn move_to_front(items: &mut [FeedItem], index: usize) {
    if index < items.len() {
        items[..=index].rotate_right(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::models::{Author, Engagement, Post, PostBody};
    use chrono::{TimeZone, Utc};

    fn post(id: &str, ts: i64) -> FeedItem {
        FeedItem::Post(Post {
            body: PostBody {
                id: id.to_string(),
                author: Author::default(),
                caption: String::new(),
                media: Vec::new(),
                level: Default::default(),
                created_at: Utc.timestamp_opt(ts, 0).unwrap(),
                engagement: Engagement::default(),
                bumped_by: None,
            },
        })
    }

    fn ids(items: &[FeedItem]) -> Vec<&str> {
        items.iter().map(|i| i.id()).collect()
    }

    #[test]
    fn move_to_front_preserves_rest() {
        let mut items = vec![post("a", 3), post("b", 2), post("c", 1)];
        move_to_front(&mut items, 2);
        assert_eq!(ids(&items), vec!["c", "a", "b"]);
    }

    #[test]
    fn move_to_front_out_of_range_is_noop() {
        let mut items = vec![post("a", 3)];
        move_to_front(&mut items, 5);
        assert_eq!(ids(&items), vec!["a"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut items = vec![post("a", 3), post("b", 2), post("a", 1)];
        assert_eq!(dedup_by_id(&mut items), 1);
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert_eq!(items[0].created_at().timestamp(), 3);
    }
}

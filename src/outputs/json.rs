//! JSON output.
//!
//! Serializes a collection as a pretty-printed JSON array. Each element
//! carries every item field plus its computed `rating`:
//!
//! ```text
//! [
//!   {
//!     "id": 101,
//!     "title": "...",
//!     "place": { "id": 5, "title": "...", "address": null, "slug": "..." },
//!     ...
//!     "rating": 0.98
//!   }
//! ]
//! ```

use crate::models::FeedItem;

/// Render `items` as a JSON array, in the given order.
pub fn render_items(items: &[FeedItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawFeedItem;

    #[test]
    fn test_render_keeps_order_and_rating() {
        let items: Vec<FeedItem> = [(2, 10), (1, 0)]
            .into_iter()
            .map(|(id, favorites_count)| {
                FeedItem::from(RawFeedItem {
                    id,
                    favorites_count,
                    publication_date: 1_725_000_000,
                    ..Default::default()
                })
            })
            .collect();

        let json = render_items(&items).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["id"], 2);
        assert_eq!(parsed[1]["id"], 1);
        assert_eq!(parsed[1]["rating"], 0.5);
        assert!(parsed[0]["rating"].as_f64().unwrap() > 0.99);
    }

    #[test]
    fn test_empty_collection_is_an_empty_array() {
        assert_eq!(render_items(&[]).unwrap(), "[]");
    }
}

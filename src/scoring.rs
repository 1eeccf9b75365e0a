//! Engagement scoring for feed items.
//!
//! A rating is the logistic transform of the favorites-to-comments ratio:
//!
//! ```text
//! rating = 1 / (1 + e^-(favorites / (comments + 1)))
//! ```
//!
//! The ratio uses real division, so `3 favorites / 2 comments` scores `1.0`
//! rather than truncating to `1`. The denominator is never zero.

/// Compute the rating for a pair of engagement counters.
///
/// Pure and deterministic. An item with no engagement at all scores `0.5`;
/// the result approaches `1.0` as favorites dominate comments.
pub fn rating(favorites_count: u32, comments_count: u32) -> f64 {
    let ratio = f64::from(favorites_count) / (f64::from(comments_count) + 1.0);
    1.0 / (1.0 + (-ratio).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_engagement_is_half() {
        assert_eq!(rating(0, 0), 0.5);
    }

    #[test]
    fn test_rating_is_pure() {
        assert_eq!(rating(42, 7), rating(42, 7));
        assert_eq!(rating(0, 1000), rating(0, 1000));
    }

    #[test]
    fn test_comments_only_stays_at_half() {
        // favorites are zero, so the ratio is zero whatever the comment count
        assert_eq!(rating(0, 9), 0.5);
    }

    #[test]
    fn test_ratio_uses_real_division() {
        let expected = 1.0 / (1.0 + (-0.5f64).exp());
        assert!((rating(1, 1) - expected).abs() < 1e-12);
        assert!(rating(1, 1) > rating(0, 1));
    }

    #[test]
    fn test_more_favorites_rank_higher() {
        assert!(rating(10, 0) > rating(5, 0));
        assert!(rating(10, 0) > rating(10, 4));
        assert!(rating(u32::MAX, 0) <= 1.0);
    }
}

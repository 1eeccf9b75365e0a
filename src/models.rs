//! Data models for feed entries and the page envelope they arrive in.
//!
//! This module defines the data structures shared by the fetcher, the
//! pipeline and the renderers:
//! - [`RawFeedItem`]: one entry exactly as the feed sends it
//! - [`FeedItem`]: an immutable entry with its rating computed once
//! - [`FeedPage`]: the paginated response envelope
//! - [`Place`]: the expanded place reference of an entry
//!
//! The feed uses snake_case field names, which map directly onto the
//! Rust field names.

use crate::scoring;
use chrono::{Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// A place reference attached to a feed entry.
///
/// Only present when the request asks the feed to expand places; otherwise
/// the entry carries no place at all.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Place {
    /// The feed's identifier for the place.
    pub id: i64,
    /// Display name of the place.
    #[serde(default)]
    pub title: Option<String>,
    /// Street address, when the feed knows it.
    #[serde(default)]
    pub address: Option<String>,
    /// URL slug of the place.
    #[serde(default)]
    pub slug: Option<String>,
}

/// A feed entry as it appears on the wire.
///
/// Everything except the publication timestamp is optional in practice, so
/// missing fields fall back to empty values instead of failing the page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeedItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub place: Option<Place>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub favorites_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    /// Seconds since the Unix epoch.
    pub publication_date: i64,
}

/// An immutable feed entry.
///
/// The rating is derived from the engagement counters when the item is
/// built and never changes afterwards. Fields are private, so an item can
/// only be created through [`From<RawFeedItem>`] (which deserialization
/// also goes through).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawFeedItem")]
pub struct FeedItem {
    id: i64,
    title: String,
    place: Option<Place>,
    description: String,
    site_url: String,
    favorites_count: u32,
    comments_count: u32,
    publication_date: i64,
    rating: f64,
}

impl From<RawFeedItem> for FeedItem {
    fn from(raw: RawFeedItem) -> Self {
        let rating = scoring::rating(raw.favorites_count, raw.comments_count);
        Self {
            id: raw.id,
            title: raw.title,
            place: raw.place,
            description: raw.description,
            site_url: raw.site_url,
            favorites_count: raw.favorites_count,
            comments_count: raw.comments_count,
            publication_date: raw.publication_date,
            rating,
        }
    }
}

impl FeedItem {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn place(&self) -> Option<&Place> {
        self.place.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn favorites_count(&self) -> u32 {
        self.favorites_count
    }

    pub fn comments_count(&self) -> u32 {
        self.comments_count
    }

    /// Publication time in seconds since the Unix epoch.
    pub fn publication_date(&self) -> i64 {
        self.publication_date
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Calendar date of publication in the local time zone.
    ///
    /// Returns `None` when the timestamp is out of range or ambiguous in the
    /// local zone.
    pub fn published_on(&self) -> Option<NaiveDate> {
        Local
            .timestamp_opt(self.publication_date, 0)
            .single()
            .map(|dt| dt.date_naive())
    }
}

/// One page of the paginated feed.
#[derive(Debug, Deserialize)]
pub struct FeedPage {
    /// Total number of entries across all pages, if reported.
    #[serde(default)]
    pub count: Option<u64>,
    /// URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    /// The entries on this page, in feed order.
    pub results: Vec<FeedItem>,
}

//! HTML output.
//!
//! Renders a collection as a self-contained HTML5 document with one table
//! row per item:
//!
//! | Column | Source |
//! |--------|--------|
//! | ID | item id |
//! | Title | item title |
//! | Published | local publication date, or the raw epoch seconds |
//! | Place | place id, or "Not specified" |
//! | Description | item description |
//! | URL | link to the item page |
//! | Favorites / Comments | engagement counters |
//! | Rating | computed rating |
//!
//! All feed text is escaped before it is written into the document.

use crate::models::FeedItem;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

const HEADERS: [&str; 9] = [
    "ID",
    "Title",
    "Published",
    "Place",
    "Description",
    "URL",
    "Favorites",
    "Comments",
    "Rating",
];

/// Render `items` as an HTML document, in the given order.
pub fn render_items(items: &[FeedItem]) -> Result<String, std::fmt::Error> {
    let mut html = String::new();

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>")?;
    writeln!(html, "\t<head>")?;
    writeln!(html, "\t\t<meta charset=\"UTF-8\">")?;
    writeln!(html, "\t\t<title>News</title>")?;
    writeln!(html, "\t</head>")?;
    writeln!(html, "\t<body>")?;
    writeln!(html, "\t\t<h1>News</h1>")?;
    writeln!(html, "\t\t<table>")?;

    write!(html, "\t\t\t<tr>")?;
    for header in HEADERS {
        write!(html, "<th>{header}</th>")?;
    }
    writeln!(html, "</tr>")?;

    for item in items {
        write_row(&mut html, item)?;
    }

    writeln!(html, "\t\t</table>")?;
    writeln!(html, "\t</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

fn write_row(html: &mut String, item: &FeedItem) -> std::fmt::Result {
    // timestamps with no local date are shown as raw epoch seconds
    let published = item
        .published_on()
        .map(|d| d.to_string())
        .unwrap_or_else(|| item.publication_date().to_string());
    let place = item
        .place()
        .map(|p| p.id.to_string())
        .unwrap_or_else(|| "Not specified".to_string());

    writeln!(html, "\t\t\t<tr>")?;
    writeln!(html, "\t\t\t\t<td>{}</td>", item.id())?;
    writeln!(html, "\t\t\t\t<td>{}</td>", encode_text(item.title()))?;
    writeln!(html, "\t\t\t\t<td>{published}</td>")?;
    writeln!(html, "\t\t\t\t<td>{place}</td>")?;
    writeln!(html, "\t\t\t\t<td>{}</td>", encode_text(item.description()))?;
    writeln!(
        html,
        "\t\t\t\t<td><a href=\"{}\">Link</a></td>",
        encode_double_quoted_attribute(item.site_url())
    )?;
    writeln!(html, "\t\t\t\t<td>{}</td>", item.favorites_count())?;
    writeln!(html, "\t\t\t\t<td>{}</td>", item.comments_count())?;
    writeln!(html, "\t\t\t\t<td>{}</td>", item.rating())?;
    writeln!(html, "\t\t\t</tr>")
}

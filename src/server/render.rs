//! HTML result view.

use super::pipeline::ProcessOutcome;
use crate::knowledge::CenterEntry;

const UNAVAILABLE: &str = "<p class=\"unavailable\">Information unavailable right now.</p>";
const NO_RECORDS: &str = "<p class=\"empty\">No matching records.</p>";

pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders a table, or the matching placeholder when rows are missing or empty.
fn table<T>(headers: &[&str], rows: Option<&[T]>, cells: impl Fn(&T) -> Vec<String>) -> String {
    let rows = match rows {
        None => return UNAVAILABLE.to_string(),
        Some([]) => return NO_RECORDS.to_string(),
        Some(rows) => rows,
    };

    let mut html = String::from("<table>\n<tr>");
    for header in headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in cells(row) {
            html.push_str(&format!("<td>{}</td>", escape_html(&cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn center_cells(center: &CenterEntry) -> Vec<String> {
    vec![
        center.location.clone(),
        center.center_name.clone(),
        center.address.clone(),
        optional(&center.contact),
        optional(&center.working_hours),
        optional(&center.website),
    ]
}

const CENTER_HEADERS: [&str; 6] = [
    "Location",
    "Center",
    "Address",
    "Contact",
    "Working hours",
    "Website",
];

pub fn render_result(outcome: &ProcessOutcome) -> String {
    let lookup = &outcome.lookup;
    let mut body = String::new();

    body.push_str(&format!(
        "<img src=\"{}\" alt=\"Submitted image\" class=\"submitted\">\n",
        escape_html(&outcome.image_url())
    ));

    body.push_str("<h2>Detected items</h2>\n");
    if outcome.detected_items.is_empty() {
        body.push_str("<p class=\"empty\">No objects detected.</p>\n");
    } else {
        body.push_str(&table(
            &["Item", "Count", "Confidence"],
            Some(outcome.detected_items.as_slice()),
            |item| {
                vec![
                    item.item_name.clone(),
                    item.count.to_string(),
                    item.confidence.clone(),
                ]
            },
        ));
        body.push('\n');
    }

    if !outcome.detected_items.is_empty() {
        body.push_str("<h2>Internal parts</h2>\n");
        body.push_str(&table(
            &[
                "Item",
                "Part",
                "Materials",
                "Recyclable",
                "Reusable",
                "Recycling process",
            ],
            lookup.parts.as_deref(),
            |part| {
                vec![
                    part.item_name.clone(),
                    part.part_name.clone(),
                    part.materials_used.clone(),
                    part.recyclable.as_str().to_string(),
                    part.reusable.as_str().to_string(),
                    part.recycling_process.clone(),
                ]
            },
        ));

        body.push_str("\n<h2>Recyclable value</h2>\n");
        body.push_str(&table(
            &["Part", "Materials", "Estimated value"],
            lookup.recyclable_values.as_deref(),
            |value| {
                vec![
                    value.part_name.clone(),
                    value.materials_used.clone(),
                    value.estimated_value.clone(),
                ]
            },
        ));

        body.push_str("\n<h2>Reusable parts</h2>\n");
        body.push_str(&table(
            &["Part", "Reuse potential", "Estimated value"],
            lookup.reusable_parts.as_deref(),
            |part| {
                vec![
                    part.part_name.clone(),
                    part.reuse_potential.clone(),
                    part.estimated_value.clone(),
                ]
            },
        ));

        body.push_str("\n<h2>Recycling centers</h2>\n");
        body.push_str(&table(
            &CENTER_HEADERS,
            lookup.recycling_centers.as_deref(),
            center_cells,
        ));

        body.push_str("\n<h2>Resale and donation areas</h2>\n");
        body.push_str(&table(
            &CENTER_HEADERS,
            lookup.resale_donate_areas.as_deref(),
            center_cells,
        ));
        body.push('\n');
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Recycle Lens - Result</title>\n</head>\n<body>\n<h1>Result</h1>\n{}<p><a href=\"/upload\">Upload another image</a> | <a href=\"/camera\">Use the camera</a> | <a href=\"/\">Home</a></p>\n</body>\n</html>\n",
        body
    )
}

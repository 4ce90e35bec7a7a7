//! HTML templates for the picker page.

use crate::models::Record;
use crate::utils::html_escape;

/// Page shell with the merge toolbar.
pub fn base_template(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - harvest</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <form id="merge-form">
        <header>
            <h1>{title}</h1>
            <input type="text" id="out-name" placeholder="output name" value="merged">
            <button type="submit" id="merge-button" disabled>Merge selected</button>
            <span id="selected-count">0 selected</span>
        </header>
        <div id="result"></div>
        {content}
    </form>
    <script src="/static/picker.js"></script>
</body>
</html>"#,
        title = html_escape(title),
        content = content,
    )
}

fn record_card(record: &Record) -> String {
    let thumbnail = if record.thumbnail_url.is_empty() {
        r#"<div class="noimg"></div>"#.to_string()
    } else {
        format!(
            r#"<img src="{}" alt="" loading="lazy">"#,
            html_escape(&record.thumbnail_url)
        )
    };
    let chip = if record.category.is_empty() {
        String::new()
    } else {
        format!(r#"<span class="chip">{}</span>"#, html_escape(&record.category))
    };

    format!(
        r#"<label class="card">
            {thumbnail}
            <span class="title">{title}</span>
            {chip}
            <input type="checkbox" name="file" value="{url}">
        </label>"#,
        thumbnail = thumbnail,
        title = html_escape(&record.title),
        chip = chip,
        url = html_escape(&record.downloadable_url),
    )
}

/// Grid of selectable records. `records` must already be in display order.
pub fn picker_page(records: &[Record]) -> String {
    let content = if records.is_empty() {
        r#"<p class="empty">No records harvested yet. Run <code>harvest crawl</code> first.</p>"#
            .to_string()
    } else {
        let cards: Vec<String> = records.iter().map(record_card).collect();
        format!(r#"<div class="grid">{}</div>"#, cards.join("\n"))
    };
    base_template(&format!("{} files", records.len()), &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_escapes_fields_and_skips_empty_parts() {
        let mut record = Record::new("<Shapes & Colors>", "https://e.com/a.pdf?x=1&y=2");
        let html = picker_page(std::slice::from_ref(&record));
        assert!(html.contains("&lt;Shapes &amp; Colors&gt;"));
        assert!(html.contains(r#"value="https://e.com/a.pdf?x=1&amp;y=2""#));
        assert!(html.contains("noimg"));
        assert!(!html.contains(r#"class="chip""#));

        record.category = "Math".to_string();
        record.thumbnail_url = "https://e.com/a.png".to_string();
        let html = picker_page(&[record]);
        assert!(html.contains(r#"<span class="chip">Math</span>"#));
        assert!(html.contains(r#"<img src="https://e.com/a.png""#));
    }

    #[test]
    fn test_empty_store_message() {
        assert!(picker_page(&[]).contains("No records harvested yet"));
    }
}

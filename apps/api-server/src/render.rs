//! Server-side HTML for the single analysis page.
//!
//! The page is written in pieces so the processing route can flush the head
//! first and then one row per image while the run is still going.

use crate::config::Sidebar;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use roof_inspection::{is_alert, AnalyzedImageRecord};

pub const PAGE_TITLE: &str = "Drone Image Analysis";

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; display: flex; min-height: 100vh; }
aside { width: 18rem; padding: 1.5rem; background: #f0f2f6; }
main { flex: 1; padding: 1.5rem 3rem; }
.row { display: flex; gap: 2rem; margin-bottom: 1.5rem; }
.row > div { flex: 1; }
.row img { width: 100%; }
.alert { padding: 0.75rem 1rem; border-radius: 0.5rem; background: #ffe2e2; color: #7d1a1a; }
.plain { margin: 0.75rem 0; }
.error { padding: 0.75rem 1rem; border-radius: 0.5rem; background: #ffd0d0; color: #5c0000; white-space: pre-wrap; }
.status { color: #555; }
"#;

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn page_head(sidebar: &Sidebar) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<aside>
<h2>{sidebar_title}</h2>
<p>{sidebar_text}</p>
</aside>
<main>
<h1>{title}</h1>
"#,
        title = PAGE_TITLE,
        style = STYLE,
        sidebar_title = escape_html(&sidebar.title),
        sidebar_text = escape_html(&sidebar.text),
    )
}

pub fn trigger_form() -> String {
    r#"<form method="post" action="/process"><button type="submit">Process Images</button></form>
"#
    .to_string()
}

pub fn page_tail() -> String {
    "</main>\n</body>\n</html>\n".to_string()
}

/// One judged field. Alert style only for an exact `"Yes"`, plain for anything else.
pub fn render_field(label: &str, value: &str) -> String {
    let class = if is_alert(value) { "alert" } else { "plain" };
    format!(
        "<div class=\"{}\">{} = {}</div>\n",
        class,
        escape_html(label),
        escape_html(value)
    )
}

pub fn image_url(image_file: &str) -> String {
    format!("/images/{}", utf8_percent_encode(image_file, NON_ALPHANUMERIC))
}

pub fn render_row(record: &AnalyzedImageRecord) -> String {
    format!(
        r#"<section class="row">
<div><img src="{src}" alt="{name}"></div>
<div>
<p>Image: {name}</p>
{hatch}{construction}</div>
</section>
"#,
        src = image_url(&record.image_file),
        name = escape_html(&record.image_file),
        hatch = render_field("Hatch Open", &record.response.open_hatch),
        construction = render_field("Construction", &record.response.construction),
    )
}

pub fn render_error(message: &str) -> String {
    format!("<div class=\"error\">{}</div>\n", escape_html(message))
}

pub fn render_status(processed: usize, failed: bool) -> String {
    let images = match processed {
        1 => "1 image".to_string(),
        n => format!("{} images", n),
    };
    let text = if failed {
        format!("Stopped after {}.", images)
    } else {
        format!("Processed {}.", images)
    };
    format!("<p class=\"status\">{}</p>\n", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roof_inspection::InferenceResult;

    #[test]
    fn yes_is_rendered_as_alert() {
        assert_eq!(
            render_field("Hatch Open", "Yes"),
            "<div class=\"alert\">Hatch Open = Yes</div>\n"
        );
    }

    #[test]
    fn anything_else_is_plain() {
        for value in ["No", "maybe", "", "yes"] {
            let html = render_field("Construction", value);
            assert!(html.starts_with("<div class=\"plain\">"), "{}", html);
            assert!(html.contains(&format!("Construction = {}<", value)));
        }
    }

    #[test]
    fn row_links_image_and_escapes_name() {
        let record = AnalyzedImageRecord::new(
            "roof <1>.png",
            InferenceResult::new("No", "Yes"),
        );
        let html = render_row(&record);

        assert!(html.contains(r#"src="/images/roof%20%3C1%3E%2Epng""#));
        assert!(html.contains("<p>Image: roof &lt;1&gt;.png</p>"));
        assert!(html.contains("<div class=\"plain\">Hatch Open = No</div>"));
        assert!(html.contains("<div class=\"alert\">Construction = Yes</div>"));
    }

    #[test]
    fn status_counts_images() {
        assert_eq!(
            render_status(1, true),
            "<p class=\"status\">Stopped after 1 image.</p>\n"
        );
        assert_eq!(
            render_status(1, false),
            "<p class=\"status\">Processed 1 image.</p>\n"
        );
        assert!(render_status(0, false).contains("Processed 0 images."));
        assert!(render_status(3, true).contains("Stopped after 3 images."));
    }

    #[test]
    fn head_carries_title_and_sidebar() {
        let html = page_head(&Sidebar {
            title: "Team".into(),
            text: "Members: A & B".into(),
        });
        assert!(html.contains("<h1>Drone Image Analysis</h1>"));
        assert!(html.contains("<h2>Team</h2>"));
        assert!(html.contains("Members: A &amp; B"));
    }
}

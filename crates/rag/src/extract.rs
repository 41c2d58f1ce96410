//! Source normalization: HTML chapter bodies to structured plain text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Elements whose content never reaches the generation context.
const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "iframe", "svg", "head"];

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[*+-][ \t]+").expect("valid regex"));

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));

static IMG_ALT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[alt]").expect("valid selector"));

static IMG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[title]").expect("valid selector"));

static FIGCAPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("figcaption").expect("valid selector"));

/// Convert HTML into plain text that keeps paragraph structure.
///
/// Conversion goes through `htmd`, which decodes every HTML5 entity and
/// drops script and style bodies. List items come out as bullets.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    let converted = converter.convert(html).unwrap_or_else(|e| {
        warn!(error = %e, "htmd conversion failed, falling back to document text");
        document_text(&Html::parse_fragment(html))
    });

    let text = LIST_MARKER.replace_all(&converted, "• ");
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Image alt texts, figure captions and image titles, in that order,
/// without duplicates.
pub fn image_descriptions(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let mut found: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        let description = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if !description.is_empty() && !found.contains(&description) {
            found.push(description);
        }
    };

    for img in fragment.select(&IMG_ALT) {
        push(img.value().attr("alt").unwrap_or_default());
    }
    for caption in fragment.select(&FIGCAPTION) {
        push(&caption.text().collect::<String>());
    }
    for img in fragment.select(&IMG_TITLE) {
        push(img.value().attr("title").unwrap_or_default());
    }

    found
}

/// Plain text for one HTML section, with its image descriptions appended.
pub fn html_section(title: Option<&str>, html: &str) -> String {
    let mut out = String::new();
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        out.push_str("# ");
        out.push_str(title);
        out.push_str("\n\n");
    }

    out.push_str(&html_to_text(html));

    let images = image_descriptions(html);
    if !images.is_empty() {
        debug!(count = images.len(), "Extracted image descriptions");
        out.push_str("\n\n[Images in this section: ");
        out.push_str(&images.join("; "));
        out.push(']');
    }

    out.trim().to_string()
}

/// Join the extracted texts of one unit with blank lines, skipping empties.
pub fn combine_sources<I, S>(sources: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sources
        .into_iter()
        .filter_map(|s| {
            let trimmed = s.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Text nodes outside skipped elements, one block per line.
fn document_text(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node.ancestors().filter_map(ElementRef::wrap).any(|el| {
                SKIPPED_TAGS.contains(&el.value().name())
            })
        })
        .map(|(_, text)| text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_become_blank_lines() {
        let html = "<p>First paragraph.</p><p>Second   paragraph.</p>";
        assert_eq!(html_to_text(html), "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn headings_are_separated_from_body() {
        let text = html_to_text("<h2>Photosynthesis</h2><p>Plants convert light.</p>");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Photosynthesis"));
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Plants convert light.");
    }

    #[test]
    fn list_items_become_bullets() {
        let text = html_to_text("<ul><li>Roots</li><li class=\"x\">Leaves</li></ul>");
        let bullets: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(bullets, vec!["• Roots", "• Leaves"]);
    }

    #[test]
    fn named_entities_are_decoded() {
        let text = html_to_text("<p>caf&eacute; &uuml;ber &euro;5 &mdash; 5 &lt; 6</p>");
        assert!(text.contains("café über €5"));
        assert!(text.contains('—'));
        assert!(!text.contains('&'));
    }

    #[test]
    fn script_and_style_bodies_are_dropped() {
        let html = "<p>Visible text.</p><script>var secret = 1;</script><style>p{color:red}</style>";
        let text = html_to_text(html);
        assert_eq!(text, "Visible text.");
        assert!(!text.contains("secret"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn no_markup_survives() {
        let text = html_to_text("<div><span>a</span> <em>b</em><br><table><tr><td>c</td></tr></table></div>");
        for word in ["a", "b", "c"] {
            assert!(text.contains(word));
        }
        assert!(!text.contains('<'));
    }

    #[test]
    fn blank_html_is_empty() {
        assert_eq!(html_to_text("   "), "");
        assert_eq!(html_to_text("<div></div>"), "");
    }

    #[test]
    fn document_text_skips_scripts() {
        let fragment = Html::parse_fragment("<p>Kept</p><script>dropped()</script><p>Also kept</p>");
        assert_eq!(document_text(&fragment), "Kept\nAlso kept");
    }

    #[test]
    fn image_descriptions_are_collected_once() {
        let html = r#"
            <img src="a.png" alt="Cell diagram" title="Cell diagram">
            <figure><img src="b.png" title="Mitosis"><figcaption>Stage <b>one</b></figcaption></figure>
            <img src="c.png" alt=" ">
            <img src="d.png" alt="Ion &amp; channel">
        "#;
        assert_eq!(
            image_descriptions(html),
            vec!["Cell diagram", "Ion & channel", "Stage one", "Mitosis"]
        );
    }

    #[test]
    fn section_includes_title_and_images() {
        let html = r#"<p>Body text.</p><img alt="Chart">"#;
        assert_eq!(
            html_section(Some("Intro"), html),
            "# Intro\n\nBody text.\n\n[Images in this section: Chart]"
        );
        assert_eq!(html_section(None, "<p>Only body.</p>"), "Only body.");
    }

    #[test]
    fn combine_skips_empty_sources() {
        let combined = combine_sources(["  Chapter one. ", "", "\n", "Chapter two."]);
        assert_eq!(combined, "Chapter one.\n\nChapter two.");
        assert_eq!(combine_sources(Vec::<String>::new()), "");
    }
}

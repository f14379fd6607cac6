use md_pdf::config::{ColorMode, PageSize};
use md_pdf::document::PageGeometry;
use md_pdf::highlighting;
use md_pdf::render_document;
use std::collections::BTreeSet;

const SAMPLE: &str = r#"# Quarterly report

Revenue grew, see the table and the note[^src].

| Region | Q1 | Q2 |
|--------|----|----|
| North  | 10 | 12 |
| South  | 7  | 9  |

```python
def total(xs):
    # sum everything
    return sum(xs) + 1.5
```

```javascript
const greet = (name) => `hi ${name}`;
```

[^src]: Internal accounting.
"#;

fn body(html: &str) -> &str {
    let start = html.find("<body>").unwrap();
    &html[start..]
}

/// Every `class="..."` token inside highlighted code blocks.
fn span_classes(html: &str) -> BTreeSet<String> {
    let mut classes = BTreeSet::new();
    for chunk in html.split("<span class=\"").skip(1) {
        if let Some(end) = chunk.find('"') {
            classes.insert(chunk[..end].to_string());
        }
    }
    classes
}

#[test]
fn test_modes_change_styles_not_content() {
    let geometry = PageGeometry::default();
    let light = render_document(SAMPLE, ColorMode::Light, &geometry, None).unwrap();
    let dark = render_document(SAMPLE, ColorMode::Dark, &geometry, None).unwrap();

    assert_eq!(body(light.as_str()), body(dark.as_str()));
    assert_ne!(light.as_str(), dark.as_str());
    assert!(dark.as_str().contains("#0d1117"));
}

#[test]
fn test_page_rule_follows_geometry() {
    let cases = [
        (PageSize::Letter, 0.5, "@page { size: letter; margin: 0.5in; }"),
        (PageSize::A4, 0.5, "@page { size: A4; margin: 0.5in; }"),
        (PageSize::A4, 1.25, "@page { size: A4; margin: 1.25in; }"),
        (PageSize::Letter, 0.0, "@page { size: letter; margin: 0in; }"),
    ];
    for (size, margin, expected) in cases {
        let geometry = PageGeometry::new(size, margin).unwrap();
        let doc = render_document("text", ColorMode::Light, &geometry, None).unwrap();
        assert_eq!(doc.as_str().matches("@page").count(), 1);
        assert!(doc.as_str().contains(expected), "{}", expected);
    }
}

#[test]
fn test_every_token_class_has_a_rule() {
    for mode in [ColorMode::Light, ColorMode::Dark] {
        let doc = render_document(SAMPLE, mode, &PageGeometry::default(), None).unwrap();
        let html = doc.as_str();
        let css = highlighting::stylesheet_for(mode).unwrap();

        assert!(html.contains("<div class=\"codehilite\"><pre><code class=\"language-python\">"));
        let classes = span_classes(body(html));
        assert!(classes.contains("k"));
        assert!(classes.contains("c"));
        for class in &classes {
            assert!(
                css.contains(&format!(".codehilite .{} {{", class)),
                "missing rule for .{}",
                class
            );
        }
    }
}

#[test]
fn test_table_cell_counts() {
    let doc = render_document(SAMPLE, ColorMode::Light, &PageGeometry::default(), None).unwrap();
    let html = doc.as_str();
    assert_eq!(html.matches("<table>").count(), 1);
    assert_eq!(html.matches("<th>").count(), 3);
    assert_eq!(html.matches("<td>").count(), 6);
}

#[test]
fn test_footnote_block() {
    let doc = render_document(SAMPLE, ColorMode::Light, &PageGeometry::default(), None).unwrap();
    let html = doc.as_str();
    assert!(html.contains("<div class=\"footnote\">"));
    assert!(html.contains("class=\"footnote-ref\" href=\"#fn:src\""));
    assert!(html.contains("class=\"footnote-backref\""));
}

#[test]
fn test_undefined_footnote_reference_renders() {
    let doc = render_document(
        "A claim[^nowhere] without a source.",
        ColorMode::Light,
        &PageGeometry::default(),
        None,
    )
    .unwrap();
    assert!(doc.as_str().contains("without a source."));
}

#[test]
fn test_document_is_self_contained() {
    let doc = render_document(SAMPLE, ColorMode::Light, &PageGeometry::default(), None).unwrap();
    let html = doc.as_str();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(!html.contains("<link"));
    assert!(!html.contains("<script"));
}

//! End-to-end rendering through a real browser.
//!
//! Ignored by default; run with `cargo test -- --ignored` on a machine with
//! Chrome or Chromium installed.

use lopdf::{Document, Object, ObjectId};
use md_pdf::config::{ColorMode, PageSize};
use std::fs;
use tempfile::tempdir;

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        other => panic!("not a number: {:?}", other),
    }
}

/// Width and height in points of a page's MediaBox, following Parent links.
fn media_box(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let mut dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    loop {
        if let Ok(mb) = dict.get(b"MediaBox") {
            let arr = mb.as_array().unwrap();
            return (
                number(&arr[2]) - number(&arr[0]),
                number(&arr[3]) - number(&arr[1]),
            );
        }
        let parent = dict.get(b"Parent").unwrap().as_reference().unwrap();
        dict = doc.get_object(parent).unwrap().as_dict().unwrap();
    }
}

fn render(size: PageSize, mode: ColorMode) -> Document {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(
        &input,
        "# Title\n\nParagraph with `code`.\n\n```rust\nfn main() { println!(\"hi\"); }\n```\n",
    )
    .unwrap();
    let output = dir.path().join("doc.pdf");

    md_pdf::convert(&input, &output, mode, size, 0.5).unwrap();

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    Document::load_mem(&bytes).unwrap()
}

#[test]
#[ignore]
fn test_letter_page_box() {
    let doc = render(PageSize::Letter, ColorMode::Light);
    let pages = doc.get_pages();
    assert!(!pages.is_empty());
    let (w, h) = media_box(&doc, *pages.values().next().unwrap());
    assert!((w - 612.0).abs() < 2.0, "width {}", w);
    assert!((h - 792.0).abs() < 2.0, "height {}", h);
}

#[test]
#[ignore]
fn test_a4_dark_page_box() {
    let doc = render(PageSize::A4, ColorMode::Dark);
    let pages = doc.get_pages();
    let (w, h) = media_box(&doc, *pages.values().next().unwrap());
    assert!((w - 595.0).abs() < 2.0, "width {}", w);
    assert!((h - 842.0).abs() < 2.0, "height {}", h);
}

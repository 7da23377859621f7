//! Shared helpers for the integration tests: in-memory PDFs and config.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use papra_ingest::IngestConfig;
use std::path::{Path, PathBuf};

/// Build a PDF with one page per entry of `pages`; each page shows its lines
/// top to bottom, one text object per line.
pub fn build_pdf(pages: &[Vec<&str>], title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let y = 780 - (i as i64) * 16;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
            operations.push(Operation::new("Td", vec![50.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialise PDF");
    bytes
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_pdf(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(&path, bytes).expect("write PDF");
    path
}

/// Ten pages of an invoice: the first page carries the heading and the
/// amount due, the rest is filler so the page density is realistic.
pub fn invoice_pdf() -> Vec<u8> {
    let mut pages: Vec<Vec<&str>> = vec![vec![
        "INVOICE SUMMARY",
        "Invoice Amount Due $1,200.00",
        "Billed to accounts@example.com on 03/15/2024.",
        "Reference INV-2024-0042 applies to this billing period.",
    ]];
    for _ in 1..10 {
        pages.push(vec![
            "Line items are listed below with quantities and unit prices.",
            "Consulting services were delivered during the billing period.",
        ]);
    }
    build_pdf(&pages, Some("March Invoice"))
}

/// A configuration pointing both Papra and OpenRouter at `base_url`.
pub fn config_for(base_url: &str, openrouter_key: Option<&str>) -> IngestConfig {
    let mut builder = IngestConfig::builder()
        .papra_url(base_url)
        .papra_api_key("papra-key")
        .papra_organization_id("org_1")
        .openrouter_endpoint(format!("{base_url}/api/v1"));
    if let Some(key) = openrouter_key {
        builder = builder.openrouter_api_key(key);
    }
    builder.build().expect("valid test config")
}

/// A chat-completion reply whose message content is `content`.
pub fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "gen-1",
        "choices": [ { "message": { "role": "assistant", "content": content } } ]
    })
}

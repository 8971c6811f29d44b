use super::{truncate_chars, Analysis, Analyzer, AnalyzerKind, AnalyzerOptions};
use crate::utils::error::Result;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const METADATA_FIELDS: [&str; 8] = [
    "Title",
    "Author",
    "Subject",
    "Creator",
    "Producer",
    "CreationDate",
    "ModDate",
    "Keywords",
];
const PAGE_SAMPLE_LENGTH: usize = 500;
const SUMMARY_LENGTH: usize = 500;

pub struct PdfAnalyzer {
    options: AnalyzerOptions,
}

impl PdfAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }
}

impl Analyzer for PdfAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Pdf
    }

    fn analyze(&self, path: &Path) -> Result<Analysis> {
        let file_info = self.options.check_file(path)?;
        let document = Document::load(path)?;
        let page_texts = page_texts(&document);
        let mut analysis = Analysis::new(AnalyzerKind::Pdf, file_info);

        analysis.detail(
            "pdf_info",
            json!({
                "page_count": page_texts.len(),
                "is_encrypted": document.trailer.has(b"Encrypt"),
                "metadata": metadata(&document),
            }),
        );

        let pages: Vec<Value> = page_texts
            .iter()
            .map(|(number, text)| {
                let length = text.chars().count();
                let sample = if length > PAGE_SAMPLE_LENGTH {
                    format!("{}...", truncate_chars(text, PAGE_SAMPLE_LENGTH))
                } else {
                    text.clone()
                };
                json!({"page_number": number, "text_length": length, "text": sample})
            })
            .collect();
        analysis.detail("pages", pages);

        let full_text = page_texts
            .iter()
            .map(|(number, text)| format!("=== Page {} ===\n{}", number, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let total_characters = full_text.chars().count();
        let stats = &mut analysis.statistics;
        stats.insert("total_pages".into(), page_texts.len().into());
        stats.insert("total_characters".into(), total_characters.into());
        stats.insert(
            "total_words".into(),
            full_text.split_whitespace().count().into(),
        );
        stats.insert(
            "average_chars_per_page".into(),
            total_characters
                .checked_div(page_texts.len())
                .unwrap_or(0)
                .into(),
        );

        analysis.summary = Some(summarize(&full_text));
        analysis.detail("toc", table_of_contents(&document));
        analysis.full_text = Some(full_text);

        Ok(analysis)
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        self.options.check_file(path)?;
        let document = Document::load(path)?;

        let blocks: Vec<String> = page_texts(&document)
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(number, text)| format!("=== Page {} ===\n{}", number, text))
            .collect();
        Ok(blocks.join("\n\n"))
    }
}

/// Text of every page in order. Pages whose content cannot be decoded
/// count as empty.
fn page_texts(document: &Document) -> Vec<(u32, String)> {
    document
        .get_pages()
        .keys()
        .map(|&number| {
            let text = document.extract_text(&[number]).unwrap_or_else(|e| {
                tracing::debug!("No text extracted from page {}: {}", number, e);
                String::new()
            });
            (number, text)
        })
        .collect()
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, object).as_dict().ok()
}

/// Text strings are UTF-16BE with a byte order mark, or single byte otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let (text, _) = encoding_rs::UTF_16BE.decode_without_bom_handling(utf16);
        return text.into_owned();
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn object_text(document: &Document, object: &Object) -> Option<String> {
    match resolve(document, object) {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(n) => Some(n.to_string()),
        Object::Real(n) => Some(n.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn metadata(document: &Document) -> Map<String, Value> {
    let Some(info) = document
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| resolve_dict(document, object))
    else {
        return Map::new();
    };

    METADATA_FIELDS
        .iter()
        .filter_map(|field| {
            let value = info.get(field.as_bytes()).ok()?;
            Some((field.to_string(), Value::String(object_text(document, value)?)))
        })
        .collect()
}

/// Outline entries as `{title, level, page}`, top level items at level 0.
fn table_of_contents(document: &Document) -> Vec<Value> {
    let first = document
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|root| resolve_dict(document, root))
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|outlines| resolve_dict(document, outlines))
        .and_then(|outlines| outlines.get(b"First").ok())
        .and_then(|first| first.as_reference().ok());

    let Some(first) = first else {
        return Vec::new();
    };

    let page_numbers: HashMap<ObjectId, u32> = document
        .get_pages()
        .into_iter()
        .map(|(number, id)| (id, number))
        .collect();

    let mut toc = Vec::new();
    let mut visited = HashSet::new();
    walk_outline(document, first, 0, &page_numbers, &mut visited, &mut toc);
    toc
}

fn walk_outline(
    document: &Document,
    first: ObjectId,
    level: usize,
    page_numbers: &HashMap<ObjectId, u32>,
    visited: &mut HashSet<ObjectId>,
    toc: &mut Vec<Value>,
) {
    let mut current = first;
    // 大綱可能出現循環參照
    while visited.insert(current) {
        let Ok(item) = document.get_dictionary(current) else {
            break;
        };

        if let Some(title) = item.get(b"Title").ok().and_then(|t| object_text(document, t)) {
            let mut entry = json!({"title": title, "level": level});
            if let Some(page) = destination_page(document, item, page_numbers) {
                entry["page"] = json!(page);
            }
            toc.push(entry);
        }

        if let Ok(child) = item.get(b"First").and_then(Object::as_reference) {
            walk_outline(document, child, level + 1, page_numbers, visited, toc);
        }
        match item.get(b"Next").and_then(Object::as_reference) {
            Ok(next) => current = next,
            Err(_) => break,
        }
    }
}

/// Page number of an outline item's explicit destination, either `Dest`
/// or the `D` entry of a GoTo action. Named destinations are not resolved.
fn destination_page(
    document: &Document,
    item: &Dictionary,
    page_numbers: &HashMap<ObjectId, u32>,
) -> Option<u32> {
    let destination = match item.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => resolve_dict(document, item.get(b"A").ok()?)?.get(b"D").ok()?,
    };
    let target = resolve(document, destination).as_array().ok()?.first()?;
    page_numbers.get(&target.as_reference().ok()?).copied()
}

/// Whitespace collapsed text, cut to a sentence end when one falls in
/// the second half of the first 500 characters.
fn summarize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() <= SUMMARY_LENGTH {
        return collapsed;
    }

    let head = &chars[..SUMMARY_LENGTH];
    let boundary = head
        .iter()
        .rposition(|&c| c == '。')
        .or_else(|| head.iter().rposition(|&c| c == '.'));
    match boundary {
        Some(pos) if pos > SUMMARY_LENGTH / 2 => head[..=pos].iter().collect(),
        _ => format!("{}...", head.iter().collect::<String>()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream, StringFormat};
    use tempfile::TempDir;

    fn utf16_string(text: &str) -> Object {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(text.encode_utf16().flat_map(|unit| unit.to_be_bytes()));
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    fn page(document: &mut Document, parent: ObjectId, resources: ObjectId, text: Option<&str>) -> ObjectId {
        let operations = match text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        })
    }

    fn write_pdf(dir: &Path) -> std::path::PathBuf {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let first = page(&mut document, pages_id, resources_id, Some("Hello PDF world"));
        let blank = page(&mut document, pages_id, resources_id, None);
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), blank.into()],
                "Count" => 2,
            }),
        );

        let item_id = document.new_object_id();
        let outlines_id = document.add_object(dictionary! {
            "Type" => "Outlines",
            "First" => item_id,
            "Last" => item_id,
            "Count" => 1,
        });
        document.objects.insert(
            item_id,
            Object::Dictionary(dictionary! {
                "Title" => Object::string_literal("Chapter 1"),
                "Parent" => outlines_id,
                "Dest" => vec![first.into(), "Fit".into()],
            }),
        );

        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Outlines" => outlines_id,
        });
        let info_id = document.add_object(dictionary! {
            "Title" => utf16_string("設計書"),
            "Author" => Object::string_literal("QA Team"),
        });
        document.trailer.set("Root", catalog_id);
        document.trailer.set("Info", info_id);

        let path = dir.join("design.pdf");
        document.save(&path).unwrap();
        path
    }

    #[test]
    fn test_pdf_analysis() {
        let dir = TempDir::new().unwrap();
        let path = write_pdf(dir.path());

        let analysis = PdfAnalyzer::new(AnalyzerOptions::default()).analyze(&path).unwrap();

        let info = &analysis.details["pdf_info"];
        assert_eq!(info["page_count"], json!(2));
        assert_eq!(info["is_encrypted"], json!(false));
        assert_eq!(info["metadata"], json!({"Title": "設計書", "Author": "QA Team"}));

        assert_eq!(analysis.details["pages"][0]["page_number"], json!(1));
        assert!(analysis.details["pages"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Hello PDF world"));
        assert_eq!(analysis.statistics["total_pages"], json!(2));

        let full_text = analysis.full_text.as_deref().unwrap();
        assert!(full_text.starts_with("=== Page 1 ===\n"));
        assert!(full_text.contains("=== Page 2 ==="));

        assert_eq!(
            analysis.details["toc"],
            json!([{"title": "Chapter 1", "level": 0, "page": 1}])
        );
    }

    #[test]
    fn test_extract_text_skips_blank_pages() {
        let dir = TempDir::new().unwrap();
        let path = write_pdf(dir.path());

        let text = PdfAnalyzer::new(AnalyzerOptions::default())
            .extract_text(&path)
            .unwrap();
        assert!(text.starts_with("=== Page 1 ===\n"));
        assert!(text.contains("Hello PDF world"));
        assert!(!text.contains("=== Page 2 ==="));
    }

    #[test]
    fn test_summary_cuts_at_sentence_end() {
        let text = format!("{}。{}", "あ".repeat(300), "い".repeat(300));
        let summary = summarize(&text);
        assert_eq!(summary.chars().count(), 301);
        assert!(summary.ends_with('。'));

        let early = format!("{}。{}", "あ".repeat(100), "い".repeat(500));
        let summary = summarize(&early);
        assert_eq!(summary.chars().count(), SUMMARY_LENGTH + 3);
        assert!(summary.ends_with("..."));

        assert_eq!(summarize("short\n\n  text"), "short text");
    }

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x30, 0x42]), "あ");
        assert_eq!(decode_pdf_string(b"Caf\xe9"), "Café");
    }
}

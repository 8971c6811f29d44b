use super::ooxml::{attr, Package};
use super::{truncate_chars, Analysis, Analyzer, AnalyzerKind, AnalyzerOptions};
use crate::utils::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{json, Value};
use std::path::Path;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const DEFAULT_LAYOUT: &str = "Custom";
const UNTITLED: &str = "Untitled Presentation";

/// `.pptx` slide decks.
pub struct PptxAnalyzer {
    options: AnalyzerOptions,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SlideTable {
    columns: usize,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct Slide {
    /// Non-empty shape texts in document order.
    texts: Vec<String>,
    /// Text of the title placeholder, if the slide has one.
    title: Option<String>,
    tables: Vec<SlideTable>,
    pictures: usize,
    layout: String,
}

impl Slide {
    fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => self
                .texts
                .first()
                .map(|text| truncate_chars(text, 50).to_string())
                .unwrap_or_default(),
        }
    }
}

struct Deck {
    slides: Vec<Slide>,
    width: Option<u64>,
    height: Option<u64>,
}

impl Deck {
    fn title(&self) -> String {
        let Some(first) = self.slides.first() else {
            return UNTITLED.to_string();
        };
        if let Some(title) = &first.title {
            return title.clone();
        }
        first
            .texts
            .first()
            .map(|text| truncate_chars(text, 100).to_string())
            .unwrap_or_else(|| UNTITLED.to_string())
    }
}

impl PptxAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }
}

impl Analyzer for PptxAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::PowerPoint
    }

    fn analyze(&self, path: &Path) -> Result<Analysis> {
        let file_info = self.options.check_file(path)?;
        let deck = read_deck(path)?;
        let mut analysis = Analysis::new(AnalyzerKind::PowerPoint, file_info);

        let all_text: Vec<&str> = deck
            .slides
            .iter()
            .flat_map(|slide| slide.texts.iter().map(String::as_str))
            .collect();

        analysis.detail(
            "presentation_info",
            json!({
                "slide_count": deck.slides.len(),
                "title": deck.title(),
                "slide_width": deck.width,
                "slide_height": deck.height,
            }),
        );

        let slides: Vec<Value> = deck
            .slides
            .iter()
            .enumerate()
            .map(|(i, slide)| {
                json!({
                    "slide_number": i + 1,
                    "title": slide.display_title(),
                    "has_title": slide.has_title(),
                    "text_boxes": slide.texts.len(),
                    "text_content": slide.texts,
                    "layout": slide.layout,
                })
            })
            .collect();
        analysis.detail("slides", slides);

        let tables: Vec<Value> = deck
            .slides
            .iter()
            .enumerate()
            .flat_map(|(i, slide)| {
                slide.tables.iter().map(move |table| {
                    json!({
                        "slide": i + 1,
                        "rows": table.rows.len(),
                        "columns": table.columns,
                        "data": table.rows,
                    })
                })
            })
            .collect();

        let stats = &mut analysis.statistics;
        stats.insert("total_slides".into(), deck.slides.len().into());
        stats.insert(
            "total_text_boxes".into(),
            deck.slides.iter().map(|s| s.texts.len()).sum::<usize>().into(),
        );
        stats.insert(
            "total_words".into(),
            all_text.join(" ").split_whitespace().count().into(),
        );
        stats.insert("tables_count".into(), tables.len().into());
        if self.options.extract_images {
            stats.insert(
                "images_count".into(),
                deck.slides.iter().map(|s| s.pictures).sum::<usize>().into(),
            );
        }

        if self.options.extract_tables {
            analysis.detail("tables", tables);
        }
        analysis.full_text = Some(all_text.join("\n\n"));

        let outline: Vec<String> = deck
            .slides
            .iter()
            .enumerate()
            .filter_map(|(i, slide)| {
                let title = slide.display_title();
                (!title.is_empty()).then(|| format!("{}. {}", i + 1, title))
            })
            .collect();
        analysis.detail("outline", outline);

        Ok(analysis)
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        self.options.check_file(path)?;
        let deck = read_deck(path)?;

        let blocks: Vec<String> = deck
            .slides
            .iter()
            .enumerate()
            .filter(|(_, slide)| !slide.texts.is_empty())
            .map(|(i, slide)| {
                let mut lines = vec![format!("=== Slide {} ===", i + 1)];
                lines.extend(slide.texts.iter().cloned());
                lines.join("\n")
            })
            .collect();
        Ok(blocks.join("\n\n"))
    }
}

fn read_deck(path: &Path) -> Result<Deck> {
    let mut package = Package::open(path)?;
    let (slide_ids, width, height) = match package.read_part(PRESENTATION_PART)? {
        Some(xml) => parse_presentation(&xml)?,
        None => (Vec::new(), None, None),
    };

    let relationships = package.relationships(PRESENTATION_PART)?;
    let mut slide_parts: Vec<String> = slide_ids
        .iter()
        .filter_map(|id| relationships.get(id))
        .filter(|rel| rel.is_type("/slide"))
        .map(|rel| rel.target.clone())
        .collect();
    if slide_parts.is_empty() {
        slide_parts = numbered_slide_parts(&package.part_names());
    }

    let mut slides = Vec::with_capacity(slide_parts.len());
    for part in slide_parts {
        let Some(xml) = package.read_part(&part)? else {
            tracing::warn!("Slide part {} is missing", part);
            continue;
        };
        let mut slide = parse_slide(&xml)?;
        slide.layout = layout_name(&mut package, &part)?;
        slides.push(slide);
    }
    tracing::debug!("Read {} slides from {}", slides.len(), path.display());

    Ok(Deck {
        slides,
        width,
        height,
    })
}

/// `ppt/slides/slideN.xml` parts ordered by N.
fn numbered_slide_parts(names: &[String]) -> Vec<String> {
    let mut numbered: Vec<(u32, String)> = names
        .iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.clone()))
        })
        .collect();
    numbered.sort();
    numbered.into_iter().map(|(_, name)| name).collect()
}

/// Slide relationship ids in presentation order, plus the slide size in EMU.
fn parse_presentation(xml: &str) -> Result<(Vec<String>, Option<u64>, Option<u64>)> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    let mut width = None;
    let mut height = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sldId" => ids.extend(attr(&e, "r:id")?),
                b"sldSz" => {
                    width = attr(&e, "cx")?.and_then(|v| v.parse().ok());
                    height = attr(&e, "cy")?.and_then(|v| v.parse().ok());
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((ids, width, height))
}

fn layout_name(package: &mut Package, slide_part: &str) -> Result<String> {
    let relationships = package.relationships(slide_part)?;
    let Some(layout) = relationships.values().find(|rel| rel.is_type("/slideLayout")) else {
        return Ok(DEFAULT_LAYOUT.to_string());
    };
    let Some(xml) = package.read_part(&layout.target)? else {
        return Ok(DEFAULT_LAYOUT.to_string());
    };

    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"cSld" => {
                return Ok(attr(&e, "name")?.unwrap_or_default());
            }
            Event::Eof => return Ok(String::new()),
            _ => {}
        }
    }
}

#[derive(Default)]
struct ShapeText {
    paragraphs: Vec<String>,
    is_title: bool,
}

fn is_title_placeholder(element: &BytesStart) -> Result<bool> {
    Ok(matches!(
        attr(element, "type")?.as_deref(),
        Some("title" | "ctrTitle" | "vertTitle")
    ))
}

fn finish_paragraph(text: String, cell: &mut Option<Vec<String>>, shape: &mut Option<ShapeText>) {
    if let Some(cell) = cell.as_mut() {
        cell.push(text);
    } else if let Some(shape) = shape.as_mut() {
        shape.paragraphs.push(text);
    }
}

/// Walks a slide part collecting shape text, tables and pictures.
/// Paragraphs inside a table cell belong to the cell, otherwise to the
/// enclosing shape.
fn parse_slide(xml: &str) -> Result<Slide> {
    let mut reader = Reader::from_str(xml);
    let mut slide = Slide::default();

    let mut shape: Option<ShapeText> = None;
    let mut table: Option<SlideTable> = None;
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<Vec<String>> = None;
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => shape = Some(ShapeText::default()),
                b"ph" => {
                    if let Some(shape) = shape.as_mut() {
                        shape.is_title |= is_title_placeholder(&e)?;
                    }
                }
                b"tbl" => table = Some(SlideTable::default()),
                b"tr" => row = Some(Vec::new()),
                b"tc" => cell = Some(Vec::new()),
                b"p" => paragraph = Some(String::new()),
                b"t" => in_text = true,
                b"pic" => slide.pictures += 1,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"ph" => {
                    if let Some(shape) = shape.as_mut() {
                        shape.is_title |= is_title_placeholder(&e)?;
                    }
                }
                b"gridCol" => {
                    if let Some(table) = table.as_mut() {
                        table.columns += 1;
                    }
                }
                b"br" => {
                    if let Some(paragraph) = paragraph.as_mut() {
                        paragraph.push('\n');
                    }
                }
                b"p" => finish_paragraph(String::new(), &mut cell, &mut shape),
                b"tc" => {
                    if let Some(row) = row.as_mut() {
                        row.push(String::new());
                    }
                }
                b"pic" => slide.pictures += 1,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(paragraph) = paragraph.as_mut() {
                    paragraph.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(text) = paragraph.take() {
                        finish_paragraph(text, &mut cell, &mut shape);
                    }
                }
                b"tc" => {
                    if let (Some(paragraphs), Some(row)) = (cell.take(), row.as_mut()) {
                        row.push(paragraphs.join("\n").trim().to_string());
                    }
                }
                b"tr" => {
                    if let (Some(cells), Some(table)) = (row.take(), table.as_mut()) {
                        table.rows.push(cells);
                    }
                }
                b"tbl" => slide.tables.extend(table.take()),
                b"sp" => {
                    if let Some(finished) = shape.take() {
                        let text = finished.paragraphs.join("\n").trim().to_string();
                        if finished.is_title && slide.title.is_none() {
                            slide.title = Some(text.clone());
                        }
                        if !text.is_empty() {
                            slide.texts.push(text);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(slide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::ooxml::test_support::write_package;
    use tempfile::TempDir;

    const PRESENTATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:sldIdLst>
    <p:sldId id="256" r:id="rId2"/>
    <p:sldId id="257" r:id="rId3"/>
    <p:sldId id="258" r:id="rId4"/>
  </p:sldIdLst>
  <p:sldSz cx="12192000" cy="6858000"/>
</p:presentation>"#;

    const PRESENTATION_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide3.xml"/>
</Relationships>"#;

    const SLIDE1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:bodyPr/><a:p><a:r><a:t>四半期報告</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="Body"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:bodyPr/><a:p><a:r><a:t>売上 </a:t></a:r><a:r><a:t>増加</a:t></a:r></a:p><a:p><a:r><a:t>利益 改善</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture"/></p:nvPicPr></p:pic>
  </p:spTree></p:cSld>
</p:sld>"#;

    const SLIDE1_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
</Relationships>"#;

    const LAYOUT1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="Title Slide"/></p:sldLayout>"#;

    const SLIDE2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:sp><p:txBody><a:p><a:r><a:t>詳細データ</a:t></a:r></a:p></p:txBody></p:sp>
    <p:graphicFrame><a:graphic><a:graphicData><a:tbl>
      <a:tblGrid><a:gridCol w="100"/><a:gridCol w="100"/></a:tblGrid>
      <a:tr><a:tc><a:txBody><a:p><a:r><a:t>項目</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:r><a:t>値</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
      <a:tr><a:tc><a:txBody><a:p><a:r><a:t>売上</a:t></a:r></a:p></a:txBody></a:tc><a:tc><a:txBody><a:p><a:r><a:t> 100 </a:t></a:r></a:p></a:txBody></a:tc></a:tr>
    </a:tbl></a:graphicData></a:graphic></p:graphicFrame>
  </p:spTree></p:cSld>
</p:sld>"#;

    const SLIDE3: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree/></p:cSld></p:sld>"#;

    fn write_deck(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("report.pptx");
        write_package(
            &path,
            &[
                ("ppt/presentation.xml", PRESENTATION),
                ("ppt/_rels/presentation.xml.rels", PRESENTATION_RELS),
                ("ppt/slides/slide1.xml", SLIDE1),
                ("ppt/slides/_rels/slide1.xml.rels", SLIDE1_RELS),
                ("ppt/slideLayouts/slideLayout1.xml", LAYOUT1),
                ("ppt/slides/slide2.xml", SLIDE2),
                ("ppt/slides/slide3.xml", SLIDE3),
            ],
        );
        path
    }

    #[test]
    fn test_presentation_analysis() {
        let dir = TempDir::new().unwrap();
        let path = write_deck(dir.path());

        let analysis = PptxAnalyzer::new(AnalyzerOptions::default()).analyze(&path).unwrap();

        assert_eq!(
            analysis.details["presentation_info"],
            json!({
                "slide_count": 3,
                "title": "四半期報告",
                "slide_width": 12192000,
                "slide_height": 6858000
            })
        );

        let first = &analysis.details["slides"][0];
        assert_eq!(first["title"], json!("四半期報告"));
        assert_eq!(first["has_title"], json!(true));
        assert_eq!(first["text_boxes"], json!(2));
        assert_eq!(first["text_content"][1], json!("売上 増加\n利益 改善"));
        assert_eq!(first["layout"], json!("Title Slide"));

        let second = &analysis.details["slides"][1];
        assert_eq!(second["title"], json!("詳細データ"));
        assert_eq!(second["has_title"], json!(false));
        assert_eq!(second["layout"], json!("Custom"));

        assert_eq!(analysis.statistics["total_slides"], json!(3));
        assert_eq!(analysis.statistics["total_text_boxes"], json!(3));
        assert_eq!(analysis.statistics["total_words"], json!(6));
        assert_eq!(analysis.statistics["tables_count"], json!(1));
        assert_eq!(analysis.statistics["images_count"], json!(1));

        assert_eq!(
            analysis.details["tables"],
            json!([{"slide": 2, "rows": 2, "columns": 2, "data": [["項目", "値"], ["売上", "100"]]}])
        );
        assert_eq!(
            analysis.details["outline"],
            json!(["1. 四半期報告", "2. 詳細データ"])
        );
        assert_eq!(
            analysis.full_text.as_deref(),
            Some("四半期報告\n\n売上 増加\n利益 改善\n\n詳細データ")
        );
    }

    #[test]
    fn test_extraction_flags() {
        let dir = TempDir::new().unwrap();
        let path = write_deck(dir.path());
        let options = AnalyzerOptions {
            extract_tables: false,
            extract_images: false,
            ..AnalyzerOptions::default()
        };

        let analysis = PptxAnalyzer::new(options).analyze(&path).unwrap();
        assert!(!analysis.details.contains_key("tables"));
        assert!(!analysis.statistics.contains_key("images_count"));
        assert_eq!(analysis.statistics["tables_count"], json!(1));
    }

    #[test]
    fn test_extract_text_skips_empty_slides() {
        let dir = TempDir::new().unwrap();
        let path = write_deck(dir.path());

        let text = PptxAnalyzer::new(AnalyzerOptions::default())
            .extract_text(&path)
            .unwrap();
        assert_eq!(
            text,
            "=== Slide 1 ===\n四半期報告\n売上 増加\n利益 改善\n\n=== Slide 2 ===\n詳細データ"
        );
    }

    #[test]
    fn test_slide_order_falls_back_to_part_numbers() {
        let names = vec![
            "ppt/slides/slide10.xml".to_string(),
            "ppt/slides/slide2.xml".to_string(),
            "ppt/slides/_rels/slide2.xml.rels".to_string(),
            "ppt/slideLayouts/slideLayout1.xml".to_string(),
        ];
        assert_eq!(
            numbered_slide_parts(&names),
            vec!["ppt/slides/slide2.xml", "ppt/slides/slide10.xml"]
        );
    }

    #[test]
    fn test_untitled_presentation() {
        let deck = Deck {
            slides: Vec::new(),
            width: None,
            height: None,
        };
        assert_eq!(deck.title(), UNTITLED);
    }
}

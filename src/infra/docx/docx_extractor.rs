//! Paragraph-level text extraction for Word (`.docx`) documents.
//!
//! A `.docx` file is a ZIP container; the body lives in `word/document.xml`.
//! Every `w:p` element becomes one text block, in document order (table cells
//! included). Inside runs, `w:t` contributes its text, `w:tab` a tab and
//! `w:br`/`w:cr` a line break; page and column breaks contribute nothing.
//!
//! Text boxes and drawings are skipped. Word stores each text box twice (the
//! `mc:Choice` body and a VML `mc:Fallback` copy), and their paragraphs close
//! before the paragraph that anchors them.

use std::io::Read;

use quick_xml::events::{BytesStart, Event};

use crate::core::corpus::{ExtractError, TextExtractor};

const DOCUMENT_XML: &str = "word/document.xml";

/// Maximum decompressed bytes to read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract_paragraphs(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let xml = read_document_xml(bytes)?;
        paragraphs_from_xml(&xml)
    }
}

fn read_document_xml(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Archive(e.to_string()))?;

    let entry = archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| ExtractError::Archive(format!("{}: {}", DOCUMENT_XML, e)))?;

    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Archive(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Archive(format!(
            "{} exceeds size limit ({} bytes)",
            DOCUMENT_XML, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

fn paragraphs_from_xml(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;
    // Depth inside text boxes, drawings and markup-compatibility fallbacks.
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if skip_depth > 0 => {
                if is_skipped_container(e.local_name().as_ref()) {
                    skip_depth += 1;
                }
            }
            Ok(Event::End(e)) if skip_depth > 0 => {
                if is_skipped_container(e.local_name().as_ref()) {
                    skip_depth -= 1;
                }
            }
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                name if is_skipped_container(name) => skip_depth = 1,
                b"p" => stack.push(String::new()),
                b"r" => run_depth += 1,
                b"t" if run_depth > 0 => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if skip_depth == 0 => {
                if let Some(current) = stack.last_mut() {
                    match e.local_name().as_ref() {
                        b"tab" if run_depth > 0 => current.push('\t'),
                        b"br" if run_depth > 0 && !is_layout_break(&e) => current.push('\n'),
                        b"cr" if run_depth > 0 => current.push('\n'),
                        _ => {}
                    }
                }
                if e.local_name().as_ref() == b"p" {
                    paragraphs.push(String::new());
                }
            }
            Ok(Event::Text(te)) if in_text && skip_depth == 0 => {
                let text = te.unescape().map_err(|e| ExtractError::Xml(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(done) = stack.pop() {
                        paragraphs.push(done);
                    }
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn is_skipped_container(local_name: &[u8]) -> bool {
    matches!(local_name, b"txbxContent" | b"drawing" | b"pict" | b"Fallback")
}

/// `w:br w:type="page"` and `w:type="column"` move content, they are not text.
fn is_layout_break(element: &BytesStart) -> bool {
    element.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"type"
            && matches!(attr.value.as_ref(), b"page" | b"column")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(DOCUMENT_XML, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_paragraphs_in_order() {
        let doc = docx_with_body(
            r#"<w:p><w:r><w:t>A</w:t></w:r></w:p><w:p><w:r><w:t>B</w:t></w:r></w:p>"#,
        );

        let paragraphs = DocxExtractor.extract_paragraphs(&doc).unwrap();
        assert_eq!(paragraphs, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_runs_are_concatenated_with_spacing_preserved() {
        let doc = docx_with_body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t xml:space="preserve">Sick </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>leave</w:t></w:r><w:r><w:tab/><w:t>12 days &amp; more</w:t><w:br/><w:t>per year</w:t></w:r></w:p>"#,
        );

        let paragraphs = DocxExtractor.extract_paragraphs(&doc).unwrap();
        assert_eq!(paragraphs, vec!["Sick leave\t12 days & more\nper year".to_string()]);
    }

    #[test]
    fn test_empty_paragraphs_and_tables() {
        let doc = docx_with_body(
            r#"<w:p/><w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:pPr/></w:p>"#,
        );

        let paragraphs = DocxExtractor.extract_paragraphs(&doc).unwrap();
        assert_eq!(
            paragraphs,
            vec![String::new(), "Cell".to_string(), String::new()]
        );
    }

    #[test]
    fn test_deleted_text_is_ignored() {
        let doc = docx_with_body(
            r#"<w:p><w:del><w:r><w:delText>old</w:delText></w:r></w:del><w:r><w:t>new</w:t></w:r></w:p>"#,
        );

        let paragraphs = DocxExtractor.extract_paragraphs(&doc).unwrap();
        assert_eq!(paragraphs, vec!["new".to_string()]);
    }

    #[test]
    fn test_invalid_zip_returns_error() {
        let err = DocxExtractor.extract_paragraphs(b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)));
    }

    #[test]
    fn test_zip_without_document_xml_returns_error() {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxExtractor.extract_paragraphs(&bytes).unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)));
    }

    #[test]
    fn test_text_boxes_are_not_extracted() {
        let doc = docx_with_body(
            r#"<w:p><w:r><w:t>Intro</w:t></w:r><w:r><mc:AlternateContent xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><mc:Choice Requires="wps"><w:drawing><wp:anchor xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"><wps:txbx xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"><w:txbxContent><w:p><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></wps:txbx></wp:anchor></w:drawing></mc:Choice><mc:Fallback><w:pict><v:textbox xmlns:v="urn:schemas-microsoft-com:vml"><w:txbxContent><w:p><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></v:textbox></w:pict></mc:Fallback></mc:AlternateContent></w:r><w:r><w:t> text</w:t></w:r></w:p><w:p><w:r><w:t>Next</w:t></w:r></w:p>"#,
        );

        let paragraphs = DocxExtractor.extract_paragraphs(&doc).unwrap();
        assert_eq!(paragraphs, vec!["Intro text".to_string(), "Next".to_string()]);
    }

    #[test]
    fn test_page_break_adds_no_text() {
        let doc = docx_with_body(
            r#"<w:p><w:r><w:t>End of section</w:t><w:br w:type="page"/><w:t>.</w:t><w:br/><w:t>Line</w:t></w:r></w:p>"#,
        );

        let paragraphs = DocxExtractor.extract_paragraphs(&doc).unwrap();
        assert_eq!(paragraphs, vec!["End of section.\nLine".to_string()]);
    }
}

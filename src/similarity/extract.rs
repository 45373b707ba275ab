//! Text extraction from office documents.
//!
//! - Word-processor documents (via docx-rs): paragraph text, then table cells
//! - Presentations (via zip + quick-xml): paragraph text of every slide
//! - Spreadsheets are read cell by cell in [`super::tabular`]

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use thiserror::Error;

/// Errors that can occur while reading a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The Word document could not be parsed.
    #[error("Failed to extract text from DOCX {path}: {message}")]
    Docx {
        /// Path to the DOCX file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The file is not a readable zip package.
    #[error("Failed to open package {path}: {message}")]
    Archive {
        /// Path to the package
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A part of the package is not well-formed XML.
    #[error("Malformed XML in {path} ({part}): {message}")]
    Xml {
        /// Path to the package
        path: PathBuf,
        /// Part name inside the package
        part: String,
        /// Error message
        message: String,
    },

    /// The workbook could not be read.
    #[error("Failed to read workbook {path}: {message}")]
    Spreadsheet {
        /// Path to the workbook
        path: PathBuf,
        /// Error message
        message: String,
    },
}

impl DocumentError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extractor for Word-processor and presentation text.
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Text of a Word document: all paragraphs in order, then the text of
    /// every table cell.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] if the file cannot be read and
    /// [`DocumentError::Docx`] if it is not a valid document.
    pub fn extract_docx(path: &Path) -> Result<String, DocumentError> {
        let bytes = fs::read(path).map_err(|e| DocumentError::io(path, e))?;

        let docx = docx_rs::read_docx(&bytes).map_err(|e| DocumentError::Docx {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut paragraphs = String::new();
        let mut cells = String::new();
        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    push_paragraph(p, &mut paragraphs);
                }
                docx_rs::DocumentChild::Table(t) => push_table(t, &mut cells),
                _ => {}
            }
        }

        paragraphs.push_str(&cells);
        Ok(paragraphs)
    }

    /// Text of a presentation: every paragraph of every slide, slides in
    /// numeric order.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Archive`] if the file is not a zip package
    /// and [`DocumentError::Xml`] if a slide cannot be parsed.
    pub fn extract_pptx(path: &Path) -> Result<String, DocumentError> {
        let file = File::open(path).map_err(|e| DocumentError::io(path, e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| DocumentError::Archive {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort_unstable();

        let mut text = String::new();
        for (_, part) in slides {
            let mut xml = String::new();
            archive
                .by_name(&part)
                .map_err(|e| DocumentError::Archive {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
                .read_to_string(&mut xml)
                .map_err(|e| DocumentError::io(path, e))?;

            collect_text_runs(&xml, &mut text).map_err(|message| DocumentError::Xml {
                path: path.to_path_buf(),
                part,
                message,
            })?;
        }

        Ok(text)
    }
}

fn push_paragraph(p: &docx_rs::Paragraph, text: &mut String) {
    push_inline(&p.children, text);
    text.push('\n');
}

/// Run text of a paragraph's children, hyperlinks and tracked insertions
/// included. Deleted text is skipped.
fn push_inline(children: &[docx_rs::ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(r) => push_run(r, text),
            docx_rs::ParagraphChild::Hyperlink(link) => push_inline(&link.children, text),
            docx_rs::ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let docx_rs::InsertChild::Run(r) = child {
                        push_run(r, text);
                    }
                }
            }
            docx_rs::ParagraphChild::StructuredDataTag(tag) => {
                for child in &tag.children {
                    if let docx_rs::StructuredDataTagChild::Run(r) = child {
                        push_run(r, text);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run(run: &docx_rs::Run, text: &mut String) {
    for child in &run.children {
        if let docx_rs::RunChild::Text(t) = child {
            text.push_str(&t.text);
        }
    }
}

fn push_table(table: &docx_rs::Table, text: &mut String) {
    for row_child in &table.rows {
        let docx_rs::TableChild::TableRow(tr) = row_child;
        for cell_child in &tr.cells {
            let docx_rs::TableRowChild::TableCell(tc) = cell_child;
            for content in &tc.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(p) => push_paragraph(p, text),
                    docx_rs::TableCellContent::Table(t) => push_table(t, text),
                    _ => {}
                }
            }
        }
    }
}

/// Slide number of a `ppt/slides/slideN.xml` part.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Append the text of every `<a:p>` paragraph, one paragraph per line.
///
/// Runs of a paragraph are joined as-is, so a word split across formatting
/// runs stays one word. `<a:br/>` becomes a line break.
fn collect_text_runs(xml: &str, out: &mut String) -> Result<(), String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut in_run = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.name().as_ref() == b"a:t" => in_run = true,
            Event::End(e) if e.name().as_ref() == b"a:t" => in_run = false,
            Event::End(e) if e.name().as_ref() == b"a:p" => out.push('\n'),
            Event::Empty(e) if e.name().as_ref() == b"a:br" => out.push('\n'),
            Event::Text(t) if in_run => {
                out.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

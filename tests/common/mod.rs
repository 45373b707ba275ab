//! Shared fixtures for integration tests.
//!
//! Office fixtures are written from scratch: Word documents through docx-rs,
//! workbooks and slide decks as minimal zip packages.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn zip_parts(path: &Path, parts: &[(String, String)]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in parts {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Write a Word document with the given paragraphs and one table row per
/// entry of `cells`.
pub fn write_docx(path: &Path, paragraphs: &[&str], cells: &[&[&str]]) {
    let mut docx = Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
    }
    if !cells.is_empty() {
        let rows = cells
            .iter()
            .map(|row| {
                TableRow::new(
                    row.iter()
                        .map(|c| {
                            TableCell::new()
                                .add_paragraph(Paragraph::new().add_run(Run::new().add_text(*c)))
                        })
                        .collect(),
                )
            })
            .collect();
        docx = docx.add_table(Table::new(rows));
    }
    let file = File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}

/// Write a slide deck, one slide per entry, each text in its own paragraph.
pub fn write_pptx(path: &Path, slides: &[&[&str]]) {
    let split: Vec<Vec<Vec<&str>>> = slides
        .iter()
        .map(|texts| texts.iter().map(|t| vec![*t]).collect())
        .collect();
    write_pptx_runs(path, &split);
}

/// Write a slide deck where every paragraph is given as its formatting runs.
pub fn write_pptx_runs(path: &Path, slides: &[Vec<Vec<&str>>]) {
    let mut parts = vec![(
        "[Content_Types].xml".to_string(),
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#
            .to_string(),
    )];
    for (idx, paragraphs) in slides.iter().enumerate() {
        let body: String = paragraphs
            .iter()
            .map(|runs| {
                let runs: String = runs
                    .iter()
                    .map(|t| format!("<a:r><a:rPr b=\"1\"/><a:t>{t}</a:t></a:r>"))
                    .collect();
                format!("<p:sp><p:txBody><a:p>{runs}</a:p></p:txBody></p:sp>")
            })
            .collect();
        parts.push((
            format!("ppt/slides/slide{}.xml", idx + 1),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{body}</p:spTree></p:cSld></p:sld>"#
            ),
        ));
    }
    zip_parts(path, &parts);
}

fn column_name(mut col: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name
}

/// Write a workbook with named sheets of numeric cells.
pub fn write_xlsx(path: &Path, sheets: &[(&str, &[&[f64]])]) {
    let mut sheet_entries = String::new();
    let mut rels = String::new();
    let mut parts = Vec::new();

    for (idx, (name, rows)) in sheets.iter().enumerate() {
        let n = idx + 1;
        sheet_entries.push_str(&format!(r#"<sheet name="{name}" sheetId="{n}" r:id="rId{n}"/>"#));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));

        let mut data = String::new();
        for (r, row) in rows.iter().enumerate() {
            data.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                data.push_str(&format!(
                    r#"<c r="{}{}"><v>{}</v></c>"#,
                    column_name(c),
                    r + 1,
                    value
                ));
            }
            data.push_str("</row>");
        }
        parts.push((
            format!("xl/worksheets/sheet{n}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData></worksheet>"#
            ),
        ));
    }

    parts.push((
        "[Content_Types].xml".to_string(),
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#
            .to_string(),
    ));
    parts.push((
        "_rels/.rels".to_string(),
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            .to_string(),
    ));
    parts.push((
        "xl/workbook.xml".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheet_entries}</sheets></workbook>"#
        ),
    ));
    parts.push((
        "xl/_rels/workbook.xml.rels".to_string(),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        ),
    ));

    zip_parts(path, &parts);
}

/// Write a `/bin/sh` script standing in for the scanner backend.
pub fn write_backend_script(dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("fake_backend.sh");
    fs::write(&script, body).unwrap();
    script
}


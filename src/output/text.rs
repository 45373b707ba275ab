//! Human-readable terminal report.
//!
//! Exact groups list their keeper first, marked `keep`, followed by the
//! files a deletion would remove. Similar groups list every member with its
//! similarity and are never marked for deletion.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Color, Paint, Style};

use crate::actions::DeletionReport;
use crate::duplicates::{DuplicateGroup, GroupKind, GroupModel};
use crate::protocol::ProtocolAnomaly;

/// Terminal formatter for a [`GroupModel`].
pub struct TextOutput<'a> {
    model: &'a GroupModel,
    anomalies: &'a [ProtocolAnomaly],
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(model: &'a GroupModel, anomalies: &'a [ProtocolAnomaly], color: bool) -> Self {
        Self {
            model,
            anomalies,
            color,
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.model.no_duplicates_found() {
            writeln!(writer, "{}", self.paint("No duplicates found.", Style::new().fg(Color::Green)))?;
            self.write_anomalies(writer)?;
            return Ok(());
        }

        let heading = Style::new().bold();
        let exact: Vec<&DuplicateGroup> = self
            .model
            .reportable_groups()
            .filter(|g| g.kind == GroupKind::Exact)
            .collect();
        let similar: Vec<&DuplicateGroup> = self
            .model
            .reportable_groups()
            .filter(|g| g.kind == GroupKind::Similar)
            .collect();

        if !exact.is_empty() {
            writeln!(
                writer,
                "{}",
                self.paint(&format!("Exact duplicates ({} groups)", exact.len()), heading)
            )?;
            for (idx, group) in exact.iter().enumerate() {
                self.write_exact_group(writer, idx + 1, group)?;
            }
            writeln!(writer)?;
        }

        if !similar.is_empty() {
            writeln!(
                writer,
                "{}",
                self.paint(&format!("Similar files ({} groups)", similar.len()), heading)
            )?;
            for (idx, group) in similar.iter().enumerate() {
                self.write_similar_group(writer, idx + 1, group)?;
            }
            writeln!(writer)?;
        }

        let summary = self.model.summary();
        writeln!(
            writer,
            "{} exact group(s), {} duplicate file(s), {} reclaimable; {} similar group(s)",
            summary.exact_groups,
            summary.exact_duplicate_files,
            ByteSize::b(summary.reclaimable_bytes),
            summary.similar_groups
        )?;

        self.write_anomalies(writer)
    }

    fn write_exact_group<W: Write>(
        &self,
        writer: &mut W,
        number: usize,
        group: &DuplicateGroup,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "  Group {} ({} files, {} reclaimable)",
            number,
            group.len(),
            ByteSize::b(group.reclaimable_bytes())
        )?;
        for (pos, member) in group.members.iter().enumerate() {
            let marker = if pos == 0 {
                self.paint("keep  ", Style::new().fg(Color::Green))
            } else {
                self.paint("delete", Style::new().fg(Color::Red))
            };
            writeln!(writer, "    {} {}", marker, member.path.display())?;
        }
        Ok(())
    }

    fn write_similar_group<W: Write>(
        &self,
        writer: &mut W,
        number: usize,
        group: &DuplicateGroup,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "  Group {} ({} files, {:.1}% average similarity)",
            number,
            group.len(),
            group.average_similarity() * 100.0
        )?;
        for member in &group.members {
            let pct = format!("{:>5.1}%", member.similarity * 100.0);
            writeln!(
                writer,
                "    {} {}",
                self.paint(&pct, Style::new().fg(Color::Yellow)),
                member.path.display()
            )?;
        }
        Ok(())
    }

    fn write_anomalies<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.anomalies.is_empty() {
            return Ok(());
        }
        writeln!(
            writer,
            "{}",
            self.paint(
                &format!("{} irregular line(s) in scanner output:", self.anomalies.len()),
                Style::new().fg(Color::Yellow)
            )
        )?;
        for anomaly in self.anomalies {
            writeln!(writer, "  {anomaly}")?;
        }
        Ok(())
    }

    /// Render the report to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// One-paragraph outcome of a deletion batch, with every failure listed.
#[must_use]
pub fn render_deletion_report(report: &DeletionReport) -> String {
    let mut out = report.summary();
    for (path, error) in &report.failures {
        out.push_str(&format!("\n  {}: {}", path.display(), error));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse;
    use std::path::PathBuf;

    fn two_group_model() -> GroupModel {
        GroupModel::new(
            parse("EXACT|1.0\n/a\n/b\n---GROUP---\nSIMILAR|0.8\n/c|0.9\n/d|0.7\n---GROUP---\n")
                .groups,
        )
    }

    #[test]
    fn test_text_lists_keeper_and_candidates() {
        let model = two_group_model();
        let text = TextOutput::new(&model, &[], false).render();

        assert!(text.contains("Exact duplicates (1 groups)"));
        assert!(text.contains("keep   /a"));
        assert!(text.contains("delete /b"));
        assert!(text.contains("Similar files (1 groups)"));
        assert!(text.contains(" 90.0% /c"));
        assert!(text.contains(" 70.0% /d"));
        assert!(text.contains("80.0% average similarity"));
        assert!(!text.contains("delete /c"));
    }

    #[test]
    fn test_text_no_duplicates() {
        let model = GroupModel::empty();
        let text = TextOutput::new(&model, &[], false).render();
        assert_eq!(text, "No duplicates found.\n");
    }

    #[test]
    fn test_text_reports_anomalies() {
        let report = parse("EXACT|1.0\n/a\n/a\n/b\n---GROUP---\n");
        let model = GroupModel::new(report.groups);
        let text = TextOutput::new(&model, &report.anomalies, false).render();
        assert!(text.contains("1 irregular line(s)"));
        assert!(text.contains("duplicate path in group"));
    }

    #[test]
    fn test_color_adds_escape_codes() {
        let model = two_group_model();
        let plain = TextOutput::new(&model, &[], false).render();
        let colored = TextOutput::new(&model, &[], true).render();
        assert!(!plain.contains('\u{1b}'));
        assert!(colored.contains('\u{1b}'));
    }

    #[test]
    fn test_render_deletion_report_lists_failures() {
        let report = DeletionReport {
            failures: vec![(PathBuf::from("/x"), "not found".to_string())],
            ..DeletionReport::default()
        };
        let text = render_deletion_report(&report);
        assert!(text.contains("/x: not found"));
    }
}

//! Human-readable text output
//!
//! Tables are printed with space-padded columns; reports as a short summary
//! followed by any dropped blocks and warnings.

use crate::RunSummary;
use wi_collect::Table;

/// Types with a plain-text rendering for `--format text`
pub trait ToText {
    fn to_text(&self) -> String;
}

impl ToText for Table {
    fn to_text(&self) -> String {
        if self.is_empty() {
            return "(empty table)".to_string();
        }

        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for line in std::iter::once(&self.header).chain(&self.rows) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        push_line(&mut out, &self.header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &self.rows {
            push_line(&mut out, row, &widths);
        }
        out.push_str(&format!("({} rows)", self.rows.len()));
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

impl ToText for RunSummary {
    fn to_text(&self) -> String {
        let report = &self.report;
        let mut lines = vec![format!(
            "{}: {} rows from {} identifiers ({} commands, {:.1}s)",
            report.device,
            report.table.len(),
            report.total_identifiers(),
            report.commands_issued,
            report.duration.as_secs_f64()
        )];

        for count in &report.identifiers {
            lines.push(format!("  {:<10} {}", count.category.to_string(), count.count));
        }

        if !report.dropped.is_empty() {
            lines.push(format!("Dropped blocks ({}):", report.dropped.len()));
            for d in &report.dropped {
                lines.push(format!("  {} {}: {}", d.category, d.identifier, d.reason));
            }
        }

        if !report.warnings.is_empty() {
            lines.push(format!("Warnings ({}):", report.warnings.len()));
            for w in &report.warnings {
                lines.push(format!("  {w}"));
            }
        }

        match &self.output {
            Some(path) => lines.push(format!("Wrote {}", path.display())),
            None => lines.push("Export skipped".to_string()),
        }

        lines.join("\n")
    }
}

//! Plain-text sink: prints each chart's table with aligned columns.

use std::io::Write;

use eda_core::error::Result;
use eda_core::formatting::{format_count, format_number};
use unicode_width::UnicodeWidthStr;

use crate::sink::{Cell, ChartSink, ChartSpec, ChartTable};

/// Rows printed per chart before the remainder is summarised.
pub const DEFAULT_MAX_ROWS: usize = 20;

/// Writes a titled, column-aligned rendering of every chart to `out`.
pub struct TextSink<W: Write> {
    out: W,
    max_rows: usize,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Limit the number of rows printed per chart.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Consume the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartSink for TextSink<W> {
    fn name(&self) -> &str {
        "text"
    }

    fn render(&mut self, spec: &ChartSpec, table: &ChartTable) -> Result<()> {
        spec.validate(table)?;

        writeln!(self.out, "{}", spec.title)?;
        writeln!(self.out, "{}", "=".repeat(spec.title.width()))?;

        let mut roles = format!("{:?} of {}", spec.kind, spec.roles.value);
        if !spec.roles.path.is_empty() {
            let mut path: Vec<&str> = spec.roles.path_root.iter().map(String::as_str).collect();
            path.extend(spec.roles.path.iter().map(String::as_str));
            roles.push_str(&format!(" by {}", path.join(" > ")));
        }
        if let Some(color) = &spec.roles.color {
            roles.push_str(&format!(", coloured by {}", color));
        }
        writeln!(self.out, "{}", roles)?;

        let shown = table.len().min(self.max_rows);
        let cells: Vec<Vec<String>> = table.rows[..shown]
            .iter()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        let mut widths: Vec<usize> = table.columns.iter().map(|c| c.width()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }

        let header: Vec<String> = table
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad_right(c, *w))
            .collect();
        writeln!(self.out, "{}", header.join("  ").trim_end())?;

        for (row, raw) in cells.iter().zip(&table.rows) {
            let line: Vec<String> = row
                .iter()
                .zip(raw)
                .zip(&widths)
                .map(|((text, cell), w)| match cell {
                    Cell::Int(_) | Cell::Float(_) => pad_left(text, *w),
                    _ => pad_right(text, *w),
                })
                .collect();
            writeln!(self.out, "{}", line.join("  ").trim_end())?;
        }

        if table.len() > shown {
            writeln!(self.out, "... {} more rows", table.len() - shown)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        Cell::Int(v) => format_count(*v),
        Cell::Float(v) if v.is_finite() => format_number(*v, 3),
        Cell::Float(_) => "undefined".to_string(),
    }
}

fn pad_right(s: &str, width: usize) -> String {
    format!("{}{}", s, " ".repeat(width.saturating_sub(s.width())))
}

fn pad_left(s: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width.saturating_sub(s.width())), s)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

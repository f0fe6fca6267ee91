//! Table rendering: header row + data rows → Markdown or HTML text.
//!
//! All content stays textual: no numeric detection, no right-alignment of
//! numbers, no reformatting. Columns are left-aligned and empty cells render
//! as empty.

use crate::config::TableFormat;

/// Render a table in the requested format.
///
/// `header` gives the column labels (duplicates are kept positionally);
/// `rows` are the data rows. A table with no data rows renders as a
/// header-only table. Rows shorter than the header are padded with empty
/// cells; extra trailing cells are dropped.
pub fn render_table(header: &[String], rows: &[Vec<String>], format: TableFormat) -> String {
    match format {
        TableFormat::Markdown => render_markdown(header, rows),
        TableFormat::Html => render_html(header, rows),
    }
}

// ── Markdown ─────────────────────────────────────────────────────────────────

/// GitHub-flavoured pipe table with padded, left-aligned columns.
///
/// ```text
/// | Name | Age |
/// |:-----|:----|
/// | Ann  | 30  |
/// ```
pub fn render_markdown(header: &[String], rows: &[Vec<String>]) -> String {
    if header.is_empty() {
        return String::new();
    }

    let header: Vec<String> = header.iter().map(|h| escape_pipe(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            (0..header.len())
                .map(|i| r.get(i).map(|c| escape_pipe(c)).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|r| display_width(&r[i]))
                .chain(std::iter::once(display_width(&header[i])))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(markdown_row(&header, &widths));
    lines.push(
        widths
            .iter()
            .map(|w| format!(":{}", "-".repeat(w + 1)))
            .fold(String::from("|"), |acc, col| acc + &col + "|"),
    );
    for row in &rows {
        lines.push(markdown_row(row, &widths));
    }
    lines.join("\n")
}

fn markdown_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, &w) in cells.iter().zip(widths) {
        let pad = w.saturating_sub(display_width(cell));
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

fn escape_pipe(s: &str) -> String {
    s.replace('|', "\\|")
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

// ── HTML ─────────────────────────────────────────────────────────────────────

/// `<table>` markup with the header in `<thead>` and data in `<tbody>`.
pub fn render_html(header: &[String], rows: &[Vec<String>]) -> String {
    if header.is_empty() {
        return String::new();
    }

    let mut html = String::from("<table>\n<thead>\n<tr style=\"text-align: left;\">");
    for h in header {
        html.push_str("<th>");
        html.push_str(&escape_html(h));
        html.push_str("</th>");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        html.push_str("<tr>");
        for i in 0..header.len() {
            html.push_str("<td>");
            if let Some(c) = row.get(i) {
                html.push_str(&escape_html(c));
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

//! Markdown table reconstruction.

use crate::html::{self, Element, Node};

/// Rebuild the first table in a fragment as a Markdown table.
///
/// Rows come from `thead` first, then the body in document order. The
/// first row is the header. Short rows are padded to the widest row.
/// Returns `None` when no row with cells can be found.
pub fn reconstruct_table(fragment: &[Node]) -> Option<String> {
    let rows = collect_rows(fragment);
    let width = rows.iter().map(Vec::len).max()?;
    if width == 0 {
        return None;
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(width, String::new());
        lines.push(format!("| {} |", cells.join(" | ")));
        if index == 0 {
            lines.push(format!("|{}", " --- |".repeat(width)));
        }
    }
    Some(lines.join("\n"))
}

/// Wrapper used when the table structure cannot be read.
pub fn table_fallback(text: &str) -> String {
    format!("<table>\n{}\n</table>", text)
}

fn collect_rows(fragment: &[Node]) -> Vec<Vec<String>> {
    let mut tr = Vec::new();
    match html::find_in(fragment, "table") {
        Some(table) => {
            // Header rows first so a trailing <thead> still leads.
            let (head, body): (Vec<Row<'_>>, Vec<Row<'_>>) =
                table_rows(table).into_iter().partition(|row| row.in_head);
            tr.extend(head.into_iter().chain(body).map(|row| row.element));
        }
        None => {
            for element in html::top_level_elements(fragment) {
                if element.tag == "tr" {
                    tr.push(element);
                } else {
                    element.find_all("tr", &mut tr);
                }
            }
        }
    }

    tr.into_iter()
        .map(row_cells)
        .filter(|cells| !cells.is_empty())
        .collect()
}

struct Row<'a> {
    element: &'a Element,
    in_head: bool,
}

fn table_rows(table: &Element) -> Vec<Row<'_>> {
    let mut rows = Vec::new();
    for child in table.child_elements() {
        match child.tag.as_str() {
            "tr" => rows.push(Row {
                element: child,
                in_head: false,
            }),
            "thead" | "tbody" | "tfoot" => {
                let in_head = child.tag == "thead";
                rows.extend(
                    child
                        .child_elements()
                        .filter(|e| e.tag == "tr")
                        .map(|element| Row { element, in_head }),
                );
            }
            _ => {}
        }
    }
    rows
}

fn row_cells(row: &Element) -> Vec<String> {
    row.child_elements()
        .filter(|cell| cell.tag == "td" || cell.tag == "th")
        .map(|cell| html::collapse_whitespace(&cell.text_content()).replace('|', "\\|"))
        .collect()
}

//! Markdown list reconstruction.

use crate::html::{self, Element, Node};

const INDENT: &str = "  ";

/// Rebuild the lists of a fragment as Markdown.
///
/// Nesting becomes indentation; `<ol>` keeps its `start` index. Bare
/// `<li>` elements at the top level (a selection cut inside a list) are
/// treated as an unordered list. Returns `None` when no item is found.
pub fn reconstruct_list(fragment: &[Node]) -> Option<String> {
    let mut lines = Vec::new();
    for element in html::top_level_elements(fragment) {
        match element.tag.as_str() {
            "ul" | "ol" => render_list(element, 0, &mut lines),
            "li" => render_item(element, "-", 0, &mut lines),
            _ => {
                let mut nested = Vec::new();
                collect_outer_lists(element, &mut nested);
                for list in nested {
                    render_list(list, 0, &mut lines);
                }
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Lists below `element` that are not nested in another list.
fn collect_outer_lists<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
    for child in element.child_elements() {
        if child.tag == "ul" || child.tag == "ol" {
            out.push(child);
        } else {
            collect_outer_lists(child, out);
        }
    }
}

fn render_list(list: &Element, depth: usize, lines: &mut Vec<String>) {
    let ordered = list.tag == "ol";
    let start = list
        .attr("start")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(1);

    let items = list.child_elements().filter(|e| e.tag == "li");
    for (offset, item) in items.enumerate() {
        let marker = if ordered {
            format!("{}.", start + offset as i64)
        } else {
            "-".to_string()
        };
        render_item(item, &marker, depth, lines);
    }
}

fn render_item(item: &Element, marker: &str, depth: usize, lines: &mut Vec<String>) {
    let mut own_text = String::new();
    let mut nested = Vec::new();
    for child in &item.children {
        match child {
            Node::Element(e) if e.tag == "ul" || e.tag == "ol" => nested.push(e),
            Node::Element(e) if e.tag == "br" => own_text.push(' '),
            Node::Element(e) => own_text.push_str(&e.text_content()),
            Node::Text(t) => own_text.push_str(t),
        }
    }

    lines.push(format!(
        "{}{} {}",
        INDENT.repeat(depth),
        marker,
        html::collapse_whitespace(&own_text)
    ));
    for list in nested {
        render_list(list, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_fragment;

    fn list(html: &str) -> Option<String> {
        reconstruct_list(&parse_fragment(html))
    }

    #[test]
    fn test_unordered() {
        assert_eq!(list("<ul><li>a</li><li>b</li></ul>").unwrap(), "- a\n- b");
    }

    #[test]
    fn test_ordered_with_start() {
        assert_eq!(
            list(r#"<ol start="3"><li>c</li><li>d</li></ol>"#).unwrap(),
            "3. c\n4. d"
        );
        assert_eq!(list("<ol><li>x</li></ol>").unwrap(), "1. x");
    }

    #[test]
    fn test_nested() {
        let md = list("<ul><li>fruit<ol><li>apple</li><li>pear</li></ol></li><li>veg</li></ul>");
        assert_eq!(md.unwrap(), "- fruit\n  1. apple\n  2. pear\n- veg");
    }

    #[test]
    fn test_inline_markup_flattened() {
        let md = list("<ul><li>use <code>cargo</code>\n  <b>now</b></li></ul>");
        assert_eq!(md.unwrap(), "- use cargo now");
    }

    #[test]
    fn test_bare_items() {
        assert_eq!(list("<li>one</li><li>two</li>").unwrap(), "- one\n- two");
    }

    #[test]
    fn test_list_inside_wrapper() {
        assert_eq!(list("<div><ul><li>z</li></ul></div>").unwrap(), "- z");
    }

    #[test]
    fn test_no_list() {
        assert!(list("<p>plain</p>").is_none());
        assert!(list("").is_none());
    }
}

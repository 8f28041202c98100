//! Tolerant HTML fragment parser.
//!
//! Selections arrive as fragments cut out of a live page: unbalanced,
//! missing ancestors, full of entities. The parser never fails; it builds
//! the best tree it can and the reconstructors work from that.

/// A parsed node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(tag: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag,
            attrs,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Direct element children.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Concatenated text of all descendants; `<br>` becomes a newline.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// First descendant (or self) with the given tag, depth-first.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        find_in(&self.children, tag)
    }

    /// Every descendant with the given tag, in document order.
    pub fn find_all<'a>(&'a self, tag: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.tag == tag {
                out.push(child);
            }
            child.find_all(tag, out);
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if element.tag == "br" => out.push('\n'),
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// First element with the given tag anywhere in a node list.
pub fn find_in<'a>(nodes: &'a [Node], tag: &str) -> Option<&'a Element> {
    nodes
        .iter()
        .filter_map(Node::as_element)
        .find_map(|element| element.find(tag))
}

/// Top-level elements of a fragment.
pub fn top_level_elements(nodes: &[Node]) -> impl Iterator<Item = &Element> {
    nodes.iter().filter_map(Node::as_element)
}

/// Text of a node list with whitespace collapsed.
pub fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    collapse_whitespace(&out)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

struct TreeBuilder {
    root: Vec<Node>,
    stack: Vec<Element>,
}

impl TreeBuilder {
    fn append(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn append_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        if let Some(Node::Text(previous)) = siblings.last_mut() {
            previous.push_str(&text);
        } else {
            siblings.push(Node::Text(text));
        }
    }

    /// Close every element above `depth`.
    fn close_to(&mut self, depth: usize) {
        while self.stack.len() > depth {
            if let Some(element) = self.stack.pop() {
                self.append(Node::Element(element));
            }
        }
    }

    fn close_tag(&mut self, tag: &str) {
        if let Some(pos) = self.stack.iter().rposition(|e| e.tag == tag) {
            self.close_to(pos);
        }
    }

    /// Close the nearest open element in `targets` unless a `boundary`
    /// element is found first.
    fn close_scoped(&mut self, targets: &[&str], boundaries: &[&str]) {
        for pos in (0..self.stack.len()).rev() {
            let tag = self.stack[pos].tag.as_str();
            if targets.contains(&tag) {
                self.close_to(pos);
                return;
            }
            if boundaries.contains(&tag) {
                return;
            }
        }
    }

    fn implied_closes(&mut self, tag: &str) {
        match tag {
            "li" => self.close_scoped(&["li"], &["ul", "ol"]),
            "dt" | "dd" => self.close_scoped(&["dt", "dd"], &["dl"]),
            "tr" => {
                self.close_scoped(&["td", "th"], &["tr", "table"]);
                self.close_scoped(&["tr"], &["table", "thead", "tbody", "tfoot"]);
            }
            "td" | "th" => self.close_scoped(&["td", "th"], &["tr", "table"]),
            "thead" | "tbody" | "tfoot" => {
                self.close_scoped(&["td", "th"], &["table"]);
                self.close_scoped(&["tr"], &["table"]);
                self.close_scoped(&["thead", "tbody", "tfoot"], &["table"]);
            }
            "option" => self.close_scoped(&["option"], &["select"]),
            _ => {}
        }
        if BLOCK_ELEMENTS.contains(&tag) {
            self.close_scoped(&["p"], &["div", "li", "td", "th", "blockquote", "section"]);
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.close_to(0);
        self.root
    }
}

/// Parse an HTML fragment into a node list.
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let mut builder = TreeBuilder {
        root: Vec::new(),
        stack: Vec::new(),
    };
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            builder.append_text(decode_entities(rest));
            break;
        };
        if lt > 0 {
            builder.append_text(decode_entities(&rest[..lt]));
            rest = &rest[lt..];
        }

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_lowercase();
            if !name.is_empty() {
                builder.close_tag(&name);
            }
            rest = after.get(end + 1..).unwrap_or("");
            continue;
        }

        match parse_start_tag(rest) {
            Some((tag, attrs, self_closing, consumed)) => {
                rest = &rest[consumed..];
                builder.implied_closes(&tag);
                if VOID_ELEMENTS.contains(&tag.as_str()) || self_closing {
                    builder.append(Node::Element(Element::new(tag, attrs)));
                    continue;
                }
                if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                    let closing = format!("</{}", tag);
                    let end = find_ignore_case(rest, &closing).unwrap_or(rest.len());
                    let mut element = Element::new(tag, attrs);
                    if end > 0 {
                        element.children.push(Node::Text(decode_entities(&rest[..end])));
                    }
                    builder.append(Node::Element(element));
                    rest = &rest[end..];
                    rest = rest.find('>').map_or("", |gt| &rest[gt + 1..]);
                    continue;
                }
                builder.stack.push(Element::new(tag, attrs));
            }
            None => {
                // A lone '<' that does not start a tag is text.
                builder.append_text("<".to_string());
                rest = &rest[1..];
            }
        }
    }

    builder.finish()
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(&needle.to_ascii_lowercase())
}

type StartTag = (String, Vec<(String, String)>, bool, usize);

/// Parse `<tag attr=value ...>` at the start of `input`.
fn parse_start_tag(input: &str) -> Option<StartTag> {
    let bytes = input.as_bytes();
    if bytes.len() < 2 || !bytes[1].is_ascii_alphabetic() {
        return None;
    }

    let mut pos = 1;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-' || bytes[pos] == b':') {
        pos += 1;
    }
    let tag = input[1..pos].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Some((tag, attrs, self_closing, pos));
        }
        match bytes[pos] {
            b'>' => return Some((tag, attrs, self_closing, pos + 1)),
            b'/' => {
                self_closing = true;
                pos += 1;
                continue;
            }
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let name = input[name_start..pos].to_ascii_lowercase();
        self_closing = false;

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut value = String::new();
        if pos < bytes.len() && bytes[pos] == b'=' {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos < bytes.len() && (bytes[pos] == b'"' || bytes[pos] == b'\'') {
                let quote = bytes[pos];
                let start = pos + 1;
                let end = input[start..]
                    .bytes()
                    .position(|b| b == quote)
                    .map_or(bytes.len(), |i| start + i);
                value = decode_entities(&input[start..end]);
                pos = (end + 1).min(bytes.len());
            } else {
                let start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                    pos += 1;
                }
                value = decode_entities(&input[start..pos]);
            }
        }
        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
}

/// Decode character references. Unknown named references are kept as-is.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi + 1)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "times" => '\u{d7}',
        "minus" => '\u{2212}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
#[path = "html_tests.rs"]
mod tests;

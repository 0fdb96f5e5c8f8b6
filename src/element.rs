//! Lossless tree model for Gmail filter criteria strings
//!
//! A [`FilterElement`] is either a piece of text or an ordered group of child
//! elements, optionally wrapped in delimiters, with the whitespace that
//! surrounded it in the source kept verbatim. Rendering a parsed tree without
//! modifying it reproduces the source string byte for byte.

use std::fmt;

/// How an element is wrapped when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Delimiters {
    #[default]
    None,
    /// `( ... )`
    Parens,
    /// `{ ... }`
    Braces,
    /// `" ... "`, only ever used on text elements
    Quotes,
}

impl Delimiters {
    pub fn open(self) -> Option<char> {
        match self {
            Delimiters::None => None,
            Delimiters::Parens => Some('('),
            Delimiters::Braces => Some('{'),
            Delimiters::Quotes => Some('"'),
        }
    }

    pub fn close(self) -> Option<char> {
        match self {
            Delimiters::None => None,
            Delimiters::Parens => Some(')'),
            Delimiters::Braces => Some('}'),
            Delimiters::Quotes => Some('"'),
        }
    }

    /// The two-character pair, or "" when undelimited
    pub fn as_str(self) -> &'static str {
        match self {
            Delimiters::None => "",
            Delimiters::Parens => "()",
            Delimiters::Braces => "{}",
            Delimiters::Quotes => "\"\"",
        }
    }
}

/// Text and child elements are mutually exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementContent {
    Text(String),
    Group(Vec<FilterElement>),
}

impl Default for ElementContent {
    fn default() -> Self {
        ElementContent::Text(String::new())
    }
}

/// One node of a parsed filter criteria string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterElement {
    pub content: ElementContent,
    pub delimiters: Delimiters,
    pub leading_ws: String,
    pub trailing_ws: String,
}

impl FilterElement {
    /// Undelimited text element with no surrounding whitespace
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: ElementContent::Text(text.into()),
            ..Default::default()
        }
    }

    /// Double-quoted text element
    pub fn quoted(text: impl Into<String>) -> Self {
        Self::text(text).with_delimiters(Delimiters::Quotes)
    }

    /// Undelimited group element
    ///
    /// # Panics
    /// Panics if `children` is empty; a group always holds at least one element.
    pub fn group(children: Vec<FilterElement>) -> Self {
        assert!(
            !children.is_empty(),
            "FilterElement group must have at least one child"
        );
        Self {
            content: ElementContent::Group(children),
            ..Default::default()
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_whitespace(
        mut self,
        leading_ws: impl Into<String>,
        trailing_ws: impl Into<String>,
    ) -> Self {
        self.leading_ws = leading_ws.into();
        self.trailing_ws = trailing_ws.into();
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.content, ElementContent::Group(_))
    }

    /// Text of a text element, `None` for groups
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            ElementContent::Text(text) => Some(text),
            ElementContent::Group(_) => None,
        }
    }

    pub fn children(&self) -> Option<&[FilterElement]> {
        match &self.content {
            ElementContent::Group(children) => Some(children),
            ElementContent::Text(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<FilterElement>> {
        match &mut self.content {
            ElementContent::Group(children) => Some(children),
            ElementContent::Text(_) => None,
        }
    }

    /// Rebuild the criteria text this element represents
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.leading_ws);
        if let Some(open) = self.delimiters.open() {
            out.push(open);
        }
        match &self.content {
            ElementContent::Text(text) => out.push_str(text),
            ElementContent::Group(children) => {
                for child in children {
                    child.render_into(out);
                }
            }
        }
        if let Some(close) = self.delimiters.close() {
            out.push(close);
        }
        out.push_str(&self.trailing_ws);
    }

    /// Multi-line structural dump, one element per line
    pub fn tree_string(&self) -> String {
        let mut lines = Vec::new();
        self.tree_lines(0, &mut lines);
        lines.join("\n")
    }

    fn tree_lines(&self, indent: usize, lines: &mut Vec<String>) {
        let pad = " ".repeat(indent);
        let mut attrs = Vec::new();
        if let ElementContent::Text(text) = &self.content {
            attrs.push(format!("text:{:?}", text));
        }
        if self.delimiters != Delimiters::None {
            attrs.push(format!("delims:{:?}", self.delimiters.as_str()));
        }
        if !self.leading_ws.is_empty() {
            attrs.push(format!("leading_ws:{:?}", self.leading_ws));
        }
        if !self.trailing_ws.is_empty() {
            attrs.push(format!("trailing_ws:{:?}", self.trailing_ws));
        }

        match &self.content {
            ElementContent::Text(_) => {
                lines.push(format!("{}Text {{ {} }}", pad, attrs.join(" ")));
            }
            ElementContent::Group(children) => {
                if attrs.is_empty() {
                    lines.push(format!("{}Group {{", pad));
                } else {
                    lines.push(format!("{}Group {{ {}", pad, attrs.join(" ")));
                }
                for child in children {
                    child.tree_lines(indent + 2, lines);
                }
                lines.push(format!("{}}}", pad));
            }
        }
    }
}

impl fmt::Display for FilterElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

//! Filter criteria parser
//!
//! Parsing is two steps: [`check_delimiters`] validates bracket nesting and
//! quoting over the whole string, then a recursive scanner splits it into
//! [`FilterElement`]s. The scanner only ever runs on input the check accepted,
//! so it never builds a partial tree.
//!
//! Brackets inside a double-quoted span are plain text. Gmail search has no
//! escape sequences, so a quote always closes the span it opened.

use tracing::trace;

use crate::element::{Delimiters, ElementContent, FilterElement};
use crate::error::{DelimiterError, ParseError};

const QUOTE: u8 = b'"';

fn is_open(b: u8) -> bool {
    b == b'(' || b == b'{'
}

fn is_close(b: u8) -> bool {
    b == b')' || b == b'}'
}

fn opener_for(close: u8) -> u8 {
    if close == b')' {
        b'('
    } else {
        b'{'
    }
}

/// Validate that `(`/`)` and `{`/`}` nest correctly and that every quote is closed
pub fn check_delimiters(filter: &str) -> Result<(), DelimiterError> {
    let bytes = filter.as_bytes();
    let mut stack: Vec<(u8, usize)> = Vec::new();
    let mut open_quote: Option<usize> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if open_quote.is_some() {
            if b == QUOTE {
                open_quote = None;
            }
            continue;
        }
        if b == QUOTE {
            open_quote = Some(i);
        } else if is_open(b) {
            stack.push((b, i));
        } else if is_close(b) {
            match stack.pop() {
                Some((open, _)) if open == opener_for(b) => {}
                _ => {
                    return Err(DelimiterError::MismatchedClose {
                        filter: filter.to_string(),
                        index: i,
                    })
                }
            }
        }
    }

    if let Some(index) = open_quote {
        return Err(DelimiterError::UnmatchedQuote {
            filter: filter.to_string(),
            index,
        });
    }
    if let Some(&(_, index)) = stack.last() {
        return Err(DelimiterError::UnmatchedOpen {
            filter: filter.to_string(),
            index,
        });
    }
    Ok(())
}

/// Parse a filter criteria string into an undelimited top-level group
///
/// An empty string yields a group holding one empty text element, so the
/// result always has at least one child.
pub fn parse(filter: &str) -> Result<FilterElement, ParseError> {
    check_delimiters(filter)?;
    ElementParser::new(filter, 0, filter.len()).parse_all()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    PreText,
    Text,
    PostText,
    QuotedText,
}

/// Scans the byte span `[start, end)` of `filter` into elements
struct ElementParser<'a> {
    filter: &'a str,
    bytes: &'a [u8],
    cursor: usize,
    end: usize,
    started: bool,
}

impl<'a> ElementParser<'a> {
    fn new(filter: &'a str, start: usize, end: usize) -> Self {
        Self {
            filter,
            bytes: filter.as_bytes(),
            cursor: start,
            end,
            started: false,
        }
    }

    fn parse_all(mut self) -> Result<FilterElement, ParseError> {
        let mut elements = Vec::new();
        while let Some(element) = self.parse_next()? {
            elements.push(element);
        }
        Ok(FilterElement::group(elements))
    }

    /// Index of the delimiter closing the group opened at `open`
    fn matching_close(&self, open: usize) -> Result<usize, DelimiterError> {
        let mut stack: Vec<u8> = Vec::new();
        let mut in_quote = false;

        for i in open..self.end {
            let b = self.bytes[i];
            if in_quote {
                if b == QUOTE {
                    in_quote = false;
                }
                continue;
            }
            if b == QUOTE {
                in_quote = true;
            } else if is_open(b) {
                stack.push(b);
            } else if is_close(b) {
                if stack.pop() != Some(opener_for(b)) {
                    return Err(self.mismatched_close(i));
                }
                if stack.is_empty() {
                    return Ok(i);
                }
            }
        }

        Err(DelimiterError::UnmatchedOpen {
            filter: self.filter.to_string(),
            index: open,
        })
    }

    /// Parse the group opened at `open`, returning it and its closing index
    fn parse_delimited_group(&self, open: usize) -> Result<(FilterElement, usize), ParseError> {
        let close = self.matching_close(open)?;
        let mut group = ElementParser::new(self.filter, open + 1, close).parse_all()?;
        group.delimiters = if self.bytes[open] == b'(' {
            Delimiters::Parens
        } else {
            Delimiters::Braces
        };
        Ok((group, close))
    }

    fn mismatched_close(&self, index: usize) -> DelimiterError {
        DelimiterError::MismatchedClose {
            filter: self.filter.to_string(),
            index,
        }
    }

    /// Scan one token: leading whitespace, a bare word, quoted text or a
    /// delimited group, then trailing whitespace
    fn parse_next(&mut self) -> Result<Option<FilterElement>, ParseError> {
        let first = !self.started;
        self.started = true;

        let ws_start = self.cursor;
        let mut lead_end = None;
        let mut text_range: Option<(usize, usize)> = None;
        let mut quoted = false;
        let mut quote_closed = false;
        let mut group: Option<FilterElement> = None;
        let mut trail_start: Option<usize> = None;
        let mut mode = ScanMode::PreText;

        let mut i = self.cursor;
        while i < self.end {
            let b = self.bytes[i];
            match mode {
                ScanMode::PreText => {
                    if b.is_ascii_whitespace() {
                        i += 1;
                    } else if is_open(b) {
                        lead_end = Some(i);
                        let (parsed, close) = self.parse_delimited_group(i)?;
                        group = Some(parsed);
                        i = close + 1;
                        trail_start = Some(i);
                        mode = ScanMode::PostText;
                    } else if is_close(b) {
                        return Err(self.mismatched_close(i));
                    } else if b == QUOTE {
                        lead_end = Some(i);
                        quoted = true;
                        text_range = Some((i + 1, i + 1));
                        i += 1;
                        mode = ScanMode::QuotedText;
                    } else {
                        lead_end = Some(i);
                        text_range = Some((i, i + 1));
                        i += 1;
                        mode = ScanMode::Text;
                    }
                }
                ScanMode::Text => {
                    if b.is_ascii_whitespace() {
                        trail_start = Some(i);
                        mode = ScanMode::PostText;
                    } else if is_open(b) || b == QUOTE {
                        // The group or quoted text is the next token
                        break;
                    } else if is_close(b) {
                        return Err(self.mismatched_close(i));
                    } else {
                        i += 1;
                        if let Some(range) = text_range.as_mut() {
                            range.1 = i;
                        }
                    }
                }
                ScanMode::PostText => {
                    if b.is_ascii_whitespace() {
                        i += 1;
                    } else {
                        break;
                    }
                }
                ScanMode::QuotedText => {
                    if b == QUOTE {
                        quote_closed = true;
                        i += 1;
                        if i < self.end && self.bytes[i].is_ascii_whitespace() {
                            // Whitespace after the closing quote belongs to this element
                            trail_start = Some(i);
                            mode = ScanMode::PostText;
                        } else {
                            break;
                        }
                    } else {
                        i += 1;
                        if let Some(range) = text_range.as_mut() {
                            range.1 = i;
                        }
                    }
                }
            }
        }

        if quoted && !quote_closed {
            return Err(DelimiterError::UnmatchedQuote {
                filter: self.filter.to_string(),
                index: lead_end.unwrap_or(ws_start),
            });
        }

        self.cursor = i;
        let lead_end = lead_end.unwrap_or(i);
        let leading_ws = &self.filter[ws_start..lead_end];
        let trailing_ws = trail_start.map_or("", |start| &self.filter[start..i]);

        let element = if let Some(mut parsed) = group {
            parsed.leading_ws = leading_ws.to_string();
            parsed.trailing_ws = trailing_ws.to_string();
            parsed
        } else if let Some((text_start, text_end)) = text_range {
            FilterElement {
                content: ElementContent::Text(self.filter[text_start..text_end].to_string()),
                delimiters: if quoted {
                    Delimiters::Quotes
                } else {
                    Delimiters::None
                },
                leading_ws: leading_ws.to_string(),
                trailing_ws: trailing_ws.to_string(),
            }
        } else if first {
            // Empty or all-whitespace span
            FilterElement::text("").with_whitespace(leading_ws, "")
        } else {
            debug_assert!(leading_ws.is_empty(), "whitespace left after final element");
            return Ok(None);
        };

        trace!(
            "Scanned element {:?} ending at {}",
            element.render(),
            self.cursor
        );
        Ok(Some(element))
    }
}

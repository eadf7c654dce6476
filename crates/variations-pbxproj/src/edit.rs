//! In-place edits of `project.pbxproj` text.
//!
//! Xcode annotates object ids with `/* ... */` comments, groups objects into
//! sections and writes some objects on a single line. Edits are spliced into
//! the original text so that everything they do not touch stays byte for byte
//! what Xcode wrote.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    DictOpen,
    DictClose,
    ArrayOpen,
    ArrayClose,
    Equals,
    Semicolon,
    Comma,
    String,
    Data,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

fn is_unquoted_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'$' | b'/' | b':' | b'.' | b'-')
}

/// Split `text` into tokens, skipping whitespace and comments.
fn tokenize(text: &str) -> Option<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = if text.starts_with('\u{feff}') { 3 } else { 0 };

    while pos < bytes.len() {
        let start = pos;
        let c = bytes[pos];
        let kind = match c {
            c if c.is_ascii_whitespace() => {
                pos += 1;
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = text[pos..].find('\n').map_or(bytes.len(), |n| pos + n);
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = text[pos + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |n| pos + 2 + n + 2);
                continue;
            }
            b'{' => Kind::DictOpen,
            b'}' => Kind::DictClose,
            b'(' => Kind::ArrayOpen,
            b')' => Kind::ArrayClose,
            b'=' => Kind::Equals,
            b';' => Kind::Semicolon,
            b',' => Kind::Comma,
            b'"' | b'\'' => {
                pos += 1;
                loop {
                    match *bytes.get(pos)? {
                        b'\\' => pos += 2,
                        q if q == c => break,
                        _ => pos += 1,
                    }
                }
                Kind::String
            }
            b'<' => {
                pos += text[pos..].find('>')?;
                Kind::Data
            }
            c if is_unquoted_char(c) => {
                while bytes.get(pos + 1).is_some_and(|&b| is_unquoted_char(b)) {
                    pos += 1;
                }
                Kind::String
            }
            _ => return None,
        };
        pos += 1;
        tokens.push(Token {
            kind,
            start,
            end: pos,
        });
    }
    Some(tokens)
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Quote a value the way Xcode writes quoted strings.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn write_key(key: &str) -> String {
    if !key.is_empty() && key.bytes().all(is_unquoted_char) && !key.contains("//") {
        key.to_string()
    } else {
        quote(key)
    }
}

fn splice(text: &str, range: Range<usize>, with: &str) -> String {
    let mut out = String::with_capacity(text.len() + with.len());
    out.push_str(&text[..range.start]);
    out.push_str(with);
    out.push_str(&text[range.end..]);
    out
}

struct Document<'a> {
    text: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Document<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let tokens = tokenize(text)?;
        if tokens.first()?.kind != Kind::DictOpen {
            return None;
        }
        Some(Document { text, tokens })
    }

    fn kind(&self, i: usize) -> Option<Kind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    fn string(&self, i: usize) -> Option<String> {
        let token = self.tokens.get(i)?;
        if token.kind != Kind::String {
            return None;
        }
        let raw = &self.text[token.start..token.end];
        match raw.as_bytes().first()? {
            b'"' | b'\'' => Some(unescape(&raw[1..raw.len() - 1])),
            _ => Some(raw.to_string()),
        }
    }

    /// Index of the token just past the value that starts at `i`.
    fn skip_value(&self, i: usize) -> Option<usize> {
        match self.kind(i)? {
            Kind::String | Kind::Data => Some(i + 1),
            Kind::DictOpen | Kind::ArrayOpen => {
                let mut depth = 0usize;
                for (j, token) in self.tokens.iter().enumerate().skip(i) {
                    match token.kind {
                        Kind::DictOpen | Kind::ArrayOpen => depth += 1,
                        Kind::DictClose | Kind::ArrayClose => {
                            depth = depth.checked_sub(1)?;
                            if depth == 0 {
                                return Some(j + 1);
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Byte range of the value that starts at token `i`.
    fn value_span(&self, i: usize) -> Option<Range<usize>> {
        let last = self.skip_value(i)? - 1;
        Some(self.tokens.get(i)?.start..self.tokens.get(last)?.end)
    }

    /// `(key, value)` token indices of the dictionary opening at `i`, and the
    /// index of its closing brace.
    fn entries(&self, i: usize) -> Option<(Vec<(usize, usize)>, usize)> {
        if self.kind(i)? != Kind::DictOpen {
            return None;
        }
        let mut entries = Vec::new();
        let mut j = i + 1;
        loop {
            match self.kind(j)? {
                Kind::DictClose => return Some((entries, j)),
                Kind::String if self.kind(j + 1)? == Kind::Equals => {
                    let value = j + 2;
                    let after = self.skip_value(value)?;
                    if self.kind(after)? != Kind::Semicolon {
                        return None;
                    }
                    entries.push((j, value));
                    j = after + 1;
                }
                _ => return None,
            }
        }
    }

    /// Token index of the value stored under `key` in the dictionary at `dict`.
    fn lookup(&self, dict: usize, key: &str) -> Option<usize> {
        let (entries, _) = self.entries(dict)?;
        entries
            .into_iter()
            .find(|&(k, _)| self.string(k).as_deref() == Some(key))
            .map(|(_, value)| value)
    }

    /// Insert a new entry into the dictionary at `dict`, before the first key
    /// that sorts after `key`. `entry` receives the indentation of the new line
    /// (empty for a single-line dictionary).
    fn insert_entry(
        &self,
        dict: usize,
        key: &str,
        entry: impl Fn(&str) -> String,
    ) -> Option<String> {
        let (entries, close) = self.entries(dict)?;
        let anchor = entries
            .iter()
            .find(|&&(k, _)| self.string(k).is_some_and(|name| name.as_str() > key))
            .map(|&(k, _)| k);
        let anchor_pos = self.tokens.get(anchor.unwrap_or(close))?.start;

        let line_start = self.text[..anchor_pos].rfind('\n').map_or(0, |n| n + 1);
        let lead = &self.text[line_start..anchor_pos];
        if lead.bytes().all(|b| b == b' ' || b == b'\t') {
            let indent = match anchor {
                Some(_) => lead.to_string(),
                None => format!("{lead}\t"),
            };
            let line = format!("{indent}{}\n", entry(&indent));
            Some(splice(self.text, line_start..line_start, &line))
        } else {
            let inline = format!("{} ", entry(""));
            Some(splice(self.text, anchor_pos..anchor_pos, &inline))
        }
    }
}

/// Set `key` to `value` in the `buildSettings` of the configuration object
/// `config_id`, returning the edited text. Returns `None` when the object
/// cannot be found.
pub(crate) fn set_build_setting(
    text: &str,
    config_id: &str,
    key: &str,
    value: &str,
) -> Option<String> {
    let doc = Document::parse(text)?;
    let objects = doc.lookup(0, "objects")?;
    let config = doc.lookup(objects, config_id)?;
    let setting = format!("{} = {};", write_key(key), quote(value));

    match doc.lookup(config, "buildSettings") {
        Some(settings) if doc.kind(settings) == Some(Kind::DictOpen) => {
            match doc.lookup(settings, key) {
                Some(existing) => Some(splice(text, doc.value_span(existing)?, &quote(value))),
                None => doc.insert_entry(settings, key, |_| setting.clone()),
            }
        }
        Some(other) => Some(splice(
            text,
            doc.value_span(other)?,
            &format!("{{ {setting} }}"),
        )),
        None => doc.insert_entry(config, "buildSettings", |indent| {
            format!("buildSettings = {{\n{indent}\t{setting}\n{indent}}};")
        }),
    }
}

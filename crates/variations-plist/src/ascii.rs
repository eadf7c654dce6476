//! ASCII/OpenStep property list reader and writer.
//!
//! This is the format Xcode uses for `project.pbxproj`. Dictionary order is
//! kept as read so an unmodified document writes back with the same structure.

use plist::Value;
use std::fmt;

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.input.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn expect(&mut self, wanted: u8) -> Result<(), ParseError> {
        match self.advance() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(&format!(
                "expected '{}', found '{}'",
                wanted as char, c as char
            ))),
            None => Err(self.error(&format!("expected '{}'", wanted as char))),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match (self.peek(), self.peek_next()) {
                (Some(c), _) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                (Some(b'/'), Some(b'/')) => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some(b'*') if self.peek() == Some(b'/') => {
                                self.advance();
                                break;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            line: self.line,
            column: self.column,
        }
    }
}

/// Parse an ASCII/OpenStep plist document into a plist Value.
pub fn parse(input: &str) -> Result<Value, ParseError> {
    let mut lexer = Lexer::new(input.strip_prefix('\u{feff}').unwrap_or(input));
    let value = parse_value(&mut lexer)?;
    lexer.skip_whitespace_and_comments();
    if lexer.peek().is_some() {
        return Err(lexer.error("trailing content after document"));
    }
    Ok(value)
}

fn parse_value(lexer: &mut Lexer) -> Result<Value, ParseError> {
    lexer.skip_whitespace_and_comments();

    match lexer.peek() {
        Some(b'{') => parse_dictionary(lexer),
        Some(b'(') => parse_array(lexer),
        Some(b'"') | Some(b'\'') => parse_quoted_string(lexer).map(Value::String),
        Some(b'<') => parse_data(lexer),
        Some(c) if is_unquoted_char(c) => parse_unquoted_string(lexer).map(Value::String),
        Some(c) => Err(lexer.error(&format!("unexpected character '{}'", c as char))),
        None => Err(lexer.error("unexpected end of input")),
    }
}

fn parse_dictionary(lexer: &mut Lexer) -> Result<Value, ParseError> {
    lexer.expect(b'{')?;

    let mut dict = plist::Dictionary::new();

    loop {
        lexer.skip_whitespace_and_comments();

        match lexer.peek() {
            Some(b'}') => {
                lexer.advance();
                return Ok(Value::Dictionary(dict));
            }
            None => return Err(lexer.error("unexpected end of dictionary")),
            _ => {}
        }

        let key = parse_string_value(lexer)?;

        lexer.skip_whitespace_and_comments();
        lexer.expect(b'=')?;
        let value = parse_value(lexer)?;
        dict.insert(key, value);

        lexer.skip_whitespace_and_comments();
        lexer.expect(b';')?;
    }
}

fn parse_array(lexer: &mut Lexer) -> Result<Value, ParseError> {
    lexer.expect(b'(')?;

    let mut arr = Vec::new();

    loop {
        lexer.skip_whitespace_and_comments();

        match lexer.peek() {
            Some(b')') => {
                lexer.advance();
                return Ok(Value::Array(arr));
            }
            None => return Err(lexer.error("unexpected end of array")),
            _ => {}
        }

        arr.push(parse_value(lexer)?);

        lexer.skip_whitespace_and_comments();
        match lexer.peek() {
            Some(b',') => {
                lexer.advance();
            }
            Some(b')') => {}
            _ => return Err(lexer.error("expected ',' or ')' in array")),
        }
    }
}

fn parse_string_value(lexer: &mut Lexer) -> Result<String, ParseError> {
    lexer.skip_whitespace_and_comments();
    match lexer.peek() {
        Some(b'"') | Some(b'\'') => parse_quoted_string(lexer),
        Some(c) if is_unquoted_char(c) => parse_unquoted_string(lexer),
        _ => Err(lexer.error("expected string")),
    }
}

fn parse_quoted_string(lexer: &mut Lexer) -> Result<String, ParseError> {
    let quote = lexer.advance().ok_or_else(|| lexer.error("expected string"))?;

    // Raw bytes are collected so multi-byte UTF-8 sequences survive intact.
    let mut bytes = Vec::new();
    let push_char = |bytes: &mut Vec<u8>, ch: char| {
        let mut buf = [0u8; 4];
        bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    };

    loop {
        match lexer.advance() {
            Some(c) if c == quote => break,
            Some(b'\\') => match lexer.advance() {
                Some(b'n') => bytes.push(b'\n'),
                Some(b'r') => bytes.push(b'\r'),
                Some(b't') => bytes.push(b'\t'),
                Some(b'a') => bytes.push(0x07),
                Some(b'b') => bytes.push(0x08),
                Some(b'f') => bytes.push(0x0C),
                Some(b'v') => bytes.push(0x0B),
                Some(b'U') | Some(b'u') => {
                    let mut code = 0u32;
                    for _ in 0..4 {
                        match lexer.advance() {
                            Some(c) if c.is_ascii_hexdigit() => {
                                code = code * 16 + (c as char).to_digit(16).unwrap_or(0);
                            }
                            _ => return Err(lexer.error("invalid unicode escape")),
                        }
                    }
                    if let Some(ch) = char::from_u32(code) {
                        push_char(&mut bytes, ch);
                    }
                }
                Some(c @ b'0'..=b'7') => {
                    let mut code = u32::from(c - b'0');
                    for _ in 0..2 {
                        match lexer.peek() {
                            Some(d @ b'0'..=b'7') => {
                                code = code * 8 + u32::from(d - b'0');
                                lexer.advance();
                            }
                            _ => break,
                        }
                    }
                    if let Some(ch) = char::from_u32(code) {
                        push_char(&mut bytes, ch);
                    }
                }
                Some(c) => bytes.push(c),
                None => return Err(lexer.error("unexpected end of string escape")),
            },
            Some(c) => bytes.push(c),
            None => return Err(lexer.error("unterminated string")),
        }
    }

    String::from_utf8(bytes).map_err(|_| lexer.error("invalid UTF-8 in string"))
}

fn parse_unquoted_string(lexer: &mut Lexer) -> Result<String, ParseError> {
    let start = lexer.pos;
    while let Some(c) = lexer.peek() {
        if !is_unquoted_char(c) {
            break;
        }
        lexer.advance();
    }
    if start == lexer.pos {
        return Err(lexer.error("expected unquoted string"));
    }
    // Unquoted characters are all ASCII.
    Ok(String::from_utf8_lossy(&lexer.input[start..lexer.pos]).into_owned())
}

fn parse_data(lexer: &mut Lexer) -> Result<Value, ParseError> {
    lexer.expect(b'<')?;

    let mut nibbles = Vec::new();
    loop {
        lexer.skip_whitespace_and_comments();
        match lexer.peek() {
            Some(b'>') => {
                lexer.advance();
                break;
            }
            Some(c) if c.is_ascii_hexdigit() => {
                nibbles.push((c as char).to_digit(16).unwrap_or(0) as u8);
                lexer.advance();
            }
            Some(c) => return Err(lexer.error(&format!("invalid hex character '{}'", c as char))),
            None => return Err(lexer.error("unterminated data")),
        }
    }

    if nibbles.len() % 2 != 0 {
        nibbles.push(0);
    }

    let bytes = nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect();
    Ok(Value::Data(bytes))
}

fn is_unquoted_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'$' | b'/' | b':' | b'.' | b'-')
}

// --- Writer ---

/// Write a plist Value in ASCII/OpenStep format.
pub fn write(value: &Value) -> String {
    let mut output = String::new();
    write_value(&mut output, value, 0);
    output.push('\n');
    output
}

fn indent(output: &mut String, depth: usize) {
    for _ in 0..depth {
        output.push('\t');
    }
}

fn write_value(output: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Dictionary(dict) => write_dictionary(output, dict, depth),
        Value::Array(arr) => write_array(output, arr, depth),
        Value::String(s) => write_string(output, s),
        Value::Integer(i) => output.push_str(&i.to_string()),
        Value::Real(f) => output.push_str(&f.to_string()),
        Value::Boolean(b) => output.push_str(if *b { "YES" } else { "NO" }),
        Value::Data(d) => write_data(output, d),
        Value::Date(d) => write_string(output, &d.to_xml_format()),
        Value::Uid(u) => output.push_str(&u.get().to_string()),
        _ => output.push_str("\"\""),
    }
}

fn write_dictionary(output: &mut String, dict: &plist::Dictionary, depth: usize) {
    output.push_str("{\n");
    for (key, value) in dict.iter() {
        indent(output, depth + 1);
        write_string(output, key);
        output.push_str(" = ");
        write_value(output, value, depth + 1);
        output.push_str(";\n");
    }
    indent(output, depth);
    output.push('}');
}

fn write_array(output: &mut String, arr: &[Value], depth: usize) {
    output.push_str("(\n");
    for value in arr {
        indent(output, depth + 1);
        write_value(output, value, depth + 1);
        output.push_str(",\n");
    }
    indent(output, depth);
    output.push(')');
}

fn write_string(output: &mut String, s: &str) {
    // A bare `//` or `/*` would read back as a comment.
    if !s.is_empty() && s.bytes().all(is_unquoted_char) && !s.contains("//") && !s.contains("/*") {
        output.push_str(s);
        return;
    }

    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '\x07' => output.push_str("\\a"),
            '\x08' => output.push_str("\\b"),
            '\x0C' => output.push_str("\\f"),
            '\x0B' => output.push_str("\\v"),
            _ => output.push(c),
        }
    }
    output.push('"');
}

fn write_data(output: &mut String, data: &[u8]) {
    output.push('<');
    for (i, byte) in data.iter().enumerate() {
        if i > 0 && i % 4 == 0 {
            output.push(' ');
        }
        output.push_str(&format!("{byte:02x}"));
    }
    output.push('>');
}

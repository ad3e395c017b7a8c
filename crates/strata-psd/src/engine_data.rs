//! The legacy text grammar embedded in `tdta` blobs.
//!
//! Type-tool layers carry their engine data as a PostScript-like literal
//! text: arrays in brackets, dictionaries as `<< /key value >>` pairs,
//! parenthesized strings, plain numbers and booleans. The grammar is
//! line oriented, a value whose closing delimiter has not appeared yet
//! pulls further lines from the source on demand.
//!
//! Parsing is a single forward pass over a fixed buffer. Running out of
//! input mid-value is the normal way a truncated blob ends and maps to
//! [`EngineParseError::UnexpectedEnd`]; a token that fits no production
//! maps to [`EngineParseError::BadSyntax`] with the offending line
//! number. Callers absorb both, a broken blob costs its own value and
//! nothing else.
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::EngineParseError;

/// A value of the legacy text grammar.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PsValue {
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Text(String),
    Array(Vec<PsValue>),
    Dictionary(BTreeMap<String, PsValue>)
}

impl PsValue {
    /// Look up `key` when the value is a dictionary.
    pub fn get(&self, key: &str) -> Option<&PsValue> {
        match self {
            PsValue::Dictionary(map) => map.get(key),
            _ => None
        }
    }

    /// Walk a chain of dictionary keys.
    pub fn get_path(&self, path: &[&str]) -> Option<&PsValue> {
        let mut current = self;
        for key in path {
            current = current.get(key)?;
        }
        Some(current)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PsValue::Integer(v) => Some(*v),
            PsValue::Double(v) => Some(*v as i64),
            _ => None
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PsValue::Integer(v) => Some(*v as f64),
            PsValue::Double(v) => Some(*v),
            _ => None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PsValue::Boolean(v) => Some(*v),
            _ => None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PsValue::Text(v) => Some(v),
            _ => None
        }
    }

    pub fn as_array(&self) -> Option<&[PsValue]> {
        match self {
            PsValue::Array(v) => Some(v),
            _ => None
        }
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Recursive-descent parser over a `tdta` byte blob.
///
/// The blob is treated as text; bytes that are not valid UTF-8 (the
/// inline FE FF byte-order marks aside, which are skipped) survive into
/// string values as replacement characters.
pub struct EngineDataParser<'a> {
    rest: &'a [u8],
    line: usize
}

impl<'a> EngineDataParser<'a> {
    pub fn new(data: &'a [u8]) -> EngineDataParser<'a> {
        EngineDataParser { rest: data, line: 0 }
    }

    /// Parse the single top-level value of the blob.
    pub fn parse(mut self) -> Result<PsValue, EngineParseError> {
        let line = self.next_line()?;
        let (value, _rest) = self.value(line)?;
        Ok(value)
    }

    /// Pull the next non-empty line, trimmed of surrounding whitespace.
    fn next_line(&mut self) -> Result<&'a [u8], EngineParseError> {
        loop {
            if self.rest.is_empty() {
                return Err(EngineParseError::UnexpectedEnd);
            }
            let (raw, rest) = match self.rest.iter().position(|b| *b == b'\n') {
                Some(pos) => (&self.rest[..pos], &self.rest[pos + 1..]),
                None => (self.rest, &self.rest[self.rest.len()..])
            };
            self.rest = rest;
            self.line += 1;
            let line = trim(raw);
            if !line.is_empty() {
                return Ok(line);
            }
        }
    }

    fn value(&mut self, line: &'a [u8]) -> Result<(PsValue, &'a [u8]), EngineParseError> {
        let mut line = trim(line);
        if line.is_empty() {
            line = self.next_line()?;
        }

        if let Some(result) = self.number(line)? {
            return Ok(result);
        }
        if line.starts_with(b"true") {
            return Ok((PsValue::Boolean(true), trim(&line[4..])));
        }
        if line.starts_with(b"false") {
            return Ok((PsValue::Boolean(false), trim(&line[5..])));
        }
        if line.starts_with(b"[") {
            return self.array(trim(&line[1..]));
        }
        if line.starts_with(b"<<") {
            return self.dictionary(trim(&line[2..]));
        }
        if line.starts_with(b"(") {
            return self.text(&line[1..]);
        }
        Err(EngineParseError::BadSyntax(self.line))
    }

    /// Match an optionally signed decimal at the start of the line.
    ///
    /// A `.` anywhere in the token selects a double, otherwise the token
    /// is an integer. A bare sign with no digits is how a stray token
    /// starting with `-` surfaces and is a syntax error.
    #[allow(clippy::type_complexity)]
    fn number(
        &self, line: &'a [u8]
    ) -> Result<Option<(PsValue, &'a [u8])>, EngineParseError> {
        let mut index = 0;
        let negative = line.first() == Some(&b'-');
        if negative {
            index += 1;
        }
        while line.get(index).is_some_and(u8::is_ascii_digit) {
            index += 1;
        }
        let mut fractional = false;
        if line.get(index) == Some(&b'.') && line.get(index + 1).is_some_and(u8::is_ascii_digit) {
            fractional = true;
            index += 1;
            while line.get(index).is_some_and(u8::is_ascii_digit) {
                index += 1;
            }
        }

        if index == 0 {
            return Ok(None);
        }
        if negative && index == 1 {
            return Err(EngineParseError::BadSyntax(self.line));
        }

        let token = core::str::from_utf8(&line[..index])
            .map_err(|_| EngineParseError::BadSyntax(self.line))?;
        let value = if fractional {
            PsValue::Double(
                token
                    .parse::<f64>()
                    .map_err(|_| EngineParseError::BadSyntax(self.line))?
            )
        } else {
            PsValue::Integer(
                token
                    .parse::<i64>()
                    .map_err(|_| EngineParseError::BadSyntax(self.line))?
            )
        };
        Ok(Some((value, trim(&line[index..]))))
    }

    fn array(&mut self, mut line: &'a [u8]) -> Result<(PsValue, &'a [u8]), EngineParseError> {
        let mut array = Vec::new();
        while !line.starts_with(b"]") {
            if line.is_empty() {
                line = self.next_line()?;
                continue;
            }
            let (value, rest) = self.value(line)?;
            array.push(value);
            line = rest;
        }
        Ok((PsValue::Array(array), trim(&line[1..])))
    }

    fn dictionary(&mut self, mut line: &'a [u8]) -> Result<(PsValue, &'a [u8]), EngineParseError> {
        let mut dictionary = BTreeMap::new();
        while !line.starts_with(b">>") {
            if line.is_empty() {
                line = self.next_line()?;
                continue;
            }
            let (key, rest) = self.dictionary_key(line)?;
            let (value, rest) = self.value(rest)?;
            dictionary.insert(key, value);
            line = rest;
        }
        Ok((PsValue::Dictionary(dictionary), trim(&line[2..])))
    }

    fn dictionary_key(&self, line: &'a [u8]) -> Result<(String, &'a [u8]), EngineParseError> {
        if !line.starts_with(b"/") {
            return Err(EngineParseError::BadSyntax(self.line));
        }
        let body = &line[1..];
        let end = body
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(body.len());
        if end == 0 {
            return Err(EngineParseError::BadSyntax(self.line));
        }
        Ok((lossy(&body[..end]), trim(&body[end..])))
    }

    /// A parenthesized string.
    ///
    /// A backslash suppresses the closing-paren check for the following
    /// byte (and itself stays part of the text, as the original data
    /// carries it). A FE FF byte-order mark is dropped wherever it
    /// appears. Exhausting a line inserts a newline and pulls the next.
    fn text(&mut self, mut line: &'a [u8]) -> Result<(PsValue, &'a [u8]), EngineParseError> {
        let mut text: Vec<u8> = Vec::new();
        let mut escape = false;
        loop {
            if line.starts_with(b")") && !escape {
                break;
            }
            if line.is_empty() {
                line = self.next_line()?;
                text.push(b'\n');
                escape = false;
                continue;
            }
            escape = false;
            if line[0] == b'\\' {
                escape = true;
            }
            if line.starts_with(&[0xFE, 0xFF]) {
                line = &line[2..];
                if line.is_empty() {
                    return Err(EngineParseError::BadSyntax(self.line));
                }
            }
            text.push(line[0]);
            line = &line[1..];
        }
        Ok((PsValue::Text(lossy(&text)), trim(&line[1..])))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn parse(source: &str) -> Result<PsValue, EngineParseError> {
        EngineDataParser::new(source.as_bytes()).parse()
    }

    #[test]
    fn booleans() {
        let value = parse("[true false true]").unwrap();
        assert_eq!(
            value,
            PsValue::Array(vec![
                PsValue::Boolean(true),
                PsValue::Boolean(false),
                PsValue::Boolean(true)
            ])
        );
    }

    #[test]
    fn arrays() {
        let value = parse("[-10.12 -10 20.12 [.19 -.20] 30 20]").unwrap();
        assert_eq!(
            value,
            PsValue::Array(vec![
                PsValue::Double(-10.12),
                PsValue::Integer(-10),
                PsValue::Double(20.12),
                PsValue::Array(vec![PsValue::Double(0.19), PsValue::Double(-0.20)]),
                PsValue::Integer(30),
                PsValue::Integer(20)
            ])
        );

        let value = parse("[-10.12 -10 20.12 [] 30 20]").unwrap();
        assert_eq!(
            value,
            PsValue::Array(vec![
                PsValue::Double(-10.12),
                PsValue::Integer(-10),
                PsValue::Double(20.12),
                PsValue::Array(vec![]),
                PsValue::Integer(30),
                PsValue::Integer(20)
            ])
        );
    }

    #[test]
    fn dictionaries() {
        let value =
            parse("<</Key1 10 /Key2 20 /Key3 [10 20 30] /Key4 <</Key5 40>> /Key6 <</Key7 50>>>>")
                .unwrap();
        let mut expected = BTreeMap::new();
        expected.insert("Key1".into(), PsValue::Integer(10));
        expected.insert("Key2".into(), PsValue::Integer(20));
        expected.insert(
            "Key3".into(),
            PsValue::Array(vec![
                PsValue::Integer(10),
                PsValue::Integer(20),
                PsValue::Integer(30)
            ])
        );
        let mut key4 = BTreeMap::new();
        key4.insert("Key5".into(), PsValue::Integer(40));
        expected.insert("Key4".into(), PsValue::Dictionary(key4));
        let mut key6 = BTreeMap::new();
        key6.insert("Key7".into(), PsValue::Integer(50));
        expected.insert("Key6".into(), PsValue::Dictionary(key6));
        assert_eq!(value, PsValue::Dictionary(expected));
    }

    #[test]
    fn dictionary_spanning_lines() {
        let source = "<</Lines\n<<\n/WritingDirection 0\n/Children [ ]\n>>>>";
        let value = parse(source).unwrap();
        let lines = value.get("Lines").unwrap();
        assert_eq!(
            lines.get("WritingDirection"),
            Some(&PsValue::Integer(0))
        );
        assert_eq!(lines.get("Children"), Some(&PsValue::Array(vec![])));
    }

    #[test]
    fn multiline_text() {
        let source = "<</Key1 10 /Text (00Line 1\nLine 2\nLine 3\n)>>";
        let value = parse(source).unwrap();
        assert_eq!(value.get("Key1"), Some(&PsValue::Integer(10)));
        assert_eq!(
            value.get("Text").and_then(PsValue::as_str),
            Some("00Line 1\nLine 2\nLine 3\n")
        );
    }

    #[test]
    fn escaped_paren_stays_in_text() {
        let value = parse(r"(a\)b)").unwrap();
        // the backslash itself is kept, only the close check is skipped
        assert_eq!(value, PsValue::Text(String::from("a\\)b")));
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let value = EngineDataParser::new(b"(\xFE\xFFhi)").parse().unwrap();
        assert_eq!(value, PsValue::Text(String::from("hi")));
    }

    #[test]
    fn unbalanced_input_is_structural() {
        assert!(matches!(
            parse("[1 2"),
            Err(EngineParseError::UnexpectedEnd)
        ));
        assert!(matches!(
            parse("<</Key 10"),
            Err(EngineParseError::UnexpectedEnd)
        ));
    }

    #[test]
    fn stray_token_is_a_syntax_error() {
        assert!(matches!(
            parse("[1 xyz]"),
            Err(EngineParseError::BadSyntax(1))
        ));
    }

    #[test]
    fn path_navigation() {
        let value = parse("<</A <</B <</C 7>>>>>>").unwrap();
        assert_eq!(
            value.get_path(&["A", "B", "C"]).and_then(PsValue::as_i64),
            Some(7)
        );
        assert_eq!(value.get_path(&["A", "missing"]), None);
    }
}

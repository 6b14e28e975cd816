use std::borrow::Cow;

use super::header::ParseMode;
use super::tags::{self, TagRole};
use crate::errors::{OfxError, OfxResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<NAME>` followed by another tag.
    Open(String),
    /// `<NAME>value`. `closed` is set when a matching `</NAME>` followed the value.
    Leaf { name: String, value: String, closed: bool },
    /// `</NAME>` that did not close a leaf value.
    Close(String),
    /// Text outside any value position.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    /// Byte offset of the token start in the full input.
    pub offset: usize,
}

/// Splits the body into tokens. Tag names are upper-cased and entity
/// references in values are decoded.
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    mode: ParseMode,
}

impl<'a> Tokenizer<'a> {
    /// `src` is the whole input; scanning starts at `start`, so offsets in
    /// tokens and errors refer to the original content.
    pub fn new(src: &'a str, start: usize, mode: ParseMode) -> Self {
        Self { src, pos: start, mode }
    }

    pub fn tokenize(mut self) -> OfxResult<Vec<SpannedToken>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        tracing::trace!(count = tokens.len(), "tokenized OFX body");
        Ok(tokens)
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.src.len() && self.bytes()[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> OfxResult<Option<SpannedToken>> {
        loop {
            self.skip_whitespace();
            if self.pos >= self.src.len() {
                return Ok(None);
            }

            let src = self.src;
            let start = self.pos;
            let rest = &src[start..];

            if !rest.starts_with('<') {
                let end = rest.find('<').map(|i| start + i).unwrap_or(src.len());
                self.pos = end;
                let text = decode_entities(src[start..end].trim()).into_owned();
                return Ok(Some(SpannedToken { token: Token::Text(text), offset: start }));
            }

            if rest.starts_with("<!--") {
                self.skip_past(start, "-->", "unterminated comment")?;
                continue;
            }
            if rest.starts_with("<?") || rest.starts_with("<!") {
                self.skip_past(start, ">", "unterminated markup declaration")?;
                continue;
            }

            let is_close = rest.starts_with("</");
            let name_start = start + if is_close { 2 } else { 1 };
            let (raw_name, after) = self.read_tag_name(start, name_start)?;
            self.pos = after;

            if is_close {
                let name = validate_name(src, start, raw_name)?;
                return Ok(Some(SpannedToken { token: Token::Close(name), offset: start }));
            }

            if let Some(name) = raw_name.trim_end().strip_suffix('/') {
                let name = validate_name(src, start, name)?;
                let token = Token::Leaf { name, value: String::new(), closed: true };
                return Ok(Some(SpannedToken { token, offset: start }));
            }

            let name = validate_name(src, start, raw_name)?;
            let token = self.read_value(name);
            return Ok(Some(SpannedToken { token, offset: start }));
        }
    }

    fn skip_past(&mut self, start: usize, terminator: &str, message: &str) -> OfxResult<()> {
        match self.src[start..].find(terminator) {
            Some(i) => {
                self.pos = start + i + terminator.len();
                Ok(())
            }
            None => Err(OfxError::malformed_at(self.src, start, message)),
        }
    }

    /// Returns the text between the tag opener and `>`, and the offset just past `>`.
    fn read_tag_name(&self, tag_start: usize, name_start: usize) -> OfxResult<(&'a str, usize)> {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut i = name_start;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => return Ok((&src[name_start..i], i + 1)),
                b'<' => return Err(OfxError::malformed_at(src, tag_start, "unterminated tag")),
                _ => i += 1,
            }
        }
        Err(OfxError::malformed_at(src, tag_start, "unterminated tag at end of input"))
    }

    /// Reads the inline value after an opening tag. Without a value the tag is
    /// reported as `Open`; whether it is a container or an empty leaf is left
    /// to the tree builder.
    fn read_value(&mut self, name: String) -> Token {
        let src = self.src;
        let start = self.pos;
        let rest = &src[start..];
        let stop = match self.mode {
            ParseMode::Sgml => rest.find(['<', '\r', '\n']),
            ParseMode::Xml => rest.find('<'),
        };
        let end = stop.map(|i| start + i).unwrap_or(src.len());
        let (raw, end) = match src[start..end].trim() {
            "" if self.mode == ParseMode::Sgml && tags::role(&name) == Some(TagRole::Leaf) => {
                self.next_line_value(end)
            }
            raw => (raw, end),
        };
        if raw.is_empty() {
            return Token::Open(name);
        }

        self.pos = end;
        let closed = self.consume_matching_close(end, &name);
        Token::Leaf {
            name,
            value: decode_entities(raw).into_owned(),
            closed,
        }
    }

    /// Some SGML exports put a leaf's value on the line after its tag.
    fn next_line_value(&self, from: usize) -> (&'a str, usize) {
        let src = self.src;
        let rest = &src[from..];
        let start = from + (rest.len() - rest.trim_start().len());
        let line = &src[start..];
        let end = start + line.find(['<', '\r', '\n']).unwrap_or(line.len());
        (src[start..end].trim(), end)
    }

    /// Consumes `</NAME>` if it is the next construct after `from`.
    fn consume_matching_close(&mut self, from: usize, name: &str) -> bool {
        let src = self.src;
        let rest = &src[from..];
        let trimmed = rest.trim_start();
        let at = from + (rest.len() - trimmed.len());

        let Some(inner) = trimmed.strip_prefix("</") else {
            return false;
        };
        let Some(gt) = inner.find('>') else {
            return false;
        };
        if inner[..gt].contains('<') || !inner[..gt].trim().eq_ignore_ascii_case(name) {
            return false;
        }

        self.pos = at + 2 + gt + 1;
        true
    }
}

fn validate_name(src: &str, tag_start: usize, raw: &str) -> OfxResult<String> {
    // attributes are tolerated and dropped: `<OFX xmlns="...">`
    let name = raw.split_whitespace().next().unwrap_or("");
    if name.is_empty() {
        return Err(OfxError::malformed_at(src, tag_start, "empty tag name"));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':'))) {
        return Err(OfxError::malformed_at(src, tag_start, format!("invalid character '{bad}' in tag name")));
    }
    Ok(name.to_ascii_uppercase())
}

/// Decodes the predefined SGML/XML entities and numeric character references.
/// Unknown references are left untouched.
pub fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate.find(';').and_then(|semi| {
            let entity = &candidate[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

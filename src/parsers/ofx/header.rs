//! OFX preamble: colon-delimited pseudo-headers (1.x) or XML processing
//! instructions (2.x).

use std::fmt;
use std::str::FromStr;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};

use crate::errors::{OfxError, OfxResult, TagPath, WarningKind, Warnings};

/// Tag syntax the body is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// OFX 1.x: leaf elements are never closed.
    Sgml,
    /// OFX 2.x: every element is closed.
    Xml,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfxVersion {
    #[default]
    V102,
    V103,
    V151,
    V160,
    V200,
    V211,
    V220,
}

impl OfxVersion {
    const ALL: [OfxVersion; 7] = [
        OfxVersion::V102,
        OfxVersion::V103,
        OfxVersion::V151,
        OfxVersion::V160,
        OfxVersion::V200,
        OfxVersion::V211,
        OfxVersion::V220,
    ];

    pub fn mode(self) -> ParseMode {
        match self {
            OfxVersion::V102 | OfxVersion::V103 | OfxVersion::V151 | OfxVersion::V160 => ParseMode::Sgml,
            OfxVersion::V200 | OfxVersion::V211 | OfxVersion::V220 => ParseMode::Xml,
        }
    }

    /// Value of the `VERSION` header, e.g. `102`.
    pub fn header_code(self) -> &'static str {
        match self {
            OfxVersion::V102 => "102",
            OfxVersion::V103 => "103",
            OfxVersion::V151 => "151",
            OfxVersion::V160 => "160",
            OfxVersion::V200 => "200",
            OfxVersion::V211 => "211",
            OfxVersion::V220 => "220",
        }
    }

    pub fn from_header_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|v| v.header_code() == code)
    }
}

impl FromStr for OfxVersion {
    type Err = OfxError;

    /// Accepts dotted (`1.0.2`, `2.2`) and header (`102`, `220`) spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut digits: String = s.trim().chars().filter(|c| *c != '.').collect();
        if digits.len() == 2 {
            digits.push('0');
        }
        Self::from_header_code(&digits)
            .ok_or_else(|| OfxError::UnsupportedFeature(format!("OFX version {s}")))
    }
}

impl fmt::Display for OfxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.header_code().as_bytes();
        write!(f, "{}.{}.{}", code[0] as char, code[1] as char, code[2] as char)
    }
}

/// What the preamble declared, after encoding resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfxHeader {
    /// Raw `VERSION` value, e.g. `102` or `220`.
    pub version: Option<String>,
    pub mode: ParseMode,
    pub encoding: &'static Encoding,
}

impl OfxHeader {
    pub fn known_version(&self) -> Option<OfxVersion> {
        self.version.as_deref().and_then(OfxVersion::from_header_code)
    }
}

#[derive(Debug)]
pub(crate) struct HeaderReading {
    pub(crate) header: OfxHeader,
    /// Byte offset at which the tag body starts.
    pub(crate) body_offset: usize,
    pub(crate) warnings: Warnings,
}

#[derive(Debug, Default)]
struct Declared {
    version: Option<String>,
    security: Option<String>,
    compression: Option<String>,
    sgml_encoding: Option<String>,
    charset: Option<String>,
    xml_encoding: Option<String>,
}

/// Reads the preamble. `fallback` is used when neither the hint nor the
/// header names an encoding this crate recognizes.
pub(crate) fn read_header(
    content: &str,
    encoding_hint: Option<&str>,
    fallback: &'static Encoding,
) -> OfxResult<HeaderReading> {
    let mut warnings = Warnings::default();
    let start = content.len() - content.trim_start_matches(['\u{feff}', ' ', '\t', '\r', '\n']).len();
    let rest = &content[start..];

    let (mode, declared, body_offset) = if starts_with_ignore_case(rest, "<?xml") || starts_with_ignore_case(rest, "<?ofx")
    {
        let (declared, body_offset) = read_processing_instructions(content, start, &mut warnings)?;
        (ParseMode::Xml, declared, body_offset)
    } else if rest.starts_with('<') {
        warnings.push(WarningKind::MissingHeader, TagPath::root(), "no OFX header before body");
        (ParseMode::Sgml, Declared::default(), start)
    } else {
        let (declared, body_offset) = read_colon_headers(content, start, &mut warnings);
        (ParseMode::Sgml, declared, body_offset)
    };

    if let Some(security) = declared.security.as_deref() {
        if !security.eq_ignore_ascii_case("NONE") {
            return Err(OfxError::UnsupportedFeature(format!("SECURITY:{security}")));
        }
    }
    if let Some(compression) = declared.compression.as_deref() {
        if !compression.is_empty() && !compression.eq_ignore_ascii_case("NONE") {
            return Err(OfxError::UnsupportedFeature(format!("COMPRESSION:{compression}")));
        }
    }

    let encoding = resolve_encoding(encoding_hint, &declared, mode, &mut warnings).unwrap_or(fallback);

    tracing::debug!(?mode, version = ?declared.version, encoding = encoding.name(), body_offset, "read OFX header");

    Ok(HeaderReading {
        header: OfxHeader {
            version: declared.version,
            mode,
            encoding,
        },
        body_offset,
        warnings,
    })
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn read_processing_instructions(
    content: &str,
    mut pos: usize,
    warnings: &mut Warnings,
) -> OfxResult<(Declared, usize)> {
    let mut declared = Declared::default();
    let mut saw_ofx = false;

    loop {
        pos = content.len() - content[pos..].trim_start().len();
        if !content[pos..].starts_with("<?") {
            break;
        }
        let end = content[pos..]
            .find("?>")
            .map(|i| pos + i)
            .ok_or_else(|| OfxError::malformed_at(content, pos, "unterminated processing instruction"))?;

        let inner = &content[pos + 2..end];
        let (target, attributes) = inner.trim().split_once(char::is_whitespace).unwrap_or((inner.trim(), ""));

        match target.to_ascii_uppercase().as_str() {
            "XML" => {
                for (key, value) in parse_attributes(attributes, warnings) {
                    if key == "ENCODING" {
                        declared.xml_encoding = Some(value);
                    }
                }
            }
            "OFX" => {
                saw_ofx = true;
                for (key, value) in parse_attributes(attributes, warnings) {
                    match key.as_str() {
                        "VERSION" => declared.version = Some(value),
                        "SECURITY" => declared.security = Some(value),
                        _ => {}
                    }
                }
            }
            other => warnings.push(
                WarningKind::MalformedHeader,
                TagPath::root(),
                format!("ignored processing instruction '{other}'"),
            ),
        }
        pos = end + 2;
    }

    if !saw_ofx {
        warnings.push(WarningKind::MissingHeader, TagPath::root(), "no <?OFX ...?> processing instruction");
    }

    Ok((declared, pos))
}

/// Parses `KEY="value"` pairs. Keys are upper-cased.
fn parse_attributes(s: &str, warnings: &mut Warnings) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = s.trim_start();

    while !rest.is_empty() {
        let Some((key, after_key)) = rest.split_once('=') else {
            warnings.push(WarningKind::MalformedHeader, TagPath::root(), format!("attribute without value: '{rest}'"));
            break;
        };
        let after_key = after_key.trim_start();
        let Some(quote) = after_key.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            warnings.push(WarningKind::MalformedHeader, TagPath::root(), format!("unquoted attribute '{}'", key.trim()));
            break;
        };
        let Some(close) = after_key[1..].find(quote) else {
            warnings.push(WarningKind::MalformedHeader, TagPath::root(), format!("unterminated attribute '{}'", key.trim()));
            break;
        };

        attributes.push((key.trim().to_ascii_uppercase(), after_key[1..1 + close].to_string()));
        rest = after_key[close + 2..].trim_start();
    }

    attributes
}

fn read_colon_headers(content: &str, start: usize, warnings: &mut Warnings) -> (Declared, usize) {
    let mut declared = Declared::default();
    let mut pos = start;

    while pos < content.len() {
        let line_end = content[pos..].find('\n').map(|i| pos + i + 1).unwrap_or(content.len());
        let line = content[pos..line_end].trim();

        if line.is_empty() {
            pos = line_end;
            break;
        }
        if line.starts_with('<') {
            // blank separator line missing
            pos += content[pos..].find('<').unwrap_or(0);
            break;
        }

        match line.split_once(':') {
            Some((key, value)) => {
                let value = value.trim().to_string();
                match key.trim().to_ascii_uppercase().as_str() {
                    "VERSION" => declared.version = Some(value),
                    "SECURITY" => declared.security = Some(value),
                    "COMPRESSION" => declared.compression = Some(value),
                    "ENCODING" => declared.sgml_encoding = Some(value),
                    "CHARSET" => declared.charset = Some(value),
                    _ => {}
                }
            }
            None => warnings.push(
                WarningKind::MalformedHeader,
                TagPath::root(),
                format!("header line without ':' separator: '{line}'"),
            ),
        }
        pos = line_end;
    }

    (declared, pos)
}

fn resolve_encoding(
    hint: Option<&str>,
    declared: &Declared,
    mode: ParseMode,
    warnings: &mut Warnings,
) -> Option<&'static Encoding> {
    if let Some(hint) = hint {
        match Encoding::for_label(hint.trim().as_bytes()) {
            Some(encoding) => return Some(encoding),
            None => warnings.push(
                WarningKind::UnrecognizedEncoding,
                TagPath::root(),
                format!("unrecognized encoding hint '{hint}'"),
            ),
        }
    }

    // `None` when nothing usable is declared; the caller's fallback applies.
    let resolved = match mode {
        ParseMode::Xml => declared
            .xml_encoding
            .as_deref()
            .map(|label| Encoding::for_label(label.trim().as_bytes()).ok_or(label)),
        ParseMode::Sgml => match (declared.sgml_encoding.as_deref(), declared.charset.as_deref()) {
            (Some(enc), _) if enc.eq_ignore_ascii_case("UTF-8") || enc.eq_ignore_ascii_case("UNICODE") => {
                Some(Ok(UTF_8))
            }
            (_, Some(charset)) => Some(charset_encoding(charset).ok_or(charset)),
            (Some(enc), None) if enc.eq_ignore_ascii_case("USASCII") => None,
            (Some(enc), None) => Some(Encoding::for_label(enc.as_bytes()).ok_or(enc)),
            (None, None) => None,
        },
    };

    match resolved? {
        Ok(encoding) => Some(encoding),
        Err(label) => {
            warnings.push(
                WarningKind::UnrecognizedEncoding,
                TagPath::root(),
                format!("unrecognized encoding '{label}', using fallback"),
            );
            None
        }
    }
}

/// Maps an OFX 1.x `CHARSET` value.
fn charset_encoding(charset: &str) -> Option<&'static Encoding> {
    let charset = charset.trim();
    if charset.eq_ignore_ascii_case("NONE") {
        return Some(UTF_8);
    }
    if charset == "1252" {
        return Some(WINDOWS_1252);
    }
    Encoding::for_label(charset.as_bytes())
        .or_else(|| Encoding::for_label(format!("windows-{charset}").as_bytes()))
        .or_else(|| Encoding::for_label(format!("iso-{charset}").as_bytes()))
}

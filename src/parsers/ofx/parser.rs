use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use super::header::read_header;
use super::mapper::Mapper;
use super::tokenizer::Tokenizer;
use super::tree::TreeBuilder;
use crate::builder::{ParseOptions, ParsedStatements};
use crate::errors::{OfxResult, TagPath, WarningKind, Warnings};
use crate::parsers::traits::Parser;

pub struct OfxParser;

impl Parser for OfxParser {
    type Output = ParsedStatements;

    fn is_supported(filename: Option<&str>, content: &str) -> bool {
        if let Some(name) = filename {
            let ext = name.to_lowercase();
            if ext.ends_with(".qfx") || ext.ends_with(".ofx") {
                return true;
            }
        }

        let head = content.trim_start();
        let upper = head.get(..4096).unwrap_or(head).to_ascii_uppercase();
        upper.contains("<OFX>") || upper.contains("OFXHEADER") || upper.contains("DATA:OFXSGML")
    }

    fn parse(content: &str, options: &ParseOptions) -> OfxResult<ParsedStatements> {
        parse_text(content, options, UTF_8, Warnings::default())
    }
}

impl OfxParser {
    /// Parses raw bytes, decoding them with the hinted or declared encoding.
    ///
    /// When neither names a usable encoding, valid UTF-8 is read as UTF-8 and
    /// anything else as Windows-1252.
    pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> OfxResult<ParsedStatements> {
        let (preview, fallback): (Cow<'_, str>, &'static Encoding) = match std::str::from_utf8(bytes) {
            Ok(text) => (Cow::Borrowed(text), UTF_8),
            Err(_) => (String::from_utf8_lossy(bytes), WINDOWS_1252),
        };

        // Header keys and values are ASCII, so a lossy preview is enough to
        // find the declared encoding.
        let reading = read_header(&preview, options.encoding_hint.as_deref(), fallback)?;
        let encoding = reading.header.encoding;

        let (decoded, _, had_errors) = encoding.decode(bytes);
        let mut warnings = Warnings::default();
        if had_errors {
            warnings.push(
                WarningKind::UnrecognizedEncoding,
                TagPath::root(),
                format!("input is not valid {}, bad sequences were replaced", encoding.name()),
            );
        }
        tracing::debug!(encoding = encoding.name(), bytes = bytes.len(), "decoded input");

        parse_text(&decoded, options, encoding, warnings)
    }
}

fn parse_text(
    content: &str,
    options: &ParseOptions,
    fallback: &'static Encoding,
    mut warnings: Warnings,
) -> OfxResult<ParsedStatements> {
    let reading = read_header(content, options.encoding_hint.as_deref(), fallback)?;
    let header = reading.header;
    warnings.extend(reading.warnings);

    let tokens = Tokenizer::new(content, reading.body_offset, header.mode).tokenize()?;

    let (root, tree_warnings) = TreeBuilder::new(header.mode).build(content, tokens)?;
    warnings.extend(tree_warnings);

    let (statements, map_warnings) = Mapper::new(options).map(&root)?;
    warnings.extend(map_warnings);

    let warnings = warnings.into_inner();
    if options.strict {
        if let Some(fatal) = warnings.iter().find(|w| w.kind.is_fatal_when_strict()) {
            return Err(fatal.clone().into());
        }
    }

    Ok(ParsedStatements {
        header,
        statements,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OfxError;
    use crate::parsers::ofx::header::ParseMode;
    use rstest::rstest;

    const SGML: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102
SECURITY:NONE
ENCODING:USASCII
CHARSET:1252
COMPRESSION:NONE
OLDFILEUID:NONE
NEWFILEUID:NONE

<OFX>
<BANKMSGSRSV1><STMTTRNRS><TRNUID>1<STMTRS><CURDEF>USD
<BANKACCTFROM><BANKID>1<ACCTID>2<ACCTTYPE>CHECKING</BANKACCTFROM>
<BANKTRANLIST>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20250105<TRNAMT>-1.00<FITID>X<NAME>Caf\u{e9}
</BANKTRANLIST>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>
";

    #[rstest]
    #[case(Some("statement.QFX"), "", true)]
    #[case(Some("statement.ofx"), "", true)]
    #[case(None, "OFXHEADER:100\nDATA:OFXSGML", true)]
    #[case(None, "<?xml version=\"1.0\"?><ofx>", true)]
    #[case(Some("data.csv"), "date,amount", false)]
    fn test_is_supported(#[case] filename: Option<&str>, #[case] content: &str, #[case] expected: bool) {
        assert_eq!(OfxParser::is_supported(filename, content), expected);
    }

    #[test]
    fn test_parse_sgml_document() {
        let parsed = OfxParser::parse(SGML, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.header.mode, ParseMode::Sgml);
        assert_eq!(parsed.header.version.as_deref(), Some("102"));
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].transactions[0].name.as_deref(), Some("Café"));
    }

    #[test]
    fn test_parse_bytes_decodes_declared_charset() {
        let (bytes, _, _) = WINDOWS_1252.encode(SGML);
        assert!(std::str::from_utf8(&bytes).is_err());

        let parsed = OfxParser::parse_bytes(&bytes, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.header.encoding, WINDOWS_1252);
        assert_eq!(parsed.statements[0].transactions[0].name.as_deref(), Some("Café"));
    }

    #[test]
    fn test_strict_mode_rejects_recoverable_structure_issue() {
        let body = "<?xml version=\"1.0\"?><?OFX OFXHEADER=\"200\" VERSION=\"220\"?>
<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD</CURDEF>
<BANKACCTFROM><ACCTID>2</ACCTID><ACCTTYPE>CHECKING</ACCTTYPE></BANKACCTFROM>
<BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT</TRNTYPE><DTPOSTED>20250105</DTPOSTED><TRNAMT>-1.00<FITID>X</FITID></STMTTRN></BANKTRANLIST>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";

        let lenient = OfxParser::parse(body, &ParseOptions::default()).unwrap();
        assert_eq!(lenient.warnings.len(), 1);
        assert_eq!(lenient.warnings[0].kind, WarningKind::UnclosedTag);

        let strict = ParseOptions {
            strict: true,
            ..ParseOptions::default()
        };
        let err = OfxParser::parse(body, &strict).unwrap_err();
        assert!(matches!(err, OfxError::MalformedInput { path: Some(_), .. }));
    }
}

use chrono::{DateTime, FixedOffset, Offset, Utc};
use encoding_rs::{Encoding, UTF_8};

use crate::errors::{OfxError, OfxResult, ParseWarning};
use crate::parsers::prelude::*;
use crate::types::StatementResponse;

/// Knobs for a single parse call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Encoding label that wins over whatever the header declares.
    pub encoding_hint: Option<String>,
    /// Turn structural warnings and missing required fields into errors.
    pub strict: bool,
    /// Currency used when `CURDEF` is absent or invalid.
    pub fallback_currency: String,
    /// Offset applied to dates that carry no zone.
    pub fallback_offset: FixedOffset,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            encoding_hint: None,
            strict: false,
            fallback_currency: "USD".to_string(),
            fallback_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    pub version: OfxVersion,
    /// Target encoding for `serialize_bytes`, also declared in the header.
    pub encoding: &'static Encoding,
    /// `DTSERVER` value. Defaults to the latest date found in the data.
    pub server_time: Option<DateTime<FixedOffset>>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            version: OfxVersion::default(),
            encoding: UTF_8,
            server_time: None,
        }
    }
}

/// Result of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedStatements {
    pub header: OfxHeader,
    pub statements: Vec<StatementResponse>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone)]
enum Input {
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Default)]
pub struct ParserBuilder {
    input: Option<Input>,
    options: ParseOptions,
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: &str) -> Self {
        self.input = Some(Input::Text(content.to_string()));
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.input = Some(Input::Bytes(bytes.to_vec()));
        self
    }

    pub fn encoding_hint(mut self, label: &str) -> Self {
        self.options.encoding_hint = Some(label.to_string());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn fallback_currency(mut self, currency: &str) -> Self {
        self.options.fallback_currency = currency.to_string();
        self
    }

    pub fn fallback_offset(mut self, offset: FixedOffset) -> Self {
        self.options.fallback_offset = offset;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(self) -> OfxResult<ParsedStatements> {
        match self.input {
            Some(Input::Text(content)) => OfxParser::parse(&content, &self.options),
            Some(Input::Bytes(bytes)) => OfxParser::parse_bytes(&bytes, &self.options),
            None => Err(OfxError::MissingContent),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SerializerBuilder {
    options: SerializeOptions,
}

impl SerializerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: OfxVersion) -> Self {
        self.options.version = version;
        self
    }

    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    pub fn server_time(mut self, time: DateTime<FixedOffset>) -> Self {
        self.options.server_time = Some(time);
        self
    }

    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    pub fn serialize(&self, statements: &[StatementResponse]) -> String {
        OfxWriter::write(statements, &self.options)
    }

    pub fn serialize_bytes(&self, statements: &[StatementResponse]) -> Vec<u8> {
        OfxWriter::write_bytes(statements, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WarningKind;
    use chrono::TimeZone;
    use encoding_rs::WINDOWS_1252;
    use rstest::rstest;

    const SAMPLE_OFX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<?OFX OFXHEADER="200" VERSION="220" SECURITY="NONE"?>
<OFX>
    <BANKMSGSRSV1>
        <STMTTRNRS>
            <STMTRS>
                <CURDEF>USD</CURDEF>
                <BANKACCTFROM>
                    <BANKID>021000021</BANKID>
                    <ACCTID>1234</ACCTID>
                    <ACCTTYPE>CHECKING</ACCTTYPE>
                </BANKACCTFROM>
                <BANKTRANLIST>
                    <STMTTRN>
                        <TRNTYPE>DEBIT</TRNTYPE>
                        <DTPOSTED>20251226120000</DTPOSTED>
                        <TRNAMT>-50.00</TRNAMT>
                        <FITID>202512260</FITID>
                        <NAME>Coffee Shop</NAME>
                        <MEMO>Morning coffee</MEMO>
                    </STMTTRN>
                </BANKTRANLIST>
            </STMTRS>
        </STMTTRNRS>
    </BANKMSGSRSV1>
</OFX>"#;

    #[test]
    fn test_builder_missing_content() {
        let result = ParserBuilder::new().parse();
        assert!(matches!(result, Err(OfxError::MissingContent)));
    }

    #[test]
    fn test_builder_default_options() {
        let builder = ParserBuilder::default();
        assert!(builder.input.is_none());
        assert_eq!(builder.options(), &ParseOptions::default());
        assert_eq!(builder.options().fallback_currency, "USD");
        assert!(!builder.options().strict);
    }

    #[test]
    fn test_builder_chaining() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let builder = ParserBuilder::new()
            .content("content")
            .encoding_hint("windows-1252")
            .strict(true)
            .fallback_currency("EUR")
            .fallback_offset(offset);

        let options = builder.options();
        assert_eq!(options.encoding_hint.as_deref(), Some("windows-1252"));
        assert!(options.strict);
        assert_eq!(options.fallback_currency, "EUR");
        assert_eq!(options.fallback_offset, offset);
    }

    #[rstest]
    #[case::text(ParserBuilder::new().content(SAMPLE_OFX))]
    #[case::bytes(ParserBuilder::new().bytes(SAMPLE_OFX.as_bytes()))]
    fn test_parse_from_either_input(#[case] builder: ParserBuilder) {
        let parsed = builder.parse().unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(parsed.header.known_version(), Some(OfxVersion::V220));

        let txn = &parsed.statements[0].transactions[0];
        assert_eq!(txn.fitid, "202512260");
        assert_eq!(txn.name.as_deref(), Some("Coffee Shop"));
    }

    #[test]
    fn test_fallback_offset_applies_to_zoneless_dates() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let parsed = ParserBuilder::new()
            .content(SAMPLE_OFX)
            .fallback_offset(offset)
            .parse()
            .unwrap();
        let posted = parsed.statements[0].transactions[0].posted.unwrap();
        assert_eq!(posted.offset(), &offset);
    }

    #[test]
    fn test_unrecognized_hint_is_a_warning() {
        let parsed = ParserBuilder::new()
            .content(SAMPLE_OFX)
            .encoding_hint("klingon")
            .parse()
            .unwrap();
        assert_eq!(parsed.warnings[0].kind, WarningKind::UnrecognizedEncoding);
    }

    #[test]
    fn test_serializer_builder() {
        let time = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 1, 8, 30, 0)
            .unwrap();
        let serializer = SerializerBuilder::new()
            .version(OfxVersion::V211)
            .encoding(WINDOWS_1252)
            .server_time(time);
        assert_eq!(serializer.options().version, OfxVersion::V211);

        let statements = ParserBuilder::new().content(SAMPLE_OFX).parse().unwrap().statements;
        let text = serializer.serialize(&statements);
        assert!(text.contains("VERSION=\"211\""));
        assert!(text.contains("encoding=\"windows-1252\""));
        assert!(text.contains("<DTSERVER>20250601083000[0:GMT]</DTSERVER>"));
        assert_eq!(serializer.serialize_bytes(&statements), text.into_bytes());
    }
}

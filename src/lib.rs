//! Tolerant reader and writer for OFX bank, credit card and investment
//! statements, covering SGML OFX 1.x and XML OFX 2.x.
//!
//! Recoverable problems in the input become [`ParseWarning`]s next to the
//! parsed statements instead of aborting the call.
//!
//! ```rust,ignore
//! use ofx_statement_rs::{ParserBuilder, SerializerBuilder, OfxVersion};
//!
//! let parsed = ParserBuilder::new()
//!     .content(&file_content)
//!     .parse()?;
//!
//! for warning in &parsed.warnings {
//!     eprintln!("{warning}");
//! }
//!
//! let ofx2 = SerializerBuilder::new()
//!     .version(OfxVersion::V220)
//!     .serialize(&parsed.statements);
//! ```

mod builder;
mod types;

pub mod errors;
pub mod parsers;

pub use builder::{ParseOptions, ParsedStatements, ParserBuilder, SerializeOptions, SerializerBuilder};
pub use errors::{OfxError, OfxResult, ParseWarning, Position, TagPath, WarningKind};
pub use parsers::prelude::*;
pub use types::{
    AccountDescriptor, AccountType, Balance, FinancialInstitution, StatementResponse, Transaction,
    TransactionType, TRANSACTION_TYPE_CODES,
};

/// Parses already-decoded OFX text.
pub fn parse(content: &str, options: &ParseOptions) -> OfxResult<ParsedStatements> {
    OfxParser::parse(content, options)
}

/// Parses raw bytes, picking the encoding from the hint, the header, or the content.
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> OfxResult<ParsedStatements> {
    OfxParser::parse_bytes(bytes, options)
}

pub fn serialize(statements: &[StatementResponse], options: &SerializeOptions) -> String {
    OfxWriter::write(statements, options)
}

pub fn serialize_bytes(statements: &[StatementResponse], options: &SerializeOptions) -> Vec<u8> {
    OfxWriter::write_bytes(statements, options)
}

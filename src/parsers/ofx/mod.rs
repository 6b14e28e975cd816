//! OFX 1.x (SGML) and 2.x (XML) reading and writing.

pub mod header;
mod mapper;
pub mod parser;
pub mod tags;
pub mod tokenizer;
pub mod tree;
pub mod types;
pub mod writer;

pub mod prelude {
    pub use super::header::{OfxHeader, OfxVersion, ParseMode};
    pub use super::parser::OfxParser;
    pub use super::tree::Node;
    pub use super::types::{OfxAmount, OfxDate};
    pub use super::writer::OfxWriter;
}

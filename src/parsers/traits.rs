use crate::builder::{ParseOptions, SerializeOptions};
use crate::errors::OfxResult;

pub trait Parser {
    type Output;

    fn parse(content: &str, options: &ParseOptions) -> OfxResult<Self::Output>;

    fn is_supported(filename: Option<&str>, content: &str) -> bool;
}

pub trait Writer {
    type Input: ?Sized;

    fn write(input: &Self::Input, options: &SerializeOptions) -> String;
}

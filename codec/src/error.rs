//! Error types for deserialization

use crate::template::DataType;
use thiserror::Error;

/// Error type for deserialization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),
    #[error("schema mismatch: expected {0}, found {1}")]
    SchemaMismatch(DataType, DataType), // expected, found
    #[error("schema exhausted")]
    SchemaExhausted,
    #[error("dynamic count required for field: {0}")]
    DynamicCountRequired(String),
    #[error("field has no pending dynamic count: {0}")]
    NotDynamic(String),
    #[error("field is empty: {0}")]
    EmptyField(String),
    #[error("field is not empty: {0}")]
    NotEmpty(String),
    #[error("field cannot hold a string: {0}")]
    NotString(String),
    #[error("no message template bound")]
    NoTemplate,
    #[error("cannot skip while bound to a message template")]
    SkipWithTemplate,
    #[error("invalid length: {0}")]
    InvalidLength(usize),
    #[error("invalid template: {0}")]
    InvalidTemplate(String),
}

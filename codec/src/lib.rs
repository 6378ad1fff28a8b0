//! Deserialize bit-packed messages received from untrusted peers.
//!
//! # Overview
//!
//! Messages are read from a borrowed byte buffer through a bit cursor. Values are not aligned:
//! a 1-bit flag can be followed by a 16-bit integer that straddles three bytes. Bits are
//! consumed least-significant first within each byte and multi-byte values are little-endian.
//!
//! Two modes are supported:
//! - Free-form: the caller knows the layout and reads values in order.
//! - Template-driven: a [MessageTemplate] describes every field (type, fixed or dynamic count,
//!   nesting), and every typed read is checked against the field the template expects next.
//!
//! # Supported Types
//!
//! - Primitives: `bool` (1 bit), `u8`, `i8`, `u16`, `i16`, `u32`, `i32`, `u64`, `i64`, `f32`,
//!   `f64`
//! - Raw bit fields of 1 to 32 bits
//! - Three-tier variable-length integers ([vle])
//! - Arrays of primitives, with fixed or dynamic counts
//! - Length-prefixed ASCII strings, sanitized on read ([string])
//!
//! # Safety
//!
//! Input is assumed hostile. Every read returns a [Result]: running out of bits yields
//! [Error::EndOfBuffer] without consuming anything, and a read that disagrees with the template
//! yields [Error::SchemaMismatch]. No input can cause a read outside the buffer.
//!
//! # Example
//!
//! ```
//! use bitwire_codec::{Count, DataType, Deserializer, MessageTemplate};
//!
//! let mut template = MessageTemplate::new(1, "Chat");
//! template.add_field(None, "channel", DataType::U8, Count::Fixed(1)).unwrap();
//! template.add_field(None, "text", DataType::S8, Count::Dynamic { bits: 8 }).unwrap();
//!
//! let data = [3, 2, b'h', b'i'];
//! let mut deserializer = Deserializer::with_template(&data, &template);
//! assert_eq!(deserializer.read::<u8>().unwrap(), 3);
//! assert_eq!(deserializer.read_string().unwrap(), "hi");
//! assert!(deserializer.is_complete());
//! ```

pub mod config;
pub mod cursor;
pub mod deserializer;
pub mod error;
pub mod primitives;
pub mod string;
pub mod template;
pub mod vle;
pub mod walker;

#[cfg(test)]
mod testing;

// Re-export main types and traits
pub use config::{Config, RangeCfg};
pub use cursor::Cursor;
pub use deserializer::Deserializer;
pub use error::Error;
pub use primitives::Primitive;
pub use template::{Count, DataType, FieldDesc, FieldId, FieldKind, MessageTemplate};
pub use vle::{Vle, Vle16_32, Vle8_16, Vle8_16_32, Vle8_32, VleFormat, VLE_READ_ERROR};
pub use walker::Walker;

//! Typed reads over a bit-packed message buffer.
//!
//! A [Deserializer] reads one message. Without a template, the caller knows the layout and
//! reads values in order. With a template, every typed read is checked against the field the
//! template expects next, and dynamic counts are read from the stream as the template dictates.
//!
//! Every read either produces a value or returns an [Error]. A read that fails because the
//! stream is exhausted consumes nothing, so the caller can inspect the position afterwards.

use crate::{
    config::Config,
    cursor::Cursor,
    primitives::Primitive,
    string,
    template::{DataType, MessageTemplate},
    vle::{self, VleFormat},
    walker::Walker,
    Error,
};
use tracing::{debug, warn};

/// Reads typed values from a borrowed buffer, optionally guided by a [MessageTemplate].
///
/// # Example
///
/// ```
/// use bitwire_codec::{vle::Vle8_16, Deserializer};
///
/// let data = [0b1011_0010, 0x2A, 0x00, 0x05];
/// let mut deserializer = Deserializer::new(&data);
/// assert_eq!(deserializer.read_bits(3).unwrap(), 2);
/// assert_eq!(deserializer.read_bits(5).unwrap(), 22);
/// assert_eq!(deserializer.read::<u16>().unwrap(), 42);
/// assert_eq!(deserializer.read_vle::<Vle8_16>().unwrap(), 5);
/// assert_eq!(deserializer.bytes_left(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct Deserializer<'a> {
    cursor: Cursor<'a>,
    walker: Option<Walker<'a>>,
    cfg: Config,
}

impl<'a> Deserializer<'a> {
    /// Creates a deserializer over `data` in free-form mode.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, None, Config::default())
    }

    /// Creates a deserializer over `data` whose reads are checked against `template`.
    pub fn with_template(data: &'a [u8], template: &'a MessageTemplate) -> Self {
        Self::with_config(data, Some(template), Config::default())
    }

    /// Creates a deserializer with explicit limits.
    pub fn with_config(data: &'a [u8], template: Option<&'a MessageTemplate>, cfg: Config) -> Self {
        Self {
            cursor: Cursor::new(data),
            walker: template.map(Walker::new),
            cfg,
        }
    }

    /// Rewinds to the start of the buffer and of the template.
    pub fn reset_traversal(&mut self) {
        self.cursor.reset();
        if let Some(walker) = &mut self.walker {
            walker.reset();
        }
    }

    /// Returns the template reads are checked against, if any.
    pub fn template(&self) -> Option<&'a MessageTemplate> {
        self.walker.as_ref().map(Walker::template)
    }

    /// Returns the template traversal state, if a template is bound.
    pub fn walker(&self) -> Option<&Walker<'a>> {
        self.walker.as_ref()
    }

    /// Returns true once every field of the bound template has been read.
    ///
    /// Always false without a template.
    pub fn is_complete(&self) -> bool {
        self.walker.as_ref().is_some_and(Walker::is_complete)
    }

    /// Reads a primitive value.
    ///
    /// With a template, the next field must have type `T::TYPE`; the template advances by one
    /// element once the value has been read.
    pub fn read<T: Primitive>(&mut self) -> Result<T, Error> {
        let result = self.read_primitive::<T>();
        self.report(result)
    }

    /// Checks the next element against the template, if any.
    fn check_type<T: Primitive>(&self) -> Result<(), Error> {
        match &self.walker {
            Some(walker) => walker.expect(T::TYPE),
            None => Ok(()),
        }
    }

    fn read_primitive<T: Primitive>(&mut self) -> Result<T, Error> {
        self.check_type::<T>()?;
        self.cursor.require(T::BITS)?;
        let value = T::take(&mut self.cursor);
        if let Some(walker) = &mut self.walker {
            walker.advance()?;
        }
        Ok(value)
    }

    /// Reads `num_bits` bits, in `[1, 32]`, packed into the low bits of the result.
    ///
    /// Raw bit reads bypass the template.
    pub fn read_bits(&mut self, num_bits: u32) -> Result<u32, Error> {
        let result = self.cursor.read_bits(num_bits);
        self.report(result)
    }

    /// Reads a variable-length integer in format `V`.
    ///
    /// VLE reads bypass the template.
    pub fn read_vle<V: VleFormat>(&mut self) -> Result<u32, Error> {
        let result = vle::read::<V>(&mut self.cursor);
        self.report(result)
    }

    /// Fills `dst` with consecutive values of type `T`.
    ///
    /// With a template, an empty `dst` moves past the (empty) field under the template cursor,
    /// which must have type `T`.
    pub fn read_array<T: Primitive>(&mut self, dst: &mut [T]) -> Result<(), Error> {
        let result = self.read_elements(dst);
        self.report(result)
    }

    fn read_elements<T: Primitive>(&mut self, dst: &mut [T]) -> Result<(), Error> {
        if dst.is_empty() {
            if let Some(walker) = &mut self.walker {
                walker.skip_empty(T::TYPE)?;
            }
            return Ok(());
        }
        self.check_type::<T>()?;
        self.cursor.require(dst.len().saturating_mul(T::BITS))?;
        for slot in dst.iter_mut() {
            *slot = self.read_primitive::<T>()?;
        }
        Ok(())
    }

    /// Reads `count` consecutive values of type `T` into a new vector.
    ///
    /// Nothing is allocated unless the buffer holds enough bits for all `count` values.
    pub fn read_vec<T: Primitive>(&mut self, count: usize) -> Result<Vec<T>, Error> {
        let result = self.read_vec_inner(count);
        self.report(result)
    }

    fn read_vec_inner<T: Primitive>(&mut self, count: usize) -> Result<Vec<T>, Error> {
        if count == 0 {
            self.read_elements::<T>(&mut [])?;
            return Ok(Vec::new());
        }
        self.check_type::<T>()?;
        self.cursor.require(count.saturating_mul(T::BITS))?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_primitive::<T>()?);
        }
        Ok(values)
    }

    /// Reads the element count of the dynamic field under the template cursor.
    ///
    /// Must be called before reading the elements of a dynamically sized field. The count is
    /// read from the stream with the width declared by the template.
    pub fn dynamic_count(&mut self) -> Result<u32, Error> {
        let result = self.read_dynamic_count();
        self.report(result)
    }

    fn read_dynamic_count(&mut self) -> Result<u32, Error> {
        let walker = self.walker.as_mut().ok_or(Error::NoTemplate)?;
        let bits = walker.count_bits()?;
        let start = self.cursor;
        let count = self.cursor.read_bits(bits)?;
        if !self.cfg.dynamic_count.contains(&count) {
            self.cursor = start;
            return Err(Error::InvalidLength(count as usize));
        }
        walker.set_dynamic_count(count)?;
        Ok(count)
    }

    /// Reads a sanitized ASCII string.
    ///
    /// Without a template, the string is a length byte followed by that many bytes. With a
    /// template, the field under the cursor must have type `u8` or `s8` and its count (fixed or
    /// dynamic) gives the length.
    ///
    /// Bytes outside the allowed set are replaced with spaces (see [crate::string]).
    pub fn read_string(&mut self) -> Result<String, Error> {
        let result = if self.walker.is_some() {
            self.read_template_string()
        } else {
            self.read_prefixed_string()
        };
        self.report(result)
    }

    fn read_prefixed_string(&mut self) -> Result<String, Error> {
        let start = self.cursor;
        let len = self.cursor.read_bits(8)? as usize;
        if !self.cfg.string_length.contains(&len) {
            self.cursor = start;
            return Err(Error::InvalidLength(len));
        }
        if let Err(err) = self.cursor.require(len.saturating_mul(8)) {
            self.cursor = start;
            return Err(err);
        }
        let cursor = &mut self.cursor;
        Ok(string::sanitize_all((0..len).map(|_| cursor.take_byte())))
    }

    fn read_template_string(&mut self) -> Result<String, Error> {
        let walker = self.walker.as_mut().ok_or(Error::NoTemplate)?;
        let desc = walker.next_field().ok_or(Error::SchemaExhausted)?;
        let ty = match desc.data_type() {
            Some(ty) if ty.is_char() => ty,
            _ => return Err(Error::NotString(desc.name().to_string())),
        };

        // Probe the length first so a truncated string consumes nothing
        let mut probe = self.cursor;
        let count = if walker.is_pending() {
            let count = probe.read_bits(walker.count_bits()?)?;
            if !self.cfg.dynamic_count.contains(&count) {
                return Err(Error::InvalidLength(count as usize));
            }
            Some(count)
        } else {
            None
        };
        let len = match count {
            Some(count) => count,
            None => walker.elements_left()?,
        } as usize;
        if !self.cfg.string_length.contains(&len) {
            return Err(Error::InvalidLength(len));
        }
        probe.require(len.saturating_mul(8))?;

        // Commit the count
        self.cursor = probe;
        if let Some(count) = count {
            walker.set_dynamic_count(count)?;
        }
        if len == 0 {
            match ty {
                DataType::S8 => self.read_elements::<i8>(&mut [])?,
                _ => self.read_elements::<u8>(&mut [])?,
            }
            return Ok(String::new());
        }

        let mut value = String::with_capacity(len);
        for _ in 0..len {
            let byte = match ty {
                DataType::S8 => self.read_primitive::<i8>()? as u8,
                _ => self.read_primitive::<u8>()?,
            };
            value.push(string::sanitize(byte));
        }
        Ok(value)
    }

    /// Advances by `num_bits` bits without reading them.
    ///
    /// Not allowed with a template, which must be advanced through typed reads.
    pub fn skip_bits(&mut self, num_bits: usize) -> Result<(), Error> {
        let result = if self.walker.is_some() {
            Err(Error::SkipWithTemplate)
        } else {
            self.cursor.skip_bits(num_bits)
        };
        self.report(result)
    }

    /// Advances by `num_bytes` bytes without reading them.
    ///
    /// Not allowed with a template, which must be advanced through typed reads.
    pub fn skip_bytes(&mut self, num_bytes: usize) -> Result<(), Error> {
        self.skip_bits(num_bytes.saturating_mul(8))
    }

    /// Returns the number of bytes left to read (a partially read byte counts as left).
    pub fn bytes_left(&self) -> usize {
        self.cursor.bytes_left()
    }

    /// Returns the number of bits left to read.
    pub fn bits_left(&self) -> usize {
        self.cursor.bits_left()
    }

    /// Returns the index of the byte that will be read next.
    pub fn byte_pos(&self) -> usize {
        self.cursor.byte_pos()
    }

    /// Returns the index, in `[0, 7]`, of the bit within the current byte that will be read
    /// next. Bits are read from the least significant to the most significant.
    pub fn bit_pos(&self) -> usize {
        self.cursor.bit_pos()
    }

    /// Returns the buffer from the current byte onwards.
    pub fn current_data(&self) -> &'a [u8] {
        self.cursor.current_data()
    }

    /// Emits a diagnostic for a failed read.
    fn report<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(err) = &result {
            let byte = self.cursor.byte_pos();
            let bit = self.cursor.bit_pos();
            match err {
                Error::EndOfBuffer => debug!(byte, bit, "stream exhausted"),
                _ => {
                    let message = self.template().map(MessageTemplate::name);
                    warn!(?err, ?message, byte, bit, "rejected read");
                }
            }
        }
        result
    }
}

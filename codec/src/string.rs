//! Sanitization of ASCII strings read from the stream.
//!
//! Only printable bytes (`32..=253`) and the whitespace controls `\r`, `\n` and `\t` are kept;
//! every other byte becomes a space. Kept bytes are mapped to the `char` with the same code
//! point, so bytes above `0x7F` decode as Latin-1. The mapping is lossy: strings are not a
//! channel for binary data (base64 is fine).

/// Byte substituted for every disallowed byte.
pub const FILLER: u8 = b' ';

/// Returns true if `byte` may appear in a decoded string.
#[inline]
pub fn is_allowed(byte: u8) -> bool {
    matches!(byte, 32..=253 | b'\r' | b'\n' | b'\t')
}

/// Maps a raw byte to the character it decodes to.
#[inline]
pub fn sanitize(byte: u8) -> char {
    if is_allowed(byte) {
        char::from(byte)
    } else {
        char::from(FILLER)
    }
}

/// Sanitizes every byte of `bytes`.
pub fn sanitize_all(bytes: impl IntoIterator<Item = u8>) -> String {
    bytes.into_iter().map(sanitize).collect()
}

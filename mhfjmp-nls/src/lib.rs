//! Text encodings for strings stored inside mhfjmp resources.
//!
//! Resource strings are stored in a legacy double-byte encoding (Shift-JIS for
//! the retail files). Some of them are not valid under that encoding, so every
//! conversion has a raw-bytes fallback instead of an error: decoding maps each
//! byte to the code point of the same value, and encoding maps such code points
//! back to single bytes.

use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_8};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Result of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded<T> {
    pub value: T,
    /// The selected encoding rejected the input and the raw-bytes fallback was used.
    pub fell_back: bool,
}

impl<T> Transcoded<T> {
    #[inline]
    fn exact(value: T) -> Self {
        Self { value, fell_back: false }
    }

    #[inline]
    fn fallback(value: T) -> Self {
        Self { value, fell_back: true }
    }
}

/// Strings arrive without their NUL terminator.
pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Transcoded<Cow<'a, str>>;
}

pub trait TextEncoder {
    fn encode<'a>(&self, s: &'a str) -> Transcoded<Cow<'a, [u8]>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "sjis", alias = "shiftjis", alias = "shift_jis")]
    ShiftJis,
    #[serde(rename = "utf8", alias = "utf-8")]
    Utf8,
    /// GBK is read as GB18030 (superset).
    #[serde(rename = "gb18030", alias = "gbk")]
    Gb18030,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Utf8 => UTF_8,
            Encoding::Gb18030 => GB18030,
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sjis" | "shiftjis" | "shift_jis" | "shift-jis" => Ok(Encoding::ShiftJis),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "gbk" | "gb18030" => Ok(Encoding::Gb18030),
            other => Err(anyhow::anyhow!("unknown NLS: {other}")),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::ShiftJis => "sjis",
            Encoding::Utf8 => "utf8",
            Encoding::Gb18030 => "gb18030",
        })
    }
}

/// Maps every byte to the code point with the same value. Never fails and
/// loses nothing.
fn bytes_as_chars(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`bytes_as_chars`] when every char fits in a byte; otherwise the
/// UTF-8 bytes of the string.
fn chars_as_bytes(s: &str) -> Vec<u8> {
    if s.chars().all(|c| (c as u32) <= 0xFF) {
        s.chars().map(|c| c as u32 as u8).collect()
    } else {
        s.as_bytes().to_vec()
    }
}

/// A codec bound to one encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec {
    enc: Encoding,
}

impl TextCodec {
    #[inline]
    pub const fn new(enc: Encoding) -> Self {
        Self { enc }
    }
}

impl TextDecoder for TextCodec {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Transcoded<Cow<'a, str>> {
        match self.enc {
            Encoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => Transcoded::exact(Cow::Borrowed(s)),
                Err(_) => Transcoded::fallback(Cow::Owned(bytes_as_chars(bytes))),
            },
            Encoding::ShiftJis | Encoding::Gb18030 => {
                let enc = self.enc.as_encoding_rs();
                match enc.decode_without_bom_handling_and_without_replacement(bytes) {
                    Some(cow) => Transcoded::exact(cow),
                    None => Transcoded::fallback(Cow::Owned(bytes_as_chars(bytes))),
                }
            }
        }
    }
}

impl TextEncoder for TextCodec {
    fn encode<'a>(&self, s: &'a str) -> Transcoded<Cow<'a, [u8]>> {
        let enc = self.enc.as_encoding_rs();
        let (cow, _, had_errors) = enc.encode(s);
        if had_errors {
            Transcoded::fallback(Cow::Owned(chars_as_bytes(s)))
        } else {
            Transcoded::exact(cow)
        }
    }
}

//! String encodings.
//!
//! Buffers delegate byte/text conversion to a codec looked up by name.
//! Encoding is budget-bounded: a codec produces at most `budget` bytes and
//! never splits a character, hex digit pair, or UTF-16 code unit across the
//! boundary. For the binary-text encodings (hex, base64) "encode" consumes
//! encoded text into raw bytes and "decode" renders raw bytes back into
//! text, matching the direction of `write(text)` and `to_text()`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{BufResult, BufferError};

/// Byte/text conversion for one named encoding.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bytes `encode` would produce for `text` with an unlimited budget.
    fn byte_length(&self, text: &str) -> usize;

    /// Encodes up to `budget` bytes of `text`.
    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>>;

    /// Renders `bytes` as text.
    fn decode(&self, bytes: &[u8]) -> BufResult<String>;
}

/// Looks up a codec by name. Matching is case-insensitive and ignores
/// dashes, so `"utf-8"`, `"UTF8"` and `"utf8"` all name the same codec.
pub fn lookup(name: &str) -> BufResult<&'static dyn Codec> {
    let canon: String = name
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    match canon.as_str() {
        "utf8" => Ok(&Utf8),
        "ascii" => Ok(&Ascii),
        "latin1" | "binary" => Ok(&Latin1),
        "hex" => Ok(&Hex),
        "base64" => Ok(&Base64Text),
        "ucs2" | "utf16le" => Ok(&Ucs2),
        _ => Err(BufferError::UnknownEncoding(name.to_string())),
    }
}

/// Whether `name` names a registered codec.
pub fn is_encoding(name: &str) -> bool {
    lookup(name).is_ok()
}

struct Utf8;

impl Codec for Utf8 {
    fn name(&self) -> &'static str {
        "utf8"
    }

    fn byte_length(&self, text: &str) -> usize {
        text.len()
    }

    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>> {
        if text.len() <= budget {
            return Ok(text.as_bytes().to_vec());
        }
        let mut end = 0;
        for (idx, ch) in text.char_indices() {
            if idx + ch.len_utf8() > budget {
                break;
            }
            end = idx + ch.len_utf8();
        }
        Ok(text.as_bytes()[..end].to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> BufResult<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

struct Ascii;

impl Codec for Ascii {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn byte_length(&self, text: &str) -> usize {
        text.chars().count()
    }

    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>> {
        Ok(text
            .chars()
            .take(budget)
            .map(|c| (c as u32 & 0x7F) as u8)
            .collect())
    }

    fn decode(&self, bytes: &[u8]) -> BufResult<String> {
        Ok(bytes.iter().map(|&b| (b & 0x7F) as char).collect())
    }
}

struct Latin1;

impl Codec for Latin1 {
    fn name(&self) -> &'static str {
        "latin1"
    }

    fn byte_length(&self, text: &str) -> usize {
        text.chars().count()
    }

    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>> {
        Ok(text
            .chars()
            .take(budget)
            .map(|c| (c as u32 & 0xFF) as u8)
            .collect())
    }

    fn decode(&self, bytes: &[u8]) -> BufResult<String> {
        Ok(bytes.iter().map(|&b| b as char).collect())
    }
}

struct Hex;

fn hex_val(digit: u8) -> BufResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(BufferError::InvalidText {
            encoding: "hex",
            reason: format!("'{}' is not a hex digit", digit as char),
        }),
    }
}

impl Codec for Hex {
    fn name(&self) -> &'static str {
        "hex"
    }

    fn byte_length(&self, text: &str) -> usize {
        text.len() / 2
    }

    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>> {
        let digits = text.as_bytes();
        let pairs = (digits.len() / 2).min(budget);
        let mut out = Vec::with_capacity(pairs);
        for i in 0..pairs {
            out.push(hex_val(digits[2 * i])? << 4 | hex_val(digits[2 * i + 1])?);
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> BufResult<String> {
        Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }
}

struct Base64Text;

impl Codec for Base64Text {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn byte_length(&self, text: &str) -> usize {
        STANDARD.decode(text).map(|v| v.len()).unwrap_or(0)
    }

    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>> {
        let mut bytes = STANDARD
            .decode(text)
            .map_err(|e| BufferError::InvalidText {
                encoding: "base64",
                reason: e.to_string(),
            })?;
        bytes.truncate(budget);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> BufResult<String> {
        Ok(STANDARD.encode(bytes))
    }
}

struct Ucs2;

impl Codec for Ucs2 {
    fn name(&self) -> &'static str {
        "ucs2"
    }

    fn byte_length(&self, text: &str) -> usize {
        text.encode_utf16().count() * 2
    }

    fn encode(&self, text: &str, budget: usize) -> BufResult<Vec<u8>> {
        let units = budget / 2;
        let mut out = Vec::with_capacity(units * 2);
        for unit in text.encode_utf16().take(units) {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> BufResult<String> {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

/*
 * vlq.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Base64 variable-length quantities as used by the Source Map v3 format.
//!
//! A signed value is first moved into "sign in the low bit" form
//! (`v >= 0` becomes `2v`, `v < 0` becomes `2|v| + 1`) and then emitted five
//! bits at a time, least significant group first. Every digit except the
//! last carries the continuation bit (32).
//!
//! ```
//! use baker_source_map::vlq;
//!
//! assert_eq!(vlq::encode(0), "A");
//! assert_eq!(vlq::encode(-1), "D");
//! assert_eq!(vlq::encode(16), "gB");
//! assert_eq!(vlq::decode("gB").unwrap(), 16);
//! ```

use crate::{Error, Result};

const BASE64_CHARS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const BASE64_VALUES: [i8; 128] = {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < BASE64_CHARS.len() {
        table[BASE64_CHARS[i] as usize] = i as i8;
        i += 1;
    }
    table
};

const VALUE_SHIFT: u32 = 5;
const VALUE_MASK: u128 = 0x1F;
const CONTINUATION_BIT: u8 = 0x20;

/// Thirteen digits carry 65 bits, enough for any `i64` in sign-bit form.
const MAX_DIGITS: u32 = 13;

/// Encode a single signed value.
pub fn encode(value: i64) -> String {
    let mut out = String::new();
    encode_into(&mut out, value);
    out
}

/// Append the encoding of `value` to `out`.
pub fn encode_into(out: &mut String, value: i64) {
    let mut vlq: u128 = if value < 0 {
        (u128::from(value.unsigned_abs()) << 1) | 1
    } else {
        u128::from(value.unsigned_abs()) << 1
    };

    loop {
        let mut digit = (vlq & VALUE_MASK) as u8;
        vlq >>= VALUE_SHIFT;
        if vlq > 0 {
            digit |= CONTINUATION_BIT;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Decode the first value of `input`.
///
/// Trailing digits after the first complete value are ignored; use
/// [`decode_segment`] to read every value of a segment.
pub fn decode(input: &str) -> Result<i64> {
    let mut position = 0;
    decode_from(input.as_bytes(), &mut position)
}

/// Decode every value in a segment (the text between two `,` or `;`).
pub fn decode_segment(segment: &str) -> Result<Vec<i64>> {
    let bytes = segment.as_bytes();
    let mut position = 0;
    let mut values = Vec::new();
    while position < bytes.len() {
        values.push(decode_from(bytes, &mut position)?);
    }
    Ok(values)
}

/// Decode one value starting at `*position`, advancing it past the value.
pub fn decode_from(bytes: &[u8], position: &mut usize) -> Result<i64> {
    let start = *position;
    let mut accumulated: u128 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*position) else {
            return Err(Error::Vlq {
                message: "unexpected end of input while the continuation bit is set".to_string(),
                position: *position,
            });
        };
        let digit = base64_value(byte).ok_or_else(|| Error::Vlq {
            message: format!("'{}' is not a base64 digit", byte.escape_ascii()),
            position: *position,
        })?;
        if shift >= MAX_DIGITS * VALUE_SHIFT {
            return Err(Error::Vlq {
                message: "value does not fit in 64 bits".to_string(),
                position: start,
            });
        }

        accumulated |= (u128::from(digit) & VALUE_MASK) << shift;
        shift += VALUE_SHIFT;
        *position += 1;

        if digit & CONTINUATION_BIT == 0 {
            break;
        }
    }

    let negative = accumulated & 1 == 1;
    let magnitude = accumulated >> 1;
    let value = if negative {
        i128::try_from(magnitude).ok().map(|m| -m)
    } else {
        i128::try_from(magnitude).ok()
    };

    value
        .and_then(|v| i64::try_from(v).ok())
        .ok_or_else(|| Error::Vlq {
            message: "value does not fit in 64 bits".to_string(),
            position: start,
        })
}

fn base64_value(byte: u8) -> Option<u8> {
    let value = *BASE64_VALUES.get(usize::from(byte))?;
    u8::try_from(value).ok()
}

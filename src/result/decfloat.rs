// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! DECFLOAT rendering.
//!
//! A DECFLOAT arrives as a signed exponent plus a big-endian two's-complement
//! significand of variable length. The value is rendered the way the server
//! prints it: plain notation while the plain form needs at most
//! [`MAX_PLAIN_DIGITS`] digits, scientific notation (`d.dddE+x`) beyond that.

use crate::error::{ErrorHelper, Result};
use crate::types::value::format_plain;
use arrow_buffer::i256;

/// Longest plain-notation rendering, counted in digits.
pub const MAX_PLAIN_DIGITS: usize = 38;

const MAX_SIGNIFICAND_BYTES: usize = 32;

/// Sign-extend a big-endian two's-complement byte string into an `i256`.
pub fn significand_from_be_bytes(bytes: &[u8]) -> Result<i256> {
    if bytes.len() > MAX_SIGNIFICAND_BYTES {
        return Err(ErrorHelper::decode().message(format!(
            "DECFLOAT significand of {} bytes exceeds {} bytes",
            bytes.len(),
            MAX_SIGNIFICAND_BYTES
        )));
    }
    let fill = match bytes.first() {
        Some(b) if b & 0x80 != 0 => 0xFF,
        _ => 0x00,
    };
    let mut buf = [fill; MAX_SIGNIFICAND_BYTES];
    buf[MAX_SIGNIFICAND_BYTES - bytes.len()..].copy_from_slice(bytes);
    Ok(i256::from_be_bytes(buf))
}

/// Render `significand * 10^exponent`.
pub fn format_decfloat(exponent: i16, significand: &[u8]) -> Result<String> {
    let value = significand_from_be_bytes(significand)?;
    Ok(format_scaled(value, exponent as i64))
}

fn format_scaled(value: i256, exponent: i64) -> String {
    if value == i256::ZERO {
        return "0".to_string();
    }
    let text = value.to_string();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", text.as_str()),
    };

    let len = digits.len() as i64;
    let plain_digits = if exponent >= 0 {
        len + exponent
    } else {
        len.max(1 - exponent)
    };
    if plain_digits <= MAX_PLAIN_DIGITS as i64 {
        return format_plain(sign, digits, exponent);
    }

    let adjusted = exponent + len - 1;
    let (lead, rest) = digits.split_at(1);
    let rest = if rest.is_empty() { "0" } else { rest };
    let exp_sign = if adjusted < 0 { '-' } else { '+' };
    format!("{}{}.{}E{}{}", sign, lead, rest, exp_sign, adjusted.abs())
}

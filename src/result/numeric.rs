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

//! Number parsing straight from cell bytes, without going through `str`.

use crate::error::{ErrorHelper, Result};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

fn split_sign(bytes: &[u8]) -> (bool, &[u8]) {
    match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    }
}

fn invalid(bytes: &[u8], what: &str) -> crate::error::Error {
    ErrorHelper::decode().message(format!(
        "invalid {} '{}'",
        what,
        String::from_utf8_lossy(bytes)
    ))
}

/// Accumulate ASCII digits into a non-negative magnitude.
fn digits_to_i128(digits: &[u8], original: &[u8], what: &str) -> Result<i128> {
    if digits.is_empty() {
        return Err(invalid(original, what));
    }
    let mut acc: i128 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid(original, what));
        }
        acc = acc
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i128))
            .ok_or_else(|| invalid(original, what))?;
    }
    Ok(acc)
}

pub fn parse_i128(bytes: &[u8]) -> Result<i128> {
    let (negative, digits) = split_sign(bytes);
    let magnitude = digits_to_i128(digits, bytes, "integer")?;
    Ok(if negative { -magnitude } else { magnitude })
}

pub fn parse_i64(bytes: &[u8]) -> Result<i64> {
    let (negative, digits) = split_sign(bytes);
    let mut acc: i64 = 0;
    if digits.is_empty() {
        return Err(invalid(bytes, "integer"));
    }
    // Accumulate negatively so i64::MIN parses.
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid(bytes, "integer"));
        }
        acc = acc
            .checked_mul(10)
            .and_then(|v| v.checked_sub((b - b'0') as i64))
            .ok_or_else(|| invalid(bytes, "integer"))?;
    }
    if negative {
        Ok(acc)
    } else {
        acc.checked_neg().ok_or_else(|| invalid(bytes, "integer"))
    }
}

/// Parse decimal text such as `-12.5` into its unscaled value at `scale`.
///
/// Short fractions are padded (`12.5` at scale 2 is `1250`); a fraction longer
/// than `scale` is rejected.
pub fn parse_scaled_decimal(bytes: &[u8], scale: u8) -> Result<i128> {
    let (negative, body) = split_sign(bytes);
    let (int_part, frac_part) = match body.iter().position(|&b| b == b'.') {
        Some(dot) => (&body[..dot], &body[dot + 1..]),
        None => (body, &body[body.len()..]),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid(bytes, "decimal"));
    }
    if frac_part.len() > scale as usize {
        return Err(invalid(bytes, "decimal"));
    }

    let int_value = if int_part.is_empty() {
        0
    } else {
        digits_to_i128(int_part, bytes, "decimal")?
    };
    let frac_value = if frac_part.is_empty() {
        0
    } else {
        digits_to_i128(frac_part, bytes, "decimal")?
    };
    let pad = (scale as usize - frac_part.len()) as u32;

    let magnitude = 10i128
        .checked_pow(scale as u32)
        .and_then(|factor| int_value.checked_mul(factor))
        .and_then(|v| {
            10i128
                .checked_pow(pad)
                .and_then(|p| frac_value.checked_mul(p))
                .and_then(|f| v.checked_add(f))
        })
        .ok_or_else(|| invalid(bytes, "decimal"))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Parse `seconds[.fraction]` into whole seconds and nanoseconds.
///
/// The nanosecond part is always non-negative, so `-1.5` is `(-2, 500_000_000)`.
pub fn parse_epoch_fraction(bytes: &[u8]) -> Result<(i64, u32)> {
    let total = parse_scaled_decimal(bytes, 9).map_err(|_| invalid(bytes, "epoch value"))?;
    let secs = total.div_euclid(NANOS_PER_SECOND);
    let nanos = total.rem_euclid(NANOS_PER_SECOND) as u32;
    let secs = i64::try_from(secs).map_err(|_| invalid(bytes, "epoch value"))?;
    Ok((secs, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i64() {
        assert_eq!(parse_i64(b"0").unwrap(), 0);
        assert_eq!(parse_i64(b"-42").unwrap(), -42);
        assert_eq!(parse_i64(b"+7").unwrap(), 7);
        assert_eq!(parse_i64(b"9223372036854775807").unwrap(), i64::MAX);
        assert_eq!(parse_i64(b"-9223372036854775808").unwrap(), i64::MIN);
        assert!(parse_i64(b"9223372036854775808").is_err());
        assert!(parse_i64(b"").is_err());
        assert!(parse_i64(b"-").is_err());
        assert!(parse_i64(b"12a").is_err());
    }

    #[test]
    fn test_parse_i128() {
        assert_eq!(
            parse_i128(b"-99999999999999999999999999999999999999").unwrap(),
            -99_999_999_999_999_999_999_999_999_999_999_999_999
        );
        assert!(parse_i128(b"1.5").is_err());
    }

    #[test]
    fn test_parse_scaled_decimal() {
        assert_eq!(parse_scaled_decimal(b"123.45", 2).unwrap(), 12345);
        assert_eq!(parse_scaled_decimal(b"12.5", 2).unwrap(), 1250);
        assert_eq!(parse_scaled_decimal(b"-0.05", 2).unwrap(), -5);
        assert_eq!(parse_scaled_decimal(b"7", 3).unwrap(), 7000);
        assert_eq!(parse_scaled_decimal(b".5", 1).unwrap(), 5);
        assert!(parse_scaled_decimal(b"1.234", 2).is_err());
        assert!(parse_scaled_decimal(b".", 2).is_err());
    }

    #[test]
    fn test_parse_epoch_fraction() {
        assert_eq!(parse_epoch_fraction(b"1234.567").unwrap(), (1234, 567_000_000));
        assert_eq!(parse_epoch_fraction(b"86400").unwrap(), (86400, 0));
        assert_eq!(parse_epoch_fraction(b"-1.5").unwrap(), (-2, 500_000_000));
        assert_eq!(
            parse_epoch_fraction(b"0.000000001").unwrap(),
            (0, 1)
        );
        assert!(parse_epoch_fraction(b"1.0000000001").is_err());
    }
}

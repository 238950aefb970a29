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

//! Streaming parser for row-oriented text chunks.
//!
//! A text chunk is a run of bracketed rows, `["a",null],["b\"c","d"]`, where
//! every field is either a quoted string or `null`. This is not a JSON
//! parser: it only knows two states.
//!
//! - outside a string: `"` opens a string, `n` emits a NULL cell, everything
//!   else (brackets, commas, whitespace, the `ull` of `null`) is skipped
//! - inside a string: `"` closes it and emits the cell, `\` starts an escape,
//!   everything else is copied through
//!
//! `\uXXXX` escapes are written as UTF-8; surrogate pairs are combined and a
//! lone surrogate becomes U+FFFD.

use crate::error::{Error, ErrorHelper, Result};
use crate::reader::stream::{ByteStream, DEFAULT_BUFFER_SIZE};
use crate::result::arena::CellStore;
use std::io::{self, Read};

/// Parse every cell of `reader` into `cells`.
pub fn parse_rows<R: Read>(reader: R, cells: &mut CellStore) -> Result<()> {
    parse_rows_buffered(reader, cells, DEFAULT_BUFFER_SIZE)
}

pub(crate) fn parse_rows_buffered<R: Read>(
    reader: R,
    cells: &mut CellStore,
    buffer_size: usize,
) -> Result<()> {
    let mut stream = ByteStream::with_capacity(reader, buffer_size);
    let mut field = Vec::with_capacity(256);

    while let Some(b) = stream.next_byte().map_err(read_error)? {
        match b {
            b'"' => {
                read_string(&mut stream, &mut field)?;
                cells.push(&field)?;
                field.clear();
            }
            b'n' => cells.push_null(),
            _ => {}
        }
    }
    Ok(())
}

fn read_error(e: io::Error) -> Error {
    ErrorHelper::decode().message(format!("failed to read chunk stream: {}", e))
}

fn unexpected_eof(context: &str) -> Error {
    ErrorHelper::decode().message(format!("unexpected end of stream {}", context))
}

fn read_string<R: Read>(stream: &mut ByteStream<R>, field: &mut Vec<u8>) -> Result<()> {
    loop {
        match stream.copy_until(field, b'"', b'\\').map_err(read_error)? {
            Some(b'"') => return Ok(()),
            Some(_) => {
                let b = expect_byte(stream, "in escape sequence")?;
                decode_escape(b, stream, field)?;
            }
            None => return Err(unexpected_eof("inside string")),
        }
    }
}

fn expect_byte<R: Read>(stream: &mut ByteStream<R>, context: &str) -> Result<u8> {
    stream
        .next_byte()
        .map_err(read_error)?
        .ok_or_else(|| unexpected_eof(context))
}

fn decode_escape<R: Read>(
    escape: u8,
    stream: &mut ByteStream<R>,
    field: &mut Vec<u8>,
) -> Result<()> {
    let decoded = match escape {
        b'"' => b'"',
        b'\\' => b'\\',
        b'/' => b'/',
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'b' => 0x08,
        b'f' => 0x0c,
        b'u' => {
            let unit = read_hex4(stream)?;
            return push_code_unit(unit, stream, field);
        }
        other => {
            return Err(ErrorHelper::decode().message(format!(
                "invalid escape sequence '\\{}'",
                other.escape_ascii()
            )))
        }
    };
    field.push(decoded);
    Ok(())
}

fn read_hex4<R: Read>(stream: &mut ByteStream<R>) -> Result<u16> {
    let mut unit: u16 = 0;
    for _ in 0..4 {
        let b = expect_byte(stream, "in unicode escape")?;
        let digit = (b as char).to_digit(16).ok_or_else(|| {
            ErrorHelper::decode().message(format!(
                "invalid hex digit '{}' in unicode escape",
                b.escape_ascii()
            ))
        })?;
        unit = (unit << 4) | digit as u16;
    }
    Ok(unit)
}

fn push_char(c: char, field: &mut Vec<u8>) {
    let mut tmp = [0u8; 4];
    field.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
}

fn push_code_unit<R: Read>(
    unit: u16,
    stream: &mut ByteStream<R>,
    field: &mut Vec<u8>,
) -> Result<()> {
    match unit {
        0xD800..=0xDBFF => {
            if stream.peek_byte().map_err(read_error)? != Some(b'\\') {
                push_char(char::REPLACEMENT_CHARACTER, field);
                return Ok(());
            }
            stream.next_byte().map_err(read_error)?;
            let escape = expect_byte(stream, "in escape sequence")?;
            if escape != b'u' {
                push_char(char::REPLACEMENT_CHARACTER, field);
                return decode_escape(escape, stream, field);
            }
            let low = read_hex4(stream)?;
            if (0xDC00..=0xDFFF).contains(&low) {
                let code = 0x10000 + (((unit as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00);
                push_char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER), field);
                return Ok(());
            }
            push_char(char::REPLACEMENT_CHARACTER, field);
            push_code_unit(low, stream, field)
        }
        0xDC00..=0xDFFF => {
            push_char(char::REPLACEMENT_CHARACTER, field);
            Ok(())
        }
        _ => {
            push_char(
                char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
                field,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(input: &[u8]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut cells = CellStore::with_block_shifts(4, 2);
        parse_rows_buffered(input, &mut cells, 5)?;
        Ok((0..cells.len())
            .map(|i| cells.get(i).map(|c| c.into_owned()))
            .collect())
    }

    fn cell(s: &str) -> Option<Vec<u8>> {
        Some(s.as_bytes().to_vec())
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(parse(br#"["he\"llo"]"#).unwrap(), vec![cell("he\"llo")]);
    }

    #[test]
    fn test_null_outside_string() {
        assert_eq!(parse(b"n").unwrap(), vec![None]);
        assert_eq!(
            parse(br#"["a",null],[null,"null"]"#).unwrap(),
            vec![cell("a"), None, None, cell("null")]
        );
    }

    #[test]
    fn test_rows_and_empty_strings() {
        let cells = parse(b"[\"1\",\"\"],\n[\"a longer value than the buffer\",\"x\"]").unwrap();
        assert_eq!(
            cells,
            vec![
                cell("1"),
                cell(""),
                cell("a longer value than the buffer"),
                cell("x")
            ]
        );
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(
            parse(br#"["a\\b\/c\n\r\t\b\f"]"#).unwrap(),
            vec![Some(b"a\\b/c\n\r\t\x08\x0c".to_vec())]
        );
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(parse(br#"["caf\u00e9"]"#).unwrap(), vec![cell("café")]);
        assert_eq!(parse(br#"["\u20AC"]"#).unwrap(), vec![cell("€")]);
        assert_eq!(parse(br#"["\ud83d\ude00"]"#).unwrap(), vec![cell("😀")]);
        assert_eq!(parse(br#"["\ud83dx"]"#).unwrap(), vec![cell("\u{FFFD}x")]);
        assert_eq!(parse(br#"["\ude00"]"#).unwrap(), vec![cell("\u{FFFD}")]);
        assert_eq!(parse(br#"["\ud83d\n"]"#).unwrap(), vec![cell("\u{FFFD}\n")]);
    }

    #[test]
    fn test_eof_inside_string() {
        let err = parse(br#"["abc"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.message().contains("unexpected end of stream"));
    }

    #[test]
    fn test_eof_inside_escape() {
        let err = parse(br#"["abc\"#).unwrap_err();
        assert!(err.message().contains("unexpected end of stream"));

        let err = parse(br#"["\u12"#).unwrap_err();
        assert!(err.message().contains("unexpected end of stream"));
    }

    #[test]
    fn test_malformed_escapes() {
        let err = parse(br#"["\q"]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.message().contains("invalid escape"));

        let err = parse(br#"["\u12zz"]"#).unwrap_err();
        assert!(err.message().contains("invalid hex digit"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse(b"").unwrap().is_empty());
        assert!(parse(b"  [ ] ").unwrap().is_empty());
    }
}

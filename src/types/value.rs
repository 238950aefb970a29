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

//! Logical column types and decoded cell values.

use crate::error::{Error, ErrorHelper};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Server-side logical type of a column, as declared in the row type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalType {
    Fixed,
    Real,
    Boolean,
    Text,
    Binary,
    Variant,
    Object,
    Array,
    Map,
    Vector,
    #[serde(rename = "DECFLOAT")]
    DecFloat,
    Date,
    Time,
    TimestampNtz,
    TimestampLtz,
    TimestampTz,
}

impl LogicalType {
    /// Server spelling of the type name.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::Fixed => "FIXED",
            LogicalType::Real => "REAL",
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::Text => "TEXT",
            LogicalType::Binary => "BINARY",
            LogicalType::Variant => "VARIANT",
            LogicalType::Object => "OBJECT",
            LogicalType::Array => "ARRAY",
            LogicalType::Map => "MAP",
            LogicalType::Vector => "VECTOR",
            LogicalType::DecFloat => "DECFLOAT",
            LogicalType::Date => "DATE",
            LogicalType::Time => "TIME",
            LogicalType::TimestampNtz => "TIMESTAMP_NTZ",
            LogicalType::TimestampLtz => "TIMESTAMP_LTZ",
            LogicalType::TimestampTz => "TIMESTAMP_TZ",
        }
    }

    /// Types whose columnar payload is semi-structured or plain text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            LogicalType::Text
                | LogicalType::Variant
                | LogicalType::Object
                | LogicalType::Array
                | LogicalType::Map
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.to_ascii_uppercase().as_str() {
            "FIXED" => LogicalType::Fixed,
            "REAL" => LogicalType::Real,
            "BOOLEAN" => LogicalType::Boolean,
            "TEXT" => LogicalType::Text,
            "BINARY" => LogicalType::Binary,
            "VARIANT" => LogicalType::Variant,
            "OBJECT" => LogicalType::Object,
            "ARRAY" => LogicalType::Array,
            "MAP" => LogicalType::Map,
            "VECTOR" => LogicalType::Vector,
            "DECFLOAT" => LogicalType::DecFloat,
            "DATE" => LogicalType::Date,
            "TIME" => LogicalType::Time,
            "TIMESTAMP_NTZ" => LogicalType::TimestampNtz,
            "TIMESTAMP_LTZ" => LogicalType::TimestampLtz,
            "TIMESTAMP_TZ" => LogicalType::TimestampTz,
            other => {
                return Err(ErrorHelper::unsupported()
                    .message(format!("unknown logical type '{}'", other)));
            }
        };
        Ok(t)
    }
}

/// Exact fixed-point number: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub unscaled: i128,
    pub scale: u8,
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u8) -> Self {
        Self { unscaled, scale }
    }

    /// Lossy conversion for callers that want a float.
    pub fn to_f64(&self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale as i32)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.unscaled.to_string();
        let (sign, digits) = match text.strip_prefix('-') {
            Some(d) => ("-", d),
            None => ("", text.as_str()),
        };
        f.write_str(&format_plain(sign, digits, -(self.scale as i64)))
    }
}

/// Render `digits * 10^exponent` in plain notation.
pub(crate) fn format_plain(sign: &str, digits: &str, exponent: i64) -> String {
    if exponent >= 0 {
        let mut out = String::with_capacity(sign.len() + digits.len() + exponent as usize);
        out.push_str(sign);
        out.push_str(digits);
        out.extend(std::iter::repeat('0').take(exponent as usize));
        return out;
    }

    let fraction_len = (-exponent) as usize;
    let mut out = String::with_capacity(sign.len() + digits.len() + fraction_len + 2);
    out.push_str(sign);
    if digits.len() > fraction_len {
        let (int_part, frac_part) = digits.split_at(digits.len() - fraction_len);
        out.push_str(int_part);
        out.push('.');
        out.push_str(frac_part);
    } else {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(fraction_len - digits.len()));
        out.push_str(digits);
    }
    out
}

/// One decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    /// FIXED values carried in a 128-bit physical column with scale 0.
    BigInteger(i128),
    Decimal(Decimal),
    Real(f64),
    Text(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    List(Vec<CellValue>),
    /// Struct fields in schema order.
    Struct(Vec<(String, CellValue)>),
    Map(Vec<(CellValue, CellValue)>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(v) => Some(*v),
            CellValue::BigInteger(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

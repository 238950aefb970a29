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

//! Per-logical-type decoding of Arrow columns.
//!
//! A [`ColumnReader`] is resolved once per column and batch from the pair
//! (Arrow data type, logical type). Resolution downcasts the array into a
//! [`ColumnKind`], so reading a cell is a match on a closed enum instead of
//! a type test per row. Combinations without a decode rule fail at resolution
//! with an `Unsupported` error.
//!
//! Physical layouts:
//!
//! | Logical type | Arrow layout |
//! |--------------|--------------|
//! | FIXED | Int8/16/32/64 or Decimal128, scaled by the column scale |
//! | REAL | Float64 |
//! | BOOLEAN | Boolean |
//! | TEXT, VARIANT, OBJECT, ARRAY, MAP | Utf8, or Struct / List / Map |
//! | BINARY | Binary |
//! | VECTOR | FixedSizeList of ints or floats |
//! | DECFLOAT | Struct { exponent: Int16, significand: Binary } |
//! | DATE | Date32 |
//! | TIME | Int32/Int64 in `10^-scale` seconds |
//! | TIMESTAMP_NTZ / LTZ | Int64 in `10^-scale` seconds, or Struct { epoch: Int64, fraction: Int32 } |
//! | TIMESTAMP_TZ | Struct { epoch: Int64, tz: Int32 } or Struct { epoch: Int64, fraction: Int32, tz: Int32 } |

use crate::error::{ErrorHelper, Result};
use crate::result::decfloat::format_decfloat;
use crate::result::temporal;
use crate::types::value::{CellValue, Decimal, LogicalType};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type,
};
use arrow_array::{
    Array, ArrayRef, ArrowPrimitiveType, BinaryArray, BooleanArray, Date32Array, Decimal128Array,
    FixedSizeListArray, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
    LargeStringArray, PrimitiveArray, StringArray,
};
use arrow_schema::DataType;
use std::fmt;

/// Integer column of any width, read as `i64`.
#[derive(Debug, Clone)]
pub enum IntColumn {
    Int8(Int8Array),
    Int16(Int16Array),
    Int32(Int32Array),
    Int64(Int64Array),
}

impl IntColumn {
    fn from_array(array: &ArrayRef) -> Option<Self> {
        let column = match array.data_type() {
            DataType::Int8 => IntColumn::Int8(array.as_primitive::<Int8Type>().clone()),
            DataType::Int16 => IntColumn::Int16(array.as_primitive::<Int16Type>().clone()),
            DataType::Int32 => IntColumn::Int32(array.as_primitive::<Int32Type>().clone()),
            DataType::Int64 => IntColumn::Int64(array.as_primitive::<Int64Type>().clone()),
            _ => return None,
        };
        Some(column)
    }

    fn value(&self, row: usize) -> i64 {
        match self {
            IntColumn::Int8(a) => a.value(row) as i64,
            IntColumn::Int16(a) => a.value(row) as i64,
            IntColumn::Int32(a) => a.value(row) as i64,
            IntColumn::Int64(a) => a.value(row),
        }
    }
}

/// Downcast view of one column for one logical type.
#[derive(Debug, Clone)]
pub enum ColumnKind {
    Fixed(IntColumn),
    FixedDecimal(Decimal128Array),
    Real(Float64Array),
    Boolean(BooleanArray),
    Utf8(StringArray),
    LargeUtf8(LargeStringArray),
    /// Struct, list or map column under a semi-structured logical type.
    Nested,
    Binary(BinaryArray),
    Vector(FixedSizeListArray),
    DecFloat {
        exponent: Int16Array,
        significand: BinaryArray,
    },
    Date(Date32Array),
    Time(IntColumn),
    EpochScaled(IntColumn),
    EpochFraction {
        epoch: Int64Array,
        fraction: Int32Array,
    },
    TimestampTz {
        epoch: Int64Array,
        fraction: Option<Int32Array>,
        tz: Int32Array,
    },
}

/// A column resolved for cell reads.
#[derive(Debug, Clone)]
pub struct ColumnReader {
    array: ArrayRef,
    logical: LogicalType,
    kind: ColumnKind,
}

fn unsupported(logical: LogicalType, data_type: &DataType) -> crate::error::Error {
    ErrorHelper::unsupported().message(format!(
        "cannot decode logical type {} from Arrow type {}",
        logical, data_type
    ))
}

fn child<T: ArrowPrimitiveType>(array: &ArrayRef, index: usize) -> Option<PrimitiveArray<T>> {
    array
        .as_struct_opt()
        .and_then(|s| s.columns().get(index))
        .and_then(|c| c.as_primitive_opt::<T>())
        .cloned()
}

impl ColumnReader {
    pub fn new(array: &ArrayRef, logical: LogicalType) -> Result<Self> {
        let data_type = array.data_type();
        let kind = match (logical, data_type) {
            (LogicalType::Fixed, DataType::Decimal128(_, _)) => {
                ColumnKind::FixedDecimal(array.as_primitive::<Decimal128Type>().clone())
            }
            (LogicalType::Fixed, _) => ColumnKind::Fixed(
                IntColumn::from_array(array).ok_or_else(|| unsupported(logical, data_type))?,
            ),
            (LogicalType::Real, DataType::Float64) => {
                ColumnKind::Real(array.as_primitive::<Float64Type>().clone())
            }
            (LogicalType::Boolean, DataType::Boolean) => {
                ColumnKind::Boolean(array.as_boolean().clone())
            }
            (l, DataType::Utf8) if l.is_textual() => {
                ColumnKind::Utf8(array.as_string::<i32>().clone())
            }
            (l, DataType::LargeUtf8) if l.is_textual() => {
                ColumnKind::LargeUtf8(array.as_string::<i64>().clone())
            }
            (
                l,
                DataType::Struct(_)
                | DataType::List(_)
                | DataType::LargeList(_)
                | DataType::Map(_, _),
            ) if l.is_textual() => ColumnKind::Nested,
            (LogicalType::Binary, DataType::Binary) => {
                ColumnKind::Binary(array.as_binary::<i32>().clone())
            }
            (LogicalType::Vector, DataType::FixedSizeList(_, _)) => {
                ColumnKind::Vector(array.as_fixed_size_list().clone())
            }
            (LogicalType::DecFloat, DataType::Struct(fields)) if fields.len() == 2 => {
                let exponent = child::<Int16Type>(array, 0);
                let significand = array
                    .as_struct()
                    .column(1)
                    .as_binary_opt::<i32>()
                    .cloned();
                match (exponent, significand) {
                    (Some(exponent), Some(significand)) => ColumnKind::DecFloat {
                        exponent,
                        significand,
                    },
                    _ => return Err(unsupported(logical, data_type)),
                }
            }
            (LogicalType::Date, DataType::Date32) => {
                ColumnKind::Date(array.as_primitive::<Date32Type>().clone())
            }
            (LogicalType::Time, _) => ColumnKind::Time(
                IntColumn::from_array(array).ok_or_else(|| unsupported(logical, data_type))?,
            ),
            (LogicalType::TimestampNtz | LogicalType::TimestampLtz, DataType::Struct(fields))
                if fields.len() == 2 =>
            {
                match (child::<Int64Type>(array, 0), child::<Int32Type>(array, 1)) {
                    (Some(epoch), Some(fraction)) => ColumnKind::EpochFraction { epoch, fraction },
                    _ => return Err(unsupported(logical, data_type)),
                }
            }
            (LogicalType::TimestampNtz | LogicalType::TimestampLtz, _) => ColumnKind::EpochScaled(
                IntColumn::from_array(array).ok_or_else(|| unsupported(logical, data_type))?,
            ),
            (LogicalType::TimestampTz, DataType::Struct(fields)) if fields.len() == 2 => {
                match (child::<Int64Type>(array, 0), child::<Int32Type>(array, 1)) {
                    (Some(epoch), Some(tz)) => ColumnKind::TimestampTz {
                        epoch,
                        fraction: None,
                        tz,
                    },
                    _ => return Err(unsupported(logical, data_type)),
                }
            }
            (LogicalType::TimestampTz, DataType::Struct(fields)) if fields.len() == 3 => {
                match (
                    child::<Int64Type>(array, 0),
                    child::<Int32Type>(array, 1),
                    child::<Int32Type>(array, 2),
                ) {
                    (Some(epoch), Some(fraction), Some(tz)) => ColumnKind::TimestampTz {
                        epoch,
                        fraction: Some(fraction),
                        tz,
                    },
                    _ => return Err(unsupported(logical, data_type)),
                }
            }
            _ => return Err(unsupported(logical, data_type)),
        };

        Ok(Self {
            array: array.clone(),
            logical,
            kind,
        })
    }

    pub fn logical(&self) -> LogicalType {
        self.logical
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Decode the cell at `row`.
    pub fn value(&self, row: usize, scale: u8) -> Result<CellValue> {
        if self.array.is_null(row) {
            return Ok(CellValue::Null);
        }

        let value = match &self.kind {
            ColumnKind::Fixed(ints) => {
                let v = ints.value(row);
                if scale == 0 {
                    CellValue::Integer(v)
                } else {
                    CellValue::Decimal(Decimal::new(v as i128, scale))
                }
            }
            ColumnKind::FixedDecimal(a) => {
                let v = a.value(row);
                if scale == 0 {
                    CellValue::BigInteger(v)
                } else {
                    CellValue::Decimal(Decimal::new(v, scale))
                }
            }
            ColumnKind::Real(a) => CellValue::Real(a.value(row)),
            ColumnKind::Boolean(a) => CellValue::Boolean(a.value(row)),
            ColumnKind::Utf8(a) => CellValue::Text(a.value(row).to_string()),
            ColumnKind::LargeUtf8(a) => CellValue::Text(a.value(row).to_string()),
            ColumnKind::Nested => nested_value(self.array.as_ref(), row)?,
            ColumnKind::Binary(a) => CellValue::Binary(a.value(row).to_vec()),
            ColumnKind::Vector(a) => CellValue::Text(render_vector(&a.value(row))?),
            ColumnKind::DecFloat {
                exponent,
                significand,
            } => CellValue::Text(format_decfloat(exponent.value(row), significand.value(row))?),
            ColumnKind::Date(a) => CellValue::Date(temporal::date_from_days(a.value(row) as i64)?),
            ColumnKind::Time(ints) => {
                CellValue::Time(temporal::time_from_scaled(ints.value(row), scale)?)
            }
            ColumnKind::EpochScaled(ints) => {
                self.timestamp(temporal::timestamp_from_scaled(ints.value(row), scale)?)
            }
            ColumnKind::EpochFraction { epoch, fraction } => {
                let nanos = fraction_nanos(fraction.value(row))?;
                self.timestamp(temporal::timestamp_from_parts(epoch.value(row), nanos)?)
            }
            ColumnKind::TimestampTz {
                epoch,
                fraction,
                tz,
            } => {
                let (secs, nanos) = match fraction {
                    Some(fraction) => (epoch.value(row), fraction_nanos(fraction.value(row))?),
                    None => temporal::split_scaled(epoch.value(row), scale)?,
                };
                let utc = temporal::timestamp_from_parts(secs, nanos)?;
                let offset = temporal::offset_from_encoded(tz.value(row))?;
                CellValue::TimestampTz(temporal::at_offset(utc, offset))
            }
        };
        Ok(value)
    }

    fn timestamp(&self, utc: chrono::NaiveDateTime) -> CellValue {
        match self.logical {
            LogicalType::TimestampLtz => {
                CellValue::TimestampTz(temporal::at_offset(utc, temporal::utc()))
            }
            _ => CellValue::Timestamp(utc),
        }
    }
}

fn fraction_nanos(fraction: i32) -> Result<u32> {
    u32::try_from(fraction)
        .ok()
        .filter(|n| *n < 1_000_000_000)
        .ok_or_else(|| {
            ErrorHelper::decode().message(format!("invalid fraction field {}", fraction))
        })
}

/// Decode a value inside a semi-structured column by its physical type.
pub fn nested_value(array: &dyn Array, row: usize) -> Result<CellValue> {
    if array.is_null(row) {
        return Ok(CellValue::Null);
    }

    let value = match array.data_type() {
        DataType::Null => CellValue::Null,
        DataType::Struct(fields) => {
            let s = array.as_struct();
            let mut values = Vec::with_capacity(fields.len());
            for (field, column) in fields.iter().zip(s.columns()) {
                values.push((field.name().clone(), nested_value(column.as_ref(), row)?));
            }
            // Single-field wrapper around a NULL is a NULL.
            if values.len() == 1 && values[0].1.is_null() {
                CellValue::Null
            } else {
                CellValue::Struct(values)
            }
        }
        DataType::List(_) => list_value(&array.as_list::<i32>().value(row))?,
        DataType::LargeList(_) => list_value(&array.as_list::<i64>().value(row))?,
        DataType::FixedSizeList(_, _) => list_value(&array.as_fixed_size_list().value(row))?,
        DataType::Map(_, _) => {
            let entries = array.as_map().value(row);
            if entries.is_empty() {
                CellValue::Null
            } else {
                let keys = entries.column(0);
                let values = entries.column(1);
                let mut pairs = Vec::with_capacity(entries.len());
                for i in 0..entries.len() {
                    let key = nested_value(keys.as_ref(), i)?;
                    pairs.push((key, nested_value(values.as_ref(), i)?));
                }
                CellValue::Map(pairs)
            }
        }
        DataType::Utf8 => CellValue::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(array.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => CellValue::Boolean(array.as_boolean().value(row)),
        DataType::Int8 => CellValue::Integer(array.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => CellValue::Integer(array.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => CellValue::Integer(array.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(array.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Real(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Real(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, scale) => {
            let v = array.as_primitive::<Decimal128Type>().value(row);
            match u8::try_from(*scale) {
                Ok(0) => CellValue::BigInteger(v),
                Ok(scale) => CellValue::Decimal(Decimal::new(v, scale)),
                Err(_) => return Err(unsupported(LogicalType::Variant, array.data_type())),
            }
        }
        DataType::Binary => CellValue::Binary(array.as_binary::<i32>().value(row).to_vec()),
        DataType::Date32 => CellValue::Date(temporal::date_from_days(
            array.as_primitive::<Date32Type>().value(row) as i64,
        )?),
        other => return Err(unsupported(LogicalType::Variant, other)),
    };
    Ok(value)
}

fn list_value(values: &ArrayRef) -> Result<CellValue> {
    if values.is_empty() {
        return Ok(CellValue::Null);
    }
    let mut items = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        items.push(nested_value(values.as_ref(), i)?);
    }
    Ok(CellValue::List(items))
}

const SCIENTIFIC_MIN: f64 = 1e-4;
const SCIENTIFIC_MAX: f64 = 1e16;

/// Vector float element: `d.dddE+x` / `d.dddE-x` when the magnitude is at
/// least 1e16 or below 1e-4 (zero excluded), fixed to 6 decimals otherwise.
/// The mantissa keeps the element's own width, so `1e20f32` is `1E+20`.
fn render_float<T: Copy + Into<f64> + fmt::Display + fmt::UpperExp>(v: T) -> String {
    let magnitude = v.into().abs();
    let scientific = magnitude.is_finite()
        && magnitude != 0.0
        && (magnitude >= SCIENTIFIC_MAX || magnitude < SCIENTIFIC_MIN);
    if !scientific {
        return format!("{:.6}", v);
    }
    let text = format!("{:E}", v);
    match text.split_once('E') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}E+{}", mantissa, exponent)
        }
        _ => text,
    }
}

fn render_values<T: ArrowPrimitiveType>(
    array: &PrimitiveArray<T>,
    render: impl Fn(T::Native) -> String,
) -> Vec<String> {
    array.values().iter().map(|v| render(*v)).collect()
}

/// Render one VECTOR row as `[a,b,c]`.
fn render_vector(values: &ArrayRef) -> Result<String> {
    let items = match values.data_type() {
        DataType::Int8 => render_values(values.as_primitive::<Int8Type>(), |v| v.to_string()),
        DataType::Int16 => render_values(values.as_primitive::<Int16Type>(), |v| v.to_string()),
        DataType::Int32 => render_values(values.as_primitive::<Int32Type>(), |v| v.to_string()),
        DataType::Int64 => render_values(values.as_primitive::<Int64Type>(), |v| v.to_string()),
        DataType::Float32 => render_values(values.as_primitive::<Float32Type>(), render_float),
        DataType::Float64 => render_values(values.as_primitive::<Float64Type>(), render_float),
        other => return Err(unsupported(LogicalType::Vector, other)),
    };
    Ok(format!("[{}]", items.join(",")))
}

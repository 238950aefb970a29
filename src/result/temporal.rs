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

//! Epoch-based reconstruction of DATE, TIME and TIMESTAMP_* values.
//!
//! Both chunk shapes end up here: text cells after parsing `seconds.fraction`,
//! columnar cells straight from their integer columns. Fractions are scaled to
//! nanoseconds with `10^(9 - scale)`.

use crate::error::{ErrorHelper, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAY_FROM_CE: i64 = 719_163;
const MAX_SCALE: u8 = 9;

/// Timezone columns carry the UTC offset in minutes, biased by this amount.
pub const TZ_OFFSET_BIAS_MINUTES: i32 = 1440;

fn nanos_multiplier(scale: u8) -> Result<i64> {
    if scale > MAX_SCALE {
        return Err(ErrorHelper::unsupported().message(format!(
            "fractional scale {} exceeds nanosecond precision",
            scale
        )));
    }
    Ok(10i64.pow((MAX_SCALE - scale) as u32))
}

/// Split an epoch value counted in `10^-scale` seconds into seconds and nanos.
pub fn split_scaled(value: i64, scale: u8) -> Result<(i64, u32)> {
    let multiplier = nanos_multiplier(scale)?;
    let divisor = 10i64.pow(scale as u32);
    let secs = value.div_euclid(divisor);
    let nanos = value.rem_euclid(divisor) * multiplier;
    Ok((secs, nanos as u32))
}

pub fn date_from_days(days: i64) -> Result<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAY_FROM_CE)
        .and_then(|d| i32::try_from(d).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| ErrorHelper::decode().message(format!("date out of range: {} days", days)))
}

/// Time of day from seconds and nanoseconds since midnight.
pub fn time_from_parts(secs: i64, nanos: u32) -> Result<NaiveTime> {
    u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos))
        .ok_or_else(|| {
            ErrorHelper::decode().message(format!("time out of range: {}s {}ns", secs, nanos))
        })
}

/// Time of day from a single integer counted in `10^-scale` seconds.
pub fn time_from_scaled(value: i64, scale: u8) -> Result<NaiveTime> {
    let (secs, nanos) = split_scaled(value, scale)?;
    time_from_parts(secs, nanos)
}

/// Wall-clock timestamp (UTC based) from epoch seconds and nanoseconds.
pub fn timestamp_from_parts(secs: i64, nanos: u32) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            ErrorHelper::decode().message(format!("timestamp out of range: {}s {}ns", secs, nanos))
        })
}

pub fn timestamp_from_scaled(value: i64, scale: u8) -> Result<NaiveDateTime> {
    let (secs, nanos) = split_scaled(value, scale)?;
    timestamp_from_parts(secs, nanos)
}

/// Decode the biased timezone field (`minutes + 1440`).
pub fn offset_from_encoded(encoded: i32) -> Result<FixedOffset> {
    encoded
        .checked_sub(TZ_OFFSET_BIAS_MINUTES)
        .and_then(|minutes| minutes.checked_mul(60))
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            ErrorHelper::decode().message(format!("invalid timezone offset field {}", encoded))
        })
}

/// Offset used for TIMESTAMP_LTZ values, which carry no zone of their own.
pub fn utc() -> FixedOffset {
    Utc.fix()
}

/// Attach an offset to an instant given in UTC.
pub fn at_offset(utc: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    offset.from_utc_datetime(&utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_days() {
        assert_eq!(
            date_from_days(0).unwrap(),
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
        assert_eq!(
            date_from_days(19_000).unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 8).unwrap()
        );
        assert_eq!(
            date_from_days(-1).unwrap(),
            NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()
        );
        assert!(date_from_days(i64::MAX).is_err());
    }

    #[test]
    fn test_time_scales() {
        let expected = NaiveTime::from_hms_milli_opt(1, 2, 3, 450).unwrap();
        assert_eq!(time_from_scaled(3_723_450, 3).unwrap(), expected);
        assert_eq!(time_from_scaled(3_723_450_000_000, 9).unwrap(), expected);
        assert_eq!(
            time_from_scaled(3723, 0).unwrap(),
            NaiveTime::from_hms_opt(1, 2, 3).unwrap()
        );
        assert!(time_from_scaled(86_400, 0).is_err());
        assert!(time_from_scaled(1, 10).is_err());
    }

    #[test]
    fn test_negative_timestamp_uses_euclidean_split() {
        // 1969-12-31 23:59:59.5
        let ts = timestamp_from_scaled(-5, 1).unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(1969, 12, 31)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 500)
                .unwrap()
        );
    }

    #[test]
    fn test_offset_decoding() {
        assert_eq!(offset_from_encoded(1440).unwrap().local_minus_utc(), 0);
        assert_eq!(offset_from_encoded(1440 + 330).unwrap().local_minus_utc(), 330 * 60);
        assert_eq!(offset_from_encoded(1440 - 480).unwrap().local_minus_utc(), -480 * 60);
        assert!(offset_from_encoded(0).is_err());
    }

    #[test]
    fn test_at_offset_keeps_instant() {
        let utc = timestamp_from_parts(0, 0).unwrap();
        let local = at_offset(utc, offset_from_encoded(1440 + 60).unwrap());
        assert_eq!(local.timestamp(), 0);
        assert_eq!(local.to_rfc3339(), "1970-01-01T01:00:00+01:00");
    }
}

//! Signed duration parsing for the `--from`/`--to` offsets.
//!
//! Accepts the Go-style syntax users already know from other calendar
//! tooling: an optional sign followed by one or more `<number><unit>` pairs,
//! e.g. `90m`, `1h30m`, `-24h`, `1.5h`. The bare string `0` is also valid.

use chrono::Duration;

use crate::error::WindowError;

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Returns the length of one `unit` in nanoseconds.
fn unit_nanos(unit: &str) -> Option<i128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        "d" => 86_400 * NANOS_PER_SEC,
        "w" => 604_800 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

/// Parses a signed duration such as `-1h30m` into a [`chrono::Duration`].
///
/// # Errors
///
/// Returns [`WindowError::InvalidDuration`] for empty input, missing or
/// unknown units, malformed numbers, or values that overflow.
pub fn parse_signed_duration(input: &str) -> Result<Duration, WindowError> {
    let raw = input.trim();
    let (negative, mut rest) = match raw.strip_prefix('-') {
        Some(tail) => (true, tail),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(WindowError::invalid_duration(input, "empty duration"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(WindowError::invalid_duration(input, "expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(WindowError::invalid_duration(
                input,
                format!("missing unit after {number}"),
            ));
        }
        let scale = unit_nanos(unit).ok_or_else(|| {
            WindowError::invalid_duration(input, format!("unknown unit {unit:?}"))
        })?;

        let component = scaled(number, scale)
            .ok_or_else(|| WindowError::invalid_duration(input, "invalid number"))?;
        total = total
            .checked_add(component)
            .ok_or_else(|| WindowError::invalid_duration(input, "duration overflows"))?;
        rest = tail;
    }

    if negative {
        total = -total;
    }
    let nanos = i64::try_from(total)
        .map_err(|_| WindowError::invalid_duration(input, "duration overflows"))?;
    Ok(Duration::nanoseconds(nanos))
}

/// Converts a decimal literal (`"1"`, `"1.5"`, `".25"`) in `scale` units to nanoseconds.
fn scaled(number: &str, scale: i128) -> Option<i128> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.contains('.') {
        return None;
    }

    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(scale)?;

    // Digits past nanosecond precision cannot change the result.
    let fraction = &fraction[..fraction.len().min(18)];
    if !fraction.is_empty() {
        let digits: i128 = fraction.parse().ok()?;
        let divisor = 10i128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
        nanos = nanos.checked_add(digits.checked_mul(scale)? / divisor)?;
    }
    Some(nanos)
}

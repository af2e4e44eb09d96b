use std::time::Duration;

use anyhow::anyhow;

/// Parses a duration literal as used in configuration files: a non-negative number followed by
///  a unit, e.g. `"20s"`, `"500ms"`, `"1.5s"`, `"2m"` or `"1h"`. Whitespace between number and
///  unit is allowed.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let split_pos = s.find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| anyhow!("duration {:?} has no unit (expected one of ns, us, ms, s, m, h, d)", s))?;

    let (number, unit) = s.split_at(split_pos);
    let number: f64 = number.parse()
        .map_err(|_| anyhow!("invalid number in duration {:?}", s))?;

    let unit_nanos: f64 = match unit.trim() {
        "ns" | "nanos" | "nanoseconds" => 1.0,
        "us" | "micros" | "microseconds" => 1e3,
        "ms" | "millis" | "milliseconds" => 1e6,
        "s" | "second" | "seconds" => 1e9,
        "m" | "minute" | "minutes" => 60e9,
        "h" | "hour" | "hours" => 3600e9,
        "d" | "day" | "days" => 86400e9,
        other => return Err(anyhow!("invalid unit {:?} in duration {:?}", other, s)),
    };

    let nanos = (number * unit_nanos).round();
    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(anyhow!("duration {:?} is out of range", s));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

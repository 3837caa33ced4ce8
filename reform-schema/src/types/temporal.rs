//! Date, datetime and time coercers with ISO 8601 parsing.

use std::sync::LazyLock;

use chrono::{
    DateTime as ChronoDateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    Timelike, Utc,
};
use regex::Regex;

use crate::error::Invalid;
use crate::message::Message;
use crate::node::SchemaNode;
use crate::types::SchemaType;
use crate::value::Value;

static ISO8601_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<year>[0-9]{4})(-(?P<month>[0-9]{1,2})(-(?P<day>[0-9]{1,2})",
        r"((?P<separator>.)(?P<hour>[0-9]{2}):(?P<minute>[0-9]{2})",
        r"(:(?P<second>[0-9]{2})(\.(?P<fraction>[0-9]+))?)?",
        r"(?P<timezone>Z|(?P<tz_sign>[-+])(?P<tz_hour>[0-9]{2}):(?P<tz_minute>[0-9]{2}))?)?)?)?",
    ))
    .expect("ISO 8601 pattern is valid")
});

/// Parse the ISO 8601 prefix of `s`.
///
/// Returns `None` when the prefix has no time component or does not form a
/// valid datetime. The offset is `None` when the string carries no timezone.
pub fn parse_iso8601(s: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let caps = ISO8601_RE.captures(s)?;
    let num = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.name("year")?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num("month")?, num("day")?)?;
    let micro = caps
        .name("fraction")
        .map(|m| {
            let digits: String = m.as_str().chars().chain(std::iter::repeat('0')).take(6).collect();
            digits.parse::<u32>().unwrap_or(0)
        })
        .unwrap_or(0);
    let time = NaiveTime::from_hms_micro_opt(
        num("hour")?,
        num("minute")?,
        num("second").unwrap_or(0),
        micro,
    )?;

    let offset = match caps.name("timezone").map(|m| m.as_str()) {
        None => None,
        Some("Z") => Some(Utc.fix()),
        Some(_) => {
            let sign = if caps.name("tz_sign")?.as_str() == "-" { -1 } else { 1 };
            let secs = num("tz_hour")? * 3600 + num("tz_minute")? * 60;
            Some(FixedOffset::east_opt(sign * i32::try_from(secs).ok()?)?)
        }
    };
    Some((date.and_time(time), offset))
}

/// Parse `YYYY-MM-DD`, tolerating whitespace around each part.
pub fn parse_ymd(s: &str) -> Result<NaiveDate, String> {
    let parts: Vec<&str> = s.splitn(3, '-').collect();
    let [year, month, day] = parts.as_slice() else {
        return Err(format!("expected YYYY-MM-DD, got {:?}", s));
    };
    let bad = |part: &str| format!("invalid literal {:?}", part);
    let year = year.trim().parse::<i32>().map_err(|_| bad(year))?;
    let month = month.trim().parse::<u32>().map_err(|_| bad(month))?;
    let day = day.trim().parse::<u32>().map_err(|_| bad(day))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| "date out of range".to_string())
}

fn parse_clock(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| e.to_string())
}

fn fraction(nanos: u32) -> String {
    let micros = nanos / 1_000;
    if micros == 0 {
        String::new()
    } else {
        format!(".{:06}", micros)
    }
}

/// ISO format of a time; microseconds are printed when non-zero and requested.
pub fn format_time(t: &NaiveTime, micros: bool) -> String {
    let base = t.format("%H:%M:%S").to_string();
    if micros { base + &fraction(t.nanosecond()) } else { base }
}

/// ISO format of a naive datetime.
pub fn format_naive_datetime(dt: &NaiveDateTime) -> String {
    format!("{}{}", dt.format("%Y-%m-%dT%H:%M:%S"), fraction(dt.nanosecond()))
}

/// ISO format of an aware datetime, with a `+HH:MM` offset.
pub fn format_datetime(dt: &ChronoDateTime<FixedOffset>) -> String {
    format!(
        "{}{}{}",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        fraction(dt.nanosecond()),
        dt.format("%:z")
    )
}

fn parse_failure(node: &SchemaNode, template: &str, value: &Value, err: impl ToString) -> Invalid {
    Invalid::new(
        node,
        Message::new(template)
            .with("val", value)
            .with("err", err.to_string())
            .with_code("type"),
    )
}

fn not_an_object(node: &SchemaNode, kind: &str, value: &Value) -> Invalid {
    Invalid::new(
        node,
        Message::new(format!("\"${{val}}\" is not a {} object", kind))
            .with("val", value)
            .with_code("type"),
    )
}

/// A calendar date, serialized as `YYYY-MM-DD`.
///
/// Datetime input is truncated to its date in both directions.
#[derive(Debug, Clone)]
pub struct Date {
    /// Message used when a string cannot be parsed; `${val}` and `${err}` are available
    pub err_template: String,
}

impl Default for Date {
    fn default() -> Self {
        Self {
            err_template: "Invalid date".to_string(),
        }
    }
}

impl Date {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(s: &str) -> Result<NaiveDate, String> {
        match parse_iso8601(s) {
            Some((dt, _)) => Ok(dt.date()),
            None => parse_ymd(s),
        }
    }
}

impl SchemaType for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_absent() {
            return Ok(Value::Null);
        }
        let date = match appstruct {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            Value::NaiveDateTime(dt) => Some(dt.date()),
            Value::Str(s) => Self::parse(s).ok(),
            _ => None,
        };
        date.map(|d| Value::Str(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| not_an_object(node, "date", appstruct))
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if !cstruct.is_truthy() {
            return Ok(Value::Null);
        }
        match cstruct {
            Value::Date(d) => Ok(Value::Date(*d)),
            Value::DateTime(dt) => Ok(Value::Date(dt.date_naive())),
            Value::NaiveDateTime(dt) => Ok(Value::Date(dt.date())),
            Value::Str(s) => Self::parse(s)
                .map(Value::Date)
                .map_err(|e| parse_failure(node, &self.err_template, cstruct, e)),
            other => Err(parse_failure(node, &self.err_template, other, "not a string")),
        }
    }
}

/// A date and time, serialized in ISO 8601 with a timezone offset.
///
/// Naive values get `default_tz` attached; with `default_tz` unset they
/// stay naive. Bare dates are taken as midnight.
#[derive(Debug, Clone)]
pub struct DateTime {
    /// Offset for values without one (default: UTC)
    pub default_tz: Option<FixedOffset>,
    /// Message used when a string cannot be parsed
    pub err_template: String,
}

impl Default for DateTime {
    fn default() -> Self {
        Self {
            default_tz: Some(Utc.fix()),
            err_template: "Invalid date".to_string(),
        }
    }
}

impl DateTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `tz` for naive values; `None` keeps them naive.
    pub fn with_default_tz(tz: Option<FixedOffset>) -> Self {
        Self {
            default_tz: tz,
            ..Self::default()
        }
    }

    fn localize(&self, dt: NaiveDateTime, offset: Option<FixedOffset>) -> Option<Value> {
        match offset.or(self.default_tz) {
            Some(tz) => dt.and_local_timezone(tz).single().map(Value::DateTime),
            None => Some(Value::NaiveDateTime(dt)),
        }
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);
        let localized = match value {
            Value::DateTime(dt) => return Ok(Value::DateTime(*dt)),
            Value::NaiveDateTime(dt) => self.localize(*dt, None),
            Value::Date(d) => self.localize(midnight(*d), None),
            Value::Str(s) => match parse_iso8601(s) {
                Some((dt, offset)) => self.localize(dt, offset),
                None => {
                    let date = parse_ymd(s)?;
                    self.localize(midnight(date), None)
                }
            },
            other => return Err(format!("unsupported {} value", other.kind())),
        };
        localized.ok_or_else(|| "ambiguous local time".to_string())
    }
}

impl SchemaType for DateTime {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_absent() {
            return Ok(Value::Null);
        }
        match self.coerce(appstruct) {
            Ok(Value::DateTime(dt)) => Ok(Value::Str(format_datetime(&dt))),
            Ok(Value::NaiveDateTime(dt)) => Ok(Value::Str(format_naive_datetime(&dt))),
            _ => Err(not_an_object(node, "datetime", appstruct)),
        }
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if !cstruct.is_truthy() {
            return Ok(Value::Null);
        }
        self.coerce(cstruct)
            .map_err(|e| parse_failure(node, &self.err_template, cstruct, e))
    }
}

/// A time of day, serialized as `HH:MM:SS`.
#[derive(Debug, Clone)]
pub struct Time {
    /// Message used when a string cannot be parsed
    pub err_template: String,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            err_template: "Invalid time".to_string(),
        }
    }
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(s: &str) -> Result<NaiveTime, String> {
        match parse_iso8601(s) {
            Some((dt, _)) => Ok(dt.time()),
            None => parse_clock(s),
        }
    }
}

impl SchemaType for Time {
    fn name(&self) -> &'static str {
        "time"
    }

    fn serialize(&self, node: &SchemaNode, appstruct: &Value) -> Result<Value, Invalid> {
        if appstruct.is_absent() {
            return Ok(Value::Null);
        }
        let time = match appstruct {
            Value::Time(t) => Some(*t),
            Value::DateTime(dt) => Some(dt.time()),
            Value::NaiveDateTime(dt) => Some(dt.time()),
            Value::Str(s) => Self::parse(s).ok(),
            _ => None,
        };
        time.map(|t| Value::Str(format_time(&t, false)))
            .ok_or_else(|| not_an_object(node, "time", appstruct))
    }

    fn deserialize(
        &self,
        node: &SchemaNode,
        cstruct: &Value,
        _formstruct: Option<&Value>,
    ) -> Result<Value, Invalid> {
        if !cstruct.is_truthy() {
            return Ok(Value::Null);
        }
        match cstruct {
            Value::Time(t) => Ok(Value::Time(*t)),
            Value::DateTime(dt) => Ok(Value::Time(dt.time())),
            Value::NaiveDateTime(dt) => Ok(Value::Time(dt.time())),
            Value::Str(s) => Self::parse(s)
                .map(Value::Time)
                .map_err(|e| parse_failure(node, &self.err_template, cstruct, e)),
            other => Err(parse_failure(node, &self.err_template, other, "not a string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_prefix_with_offset() {
        let (dt, offset) = parse_iso8601("2024-03-05T10:30:15.25+02:00").unwrap();
        assert_eq!(dt.to_string(), "2024-03-05 10:30:15.250");
        assert_eq!(offset, FixedOffset::east_opt(7200));
    }

    #[test]
    fn iso_without_time_is_not_a_datetime() {
        assert!(parse_iso8601("2024-03-05").is_none());
        assert!(parse_iso8601("2024-13-05T10:00").is_none());
    }

    #[test]
    fn ymd_fallback() {
        assert_eq!(
            parse_ymd("2024-3-5").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert!(parse_ymd("2024-02-30").is_err());
        assert!(parse_ymd("yesterday").is_err());
    }

    #[test]
    fn formats_drop_zero_microseconds() {
        let t = NaiveTime::from_hms_micro_opt(8, 5, 0, 0).unwrap();
        assert_eq!(format_time(&t, true), "08:05:00");
        let t = NaiveTime::from_hms_micro_opt(8, 5, 0, 120).unwrap();
        assert_eq!(format_time(&t, true), "08:05:00.000120");
        assert_eq!(format_time(&t, false), "08:05:00");
    }
}

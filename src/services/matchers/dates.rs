//! Matchers over dates written as ISO 8601 text.
//!
//! Limits are either fixed dates or offsets from the moment of comparison:
//! `now`, `+2d`, `-1.5h`, `-30m`. Offset units are `y` (365 days), `w`, `d`,
//! `h`, `m`, `s`, `ms` and `us`. Dates without an offset are taken as UTC.

use super::{Matcher, shorten};
use crate::Result;
use crate::services::params::{Owner, Params};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

const OFFSET_PATTERN: &str = r"^([+-])(\d+\.?\d*)(y|w|d|h|m|s|ms|us)$";

/// Parse ISO 8601 text into a UTC timestamp.
pub(super) fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(date) = DateTime::parse_from_str(text, format) {
            return Some(date.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|date| date.and_utc())
}

fn actual_date(actual: &Value) -> Option<DateTime<Utc>> {
    actual.as_str().and_then(parse_iso)
}

fn not_a_date(actual: &Value) -> String {
    format!(
        "{} is not a date, only ISO 8601 formatted text is allowed",
        shorten(actual)
    )
}

/// A date limit, fixed or relative to the moment of comparison.
#[derive(Debug, Clone)]
enum DateSpec {
    Fixed(DateTime<Utc>),
    Relative { text: String, offset: Duration },
}

impl DateSpec {
    fn parse(params: &Params<'_>, text: &str) -> Result<Self> {
        if text == "now" {
            return Ok(Self::Relative {
                text: text.to_string(),
                offset: Duration::zero(),
            });
        }

        let pattern = Regex::new(OFFSET_PATTERN)
            .map_err(|err| params.error(format!("invalid offset pattern: {err}")))?;
        if let Some(caps) = pattern.captures(text) {
            let amount: f64 = caps[2]
                .parse()
                .map_err(|_| params.error(format!("invalid offset amount in \"{text}\"")))?;
            let unit_micros: f64 = match &caps[3] {
                "y" => 365.0 * 86_400e6,
                "w" => 7.0 * 86_400e6,
                "d" => 86_400e6,
                "h" => 3_600e6,
                "m" => 60e6,
                "s" => 1e6,
                "ms" => 1e3,
                _ => 1.0,
            };
            let sign = if &caps[1] == "-" { -1.0 } else { 1.0 };
            let micros = sign * amount * unit_micros;
            // Keep the offset addable to any current date
            if !micros.is_finite() || micros.abs() > 1e17 {
                return Err(params.error(format!("offset \"{text}\" is out of range")));
            }
            return Ok(Self::Relative {
                text: text.to_string(),
                offset: Duration::microseconds(micros as i64),
            });
        }

        parse_iso(text).map(Self::Fixed).ok_or_else(|| {
            params.error(format!(
                "\"{text}\" is neither an ISO 8601 date nor an offset such as \"now\" or \"-2d\""
            ))
        })
    }

    fn at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(date) => Some(*date),
            Self::Relative { offset, .. } => now.checked_add_signed(*offset),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Fixed(date) => date.to_rfc3339(),
            Self::Relative { text, .. } => text.clone(),
        }
    }
}

/// Any text parsable as a date.
#[derive(Debug)]
pub(super) struct AnyDate;

impl AnyDate {
    pub(super) fn build(args: &[Value], kwargs: &Map<String, Value>) -> Result<Box<dyn Matcher>> {
        Params::bind(Owner::Matcher, "AnyDate", args, kwargs, &[])?;
        Ok(Box::new(Self))
    }
}

impl Matcher for AnyDate {
    fn name(&self) -> &'static str {
        "AnyDate"
    }

    fn matches(&self, actual: &Value) -> bool {
        actual_date(actual).is_some()
    }

    fn describe(&self) -> String {
        "<Any Date>".to_string()
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        (!self.matches(actual)).then(|| not_a_date(actual))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Before,
    After,
}

/// Date strictly before or after a limit; the limit defaults to `now`.
#[derive(Debug)]
pub(super) struct DateBound {
    side: Side,
    limit: DateSpec,
}

impl DateBound {
    pub(super) fn build(
        args: &[Value],
        kwargs: &Map<String, Value>,
        side: Side,
    ) -> Result<Box<dyn Matcher>> {
        let name = match side {
            Side::Before => "AnyDateBefore",
            Side::After => "AnyDateAfter",
        };
        let params = Params::bind(Owner::Matcher, name, args, kwargs, &["date"])?;
        let limit = DateSpec::parse(&params, params.str(0)?.unwrap_or("now"))?;
        Ok(Box::new(Self { side, limit }))
    }
}

impl Matcher for DateBound {
    fn name(&self) -> &'static str {
        match self.side {
            Side::Before => "AnyDateBefore",
            Side::After => "AnyDateAfter",
        }
    }

    fn matches(&self, actual: &Value) -> bool {
        let (Some(date), Some(limit)) = (actual_date(actual), self.limit.at(Utc::now())) else {
            return false;
        };
        match self.side {
            Side::Before => date < limit,
            Side::After => date > limit,
        }
    }

    fn describe(&self) -> String {
        match self.side {
            Side::Before => format!("<Any Date Before {}>", self.limit.label()),
            Side::After => format!("<Any Date After {}>", self.limit.label()),
        }
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        if self.matches(actual) {
            return None;
        }
        let Some(date) = actual_date(actual) else {
            return Some(not_a_date(actual));
        };
        let limit = self.limit.at(Utc::now())?;
        Some(match self.side {
            Side::Before => format!(
                "{} is {} later than {}",
                date.to_rfc3339(),
                date - limit,
                limit.to_rfc3339()
            ),
            Side::After => format!(
                "{} is {} earlier than {}",
                date.to_rfc3339(),
                limit - date,
                limit.to_rfc3339()
            ),
        })
    }
}

/// Date within inclusive limits.
#[derive(Debug)]
pub(super) struct DateRange {
    from: DateSpec,
    to: DateSpec,
}

impl DateRange {
    pub(super) fn build(args: &[Value], kwargs: &Map<String, Value>) -> Result<Box<dyn Matcher>> {
        let params = Params::bind(
            Owner::Matcher,
            "AnyDateInRange",
            args,
            kwargs,
            &["date_from", "date_to"],
        )?;
        let from_text = params
            .str(0)?
            .ok_or_else(|| params.error("missing required argument \"date_from\""))?;
        let to_text = params
            .str(1)?
            .ok_or_else(|| params.error("missing required argument \"date_to\""))?;
        let from = DateSpec::parse(&params, from_text)?;
        let to = DateSpec::parse(&params, to_text)?;

        let now = Utc::now();
        if let (Some(left), Some(right)) = (from.at(now), to.at(now)) {
            if left > right {
                return Err(params.error(format!(
                    "invalid range limits, \"date_from\" must not be later than \"date_to\" \
                     but {from_text} > {to_text}"
                )));
            }
        }
        Ok(Box::new(Self { from, to }))
    }
}

impl Matcher for DateRange {
    fn name(&self) -> &'static str {
        "AnyDateInRange"
    }

    fn matches(&self, actual: &Value) -> bool {
        let now = Utc::now();
        match (actual_date(actual), self.from.at(now), self.to.at(now)) {
            (Some(date), Some(from), Some(to)) => from <= date && date <= to,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        format!(
            "<Any Date In Range between {} and {}>",
            self.from.label(),
            self.to.label()
        )
    }

    fn explain_mismatch(&self, actual: &Value) -> Option<String> {
        if self.matches(actual) {
            return None;
        }
        let Some(date) = actual_date(actual) else {
            return Some(not_a_date(actual));
        };
        let now = Utc::now();
        let (from, to) = (self.from.at(now)?, self.to.at(now)?);
        Some(if date < from {
            format!(
                "{} is {} earlier than {} (left limit)",
                date.to_rfc3339(),
                from - date,
                from.to_rfc3339()
            )
        } else {
            format!(
                "{} is {} later than {} (right limit)",
                date.to_rfc3339(),
                date - to,
                to.to_rfc3339()
            )
        })
    }
}

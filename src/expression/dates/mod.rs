//! Date helpers for placeholder expressions.
//!
//! `date`, `datetime` and `now` render instants with PHP-style format letters
//! (`Y-m-d H:i:s`) because that is how existing scenario text spells them.
//! Inputs accept absolute dates, the keywords `now`, `today`, `tomorrow` and
//! `yesterday`, and relative terms such as `+1 day -2 hours`. All instants are
//! UTC and come from the configured [`Clock`] so scenarios can freeze time.

use minijinja::{Environment, Error, ErrorKind, value::Kwargs};
use time::{
    Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, macros::format_description,
};

use crate::config::Clock;

const DATE_FORMAT: &str = "Y-m-d";
const DATETIME_FORMAT: &str = "Y-m-d H:i:s";
const MONTHS_PER_YEAR: i32 = 12;

/// Register the date helpers with the environment.
///
/// Each helper takes its arguments positionally or by keyword, so
/// `date('tomorrow', 'd/m/Y')` and `date(format='d/m/Y')` both work.
pub(super) fn register_functions(env: &mut Environment<'_>, clock: Clock) {
    env.add_function(
        "date",
        move |date: Option<String>, format: Option<String>, kwargs: Kwargs| -> Result<String, Error> {
            let (date, format) = merge_kwargs(date, format, &kwargs)?;
            render(clock, date.as_deref(), format.as_deref().unwrap_or(DATE_FORMAT))
        },
    );
    env.add_function(
        "datetime",
        move |date: Option<String>, format: Option<String>, kwargs: Kwargs| -> Result<String, Error> {
            let (date, format) = merge_kwargs(date, format, &kwargs)?;
            render(
                clock,
                date.as_deref(),
                format.as_deref().unwrap_or(DATETIME_FORMAT),
            )
        },
    );
    env.add_function("now", move |format: Option<String>, kwargs: Kwargs| -> Result<String, Error> {
        let keyword: Option<String> = kwargs.get("format")?;
        kwargs.assert_all_used()?;
        let format = format.or(keyword);
        Ok(format_php(
            clock.now(),
            format.as_deref().unwrap_or(DATETIME_FORMAT),
        ))
    });
}

fn merge_kwargs(
    date: Option<String>,
    format: Option<String>,
    kwargs: &Kwargs,
) -> Result<(Option<String>, Option<String>), Error> {
    let date_keyword: Option<String> = kwargs.get("date")?;
    let format_keyword: Option<String> = kwargs.get("format")?;
    kwargs.assert_all_used()?;
    Ok((date.or(date_keyword), format.or(format_keyword)))
}

fn render(clock: Clock, date: Option<&str>, format: &str) -> Result<String, Error> {
    let instant = parse_moment(date.unwrap_or_default(), clock.now())?;
    Ok(format_php(instant, format))
}

/// Resolve a date description relative to `now`.
fn parse_moment(raw: &str, now: OffsetDateTime) -> Result<OffsetDateTime, Error> {
    let trimmed = raw.trim();
    if let Some(absolute) = parse_absolute(trimmed) {
        return Ok(absolute);
    }

    let mut tokens = trimmed.split_whitespace().peekable();
    let mut moment = match tokens.peek().map(|word| word.to_ascii_lowercase()).as_deref() {
        Some("now") => {
            tokens.next();
            now
        }
        Some("today" | "midnight") => {
            tokens.next();
            midnight(now)
        }
        Some("tomorrow") => {
            tokens.next();
            shift(midnight(now), Duration::DAY, raw)?
        }
        Some("yesterday") => {
            tokens.next();
            shift(midnight(now), -Duration::DAY, raw)?
        }
        _ => now,
    };

    while let Some(token) = tokens.next() {
        let (amount_text, unit_text) = match token.find(|c: char| c.is_ascii_alphabetic()) {
            Some(split) if split > 0 => token.split_at(split),
            _ => (token, tokens.next().ok_or_else(|| invalid_date(raw))?),
        };
        let amount = parse_amount(amount_text).ok_or_else(|| invalid_date(raw))?;
        moment = apply_relative(moment, amount, unit_text, raw)?;
    }
    Ok(moment)
}

fn parse_absolute(trimmed: &str) -> Option<OffsetDateTime> {
    let date_only = format_description!("[year]-[month]-[day]");
    let spaced = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let iso = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

    if let Ok(date) = Date::parse(trimmed, date_only) {
        return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc());
    }
    PrimitiveDateTime::parse(trimmed, spaced)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, iso))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn parse_amount(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('+').unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn apply_relative(
    moment: OffsetDateTime,
    amount: i64,
    unit: &str,
    raw: &str,
) -> Result<OffsetDateTime, Error> {
    let unit = unit.to_ascii_lowercase();
    let singular = unit.strip_suffix('s').unwrap_or(&unit);
    let per_unit = match singular {
        "sec" | "second" => Duration::SECOND,
        "min" | "minute" => Duration::MINUTE,
        "hour" => Duration::HOUR,
        "day" => Duration::DAY,
        "week" => Duration::WEEK,
        "month" => return add_months(moment, amount, raw),
        "year" => {
            let months = amount
                .checked_mul(i64::from(MONTHS_PER_YEAR))
                .ok_or_else(|| overflow_error(raw))?;
            return add_months(moment, months, raw);
        }
        _ => return Err(invalid_date(raw)),
    };
    let offset = per_unit
        .checked_mul(i32::try_from(amount).map_err(|_| overflow_error(raw))?)
        .ok_or_else(|| overflow_error(raw))?;
    shift(moment, offset, raw)
}

/// Add calendar months, clamping the day to the end of the target month.
fn add_months(moment: OffsetDateTime, months: i64, raw: &str) -> Result<OffsetDateTime, Error> {
    let months = i32::try_from(months).map_err(|_| overflow_error(raw))?;
    let current = moment.year() * MONTHS_PER_YEAR + i32::from(u8::from(moment.month())) - 1;
    let target = current.checked_add(months).ok_or_else(|| overflow_error(raw))?;
    let year = target.div_euclid(MONTHS_PER_YEAR);
    let month_number = u8::try_from(target.rem_euclid(MONTHS_PER_YEAR) + 1)
        .map_err(|_| overflow_error(raw))?;
    let month = Month::try_from(month_number).map_err(|_| overflow_error(raw))?;
    let date = (moment.day().min(28)..=moment.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
        .ok_or_else(|| overflow_error(raw))?;
    Ok(moment.replace_date(date))
}

fn midnight(moment: OffsetDateTime) -> OffsetDateTime {
    moment.replace_time(Time::MIDNIGHT)
}

fn shift(moment: OffsetDateTime, offset: Duration, raw: &str) -> Result<OffsetDateTime, Error> {
    moment
        .checked_add(offset)
        .ok_or_else(|| overflow_error(raw))
}

fn invalid_date(raw: &str) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!(
            "date '{raw}' is invalid: expected YYYY-MM-DD, a keyword such as 'tomorrow', \
             or relative terms like '+1 day'"
        ),
    )
}

fn overflow_error(raw: &str) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("date '{raw}' is out of range"),
    )
}

/// Format `moment` using PHP `date()` letters. A backslash escapes the next
/// character; unknown letters are copied verbatim.
fn format_php(moment: OffsetDateTime, format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(letter) = chars.next() {
        if letter == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
            continue;
        }
        out.push_str(&component(moment, letter));
    }
    out
}

fn component(moment: OffsetDateTime, letter: char) -> String {
    let hour = moment.hour();
    let twelve_hour = match hour.rem_euclid(12) {
        0 => 12,
        other => other,
    };
    match letter {
        'Y' => format!("{:04}", moment.year()),
        'y' => format!("{:02}", moment.year().rem_euclid(100)),
        'm' => format!("{:02}", u8::from(moment.month())),
        'n' => u8::from(moment.month()).to_string(),
        'M' => abbreviate(&moment.month().to_string()),
        'F' => moment.month().to_string(),
        'd' => format!("{:02}", moment.day()),
        'j' => moment.day().to_string(),
        'D' => abbreviate(&moment.weekday().to_string()),
        'l' => moment.weekday().to_string(),
        'N' => moment.weekday().number_from_monday().to_string(),
        'w' => moment.weekday().number_days_from_sunday().to_string(),
        'H' => format!("{hour:02}"),
        'G' => hour.to_string(),
        'h' => format!("{twelve_hour:02}"),
        'g' => twelve_hour.to_string(),
        'i' => format!("{:02}", moment.minute()),
        's' => format!("{:02}", moment.second()),
        'A' => if hour < 12 { "AM" } else { "PM" }.to_owned(),
        'a' => if hour < 12 { "am" } else { "pm" }.to_owned(),
        'U' => moment.unix_timestamp().to_string(),
        other => other.to_string(),
    }
}

fn abbreviate(name: &str) -> String {
    name.chars().take(3).collect()
}

#[cfg(test)]
mod tests;

//! Arabic (Saudi dialect) date expression parser.
//!
//! Recognises relative markers ("اليوم", "بكرة", "بعد بكرة", "نهاية الأسبوع"),
//! weekday names, explicit "day month-name" dates, and a "الساعة H[:MM]"
//! time of day. Matching runs on [`normalize`]d text so spelling variants
//! (ة/ه, أ/ا, Arabic-Indic digits) all hit the same pattern.
//!
//! Date rules are tried in priority order and the first match wins. A time
//! of day then refines whichever date matched, or today when none did.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use labeeb_core::local_now;
use labeeb_core::text::normalize;
use regex::Regex;

// =============================================================================
// Compiled patterns (normalized spellings only)
// =============================================================================

struct DatePatterns {
    today: Regex,
    tomorrow: Regex,
    day_after_tomorrow: Regex,
    end_of_week: Regex,
    weekday: Regex,
    day_month: Regex,
    time_of_day: Regex,
}

static DATE_PATTERNS: LazyLock<DatePatterns> = LazyLock::new(|| DatePatterns {
    today: Regex::new(r"\bاليوم\b").expect("Invalid today regex"),
    tomorrow: Regex::new(r"\b(?:بكره|بكرا|باكر|غدا)\b").expect("Invalid tomorrow regex"),
    day_after_tomorrow: Regex::new(r"\bبعد\s+(?:بكره|بكرا|باكر|غدا|غد)\b")
        .expect("Invalid day-after-tomorrow regex"),
    end_of_week: Regex::new(r"\b(?:نهايه|اخر)\s+الاسبوع\b").expect("Invalid end-of-week regex"),
    // احد and اثنين are also "someone" and "two", so they need ال or يوم.
    weekday: Regex::new(
        r"\b(?:(?:ال|يوم\s+(?:ال)?)(احد|اثنين)|(?:ال)?(جمعه|سبت|ثلاثاء|اربعاء|خميس))\b",
    )
    .expect("Invalid weekday regex"),
    day_month: Regex::new(
        r"\b(\d{1,2})\s+(يناير|فبراير|مارس|ابريل|مايو|يونيو|يوليو|اغسطس|سبتمبر|اكتوبر|نوفمبر|ديسمبر)\b",
    )
    .expect("Invalid day-month regex"),
    time_of_day: Regex::new(r"\bالساعه\s*(\d{1,2})(?:\s*[:٫،]\s*(\d{1,2}))?\b")
        .expect("Invalid time-of-day regex"),
});

const MORNING_MARKERS: &[&str] = &["الصبح", "صباح", "الفجر"];
const EVENING_MARKERS: &[&str] = &["مساء", "العصر", "الليل", "المغرب", "العشاء"];

/// Day on which "end of the week" lands.
const END_OF_WEEK: Weekday = Weekday::Fri;

// =============================================================================
// Public API
// =============================================================================

/// Parse a date expression relative to the current local time.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    parse_date_at(text, local_now())
}

/// Parse a date expression relative to `now`.
///
/// Returns `None` when the text carries no recognisable date or time marker;
/// callers pick their own fallback.
pub fn parse_date_at(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let normalized = normalize(text);
    let date = match_date(&normalized, now);
    let time = match_time_of_day(&normalized);

    match (date, time) {
        (Some(date), Some(time)) => Some(date.date().and_time(time)),
        (Some(date), None) => Some(date),
        (None, Some(time)) => Some(now.date().and_time(time)),
        (None, None) => None,
    }
}

// =============================================================================
// Date rules
// =============================================================================

fn match_date(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let p = &*DATE_PATTERNS;

    if p.today.is_match(text) {
        return Some(now);
    }

    // "بعد بكرة" contains "بكرة"; look for a bare tomorrow outside of it.
    let without_day_after = p.day_after_tomorrow.replace_all(text, " ");
    if p.tomorrow.is_match(&without_day_after) {
        return Some(now + Duration::days(1));
    }

    if p.day_after_tomorrow.is_match(text) {
        return Some(now + Duration::days(2));
    }

    if p.end_of_week.is_match(text) {
        // Same-day lands on today.
        let delta = days_until(now.weekday(), END_OF_WEEK);
        return Some(now + Duration::days(delta));
    }

    if let Some(caps) = p.weekday.captures(text) {
        let name = caps.get(1).or_else(|| caps.get(2))?.as_str();
        let target = weekday_from_name(name)?;
        // Same-day always means next week.
        let delta = match days_until(now.weekday(), target) {
            0 => 7,
            d => d,
        };
        return Some(now + Duration::days(delta));
    }

    if let Some(caps) = p.day_month.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_from_name(&caps[2])?;
        if let Some(date) = next_calendar_date(now, month, day) {
            return Some(date);
        }
    }

    None
}

/// Days from `from` forward to the next `to`, 0 when they coincide.
fn days_until(from: Weekday, to: Weekday) -> i64 {
    (to.num_days_from_monday() as i64 - from.num_days_from_monday() as i64).rem_euclid(7)
}

/// Midnight of `day month` this year, or next year when already past.
fn next_calendar_date(now: NaiveDateTime, month: u32, day: u32) -> Option<NaiveDateTime> {
    let this_year = NaiveDate::from_ymd_opt(now.year(), month, day)?.and_time(NaiveTime::MIN);
    if this_year >= now {
        return Some(this_year);
    }
    NaiveDate::from_ymd_opt(now.year() + 1, month, day).map(|d| d.and_time(NaiveTime::MIN))
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "جمعه" => Some(Weekday::Fri),
        "سبت" => Some(Weekday::Sat),
        "احد" => Some(Weekday::Sun),
        "اثنين" => Some(Weekday::Mon),
        "ثلاثاء" => Some(Weekday::Tue),
        "اربعاء" => Some(Weekday::Wed),
        "خميس" => Some(Weekday::Thu),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name {
        "يناير" => 1,
        "فبراير" => 2,
        "مارس" => 3,
        "ابريل" => 4,
        "مايو" => 5,
        "يونيو" => 6,
        "يوليو" => 7,
        "اغسطس" => 8,
        "سبتمبر" => 9,
        "اكتوبر" => 10,
        "نوفمبر" => 11,
        "ديسمبر" => 12,
        _ => return None,
    };
    Some(month)
}

// =============================================================================
// Time of day
// =============================================================================

/// Extract "الساعة H[:MM]" as a wall-clock time with seconds zeroed.
///
/// Spoken hours are 12-hour: 1-6 read as afternoon unless a morning marker
/// is present, and an evening marker moves any of 1-11 to the afternoon
/// and 12 to midnight.
fn match_time_of_day(text: &str) -> Option<NaiveTime> {
    let caps = DATE_PATTERNS.time_of_day.captures(text)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    let morning = MORNING_MARKERS.iter().any(|m| text.contains(m));
    let evening = EVENING_MARKERS.iter().any(|m| text.contains(m));

    if !morning {
        if evening && hour == 12 {
            hour = 0;
        } else if evening && (1..=11).contains(&hour) {
            hour += 12;
        } else if (1..=6).contains(&hour) {
            hour += 12;
        }
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

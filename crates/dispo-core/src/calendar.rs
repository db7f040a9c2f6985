//! Calendar vocabulary (English, transliterated Hindi, Devanagari) and the
//! date arithmetic the resolvers share.
//!
//! All patterns match against lower-cased text.

use std::sync::LazyLock;

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use regex::Regex;

use crate::CoreError;

/// Month spellings. Ambiguous spellings are also everyday words and only
/// count when they sit next to a day number.
const MONTHS: &[(&str, u32, bool)] = &[
    ("january", 1, false),
    ("jan", 1, false),
    ("janavari", 1, false),
    ("janvari", 1, false),
    ("जनवरी", 1, false),
    ("february", 2, false),
    ("feb", 2, false),
    ("farwari", 2, false),
    ("farvari", 2, false),
    ("फरवरी", 2, false),
    ("march", 3, false),
    ("mar", 3, true),
    ("मार्च", 3, false),
    ("april", 4, false),
    ("apr", 4, false),
    ("अप्रैल", 4, false),
    ("may", 5, true),
    ("मई", 5, false),
    ("june", 6, false),
    ("jun", 6, false),
    ("joon", 6, false),
    ("जून", 6, false),
    ("july", 7, false),
    ("jul", 7, false),
    ("julai", 7, false),
    ("जुलाई", 7, false),
    ("august", 8, false),
    ("aug", 8, false),
    ("agast", 8, false),
    ("अगस्त", 8, false),
    ("september", 9, false),
    ("sept", 9, false),
    ("sep", 9, false),
    ("sitambar", 9, false),
    ("सितंबर", 9, false),
    ("october", 10, false),
    ("oct", 10, false),
    ("aktoobar", 10, false),
    ("aktubar", 10, false),
    ("अक्टूबर", 10, false),
    ("november", 11, false),
    ("nov", 11, false),
    ("navambar", 11, false),
    ("नवंबर", 11, false),
    ("december", 12, false),
    ("dec", 12, false),
    ("disambar", 12, false),
    ("दिसंबर", 12, false),
];

/// Weekday spellings. Three-letter abbreviations are left out: "sun" and
/// "sat" are common Hinglish words.
const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("somwar", Weekday::Mon),
    ("somvar", Weekday::Mon),
    ("somvaar", Weekday::Mon),
    ("सोमवार", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("mangalwar", Weekday::Tue),
    ("mangalvar", Weekday::Tue),
    ("mangalvaar", Weekday::Tue),
    ("मंगलवार", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("budhwar", Weekday::Wed),
    ("budhvar", Weekday::Wed),
    ("budhvaar", Weekday::Wed),
    ("बुधवार", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("guruwar", Weekday::Thu),
    ("guruvar", Weekday::Thu),
    ("guruvaar", Weekday::Thu),
    ("brihaspatiwar", Weekday::Thu),
    ("गुरुवार", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("shukrawar", Weekday::Fri),
    ("shukravar", Weekday::Fri),
    ("shukravaar", Weekday::Fri),
    ("शुक्रवार", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("shaniwar", Weekday::Sat),
    ("shanivar", Weekday::Sat),
    ("shanivaar", Weekday::Sat),
    ("शनिवार", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("raviwar", Weekday::Sun),
    ("ravivar", Weekday::Sun),
    ("ravivaar", Weekday::Sun),
    ("itwaar", Weekday::Sun),
    ("itwar", Weekday::Sun),
    ("रविवार", Weekday::Sun),
    ("इतवार", Weekday::Sun),
];

/// Fixed offset from the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Days(u64),
    Months(u32),
}

const RELATIVE: &[(&str, Offset)] = &[
    ("today", Offset::Days(0)),
    ("aaj", Offset::Days(0)),
    ("आज", Offset::Days(0)),
    ("tomorrow", Offset::Days(1)),
    ("kal", Offset::Days(1)),
    ("कल", Offset::Days(1)),
    ("day after tomorrow", Offset::Days(2)),
    ("parso", Offset::Days(2)),
    ("parson", Offset::Days(2)),
    ("parsoon", Offset::Days(2)),
    ("परसों", Offset::Days(2)),
    ("next week", Offset::Days(7)),
    ("agle hafte", Offset::Days(7)),
    ("agle week", Offset::Days(7)),
    ("ek hafte", Offset::Days(7)),
    ("1 hafte", Offset::Days(7)),
    ("अगले हफ्ते", Offset::Days(7)),
    ("next month", Offset::Months(1)),
    ("agle mahine", Offset::Months(1)),
    ("agle month", Offset::Months(1)),
    ("अगले महीने", Offset::Months(1)),
];

/// Longest-first alternation so a longer spelling wins over its prefix.
fn alternation<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("calendar pattern must compile")
}

static MONTH_ALT: LazyLock<String> =
    LazyLock::new(|| alternation(MONTHS.iter().map(|(w, _, _)| *w)));

/// "5 feb", "5th february", "05-feb", "5 of march".
pub(crate) static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?[\s\-]*(?:of\s+)?({})\b",
        *MONTH_ALT
    ))
});

/// "feb 5", "february 5th".
pub(crate) static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b({})[\s\-]*(\d{{1,2}})(?:st|nd|rd|th)?\b",
        *MONTH_ALT
    ))
});

/// "2026-02-05", "2026/2/5".
pub(crate) static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b"));

static NAMED_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    let alt = alternation(
        MONTHS
            .iter()
            .filter(|(_, _, ambiguous)| !ambiguous)
            .map(|(w, _, _)| *w),
    );
    compile(&format!(r"\b({alt})\b"))
});

pub(crate) static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    let alt = alternation(WEEKDAYS.iter().map(|(w, _)| *w));
    compile(&format!(r"\b(?:(next|agle|agla|agli|अगले)\s+)?({alt})\b"))
});

pub(crate) static RELATIVE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    let alt = alternation(RELATIVE.iter().map(|(w, _)| *w));
    compile(&format!(r"\b({alt})\b"))
});

/// "aaj kal" means "nowadays", not today or tomorrow.
pub(crate) static NOWADAYS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\baaj\s*kal\b|आज\s*कल"));

/// "15 tareekh", "15th", "15 ko".
pub(crate) static DAY_OF_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(\d{1,2})(?:\s*(?:tareekh|tarikh|tarik|तारीख)|st|nd|rd|th|\s+ko)\b")
});

pub fn month_number(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(w, _, _)| *w == word)
        .map(|(_, m, _)| *m)
}

pub fn weekday_for(word: &str) -> Option<Weekday> {
    WEEKDAYS.iter().find(|(w, _)| *w == word).map(|(_, d)| *d)
}

pub fn relative_offset(phrase: &str) -> Option<Offset> {
    RELATIVE.iter().find(|(w, _)| *w == phrase).map(|(_, o)| *o)
}

/// The month the text names last, if any.
///
/// Unambiguous month words count anywhere; "may" and "mar" only count as
/// part of a day-month phrase.
pub fn mentioned_month(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let mut last: Option<(usize, u32)> = None;
    let mut consider = |pos: usize, word: &str| {
        if let Some(m) = month_number(word)
            && last.is_none_or(|(p, _)| pos >= p)
        {
            last = Some((pos, m));
        }
    };

    for c in NAMED_MONTH.captures_iter(&lower) {
        if let Some(g) = c.get(1) {
            consider(g.start(), g.as_str());
        }
    }
    for c in DAY_MONTH.captures_iter(&lower) {
        if let Some(g) = c.get(2) {
            consider(g.start(), g.as_str());
        }
    }
    for c in MONTH_DAY.captures_iter(&lower) {
        if let Some(g) = c.get(1) {
            consider(g.start(), g.as_str());
        }
    }
    last.map(|(_, m)| m)
}

/// Advance by one calendar month, clamping to the end of the month.
pub fn add_one_month(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(1))
}

pub fn apply_offset(reference: NaiveDate, offset: Offset) -> Option<NaiveDate> {
    match offset {
        Offset::Days(n) => reference.checked_add_days(Days::new(n)),
        Offset::Months(n) => reference.checked_add_months(Months::new(n)),
    }
}

/// Next occurrence of `weekday` on or after `reference`. When the weekday
/// is today and `explicit_next` is set, the occurrence a week out.
pub fn next_weekday(reference: NaiveDate, weekday: Weekday, explicit_next: bool) -> Option<NaiveDate> {
    let today = reference.weekday().num_days_from_monday();
    let target = weekday.num_days_from_monday();
    let mut ahead = (target + 7 - today) % 7;
    if ahead == 0 && explicit_next {
        ahead = 7;
    }
    reference.checked_add_days(Days::new(u64::from(ahead)))
}

/// Day-of-month in the reference month; the following month when the day
/// is already past or does not exist in the reference month.
pub fn upcoming_day_of_month(reference: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }
    match NaiveDate::from_ymd_opt(reference.year(), reference.month(), day) {
        Some(d) if d >= reference => Some(d),
        Some(d) => add_one_month(d),
        None => {
            let next = reference.with_day(1).and_then(add_one_month)?;
            NaiveDate::from_ymd_opt(next.year(), next.month(), day)
        }
    }
}

/// Month-and-day with the year inferred from the reference date: this
/// year, or next year when the month has already passed.
pub fn infer_year(reference: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let year = if month < reference.month() {
        reference.year() + 1
    } else {
        reference.year()
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a reference date given as `YYYY-MM-DD`, optionally followed by a
/// time (`2026-01-29 10:15:00` or `2026-01-29T10:15:00`).
pub fn parse_reference_date(value: &str) -> Result<NaiveDate, CoreError> {
    let day_part = value
        .trim()
        .split([' ', 'T'])
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").map_err(|_| CoreError::InvalidReferenceDate {
        value: value.to_string(),
    })
}

/// Local calendar date at invocation.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_words_resolve() {
        assert_eq!(month_number("feb"), Some(2));
        assert_eq!(month_number("सितंबर"), Some(9));
        assert_eq!(month_number("febr"), None);
    }

    #[test]
    fn mentioned_month_takes_last_mention() {
        assert_eq!(mentioned_month("January ki EMI, February mein dunga"), Some(2));
        assert_eq!(mentioned_month("no month here"), None);
    }

    #[test]
    fn ambiguous_month_words_need_a_day() {
        assert_eq!(mentioned_month("I may pay later"), None);
        assert_eq!(mentioned_month("I will pay on 2 may"), Some(5));
        assert_eq!(mentioned_month("market band hai"), None);
    }

    #[test]
    fn one_month_clamps_to_month_end() {
        assert_eq!(add_one_month(d(2026, 1, 31)), Some(d(2026, 2, 28)));
        assert_eq!(add_one_month(d(2026, 1, 25)), Some(d(2026, 2, 25)));
        assert_eq!(add_one_month(d(2026, 12, 10)), Some(d(2027, 1, 10)));
    }

    #[test]
    fn next_weekday_on_or_after() {
        // 2026-01-29 is a Thursday.
        let thu = d(2026, 1, 29);
        assert_eq!(next_weekday(thu, Weekday::Fri, false), Some(d(2026, 1, 30)));
        assert_eq!(next_weekday(thu, Weekday::Mon, false), Some(d(2026, 2, 2)));
        assert_eq!(next_weekday(thu, Weekday::Thu, false), Some(thu));
        assert_eq!(next_weekday(thu, Weekday::Thu, true), Some(d(2026, 2, 5)));
    }

    #[test]
    fn upcoming_day_rolls_past_and_invalid_days() {
        let reference = d(2026, 1, 29);
        assert_eq!(upcoming_day_of_month(reference, 30), Some(d(2026, 1, 30)));
        assert_eq!(upcoming_day_of_month(reference, 29), Some(reference));
        assert_eq!(upcoming_day_of_month(reference, 10), Some(d(2026, 2, 10)));
        assert_eq!(upcoming_day_of_month(d(2026, 2, 10), 30), Some(d(2026, 3, 30)));
        assert_eq!(upcoming_day_of_month(reference, 0), None);
        assert_eq!(upcoming_day_of_month(reference, 32), None);
    }

    #[test]
    fn year_inference_rolls_passed_months() {
        let reference = d(2026, 3, 10);
        assert_eq!(infer_year(reference, 2, 5), Some(d(2027, 2, 5)));
        assert_eq!(infer_year(reference, 3, 1), Some(d(2026, 3, 1)));
        assert_eq!(infer_year(reference, 2, 30), None);
    }

    #[test]
    fn reference_date_accepts_timestamps() {
        assert_eq!(parse_reference_date("2026-01-29").unwrap(), d(2026, 1, 29));
        assert_eq!(
            parse_reference_date("2026-01-29 10:15:00").unwrap(),
            d(2026, 1, 29)
        );
        assert_eq!(
            parse_reference_date("2026-01-29T10:15:00Z").unwrap(),
            d(2026, 1, 29)
        );
        assert!(matches!(
            parse_reference_date("29/01/2026"),
            Err(CoreError::InvalidReferenceDate { .. })
        ));
    }

    #[test]
    fn relative_phrases_have_offsets() {
        assert_eq!(relative_offset("parso"), Some(Offset::Days(2)));
        assert_eq!(relative_offset("agle mahine"), Some(Offset::Months(1)));
        assert_eq!(weekday_for("shukrawar"), Some(Weekday::Fri));
    }
}

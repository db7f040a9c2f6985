//! Date resolver strategies.
//!
//! Each strategy looks for one kind of date expression in a piece of text
//! and resolves it against a reference date. [`ResolverChain`] tries a
//! declared list in order and reports which strategy matched.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::calendar::{self, DAY_MONTH, DAY_OF_MONTH, MONTH_DAY, NOWADAYS, NUMERIC_DATE};

/// Which strategy produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Absolute,
    Weekday,
    Relative,
    DayOfMonth,
    Model,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absolute => "absolute",
            Self::Weekday => "weekday",
            Self::Relative => "relative",
            Self::DayOfMonth => "day_of_month",
            Self::Model => "model",
        }
    }

    /// Whether the text fixed the month, so a month named elsewhere in the
    /// transcript must not override it.
    pub fn pins_month(&self) -> bool {
        !matches!(self, Self::DayOfMonth | Self::Model)
    }

    /// Whether the date came from model output rather than the evidence.
    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait DateResolver: Send + Sync {
    fn origin(&self) -> Origin;

    fn name(&self) -> &'static str {
        self.origin().as_str()
    }

    fn try_resolve(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate>;
}

/// A date and the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub date: NaiveDate,
    pub origin: Origin,
}

/// Month name plus day in either order, or a numeric `YYYY-MM-DD` /
/// `YYYY/MM/DD`. The last mention in the text wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteDate;

impl DateResolver for AbsoluteDate {
    fn origin(&self) -> Origin {
        Origin::Absolute
    }

    fn try_resolve(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        let mut found: Vec<(usize, NaiveDate)> = Vec::new();
        let mut day_month_months = Vec::new();

        for c in DAY_MONTH.captures_iter(&lower) {
            let (Some(day), Some(month)) = (c.get(1), c.get(2)) else {
                continue;
            };
            day_month_months.push(month.start());
            if let (Ok(d), Some(m)) = (day.as_str().parse(), calendar::month_number(month.as_str()))
                && let Some(date) = calendar::infer_year(reference, m, d)
            {
                found.push((day.start(), date));
            }
        }
        for c in MONTH_DAY.captures_iter(&lower) {
            let (Some(month), Some(day)) = (c.get(1), c.get(2)) else {
                continue;
            };
            // "5 feb 10 baje": the month already belongs to a day-month phrase.
            if day_month_months.contains(&month.start()) {
                continue;
            }
            if let (Ok(d), Some(m)) = (day.as_str().parse(), calendar::month_number(month.as_str()))
                && let Some(date) = calendar::infer_year(reference, m, d)
            {
                found.push((month.start(), date));
            }
        }
        for c in NUMERIC_DATE.captures_iter(&lower) {
            if let Some(date) = numeric_date(&c) {
                found.push((c.get(0).map_or(0, |m| m.start()), date));
            }
        }

        found.into_iter().max_by_key(|(pos, _)| *pos).map(|(_, d)| d)
    }
}

fn numeric_date(c: &regex::Captures<'_>) -> Option<NaiveDate> {
    let y = c.get(1)?.as_str().parse().ok()?;
    let m = c.get(2)?.as_str().parse().ok()?;
    let d = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Weekday names: the next occurrence on or after the reference date.
#[derive(Debug, Clone, Copy, Default)]
pub struct Weekday;

impl DateResolver for Weekday {
    fn origin(&self) -> Origin {
        Origin::Weekday
    }

    fn try_resolve(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        let c = calendar::WEEKDAY.captures_iter(&lower).last()?;
        let weekday = calendar::weekday_for(c.get(2)?.as_str())?;
        calendar::next_weekday(reference, weekday, c.get(1).is_some())
    }
}

/// Fixed offsets: today, tomorrow, day after tomorrow, next week, next month.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relative;

impl DateResolver for Relative {
    fn origin(&self) -> Origin {
        Origin::Relative
    }

    fn try_resolve(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        let idioms: Vec<(usize, usize)> = NOWADAYS
            .find_iter(&lower)
            .map(|m| (m.start(), m.end()))
            .collect();
        let token = calendar::RELATIVE_TOKEN
            .find_iter(&lower)
            .filter(|m| {
                !idioms
                    .iter()
                    .any(|(start, end)| m.start() >= *start && m.end() <= *end)
            })
            .last()?;
        calendar::apply_offset(reference, calendar::relative_offset(token.as_str())?)
    }
}

/// "15 tareekh", "15 ko", "15th": the next such day of month.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayOfMonth;

impl DateResolver for DayOfMonth {
    fn origin(&self) -> Origin {
        Origin::DayOfMonth
    }

    fn try_resolve(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        DAY_OF_MONTH
            .captures_iter(&lower)
            .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
            .filter_map(|day| calendar::upcoming_day_of_month(reference, day))
            .last()
    }
}

static COMPACT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("compact date regex"));
static LEADING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})").expect("leading date regex"));
static BARE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)?$").expect("bare day regex"));

/// A date value written by the model: `YYYYMMDD`, a leading `YYYY-MM-DD`,
/// a bare day number, a month name plus day, or an embedded numeric date.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelValue;

impl DateResolver for ModelValue {
    fn origin(&self) -> Origin {
        Origin::Model
    }

    fn try_resolve(&self, text: &str, reference: NaiveDate) -> Option<NaiveDate> {
        let value = text.trim().to_lowercase();
        if value.is_empty() {
            return None;
        }
        if let Some(c) = COMPACT_DATE.captures(&value) {
            return numeric_date(&c);
        }
        if let Some(c) = LEADING_DATE.captures(&value) {
            return numeric_date(&c);
        }
        if let Some(c) = BARE_DAY.captures(&value) {
            let day = c.get(1)?.as_str().parse().ok()?;
            let date = NaiveDate::from_ymd_opt(reference.year(), reference.month(), day)?;
            return if date < reference {
                calendar::add_one_month(date)
            } else {
                Some(date)
            };
        }
        if let Some(date) = AbsoluteDate.try_resolve(&value, reference) {
            return Some(date);
        }
        NUMERIC_DATE.captures(&value).and_then(|c| numeric_date(&c))
    }
}

/// An ordered list of strategies; the first that matches wins.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn DateResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn DateResolver>>) -> Self {
        Self { resolvers }
    }

    /// Strategies that rescue a date from free text.
    pub fn rescue() -> Self {
        Self::new(vec![
            Box::new(AbsoluteDate),
            Box::new(Weekday),
            Box::new(Relative),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn resolve(&self, text: &str, reference: NaiveDate) -> Option<Resolution> {
        self.resolve_across(&[text], reference).map(|(hit, _)| hit)
    }

    /// Strategy-major scan over several texts: every text is tried with
    /// the first strategy before any text is tried with the second.
    /// Returns the match and the index of the text it came from.
    pub fn resolve_across(
        &self,
        texts: &[&str],
        reference: NaiveDate,
    ) -> Option<(Resolution, usize)> {
        self.resolvers.iter().find_map(|r| {
            texts.iter().enumerate().find_map(|(i, text)| {
                r.try_resolve(text, reference).map(|date| {
                    let hit = Resolution {
                        date,
                        origin: r.origin(),
                    };
                    (hit, i)
                })
            })
        })
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // A Thursday.
    fn reference() -> NaiveDate {
        d(2026, 1, 29)
    }

    #[test]
    fn absolute_day_month_either_order() {
        let r = reference();
        assert_eq!(AbsoluteDate.try_resolve("main 5 Feb ko dunga", r), Some(d(2026, 2, 5)));
        assert_eq!(AbsoluteDate.try_resolve("February 5th tak", r), Some(d(2026, 2, 5)));
        assert_eq!(AbsoluteDate.try_resolve("10th of march", r), Some(d(2026, 3, 10)));
        assert_eq!(AbsoluteDate.try_resolve("5 फरवरी को", r), Some(d(2026, 2, 5)));
    }

    #[test]
    fn absolute_month_already_passed_is_next_year() {
        let r = d(2026, 3, 10);
        assert_eq!(AbsoluteDate.try_resolve("2 feb", r), Some(d(2027, 2, 2)));
    }

    #[test]
    fn absolute_numeric_dates() {
        let r = reference();
        assert_eq!(AbsoluteDate.try_resolve("on 2026/02/07", r), Some(d(2026, 2, 7)));
        assert_eq!(AbsoluteDate.try_resolve("2026-02-30", r), None);
    }

    #[test]
    fn absolute_last_mention_wins() {
        let r = reference();
        assert_eq!(
            AbsoluteDate.try_resolve("5 feb nahi, 10 feb ko dunga", r),
            Some(d(2026, 2, 10))
        );
        assert_eq!(AbsoluteDate.try_resolve("5 feb 10 baje", r), Some(d(2026, 2, 5)));
    }

    #[test]
    fn ambiguous_month_words_alone_are_not_dates() {
        assert_eq!(AbsoluteDate.try_resolve("I may pay", reference()), None);
        assert_eq!(AbsoluteDate.try_resolve("I may pay 2 may", reference()), Some(d(2026, 5, 2)));
    }

    #[test]
    fn weekday_next_occurrence() {
        let r = reference();
        assert_eq!(Weekday.try_resolve("monday ko", r), Some(d(2026, 2, 2)));
        assert_eq!(Weekday.try_resolve("shukrawar tak", r), Some(d(2026, 1, 30)));
        assert_eq!(Weekday.try_resolve("गुरुवार", r), Some(r));
        assert_eq!(Weekday.try_resolve("agle guruwar", r), Some(d(2026, 2, 5)));
        assert_eq!(Weekday.try_resolve("sun lijiye", r), None);
    }

    #[test]
    fn relative_tokens() {
        let r = reference();
        assert_eq!(Relative.try_resolve("kal de dunga", r), Some(d(2026, 1, 30)));
        assert_eq!(Relative.try_resolve("aaj", r), Some(r));
        assert_eq!(Relative.try_resolve("parso", r), Some(d(2026, 1, 31)));
        assert_eq!(Relative.try_resolve("day after tomorrow", r), Some(d(2026, 1, 31)));
        assert_eq!(Relative.try_resolve("next week", r), Some(d(2026, 2, 5)));
        assert_eq!(Relative.try_resolve("agle mahine", r), Some(d(2026, 2, 28)));
    }

    #[test]
    fn nowadays_idiom_is_not_a_date() {
        let r = reference();
        assert_eq!(Relative.try_resolve("aaj kal paise nahi hai", r), None);
        assert_eq!(
            Relative.try_resolve("aaj kal tight hai, parso dunga", r),
            Some(d(2026, 1, 31))
        );
    }

    #[test]
    fn day_of_month_phrases() {
        let r = reference();
        assert_eq!(DayOfMonth.try_resolve("10 tareekh ko", r), Some(d(2026, 2, 10)));
        assert_eq!(DayOfMonth.try_resolve("30 ko dunga", r), Some(d(2026, 1, 30)));
        assert_eq!(DayOfMonth.try_resolve("25th tak", r), Some(d(2026, 2, 25)));
        assert_eq!(DayOfMonth.try_resolve("4000 de dunga", r), None);
    }

    #[test]
    fn model_value_formats() {
        let r = reference();
        assert_eq!(ModelValue.try_resolve("20260205", r), Some(d(2026, 2, 5)));
        assert_eq!(ModelValue.try_resolve("2026-02-05T00:00:00", r), Some(d(2026, 2, 5)));
        assert_eq!(ModelValue.try_resolve("5", r), Some(d(2026, 2, 5)));
        assert_eq!(ModelValue.try_resolve("30th", r), Some(d(2026, 1, 30)));
        assert_eq!(ModelValue.try_resolve("Feb 5", r), Some(d(2026, 2, 5)));
        assert_eq!(ModelValue.try_resolve("by 2026/02/05 latest", r), Some(d(2026, 2, 5)));
        assert_eq!(ModelValue.try_resolve("soon", r), None);
        assert_eq!(ModelValue.try_resolve("", r), None);
    }

    #[test]
    fn chain_reports_matching_strategy() {
        let chain = ResolverChain::rescue();
        assert_eq!(chain.names(), ["absolute", "weekday", "relative"]);

        let hit = chain.resolve("kal ya monday", reference()).unwrap();
        assert_eq!(hit.origin, Origin::Weekday);
        assert_eq!(hit.date, d(2026, 2, 2));

        assert!(chain.resolve("paise nahi hai", reference()).is_none());
    }

    #[test]
    fn chain_tries_each_strategy_on_every_text_first() {
        let chain = ResolverChain::rescue();
        let texts = ["Customer will pay on monday", "main 5 feb ko dunga"];

        let (hit, source) = chain.resolve_across(&texts, reference()).unwrap();
        assert_eq!(hit.origin, Origin::Absolute);
        assert_eq!(hit.date, d(2026, 2, 5));
        assert_eq!(source, 1);

        let (hit, source) = chain
            .resolve_across(&["monday", "kal dunga"], reference())
            .unwrap();
        assert_eq!(hit.origin, Origin::Weekday);
        assert_eq!(source, 0);
    }
}

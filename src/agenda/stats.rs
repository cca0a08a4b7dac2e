use super::locale::month_to_spanish;
use super::model::Event;
use chrono::Datelike;
use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Bars shown in each performer chart.
pub const CHART_TOP_PERFORMERS: usize = 15;

/// Calendar month, ordered chronologically and shown by its Spanish name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanishMonth(u32);

impl SpanishMonth {
    pub fn new(month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(month))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        month_to_spanish(self.0)
    }
}

impl Display for SpanishMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Performances per performer, in the order performers were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformerCounts(IndexMap<String, u32>);

impl PerformerCounts {
    pub fn increment(&mut self, performer: &str) {
        *self.0.entry(performer.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, performer: &str) -> u32 {
        self.0.get(performer).copied().unwrap_or(0)
    }

    pub fn contains(&self, performer: &str) -> bool {
        self.0.contains_key(performer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /**
    Descending by count, at most `limit` entries.
    Equal counts keep first-seen order.
    */
    pub fn ranked(&self, limit: usize) -> Vec<(String, u32)> {
        self.0
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .sorted_by(|(_, a), (_, b)| b.cmp(a))
            .take(limit)
            .collect()
    }
}

impl<'a> FromIterator<&'a str> for PerformerCounts {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut counts = PerformerCounts::default();

        iter.into_iter().for_each(|performer| counts.increment(performer));

        counts
    }
}

fn events_of_year(events: &[Event], year: i32) -> impl Iterator<Item = (&Event, chrono::NaiveDate)> {
    events
        .iter()
        .filter(|event| event.is_active())
        .filter_map(|event| event.date().map(|date| (event, date)))
        .filter(move |(_, date)| date.year() == year)
}

pub fn aggregate_monthly_performers(
    events: &[Event],
    year: i32,
) -> BTreeMap<SpanishMonth, PerformerCounts> {
    let mut months: BTreeMap<SpanishMonth, PerformerCounts> = BTreeMap::new();

    for (event, date) in events_of_year(events, year) {
        let Some(month) = SpanishMonth::new(date.month()) else {
            continue;
        };

        for performer in event.counted_performers() {
            months.entry(month).or_default().increment(performer);
        }
    }

    months
}

pub fn aggregate_total_performers(events: &[Event], year: i32) -> PerformerCounts {
    events_of_year(events, year)
        .flat_map(|(event, _)| event.counted_performers())
        .collect()
}

/// Years with at least one active event, newest first.
pub fn available_years(events: &[Event]) -> Vec<i32> {
    events
        .iter()
        .filter(|event| event.is_active())
        .filter_map(|event| event.date().map(|date| date.year()))
        .unique()
        .sorted_by(|a, b| b.cmp(a))
        .collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ScreenSize {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl ScreenSize {
    pub fn max_performers(&self) -> usize {
        match self {
            ScreenSize::Mobile => 6,
            ScreenSize::Tablet => 8,
            ScreenSize::Desktop => 12,
        }
    }

    pub fn max_performers_per_month(&self) -> usize {
        match self {
            ScreenSize::Mobile => 2,
            ScreenSize::Tablet => 3,
            ScreenSize::Desktop => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsViewState {
    pub selected_year: i32,
    pub screen_size: ScreenSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub month: SpanishMonth,
    pub total: u32,
    pub top: Vec<(String, u32)>,
    /// Performers left out of `top`.
    pub hidden: usize,
}

/// Everything the statistics charts and tables show for one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformerStatistics {
    pub year: i32,
    pub current_year: PerformerCounts,
    pub next_year: PerformerCounts,
    pub monthly: BTreeMap<SpanishMonth, PerformerCounts>,
    pub screen_size: ScreenSize,
}

impl PerformerStatistics {
    pub fn compute(events: &[Event], view: &StatsViewState) -> Self {
        let year = view.selected_year;

        Self {
            year,
            current_year: aggregate_total_performers(events, year),
            next_year: aggregate_total_performers(events, year + 1),
            monthly: aggregate_monthly_performers(events, year),
            screen_size: view.screen_size,
        }
    }

    pub fn current_year_chart(&self) -> Vec<(String, u32)> {
        self.current_year.ranked(CHART_TOP_PERFORMERS)
    }

    /// Empty when nothing is scheduled for the following year yet.
    pub fn next_year_chart(&self) -> Vec<(String, u32)> {
        self.next_year.ranked(CHART_TOP_PERFORMERS)
    }

    pub fn top_performers(&self) -> Vec<(String, u32)> {
        self.current_year.ranked(self.screen_size.max_performers())
    }

    /// Totals summed over the monthly breakdown, descending.
    pub fn monthly_table(&self) -> Vec<(String, u32)> {
        let mut totals = PerformerCounts::default();

        for counts in self.monthly.values() {
            for (performer, count) in counts.iter() {
                *totals.0.entry(performer.to_string()).or_insert(0) += count;
            }
        }

        totals.ranked(usize::MAX)
    }

    pub fn month_summaries(&self) -> Vec<MonthSummary> {
        let limit = self.screen_size.max_performers_per_month();

        self.monthly
            .iter()
            .map(|(month, counts)| MonthSummary {
                month: *month,
                total: counts.total(),
                top: counts.ranked(limit),
                hidden: counts.len().saturating_sub(limit),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::model::fixtures::{cancelled, event};

    #[test_log::test]
    fn should_count_per_month_without_dj() {
        let events = vec![event("1", "2025-06-10", "22:00", "Los X, DJ")];

        let monthly = aggregate_monthly_performers(&events, 2025);

        assert_eq!(monthly.len(), 1);
        let (month, counts) = monthly.iter().next().unwrap();
        assert_eq!(month.to_string(), "junio");
        assert_eq!(counts.get("Los X"), 1);
        assert!(!counts.contains("DJ"));
        assert_eq!(counts.len(), 1);
    }

    #[test_log::test]
    fn should_credit_every_listed_performer() {
        let events = vec![
            event("1", "2025-06-10", "22:00", "A, B"),
            event("2", "2025-07-10", "22:00", "A"),
            cancelled("3", "2025-07-11", "22:00", "A, B"),
            event("4", "2026-01-10", "22:00", "B"),
        ];

        let totals = aggregate_total_performers(&events, 2025);

        assert_eq!(totals.get("A"), 2);
        assert_eq!(totals.get("B"), 1);
        assert_eq!(aggregate_total_performers(&events, 2026).get("B"), 1);
    }

    #[test_log::test]
    fn should_order_months_chronologically() {
        let events = vec![
            event("1", "2025-12-10", "22:00", "A"),
            event("2", "2025-02-10", "22:00", "A"),
            event("3", "2025-08-10", "22:00", "A"),
        ];

        let months: Vec<String> = aggregate_monthly_performers(&events, 2025)
            .keys()
            .map(ToString::to_string)
            .collect();

        assert_eq!(months, ["febrero", "agosto", "diciembre"]);
    }

    #[test_log::test]
    fn ranking_should_keep_first_seen_order_on_ties() {
        let counts: PerformerCounts = ["Z", "A", "M", "A", "Z"].into_iter().collect();

        assert_eq!(
            counts.ranked(10),
            [("Z".to_string(), 2), ("A".to_string(), 2), ("M".to_string(), 1)]
        );
        assert_eq!(counts.ranked(1), [("Z".to_string(), 2)]);
    }

    #[test_log::test]
    fn should_list_available_years_newest_first() {
        let events = vec![
            event("1", "2024-06-10", "22:00", "A"),
            event("2", "2026-06-10", "22:00", "A"),
            event("3", "2025-06-10", "22:00", "A"),
            event("4", "2024-07-10", "22:00", "A"),
            cancelled("5", "2027-07-10", "22:00", "A"),
        ];

        assert_eq!(available_years(&events), [2026, 2025, 2024]);
    }

    #[test_log::test]
    fn should_summarise_months_for_the_screen_size() {
        let events = vec![
            event("1", "2025-06-01", "22:00", "A, B, C"),
            event("2", "2025-06-02", "22:00", "C"),
            event("3", "2025-07-02", "22:00", "C"),
        ];
        let view = StatsViewState {
            selected_year: 2025,
            screen_size: ScreenSize::Mobile,
        };

        let stats = PerformerStatistics::compute(&events, &view);
        let june = &stats.month_summaries()[0];

        assert_eq!(june.month.name(), "junio");
        assert_eq!(june.total, 4);
        assert_eq!(june.top, [("C".to_string(), 2), ("A".to_string(), 1)]);
        assert_eq!(june.hidden, 1);
        assert_eq!(stats.monthly_table()[0], ("C".to_string(), 3));
        assert!(stats.next_year_chart().is_empty());
    }

    #[test_log::test]
    fn should_parse_screen_sizes() {
        assert_eq!("tablet".parse::<ScreenSize>().unwrap(), ScreenSize::Tablet);
        assert!("watch".parse::<ScreenSize>().is_err());
    }
}

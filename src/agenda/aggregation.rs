use super::locale;
use super::model::{Event, Festival};
use chrono::{Days, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Lookback used by the list, map and festival views.
pub const DEFAULT_LOOKBACK_DAYS: u64 = 2;

/// Lookback used by the weekly export.
pub const WEEK_EXPORT_LOOKBACK_DAYS: u64 = 1;

pub fn lookback_floor(today: NaiveDate, lookback_days: u64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(lookback_days))
        .unwrap_or(NaiveDate::MIN)
}

/**
Keeps the events happening on or after `today - lookback_days`.
Cancelled events and events without a valid day are dropped.
*/
pub fn filter_recent(events: &[Event], today: NaiveDate, lookback_days: u64) -> Vec<Event> {
    let floor = lookback_floor(today, lookback_days);

    events
        .iter()
        .filter(|event| event.is_active())
        .filter(|event| event.date().is_some_and(|date| date >= floor))
        .cloned()
        .collect()
}

/// Active events whose day is within `start..=end`.
pub fn filter_between(events: &[Event], start: NaiveDate, end: NaiveDate) -> Vec<Event> {
    events
        .iter()
        .filter(|event| event.is_active())
        .filter(|event| {
            event
                .date()
                .is_some_and(|date| date >= start && date <= end)
        })
        .cloned()
        .collect()
}

pub fn group_by_day(events: &[Event]) -> BTreeMap<NaiveDate, Vec<Event>> {
    let mut days: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();

    for event in events.iter().filter(|event| event.is_active()) {
        match event.date() {
            Some(date) => days.entry(date).or_default().push(event.clone()),
            None => debug!("Skipping event {} with invalid day '{}'", event.id, event.day),
        }
    }

    days
}

pub fn group_by_location(events: &[Event]) -> BTreeMap<Festival, Vec<Event>> {
    let mut festivals: BTreeMap<Festival, Vec<Event>> = BTreeMap::new();

    for event in events.iter().filter(|event| event.is_active()) {
        festivals
            .entry(event.festival())
            .or_default()
            .push(event.clone());
    }

    festivals
}

/**
Stable chronological order by `day` + `hora`.
Events whose instant can't be parsed are left out.
*/
pub fn sort_by_instant(events: &[Event]) -> Vec<Event> {
    let mut timed: Vec<(NaiveDateTime, &Event)> = events
        .iter()
        .filter(|event| event.is_active())
        .filter_map(|event| match event.instant() {
            Some(instant) => Some((instant, event)),
            None => {
                debug!(
                    "Skipping event {} with invalid instant '{} {}'",
                    event.id, event.day, event.hora
                );
                None
            }
        })
        .collect();

    timed.sort_by_key(|(instant, _)| *instant);

    timed.into_iter().map(|(_, event)| event.clone()).collect()
}

/// Festivals with something on since the default lookback, in first-seen order.
pub fn unique_festivals(events: &[Event], today: NaiveDate) -> Vec<Festival> {
    let festivals: Vec<Festival> = filter_recent(events, today, DEFAULT_LOOKBACK_DAYS)
        .iter()
        .map(Event::festival)
        .unique()
        .collect();

    trace!("Found {} festivals", festivals.len());

    festivals
}

/// Every event of a festival from the default lookback floor onwards.
pub fn festival_events(events: &[Event], festival: &Festival, today: NaiveDate) -> Vec<Event> {
    filter_recent(events, today, DEFAULT_LOOKBACK_DAYS)
        .into_iter()
        .filter(|event| festival.matches(event))
        .collect()
}

/// Most recent edit (or creation) stamp in the snapshot, "N/A" if none parse.
pub fn last_update(events: &[Event]) -> String {
    events
        .iter()
        .filter(|event| event.is_active())
        .filter_map(|event| event.last_modified())
        .filter_map(parse_timestamp)
        .max()
        .map(|latest| locale::date_time(&latest))
        .unwrap_or_else(|| "N/A".to_string())
}

fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    let timestamp = timestamp.trim();

    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
                .map(|date| date.and_time(chrono::NaiveTime::MIN))
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::model::fixtures::{at, cancelled, event};

    fn date(day: &str) -> NaiveDate {
        NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap()
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|event| event.id.as_str()).collect()
    }

    #[test_log::test]
    fn should_keep_events_from_two_days_ago() {
        let events = vec![
            event("old", "2025-06-07", "22:00", "A"),
            event("edge", "2025-06-08", "00:00", "A"),
            event("future", "2025-07-01", "22:00", "A"),
        ];

        let recent = filter_recent(&events, date("2025-06-10"), DEFAULT_LOOKBACK_DAYS);

        assert_eq!(ids(&recent), ["edge", "future"]);
    }

    #[test_log::test]
    fn should_honour_a_custom_lookback() {
        let events = vec![
            event("1", "2025-06-08", "22:00", "A"),
            event("2", "2025-06-09", "22:00", "A"),
        ];

        let recent = filter_recent(&events, date("2025-06-10"), WEEK_EXPORT_LOOKBACK_DAYS);

        assert_eq!(ids(&recent), ["2"]);
    }

    #[test_log::test]
    fn should_never_keep_cancelled_or_undated_events() {
        let events = vec![
            cancelled("cancelled", "2025-06-11", "22:00", "A"),
            event("undated", "pronto", "22:00", "A"),
            event("ok", "2025-06-11", "22:00", "A"),
        ];

        assert_eq!(ids(&filter_recent(&events, date("2025-06-10"), 2)), ["ok"]);
        assert!(filter_recent(&[], date("2025-06-10"), 2).is_empty());
    }

    #[test_log::test]
    fn should_filter_an_inclusive_range() {
        let events = vec![
            event("before", "2025-06-08", "22:00", "A"),
            event("start", "2025-06-09", "22:00", "A"),
            event("end", "2025-06-15", "23:59", "A"),
            event("after", "2025-06-16", "00:00", "A"),
        ];

        let week = filter_between(&events, date("2025-06-09"), date("2025-06-15"));

        assert_eq!(ids(&week), ["start", "end"]);
    }

    #[test_log::test]
    fn should_group_by_calendar_day_ignoring_time() {
        let events = vec![
            event("1", "2025-06-10", "23:00", "A"),
            event("2", "2025-06-11", "22:00", "A"),
            event("3", "2025-06-10", "01:00", "A"),
            cancelled("4", "2025-06-12", "22:00", "A"),
        ];

        let days = group_by_day(&events);

        assert_eq!(days.len(), 2);
        assert_eq!(ids(&days[&date("2025-06-10")]), ["1", "3"]);
        assert_eq!(ids(&days[&date("2025-06-11")]), ["2"]);
        assert!(days.values().all(|bucket| !bucket.is_empty()));
    }

    #[test_log::test]
    fn should_group_by_exact_venue_and_municipality() {
        let events = vec![
            at("1", "2025-06-10", "22:00", Some("La Cuesta"), "Laguna"),
            at("2", "2025-06-11", "22:00", Some("la cuesta"), "Laguna"),
            at("3", "2025-06-12", "22:00", Some("La Cuesta"), "Laguna"),
            at("4", "2025-06-12", "22:00", None, "Laguna"),
        ];

        let festivals = group_by_location(&events);

        assert_eq!(festivals.len(), 3);
        assert_eq!(
            ids(&festivals[&Festival::new(Some("La Cuesta".to_string()), "Laguna".to_string())]),
            ["1", "3"]
        );
        assert_eq!(
            ids(&festivals[&Festival::new(None, "Laguna".to_string())]),
            ["4"]
        );
    }

    #[test_log::test]
    fn should_sort_chronologically_and_keep_ties_in_order() {
        let events = vec![
            event("late", "2025-06-11", "01:00", "A"),
            event("tie-a", "2025-06-10", "22:00", "A"),
            event("early", "2025-06-10", "21:00", "A"),
            event("tie-b", "2025-06-10", "22:00", "A"),
        ];

        let sorted = sort_by_instant(&events);

        assert_eq!(ids(&sorted), ["early", "tie-a", "tie-b", "late"]);
        assert_eq!(sort_by_instant(&sorted), sorted);
    }

    #[test_log::test]
    fn should_drop_events_without_a_valid_instant_when_sorting() {
        let events = vec![
            event("bad", "2025-06-10", "??", "A"),
            event("good", "2025-06-10", "22:00", "A"),
        ];

        assert_eq!(ids(&sort_by_instant(&events)), ["good"]);
    }

    #[test_log::test]
    fn should_list_unique_recent_festivals_in_first_seen_order() {
        let events = vec![
            at("1", "2025-06-12", "22:00", Some("San Benito"), "Laguna"),
            at("2", "2025-06-01", "22:00", Some("Old"), "Arafo"),
            at("3", "2025-06-11", "22:00", None, "Arafo"),
            at("4", "2025-06-13", "22:00", Some("San Benito"), "Laguna"),
        ];

        let festivals = unique_festivals(&events, date("2025-06-10"));

        assert_eq!(
            festivals.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["San Benito, Laguna", "Arafo"]
        );
    }

    #[test_log::test]
    fn should_get_festival_events_from_the_floor_onwards() {
        let events = vec![
            at("old", "2025-06-07", "22:00", None, "Arafo"),
            at("1", "2025-06-08", "22:00", None, "Arafo"),
            at("other", "2025-06-09", "22:00", Some("Plaza"), "Arafo"),
            at("2", "2026-01-05", "22:00", None, "Arafo"),
        ];

        let festival = Festival::from_label("Arafo");

        assert_eq!(
            ids(&festival_events(&events, &festival, date("2025-06-10"))),
            ["1", "2"]
        );
    }

    #[test_log::test]
    fn should_find_the_last_update_falling_back_to_creation() {
        let mut first = event("1", "2025-06-10", "22:00", "A");
        first.added_at = Some("2025-05-01T10:00:00".to_string());
        let mut second = event("2", "2025-06-10", "22:00", "A");
        second.added_at = Some("2025-04-01T10:00:00".to_string());
        second.edited_at = Some("2025-05-02T08:30:00.000Z".to_string());
        let mut broken = event("3", "2025-06-10", "22:00", "A");
        broken.edited_at = Some("ayer".to_string());

        assert_eq!(last_update(&[first, second, broken]), "2/5/2025, 8:30:00");
        assert_eq!(last_update(&[]), "N/A");
    }

    #[test_log::test]
    fn cancelled_events_should_not_count_for_the_last_update() {
        let mut live = event("1", "2025-06-10", "22:00", "A");
        live.added_at = Some("2025-05-01T10:00:00".to_string());
        let mut suspended = cancelled("2", "2025-06-11", "22:00", "Suspendida");
        suspended.edited_at = Some("2025-06-01T12:00:00".to_string());

        assert_eq!(last_update(&[live, suspended.clone()]), "1/5/2025, 10:00:00");
        assert_eq!(last_update(&[suspended]), "N/A");
    }
}

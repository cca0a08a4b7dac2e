use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Category every plain dance falls under; it is left out of summaries.
pub const DEFAULT_CATEGORY: &str = "Baile Normal";

/// Performer entry that stands for a DJ set rather than a band.
pub const DJ_PERFORMER: &str = "DJ";

lazy_static! {
    static ref HORA_REGEX: Regex =
        Regex::new(r"^\s*(\d{1,2})\s*[:.hH]\s*(\d{2})(?:\s*:\s*(\d{2}))?\s*$").unwrap();
}

/// A verbena as stored in the realtime database.
///
/// Date and time are kept as the raw strings the database holds, so a snapshot
/// can be serialized back exactly. Parsing happens on demand and a record that
/// does not parse is simply left out of whatever view asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub day: String,
    pub hora: String,
    pub tipo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lugar: Option<String>,
    pub municipio: String,
    pub orquesta: String,
    #[serde(default)]
    pub cancelado: bool,
    #[serde(rename = "FechaAgregado", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(rename = "FechaEditado", default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        day: String,
        hora: String,
        tipo: String,
        lugar: Option<String>,
        municipio: String,
        orquesta: String,
        cancelado: bool,
    ) -> Self {
        Self {
            id,
            day,
            hora,
            tipo,
            lugar: lugar.filter(|lugar| !lugar.trim().is_empty()),
            municipio,
            orquesta,
            cancelado,
            added_at: None,
            edited_at: None,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_day(&self.day)
    }

    pub fn time(&self) -> Option<NaiveTime> {
        parse_hora(&self.hora)
    }

    /// The sortable instant formed by `day` and `hora`.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        Some(self.date()?.and_time(self.time()?))
    }

    pub fn is_active(&self) -> bool {
        !self.cancelado
    }

    pub fn has_default_category(&self) -> bool {
        self.tipo.trim() == DEFAULT_CATEGORY
    }

    /// Names listed in `orquesta`, trimmed, blanks removed. Includes "DJ".
    pub fn performers(&self) -> impl Iterator<Item = &str> {
        self.orquesta
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Performers that count towards statistics.
    pub fn counted_performers(&self) -> impl Iterator<Item = &str> {
        self.performers().filter(|name| *name != DJ_PERFORMER)
    }

    pub fn festival(&self) -> Festival {
        Festival::new(self.lugar.clone(), self.municipio.clone())
    }

    /// Last edit timestamp, falling back to the creation one.
    pub fn last_modified(&self) -> Option<&str> {
        self.edited_at.as_deref().or(self.added_at.as_deref())
    }
}

pub fn parse_day(day: &str) -> Option<NaiveDate> {
    let day = day.trim();

    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| {
            // some records carry a full timestamp in `day`
            NaiveDateTime::parse_from_str(day, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
        })
        .ok()
}

pub fn parse_hora(hora: &str) -> Option<NaiveTime> {
    let captures = HORA_REGEX.captures(hora)?;
    let hours = captures[1].parse().ok()?;
    let minutes = captures[2].parse().ok()?;
    let seconds = captures
        .get(3)
        .map_or(Some(0), |seconds| seconds.as_str().parse().ok())?;

    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

/// Venue-or-municipality key used by the festival and map views.
///
/// Equality is exact: no case folding, no accent stripping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Festival {
    pub lugar: Option<String>,
    pub municipio: String,
}

impl Festival {
    pub fn new(lugar: Option<String>, municipio: String) -> Self {
        Self {
            lugar: lugar.filter(|lugar| !lugar.is_empty()),
            municipio,
        }
    }

    /// Parses the label produced by `Display`.
    pub fn from_label(label: &str) -> Self {
        match label.rsplit_once(", ") {
            Some((lugar, municipio)) => Self::new(Some(lugar.to_string()), municipio.to_string()),
            None => Self::new(None, label.to_string()),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        event.lugar == self.lugar && event.municipio == self.municipio
    }
}

impl Display for Festival {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.lugar {
            Some(lugar) => write!(f, "{}, {}", lugar, self.municipio),
            None => write!(f, "{}", self.municipio),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::event;
    use super::*;

    #[test_log::test]
    fn should_combine_day_and_hora_into_an_instant() {
        let event = event("1", "2025-06-10", "22:30", "Los X");

        assert_eq!(
            event.instant(),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap().and_hms_opt(22, 30, 0)
        );
    }

    #[test_log::test]
    fn should_accept_seconds_and_dotted_hours() {
        assert_eq!(parse_hora("23:15:30"), NaiveTime::from_hms_opt(23, 15, 30));
        assert_eq!(parse_hora("0.30"), NaiveTime::from_hms_opt(0, 30, 0));
        assert_eq!(parse_hora("21h00"), NaiveTime::from_hms_opt(21, 0, 0));
    }

    #[test_log::test]
    fn when_hora_is_malformed_should_have_no_instant() {
        assert_eq!(event("1", "2025-06-10", "por confirmar", "A").instant(), None);
        assert_eq!(event("1", "2025-06-10", "25:00", "A").instant(), None);
        assert_eq!(event("1", "10/06/2025", "22:00", "A").instant(), None);
    }

    #[test_log::test]
    fn should_split_performers_and_skip_dj_when_counting() {
        let event = event("1", "2025-06-10", "22:00", "Los X,  Tropin , DJ,");

        assert_eq!(event.performers().collect::<Vec<_>>(), ["Los X", "Tropin", "DJ"]);
        assert_eq!(event.counted_performers().collect::<Vec<_>>(), ["Los X", "Tropin"]);
    }

    #[test_log::test]
    fn should_round_trip_festival_labels() {
        let with_venue = Festival::new(Some("La Cuesta".to_string()), "Laguna".to_string());
        let without_venue = Festival::new(None, "Arafo".to_string());

        assert_eq!(with_venue.to_string(), "La Cuesta, Laguna");
        assert_eq!(Festival::from_label("La Cuesta, Laguna"), with_venue);
        assert_eq!(Festival::from_label("Arafo"), without_venue);

        let comma_venue = Festival::new(Some("Plaza Mayor, Ermita".to_string()), "Arafo".to_string());
        assert_eq!(Festival::from_label(&comma_venue.to_string()), comma_venue);
    }

    #[test_log::test]
    fn festival_matching_should_be_exact() {
        let festival = Festival::new(Some("San Benito".to_string()), "Laguna".to_string());
        let mut other = event("1", "2025-06-10", "22:00", "A");

        other.lugar = Some("san benito".to_string());
        assert!(!festival.matches(&other));

        other.lugar = Some("San Benito".to_string());
        assert!(festival.matches(&other));
    }

    #[test_log::test]
    fn should_serialize_with_database_field_names() {
        let mut event = event("abc", "2025-06-10", "22:00", "Los X");
        event.added_at = Some("2025-05-01T10:00:00".to_string());

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["FechaAgregado"], "2025-05-01T10:00:00");
        assert_eq!(json["orquesta"], "Los X");
        assert!(json.get("lugar").is_none());
    }
}

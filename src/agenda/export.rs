use super::aggregation::{
    festival_events, filter_between, group_by_day, lookback_floor, sort_by_instant,
    WEEK_EXPORT_LOOKBACK_DAYS,
};
use super::locale;
use super::model::{Event, Festival};
use crate::places::normalize_place_name;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use std::fmt::Display;

pub const FOOTER: &str = "Más info en: https://debelingoconangel.web.app";

const BACKGROUND_BASE_URLS: [&str; 3] = [
    "https://debelingoconangel.web.app/fotos/",
    "https://debelingo.webcindario.com/",
    "http://debelingoconangel.infy.uk/fotos/",
];

/// One line of an export, e.g. `22:00H | Baile de Magos | Plaza, Arafo - Los X`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLine {
    pub hora: String,
    /// `None` for the default category.
    pub tipo: Option<String>,
    /// Venue and municipality, only shown in the weekly export.
    pub location: Option<String>,
    pub orquesta: String,
}

impl ExportLine {
    fn new(event: &Event, with_location: bool) -> Self {
        let location = with_location.then(|| match &event.lugar {
            Some(lugar) => format!("{}, {}", lugar, event.municipio),
            None => event.municipio.clone(),
        });

        Self {
            hora: event.hora.trim().to_string(),
            tipo: (!event.has_default_category()).then(|| event.tipo.clone()),
            location,
            orquesta: event.orquesta.clone(),
        }
    }
}

impl Display for ExportLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}H | ", self.hora)?;

        if let Some(tipo) = &self.tipo {
            write!(f, "{} | ", tipo)?;
        }

        match &self.location {
            Some(location) => write!(f, "{} - {}", location, self.orquesta),
            None => write!(f, "{}", self.orquesta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDay {
    pub date: NaiveDate,
    /// Uppercase long date, "SÁBADO, 14 DE JUNIO DE 2025".
    pub heading: String,
    pub lines: Vec<ExportLine>,
}

/// Text content of an exported image, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub title: String,
    pub generated_at: Option<String>,
    pub days: Vec<ExportDay>,
    pub footer: String,
    pub file_name: String,
    /// Background images to try, in order.
    pub backgrounds: Vec<String>,
}

impl ExportDocument {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.days.iter().map(|day| day.lines.len()).sum()
    }
}

impl Display for ExportDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(generated_at) = &self.generated_at {
            writeln!(f, "{}", generated_at)?;
        }

        writeln!(f, "{}", self.title)?;

        for day in &self.days {
            writeln!(f)?;
            writeln!(f, "{}", day.heading)?;

            for line in &day.lines {
                writeln!(f, "{}", line)?;
            }
        }

        writeln!(f)?;
        write!(f, "{}", self.footer)
    }
}

/// Days ascending, events within a day by time.
fn compose_days(events: &[Event], with_location: bool) -> Vec<ExportDay> {
    group_by_day(events)
        .into_iter()
        .map(|(date, day_events)| ExportDay {
            date,
            heading: locale::long_date(&date).to_uppercase(),
            lines: sort_by_instant(&day_events)
                .iter()
                .map(|event| ExportLine::new(event, with_location))
                .collect(),
        })
        .filter(|day| !day.lines.is_empty())
        .collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    /// From yesterday up to the coming Sunday (today, if it is Sunday).
    pub fn around(today: NaiveDate) -> Self {
        let days_until_sunday = match today.weekday() {
            Weekday::Sun => 0,
            weekday => 7 - u64::from(weekday.number_from_sunday() - 1),
        };

        Self {
            start: lookback_floor(today, WEEK_EXPORT_LOOKBACK_DAYS),
            end: today
                .checked_add_days(Days::new(days_until_sunday))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "VERBENAS DEL {} AL {} de {}",
            locale::day_and_month(&self.start),
            locale::day_and_month(&self.end),
            self.end.year()
        )
    }

    pub fn file_name(&self) -> String {
        format!(
            "Verbenas_{}_al_{}.png",
            locale::short_date(&self.start).replace('/', "-"),
            locale::short_date(&self.end).replace('/', "-")
        )
    }
}

pub fn compose_week_export(events: &[Event], today: NaiveDate) -> ExportDocument {
    let window = WeekWindow::around(today);
    let week_events = filter_between(events, window.start, window.end);

    ExportDocument {
        title: window.title(),
        generated_at: None,
        days: compose_days(&week_events, true),
        footer: FOOTER.to_string(),
        file_name: window.file_name(),
        backgrounds: Vec::new(),
    }
}

pub fn compose_festival_export(
    events: &[Event],
    festival: &Festival,
    now: NaiveDateTime,
) -> ExportDocument {
    let today = now.date();
    let festival_events = festival_events(events, festival, today);

    let (title, file_name) = match &festival.lugar {
        Some(lugar) => (
            format!(
                "VERBENAS {}-{}",
                lugar.to_uppercase(),
                festival.municipio.to_uppercase()
            ),
            format!("{}_{}_{}.png", lugar, festival.municipio, today.year()),
        ),
        None => (
            format!("VERBENAS {}", festival.municipio.to_uppercase()),
            format!("{}_{}.png", festival.municipio, today.year()),
        ),
    };

    ExportDocument {
        title,
        generated_at: Some(format!("Generado {}", locale::date_time(&now))),
        days: compose_days(&festival_events, false),
        footer: FOOTER.to_string(),
        file_name,
        backgrounds: background_candidates(festival),
    }
}

/// Candidate background images for a festival, most specific first.
pub fn background_candidates(festival: &Festival) -> Vec<String> {
    let lugar = normalize_place_name(festival.lugar.as_deref().unwrap_or_default());
    let municipio = normalize_place_name(&festival.municipio);
    let [primary, secondary, tertiary] = BACKGROUND_BASE_URLS;

    let mut candidates = Vec::new();

    if !lugar.is_empty() {
        for extension in ["jpg", "png"] {
            for base in BACKGROUND_BASE_URLS {
                candidates.push(format!("{base}{lugar}.{extension}"));
            }
        }
    }

    candidates.push(format!("{primary}{municipio}.jpg"));
    candidates.push(format!("{primary}{municipio}.png"));

    if !lugar.is_empty() {
        candidates.push(format!("{primary}{lugar}_{municipio}.jpg"));
    }

    candidates.push(format!("{secondary}{municipio}.jpg"));
    candidates.push(format!("{tertiary}{municipio}.jpg"));

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::model::fixtures::{at, cancelled};

    fn date(day: &str) -> NaiveDate {
        NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap()
    }

    #[test_log::test]
    fn week_window_should_run_from_yesterday_to_sunday() {
        // 2025-06-11 is a Wednesday
        let window = WeekWindow::around(date("2025-06-11"));

        assert_eq!(window.start, date("2025-06-10"));
        assert_eq!(window.end, date("2025-06-15"));
        assert_eq!(window.title(), "VERBENAS DEL 10 de junio AL 15 de junio de 2025");
        assert_eq!(window.file_name(), "Verbenas_10-6-2025_al_15-6-2025.png");
    }

    #[test_log::test]
    fn week_window_should_end_today_on_sundays() {
        let window = WeekWindow::around(date("2025-06-15"));

        assert_eq!(window.start, date("2025-06-14"));
        assert_eq!(window.end, date("2025-06-15"));
    }

    #[test_log::test]
    fn week_window_should_reach_next_sunday_from_monday() {
        let window = WeekWindow::around(date("2025-06-16"));

        assert_eq!(window.end, date("2025-06-22"));
    }

    #[test_log::test]
    fn should_compose_week_export_sorted_and_labelled() {
        let mut magos = at("2", "2025-06-14", "21:00", Some("Plaza"), "Arafo");
        magos.tipo = "Baile de Magos".to_string();
        let events = vec![
            at("1", "2025-06-14", "23:30", None, "Arafo"),
            magos,
            at("3", "2025-06-12", "22:00", Some("La Cuesta"), "Laguna"),
            cancelled("4", "2025-06-13", "22:00", "Nadie"),
            at("5", "2025-06-20", "22:00", None, "Arafo"),
        ];

        let document = compose_week_export(&events, date("2025-06-11"));

        assert_eq!(document.days.len(), 2);
        assert_eq!(document.days[0].heading, "JUEVES, 12 DE JUNIO DE 2025");
        assert_eq!(
            document.days[0].lines[0].to_string(),
            "22:00H | La Cuesta, Laguna - Orquesta Acapulco"
        );
        assert_eq!(
            document.days[1]
                .lines
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            [
                "21:00H | Baile de Magos | Plaza, Arafo - Orquesta Acapulco",
                "23:30H | Arafo - Orquesta Acapulco",
            ]
        );
        assert_eq!(document.event_count(), 3);
    }

    #[test_log::test]
    fn when_nothing_is_scheduled_the_export_should_be_empty() {
        let document = compose_week_export(&[], date("2025-06-11"));

        assert!(document.is_empty());
        assert!(document.to_string().ends_with(FOOTER));
    }

    #[test_log::test]
    fn should_compose_festival_export() {
        let events = vec![
            at("1", "2025-06-13", "22:00", Some("San Benito"), "Laguna"),
            at("2", "2025-06-12", "22:00", Some("San Benito"), "Laguna"),
            at("3", "2025-06-12", "22:00", None, "Laguna"),
        ];
        let festival = Festival::from_label("San Benito, Laguna");
        let now = date("2025-06-11").and_hms_opt(18, 0, 0).unwrap();

        let document = compose_festival_export(&events, &festival, now);

        assert_eq!(document.title, "VERBENAS SAN BENITO-LAGUNA");
        assert_eq!(document.generated_at.as_deref(), Some("Generado 11/6/2025, 18:00:00"));
        assert_eq!(document.file_name, "San Benito_Laguna_2025.png");
        assert_eq!(document.days.len(), 2);
        assert_eq!(document.days[0].lines[0].to_string(), "22:00H | Orquesta Acapulco");
        assert_eq!(document.event_count(), 2);
    }

    #[test_log::test]
    fn should_list_backgrounds_from_normalized_names() {
        let with_venue = background_candidates(&Festival::from_label("San Benito, Güímar"));
        let without_venue = background_candidates(&Festival::from_label("Güímar"));

        assert_eq!(with_venue.len(), 11);
        assert_eq!(with_venue[0], "https://debelingoconangel.web.app/fotos/sanbenito.jpg");
        assert_eq!(with_venue[8], "https://debelingoconangel.web.app/fotos/sanbenito_guimar.jpg");
        assert_eq!(
            without_venue,
            [
                "https://debelingoconangel.web.app/fotos/guimar.jpg",
                "https://debelingoconangel.web.app/fotos/guimar.png",
                "https://debelingo.webcindario.com/guimar.jpg",
                "http://debelingoconangel.infy.uk/fotos/guimar.jpg",
            ]
        );
    }
}

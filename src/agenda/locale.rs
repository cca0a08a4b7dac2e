//! Spanish (es-ES) renderings of dates, the way the dashboard shows them.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use voca_rs::case;

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub fn month_to_spanish(month: u32) -> &'static str {
    SPANISH_MONTHS[(month.clamp(1, 12) - 1) as usize]
}

pub fn weekday_to_spanish(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// "sábado, 14 de junio de 2025"
pub fn long_date(date: &NaiveDate) -> String {
    format!(
        "{}, {} de {} de {}",
        weekday_to_spanish(date.weekday()),
        date.day(),
        month_to_spanish(date.month()),
        date.year()
    )
}

/// "Sábado, 14 de junio de 2025"
pub fn day_heading(date: &NaiveDate) -> String {
    case::capitalize(&long_date(date), false)
}

/// "14 de junio"
pub fn day_and_month(date: &NaiveDate) -> String {
    format!("{} de {}", date.day(), month_to_spanish(date.month()))
}

/// "14/6/2025"
pub fn short_date(date: &NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// "14/6/2025, 9:05:00"
pub fn date_time(date_time: &NaiveDateTime) -> String {
    format!(
        "{}, {}",
        short_date(&date_time.date()),
        date_time.format("%-H:%M:%S")
    )
}

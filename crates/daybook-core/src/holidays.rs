//! Brazilian holiday calendar.
//!
//! Fixed national holidays, the Easter-derived movable ones and a set of
//! commemorative dates, computed for whatever year is asked about.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayKind {
    National,
    Regional,
    Religious,
    Commemorative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HolidayKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

const FIXED_NATIONAL: [(u32, u32, &str, &str); 9] = [
    (1, 1, "Confraternização Universal", "Ano Novo"),
    (4, 21, "Tiradentes", "Dia de Tiradentes"),
    (5, 1, "Dia do Trabalhador", "Dia do Trabalho"),
    (9, 7, "Independência do Brasil", "Dia da Independência"),
    (10, 12, "Nossa Senhora Aparecida", "Padroeira do Brasil"),
    (11, 2, "Finados", "Dia de Finados"),
    (11, 15, "Proclamação da República", "Proclamação da República"),
    (11, 20, "Consciência Negra", "Dia da Consciência Negra"),
    (12, 25, "Natal", "Nascimento de Jesus Cristo"),
];

const FIXED_COMMEMORATIVE: [(u32, u32, &str, &str); 5] = [
    (2, 14, "Dia dos Namorados", "Dia de São Valentim"),
    (3, 8, "Dia Internacional da Mulher", "Dia da Mulher"),
    (6, 12, "Dia dos Namorados", "Dia dos Namorados no Brasil"),
    (10, 12, "Dia das Crianças", "Dia das Crianças"),
    (10, 31, "Halloween", "Dia das Bruxas"),
];

/// Easter Sunday (Gregorian computus).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn holiday(date: NaiveDate, name: &str, kind: HolidayKind, description: &str) -> Holiday {
    Holiday {
        date,
        name: name.to_string(),
        kind,
        description: Some(description.to_string()),
    }
}

/// All holidays of `year`, sorted by date.
///
/// Dates shared by two entries keep national holidays first.
pub fn holidays_in_year(year: i32) -> Vec<Holiday> {
    let mut holidays = Vec::new();

    for (month, day, name, description) in FIXED_NATIONAL {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            holidays.push(holiday(date, name, HolidayKind::National, description));
        }
    }

    if let Some(easter) = easter_sunday(year) {
        holidays.push(holiday(
            easter - Duration::days(47),
            "Carnaval",
            HolidayKind::National,
            "Terça-feira de Carnaval",
        ));
        holidays.push(holiday(
            easter - Duration::days(2),
            "Sexta-feira Santa",
            HolidayKind::National,
            "Paixão de Cristo",
        ));
        holidays.push(holiday(
            easter + Duration::days(60),
            "Corpus Christi",
            HolidayKind::National,
            "Corpo de Cristo",
        ));
    }

    for (month, day, name, description) in FIXED_COMMEMORATIVE {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            holidays.push(holiday(date, name, HolidayKind::Commemorative, description));
        }
    }
    if let Some(date) = nth_weekday(year, 5, Weekday::Sun, 2) {
        holidays.push(holiday(
            date,
            "Dia das Mães",
            HolidayKind::Commemorative,
            "Segundo domingo de maio",
        ));
    }
    if let Some(date) = nth_weekday(year, 8, Weekday::Sun, 2) {
        holidays.push(holiday(
            date,
            "Dia dos Pais",
            HolidayKind::Commemorative,
            "Segundo domingo de agosto",
        ));
    }

    // Stable sort keeps national entries ahead of same-day commemorative ones.
    holidays.sort_by_key(|h| h.date);
    holidays
}

/// The first holiday falling on `date`.
pub fn holiday_on(date: NaiveDate) -> Option<Holiday> {
    holidays_in_year(date.year())
        .into_iter()
        .find(|h| h.date == date)
}

pub fn is_holiday(date: NaiveDate) -> bool {
    holiday_on(date).is_some()
}

/// Holidays in `month` (1-12) of `year`.
pub fn in_month(year: i32, month: u32) -> Vec<Holiday> {
    holidays_in_year(year)
        .into_iter()
        .filter(|h| h.date.month() == month)
        .collect()
}

/// The next `count` holidays on or after `from`, crossing into the next year if needed.
pub fn upcoming(from: NaiveDate, count: usize) -> Vec<Holiday> {
    holidays_in_year(from.year())
        .into_iter()
        .chain(holidays_in_year(from.year() + 1))
        .filter(|h| h.date >= from)
        .take(count)
        .collect()
}

pub fn of_kind(year: i32, kind: HolidayKind) -> Vec<Holiday> {
    holidays_in_year(year)
        .into_iter()
        .filter(|h| h.kind == kind)
        .collect()
}

/// Weekdays between `start` and `end` (inclusive) that are not holidays.
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0;
    let mut year = None;
    let mut year_holidays = Vec::new();
    for day in start.iter_days().take_while(|d| *d <= end) {
        if year != Some(day.year()) {
            year = Some(day.year());
            year_holidays = holidays_in_year(day.year())
                .into_iter()
                .map(|h| h.date)
                .collect();
        }
        let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);
        if !weekend && !year_holidays.contains(&day) {
            count += 1;
        }
    }
    count
}

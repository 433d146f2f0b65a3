//! Is the guest asking about a change, or telling us exactly what to change?
//!
//! Two independent detectors run over every message: extraction of
//! concrete values (time, date, party size) and detection of change-intent
//! phrasing. Concrete values take precedence: a message that names any
//! new value is a command, whatever its phrasing.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use maitre_common::{
    Language, ReservationSummary, RestaurantConfig, format_time, parse_time, today_in_timezone,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageIntent {
    /// "Can I change my booking?" with nothing concrete
    GeneralQuestion,
    /// At least one concrete new value was given
    SpecificCommand,
    Unclear,
}

/// Concrete new values found in a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedChanges {
    /// `HH:MM`
    pub time: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub guests: Option<u32>,
}

impl RequestedChanges {
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.date.is_none() && self.guests.is_none()
    }

    /// True when every requested value equals what the reservation already has
    pub fn is_noop(&self, current: &ReservationSummary) -> bool {
        if self.is_empty() {
            return false;
        }
        let same_time = self.time.as_deref().is_none_or(|t| {
            parse_time(t).zip(parse_time(&current.time)).is_some_and(|(a, b)| a == b)
        });
        let same_date = self.date.as_deref().is_none_or(|d| d == current.date);
        let same_guests = self.guests.is_none_or(|g| g == current.guests);
        same_time && same_date && same_guests
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAnalysis {
    pub intent: MessageIntent,
    pub changes: RequestedChanges,
    pub wants_cancellation: bool,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("message analysis regex is valid")
}

static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b([01]?\d|2[0-3])[:.]([0-5]\d)\b"));

static AM_PM_TIME: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(1[0-2]|0?[1-9])(?::([0-5]\d))?\s*(am|pm)\b"));

/// "at 19", "в 19", "um 19 Uhr", "à 19h" ...
static HOUR_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)(?:\bat|\bв|\bu|\bum|\bà|\ba las|\balle|\bàs|\bom|\bkor)\s+([01]?\d|2[0-3])(?:\s*(?:h|uhr|uur|óra|ч|час\w*|o'clock))?\b")
});

/// Words that turn a following number into a clock time
const TIME_PREPOSITIONS: &[&str] = &["at", "в", "u", "um", "à", "las", "alle", "às", "om", "kor"];

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(\d{4}-\d{2}-\d{2})\b"));

/// `15.07`, `15/07`, `15.07.2030`: day first
static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{1,2})([./])(\d{1,2})(?:[./](\d{4}|\d{2}))?\b"));

/// `15 July`, `15th of July`, `15. Juli`, `15 de julio de 2030`
static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b(\d{1,2})(?:st|nd|rd|th|er|\.|-?го)?\s+(?:of\s+|de\s+)?(\p{L}+)(?:,?\s+(?:de\s+)?(\d{4}))?")
});

/// `July 15`, `July 15th, 2030`, `július 15-én`
static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b(\p{L}+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4}))?")
});

static GUEST_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\b(\d{1,2})\s*(?:people|persons?|guests?|pax|ppl|человек\w*|гост\w*|персон\w*|osob\w*|ljud\w*|gost\w*|fő|fős|személy\w*|personen|gäste?n?|personnes?|personas?|persone|pessoas?|gasten|mensen)\b|\bparty of\s+(\d{1,2})\b|\btable for\s+(\d{1,2})\b",
    )
});

/// Relative day words resolved against the restaurant's calendar
const RELATIVE_DAYS: &[(Language, &[(&str, i64)])] = &[
    (Language::En, &[("today", 0), ("tonight", 0), ("tomorrow", 1)]),
    (Language::Ru, &[("сегодня", 0), ("завтра", 1), ("послезавтра", 2)]),
    (Language::Sr, &[("danas", 0), ("večeras", 0), ("sutra", 1), ("prekosutra", 2)]),
    (Language::Hu, &[("ma", 0), ("ma este", 0), ("holnap", 1), ("holnapután", 2)]),
    (Language::De, &[("heute", 0), ("morgen", 1), ("übermorgen", 2)]),
    (Language::Fr, &[("aujourd'hui", 0), ("ce soir", 0), ("demain", 1)]),
    (Language::Es, &[("hoy", 0), ("esta noche", 0), ("mañana", 1)]),
    (Language::It, &[("oggi", 0), ("stasera", 0), ("domani", 1)]),
    (Language::Pt, &[("hoje", 0), ("amanhã", 1)]),
    (Language::Nl, &[("vandaag", 0), ("vanavond", 0), ("morgen", 1)]),
];

const MONTH_NAMES: &[(Language, &[(&str, u32)])] = &[
    (Language::En, &[
        ("january", 1), ("jan", 1), ("february", 2), ("feb", 2), ("march", 3), ("mar", 3),
        ("april", 4), ("apr", 4), ("may", 5), ("june", 6), ("jun", 6), ("july", 7), ("jul", 7),
        ("august", 8), ("aug", 8), ("september", 9), ("sept", 9), ("sep", 9), ("october", 10),
        ("oct", 10), ("november", 11), ("nov", 11), ("december", 12), ("dec", 12),
    ]),
    (Language::Ru, &[
        ("января", 1), ("январь", 1), ("февраля", 2), ("февраль", 2), ("марта", 3), ("март", 3),
        ("апреля", 4), ("апрель", 4), ("мая", 5), ("май", 5), ("июня", 6), ("июнь", 6),
        ("июля", 7), ("июль", 7), ("августа", 8), ("август", 8), ("сентября", 9),
        ("сентябрь", 9), ("октября", 10), ("октябрь", 10), ("ноября", 11), ("ноябрь", 11),
        ("декабря", 12), ("декабрь", 12),
    ]),
    (Language::Sr, &[
        ("januar", 1), ("januara", 1), ("januaru", 1), ("februar", 2), ("februara", 2),
        ("februaru", 2), ("mart", 3), ("marta", 3), ("martu", 3), ("april", 4), ("aprila", 4),
        ("aprilu", 4), ("maj", 5), ("maja", 5), ("maju", 5), ("jun", 6), ("juna", 6),
        ("junu", 6), ("jul", 7), ("jula", 7), ("julu", 7), ("avgust", 8), ("avgusta", 8),
        ("avgustu", 8), ("septembar", 9), ("septembra", 9), ("septembru", 9), ("oktobar", 10),
        ("oktobra", 10), ("oktobru", 10), ("novembar", 11), ("novembra", 11), ("novembru", 11),
        ("decembar", 12), ("decembra", 12), ("decembru", 12),
    ]),
    (Language::Hu, &[
        ("január", 1), ("február", 2), ("március", 3), ("április", 4), ("május", 5),
        ("június", 6), ("július", 7), ("augusztus", 8), ("szeptember", 9), ("október", 10),
        ("november", 11), ("december", 12),
    ]),
    (Language::De, &[
        ("januar", 1), ("jänner", 1), ("februar", 2), ("märz", 3), ("april", 4), ("mai", 5),
        ("juni", 6), ("juli", 7), ("august", 8), ("september", 9), ("oktober", 10),
        ("november", 11), ("dezember", 12),
    ]),
    (Language::Fr, &[
        ("janvier", 1), ("février", 2), ("mars", 3), ("avril", 4), ("mai", 5), ("juin", 6),
        ("juillet", 7), ("août", 8), ("septembre", 9), ("octobre", 10), ("novembre", 11),
        ("décembre", 12),
    ]),
    (Language::Es, &[
        ("enero", 1), ("febrero", 2), ("marzo", 3), ("abril", 4), ("mayo", 5), ("junio", 6),
        ("julio", 7), ("agosto", 8), ("septiembre", 9), ("setiembre", 9), ("octubre", 10),
        ("noviembre", 11), ("diciembre", 12),
    ]),
    (Language::It, &[
        ("gennaio", 1), ("febbraio", 2), ("marzo", 3), ("aprile", 4), ("maggio", 5),
        ("giugno", 6), ("luglio", 7), ("agosto", 8), ("settembre", 9), ("ottobre", 10),
        ("novembre", 11), ("dicembre", 12),
    ]),
    (Language::Pt, &[
        ("janeiro", 1), ("fevereiro", 2), ("março", 3), ("abril", 4), ("maio", 5), ("junho", 6),
        ("julho", 7), ("agosto", 8), ("setembro", 9), ("outubro", 10), ("novembro", 11),
        ("dezembro", 12),
    ]),
    (Language::Nl, &[
        ("januari", 1), ("februari", 2), ("maart", 3), ("april", 4), ("mei", 5), ("juni", 6),
        ("juli", 7), ("augustus", 8), ("september", 9), ("oktober", 10), ("november", 11),
        ("december", 12),
    ]),
];

/// A day of the month with no month: "the 20th", "20-го", "am 20."
const ORDINAL_DAYS: &[(Language, &str)] = &[
    (Language::En, r"\b(\d{1,2})(?:st|nd|rd|th)\b"),
    (Language::Ru, r"\b(\d{1,2})-?(?:го|е)\b"),
    (Language::Sr, r"\b(\d{1,2})-og\b"),
    (Language::Hu, r"\b(\d{1,2})-(?:án|én|a|e)\b"),
    (Language::De, r"\b(?:am|zum|den)\s+(\d{1,2})\.(?:\s|$)"),
    (Language::Fr, r"\ble\s+(\d{1,2})(?:er)?\b"),
    (Language::Es, r"\bel\s+(?:día\s+)?(\d{1,2})\b"),
    (Language::It, r"\bil\s+(\d{1,2})\b"),
    (Language::Pt, r"\bdia\s+(\d{1,2})\b"),
    (Language::Nl, r"\bde\s+(\d{1,2})(?:e|ste|de)\b"),
];

static ORDINAL_REGEXES: LazyLock<Vec<(Language, Regex)>> = LazyLock::new(|| {
    ORDINAL_DAYS
        .iter()
        .map(|(lang, p)| (*lang, compile(&format!("(?i){}", p))))
        .collect()
});

const CHANGE_PHRASES: &[(Language, &str)] = &[
    (Language::En, r"\b(change|modify|move|reschedule|update|edit|adjust)\b"),
    (Language::Ru, r"измен|перенес|поменя|передвин"),
    (Language::Sr, r"promen|izmen|pomer|prebac|промен|измен"),
    (Language::Hu, r"módosít|változtat|áthelyez|átrak"),
    (Language::De, r"änder|verschieb|umbuch|verleg"),
    (Language::Fr, r"modifi|chang|déplac|décal"),
    (Language::Es, r"cambi|modific|mover"),
    (Language::It, r"cambi|modific|spost"),
    (Language::Pt, r"mud|alter|modific"),
    (Language::Nl, r"wijzig|verander|verplaats|aanpass"),
];

const CANCEL_PHRASES: &[(Language, &str)] = &[
    (Language::En, r"\b(cancel|call off)\b"),
    (Language::Ru, r"отмен|аннулир"),
    (Language::Sr, r"otkaz|otkaž|poništ|откаж|отказ"),
    (Language::Hu, r"lemond|töröl"),
    (Language::De, r"stornier|absagen|\bsage\b.*\bab\b"),
    (Language::Fr, r"annul"),
    (Language::Es, r"cancel|anul"),
    (Language::It, r"annull|cancell|disdic|disdire"),
    (Language::Pt, r"cancel|desmarc"),
    (Language::Nl, r"annuleer|annuleren|afzeggen|zeg.*af"),
];

static CHANGE_REGEXES: LazyLock<Vec<(Language, Regex)>> = LazyLock::new(|| {
    CHANGE_PHRASES
        .iter()
        .map(|(lang, p)| (*lang, compile(&format!("(?i){}", p))))
        .collect()
});

static CANCEL_REGEXES: LazyLock<Vec<(Language, Regex)>> = LazyLock::new(|| {
    CANCEL_PHRASES
        .iter()
        .map(|(lang, p)| (*lang, compile(&format!("(?i){}", p))))
        .collect()
});

/// English patterns always apply; guests mix languages
fn matches_any(table: &[(Language, Regex)], message: &str, language: Language) -> bool {
    table
        .iter()
        .filter(|(lang, _)| *lang == language || *lang == Language::En)
        .any(|(_, re)| re.is_match(message))
}

pub fn has_change_intent(message: &str, language: Language) -> bool {
    matches_any(&CHANGE_REGEXES, message, language)
}

pub fn has_cancel_intent(message: &str, language: Language) -> bool {
    matches_any(&CANCEL_REGEXES, message, language)
}

/// `None` means every language's table applies
fn in_scope(lang: Language, language: Option<Language>) -> bool {
    language.is_none_or(|l| lang == l || lang == Language::En)
}

/// A date written in the message; missing parts are filled in when resolving
#[derive(Debug, Clone, PartialEq, Eq)]
struct DateMention {
    span: Range<usize>,
    day: u32,
    month: Option<u32>,
    year: Option<i32>,
}

impl DateMention {
    /// Omitted year or month means the next occurrence on or after `today`
    fn resolve(&self, today: NaiveDate) -> Option<NaiveDate> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => NaiveDate::from_ymd_opt(year, month, self.day),
            (Some(month), None) => (0..=4)
                .filter_map(|offset| NaiveDate::from_ymd_opt(today.year() + offset, month, self.day))
                .find(|date| *date >= today),
            (None, _) => (0..12)
                .filter_map(|offset| {
                    let index = today.month0() + offset;
                    NaiveDate::from_ymd_opt(today.year() + (index / 12) as i32, index % 12 + 1, self.day)
                })
                .find(|date| *date >= today),
        }
    }
}

fn month_number(word: &str, language: Option<Language>) -> Option<u32> {
    let word = word.to_lowercase();
    MONTH_NAMES
        .iter()
        .filter(|(lang, _)| in_scope(*lang, language))
        .flat_map(|(_, names)| names.iter())
        .find(|(name, _)| *name == word)
        .map(|(_, month)| *month)
}

fn parse_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn follows_time_preposition(before: &str) -> bool {
    before
        .split_whitespace()
        .next_back()
        .is_some_and(|word| TIME_PREPOSITIONS.contains(&word.to_lowercase().as_str()))
}

/// "May 4 people" is a party size, not the fourth of May
fn starts_guest_count(message: &str, at: usize) -> bool {
    GUEST_COUNT
        .find_at(message, at)
        .is_some_and(|m| m.start() == at)
}

fn numeric_dates(message: &str) -> Vec<DateMention> {
    NUMERIC_DATE
        .captures_iter(message)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let mut day: u32 = caps.get(1)?.as_str().parse().ok()?;
            let separator = caps.get(2)?.as_str();
            let mut month: u32 = caps.get(3)?.as_str().parse().ok()?;
            let year = match caps.get(4) {
                Some(y) => Some(parse_year(y.as_str())?),
                None => None,
            };
            if separator == "/" && month > 12 && day <= 12 {
                std::mem::swap(&mut day, &mut month);
            }
            if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
                return None;
            }
            // "at 12.05" is a clock time
            if separator == "." && year.is_none() && follows_time_preposition(&message[..whole.start()]) {
                return None;
            }
            Some(DateMention {
                span: whole.range(),
                day,
                month: Some(month),
                year,
            })
        })
        .collect()
}

fn month_name_dates(message: &str, language: Option<Language>) -> Vec<DateMention> {
    let day_first = DAY_MONTH.captures_iter(message).filter_map(|caps| {
        let month = month_number(caps.get(2)?.as_str(), language)?;
        Some(DateMention {
            span: caps.get(0)?.range(),
            day: caps.get(1)?.as_str().parse().ok()?,
            month: Some(month),
            year: caps.get(3).and_then(|y| parse_year(y.as_str())),
        })
    });
    let month_first = MONTH_DAY.captures_iter(message).filter_map(|caps| {
        let month = month_number(caps.get(1)?.as_str(), language)?;
        let day = caps.get(2)?;
        if starts_guest_count(message, day.start()) {
            return None;
        }
        Some(DateMention {
            span: caps.get(0)?.range(),
            day: day.as_str().parse().ok()?,
            month: Some(month),
            year: caps.get(3).and_then(|y| parse_year(y.as_str())),
        })
    });
    day_first
        .chain(month_first)
        .filter(|m| (1..=31).contains(&m.day))
        .collect()
}

fn ordinal_dates(message: &str, language: Option<Language>, taken: &[DateMention]) -> Vec<DateMention> {
    ORDINAL_REGEXES
        .iter()
        .filter(|(lang, _)| in_scope(*lang, language))
        .flat_map(|(_, re)| re.captures_iter(message))
        .filter_map(|caps| {
            let day = caps.get(1)?;
            if starts_guest_count(message, day.start()) {
                return None;
            }
            Some(DateMention {
                span: caps.get(0)?.range(),
                day: day.as_str().parse().ok()?,
                month: None,
                year: None,
            })
        })
        .filter(|m| (1..=31).contains(&m.day))
        // "15th of July" is already a full date
        .filter(|m| {
            !taken
                .iter()
                .any(|t| m.span.start < t.span.end && t.span.start < m.span.end)
        })
        .collect()
}

/// Explicit dates in the order they should be tried
fn date_mentions(message: &str, language: Option<Language>) -> Vec<DateMention> {
    let mut mentions = numeric_dates(message);
    mentions.extend(month_name_dates(message, language));
    let ordinals = ordinal_dates(message, language, &mentions);
    mentions.extend(ordinals);
    mentions
}

/// Blank out written dates so "15.07" is not read as 15:07
fn mask_dates(message: &str) -> String {
    let mut masked = message.to_string();
    let spans = ISO_DATE
        .find_iter(message)
        .map(|m| m.range())
        .chain(date_mentions(message, None).into_iter().map(|m| m.span));
    for span in spans {
        let blank = " ".repeat(span.len());
        masked.replace_range(span, &blank);
    }
    masked
}

/// The time in the message, and whether it was a bare hour such as "at 8"
fn find_time(message: &str) -> Option<(NaiveTime, bool)> {
    let message = mask_dates(message);
    if let Some(caps) = AM_PM_TIME.captures(&message) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0).map(|t| (t, false));
    }
    if let Some(caps) = CLOCK_TIME.captures(&message) {
        let raw = format!("{}:{}", caps.get(1)?.as_str(), caps.get(2)?.as_str());
        return parse_time(&raw).map(|t| (t, false));
    }
    HOUR_ONLY
        .captures(&message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .and_then(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .map(|t| (t, true))
}

/// The time as written; a bare "at 8" stays 08:00
pub fn extract_time(message: &str) -> Option<String> {
    find_time(message).map(|(time, _)| format_time(time))
}

/// Like [`extract_time`], but a bare hour from 1 to 11 is read as evening
/// when only the evening reading falls inside opening hours
pub fn extract_time_for(message: &str, restaurant: &RestaurantConfig) -> Option<String> {
    let (time, bare) = find_time(message)?;
    let time = if bare { resolve_bare_hour(time, restaurant) } else { time };
    Some(format_time(time))
}

fn resolve_bare_hour(time: NaiveTime, restaurant: &RestaurantConfig) -> NaiveTime {
    if !(1..=11).contains(&time.hour()) {
        return time;
    }
    match NaiveTime::from_hms_opt(time.hour() + 12, time.minute(), 0) {
        Some(evening) if !restaurant.is_open_at(time) && restaurant.is_open_at(evening) => evening,
        _ => time,
    }
}

pub fn extract_date(message: &str, language: Language, timezone: &str) -> Option<String> {
    if let Some(m) = ISO_DATE.captures(message).and_then(|c| c.get(1)) {
        if NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").is_ok() {
            return Some(m.as_str().to_string());
        }
    }

    let today = today_in_timezone(timezone);
    if let Some(date) = date_mentions(message, Some(language))
        .iter()
        .find_map(|mention| mention.resolve(today))
    {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();
    let joined = words.join(" ");

    // Longest phrase first so "послезавтра" wins over "завтра"
    let mut candidates: Vec<(&str, i64)> = RELATIVE_DAYS
        .iter()
        .filter(|(lang, _)| *lang == language || *lang == Language::En)
        .flat_map(|(_, days)| days.iter().copied())
        .collect();
    candidates.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.chars().count()));

    candidates
        .into_iter()
        .find(|(phrase, _)| {
            if phrase.contains(' ') {
                joined.contains(phrase)
            } else {
                words.contains(phrase)
            }
        })
        .map(|(_, offset)| (today + Duration::days(offset)).format("%Y-%m-%d").to_string())
}

pub fn extract_guests(message: &str) -> Option<u32> {
    GUEST_COUNT.captures(message).and_then(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|g| *g > 0)
    })
}

pub fn extract_changes(message: &str, language: Language, restaurant: &RestaurantConfig) -> RequestedChanges {
    RequestedChanges {
        time: extract_time_for(message, restaurant),
        date: extract_date(message, language, &restaurant.timezone),
        guests: extract_guests(message),
    }
}

/// Classify one guest message for the modification flow
pub fn analyze_user_message(
    message: &str,
    language: Language,
    restaurant: &RestaurantConfig,
) -> MessageAnalysis {
    let changes = extract_changes(message, language, restaurant);
    let intent = if !changes.is_empty() {
        MessageIntent::SpecificCommand
    } else if has_change_intent(message, language) {
        MessageIntent::GeneralQuestion
    } else {
        MessageIntent::Unclear
    };

    MessageAnalysis {
        intent,
        changes,
        wants_cancellation: has_cancel_intent(message, language),
    }
}

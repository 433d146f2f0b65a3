//! Ranking of alternative time slots

use crate::locale::{self, Text};
use chrono::{NaiveTime, Timelike};
use maitre_common::{Language, MAX_PRESENTED_ALTERNATIVES, format_time, minutes_between};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Earlier,
    Later,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// Morning before 12:00, afternoon until 17:00, evening after
    pub fn of(time: NaiveTime) -> Self {
        match time.hour() {
            0..=11 => DayPart::Morning,
            12..=16 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }
}

/// What the guest said about acceptable times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePreference {
    pub direction: Option<Direction>,
    pub day_part: Option<DayPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub date: String,
    pub time: String,
    pub score: f64,
    pub justification: String,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("preference regex is valid")
}

static EARLIER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\bearlier\b|\bsooner\b|раньше|ranije|korábban|früher|plus tôt|más temprano|antes|prima|\beerder\b")
});
static LATER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\blater\b|позже|позднее|kasnije|később|später|plus tard|más tarde|\bdopo\b|più tardi|mais tarde")
});
static MORNING: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\bmorning\b|утр|\bujutr|\bjutro|reggel|morgens|vormittag|\bmatin\b|mañana por la|\bmattin|\bmanhã\b|ochtend")
});
static AFTERNOON: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\bafternoon\b|\blunch\b|днём|днем|обед|popodne|ručak|délután|ebéd|nachmittag|mittag|après-midi|déjeuner|\btarde\b|almuerzo|pomeriggio|pranzo|almoço|middag")
});
static EVENING: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\bevening\b|\bdinner\b|\btonight\b|вечер|ужин|\bveče|večer|večeras|vacsor|abend|\bsoir|dîner|\bnoche\b|\bcena\b|\bsera\b|\bnoite\b|jantar|\bavond|diner")
});

/// Read direction and time-of-day wishes from the guest's message
pub fn parse_preference(message: &str) -> TimePreference {
    let direction = match (EARLIER.is_match(message), LATER.is_match(message)) {
        (true, false) => Some(Direction::Earlier),
        (false, true) => Some(Direction::Later),
        _ => None,
    };
    let day_part = [
        (&*MORNING, DayPart::Morning),
        (&*AFTERNOON, DayPart::Afternoon),
        (&*EVENING, DayPart::Evening),
    ]
    .into_iter()
    .find(|(re, _)| re.is_match(message))
    .map(|(_, part)| part);

    TimePreference { direction, day_part }
}

fn in_prime_window(time: NaiveTime) -> bool {
    let minutes = time.hour() * 60 + time.minute();
    (18 * 60..=20 * 60).contains(&minutes)
}

/// 100 minus a tenth of the distance in minutes, adjusted for preferences
pub fn score_alternative(original: NaiveTime, candidate: NaiveTime, preference: &TimePreference) -> f64 {
    let mut score = 100.0 - minutes_between(original, candidate) as f64 / 10.0;

    if preference.day_part == Some(DayPart::of(candidate)) {
        score += 20.0;
    }
    let violates = match preference.direction {
        Some(Direction::Earlier) => candidate > original,
        Some(Direction::Later) => candidate < original,
        None => false,
    };
    if violates {
        score -= 30.0;
    }
    if in_prime_window(candidate) {
        score += 10.0;
    }
    score
}

fn justification(original: NaiveTime, candidate: NaiveTime) -> Text {
    if in_prime_window(candidate) {
        Text::JustPrime
    } else if candidate.hour() < 18 && candidate < original {
        Text::JustIntimate
    } else if candidate.hour() >= 21 {
        Text::JustLate
    } else {
        Text::JustClosest
    }
}

/// Score every candidate and keep the best few, highest first
pub fn rank_alternatives(
    original: NaiveTime,
    date: &str,
    candidates: &[NaiveTime],
    preference: &TimePreference,
    language: Language,
) -> Vec<RankedAlternative> {
    let mut scored: Vec<(NaiveTime, f64)> = candidates
        .iter()
        .map(|t| (*t, score_alternative(original, *t, preference)))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.dedup_by_key(|(t, _)| *t);

    scored
        .into_iter()
        .take(MAX_PRESENTED_ALTERNATIVES)
        .map(|(time, score)| RankedAlternative {
            date: date.to_string(),
            time: format_time(time),
            score,
            justification: locale::text(language, justification(original, time)).to_string(),
        })
        .collect()
}

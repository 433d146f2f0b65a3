//! Which name did the guest pick?
//!
//! When a returning guest books under a different name than the one on
//! their profile, Sofia asks which one to use. Replies run through an
//! ordered cascade of pure matchers; the first that recognises a choice wins.
//! The reply that brings the unrecognised count to `max_attempts` books under
//! the requested name, so at most `max_attempts` questions are ever asked.

use crate::state::PendingConfirmation;
use maitre_common::{BookingRequest, FUZZY_NAME_MAX_DISTANCE, Language, levenshtein};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Exact,
    Substring,
    Phrase,
    YesNo,
    Fuzzy,
    Ordinal,
}

impl MatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStage::Exact => "exact",
            MatchStage::Substring => "substring",
            MatchStage::Phrase => "phrase",
            MatchStage::YesNo => "yes_no",
            MatchStage::Fuzzy => "fuzzy",
            MatchStage::Ordinal => "ordinal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    /// The name on the stored profile
    Stored,
    /// The name given in this conversation
    Requested,
}

/// Outcome of one clarification reply
#[derive(Debug, Clone, PartialEq)]
pub enum NameResolution {
    Resolved {
        name: String,
        stage: MatchStage,
        booking: BookingRequest,
    },
    /// Still ambiguous; ask again with the updated attempt counter
    Clarify { pending: PendingConfirmation },
    /// Attempts exhausted; proceed with the requested name
    Fallback { name: String, booking: BookingRequest },
}

struct Candidates {
    stored: String,
    requested: String,
}

type Matcher = fn(&Candidates, &str, Language) -> Option<Choice>;

const CASCADE: &[(MatchStage, Matcher)] = &[
    (MatchStage::Exact, match_exact),
    (MatchStage::Substring, match_substring),
    (MatchStage::Phrase, match_phrase),
    (MatchStage::YesNo, match_yes_no),
    (MatchStage::Fuzzy, match_fuzzy),
    (MatchStage::Ordinal, match_ordinal),
];

/// Advance the pending confirmation with the guest's reply
pub fn resolve_pending_confirmation(pending: PendingConfirmation, reply: &str) -> NameResolution {
    let candidates = Candidates {
        stored: normalize(&pending.db_name),
        requested: normalize(&pending.request_name),
    };
    let reply_norm = normalize(reply);
    let language = pending.original_context.language;

    // Only the first question is a yes/no one; the re-asks offer two names
    let yes_no_applies = pending.attempts == 0;
    let matched = CASCADE
        .iter()
        .filter(|(stage, _)| *stage != MatchStage::YesNo || yes_no_applies)
        .find_map(|(stage, matcher)| {
            matcher(&candidates, &reply_norm, language).map(|choice| (*stage, choice))
        });

    match matched {
        Some((stage, choice)) => {
            let name = match choice {
                Choice::Stored => pending.db_name.clone(),
                Choice::Requested => pending.request_name.clone(),
            };
            NameResolution::Resolved {
                booking: with_name(&pending.original_booking, &name),
                name,
                stage,
            }
        }
        None => {
            let pending = pending.record_unmatched_reply();
            if pending.is_exhausted() {
                NameResolution::Fallback {
                    booking: with_name(&pending.original_booking, &pending.request_name),
                    name: pending.request_name,
                }
            } else {
                NameResolution::Clarify { pending }
            }
        }
    }
}

fn with_name(booking: &BookingRequest, name: &str) -> BookingRequest {
    BookingRequest {
        guest_name: name.to_string(),
        ..booking.clone()
    }
}

/// Lowercase, strip punctuation, collapse whitespace
fn normalize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn pick(stored: bool, requested: bool) -> Option<Choice> {
    match (stored, requested) {
        (true, false) => Some(Choice::Stored),
        (false, true) => Some(Choice::Requested),
        _ => None,
    }
}

fn match_exact(c: &Candidates, reply: &str, _: Language) -> Option<Choice> {
    pick(reply == c.stored, reply == c.requested)
}

/// Whole-word containment: "ed" is not in "need"
fn contains_name(reply: &[&str], name: &str) -> bool {
    let name: Vec<&str> = name.split(' ').collect();
    !name.is_empty() && reply.windows(name.len()).any(|window| window == name.as_slice())
}

fn match_substring(c: &Candidates, reply: &str, _: Language) -> Option<Choice> {
    let tokens: Vec<&str> = reply.split(' ').collect();
    let in_reply = (contains_name(&tokens, &c.stored), contains_name(&tokens, &c.requested));
    match in_reply {
        // One name contains the other ("anna" / "anna smith"): the longer one was meant
        (true, true) if c.stored.len() != c.requested.len() => {
            Some(if c.stored.len() > c.requested.len() {
                Choice::Stored
            } else {
                Choice::Requested
            })
        }
        (true, true) => None,
        (stored, requested) if stored || requested => pick(stored, requested),
        _ if reply.chars().count() >= 3 => {
            // A partial name such as just the first name
            let partial = |name: &str| name.split(' ').any(|token| token == reply);
            pick(partial(&c.stored), partial(&c.requested))
        }
        _ => None,
    }
}

static PHRASES: LazyLock<Vec<(Language, Regex, Choice)>> = LazyLock::new(|| {
    let table: &[(Language, &str, Choice)] = &[
        (Language::En, r"\b(new|this|latest|different)\b.*\bname\b|\bnew one\b|\bname i (just )?(gave|said)\b", Choice::Requested),
        (Language::En, r"\b(old|previous|original|usual|existing|same|profile)\b", Choice::Stored),
        (Language::Ru, r"нов(ое|ый|ую)|тольк(о|о что)\s+назвал", Choice::Requested),
        (Language::Ru, r"стар(ое|ый|ую)|прежн|прошл|как раньше|как обычно", Choice::Stored),
        (Language::Sr, r"\bnov(o|i|im)\b", Choice::Requested),
        (Language::Sr, r"\bstar(o|i|im)\b|prethodn|\bkao ranije\b|\bisto\b", Choice::Stored),
        (Language::Hu, r"\búj\b", Choice::Requested),
        (Language::Hu, r"\brégi\b|\bkorábbi\b|\bugyanaz\b", Choice::Stored),
        (Language::De, r"\bneu(e|en)?\b", Choice::Requested),
        (Language::De, r"\balt(e|en)?\b|\bbisherig|\bgleich(e|en)?\b", Choice::Stored),
        (Language::Fr, r"\bnouveau\b|\bnouvel\b", Choice::Requested),
        (Language::Fr, r"\bancien\b|\bm[eê]me\b|\bhabituel\b", Choice::Stored),
        (Language::Es, r"\bnuevo\b", Choice::Requested),
        (Language::Es, r"\banterior\b|\bviejo\b|\bmismo\b|\bde siempre\b", Choice::Stored),
        (Language::It, r"\bnuovo\b", Choice::Requested),
        (Language::It, r"\bvecchio\b|\bprecedente\b|\bstesso\b|\bsolito\b", Choice::Stored),
        (Language::Pt, r"\bnovo\b", Choice::Requested),
        (Language::Pt, r"\bantigo\b|\banterior\b|\bmesmo\b", Choice::Stored),
        (Language::Nl, r"\bnieuwe?\b", Choice::Requested),
        (Language::Nl, r"\boude?\b|\bvorige\b|\bzelfde\b", Choice::Stored),
    ];
    table
        .iter()
        .map(|(lang, pattern, choice)| {
            (
                *lang,
                Regex::new(pattern).expect("name phrase regex is valid"),
                *choice,
            )
        })
        .collect()
});

fn match_phrase(_: &Candidates, reply: &str, language: Language) -> Option<Choice> {
    let mut hits = PHRASES
        .iter()
        .filter(|(lang, _, _)| *lang == language || *lang == Language::En)
        .filter(|(_, re, _)| re.is_match(reply))
        .map(|(_, _, choice)| *choice);
    let first = hits.next()?;
    hits.all(|c| c == first).then_some(first)
}

const YES_WORDS: &[(Language, &[&str])] = &[
    (Language::En, &["yes", "yeah", "yep", "sure", "ok", "okay", "correct"]),
    (Language::Ru, &["да", "ага", "конечно", "верно"]),
    (Language::Sr, &["da", "naravno", "može", "moze", "tačno"]),
    (Language::Hu, &["igen", "persze", "jó"]),
    (Language::De, &["ja", "genau", "klar", "richtig"]),
    (Language::Fr, &["oui", "exact", "daccord"]),
    (Language::Es, &["sí", "si", "claro", "vale"]),
    (Language::It, &["sì", "si", "certo", "esatto"]),
    (Language::Pt, &["sim", "claro", "certo"]),
    (Language::Nl, &["ja", "jazeker", "klopt"]),
];

const NO_WORDS: &[(Language, &[&str])] = &[
    (Language::En, &["no", "nope", "nah"]),
    (Language::Ru, &["нет", "не"]),
    (Language::Sr, &["ne", "nema"]),
    (Language::Hu, &["nem"]),
    (Language::De, &["nein", "nee"]),
    (Language::Fr, &["non"]),
    (Language::Es, &["no"]),
    (Language::It, &["no"]),
    (Language::Pt, &["não", "nao"]),
    (Language::Nl, &["nee", "neen"]),
];

fn words_for(table: &'static [(Language, &'static [&'static str])], language: Language) -> impl Iterator<Item = &'static str> {
    table
        .iter()
        .filter(move |(lang, _)| *lang == language || *lang == Language::En)
        .flat_map(|(_, words)| words.iter().copied())
}

/// Answers to "should I book under {request_name} instead?": "yes" takes the
/// name just given, "no" keeps the stored one
fn match_yes_no(_: &Candidates, reply: &str, language: Language) -> Option<Choice> {
    let tokens: Vec<&str> = reply.split(' ').collect();
    if tokens.len() > 3 {
        return None;
    }
    let first = tokens.first()?;
    let yes = words_for(YES_WORDS, language).any(|w| w == *first);
    let no = words_for(NO_WORDS, language).any(|w| w == *first);
    match (yes, no) {
        (true, false) => Some(Choice::Requested),
        (false, true) => Some(Choice::Stored),
        _ => None,
    }
}

fn distance_to(name: &str, reply: &str) -> usize {
    let whole = levenshtein(name, reply);
    let tokens = name
        .split(' ')
        .filter(|t| t.chars().count() >= 3)
        .flat_map(|n| {
            reply
                .split(' ')
                .filter(|t| t.chars().count() >= 3)
                .map(move |r| levenshtein(n, r))
        })
        .min()
        .unwrap_or(usize::MAX);
    whole.min(tokens)
}

fn match_fuzzy(c: &Candidates, reply: &str, _: Language) -> Option<Choice> {
    let stored = distance_to(&c.stored, reply);
    let requested = distance_to(&c.requested, reply);
    let best = stored.min(requested);
    if best > FUZZY_NAME_MAX_DISTANCE || stored == requested {
        return None;
    }
    Some(if stored < requested {
        Choice::Stored
    } else {
        Choice::Requested
    })
}

static ORDINALS: LazyLock<Vec<(Regex, Choice)>> = LazyLock::new(|| {
    let table: &[(&str, Choice)] = &[
        (
            r"^(1|#1)$|\b(first|1st|former)\b|перв|\bprv|\bels[oő]|\berst|\bpremi[eè]r|\bprimer|\bprim[oa]\b|\bprimeir|\beerste\b",
            Choice::Stored,
        ),
        (
            r"^(2|#2)$|\b(second|2nd|latter)\b|втор|\bdrug|\bmásodik|\bzweit|\bdeuxi[eè]me|\bsegund|\bsecond[oa]\b|\btweede\b",
            Choice::Requested,
        ),
    ];
    table
        .iter()
        .map(|(pattern, choice)| (Regex::new(pattern).expect("ordinal regex is valid"), *choice))
        .collect()
});

/// "The first one" refers to the stored name, which the question mentions first
fn match_ordinal(_: &Candidates, reply: &str, _: Language) -> Option<Choice> {
    let stored = ORDINALS
        .iter()
        .any(|(re, choice)| *choice == Choice::Stored && re.is_match(reply));
    let requested = ORDINALS
        .iter()
        .any(|(re, choice)| *choice == Choice::Requested && re.is_match(reply));
    pick(stored, requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MinimalContext;

    fn pending(language: Language) -> PendingConfirmation {
        PendingConfirmation::new(
            "Ivan Petrov",
            "John Smith",
            BookingRequest {
                guest_name: "John Smith".into(),
                guest_phone: "+381 60 123".into(),
                date: "2030-07-14".into(),
                time: "19:00".into(),
                guests: 2,
                special_requests: None,
            },
            MinimalContext {
                restaurant_id: 1,
                timezone: "Europe/Belgrade".into(),
                session_id: None,
                language,
            },
            3,
        )
    }

    fn resolved(reply: &str, language: Language) -> Option<(String, MatchStage)> {
        match resolve_pending_confirmation(pending(language), reply) {
            NameResolution::Resolved { name, stage, .. } => Some((name, stage)),
            _ => None,
        }
    }

    #[test]
    fn test_each_stage_in_cascade() {
        assert_eq!(
            resolved("Ivan Petrov", Language::En),
            Some(("Ivan Petrov".into(), MatchStage::Exact))
        );
        assert_eq!(
            resolved("please use John Smith.", Language::En),
            Some(("John Smith".into(), MatchStage::Substring))
        );
        assert_eq!(
            resolved("john", Language::En),
            Some(("John Smith".into(), MatchStage::Substring))
        );
        assert_eq!(
            resolved("use my old one please", Language::En),
            Some(("Ivan Petrov".into(), MatchStage::Phrase))
        );
        assert_eq!(
            resolved("новое", Language::Ru),
            Some(("John Smith".into(), MatchStage::Phrase))
        );
        assert_eq!(
            resolved("da", Language::Sr),
            Some(("John Smith".into(), MatchStage::YesNo))
        );
        assert_eq!(
            resolved("Jonh Smth", Language::En),
            Some(("John Smith".into(), MatchStage::Fuzzy))
        );
        assert_eq!(
            resolved("the first one", Language::En),
            Some(("Ivan Petrov".into(), MatchStage::Ordinal))
        );
    }

    #[test]
    fn test_resolved_booking_carries_chosen_name() {
        match resolve_pending_confirmation(pending(Language::En), "Ivan Petrov") {
            NameResolution::Resolved { booking, .. } => {
                assert_eq!(booking.guest_name, "Ivan Petrov");
                assert_eq!(booking.time, "19:00");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_third_unmatched_reply_falls_back() {
        let mut state = pending(Language::En);
        for expected_attempt in 1..=2 {
            match resolve_pending_confirmation(state, "hmm what?") {
                NameResolution::Clarify { pending } => {
                    assert_eq!(pending.attempts, expected_attempt);
                    state = pending;
                }
                other => panic!("expected clarification, got {:?}", other),
            }
        }

        match resolve_pending_confirmation(state, "hmm what?") {
            NameResolution::Fallback { name, booking } => {
                assert_eq!(name, "John Smith");
                assert_eq!(booking.guest_name, "John Smith");
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_short_stored_name_needs_whole_word() {
        let mut state = pending(Language::En);
        state.db_name = "Ed".into();

        assert_eq!(
            match resolve_pending_confirmation(state.clone(), "the second one, I need the new name") {
                NameResolution::Resolved { name, stage, .. } => Some((name, stage)),
                _ => None,
            },
            Some(("John Smith".into(), MatchStage::Phrase))
        );
        assert_eq!(
            match resolve_pending_confirmation(state, "I'll go with Ed") {
                NameResolution::Resolved { name, stage, .. } => Some((name, stage)),
                _ => None,
            },
            Some(("Ed".into(), MatchStage::Substring))
        );
    }

    #[test]
    fn test_yes_no_only_answers_the_first_question() {
        assert_eq!(
            resolved("yes", Language::En),
            Some(("John Smith".into(), MatchStage::YesNo))
        );
        assert_eq!(
            resolved("no", Language::En),
            Some(("Ivan Petrov".into(), MatchStage::YesNo))
        );

        // A re-ask offers two names, so a bare "yes" picks neither
        let mut state = pending(Language::En);
        state.attempts = 1;
        match resolve_pending_confirmation(state, "yes") {
            NameResolution::Clarify { pending } => assert_eq!(pending.attempts, 2),
            other => panic!("expected clarification, got {:?}", other),
        }
    }
}

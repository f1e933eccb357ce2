//! Station closure inference from free-text RATP messages.
//!
//! Two steps: [`extract_closed_stations`] pulls candidate names out of an
//! incident message with a fixed list of patterns, and [`stations_similar`]
//! compares a reference station name with a candidate, tolerating case,
//! accents, punctuation variants and partial names.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ImpactLevel, TransitIncident};

/// Minimum share of common words for two names to be considered the same station.
pub const TOKEN_OVERLAP_THRESHOLD: f64 = 0.7;

const MIN_NAME_CHARS: usize = 3;

/// The closure phrasings found in RATP traffic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosurePattern {
    /// "la station X est fermée"
    StationIsClosed,
    /// "station X fermée"
    StationClosed,
    /// "fermeture de X"
    ClosureOf,
    /// "X fermé"
    TrailingClosed,
    /// "entre X et Y": both ends of an interrupted segment
    Segment,
}

impl ClosurePattern {
    pub const ALL: [ClosurePattern; 5] = [
        ClosurePattern::StationIsClosed,
        ClosurePattern::StationClosed,
        ClosurePattern::ClosureOf,
        ClosurePattern::TrailingClosed,
        ClosurePattern::Segment,
    ];

    fn regex(&self) -> &'static Regex {
        match self {
            ClosurePattern::StationIsClosed => &STATION_IS_CLOSED,
            ClosurePattern::StationClosed => &STATION_CLOSED,
            ClosurePattern::ClosureOf => &CLOSURE_OF,
            ClosurePattern::TrailingClosed => &TRAILING_CLOSED,
            ClosurePattern::Segment => &SEGMENT,
        }
    }

    /// Names captured by this pattern, in message order.
    pub fn captures(&self, message: &str) -> Vec<String> {
        self.regex()
            .captures_iter(message)
            .flat_map(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().trim().to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

// Letters (accented included), whitespace, hyphen and apostrophe
const NAME: &str = r"[A-Za-zÀ-ÿ\s\-']";

static STATION_IS_CLOSED: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)la station ({NAME}+?) est fermée")));
static STATION_CLOSED: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)station ({NAME}+?) fermée")));
static CLOSURE_OF: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)fermeture de ({NAME}+)")));
static TRAILING_CLOSED: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)({NAME}+?) fermé")));
static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i)entre ({NAME}+?) et ({NAME}+)")));

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants covered by the tests below.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid closure pattern {pattern}: {e}"))
}

/// Candidate station names mentioned as closed, deduplicated, longer than two characters.
pub fn extract_closed_stations(message: &str) -> Vec<String> {
    let mut stations: Vec<String> = Vec::new();

    for pattern in ClosurePattern::ALL {
        for name in pattern.captures(message) {
            if name.chars().count() >= MIN_NAME_CHARS && !stations.contains(&name) {
                stations.push(name);
            }
        }
    }

    stations
}

/// Lowercase, strip accents, turn `-` and `'` into spaces and collapse whitespace.
pub fn normalize_station_name(name: &str) -> String {
    let folded: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_diacritic)
        .map(|c| if c == '-' || c == '\'' || c == '’' { ' ' } else { c })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Same station under a different spelling: equal, contained, or enough common words.
pub fn stations_similar(a: &str, b: &str) -> bool {
    let a = normalize_station_name(a);
    let b = normalize_station_name(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b || a.contains(&b) || b.contains(&a) {
        return true;
    }

    token_overlap(&a, &b) >= TOKEN_OVERLAP_THRESHOLD
}

fn token_overlap(a: &str, b: &str) -> f64 {
    let words_a: Vec<&str> = dedup_words(a);
    let words_b: Vec<&str> = dedup_words(b);
    let longest = words_a.len().max(words_b.len());
    if longest == 0 {
        return 0.0;
    }
    let common = words_a.iter().filter(|w| words_b.contains(w)).count();
    common as f64 / longest as f64
}

fn dedup_words(s: &str) -> Vec<&str> {
    let mut words: Vec<&str> = Vec::new();
    for w in s.split_whitespace() {
        if !words.contains(&w) {
            words.push(w);
        }
    }
    words
}

/// Closure reason for `station_name` given the current incidents, if any.
pub fn station_closure(station_name: &str, incidents: &[TransitIncident]) -> Option<String> {
    let lowered = station_name.to_lowercase();

    for incident in incidents.iter().filter(|i| i.impact != ImpactLevel::Normal) {
        if incident
            .closed_stations
            .iter()
            .any(|closed| stations_similar(station_name, closed))
        {
            return Some(format!("Closed - Line {}: {}", incident.line, incident.title));
        }

        if incident.message.to_lowercase().contains(&lowered) {
            return Some(format!("Disrupted - Line {}: {}", incident.line, incident.title));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(line: &str, impact: ImpactLevel, message: &str, closed: &[&str]) -> TransitIncident {
        TransitIncident {
            line: line.to_string(),
            status: "alerte".to_string(),
            title: "Trafic perturbé".to_string(),
            message: message.to_string(),
            impact,
            closed_stations: closed.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_pattern_station_is_closed() {
        let names = ClosurePattern::StationIsClosed.captures("La station Riquet est fermée pour travaux.");
        assert_eq!(names, vec!["Riquet"]);
    }

    #[test]
    fn test_pattern_station_closed() {
        let names = ClosurePattern::StationClosed.captures("Station Pont Marie fermée jusqu'à 22h");
        assert_eq!(names, vec!["Pont Marie"]);
    }

    #[test]
    fn test_pattern_closure_of() {
        let names = ClosurePattern::ClosureOf.captures("Fermeture de Cadet");
        assert_eq!(names, vec!["Cadet"]);
    }

    #[test]
    fn test_pattern_trailing_closed() {
        let names = ClosurePattern::TrailingClosed.captures("Accès Crimée fermé");
        assert_eq!(names, vec!["Accès Crimée"]);
    }

    #[test]
    fn test_pattern_segment_captures_both_ends() {
        let names = ClosurePattern::Segment.captures("Trafic interrompu entre Louis Blanc et Riquet");
        assert_eq!(names, vec!["Louis Blanc", "Riquet"]);
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let names = ClosurePattern::StationIsClosed.captures("LA STATION OPÉRA EST FERMÉE");
        assert_eq!(names, vec!["OPÉRA"]);
    }

    #[test]
    fn test_extract_dedups_and_drops_short_names() {
        let names = extract_closed_stations("La station Riquet est fermée. Station Riquet fermée. Fermeture de XY");
        assert!(names.contains(&"Riquet".to_string()));
        assert_eq!(names.iter().filter(|n| n.as_str() == "Riquet").count(), 1);
        assert!(!names.contains(&"XY".to_string()));
    }

    #[test]
    fn test_extract_nothing_from_normal_message() {
        assert!(extract_closed_stations("Trafic normal sur l'ensemble de la ligne.").is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_station_name("Gare de l'Est"), "gare de l est");
        assert_eq!(normalize_station_name("  Sully - Morland "), "sully morland");
        assert_eq!(normalize_station_name("Château-Rouge"), "chateau rouge");
    }

    #[test]
    fn test_similar_exact_accent_and_substring() {
        assert!(stations_similar("Crimée", "crimee"));
        assert!(stations_similar("Riquet", "La station Riquet est"));
        assert!(stations_similar("Saint-Germain-des-Prés", "Saint Germain des Pres"));
    }

    #[test]
    fn test_similar_token_overlap_threshold() {
        // 4 of 5 words in common: 0.8
        assert!(stations_similar("Porte de la Villette", "Porte de la Chapelle Villette"));
        // 1 of 3 words in common
        assert!(!stations_similar("Gare du Nord", "Gare de Lyon"));
        assert!(!stations_similar("Bastille", "Concorde"));
    }

    #[test]
    fn test_closure_from_extracted_name() {
        let incidents = vec![incident("7", ImpactLevel::Disrupted, "La station Riquet est fermée.", &["Riquet"])];
        let reason = station_closure("Riquet", &incidents).unwrap();
        assert_eq!(reason, "Closed - Line 7: Trafic perturbé");
    }

    #[test]
    fn test_closure_from_raw_message() {
        let incidents = vec![incident("4", ImpactLevel::Works, "Travaux à Saint-Michel ce week-end", &[])];
        let reason = station_closure("Saint-Michel", &incidents).unwrap();
        assert!(reason.starts_with("Disrupted - Line 4"));
    }

    #[test]
    fn test_normal_incident_never_closes() {
        let incidents = vec![incident("1", ImpactLevel::Normal, "Trafic normal à Bastille", &["Bastille"])];
        assert!(station_closure("Bastille", &incidents).is_none());
    }
}

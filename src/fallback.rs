// Synthetic datasets used when an upstream source is unavailable
//
// Records are hand-picked real Paris locations. Availability, tariffs and
// work dates vary per call through the injected RandomSource.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::geo::GeoPoint;
use crate::models::{
    DisruptionLevel, ImpactLevel, ImpactZone, LocalEvent, ParkingLot, RoadWork, StationRecord,
    TransitIncident, WorkStatus,
};
use crate::random::RandomSource;

// ============================================================================
// Parking lots
// ============================================================================

struct LotSeed {
    id: &'static str,
    name: &'static str,
    address: &'static str,
    lat: f64,
    lon: f64,
    capacity: u32,
    free_range: (i64, i64),
    tariff: f64,
}

const SAEMES_LOTS: [LotSeed; 5] = [
    LotSeed {
        id: "SAEM_001",
        name: "Parking Hôtel de Ville",
        address: "Place de l'Hôtel de Ville, 75004 Paris",
        lat: 48.8566,
        lon: 2.3522,
        capacity: 500,
        free_range: (50, 200),
        tariff: 4.40,
    },
    LotSeed {
        id: "SAEM_002",
        name: "Parking Notre-Dame",
        address: "Place du Parvis Notre-Dame, 75004 Paris",
        lat: 48.8530,
        lon: 2.3499,
        capacity: 400,
        free_range: (30, 150),
        tariff: 4.20,
    },
    LotSeed {
        id: "SAEM_003",
        name: "Parking Meyerbeer-Opéra",
        address: "3 Rue Meyerbeer, 75009 Paris",
        lat: 48.8708,
        lon: 2.3338,
        capacity: 350,
        free_range: (20, 100),
        tariff: 4.80,
    },
    LotSeed {
        id: "SAEM_009",
        name: "Parking Bassin de la Villette",
        address: "Quai de la Seine, 75019 Paris",
        lat: 48.8889,
        lon: 2.3700,
        capacity: 200,
        free_range: (30, 80),
        tariff: 3.50,
    },
    LotSeed {
        id: "SAEM_010",
        name: "Parking Crimée",
        address: "Avenue de Flandre, 75019 Paris",
        lat: 48.8900,
        lon: 2.3750,
        capacity: 150,
        free_range: (20, 60),
        tariff: 3.20,
    },
];

const MUNICIPAL_LOTS: [LotSeed; 4] = [
    LotSeed {
        id: "PARIS_1012",
        name: "Parking Saint-Germain-des-Prés",
        address: "169 Boulevard Saint-Germain, 75006 Paris",
        lat: 48.8536,
        lon: 2.3327,
        capacity: 420,
        free_range: (20, 290),
        tariff: 4.60,
    },
    LotSeed {
        id: "PARIS_1047",
        name: "Parking Gare de l'Est",
        address: "Rue d'Alsace, 75010 Paris",
        lat: 48.8770,
        lon: 2.3575,
        capacity: 300,
        free_range: (20, 210),
        tariff: 3.90,
    },
    LotSeed {
        id: "PARIS_1088",
        name: "Parking Jaurès",
        address: "Boulevard de la Villette, 75019 Paris",
        lat: 48.8828,
        lon: 2.3702,
        capacity: 180,
        free_range: (20, 126),
        tariff: 3.10,
    },
    LotSeed {
        id: "PARIS_1103",
        name: "Parking Bastille",
        address: "Place de la Bastille, 75011 Paris",
        lat: 48.8529,
        lon: 2.3688,
        capacity: 260,
        free_range: (20, 182),
        tariff: 4.10,
    },
];

fn build_lots(seeds: &[LotSeed], rng: &mut dyn RandomSource) -> Vec<ParkingLot> {
    seeds
        .iter()
        .filter_map(|seed| {
            let free = rng.int_in(seed.free_range.0, seed.free_range.1).max(0) as u32;
            ParkingLot::new(
                seed.id,
                seed.name,
                seed.address,
                GeoPoint::new(seed.lat, seed.lon),
                seed.capacity,
                free,
                seed.tariff,
            )
        })
        .collect()
}

pub fn saemes_lots(rng: &mut dyn RandomSource) -> Vec<ParkingLot> {
    build_lots(&SAEMES_LOTS, rng)
}

pub fn municipal_lots(rng: &mut dyn RandomSource) -> Vec<ParkingLot> {
    build_lots(&MUNICIPAL_LOTS, rng)
}

// ============================================================================
// Road works
// ============================================================================

pub fn road_works(now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Vec<RoadWork> {
    let seeds: [(&str, &str, &str, f64, f64, DisruptionLevel, Option<Vec<GeoPoint>>); 3] = [
        (
            "TRAV_001",
            "Rénovation Avenue des Champs-Élysées",
            "Travaux de réfection de la chaussée",
            48.8698,
            2.3076,
            DisruptionLevel::HighlyDisruptive,
            Some(vec![
                GeoPoint::new(48.8698, 2.3076),
                GeoPoint::new(48.8708, 2.3086),
                GeoPoint::new(48.8718, 2.3096),
            ]),
        ),
        (
            "TRAV_002",
            "Réparation Boulevard Saint-Germain",
            "Réfection des canalisations",
            48.8530,
            2.3352,
            DisruptionLevel::Disruptive,
            None,
        ),
        (
            "TRAV_003",
            "Travaux Rue de Rivoli",
            "Aménagement cyclable",
            48.8590,
            2.3470,
            DisruptionLevel::Disruptive,
            Some(vec![
                GeoPoint::new(48.8590, 2.3470),
                GeoPoint::new(48.8595, 2.3480),
                GeoPoint::new(48.8600, 2.3490),
            ]),
        ),
    ];

    seeds
        .into_iter()
        .map(|(id, name, description, lat, lon, disruption, polygon)| {
            RoadWork {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                latitude: lat,
                longitude: lon,
                start: now - Duration::days(rng.int_in(5, 20)),
                end: now + Duration::days(rng.int_in(15, 60)),
                disruption,
                status: WorkStatus::InProgress,
                affects_circulation: true,
                polygon: None,
            }
            .with_polygon(polygon)
        })
        .collect()
}

// ============================================================================
// Transit
// ============================================================================

pub fn transit_incidents() -> Vec<TransitIncident> {
    let normal = |line: &str| TransitIncident {
        line: line.to_string(),
        status: "normal".to_string(),
        title: "Trafic normal".to_string(),
        message: "Trafic normal sur l'ensemble de la ligne.".to_string(),
        impact: ImpactLevel::Normal,
        closed_stations: Vec::new(),
    };

    vec![
        normal("1"),
        TransitIncident {
            line: "7".to_string(),
            status: "alerte".to_string(),
            title: "Trafic perturbé".to_string(),
            message: "Travaux de modernisation. Trafic interrompu entre La Courneuve - 8 Mai 1945 et Riquet \
                      du 15 au 20 juillet. La station Riquet est fermée pour travaux."
                .to_string(),
            impact: ImpactLevel::Disrupted,
            closed_stations: vec!["Riquet".to_string(), "La Courneuve - 8 Mai 1945".to_string()],
        },
        TransitIncident {
            line: "4".to_string(),
            status: "alerte".to_string(),
            title: "Trafic perturbé".to_string(),
            message: "La station Saint-Germain-des-Prés est fermée pour raisons de sécurité.".to_string(),
            impact: ImpactLevel::Disrupted,
            closed_stations: vec!["Saint-Germain-des-Prés".to_string()],
        },
        normal("13"),
    ]
}

/// Reference coordinates of the main Paris metro/RER stations.
pub fn station_records() -> Vec<StationRecord> {
    const STATIONS: &[(&str, &str, f64, f64, &[&str])] = &[
        // Line 7
        ("Châtelet", "chatelet", 48.8608, 2.3470, &["1", "4", "7", "11", "14"]),
        ("Pont Neuf", "pont+neuf", 48.8584, 2.3415, &["7"]),
        ("Palais Royal - Musée du Louvre", "palais+royal", 48.8656, 2.3360, &["1", "7"]),
        ("Pont Marie", "pont+marie", 48.8527, 2.3566, &["7"]),
        ("Sully - Morland", "sully+morland", 48.8507, 2.3625, &["7"]),
        ("Gare de l'Est", "gare+de+l+est", 48.8766, 2.3589, &["4", "5", "7"]),
        ("République", "republique", 48.8675, 2.3636, &["3", "5", "8", "9", "11"]),
        ("Opéra", "opera", 48.8708, 2.3319, &["3", "7", "8"]),
        ("Chaussée d'Antin - La Fayette", "chaussee+d+antin", 48.8722, 2.3332, &["7", "9"]),
        ("Le Peletier", "le+peletier", 48.8751, 2.3394, &["7"]),
        ("Cadet", "cadet", 48.8759, 2.3444, &["7"]),
        ("Poissonnière", "poissoniere", 48.8765, 2.3483, &["7"]),
        ("Gare du Nord", "gare+du+nord", 48.8810, 2.3550, &["4", "5", "RER B", "RER D"]),
        ("Louis Blanc", "louis+blanc", 48.8816, 2.3653, &["7", "7bis"]),
        ("Riquet", "riquet", 48.8889, 2.3625, &["7"]),
        ("Crimée", "crimee", 48.8903, 2.3775, &["7"]),
        ("Corentin Cariou", "corentin+cariou", 48.8942, 2.3869, &["7"]),
        ("Porte de la Villette", "porte+de+la+villette", 48.8978, 2.3936, &["7"]),
        ("La Courneuve - 8 Mai 1945", "la+courneuve", 48.9208, 2.4097, &["7"]),
        // Major hubs
        (
            "Châtelet-Les Halles",
            "chatelet+les+halles",
            48.8610,
            2.3470,
            &["1", "4", "7", "11", "14", "RER A", "RER B", "RER D"],
        ),
        ("Bastille", "bastille", 48.8532, 2.3692, &["1", "5", "8"]),
        ("Hôtel de Ville", "hotel+de+ville", 48.8566, 2.3522, &["1", "11"]),
        ("Saint-Lazare", "saint+lazare", 48.8755, 2.3254, &["3", "12", "13", "14", "RER E"]),
        ("Trocadéro", "trocadero", 48.8635, 2.2870, &["6", "9"]),
        ("Invalides", "invalides", 48.8566, 2.3137, &["8", "13", "RER C"]),
        ("Concorde", "concorde", 48.8651, 2.3215, &["1", "8", "12"]),
        ("Saint-Michel", "saint+michel", 48.8538, 2.3444, &["4", "RER B", "RER C"]),
        ("Saint-Germain-des-Prés", "saint+germain+des+pres", 48.8542, 2.3334, &["4"]),
        // 19th arrondissement, around Riquet
        ("Jaurès", "jaures", 48.8833, 2.3717, &["2", "5", "7bis"]),
        ("Stalingrad", "stalingrad", 48.8842, 2.3669, &["2", "5", "7"]),
        ("Laumière", "laumiere", 48.8889, 2.3814, &["5"]),
        ("Ourcq", "ourcq", 48.8897, 2.3889, &["5"]),
    ];

    STATIONS
        .iter()
        .map(|(name, slug, lat, lon, lines)| StationRecord {
            name: name.to_string(),
            slug: slug.to_string(),
            latitude: *lat,
            longitude: *lon,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        })
        .collect()
}

// ============================================================================
// Local events
// ============================================================================

/// Events that weigh on parking demand on `date`.
pub fn local_events(date: NaiveDate) -> Vec<LocalEvent> {
    vec![
        LocalEvent {
            name: "Match PSG au Parc des Princes".to_string(),
            venue: "Parc des Princes".to_string(),
            date,
            zone: ImpactZone {
                latitude: 48.8414,
                longitude: 2.2530,
                radius_km: 2.0,
            },
            impact_coefficient: 1.8,
        },
        LocalEvent {
            name: "Concert à l'Olympia".to_string(),
            venue: "Olympia".to_string(),
            date,
            zone: ImpactZone {
                latitude: 48.8700,
                longitude: 2.3285,
                radius_km: 1.0,
            },
            impact_coefficient: 1.4,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    #[test]
    fn test_fallback_lots_respect_invariants() {
        let mut rng = SeededRandom::new(1);
        let lots = saemes_lots(&mut rng);
        assert_eq!(lots.len(), 5);
        for lot in lots.iter().chain(municipal_lots(&mut rng).iter()) {
            assert!(lot.capacity > 0);
            assert!(lot.free_spaces <= lot.capacity);
        }
    }

    #[test]
    fn test_fallback_is_reproducible_with_seed() {
        let a: Vec<u32> = saemes_lots(&mut SeededRandom::new(3)).iter().map(|l| l.free_spaces).collect();
        let b: Vec<u32> = saemes_lots(&mut SeededRandom::new(3)).iter().map(|l| l.free_spaces).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fallback_works() {
        let now = Utc::now();
        let works = road_works(now, &mut SeededRandom::new(5));
        assert_eq!(works.len(), 3);
        assert!(works.iter().all(|w| w.start < now && w.end > now && w.affects_circulation));
        assert!(works[1].polygon.is_none());
        assert_eq!(works[0].polygon.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_fallback_incidents_include_line_7() {
        let incidents = transit_incidents();
        let line7 = incidents.iter().find(|i| i.line == "7").unwrap();
        assert_eq!(line7.impact, ImpactLevel::Disrupted);
        assert!(line7.closed_stations.contains(&"Riquet".to_string()));
    }

    #[test]
    fn test_station_records() {
        let stations = station_records();
        assert_eq!(stations.len(), 32);
        assert!(stations.iter().any(|s| s.slug == "riquet"));
    }
}

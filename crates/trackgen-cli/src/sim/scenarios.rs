//! Pre-defined plans for exercising the synthesis pipeline.

use chrono::{TimeZone, Utc};
use trackgen_core::spatial::offset_by_bearing;
use trackgen_core::{ChangeEvent, PlanInput, PlanSection, WeatherElement, Waypoint};

/// A named plan ready for synthesis.
pub struct Scenario {
    pub name: String,
    pub input: PlanInput,
}

fn offset(from: &Waypoint, id: u32, distance_m: f64, bearing_deg: f64) -> Waypoint {
    let (lat, lon) = offset_by_bearing(from.lat, from.lon, distance_m, bearing_deg.to_radians());
    Waypoint::with_id(id, lat, lon)
}

fn section(name: &str, waypoints: Vec<Waypoint>) -> PlanSection {
    PlanSection {
        name: name.to_string(),
        waypoints,
    }
}

/// Taxi from the gate with a ground turn, take off southbound, then turn
/// out twice while climbing into a strengthening, turbulent wind.
pub fn create_departure_scenario(gate_lat: f64, gate_lon: f64) -> Scenario {
    let gate = Waypoint::with_id(1, gate_lat, gate_lon);
    let hold = offset(&gate, 2, 400.0, 90.0);
    let runway = offset(&hold, 3, 300.0, 180.0);
    let rotate = offset(&runway, 4, 3_000.0, 180.0);
    let turn_out = offset(&rotate, 5, 8_000.0, 225.0);
    let exit = offset(&turn_out, 6, 8_000.0, 270.0);

    let events = vec![
        ChangeEvent::airspeed()
            .starting_at(runway)
            .from_value(8.0)
            .to_value(80.0)
            .at_rate(2.0),
        ChangeEvent::altitude()
            .starting_at(rotate)
            .to_value(1_500.0)
            .at_rate(10.0),
        ChangeEvent::weather(WeatherElement::WindSpeed)
            .starting_at(rotate)
            .ending_at(exit)
            .to_value(25.0)
            .with_turbulence(2.0),
        ChangeEvent::weather(WeatherElement::Temperature)
            .starting_at(rotate)
            .to_value(5.0)
            .at_rate(-0.065),
    ];

    Scenario {
        name: "departure".to_string(),
        input: PlanInput {
            name: "departure".to_string(),
            sections: vec![
                section("taxi-out", vec![gate, hold, runway]),
                section("climb-out", vec![rotate, turn_out, exit]),
            ],
            events,
            initial_speed_mps: 8.0,
            initial_altitude_m: 0.0,
            departure: Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).single().unwrap_or_default(),
        },
    }
}

/// Fly out, slow down, reverse course and fly back.
pub fn create_holding_scenario(fix_lat: f64, fix_lon: f64) -> Scenario {
    let fix = Waypoint::with_id(1, fix_lat, fix_lon);
    let outbound = offset(&fix, 2, 10_000.0, 0.0);
    let inbound = offset(&outbound, 3, 10_000.0, 180.0);

    let events = vec![ChangeEvent::airspeed()
        .starting_at(offset(&fix, 0, 2_000.0, 0.0))
        .to_value(50.0)
        .at_rate(-0.5)];

    Scenario {
        name: "holding".to_string(),
        input: PlanInput {
            name: "holding".to_string(),
            sections: vec![section("hold", vec![fix, outbound, inbound])],
            events,
            initial_speed_mps: 70.0,
            initial_altitude_m: 1_200.0,
            departure: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).single().unwrap_or_default(),
        },
    }
}

/// Ground movement with an authored turn: the two short legs around the
/// corner are flown as one arc.
pub fn create_taxi_scenario(gate_lat: f64, gate_lon: f64) -> Scenario {
    let gate = Waypoint::with_id(1, gate_lat, gate_lon);
    let turn_in = offset(&gate, 2, 300.0, 0.0);
    let corner = offset(&turn_in, 0, 21.213, 0.0);
    let turn_out = offset(&corner, 3, 21.213, 90.0);
    let stand = offset(&turn_out, 4, 300.0, 90.0);

    Scenario {
        name: "taxi".to_string(),
        input: PlanInput {
            name: "taxi".to_string(),
            sections: vec![section("taxi-in", vec![gate, turn_in, turn_out, stand])],
            events: Vec::new(),
            initial_speed_mps: 5.0,
            initial_altitude_m: 0.0,
            departure: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).single().unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackgen_core::{synthesize, TrackConfig};

    #[test]
    fn departure_scenario_synthesizes() {
        let scenario = create_departure_scenario(33.6846, -117.8265);
        assert_eq!(scenario.name, "departure");
        let set = synthesize(&scenario.input, &TrackConfig::default()).unwrap();
        assert_eq!(set.lateral_track.segments().iter().filter(|s| s.is_turn()).count(), 3);
    }

    #[test]
    fn holding_scenario_flies_a_u_turn() {
        let scenario = create_holding_scenario(33.6846, -117.8265);
        let set = synthesize(&scenario.input, &TrackConfig::default()).unwrap();
        let turn = set
            .lateral_track
            .segments()
            .iter()
            .find_map(|s| s.as_turn())
            .unwrap();
        assert!(turn.is_u_turn());
    }

    #[test]
    fn taxi_scenario_uses_one_arc() {
        let scenario = create_taxi_scenario(33.6846, -117.8265);
        let set = synthesize(&scenario.input, &TrackConfig::default()).unwrap();
        assert_eq!(set.lateral_track.segments().len(), 3);
    }
}

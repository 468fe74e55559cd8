//! Built-in scenarios for demos and smoke runs.

pub mod scenarios;

pub use scenarios::{
    create_departure_scenario, create_holding_scenario, create_taxi_scenario, Scenario,
};

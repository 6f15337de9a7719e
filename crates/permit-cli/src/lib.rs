//! Permit CLI - command line tools for the drone permission engine.
//!
//! Binaries:
//! - check_flight_area: classify one flight area against zone files
//! - demo_scenario: walk applications through the full lifecycle in memory

use std::path::Path;

use anyhow::{bail, Context, Result};
use permit_core::{FlightArea, GeoPoint};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the tracing subscriber shared by every binary.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("permit_service=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

/// Parse `"lat,lon;lat,lon;..."` into a flight area.
pub fn parse_flight_area(raw: &str) -> Result<FlightArea> {
    let mut points = Vec::new();
    for (index, pair) in raw.split(';').map(str::trim).filter(|p| !p.is_empty()).enumerate() {
        let (lat, lon) = pair
            .split_once(',')
            .with_context(|| format!("vertex {index} ({pair:?}) is not \"lat,lon\""))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("vertex {index} has a bad latitude {lat:?}"))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .with_context(|| format!("vertex {index} has a bad longitude {lon:?}"))?;
        points.push(GeoPoint::new(latitude, longitude));
    }
    if points.is_empty() {
        bail!("flight area is empty");
    }
    Ok(FlightArea::new(points)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VertexJson {
    Point(GeoPoint),
    Pair([f64; 2]),
}

/// Parse a JSON array of `{"latitude":..,"longitude":..}` objects or
/// `[lat, lon]` pairs.
pub fn flight_area_from_json(raw: &str) -> Result<FlightArea> {
    let vertices: Vec<VertexJson> =
        serde_json::from_str(raw).context("flight area JSON must be an array of vertices")?;
    let points = vertices
        .into_iter()
        .map(|vertex| match vertex {
            VertexJson::Point(point) => point,
            VertexJson::Pair([latitude, longitude]) => GeoPoint::new(latitude, longitude),
        })
        .collect();
    Ok(FlightArea::new(points)?)
}

pub fn load_flight_area(path: &Path) -> Result<FlightArea> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    flight_area_from_json(&raw).with_context(|| format!("invalid flight area in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_separated_pairs() {
        let area = parse_flight_area("12.23,75.87; 11.80,76.17;11.77,76.76 ;").unwrap();
        assert_eq!(area.len(), 3);
        assert_eq!(area.points()[1], GeoPoint::new(11.80, 76.17));
    }

    #[test]
    fn rejects_malformed_pair() {
        let err = parse_flight_area("12.23;11.80,76.17").unwrap_err();
        assert!(err.to_string().contains("vertex 0"));
    }

    #[test]
    fn rejects_degenerate_area() {
        assert!(parse_flight_area("1,1;2,2").is_err());
        assert!(parse_flight_area("  ").is_err());
    }

    #[test]
    fn json_accepts_objects_and_pairs() {
        let objects = flight_area_from_json(
            r#"[{"latitude":0,"longitude":0},{"latitude":0,"longitude":1},{"latitude":1,"longitude":1}]"#,
        )
        .unwrap();
        let pairs = flight_area_from_json("[[0,0],[0,1],[1,1],[0,0]]").unwrap();
        assert_eq!(objects, pairs);
    }

    #[test]
    fn load_reads_temp_file() {
        let path = std::env::temp_dir().join(format!("permit-area-{}.json", std::process::id()));
        std::fs::write(&path, "[[0,0],[0,2],[2,2],[2,0]]").unwrap();
        let area = load_flight_area(&path).unwrap();
        assert_eq!(area.len(), 4);
        std::fs::remove_file(&path).ok();
    }
}

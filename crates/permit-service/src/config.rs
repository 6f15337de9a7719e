//! Service configuration from environment.

use std::env;
use std::path::PathBuf;

use permit_core::ZoneType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub zone_dir: PathBuf,
    pub green_zones: Option<PathBuf>,
    pub amber_zones: Option<PathBuf>,
    pub red_zones: Option<PathBuf>,
    /// Treat a missing zone file as a load error instead of an empty zone
    pub require_all_zones: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zone_dir: PathBuf::from("./zones"),
            green_zones: None,
            amber_zones: None,
            red_zones: None,
            require_all_zones: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
        };

        Self {
            zone_dir: path("PERMIT_ZONE_DIR").unwrap_or_else(|| PathBuf::from("./zones")),
            green_zones: path("PERMIT_GREEN_ZONES"),
            amber_zones: path("PERMIT_AMBER_ZONES"),
            red_zones: path("PERMIT_RED_ZONES"),
            require_all_zones: lookup("PERMIT_REQUIRE_ALL_ZONES")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
        }
    }

    /// GeoJSON file for `zone`: the explicit path if set, else
    /// `<zone_dir>/<zone>.geojson`.
    pub fn zone_path(&self, zone: ZoneType) -> PathBuf {
        let explicit = match zone {
            ZoneType::Green => &self.green_zones,
            ZoneType::Amber => &self.amber_zones,
            ZoneType::Red => &self.red_zones,
        };
        explicit.clone().unwrap_or_else(|| {
            self.zone_dir
                .join(format!("{}.geojson", zone.label().to_ascii_lowercase()))
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

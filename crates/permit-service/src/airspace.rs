//! Airspace data source.
//!
//! Decisions never read zone files themselves; they take an `Arc` snapshot
//! from an [`AirspaceSource`] and keep it for the duration of one call.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use permit_core::{ZoneDataError, ZoneGeometryMap, ZoneType};
use tokio::fs;

use crate::config::Config;

/// Supplies the current GREEN/AMBER/RED classification.
pub trait AirspaceSource: Send + Sync {
    fn fetch_zone_map(&self) -> Result<Arc<ZoneGeometryMap>, AirspaceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AirspaceError {
    #[error("failed to read {zone} zones from {}: {source}", .path.display())]
    Io {
        zone: ZoneType,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {zone} zones from {}: {source}", .path.display())]
    Parse {
        zone: ZoneType,
        path: PathBuf,
        source: ZoneDataError,
    },
    #[error("airspace data unavailable: {0}")]
    Unavailable(String),
}

/// Fixed zone map, for tests and embedded deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticAirspace {
    map: Arc<ZoneGeometryMap>,
}

impl StaticAirspace {
    pub fn new(map: ZoneGeometryMap) -> Self {
        Self { map: Arc::new(map) }
    }
}

impl AirspaceSource for StaticAirspace {
    fn fetch_zone_map(&self) -> Result<Arc<ZoneGeometryMap>, AirspaceError> {
        Ok(Arc::clone(&self.map))
    }
}

/// Zone map loaded from one GeoJSON file per zone type.
pub struct GeoJsonAirspace {
    config: Config,
    snapshot: RwLock<Arc<ZoneGeometryMap>>,
}

impl GeoJsonAirspace {
    /// Read every configured zone file.
    pub async fn load(config: Config) -> Result<Self, AirspaceError> {
        let map = read_zone_files(&config).await?;
        Ok(Self {
            config,
            snapshot: RwLock::new(Arc::new(map)),
        })
    }

    /// Re-read the zone files and swap the snapshot.
    ///
    /// On error the previous snapshot stays in place. Decisions already
    /// holding the old snapshot finish against it.
    pub async fn reload(&self) -> Result<Arc<ZoneGeometryMap>, AirspaceError> {
        let map = Arc::new(read_zone_files(&self.config).await?);
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| AirspaceError::Unavailable("zone snapshot lock poisoned".to_string()))?;
        *guard = Arc::clone(&map);
        Ok(map)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl AirspaceSource for GeoJsonAirspace {
    fn fetch_zone_map(&self) -> Result<Arc<ZoneGeometryMap>, AirspaceError> {
        self.snapshot
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| AirspaceError::Unavailable("zone snapshot lock poisoned".to_string()))
    }
}

async fn read_zone_files(config: &Config) -> Result<ZoneGeometryMap, AirspaceError> {
    let mut map = ZoneGeometryMap::new();

    for zone in ZoneType::ALL {
        let path = config.zone_path(zone);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound && !config.require_all_zones => {
                tracing::warn!(
                    "No {} zone file at {}; treating zone as empty",
                    zone,
                    path.display()
                );
                continue;
            }
            Err(source) => return Err(AirspaceError::Io { zone, path, source }),
        };

        let report = match map.insert_geojson(zone, &raw) {
            Ok(report) => report,
            Err(source) => return Err(AirspaceError::Parse { zone, path, source }),
        };
        if report.skipped() > 0 {
            tracing::warn!(
                "Skipped {} unusable {} features in {} ({} degenerate rings, {} unsupported geometries, {} empty)",
                report.skipped(),
                zone,
                path.display(),
                report.degenerate_rings,
                report.unsupported_geometries,
                report.empty_features
            );
        }
        tracing::info!(
            "Loaded {} {} zone polygons from {}",
            report.polygons,
            zone,
            path.display()
        );
    }

    Ok(map)
}

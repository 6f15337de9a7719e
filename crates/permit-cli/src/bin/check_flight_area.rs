//! Classify a flight area against the configured GREEN/AMBER/RED zone files.
//!
//! Zone files come from PERMIT_* environment variables; flags override them.
//!
//! Usage:
//!   cargo run -p permit-cli --bin check_flight_area -- \
//!     --area "12.23,75.87;11.80,76.17;11.77,76.76;12.30,77.00" --zone-dir ./zones

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use permit_core::{SubmissionDecision, ZoneType};
use permit_service::{AirspaceSource, Config, GeoJsonAirspace, SubmissionPreview};

#[derive(Parser, Debug)]
#[command(author, version, about = "Check a flight area against airspace zones")]
struct Args {
    /// Vertices as "lat,lon;lat,lon;..."
    #[arg(long, conflicts_with = "area_file")]
    area: Option<String>,

    /// JSON file with the flight area vertices
    #[arg(long)]
    area_file: Option<PathBuf>,

    /// Directory holding green.geojson, amber.geojson and red.geojson
    #[arg(long)]
    zone_dir: Option<PathBuf>,

    #[arg(long)]
    green: Option<PathBuf>,

    #[arg(long)]
    amber: Option<PathBuf>,

    #[arg(long)]
    red: Option<PathBuf>,

    /// Fail when any zone file is missing
    #[arg(long)]
    require_all_zones: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    permit_cli::init_tracing(false)?;

    let area = match (&args.area, &args.area_file) {
        (Some(raw), _) => permit_cli::parse_flight_area(raw)?,
        (None, Some(path)) => permit_cli::load_flight_area(path)?,
        (None, None) => bail!("pass --area or --area-file"),
    };

    let mut config = Config::from_env();
    if let Some(dir) = args.zone_dir {
        config.zone_dir = dir;
    }
    config.green_zones = args.green.or(config.green_zones);
    config.amber_zones = args.amber.or(config.amber_zones);
    config.red_zones = args.red.or(config.red_zones);
    config.require_all_zones |= args.require_all_zones;

    let airspace = GeoJsonAirspace::load(config).await?;
    let zones = airspace.fetch_zone_map()?;
    for zone in ZoneType::ALL {
        tracing::debug!("{} zone: {} polygons", zone, zones.feature_count(zone));
    }

    let preview = SubmissionPreview::evaluate(&area, &zones);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!("Flight area: {} vertices", area.len());
    println!("  within GREEN:     {}", preview.zones.within_green);
    println!("  intersects GREEN: {}", preview.zones.intersects_green);
    println!("  intersects AMBER: {}", preview.zones.intersects_amber);
    println!("  intersects RED:   {}", preview.zones.intersects_red);
    match &preview.violation {
        Some(violation) => println!("Validation: REJECTED ({violation})"),
        None => println!("Validation: accepted"),
    }
    match &preview.decision {
        SubmissionDecision::AutoApproved { comment } => {
            println!("On submit:  APPROVED ({comment})")
        }
        SubmissionDecision::PendingReview => println!("On submit:  SUBMITTED, awaiting approver"),
        SubmissionDecision::Rejected { violation } => {
            println!("On submit:  REJECTED ({violation})")
        }
    }

    Ok(())
}

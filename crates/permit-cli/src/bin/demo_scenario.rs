//! Demo Scenario - permission applications through the full lifecycle.
//!
//! Runs against an in-memory store:
//!
//! 1. GREEN flight submitted and self-approved
//! 2. AMBER flight submitted and held for an approver
//! 3. Approver approves the held flight
//! 4. RED flight refused at creation
//! 5. Drone import application approved by hand
//!
//! Usage:
//!   cargo run -p permit-cli --bin demo_scenario
//!   cargo run -p permit-cli --bin demo_scenario -- --zone-dir ./zones

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use permit_core::{
    AcquisitionDetails, Application, ApplicationDraft, ApplicationKind, ApprovalRequest,
    ApproverDecision, FlightArea, FlightPermissionDetails, ModeOfAcquisition, Principal,
    ZoneGeometryMap, ZonePolygon, ZoneType,
};
use permit_service::{
    AirspaceSource, ApplicationService, Config, GeoJsonAirspace, InMemoryApplicationStore,
    RecordingApprovalHook, StaticAirspace,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Demo: drone permission lifecycle")]
struct Args {
    /// Load zones from this directory instead of the built-in demo map
    #[arg(long)]
    zone_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

/// Built-in map around Mysuru: GREEN block, AMBER strip to the east, RED
/// square over the airport to the north.
fn demo_zones() -> ZoneGeometryMap {
    ZoneGeometryMap::new()
        .with_zone(
            ZoneType::Green,
            ZonePolygon::from_lat_lon(&[
                (11.4, 75.4),
                (11.4, 77.4),
                (12.2, 77.5),
                (12.9, 76.9),
                (12.8, 75.5),
            ]),
        )
        .with_zone(
            ZoneType::Amber,
            ZonePolygon::from_lat_lon(&[(11.4, 77.6), (11.4, 78.2), (12.6, 78.2), (12.6, 77.6)]),
        )
        .with_zone(
            ZoneType::Red,
            ZonePolygon::from_lat_lon(&[(13.1, 76.4), (13.1, 76.8), (13.4, 76.8), (13.4, 76.4)]),
        )
}

fn flight(pairs: &[(f64, f64)], drone_id: u64, purpose: &str) -> Result<ApplicationKind> {
    let start = Utc::now().naive_utc() + Duration::days(2);
    Ok(ApplicationKind::FlyDronePermission(FlightPermissionDetails {
        pilot_id: "PLT-DEMO".to_string(),
        drone_id,
        operator_id: 1,
        fly_area: FlightArea::from_lat_lon(pairs)?,
        payload_weight_kg: 0.8,
        payload_details: "camera".to_string(),
        flight_purpose: purpose.to_string(),
        start_date_time: start,
        end_date_time: start + Duration::hours(2),
    }))
}

fn show(step: &str, application: &Application) {
    println!(
        "[{}] {} -> {} (approver: {}, comments: {})",
        step,
        application.id,
        application.status,
        application.approver.as_deref().unwrap_or("-"),
        application.approver_comments.as_deref().unwrap_or("-"),
    );
}

fn run<A: AirspaceSource + 'static>(airspace: Arc<A>) -> Result<()> {
    let store = Arc::new(InMemoryApplicationStore::new());
    let hook = Arc::new(RecordingApprovalHook::new());
    let service = ApplicationService::new(Arc::clone(&store), airspace, Arc::clone(&hook));

    let pilot = Principal::applicant(101, "demo-pilot");
    let officer = Principal::approver(900, "demo-officer");

    // 1. GREEN
    let green = flight(
        &[
            (12.232654837013484, 75.87158203125),
            (11.802834233547687, 76.168212890625),
            (11.77057019562524, 76.761474609375),
            (12.302435369557129, 77.003173828125),
            (12.538477567560662, 76.4044189453125),
        ],
        1,
        "crop survey",
    )?;
    let app = service.create_application(ApplicationDraft::new(green), &pilot)?;
    show("green draft", &app);
    let app = service.submit_application(&app.id, &pilot)?;
    show("green submit", &app);

    // 2-3. AMBER
    let amber = flight(
        &[(11.8, 77.2), (11.8, 77.8), (12.1, 77.8), (12.1, 77.2)],
        2,
        "powerline inspection",
    )?;
    let held = service.create_application(ApplicationDraft::new(amber).submitted(), &pilot)?;
    show("amber submit", &held);
    let request = ApprovalRequest {
        application_id: held.id.clone(),
        decision: ApproverDecision::Approved,
        comments: "cleared after review".to_string(),
    };
    let reviewed = service.review_application(&request, &officer)?;
    show("amber review", &reviewed);

    // 4. RED
    let red = flight(&[(12.9, 76.5), (12.9, 76.7), (13.2, 76.7), (13.2, 76.5)], 3, "photo shoot")?;
    match service.create_application(ApplicationDraft::new(red), &pilot) {
        Ok(app) => show("red create", &app),
        Err(err) => println!("[red create] refused: {err}"),
    }

    // 5. Import
    let import = ApplicationKind::ImportDrone(AcquisitionDetails {
        acquisition_mode: ModeOfAcquisition::Purchase,
        drone_type_id: 17,
        quantity: 2,
    });
    let import = service.create_application(ApplicationDraft::new(import).submitted(), &pilot)?;
    show("import submit", &import);
    let request = ApprovalRequest {
        application_id: import.id.clone(),
        decision: ApproverDecision::Approved,
        comments: "import licence verified".to_string(),
    };
    show("import review", &service.review_application(&request, &officer)?);

    println!();
    println!("Applications of {}:", pilot.username);
    for app in service.applications_of_applicant(pilot.id)? {
        println!("  {} {} {}", app.id, app.kind.label(), app.status);
    }
    println!("Approval hook fired for {} applications", hook.approved_ids().len());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    permit_cli::init_tracing(args.log_json)?;

    match args.zone_dir {
        Some(zone_dir) => {
            let config = Config {
                zone_dir,
                ..Config::from_env()
            };
            run(Arc::new(GeoJsonAirspace::load(config).await?))
        }
        None => run(Arc::new(StaticAirspace::new(demo_zones()))),
    }
}

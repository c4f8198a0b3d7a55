//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `harupin_core` linkage (ping/version).
//! - Optionally open a configured store and print the clusters visible at a
//!   zoom level: `harupin_cli [config.json] [zoom]`.

use harupin_core::{CoreConfig, CoreRuntime, FilterCriteria, MapEvent};
use std::process::ExitCode;
use std::time::Duration;

const DEFAULT_ZOOM: f64 = 10.0;

fn main() -> ExitCode {
    println!("harupin_core ping={}", harupin_core::ping());
    println!("harupin_core version={}", harupin_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    let zoom = match args.next().map(|raw| raw.parse::<f64>()) {
        None => DEFAULT_ZOOM,
        Some(Ok(zoom)) => zoom,
        Some(Err(err)) => {
            eprintln!("invalid zoom: {err}");
            return ExitCode::FAILURE;
        }
    };

    match print_clusters(&config_path, zoom) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_clusters(config_path: &str, zoom: f64) -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::load(config_path)?;
    let runtime = CoreRuntime::open(&config)?;
    let mut observer = runtime.observer();
    observer.observe(FilterCriteria::all(), zoom)?;

    let Some(update) = observer.recv_timeout(Duration::from_secs(1)) else {
        println!("no clusters delivered");
        return Ok(());
    };
    println!(
        "zoom={} threshold_degrees={} notes={} clusters={}",
        update.zoom,
        update.threshold_degrees,
        update.note_count(),
        update.clusters.len()
    );
    for cluster in &update.clusters {
        match MapEvent::for_tap(cluster) {
            MapEvent::NoteTapped { note_id } => println!(
                "pin note_id={} at=({:.5}, {:.5})",
                note_id, cluster.centroid.latitude, cluster.centroid.longitude
            ),
            MapEvent::ClusterTapped { centroid } => println!(
                "cluster size={} centroid=({:.5}, {:.5})",
                cluster.len(),
                centroid.latitude,
                centroid.longitude
            ),
        }
    }
    Ok(())
}

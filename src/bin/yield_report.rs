//! Print a yield prediction and a planting recommendation
//!
//! Usage: yield_report <crop> <province> [YYYY-MM-DD]
//!
//! Artifacts are read from DATA_DIR (see `EngineConfig::from_env`).
//! Without a date, today is used for the single-date prediction.

use anyhow::{bail, Result};
use crop_yield_engine::{planting_status, EngineConfig, PlantingStatus, YieldEngine};
use std::time::Instant;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: yield_report <crop> <province> [YYYY-MM-DD]");
    }
    let (crop, province) = (&args[0], &args[1]);

    println!("Initializing yield engine...\n");
    let init_start = Instant::now();
    let engine = YieldEngine::load(&EngineConfig::from_env())?;
    println!("Engine ready in {:?}\n", init_start.elapsed());

    let today = chrono::Local::now().date_naive();
    let prediction = match args.get(2) {
        Some(date) => engine.predict_yield_str(crop, province, date)?,
        None => engine.predict_yield(crop, province, today)?,
    };

    println!("SPECIFIC ANALYSIS");
    println!("  Crop:            {}", prediction.crop);
    println!("  Province:        {}", prediction.province);
    println!("  Planting date:   {}", prediction.planting_date);
    println!("  Estimated yield: {:.2} t/ha", prediction.yield_tons_per_ha);
    match planting_status(&prediction, today) {
        PlantingStatus::Planned => {
            println!("  Status:          planned, harvest around {}", prediction.harvest_date);
        }
        PlantingStatus::Growing { days_elapsed, progress_pct } => {
            println!(
                "  Status:          growing (day {}, {:.1}%), harvest around {}",
                days_elapsed, progress_pct, prediction.harvest_date
            );
        }
        PlantingStatus::ReadyToHarvest => {
            println!("  Status:          ready to harvest (due around {})", prediction.harvest_date);
        }
    }
    if prediction.novelty.is_novel() {
        println!("  Warning:         estimate uses defaults: {:?}", prediction.novelty);
    }

    let scan_start = Instant::now();
    let recommendation = engine.find_best_planting_time_parallel_from(crop, province, today)?;
    let comparison = engine.baseline_comparison(crop, province, recommendation.best_yield);

    println!("\nRECOMMENDATION ({} days)", recommendation.candidates_scored);
    println!("  Best planting date: {}", recommendation.best_date);
    println!("  Estimated yield:    {:.2} t/ha", recommendation.best_yield);
    println!("  Historical mean:    {:.2} t/ha", comparison.baseline_yield);
    if let Some(uplift) = comparison.uplift_pct {
        println!("  Uplift:             {:+.1}%", uplift);
    }
    println!("  Scan time:          {:?}", scan_start.elapsed());

    Ok(())
}

//! slicer-meta - print the metadata of sliced 3D-printing files

mod config;

use config::Config;
use slicer_meta::{parse_slicer_file, ParseResult};
use std::path::Path;
use tracing::{error, info};

fn image_summary(image: Option<&str>, hide: bool) -> String {
    match image {
        None => "none".to_string(),
        Some(_) if hide => "present".to_string(),
        Some(data) => data.to_string(),
    }
}

fn print_report(path: &Path, result: &ParseResult, config: &Config) {
    println!("== {}", path.display());

    if let Some(slicer) = &result.slicer {
        println!("Slicer:        {} ({})", slicer.slicer, slicer.slicer_name);
        println!("Version:       {}", slicer.slicer_version);
        println!("Sliced:        {} {}", slicer.slice_date, slicer.slice_time);
        println!(
            "Print time:    {}",
            slicer.print_eta.as_deref().unwrap_or("unknown")
        );
    }

    if let Some(file) = &result.file {
        println!("Printer:       {}", file.printer_model);
        println!("Filament:      {}", file.filament_type);
        println!(
            "Usage:         {:.2} mm, {:.2} g",
            file.filament_used_mm, file.filament_used_g
        );
        for filament in &file.filaments {
            println!(
                "  slot {}: {} {} {} m {} g",
                filament.id,
                filament.filament_type,
                filament.color.as_deref().unwrap_or("-"),
                filament.used_m,
                filament.used_g
            );
        }
        println!(
            "Thumbnail:     {}",
            image_summary(file.thumbnail.as_deref(), config.no_thumbnail)
        );
    }

    if let Some(three_mf) = &result.three_mf {
        println!("Printer id:    {}", three_mf.printer_model_id);
        println!("Supports:      {}", three_mf.support_used);
        println!("Objects:       {}", three_mf.file_names.join(", "));
        println!(
            "Plate image:   {}",
            image_summary(three_mf.plate_image.as_deref(), config.no_thumbnail)
        );
    }

    for diagnostic in &result.diagnostics {
        println!("warning: {}", diagnostic);
    }
}

fn main() {
    // Parse configuration and initialize logging
    let config = Config::from_args().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    let mut failures = 0;
    for path in &config.files {
        match parse_slicer_file(path) {
            Ok(result) => print_report(path, &result, &config),
            Err(e) => {
                failures += 1;
                error!("Parsing {} failed: {:#}", path.display(), e);
                eprintln!("Error: {}: {:#}", path.display(), e);
            }
        }
    }

    info!(
        "Parsed {} of {} files",
        config.files.len() - failures,
        config.files.len()
    );
    if failures > 0 {
        std::process::exit(1);
    }
}

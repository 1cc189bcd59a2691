mod args;

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;

use thermal_regions::{
    cli::{load_paths_par, setup_logging},
    pipeline::{Analyzer, UnitReport},
    report::{render_annotation, write_text, FrameReport},
};

use args::Args;

fn main() -> Result<()> {
    let Args {
        paths,
        mode,
        config,
        model,
        annotate,
        json,
        verbosity,
    } = Args::from_cmd_line()?;
    let _logger = setup_logging(verbosity)?;

    let analyzer = Analyzer::new(config, model)?;
    match analyzer.model() {
        Some(m) => info!("calibration: {}", m),
        None => info!("no calibration model: reporting raw counts"),
    }
    let config = analyzer.config();
    info!(
        "min contour area {}, erosion kernel {}x{}, extrema {}",
        config.min_contour_area,
        config.erosion_kernel,
        config.erosion_kernel,
        config.extrema_enabled(analyzer.model().is_some())
    );

    let inputs = load_paths_par(paths)?;
    let results: Vec<Vec<UnitReport>> = inputs
        .par_iter()
        .map(|input| analyzer.analyze(&input.frame, mode))
        .collect();

    if let Some(dir) = &annotate {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create `{}`", dir.display()))?;
        for (input, reports) in inputs.iter().zip(&results) {
            let stem = Path::new(&input.filename)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "frame".into());
            let out_path = dir.join(format!("{}_annotated.png", stem));
            render_annotation(&input.frame, reports)
                .save(&out_path)
                .with_context(|| format!("could not write `{}`", out_path.display()))?;
            info!("wrote {}", out_path.display());
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        let frames: Vec<_> = inputs
            .iter()
            .zip(&results)
            .map(|(input, reports)| FrameReport::new(&input.filename, &input.frame, reports))
            .collect();
        serde_json::to_writer_pretty(&mut out, &frames)?;
        writeln!(out)?;
    } else {
        for (input, reports) in inputs.iter().zip(&results) {
            write_text(&mut out, &input.filename, reports)?;
            writeln!(out)?;
        }
    }

    let skipped = results
        .iter()
        .flatten()
        .filter(|r| r.outcome.is_err())
        .count();
    info!(
        "processed {} images, {} units without a bottle",
        inputs.len(),
        skipped
    );
    Ok(())
}

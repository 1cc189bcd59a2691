mod args;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};

use anyhow::{Context, Result};
use log::{info, warn};

use thermal_regions::{
    calibration::{CalibrationSession, Command},
    cli::setup_logging,
    report::render_calibration_plot,
    RadiometricFrame,
};

use args::Args;

const PLOT_SIZE: (u32, u32) = (800, 600);

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;
    let _logger = setup_logging(args.verbosity)?;

    let frame = RadiometricFrame::from_path(&args.image)
        .with_context(|| format!("could not load `{}`", args.image.display()))?;
    info!(
        "loaded {} ({}x{})",
        args.image.display(),
        frame.width(),
        frame.height()
    );

    let input: Box<dyn BufRead> = match &args.commands {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("could not open `{}`", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let interactive = args.commands.is_none();
    if interactive {
        eprintln!("Enter `X Y TEMP` per point; `done` (or end of input) fits the calibration.");
    }

    let mut session = CalibrationSession::new(&frame);
    run_session(&mut session, input, interactive)?;

    let outcome = session.finish().context("could not fit a calibration")?;
    if let Some(path) = &args.marked {
        outcome
            .canvas
            .save(path)
            .with_context(|| format!("could not write `{}`", path.display()))?;
    }
    let model = outcome.model;

    println!("\nEcuación de calibración obtenida:");
    println!("{}", model);
    info!(
        "rms residual over {} points: {:.4} °C",
        outcome.points.len(),
        model.rms_residual(&outcome.points)
    );

    if let Some(path) = &args.output {
        model
            .save(path)
            .with_context(|| format!("could not write `{}`", path.display()))?;
    }
    if let Some(path) = &args.plot {
        render_calibration_plot(&outcome.points, &model, PLOT_SIZE.0, PLOT_SIZE.1)
            .save(path)
            .with_context(|| format!("could not write `{}`", path.display()))?;
    }
    Ok(())
}

fn run_session(
    session: &mut CalibrationSession,
    input: Box<dyn BufRead>,
    interactive: bool,
) -> Result<()> {
    let mut lines = input.lines();
    while let Some(line) = lines.next() {
        let cmd = match Command::parse(&line?) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match cmd {
            Command::Finish => break,
            Command::Undo => match session.undo() {
                Some(p) => eprintln!("Removed point raw = {}, T = {}", p.raw_intensity, p.temperature),
                None => eprintln!("No points to remove."),
            },
            Command::List => {
                for (i, p) in session.points().iter().enumerate() {
                    eprintln!("{:3}: raw = {:6}, T = {:.2} °C", i, p.raw_intensity, p.temperature);
                }
            }
            Command::Add { x, y, temperature } => {
                let temperature = match temperature {
                    Some(t) => t,
                    None => {
                        if interactive {
                            eprint!("Ingrese la temperatura en °C para este punto: ");
                            io::stderr().flush()?;
                        }
                        match lines.next() {
                            Some(t) => t?,
                            None => break,
                        }
                    }
                };
                match session.add_point(x, y, &temperature) {
                    Ok(p) => eprintln!(
                        "({}, {}): intensidad = {}, T = {:.1} °C",
                        x, y, p.raw_intensity, p.temperature
                    ),
                    Err(e) => warn!("{}; se omite este punto", e),
                }
            }
        }
    }
    Ok(())
}

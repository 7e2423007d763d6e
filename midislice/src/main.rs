mod cli;

use std::cell::Cell;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};
use midislice_core::{
    plan_segments, run_with_progress, AlignmentMode, Config, EngineOptions, ProgressEvent,
};

use crate::cli::build_cli;

fn duration_to_millis(duration: Duration) -> u64 {
    duration
        .as_millis()
        .min(u128::from(u64::MAX))
        .try_into()
        .unwrap_or(u64::MAX)
}

fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    let verbose = matches.get_flag("verbose");
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "warn" }),
    )
    .init();

    let mut builder = Config::builder()
        .overwrite(matches.get_flag("overwrite"))
        .engine(
            EngineOptions::default()
                .require_equal_lengths(!matches.get_flag("allow-length-mismatch")),
        )
        .verbose(verbose);
    if let Some(midi) = matches.get_one::<PathBuf>("midi") {
        builder = builder.midi(midi);
    }
    if let Some(beats) = matches.get_one::<Vec<f64>>("beats") {
        builder = builder.durations(beats.clone());
    }
    if let Some(wavs) = matches.get_many::<PathBuf>("wav") {
        builder = builder.wavs(wavs);
    }
    if let Some(bpm) = matches.get_one::<f64>("bpm") {
        builder = builder.beats_per_minute(*bpm);
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        builder = builder.output(output);
    }
    if matches.get_flag("block-align") {
        builder = builder.alignment(AlignmentMode::BlockAlign);
    }

    let config = builder
        .build()
        .context("failed to create configuration")?;
    let output_path = config.output_path.clone();

    if matches.get_flag("dry-run") {
        let plan = plan_segments(&config).context("failed to plan segments")?;

        if plan.is_empty() {
            println!("Dry run: no segments would be generated.");
        } else {
            println!(
                "Dry run: would assemble {} segment(s) into {}:",
                plan.len(),
                output_path.display()
            );
            for segment in plan {
                println!("  {segment}");
            }
        }

        return Ok(());
    }

    let progress = ProgressBar::new(0);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let total = Cell::new(None::<Duration>);
    let progress_handle = progress.clone();
    let result = run_with_progress(config, |event| match event {
        ProgressEvent::Start { total_duration } => {
            total.set(Some(total_duration));
            progress_handle.set_style(bar_style.clone());
            progress_handle.set_length(duration_to_millis(total_duration).max(1));
            progress_handle.enable_steady_tick(Duration::from_millis(100));
            progress_handle.set_message(format!("0s / {}", HumanDuration(total_duration)));
        }
        ProgressEvent::Advance { processed } => {
            progress_handle.set_position(duration_to_millis(processed));
            match total.get() {
                Some(total) => progress_handle.set_message(format!(
                    "{} / {}",
                    HumanDuration(processed),
                    HumanDuration(total)
                )),
                None => progress_handle.set_message(format!("{}", HumanDuration(processed))),
            }
        }
        ProgressEvent::Finish => {
            progress_handle.set_message(String::from("Completed"));
        }
    })
    .with_context(|| format!("failed to write '{}'", output_path.display()));

    progress.finish_and_clear();

    let summary = result?;
    println!(
        "Wrote {:.3}s of audio to {}",
        summary.duration_seconds,
        summary.output_path.display()
    );

    Ok(())
}

//! Batch WAV conversion demo
//!
//! Converts every `.wav` file in a directory to raw 16-bit PCM, fanning one
//! job per file out over the pool.
//!
//! Run with: cargo run --example wav_batch -- <directory> [threads] [batch]

use jobring::audio::{convert_batch, wav_files_in, RawPcmEncoder};
use jobring::prelude::*;
use std::path::PathBuf;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(dir) = args.next().map(PathBuf::from) else {
        eprintln!("Usage: wav_batch <directory> [threads] [batch]");
        std::process::exit(1);
    };
    let threads: usize = args.next().map_or(Ok(4), |a| a.parse())?;
    let batch: usize = args.next().map_or(Ok(8), |a| a.parse())?;

    let inputs = wav_files_in(&dir)?;
    if inputs.is_empty() {
        println!("No .wav files in {}", dir.display());
        return Ok(());
    }

    println!(
        "Converting {} file(s) with {} workers, batches of {}",
        inputs.len(),
        threads,
        batch
    );

    let mut pool = BatchPool::dynamic(threads, batch)?;
    let report = convert_batch(&mut pool, &inputs, || Box::new(RawPcmEncoder::new()))?;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(stats) => println!(
                "  {} -> {} ({} frames, {} bytes)",
                outcome.input.display(),
                outcome.output.display(),
                stats.frames,
                stats.bytes_written
            ),
            Err(e) => println!("  {} FAILED: {}", outcome.input.display(), e),
        }
    }
    println!(
        "Done: {} converted, {} failed",
        report.converted(),
        report.failed()
    );

    for (worker, stats) in pool.worker_stats().iter().enumerate() {
        println!(
            "  worker {}: {} jobs, avg {:.0} us",
            worker,
            stats.get_jobs_processed() + stats.get_jobs_failed(),
            stats.get_average_busy_time_us()
        );
    }

    Ok(())
}

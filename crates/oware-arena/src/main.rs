use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;
use oware_arena::arena::{Arena, ArenaConfig};
use oware_arena::match_runner::TurnDeadlines;
use tracing::info;

/// Pits two Oware bots against each other until stopped.
#[derive(Parser)]
#[command(name = "oware-arena")]
#[command(about = "Runs two Oware bots against each other and estimates which plays better")]
struct Args {
    /// Path to the first bot executable
    bot_a: PathBuf,
    /// Path to the second bot executable
    bot_b: PathBuf,
    /// Number of parallel arena workers
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    for path in [&args.bot_a, &args.bot_b] {
        File::open(path)
            .with_context(|| format!("{} couldn't be found", path.display()))?;
    }

    let parallelism = thread::available_parallelism().map(usize::from).unwrap_or(1);
    let workers = args.workers.clamp(1, 2 * parallelism);
    info!(
        workers,
        "testing {} vs {}",
        args.bot_a.display(),
        args.bot_b.display()
    );

    // SIGTERM/Ctrl-C request a graceful stop at the next round boundary.
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))
        .context("failed to install the termination handler")?;

    let arena = Arena::new(
        ArenaConfig {
            bot_paths: [args.bot_a, args.bot_b],
            workers,
            deadlines: TurnDeadlines::default(),
        },
        stop,
    );
    arena.run().context("arena run aborted")?;
    Ok(())
}

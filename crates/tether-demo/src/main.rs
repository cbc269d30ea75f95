use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tether_engine::boot::Bootstrapper;
use tether_engine::context::ContextConfig;
use tether_engine::coordinator::{Coordinator, CoordinatorConfig};
use tether_engine::logging::{init_logging, LoggingConfig};
use tether_engine::platform::{ContextVersion, HeadlessConfig, HeadlessPlatform};

const WORKERS: usize = 3;
const FRAMES_PER_WORKER: u64 = 240;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║          TETHER CONTEXT DEMO           ║");
    println!("  ║   {WORKERS} workers · headless platform         ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    let platform = Arc::new(HeadlessPlatform::new(HeadlessConfig {
        close_after_swaps: Some(FRAMES_PER_WORKER),
        ..Default::default()
    }));
    let coordinator = Coordinator::new(platform.clone(), CoordinatorConfig::default())
        .context("failed to bring up the native library")?;

    let frames = Arc::new(AtomicU64::new(0));
    let mut workers = Vec::with_capacity(WORKERS);

    for n in 0..WORKERS {
        let config = ContextConfig {
            version: ContextVersion::from_packed(43),
            title: format!("tether worker {n}"),
            ..Default::default()
        };

        let counter = Arc::clone(&frames);
        let boot = Bootstrapper::new(
            &coordinator,
            config,
            move || log::info!("worker {n} starting"),
            move || {
                counter.fetch_add(1, Ordering::Relaxed);
            },
        )
        .with_context(|| format!("failed to create context for worker {n}"))?
        .name(format!("game-{n}"));

        workers.push(boot.boot_thread().context("failed to spawn worker thread")?);
    }

    coordinator.park_thread().context("affinity thread could not park")?;

    for worker in workers {
        let name = worker.thread().name().unwrap_or("worker").to_string();
        match worker.join() {
            Ok(result) => result.with_context(|| format!("{name} failed"))?,
            Err(_) => anyhow::bail!("{name} panicked"),
        }
    }

    drop(coordinator);

    let stats = platform.stats();
    println!();
    println!("  contexts created    {}", stats.created);
    println!("  contexts destroyed  {}", stats.destroyed);
    println!("  frames presented    {}", frames.load(Ordering::Relaxed));
    println!("  affinity violations {}", stats.violations);
    println!();

    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use pacer_core::{QueueConfig, SerialQueue, TaskError};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Push a batch of fake API calls through a serial queue and report how
/// each one ended.
#[derive(Debug, Parser)]
#[command(name = "pacer", version)]
struct Args {
    /// Number of calls to submit.
    #[arg(long, default_value_t = 5)]
    jobs: u64,

    /// Pause between calls, in milliseconds. Overrides the config file.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// How long each call takes, in milliseconds.
    #[arg(long, default_value_t = 50)]
    work_ms: u64,

    /// Make every n-th call fail (0 = never).
    #[arg(long, default_value_t = 0)]
    fail_every: u64,

    /// Request a break once this many calls have settled.
    #[arg(long)]
    break_after: Option<u64>,

    /// JSON queue config, e.g. `{"delay_ms": 200}`.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Stand-in for a rate-limited remote service.
struct FakeApi {
    calls: AtomicU64,
    work: Duration,
    fail_every: u64,
}

impl FakeApi {
    async fn call(&self, job: u64) -> Result<String, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(self.work).await;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            return Err(format!("call #{n} rejected by upstream"));
        }
        Ok(format!("job {job} answered by call #{n}"))
    }
}

fn load_config(args: &Args) -> anyhow::Result<QueueConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            QueueConfig::from_json(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => QueueConfig::default(),
    };
    if let Some(ms) = args.delay_ms {
        config = config.with_delay(Duration::from_millis(ms));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let queue = SerialQueue::builder()
        .config(config)
        .on_idle(|| info!("queue drained"))
        .build()?;

    let api = Arc::new(FakeApi {
        calls: AtomicU64::new(0),
        work: Duration::from_millis(args.work_ms),
        fail_every: args.fail_every,
    });

    let delay_ms = u64::try_from(queue.delay().as_millis()).unwrap_or(u64::MAX);
    info!(jobs = args.jobs, delay_ms, "submitting");
    let started = Instant::now();

    let tickets: Vec<_> = (1..=args.jobs)
        .map(|job| {
            let api = Arc::clone(&api);
            queue.submit(move || async move { api.call(job).await })
        })
        .collect();

    for (settled, ticket) in (1_u64..).zip(tickets) {
        let id = ticket.id();
        match ticket.await {
            Ok(answer) => info!(ticket = %id, %answer, "ok"),
            Err(TaskError::Cancelled) => warn!(ticket = %id, "cancelled"),
            Err(err) => warn!(ticket = %id, label = err.as_label(), error = %err, "failed"),
        }
        if args.break_after == Some(settled) {
            queue.request_break();
        }
    }

    queue.idle_signal().await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(elapsed_ms, "done");

    println!("{}", serde_json::to_string_pretty(&queue.status())?);
    Ok(())
}

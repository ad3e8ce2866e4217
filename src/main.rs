use anyhow::Context;
use orderbook_features::{init_logging, BinanceRestClient, Collector, CollectorConfig};
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = CollectorConfig::from_env().context("loading collector configuration")?;
    tracing::info!(
        "Collecting {:?} for {} symbol(s), depth {}",
        config.segments,
        config.symbols.len(),
        config.depth_limit
    );

    let client = BinanceRestClient::new(&config)?;
    let interval = config.interval;
    let collector = Collector::new(client, config)?;

    match interval {
        None => run_once(&collector).await,
        Some(period) => {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => run_once(&collector).await?,
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutting down");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Collect every symbol once and print each merged row as a JSON line
async fn run_once(collector: &Collector<BinanceRestClient>) -> anyhow::Result<()> {
    let results = collector.collect_all().await;
    let failed = results.iter().filter(|r| r.result.is_err()).count();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for row in results.iter().filter_map(|r| r.result.as_ref().ok()) {
        writeln!(out, "{}", serde_json::to_string(&row.to_json())?)?;
    }
    out.flush()?;

    if failed > 0 {
        tracing::warn!("{} of {} symbols failed", failed, results.len());
    }
    Ok(())
}

use catalog_harvester::capture::DebugDumper;
use catalog_harvester::config::load_harvester_config;
use catalog_harvester::features::{load_snapshot, spawn_stdin_channel};
use catalog_harvester::scraping::{network, BrowserSession, CdpPageSurface};
use catalog_harvester::{drive, HarvestState, PageSurface};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Value of `--name <v>` or `--name=<v>`.
fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    let mut iter = args.iter();
    while let Some(a) = iter.next() {
        if a == name {
            return iter.next().cloned();
        }
        if let Some(rest) = a.strip_prefix(&prefix) {
            return Some(rest.to_string());
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = flag_value(&args, "--config").map(PathBuf::from);
    let config = load_harvester_config(config_path.as_deref());
    let mut settings = config.resolve();
    if let Some(output) = flag_value(&args, "--output") {
        settings.snapshot_path = PathBuf::from(output);
    }

    info!("snapshot → {}", settings.snapshot_path.display());
    if let Ok(previous) = load_snapshot(&settings.snapshot_path) {
        info!(
            "previous snapshot holds {} products (generated {}); it will be overwritten",
            previous.count, previous.generated_at
        );
    }

    let session = match BrowserSession::connect(&settings.cdp_url).await {
        Ok(s) => s,
        Err(e) => {
            error!("cannot attach to browser: {}", e);
            return Err(e.into());
        }
    };

    let dumper = Arc::new(DebugDumper::new(
        settings.debug_dir.clone(),
        settings.max_debug_dumps,
    ));
    let state = HarvestState::new(settings);
    let surface = CdpPageSurface::new(session.page().clone());

    if let Err(e) = surface.install_capture_hook().await {
        warn!("capture hook not installed (network capture continues): {}", e);
    }
    let observer = match network::spawn_network_observer(
        session.page().clone(),
        Arc::clone(&state.aggregator),
        Arc::clone(&dumper),
    )
    .await
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("network observer unavailable: {}", e);
            None
        }
    };
    let commands = spawn_stdin_channel(state.auto_scroll.clone());
    info!("[*] type 's' + Enter to toggle auto-scroll");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let summary = drive(&surface, &state, shutdown).await;

    info!(
        "[✓] done: {} products, {} passes ({} failed), {} visits, {} harvested, {} timed out",
        summary.products,
        summary.passes,
        summary.failed_passes,
        summary.visited,
        summary.harvested,
        summary.timed_out
    );
    info!(
        "capture: {} network / {} buffer fragments, {} merged, {} debug dumps",
        summary.capture.network_fragments,
        summary.capture.buffer_fragments,
        summary.capture.merged_fragments,
        dumper.written()
    );
    if dumper.written() > 0 {
        info!("debug dumps in {}", dumper.dir().display());
    }

    if session.is_closed() {
        warn!("browser connection was lost during the run");
    }
    commands.abort();
    if let Some(handle) = observer {
        handle.abort();
    }
    session.close().await;
    // The stdin reader is parked in a blocking read the runtime would wait on.
    std::process::exit(0)
}

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use footfall::db::Database;
use footfall::ignore::IgnoreList;
use footfall::radio::{self, ble};
use footfall::scanner::{ScanController, ScanLoopConfig};
use footfall::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("footfall starting up...");

    let settings = Settings::load();

    // The store is the only load-bearing startup dependency; anything else
    // degrades gracefully.
    let db = Database::new(settings.database_path.clone())
        .context("failed to open the sighting store")?;

    match db.count_sightings().await {
        Ok(count) => {
            let latest = db.latest_sighting_at().await.unwrap_or(None);
            match latest {
                Some(latest) => info!("{count} sighting(s) on record, latest at {latest}"),
                None => info!("{count} sighting(s) on record"),
            }
        }
        Err(err) => warn!("could not read sighting count: {err:?}"),
    }

    let ignore = IgnoreList::load(&settings.ignore_list_path);

    let ((cmd_tx, event_rx), (cmd_rx, event_tx)) = radio::channels();

    let radio_cancel = CancellationToken::new();
    let radio_handle = tokio::spawn(ble::run_radio(
        cmd_rx,
        event_tx,
        radio_cancel.clone(),
    ));

    let mut controller = ScanController::new();
    controller.start(
        ScanLoopConfig {
            period: settings.scan_period(),
            window: settings.scan_window(),
            horizon: settings.memory_horizon(),
        },
        ignore,
        db.clone(),
        cmd_tx,
        event_rx,
    )?;

    wait_for_termination().await;
    info!("termination signal received; shutting down");

    // Shutdown order: close any open window and stop the worker, stop the
    // radio driver, then let queued writes drain within the grace period.
    if let Err(err) = controller.stop().await {
        error!("scanner did not stop cleanly: {err:?}");
    }

    radio_cancel.cancel();
    if let Err(err) = radio_handle.await {
        error!("radio driver did not stop cleanly: {err:?}");
    }

    db.close(settings.shutdown_grace()).await;

    info!("footfall shut down cleanly");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            warn!("failed to install SIGTERM handler: {err}");
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("failed to wait for ctrl-c: {err}");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!("failed to wait for ctrl-c: {err}");
            }
        }
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to wait for ctrl-c: {err}");
    }
}

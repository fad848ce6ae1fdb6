use chrono::Utc;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cache::{DeviceMemory, DeviceSummary};
use crate::classify::{classify, Classification};
use crate::db::Database;
use crate::fingerprint::fingerprint;
use crate::ignore::IgnoreList;
use crate::models::{Advertisement, Sighting};
use crate::radio::{CommandSender, EventReceiver, RadioCommand, RadioEvent};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone)]
pub struct ScanLoopConfig {
    /// Time between window openings.
    pub period: Duration,
    /// How long the radio listens per period. Strictly shorter than
    /// `period`, enforced at settings load.
    pub window: Duration,
    /// Sliding suppression horizon for the device memory.
    pub horizon: chrono::Duration,
}

/// Scheduler phase. At most one window is ever open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Listening,
}

#[derive(Debug, Default)]
struct WindowStats {
    seen: u64,
    suppressed: u64,
    ignored: u64,
    phones: u64,
}

/// The single worker that owns the whole pipeline: scheduler timers, the
/// device memory, the ignore filter and the per-event processing all live
/// on this task, which is what makes the cache single-writer without a
/// lock. Persistence is fire-and-forget through the database queue, so a
/// slow disk never stalls event intake.
pub async fn scan_loop(
    config: ScanLoopConfig,
    ignore: IgnoreList,
    db: Database,
    cmd_tx: CommandSender,
    mut event_rx: EventReceiver,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval(config.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut cache = DeviceMemory::new(config.horizon);
    let mut phase = Phase::Idle;
    let mut radio_ready = false;
    let mut window_deadline: Option<Instant> = None;
    let mut stats = WindowStats::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !radio_ready {
                    log_info!("scan tick skipped: radio not ready");
                    continue;
                }
                if phase == Phase::Listening {
                    // Window misconfigured or stop delayed; never stack windows.
                    log_warn!("scan tick while window still open; ignoring");
                    continue;
                }
                if cmd_tx.send(RadioCommand::StartListening).is_err() {
                    log_warn!("radio driver gone; scan loop exiting");
                    break;
                }
                phase = Phase::Listening;
                window_deadline = Some(Instant::now() + config.window);
                stats = WindowStats::default();
                log_info!("scan window opened ({}s)", config.window.as_secs());
            }

            _ = deadline_elapsed(window_deadline), if window_deadline.is_some() => {
                close_window(&mut phase, &mut window_deadline, &cmd_tx, &mut cache, &stats);
            }

            event = event_rx.recv() => {
                match event {
                    Some(RadioEvent::Ready) => {
                        radio_ready = true;
                        log_info!("radio ready; scheduling resumed");
                    }
                    Some(RadioEvent::Unavailable) => {
                        radio_ready = false;
                        log_warn!("radio unavailable; scheduling suspended");
                        if phase == Phase::Listening {
                            close_window(&mut phase, &mut window_deadline, &cmd_tx, &mut cache, &stats);
                        }
                    }
                    Some(RadioEvent::Advertisement(adv)) => {
                        process_advertisement(adv, &mut cache, &ignore, &db, &mut stats);
                    }
                    None => {
                        log_warn!("radio event channel closed; scan loop exiting");
                        break;
                    }
                }
            }

            _ = cancel_token.cancelled() => {
                if phase == Phase::Listening {
                    close_window(&mut phase, &mut window_deadline, &cmd_tx, &mut cache, &stats);
                }
                log_info!("scan loop shutting down");
                break;
            }
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn close_window(
    phase: &mut Phase,
    window_deadline: &mut Option<Instant>,
    cmd_tx: &CommandSender,
    cache: &mut DeviceMemory,
    stats: &WindowStats,
) {
    if cmd_tx.send(RadioCommand::StopListening).is_err() {
        log_warn!("radio driver gone while closing window");
    }
    *phase = Phase::Idle;
    *window_deadline = None;

    // One sweep per cycle bounds memory independent of sighting volume.
    let now = Utc::now();
    let evicted = cache.sweep(now);

    log_info!(
        "scan window closed: {} seen, {} suppressed, {} ignored, {} phones recorded; {} cache entries ({} evicted)",
        stats.seen,
        stats.suppressed,
        stats.ignored,
        stats.phones,
        cache.len(),
        evicted,
    );
}

/// Per-event pipeline: fingerprint, dedup gate, ignore filter, classify,
/// persist. Nothing in here can abort the scan loop; a bad advertisement
/// costs at most its own record.
fn process_advertisement(
    adv: Advertisement,
    cache: &mut DeviceMemory,
    ignore: &IgnoreList,
    db: &Database,
    stats: &mut WindowStats,
) {
    let now = Utc::now();
    let digest = fingerprint(&adv);
    stats.seen += 1;

    let summary = DeviceSummary {
        address: adv.address.clone(),
        local_name: adv.local_name.clone(),
        rssi: adv.rssi,
    };

    // The gate also refreshes last_seen, so even suppressed sightings
    // slide their own horizon.
    if !cache.should_process(&digest, now, summary) {
        stats.suppressed += 1;
        return;
    }

    if ignore.is_ignored(&adv.address) {
        stats.ignored += 1;
        log_info!("ignoring listed address {} (digest {})", adv.address, digest);
        return;
    }

    match classify(&adv) {
        Classification::Phone(reason) => {
            stats.phones += 1;
            log_info!(
                "phone sighted: digest={} address={} name={:?} rssi={} reason={} source={}",
                digest,
                adv.address,
                adv.local_name,
                adv.rssi,
                reason.as_str(),
                adv.source_id,
            );
            db.record_sighting(Sighting::from_advertisement(now, digest, &adv));
        }
        Classification::NotPhone => {}
    }
}

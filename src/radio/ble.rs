//! BLE radio driver built on `bluest`.
//!
//! Runs as its own task: acquires the platform adapter (retrying until one
//! shows up), reports readiness, then serves start/stop commands from the
//! scan loop. Listening holds a `bluest` scan stream; dropping the stream
//! is what stops the platform scan. A stream that terminates on its own
//! means the adapter went away, which suspends the scheduler until
//! readiness returns.

use std::pin::pin;

use bluest::{Adapter, AdvertisingDevice};
use futures_lite::StreamExt;
use log::{debug, warn};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::models::{AddressKind, Advertisement};

use super::{CommandReceiver, EventSender, RadioCommand, RadioEvent};

const ADAPTER_RETRY_SECS: u64 = 5;

pub async fn run_radio(
    mut cmd_rx: CommandReceiver,
    event_tx: EventSender,
    cancel: CancellationToken,
) {
    loop {
        let adapter = tokio::select! {
            adapter = acquire_adapter() => adapter,
            _ = cancel.cancelled() => return,
        };

        if event_tx.send(RadioEvent::Ready).await.is_err() {
            return;
        }

        if !serve_adapter(&adapter, &mut cmd_rx, &event_tx, &cancel).await {
            return;
        }

        if event_tx.send(RadioEvent::Unavailable).await.is_err() {
            return;
        }
    }
}

/// Wait until a powered adapter exists, retrying indefinitely. Adapter
/// absence is a radio error, never fatal to the process.
async fn acquire_adapter() -> Adapter {
    loop {
        match Adapter::default().await {
            Some(adapter) => match adapter.wait_available().await {
                Ok(()) => return adapter,
                Err(err) => {
                    warn!("bluetooth adapter not available ({err}); retrying");
                }
            },
            None => {
                warn!("no bluetooth adapter found; retrying");
            }
        }
        sleep(Duration::from_secs(ADAPTER_RETRY_SECS)).await;
    }
}

/// Serve commands while idle. Returns `false` to stop the driver entirely,
/// `true` when the adapter was lost and must be re-acquired.
async fn serve_adapter(
    adapter: &Adapter,
    cmd_rx: &mut CommandReceiver,
    event_tx: &EventSender,
    cancel: &CancellationToken,
) -> bool {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            cmd = cmd_rx.recv() => match cmd {
                None => return false,
                // Stop while already idle: stale instruction, nothing to do.
                Some(RadioCommand::StopListening) => {}
                Some(RadioCommand::StartListening) => {
                    match listen(adapter, cmd_rx, event_tx, cancel).await {
                        ListenOutcome::Stopped => {}
                        ListenOutcome::Cancelled => return false,
                        ListenOutcome::AdapterLost => return true,
                    }
                }
            }
        }
    }
}

enum ListenOutcome {
    Stopped,
    Cancelled,
    AdapterLost,
}

async fn listen(
    adapter: &Adapter,
    cmd_rx: &mut CommandReceiver,
    event_tx: &EventSender,
    cancel: &CancellationToken,
) -> ListenOutcome {
    let scan = match adapter.scan(&[]).await {
        Ok(scan) => scan,
        Err(err) => {
            warn!("failed to start BLE scan: {err}");
            return ListenOutcome::AdapterLost;
        }
    };
    let mut scan = pin!(scan);
    debug!("BLE scan started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ListenOutcome::Cancelled,
            cmd = cmd_rx.recv() => match cmd {
                None => return ListenOutcome::Cancelled,
                // Dropping the scan stream stops the platform scan.
                Some(RadioCommand::StopListening) => {
                    debug!("BLE scan stopped");
                    return ListenOutcome::Stopped;
                }
                Some(RadioCommand::StartListening) => {}
            },
            discovered = scan.next() => match discovered {
                Some(discovered) => {
                    match event_tx.try_send(RadioEvent::Advertisement(decode(discovered))) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            // No delivery guarantee for passive observation.
                            debug!("event queue full; advertisement dropped");
                        }
                        Err(TrySendError::Closed(_)) => return ListenOutcome::Cancelled,
                    }
                }
                None => {
                    warn!("BLE scan stream ended; adapter lost");
                    return ListenOutcome::AdapterLost;
                }
            }
        }
    }
}

/// Map a `bluest` discovery to the pipeline's advertisement shape,
/// re-assembling the manufacturer payload as little-endian company id
/// followed by vendor data, the wire layout the classifier expects.
fn decode(discovered: AdvertisingDevice) -> Advertisement {
    let source_id = discovered.device.id().to_string();
    let address = source_id.to_ascii_lowercase();
    let adv = discovered.adv_data;

    let manufacturer_data = adv.manufacturer_data.map(|md| {
        let mut payload = Vec::with_capacity(2 + md.data.len());
        payload.extend_from_slice(&md.company_id.to_le_bytes());
        payload.extend_from_slice(&md.data);
        payload
    });

    Advertisement {
        address_kind: address_kind_of(&address),
        is_connectable: adv.is_connectable,
        local_name: adv.local_name,
        tx_power: adv.tx_power_level,
        service_uuids: adv.services.iter().map(|uuid| uuid.to_string()).collect(),
        manufacturer_data,
        rssi: discovered.rssi.unwrap_or(0),
        address,
        source_id,
    }
}

/// BLE random addresses set the two top bits of the leading octet (static
/// random is 0b11). A platform identifier that does not look like a MAC at
/// all is opaque, which in practice means the OS is hiding a rotating
/// address, so it is treated as random too.
fn address_kind_of(address: &str) -> AddressKind {
    let first = address.split([':', '-']).next().unwrap_or("");
    match (first.len(), u8::from_str_radix(first, 16)) {
        (2, Ok(octet)) if octet & 0xc0 == 0xc0 => AddressKind::Random,
        (2, Ok(_)) => AddressKind::Public,
        _ => AddressKind::Random,
    }
}

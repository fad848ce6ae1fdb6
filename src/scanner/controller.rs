use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::Database;
use crate::ignore::IgnoreList;
use crate::radio::{CommandSender, EventReceiver};

use super::loop_worker::{scan_loop, ScanLoopConfig};

/// Owns the scan loop task. Start spawns the worker; stop cancels it and
/// waits for it to finish (which closes any open window on the way out).
pub struct ScanController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        config: ScanLoopConfig,
        ignore: IgnoreList,
        db: Database,
        cmd_tx: CommandSender,
        event_rx: EventReceiver,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("scanner already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        info!(
            "starting scanner: period {}s, window {}s, horizon {}s",
            config.period.as_secs(),
            config.window.as_secs(),
            config.horizon.num_seconds(),
        );

        let handle = tokio::spawn(scan_loop(
            config,
            ignore,
            db,
            cmd_tx,
            event_rx,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("scan loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

//! Boundary between the scan loop and the radio driver.
//!
//! Two channels instead of callbacks: the scan loop sends rare
//! `RadioCommand`s on an unbounded channel (start/stop must never block a
//! timer path), and the driver pushes `RadioEvent`s on a bounded channel.
//! Passive observation carries no delivery guarantee, so an advertisement
//! that does not fit in the queue is dropped, not awaited.

use tokio::sync::mpsc;

use crate::models::Advertisement;

/// Depth of the driver-to-worker event queue.
pub const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCommand {
    StartListening,
    StopListening,
}

#[derive(Debug)]
pub enum RadioEvent {
    /// The adapter is powered and able to scan.
    Ready,
    /// The adapter went away; the scheduler suspends until `Ready`.
    Unavailable,
    /// One decoded advertisement, emitted only while listening.
    Advertisement(Advertisement),
}

pub type CommandSender = mpsc::UnboundedSender<RadioCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<RadioCommand>;
pub type EventSender = mpsc::Sender<RadioEvent>;
pub type EventReceiver = mpsc::Receiver<RadioEvent>;

/// Create the paired channels for one scan loop / driver pair. Returns the
/// worker-side handles first, the driver-side handles second.
pub fn channels() -> ((CommandSender, EventReceiver), (CommandReceiver, EventSender)) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    ((cmd_tx, event_rx), (cmd_rx, event_tx))
}

#[cfg(feature = "ble")]
pub mod ble;

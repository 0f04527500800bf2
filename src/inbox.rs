//! Bounded command inbox.
//!
//! Payloads are produced by network callbacks (MQTT event task, HTTP
//! handlers) and consumed by the control loop, which decodes and applies
//! them one at a time between `update` calls.  Callbacks never touch the
//! service directly.
//!
//! Backed by an `embassy-sync` channel: `try_send` from the producers,
//! `try_receive` from the loop.  Neither side ever blocks.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT task   │────▶│              │     │              │
//! │ HTTP task   │────▶│    Inbox     │────▶│ Control loop │
//! │ Serial      │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;
use log::warn;

/// Maximum number of pending payloads.
pub const INBOX_CAP: usize = 8;
/// Longest accepted payload (bytes).  The JSON envelope fits easily.
pub const PAYLOAD_CAP: usize = 128;

pub type Payload = String<PAYLOAD_CAP>;

/// Fixed-depth MPSC channel guarded by a critical section, so producers
/// on other FreeRTOS tasks never block the control loop.
pub struct CommandInbox {
    channel: Channel<CriticalSectionRawMutex, Payload, INBOX_CAP>,
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue a raw payload without blocking.
    /// Returns `false` if the payload is oversized or the inbox is full
    /// (payload dropped).
    pub fn push(&self, payload: &str) -> bool {
        let mut item = Payload::new();
        if item.push_str(payload).is_err() {
            warn!("Inbox: {}-byte payload exceeds {} bytes, dropped", payload.len(), PAYLOAD_CAP);
            return false;
        }
        if self.channel.try_send(item).is_err() {
            warn!("Inbox: full, dropping command");
            return false;
        }
        true
    }

    /// Oldest pending payload, if any.
    pub fn pop(&self) -> Option<Payload> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending payloads into a callback, in FIFO order.
    /// Payloads pushed while `handler` runs are picked up in the same drain.
    pub fn drain(&self, mut handler: impl FnMut(&str)) {
        while let Some(payload) = self.pop() {
            handler(payload.as_str());
        }
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

/// Firmware-wide inbox shared by every transport callback.
pub static INBOX: CommandInbox = CommandInbox::new();

/// Enqueue into [`INBOX`].  Safe to call from any task.
pub fn push_command(payload: &str) -> bool {
    INBOX.push(payload)
}

/// Drain [`INBOX`].  Called from the control loop (single consumer).
pub fn drain_commands(handler: impl FnMut(&str)) {
    INBOX.drain(handler);
}

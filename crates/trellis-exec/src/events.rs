//! Channel-backed event sink.
//!
//! Core defines the event vocabulary and the `EventSink` seam; this is the
//! concrete sink the runtime wires up. Bounded and lossy on purpose: a slow
//! or absent consumer costs events, never execution progress.

use std::sync::Arc;

use tokio::sync::mpsc;

use trellis_core::events::{EventEmitter, EventSink, ExecEvent};

struct ChannelSink {
    tx: mpsc::Sender<ExecEvent>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: ExecEvent) {
        // try_send: never block the executor; drop on a full channel.
        let _ = self.tx.try_send(event);
    }
}

/// Build a bounded diagnostic channel and the emitter that feeds it.
pub fn event_channel(capacity: usize) -> (EventEmitter, mpsc::Receiver<ExecEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventEmitter::new(Arc::new(ChannelSink { tx })), rx)
}

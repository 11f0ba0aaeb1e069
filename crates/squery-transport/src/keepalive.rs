//! Idle keep-alive
//!
//! The server drops query clients that stay silent for too long. A single
//! space followed by a newline is ignored by the command parser and resets
//! the idle timer.

use bytes::Bytes;
use squery_core::KEEPALIVE_FRAME;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::writer::LineWriter;

/// Write a keep-alive frame every `period` until a write fails
pub async fn keep_alive(writer: LineWriter, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = writer.send(Bytes::from_static(KEEPALIVE_FRAME)).await {
            debug!("keep-alive stopped: {}", e);
            return;
        }
    }
}

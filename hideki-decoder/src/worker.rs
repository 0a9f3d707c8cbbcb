//! The two background loops `Decoder::start` spawns: an edge timer that
//! turns GPIO transitions into pulse durations, and a decoder loop that
//! drains those durations through `FrameDecoder` and publishes completed
//! frames to the `Mailbox`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hideki_bsp::gpio::{EdgeWait, GpioLine};
use hideki_bsp::Receiver;

use crate::decoder::FrameDecoder;
use crate::decoder::NOISE_THRESHOLD_US;
use crate::mailbox::Mailbox;
use crate::pulse::PulseSender;

/// Backoff when the pulse queue is empty, mirroring the original's
/// millisecond sleep between `ConcurrentQueue::try_dequeue` attempts.
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Times GPIO edges and enqueues the interval since the previous one,
/// dropping anything at or below [`NOISE_THRESHOLD_US`]. Runs until
/// `cancel` is set. `edge_timeout` also bounds shutdown latency: it's how
/// long `wait_edge` blocks before the cancellation flag is re-checked.
pub fn receiver_loop(gpio: GpioLine, sender: PulseSender, cancel: Arc<AtomicBool>, edge_timeout: Duration) {
    let mut last_edge = Instant::now();
    while !cancel.load(Ordering::Relaxed) {
        match gpio.wait_edge(edge_timeout) {
            Ok(EdgeWait::Edge) => {
                let now = Instant::now();
                let duration_us = now.duration_since(last_edge).as_micros().min(u32::MAX as u128) as u32;
                last_edge = now;
                if duration_us > NOISE_THRESHOLD_US {
                    // A full queue means the decoder thread has stalled;
                    // dropping the pulse is the same failure mode the
                    // original's bounded queue has, so we let it happen
                    // rather than block the edge timer indefinitely.
                    if sender.try_send(duration_us).is_err() {
                        log::debug!("pulse queue full, dropping edge");
                    }
                }
            }
            Ok(EdgeWait::Timeout) => {}
            Err(err) => {
                log::debug!("gpio edge wait failed: {err}");
            }
        }
    }
}

/// Drains pulses and feeds them through `decoder`, publishing any completed
/// frame to `mailbox`. Runs until `cancel` is set and the queue is drained.
pub fn decoder_loop(
    receiver: crate::pulse::PulseReceiver,
    decoder: &mut FrameDecoder,
    mailbox: &Mailbox,
    front_end: &dyn Receiver,
    cancel: Arc<AtomicBool>,
) {
    loop {
        match receiver.try_recv() {
            Ok(duration_us) => {
                if let Some(frame) = decoder.process_pulse(duration_us, front_end) {
                    mailbox.publish(frame);
                }
            }
            Err(crossbeam_channel::TryRecvError::Empty) => {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                std::thread::sleep(QUEUE_POLL_INTERVAL);
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => return,
        }
    }
}

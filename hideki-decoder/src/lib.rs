//! Lifecycle and public API for the Hideki/Cresta receive pipeline: start
//! and stop the receiver/decoder thread pair, adjust the edge-wait timeout,
//! and drain completed telegrams.
//!
//! `Decoder` owns no Hideki-specific parsing itself — that lives in
//! [`FrameDecoder`], a pure state machine with no thread or I/O dependency.
//! This crate root only wires that state machine to real GPIO and a real
//! (or null) radio front end.

pub mod crc;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod mailbox;
pub mod pulse;
mod worker;

pub use decoder::FrameDecoder;
pub use error::DecoderError;
pub use frame::{Frame, Telegram, BUFFER_LEN};
pub use mailbox::Mailbox;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use hideki_bsp::gpio::{GpioConfig, GpioLine};
use hideki_bsp::Receiver;

use error::Result;

/// Default edge-wait timeout, matching the original's default read timeout
/// on the sysfs GPIO value file.
const DEFAULT_TIMEOUT_MS: u64 = 200;

struct RunningThreads {
    cancel: Arc<AtomicBool>,
    receiver: JoinHandle<()>,
    decoder: JoinHandle<()>,
}

/// Owns the GPIO line configuration and radio front end, and drives the
/// receiver/decoder thread pair across `start`/`stop` cycles. Safe to share
/// across threads: `get_decoded_data` is the only method expected to be
/// called concurrently with a running pipeline, and it only touches the
/// `Mailbox`.
pub struct Decoder {
    gpio_config: GpioConfig,
    front_end: Arc<dyn Receiver>,
    timeout_ms: Mutex<u64>,
    mailbox: Arc<Mailbox>,
    threads: Mutex<Option<RunningThreads>>,
}

impl Decoder {
    pub fn new(gpio_config: GpioConfig, front_end: Arc<dyn Receiver>) -> Self {
        Decoder {
            gpio_config,
            front_end,
            timeout_ms: Mutex::new(DEFAULT_TIMEOUT_MS),
            mailbox: Arc::new(Mailbox::new()),
            threads: Mutex::new(None),
        }
    }

    /// Sets the GPIO edge-wait timeout. Only takes effect on the next
    /// `start()`; a call while the pipeline is already running is accepted
    /// but has no effect on the threads already in flight, matching the
    /// original `setTimeout` contract.
    pub fn set_timeout(&self, timeout_ms: u64) {
        *self.timeout_ms.lock().expect("timeout lock poisoned") = timeout_ms;
    }

    /// Starts the receiver and decoder threads. Idempotent: returns `true`
    /// without spawning anything if a pipeline is already active. Returns
    /// `false` (and leaves no threads running) if the GPIO line can't be
    /// acquired or a worker thread fails to spawn, matching the original
    /// `bool Decoder::start()`.
    pub fn start(&self) -> bool {
        match self.try_start() {
            Ok(()) => true,
            Err(err) => {
                log::error!("decoder start failed: {err}");
                false
            }
        }
    }

    fn try_start(&self) -> Result<()> {
        let mut threads = self.threads.lock().expect("threads lock poisoned");
        if threads.is_some() {
            return Ok(());
        }

        let gpio = GpioLine::enable(&self.gpio_config).map_err(DecoderError::GpioUnavailable)?;
        let (sender, pulse_receiver) = pulse::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let edge_timeout = Duration::from_millis(*self.timeout_ms.lock().expect("timeout lock poisoned"));

        let receiver_cancel = Arc::clone(&cancel);
        let receiver_handle = std::thread::Builder::new()
            .name("hideki-edge-timer".into())
            .spawn(move || worker::receiver_loop(gpio, sender, receiver_cancel, edge_timeout))
            .map_err(DecoderError::ReceiverThreadSpawn)?;

        let decoder_cancel = Arc::clone(&cancel);
        let mailbox = Arc::clone(&self.mailbox);
        let front_end = Arc::clone(&self.front_end);
        let decoder_handle = match std::thread::Builder::new()
            .name("hideki-decoder".into())
            .spawn(move || {
                let mut frame_decoder = FrameDecoder::new();
                worker::decoder_loop(pulse_receiver, &mut frame_decoder, &mailbox, front_end.as_ref(), decoder_cancel)
            }) {
            Ok(handle) => handle,
            Err(err) => {
                // The edge timer is already running; signal and join it so
                // the GPIO line doesn't leak with the pin held forever.
                cancel.store(true, Ordering::Relaxed);
                if receiver_handle.join().is_err() {
                    log::error!("edge timer thread panicked during start rollback");
                }
                return Err(DecoderError::DecoderThreadSpawn(err));
            }
        };

        *threads = Some(RunningThreads { cancel, receiver: receiver_handle, decoder: decoder_handle });
        Ok(())
    }

    /// Signals both threads to stop and joins them. Returns `false` if no
    /// pipeline was running. The mailbox is left as-is: any frame published
    /// before the stop is still available to `get_decoded_data`.
    pub fn stop(&self) -> bool {
        let running = self.threads.lock().expect("threads lock poisoned").take();
        let Some(running) = running else {
            return false;
        };
        running.cancel.store(true, Ordering::Relaxed);
        if running.receiver.join().is_err() {
            log::error!("edge timer thread panicked");
        }
        if running.decoder.join().is_err() {
            log::error!("decoder thread panicked");
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.threads.lock().expect("threads lock poisoned").is_some()
    }

    /// Copies out the oldest undrained telegram. Returns the legacy byte
    /// count contract (`declared_length + 1`, or 0 if nothing is pending).
    pub fn get_decoded_data(&self, out: &mut [u8; BUFFER_LEN], rssi: &mut f64) -> i32 {
        self.mailbox.get_decoded_data(out, rssi)
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.stop();
    }
}

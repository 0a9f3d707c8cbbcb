//! Radio front-end capability: initialization state plus instantaneous RSSI.

use std::sync::Mutex;

use crate::cc1101::Cc1101;

/// Whether a front end is usable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReceiverState {
    Error,
    Initialized,
}

/// Capability exposed to the decoder thread: state and instantaneous RSSI.
///
/// Implementors must be safe to call concurrently with normal decode
/// operation (`rssi()` is sampled once per accepted byte).
pub trait Receiver: Send + Sync {
    fn state(&self) -> ReceiverState;

    /// Instantaneous received signal strength, in dBm.
    fn rssi(&self) -> f64;
}

/// Always-ready receiver with a constant RSSI of 0.0, for bench testing or
/// running the decoder without a radio attached.
#[derive(Default)]
pub struct NullReceiver;

impl Receiver for NullReceiver {
    fn state(&self) -> ReceiverState {
        ReceiverState::Initialized
    }

    fn rssi(&self) -> f64 {
        0.0
    }
}

/// Receiver backed by a CC1101 transceiver over SPI.
///
/// The CC1101 handle is mutex-guarded: the decoder thread is the only
/// expected caller of `rssi()` post-init, but the lock makes a second
/// concurrent caller safe rather than merely unspecified.
pub struct Cc1101Receiver {
    chip: Mutex<Cc1101>,
}

impl Cc1101Receiver {
    pub fn new(chip: Cc1101) -> Self {
        Cc1101Receiver { chip: Mutex::new(chip) }
    }
}

impl Receiver for Cc1101Receiver {
    fn state(&self) -> ReceiverState {
        match self.chip.lock() {
            Ok(chip) => chip.state(),
            Err(_) => ReceiverState::Error,
        }
    }

    fn rssi(&self) -> f64 {
        match self.chip.lock() {
            Ok(mut chip) => match chip.rssi() {
                Ok(value) => value,
                Err(err) => {
                    log::warn!("cc1101 rssi read failed: {err}");
                    f64::NAN
                }
            },
            Err(_) => f64::NAN,
        }
    }
}

//! One-slot mailbox handing completed frames from the decoder thread to any
//! number of consumer threads calling `get_decoded_data`.

use std::sync::RwLock;

use crate::frame::{Frame, Telegram, BUFFER_LEN};

struct MailboxState {
    frame: Option<Frame>,
    has_new: bool,
}

/// RW-locked one-slot mailbox. The decoder thread is the sole writer; any
/// number of consumer threads may read concurrently.
pub struct Mailbox {
    inner: RwLock<MailboxState>,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox { inner: RwLock::new(MailboxState { frame: None, has_new: false }) }
    }

    /// Stores a newly-validated frame, overwriting any unread one.
    pub fn publish(&self, frame: Frame) {
        let mut state = self.inner.write().expect("mailbox lock poisoned");
        state.frame = Some(frame);
        state.has_new = true;
    }

    pub fn clear(&self) {
        let mut state = self.inner.write().expect("mailbox lock poisoned");
        state.frame = None;
        state.has_new = false;
    }

    /// Copies out the pending frame and clears the slot. Returns the number
    /// of meaningful bytes (`declared_length + 1`, per the legacy contract),
    /// or 0 if no frame is pending.
    pub fn get_decoded_data(&self, out: &mut [u8; BUFFER_LEN], rssi: &mut f64) -> i32 {
        let snapshot = {
            let state = self.inner.read().expect("mailbox lock poisoned");
            if !state.has_new {
                return 0;
            }
            state.frame.clone()
        };

        let Some(frame) = snapshot else {
            return 0;
        };

        *out = frame.data;
        *rssi = frame.average_rssi();
        let length = frame.declared_length();

        let mut state = self.inner.write().expect("mailbox lock poisoned");
        state.has_new = false;
        state.frame = None;

        (length + 1) as i32
    }

    /// Idiomatic alternative to [`Mailbox::get_decoded_data`]: takes the
    /// pending frame as a `Telegram`, or `None` if nothing is pending. Same
    /// drain semantics — a frame is returned to at most one caller.
    pub fn try_take(&self) -> Option<Telegram> {
        let snapshot = {
            let state = self.inner.read().expect("mailbox lock poisoned");
            if !state.has_new {
                return None;
            }
            state.frame.clone()
        };

        let frame = snapshot?;
        let mut state = self.inner.write().expect("mailbox lock poisoned");
        state.has_new = false;
        state.frame = None;

        Some(Telegram { data: frame.data, length: frame.declared_length() + 1, rssi: frame.average_rssi() })
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

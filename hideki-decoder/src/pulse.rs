//! The pulse hand-off between the receiver thread and the decoder thread.

/// Microsecond duration between two successive GPIO edges. 32 bits rather
/// than 16: the original's "16 bits suffice" comment holds for any real
/// bit-length pulse, but a stalled line can accumulate an interval far past
/// that before the receiver thread notices and reports it as noise.
pub type PulseDuration = u32;

/// Capacity of the bounded pulse channel. The decoder thread drains this
/// far faster than pulses arrive (a Hideki transmission tops out at a few
/// hundred bits/second); the bound exists to cap memory if the decoder
/// thread ever stalls, not to apply backpressure in normal operation.
pub const QUEUE_CAPACITY: usize = 64;

/// Sending half of the pulse queue, held by the receiver thread.
pub type PulseSender = crossbeam_channel::Sender<PulseDuration>;

/// Receiving half of the pulse queue, held by the decoder thread.
pub type PulseReceiver = crossbeam_channel::Receiver<PulseDuration>;

/// Builds a bounded, single-producer single-consumer pulse channel.
pub fn channel() -> (PulseSender, PulseReceiver) {
    crossbeam_channel::bounded(QUEUE_CAPACITY)
}

//! Radio front-end abstraction for Hideki/Cresta 433.92 MHz sensors: the
//! GPIO line the demodulator output runs on, and the CC1101 SPI driver for
//! boards where the front end is a full transceiver rather than a bare OOK
//! receiver module.

pub mod cc1101;
pub mod error;
pub mod gpio;
pub mod receiver;

pub use cc1101::{Cc1101, Cc1101Config, Interrupt};
pub use error::BspError;
pub use gpio::{EdgeWait, GpioConfig, GpioLine};
pub use receiver::{Cc1101Receiver, NullReceiver, Receiver, ReceiverState};

use thiserror::Error;

/// Hardware-configuration and transient I/O errors from the radio front end.
#[derive(Debug, Error)]
pub enum BspError {
    #[error("SPI device path is empty")]
    InvalidDevicePath,

    #[error("interrupt selector must be 0 or 2, got {0}")]
    InvalidInterrupt(i32),

    #[error("GPIO pin {0} is out of range (1..=40)")]
    InvalidPin(u32),

    #[error("failed to open SPI device: {0}")]
    SpiOpen(#[source] std::io::Error),

    #[error("failed to configure SPI device: {0}")]
    SpiConfigure(#[source] std::io::Error),

    #[error("SPI transfer failed: {0}")]
    SpiTransfer(#[source] std::io::Error),

    #[error("CC1101 did not reach RX state after SRX")]
    RxTimeout,

    #[error("failed to request GPIO line: {0}")]
    GpioRequest(#[source] std::io::Error),

    #[error("failed to read GPIO edge event: {0}")]
    GpioRead(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BspError>;

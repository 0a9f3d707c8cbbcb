use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("failed to enable GPIO line: {0}")]
    GpioUnavailable(#[source] hideki_bsp::BspError),

    #[error("failed to spawn receiver thread: {0}")]
    ReceiverThreadSpawn(#[source] std::io::Error),

    #[error("failed to spawn decoder thread: {0}")]
    DecoderThreadSpawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DecoderError>;

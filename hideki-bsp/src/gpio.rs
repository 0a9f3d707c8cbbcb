//! GPIO line interface: open a digital input with both-edge detection,
//! block for the next edge with a timeout, and release on drop.
//!
//! Backed by the Linux GPIO character-device ABI (`gpiocdev`) rather than
//! the deprecated sysfs `/sys/class/gpio` tree; the operations
//! (`enable`/`wait_edge`/`disable`) match the design-level contract exactly.

use std::time::Duration;

use gpiocdev::line::EdgeDetection;
use gpiocdev::request::Request;

use crate::error::{BspError, Result};

const DEFAULT_CHIP: &str = "/dev/gpiochip0";

/// Chip path and line offset for the GPIO edge timer input.
#[derive(Clone, Debug)]
pub struct GpioConfig {
    pub chip: String,
    pub pin: u32,
}

impl GpioConfig {
    pub fn new(pin: u32) -> Result<Self> {
        Self::on_chip(DEFAULT_CHIP, pin)
    }

    pub fn on_chip(chip: impl Into<String>, pin: u32) -> Result<Self> {
        if !(1..=40).contains(&pin) {
            return Err(BspError::InvalidPin(pin));
        }
        Ok(GpioConfig { chip: chip.into(), pin })
    }
}

/// Result of waiting for the next edge.
pub enum EdgeWait {
    Edge,
    Timeout,
}

/// A GPIO input line configured for both-edge interrupts.
pub struct GpioLine {
    request: Request,
}

impl GpioLine {
    /// Exports and configures the line for both-edge, input-direction
    /// interrupts. Fails if the pin is out of the valid `1..=40` range or
    /// the kernel refuses the line request.
    pub fn enable(config: &GpioConfig) -> Result<Self> {
        if !(1..=40).contains(&config.pin) {
            return Err(BspError::InvalidPin(config.pin));
        }
        let request = Request::builder()
            .on_chip(config.chip.as_str())
            .with_consumer("hideki-decoder")
            .with_line(config.pin)
            .with_edge_detection(EdgeDetection::BothEdges)
            .request()
            .map_err(|err| BspError::GpioRequest(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
        Ok(GpioLine { request })
    }

    /// Blocks until the next edge or until `timeout` elapses.
    pub fn wait_edge(&self, timeout: Duration) -> Result<EdgeWait> {
        let ready = self
            .request
            .wait_edge_event(timeout)
            .map_err(|err| BspError::GpioRead(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
        if !ready {
            return Ok(EdgeWait::Timeout);
        }
        // Draining the event is what actually advances the kernel's queue;
        // its payload (edge kind, line timestamp) isn't needed here because
        // the receiver thread times the interval with its own clock.
        self.request
            .read_edge_event()
            .map_err(|err| BspError::GpioRead(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
        Ok(EdgeWait::Edge)
    }

    /// Releases the line. Also runs on drop, so explicit calls are optional.
    pub fn disable(self) {
        drop(self);
    }
}

//! CC1101 SPI driver: Hideki/Cresta-fixed configuration, reset, RX entry, RSSI.
//!
//! Register map, PATABLE, and the MARCSTATE poll loop are pinned by the
//! Hideki/Cresta protocol (433.92 MHz, ~2 kBaud, ~160 kHz bandwidth) and are
//! not meant to be reconfigured at runtime.

use std::convert::TryFrom;
use std::thread;
use std::time::Duration;

use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

use crate::error::{BspError, Result};
use crate::receiver::ReceiverState;

const READ_BYTE: u8 = 0x80;
const WRITE_BURST: u8 = 0x40;

const REG_MARCSTATE: u8 = 0xF5;
const REG_RSSI: u8 = 0xF4;
const MARCSTATE_RX: u8 = 0x0D;

const CMD_SRES: u8 = 0x30;
const CMD_SRX: u8 = 0x34;

/// Fixed Hideki/Cresta configuration, 47 registers starting at 0x00.
/// See http://ti.com/lit/ds/symlink/cc1101.pdf and swra215e for field meaning.
const CONFIG: [u8; 47] = [
    0x2E, 0x2E, 0x0D, 0x47, 0xD3, 0x91, 0xFF, 0x04, 0x31, 0x00, 0x00, 0x06, 0x00, 0x10, 0xB0, 0x71,
    0x96, 0x4A, 0x32, 0x22, 0xF8, 0x15, 0x07, 0x3C, 0x18, 0x16, 0x6C, 0x07, 0x00, 0x92, 0x87, 0x6B,
    0xFB, 0xB6, 0x11, 0xE9, 0x2A, 0x00, 0x1F, 0x41, 0x00, 0x59, 0x7F, 0x3F, 0x81, 0x35, 0x09,
];

/// PATABLE, 8 bytes at register 0x7E: only index 1 is non-zero.
const PATABLE: [u8; 8] = [0x00, 0x60, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// GDO pin carrying the demodulator output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interrupt {
    Gdo0,
    Gdo2,
}

impl TryFrom<i32> for Interrupt {
    type Error = BspError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Interrupt::Gdo0),
            2 => Ok(Interrupt::Gdo2),
            other => Err(BspError::InvalidInterrupt(other)),
        }
    }
}

/// SPI device path and interrupt routing for a CC1101 transceiver.
#[derive(Clone, Debug)]
pub struct Cc1101Config {
    pub spi_path: String,
    pub interrupt: Interrupt,
}

impl Cc1101Config {
    pub fn new(spi_path: impl Into<String>, interrupt: i32) -> Result<Self> {
        let spi_path = spi_path.into();
        let trimmed = spi_path.trim();
        if trimmed.is_empty() {
            return Err(BspError::InvalidDevicePath);
        }
        Ok(Cc1101Config { spi_path: trimmed.to_string(), interrupt: Interrupt::try_from(interrupt)? })
    }
}

/// CC1101 transceiver handle. Holds an open SPI device once initialized.
pub struct Cc1101 {
    spi: Option<Spidev>,
}

impl Cc1101 {
    /// Opens the SPI device, resets the chip, flashes the Hideki config and
    /// PATABLE, and waits for the chip to report RX state. On any failure the
    /// SPI handle is closed and an error is returned; the instance is never
    /// left half-initialized.
    pub fn open(config: &Cc1101Config) -> Result<Self> {
        let mut chip = Cc1101 { spi: None };
        chip.init(config).map_err(|err| {
            chip.spi = None;
            err
        })?;
        Ok(chip)
    }

    fn init(&mut self, config: &Cc1101Config) -> Result<()> {
        let mut spi = Spidev::open(&config.spi_path).map_err(BspError::SpiOpen)?;
        let options = SpidevOptions::new()
            .mode(SpiModeFlags::SPI_MODE_0)
            .bits_per_word(8)
            .max_speed_hz(500_000)
            .build();
        spi.configure(&options).map_err(BspError::SpiConfigure)?;
        self.spi = Some(spi);

        self.transfer(&mut [CMD_SRES])?;
        thread::sleep(Duration::from_secs(1));

        let mut config_burst = [0u8; 48];
        config_burst[0] = WRITE_BURST;
        config_burst[1..].copy_from_slice(&CONFIG);
        if config.interrupt == Interrupt::Gdo2 {
            config_burst[1] = 0x0D; // IOCFG2: route demodulator output to GDO2
            config_burst[3] = 0x2E; // IOCFG0: high-impedance, not connected
        }
        self.transfer(&mut config_burst)?;

        let mut patable_burst = [0u8; 9];
        patable_burst[0] = 0x7E | WRITE_BURST;
        patable_burst[1..].copy_from_slice(&PATABLE);
        self.transfer(&mut patable_burst)?;

        self.transfer(&mut [CMD_SRX])?;
        loop {
            let mut buf = [REG_MARCSTATE | READ_BYTE, 0x00];
            self.transfer(&mut buf)?;
            if buf[1] & 0x1F == MARCSTATE_RX {
                break;
            }
        }

        Ok(())
    }

    pub fn state(&self) -> ReceiverState {
        if self.spi.is_some() {
            ReceiverState::Initialized
        } else {
            ReceiverState::Error
        }
    }

    /// Reads the RSSI register and converts it to dBm: `0.5 * signed(b) - 74.0`.
    pub fn rssi(&mut self) -> Result<f64> {
        let mut buf = [REG_RSSI | READ_BYTE, 0x00];
        self.transfer(&mut buf)?;
        let raw = buf[1] as i32;
        let signed = if raw >= 128 { raw - 256 } else { raw };
        Ok(0.5 * signed as f64 - 74.0)
    }

    /// Full-duplex transfer, same buffer used for TX and RX.
    fn transfer(&mut self, data: &mut [u8]) -> Result<()> {
        let spi = self.spi.as_mut().ok_or(BspError::RxTimeout)?;
        let tx = data.to_vec();
        let mut rx = vec![0u8; data.len()];
        {
            let mut transfer = SpidevTransfer::read_write(&tx, &mut rx);
            spi.transfer(&mut transfer).map_err(BspError::SpiTransfer)?;
        }
        data.copy_from_slice(&rx);
        Ok(())
    }
}

impl Drop for Cc1101 {
    fn drop(&mut self) {
        self.spi = None;
    }
}

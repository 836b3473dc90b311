//! Waveshare 7.5" v2 (800x480, 1-bit) driver over Linux SPI/GPIO.
//!
//! Wiring follows the stock Waveshare e-Paper HAT: RST on BCM 17, DC on
//! BCM 25, BUSY on BCM 24, chip select on CE0 via /dev/spidev0.0.

use async_trait::async_trait;
use epd_waveshare::epd7in5_v2::{Epd7in5, HEIGHT, WIDTH};
use epd_waveshare::prelude::WaveshareDisplay;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
use log::{debug, info};

use crate::{FramePayload, PanelCapabilities, PanelDepth, PanelDriver, PanelError, Result};

const SPI_DEVICE: &str = "/dev/spidev0.0";
const GPIO_CHIP: &str = "/dev/gpiochip0";
const PIN_RST: u32 = 17;
const PIN_DC: u32 = 25;
const PIN_BUSY: u32 = 24;
const SPI_SPEED_HZ: u32 = 4_000_000;

/// Driver for the Waveshare 7.5" v2 panel on a Raspberry Pi.
pub struct Epd7in5Panel {
    spi: SpidevDevice,
    delay: Delay,
    epd: Epd7in5<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>,
    asleep: bool,
}

fn hw<E: std::fmt::Debug>(context: &str) -> impl Fn(E) -> PanelError + '_ {
    move |e| PanelError::hardware(format!("{}: {:?}", context, e))
}

fn output_pin(chip: &mut Chip, pin: u32) -> Result<CdevPin> {
    let handle = chip
        .get_line(pin)
        .map_err(hw("gpio line"))?
        .request(LineRequestFlags::OUTPUT, 0, "inkview")
        .map_err(hw("gpio request"))?;
    CdevPin::new(handle).map_err(hw("gpio pin"))
}

fn input_pin(chip: &mut Chip, pin: u32) -> Result<CdevPin> {
    let handle = chip
        .get_line(pin)
        .map_err(hw("gpio line"))?
        .request(LineRequestFlags::INPUT, 0, "inkview")
        .map_err(hw("gpio request"))?;
    CdevPin::new(handle).map_err(hw("gpio pin"))
}

impl Epd7in5Panel {
    /// Open the SPI device, claim the GPIO lines and init the controller.
    ///
    /// The 7.5" v2 controller is driven in 1-bit mode only. A `Gray4`
    /// request is rejected up front so a misconfigured display mode fails
    /// at startup instead of showing wrong gray levels.
    pub fn open(depth: PanelDepth) -> Result<Self> {
        if depth != PanelDepth::Mono1 {
            return Err(PanelError::hardware(
                "EPD 7.5\" v2 drives 1-bit frames only, set displayMode to \"mono\"",
            ));
        }

        let mut spi = SpidevDevice::open(SPI_DEVICE).map_err(hw(SPI_DEVICE))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.0.configure(&options).map_err(hw("spi configure"))?;

        let mut chip = Chip::new(GPIO_CHIP).map_err(hw(GPIO_CHIP))?;
        let busy = input_pin(&mut chip, PIN_BUSY)?;
        let dc = output_pin(&mut chip, PIN_DC)?;
        let rst = output_pin(&mut chip, PIN_RST)?;

        let mut delay = Delay;
        let epd = Epd7in5::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(hw("epd init"))?;

        info!("EPD 7.5\" v2 initialized ({}x{})", WIDTH, HEIGHT);
        Ok(Self {
            spi,
            delay,
            epd,
            asleep: false,
        })
    }
}

#[async_trait]
impl PanelDriver for Epd7in5Panel {
    fn capabilities(&self) -> PanelCapabilities {
        PanelCapabilities {
            width: WIDTH,
            height: HEIGHT,
            depth: PanelDepth::Mono1,
            supports_partial: false,
        }
    }

    async fn present(&mut self, frame: &FramePayload) -> Result<()> {
        if self.asleep {
            return Err(PanelError::NotInitialized);
        }
        let FramePayload::Mono1(bytes) = frame else {
            return Err(PanelError::hardware("panel accepts 1-bit frames only"));
        };
        let expected = self.capabilities().packed_len();
        if bytes.len() != expected {
            return Err(PanelError::hardware(format!(
                "frame is {} bytes, panel needs {}",
                bytes.len(),
                expected
            )));
        }

        debug!("Pushing {} bytes to the panel", bytes.len());
        self.epd
            .update_frame(&mut self.spi, bytes, &mut self.delay)
            .map_err(hw("update frame"))?;
        self.epd
            .display_frame(&mut self.spi, &mut self.delay)
            .map_err(hw("display frame"))?;
        Ok(())
    }

    async fn sleep(&mut self) -> Result<()> {
        if self.asleep {
            return Ok(());
        }
        self.epd
            .sleep(&mut self.spi, &mut self.delay)
            .map_err(hw("sleep"))?;
        self.asleep = true;
        Ok(())
    }

    async fn wake(&mut self) -> Result<()> {
        if !self.asleep {
            return Ok(());
        }
        self.epd
            .wake_up(&mut self.spi, &mut self.delay)
            .map_err(hw("wake"))?;
        self.asleep = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_gray_depth_before_touching_hardware() {
        let err = Epd7in5Panel::open(PanelDepth::Gray4).unwrap_err();
        assert!(matches!(err, PanelError::Hardware(_)));
    }
}

//! Owned frame canvas the view layouts draw into.

use embedded_graphics::pixelcolor::Gray2;
use embedded_graphics::prelude::*;
use embedded_graphics::Pixel;

use inkview_panel::{FramePayload, PanelDepth};

/// Gray levels used by the layouts. 0 = black .. 3 = white.
pub const BLACK: Gray2 = Gray2::new(0);
pub const DARK: Gray2 = Gray2::new(1);
pub const LIGHT: Gray2 = Gray2::new(2);
pub const WHITE: Gray2 = Gray2::new(3);

/// One byte per pixel at 4 gray levels, packed down to the panel's declared
/// depth on present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCanvas {
    width: u32,
    height: u32,
    levels: Vec<u8>,
}

impl FrameCanvas {
    /// A blank (white) canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            levels: vec![3; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw gray levels, row-major.
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    /// Pack for a panel depth.
    ///
    /// Mono: levels {0,1} map to black, {2,3} to white. Gray: levels pass
    /// through, two bits per pixel MSB-first. The reduction rule is fixed so
    /// identical canvases always pack to identical bytes.
    pub fn pack(&self, depth: PanelDepth) -> FramePayload {
        match depth {
            PanelDepth::Mono1 => {
                let mut bytes = vec![0u8; self.levels.len().div_ceil(8)];
                for (index, level) in self.levels.iter().enumerate() {
                    if *level >= 2 {
                        bytes[index / 8] |= 1 << (7 - (index % 8));
                    }
                }
                FramePayload::Mono1(bytes)
            }
            PanelDepth::Gray4 => {
                let mut bytes = vec![0u8; self.levels.len().div_ceil(4)];
                for (index, level) in self.levels.iter().enumerate() {
                    bytes[index / 4] |= (*level & 0x03) << (6 - 2 * (index % 4));
                }
                FramePayload::Gray4(bytes)
            }
        }
    }
}

impl OriginDimensions for FrameCanvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameCanvas {
    type Color = Gray2;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                let (x, y) = (point.x as u32, point.y as u32);
                if x < self.width && y < self.height {
                    self.levels[(y * self.width + x) as usize] = color.luma();
                }
            }
        }
        Ok(())
    }
}

/// Unwrap a draw result; the canvas error type is uninhabited.
pub(crate) fn drawn<T>(res: Result<T, core::convert::Infallible>) -> T {
    match res {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

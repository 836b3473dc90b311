//! Panel driver adapter: the only boundary that touches display hardware.
//!
//! The scheduler talks to a [`PanelDriver`] trait object and never to
//! SPI/GPIO directly. Hardware failures surface as [`PanelError::Hardware`]
//! and are reported, never fatal: the service keeps polling and retries the
//! present on the next content change.

#[cfg(feature = "waveshare")]
mod epd7in5;
mod sim;

#[cfg(feature = "waveshare")]
pub use epd7in5::Epd7in5Panel;
pub use sim::SimPanel;

use async_trait::async_trait;
use thiserror::Error;

/// Result type alias for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors surfaced by panel drivers.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Device-level failure: SPI/GPIO error, missing device node, I/O error.
    #[error("hardware error: {0}")]
    Hardware(String),

    /// The controller was asked to present before wake/init.
    #[error("panel not initialized")]
    NotInitialized,
}

impl PanelError {
    /// Create a hardware error
    pub fn hardware(message: impl Into<String>) -> Self {
        Self::Hardware(message.into())
    }
}

/// Pixel depth a panel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelDepth {
    /// 1 bit per pixel.
    Mono1,
    /// 4 gray levels, 2 bits per pixel.
    Gray4,
}

/// Static capabilities a driver declares at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelCapabilities {
    pub width: u32,
    pub height: u32,
    pub depth: PanelDepth,
    pub supports_partial: bool,
}

impl PanelCapabilities {
    /// Bytes one packed frame occupies at this depth.
    pub fn packed_len(&self) -> usize {
        let pixels = (self.width as usize) * (self.height as usize);
        match self.depth {
            PanelDepth::Mono1 => pixels.div_ceil(8),
            PanelDepth::Gray4 => pixels.div_ceil(4),
        }
    }
}

/// Frame bytes packed for a specific depth, row-major, MSB-first.
///
/// Mono: bit 1 is white, bit 0 is black. Gray: two bits per pixel,
/// 0 = black .. 3 = white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Mono1(Vec<u8>),
    Gray4(Vec<u8>),
}

impl FramePayload {
    pub fn depth(&self) -> PanelDepth {
        match self {
            Self::Mono1(_) => PanelDepth::Mono1,
            Self::Gray4(_) => PanelDepth::Gray4,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Mono1(bytes) | Self::Gray4(bytes) => bytes,
        }
    }
}

/// Driver for one locally-attached e-paper panel.
///
/// Access is serialized: only the scheduler task calls these methods.
#[async_trait]
pub trait PanelDriver: Send {
    /// Resolution and depth of the attached glass.
    fn capabilities(&self) -> PanelCapabilities;

    /// Push a packed frame to the glass.
    ///
    /// Must be safe to call repeatedly with identical bytes; the refresh
    /// cost of a repeat is whatever the hardware itself charges, nothing
    /// is duplicated on top.
    async fn present(&mut self, frame: &FramePayload) -> Result<()>;

    /// Drop into low-power mode between refreshes, when supported.
    async fn sleep(&mut self) -> Result<()>;

    /// Bring the controller back up before the next present.
    async fn wake(&mut self) -> Result<()>;
}

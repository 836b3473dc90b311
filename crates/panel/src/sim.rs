//! File-backed panel for development and headless deployments.
//!
//! Writes the latest frame as a binary PGM so the rendered output can be
//! inspected without hardware attached.

use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, info};

use crate::{FramePayload, PanelCapabilities, PanelDriver, PanelError, Result};

/// Simulated panel writing frames to a PGM file.
pub struct SimPanel {
    caps: PanelCapabilities,
    output_path: PathBuf,
    last_frame: Option<FramePayload>,
    awake: bool,
}

impl SimPanel {
    pub fn new(caps: PanelCapabilities, output_path: PathBuf) -> Self {
        Self {
            caps,
            output_path,
            last_frame: None,
            awake: true,
        }
    }

    /// Expand packed frame bytes to one 8-bit luma byte per pixel.
    fn unpack(&self, frame: &FramePayload) -> Vec<u8> {
        let pixels = (self.caps.width as usize) * (self.caps.height as usize);
        let mut luma = Vec::with_capacity(pixels);
        match frame {
            FramePayload::Mono1(bytes) => {
                for index in 0..pixels {
                    let byte = bytes.get(index / 8).copied().unwrap_or(0);
                    let bit = (byte >> (7 - (index % 8))) & 0x01;
                    luma.push(if bit == 1 { 0xFF } else { 0x00 });
                }
            }
            FramePayload::Gray4(bytes) => {
                for index in 0..pixels {
                    let byte = bytes.get(index / 4).copied().unwrap_or(0);
                    let shift = 6 - 2 * (index % 4);
                    let level = (byte >> shift) & 0x03;
                    // Levels 0..3 spread across the full luma range.
                    luma.push(level * 85);
                }
            }
        }
        luma
    }
}

#[async_trait]
impl PanelDriver for SimPanel {
    fn capabilities(&self) -> PanelCapabilities {
        self.caps
    }

    async fn present(&mut self, frame: &FramePayload) -> Result<()> {
        if !self.awake {
            return Err(PanelError::NotInitialized);
        }
        if self.last_frame.as_ref() == Some(frame) {
            debug!("Frame unchanged, skipping file write");
            return Ok(());
        }

        let luma = self.unpack(frame);
        let mut pgm = format!("P5\n{} {}\n255\n", self.caps.width, self.caps.height).into_bytes();
        pgm.extend_from_slice(&luma);
        std::fs::write(&self.output_path, pgm)
            .map_err(|e| PanelError::hardware(format!("write {}: {}", self.output_path.display(), e)))?;

        info!("Frame written to {}", self.output_path.display());
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    async fn sleep(&mut self) -> Result<()> {
        self.awake = false;
        Ok(())
    }

    async fn wake(&mut self) -> Result<()> {
        self.awake = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PanelDepth;

    fn caps() -> PanelCapabilities {
        PanelCapabilities {
            width: 8,
            height: 2,
            depth: PanelDepth::Mono1,
            supports_partial: false,
        }
    }

    #[tokio::test]
    async fn present_writes_pgm_and_skips_identical_frames() {
        let path = std::env::temp_dir().join("inkview-sim-panel-test.pgm");
        let _ = std::fs::remove_file(&path);
        let mut panel = SimPanel::new(caps(), path.clone());

        let frame = FramePayload::Mono1(vec![0b1010_1010, 0b1111_0000]);
        panel.present(&frame).await.unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(b"P5\n8 2\n255\n"));
        assert_eq!(written.len(), "P5\n8 2\n255\n".len() + 16);

        // Second present with identical bytes must not fail and must not
        // rewrite (delete the file to observe the skip).
        std::fs::remove_file(&path).unwrap();
        panel.present(&frame).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn present_while_asleep_is_rejected() {
        let path = std::env::temp_dir().join("inkview-sim-panel-sleep-test.pgm");
        let mut panel = SimPanel::new(caps(), path);
        panel.sleep().await.unwrap();

        let frame = FramePayload::Mono1(vec![0x00, 0x00]);
        let err = panel.present(&frame).await.unwrap_err();
        assert!(matches!(err, PanelError::NotInitialized));

        panel.wake().await.unwrap();
        assert!(panel.present(&frame).await.is_ok());
    }
}

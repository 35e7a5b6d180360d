//! Media properties and read configuration

/// How much work a read pass does beyond locating metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStyle {
    /// Only read tags; frame and quantization segments are skipped
    None,
    /// Read tags and frame properties (dimensions, quality estimate)
    #[default]
    Average,
}

impl ReadStyle {
    pub fn reads_properties(self) -> bool {
        self != ReadStyle::None
    }
}

/// Best-effort image properties gathered during a read pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub width: u32,
    pub height: u32,
    /// Estimated encoder quality, 0–100 (0 when no known tables were found)
    pub quality: u32,
}

/// Frame data collected while scanning
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct FrameInfo {
    /// (width, height) from the last SOF segment read
    pub dimensions: Option<(u16, u16)>,
    /// Highest quality estimate over every DQT table seen
    pub quality: f64,
}

impl FrameInfo {
    pub fn record_quality(&mut self, quality: f64) {
        self.quality = self.quality.max(quality);
    }

    /// Properties, or `None` when no frame header was found
    pub fn properties(&self) -> Option<Properties> {
        let (width, height) = self.dimensions?;
        Some(Properties {
            width: width as u32,
            height: height as u32,
            quality: self.quality.round() as u32,
        })
    }
}

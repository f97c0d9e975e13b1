//! Metadata attached to a decoded source image.

/// Metadata describing a decoded source.
///
/// Kept deliberately small: the engine only needs dimensions and a label
/// for reporting. Anything richer (EXIF, camera matrices) lives with the
/// import layer, which is outside the adjustment core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Human-readable origin (file name, camera model).
    pub label: Option<String>,
    /// True when the source came from a Bayer mosaic and was demosaiced.
    pub from_raw: bool,
}

impl SourceMetadata {
    /// Metadata for an image of the given size with no further context.
    pub fn for_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            label: None,
            from_raw: false,
        }
    }
}

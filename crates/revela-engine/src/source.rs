//! The image source boundary.
//!
//! Decoding lives outside the adjustment core; the engine consumes
//! whatever a provider hands it. File decoding, RAW development, and URI
//! resolution all sit behind [`SourceProvider`] — the CLI implements it
//! with an image decoder, tests with in-memory buffers.

use revela_core::{CfaImage, LinearImage, SourceMetadata};
use revela_ops::{DemosaicOptions, demosaic};

use crate::error::{EngineError, EngineResult};

/// Supplies decoded source images to the engine.
pub trait SourceProvider {
    /// Decodes the source into a linear image plus metadata.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Decode`] for corrupt or unsupported
    /// sources; the caller removes the image from any recent list and
    /// surfaces the failure.
    fn decode(&self) -> EngineResult<(LinearImage, SourceMetadata)>;
}

/// A provider over an already-decoded image.
pub struct MemorySource {
    image: LinearImage,
    metadata: SourceMetadata,
}

impl MemorySource {
    /// Wraps a decoded image.
    pub fn new(image: LinearImage, metadata: SourceMetadata) -> Self {
        Self { image, metadata }
    }

    /// Wraps a decoded image with size-only metadata.
    pub fn from_image(image: LinearImage) -> Self {
        let (w, h) = image.dimensions();
        Self {
            image,
            metadata: SourceMetadata::for_size(w, h),
        }
    }
}

impl SourceProvider for MemorySource {
    fn decode(&self) -> EngineResult<(LinearImage, SourceMetadata)> {
        if self.image.is_empty() {
            return Err(EngineError::Decode("empty source image".into()));
        }
        Ok((self.image.clone(), self.metadata.clone()))
    }
}

/// A provider over a raw Bayer mosaic, demosaiced on decode.
pub struct RawSource {
    mosaic: CfaImage,
    options: DemosaicOptions,
    label: Option<String>,
}

impl RawSource {
    /// Wraps a mosaic with the given demosaic options.
    pub fn new(mosaic: CfaImage, options: DemosaicOptions) -> Self {
        Self {
            mosaic,
            options,
            label: None,
        }
    }

    /// Attaches a human-readable origin label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl SourceProvider for RawSource {
    fn decode(&self) -> EngineResult<(LinearImage, SourceMetadata)> {
        let image = demosaic(&self.mosaic, &self.options);
        let (w, h) = image.dimensions();
        let metadata = SourceMetadata {
            width: w,
            height: h,
            label: self.label.clone(),
            from_raw: true,
        };
        Ok((image, metadata))
    }
}

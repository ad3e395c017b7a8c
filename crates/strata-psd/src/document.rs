//! The decoded document model.
//!
//! A [`PsdDocument`] is built in one forward pass over the stream and is
//! read-only afterwards, except for the two derived passes the decoder
//! runs before handing it out: [`PsdDocument::group_layers`] assigns
//! folder parents and the compositing pass fills the per-layer RGBA
//! buffers. A finished document is safe to share across threads.
use alloc::vec::Vec;

use strata_core::bytestream::ByteCursor;
use strata_core::log::{trace, warn};
use strata_core::options::DecoderOptions;

use crate::constants::{
    ColorMode, SectionType, CHANNEL_COUNT_RANGE, MAX_DIMENSION, PSD_IDENTIFIER_BE,
    SUPPORTED_DEPTHS
};
use crate::errors::PsdDecodeErrors;
use crate::layer::Layer;
use crate::resources::ImageResources;

/// The fixed-size file header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub channel_count: u16,
    pub height:        usize,
    pub width:         usize,
    /// Bits per channel, one of 1, 8 or 16.
    pub depth:         u16,
    pub color_mode:    ColorMode
}

impl Header {
    /// Decode and validate the header.
    ///
    /// Validation is strict and in field order: a header that lies about
    /// any of these invalidates every offset that follows, so the whole
    /// decode aborts here.
    pub(crate) fn decode(
        cursor: &mut ByteCursor, options: &DecoderOptions
    ) -> Result<Header, PsdDecodeErrors> {
        let magic = cursor.get_u32_be()?;
        if magic != PSD_IDENTIFIER_BE {
            return Err(PsdDecodeErrors::WrongMagicBytes(magic));
        }

        let version = cursor.get_u16_be()?;
        if version != 1 {
            return Err(PsdDecodeErrors::UnsupportedFileVersion(version));
        }

        // reserved, must be zero
        cursor.skip(6);

        let channel_count = cursor.get_u16_be()?;
        if channel_count < CHANNEL_COUNT_RANGE.0 || channel_count > CHANNEL_COUNT_RANGE.1 {
            return Err(PsdDecodeErrors::InvalidChannelCount(channel_count));
        }

        let height = cursor.get_u32_be()? as usize;
        let width = cursor.get_u32_be()? as usize;

        if height == 0 || width == 0 {
            return Err(PsdDecodeErrors::ZeroDimensions);
        }
        let height_limit = options.max_height().min(MAX_DIMENSION);
        if height > height_limit {
            return Err(PsdDecodeErrors::LargeDimensions(height_limit, height));
        }
        let width_limit = options.max_width().min(MAX_DIMENSION);
        if width > width_limit {
            return Err(PsdDecodeErrors::LargeDimensions(width_limit, width));
        }

        let depth = cursor.get_u16_be()?;
        if !SUPPORTED_DEPTHS.contains(&depth) {
            return Err(PsdDecodeErrors::UnsupportedBitDepth(depth));
        }

        let color_code = cursor.get_u16_be()?;
        let color_mode =
            ColorMode::from_int(color_code).ok_or(PsdDecodeErrors::UnknownColorMode(color_code))?;

        trace!("Header: {}x{} px", width, height);
        trace!("Channels: {}", channel_count);
        trace!("Bit depth: {}", depth);
        trace!("Color mode: {}", color_mode.label());

        Ok(Header { channel_count, height, width, depth, color_mode })
    }
}

/// The color mode section, kept only as its declared length.
///
/// Indexed-color tables and duotone specifications are not modeled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorModeBlock {
    pub length: u32
}

/// A fully decoded document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PsdDocument {
    pub header:     Header,
    pub color_mode: ColorModeBlock,
    pub resources:  ImageResources,
    /// Layers in bottom-to-top stacking order. When the file carries no
    /// explicit layers this holds the single synthetic base layer.
    pub layers:     Vec<Layer>,
    /// The merged composite image, separate from the explicit layers.
    /// `None` when the base layer already stands in as the sole layer.
    pub composite:  Option<Layer>,
    /// A negative layer count declared that the first alpha channel
    /// holds the merged result's transparency. Recorded, not acted on.
    pub first_alpha_is_merged: bool
}

impl PsdDocument {
    /// Resolve folder parents from the section dividers.
    ///
    /// Walks the bottom-to-top layer list with a stack rooted at a
    /// sentinel: folders push themselves, a bounding divider pops the
    /// innermost folder. Popping past the sentinel means the file closes
    /// more groups than it opened and the hierarchy cannot be trusted.
    pub(crate) fn group_layers(&mut self) -> Result<(), PsdDecodeErrors> {
        let mut parents: Vec<Option<usize>> = alloc::vec![None];

        for index in 0..self.layers.len() {
            self.layers[index].parent = *parents.last().unwrap_or(&None);

            match self.layers[index].section_type {
                SectionType::Other => {}
                SectionType::OpenFolder | SectionType::ClosedFolder => {
                    parents.push(Some(index));
                }
                SectionType::BoundingDivider => {
                    if parents.len() == 1 {
                        return Err(PsdDecodeErrors::UnbalancedLayerGroups);
                    }
                    parents.pop();
                }
            }
        }

        if parents.len() > 1 {
            warn!("{} layer folders were never closed", parents.len() - 1);
        }
        Ok(())
    }

    /// Folder chain of a layer, innermost first.
    pub fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = self.layers.get(index).and_then(|layer| layer.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.layers.get(parent).and_then(|layer| layer.parent);
        }
        chain
    }

    /// Layer count, composite excluded.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

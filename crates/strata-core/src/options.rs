//! Decoder options
//!
//! Options the decoders consult while parsing. They are plain data,
//! copied into each decoder at construction, so two decoders never
//! share mutable configuration state.

/// The format ceiling for image dimensions.
const FORMAT_DIMENSION_LIMIT: usize = 30_000;

/// Decoder options
///
/// Controls how far a decoder is willing to go: dimension ceilings and
/// which optional passes run at all.
///
/// Options are consumed builder style:
///
/// ```
/// use strata_core::options::DecoderOptions;
///
/// let options = DecoderOptions::default()
///     .set_max_width(4096)
///     .psd_set_decode_text(false);
/// assert_eq!(options.max_width(), 4096);
/// ```
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderOptions {
    /// Maximum width for which decoders will
    /// not try to decode images larger than
    /// the specified width.
    ///
    /// - Default value: 30000, the format ceiling
    max_width:        usize,
    /// Maximum height for which decoders will not
    /// try to decode images larger than the
    /// specified height
    ///
    /// - Default value: 30000, the format ceiling
    max_height:       usize,
    /// Whether the layered decoder should walk the explicit layer list
    /// or keep only the merged composite image.
    ///
    /// - Default value: true
    decode_layers:    bool,
    /// Whether type-tool layer blocks are resolved into text and style
    /// runs. Turning this off skips the descriptor and engine-data
    /// machinery for layers that carry text.
    ///
    /// - Default value: true
    decode_text_data: bool
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            max_width:        FORMAT_DIMENSION_LIMIT,
            max_height:       FORMAT_DIMENSION_LIMIT,
            decode_layers:    true,
            decode_text_data: true
        }
    }
}

impl DecoderOptions {
    /// Get the maximum width configured for which the decoder
    /// should not try to decode images greater than this width.
    pub const fn max_width(&self) -> usize {
        self.max_width
    }

    /// Get the maximum height configured for which the decoder should
    /// not try to decode images greater than this height.
    pub const fn max_height(&self) -> usize {
        self.max_height
    }

    /// Set the maximum image width the decoder accepts.
    pub fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    /// Set the maximum image height the decoder accepts.
    pub fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }

    /// Whether the explicit layer list is decoded.
    pub const fn psd_decode_layers(&self) -> bool {
        self.decode_layers
    }

    /// Set whether the explicit layer list is decoded; when false only
    /// the merged composite image is kept.
    pub fn psd_set_decode_layers(mut self, yes: bool) -> Self {
        self.decode_layers = yes;
        self
    }

    /// Whether type-tool layer blocks are resolved into text and styles.
    pub const fn psd_decode_text(&self) -> bool {
        self.decode_text_data
    }

    /// Set whether type-tool layer blocks are resolved.
    pub fn psd_set_decode_text(mut self, yes: bool) -> Self {
        self.decode_text_data = yes;
        self
    }
}

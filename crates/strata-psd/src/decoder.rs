//! The top-level document decoder.
//!
//! Sections are decoded strictly in file order, header first, since no
//! section's offset is knowable before the previous section's length
//! was read. The cursor is threaded through every section decoder as an
//! exclusive borrow: one reader, one position, no hidden state, which
//! is also why decoding the same bytes twice yields equal documents.
use alloc::vec::Vec;

use strata_core::bytestream::{round_even, ByteCursor};
use strata_core::log::{trace, warn};
use strata_core::options::DecoderOptions;

use crate::constants::{ColorMode, CompressionMethod};
use crate::document::{ColorModeBlock, Header, PsdDocument};
use crate::errors::PsdDecodeErrors;
use crate::layer::Layer;
use crate::planes::{decode_plane, PlaneHeader};
use crate::resources::decode_image_resources;

/// Probe some bytes to see if they open a PSD document.
pub fn probe_psd(bytes: &[u8]) -> bool {
    if let Some(magic) = bytes.get(0..4) {
        if magic == b"8BPS" {
            // version must be 1
            return bytes.get(4..6) == Some(&[0_u8, 1][..]);
        }
    }
    false
}

/// A layered PSD document decoder.
///
/// # Example
/// ```
/// use strata_psd::PsdDecoder;
///
/// // not a PSD, the header check fails
/// let mut decoder = PsdDecoder::new(b"GIF89a");
/// assert!(decoder.decode().is_err());
/// ```
pub struct PsdDecoder<'a> {
    cursor:          ByteCursor<'a>,
    options:         DecoderOptions,
    decoded_headers: bool,
    header:          Option<Header>
}

impl<'a> PsdDecoder<'a> {
    /// Create a new decoder reading a document from `data`.
    pub fn new(data: &'a [u8]) -> PsdDecoder<'a> {
        Self::new_with_options(data, DecoderOptions::default())
    }

    /// Create a new decoder with options that influence decoding
    /// routines.
    pub fn new_with_options(data: &'a [u8], options: DecoderOptions) -> PsdDecoder<'a> {
        PsdDecoder {
            cursor: ByteCursor::new(data),
            options,
            decoded_headers: false,
            header: None
        }
    }

    /// Decode the file header.
    ///
    /// Confirms the document is a PSD and extracts dimensions, channel
    /// count, depth and color mode. Idempotent; [`PsdDecoder::decode`]
    /// calls it implicitly.
    pub fn decode_headers(&mut self) -> Result<(), PsdDecodeErrors> {
        if self.decoded_headers {
            return Ok(());
        }
        // the one legitimate rewind: header parsing starts at offset 0
        self.cursor.set_position(0);

        let header = Header::decode(&mut self.cursor, &self.options)?;
        self.header = Some(header);
        self.decoded_headers = true;
        Ok(())
    }

    /// Image width and height, or `None` before the header was decoded.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.header.map(|h| (h.width, h.height))
    }

    /// Bits per channel, or `None` before the header was decoded.
    pub fn bit_depth(&self) -> Option<u16> {
        self.header.map(|h| h.depth)
    }

    /// The document color mode, or `None` before the header was
    /// decoded.
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.header.map(|h| h.color_mode)
    }

    /// Decode the whole document.
    ///
    /// On success every section has been consumed, the folder hierarchy
    /// is resolved and each layer carries its composed RGBA buffer.
    /// Structural violations and reads past the end abort with an error
    /// and no partial document escapes.
    pub fn decode(&mut self) -> Result<PsdDocument, PsdDecodeErrors> {
        self.decode_headers()?;
        let Some(header) = self.header else {
            return Err(PsdDecodeErrors::Generic("header missing after decode"));
        };

        let color_mode = ColorModeBlock { length: self.cursor.skip_length_prefixed()? };
        let resources = decode_image_resources(&mut self.cursor)?;

        let (mut layers, first_alpha_is_merged) = self.decode_layer_info()?;
        let base = self.decode_composite(&header)?;

        // an empty explicit list leaves the base image as the only layer
        let composite = if layers.is_empty() {
            if let Some(base) = base {
                layers.push(base);
            }
            None
        } else {
            base
        };

        let mut document = PsdDocument {
            header,
            color_mode,
            resources,
            layers,
            composite,
            first_alpha_is_merged
        };

        document.group_layers()?;
        for layer in &mut document.layers {
            layer.compose_rgba();
        }
        if let Some(composite) = &mut document.composite {
            composite.compose_rgba();
        }

        Ok(document)
    }

    /// Decode the layer and mask information section.
    ///
    /// Returns the explicit layers in bottom-to-top order (the stored
    /// order is top-first and reversed here) and whether a negative
    /// layer count flagged the first alpha channel as the merged
    /// result's transparency.
    fn decode_layer_info(&mut self) -> Result<(Vec<Layer>, bool), PsdDecodeErrors> {
        let section_length = self.cursor.get_u32_be()? as usize;
        let section_start = self.cursor.position();

        let mut layers = Vec::new();
        let mut first_alpha_is_merged = false;

        if section_length > 0 {
            let info_length = round_even(u64::from(self.cursor.get_u32_be()?)) as usize;
            let info_start = self.cursor.position();

            if info_length > 0 {
                let declared_count = self.cursor.get_int(2)?;
                let count = declared_count.unsigned_abs();
                if declared_count < 0 {
                    first_alpha_is_merged = true;
                }
                trace!("Layer count: {}", count);

                if self.options.psd_decode_layers() {
                    for _ in 0..count {
                        layers.push(Layer::decode_record(&mut self.cursor, &self.options)?);
                    }
                    for layer in &mut layers {
                        layer.decode_planes(&mut self.cursor)?;
                    }
                    // stored top-first; bottom-first matches the
                    // parent-building traversal
                    layers.reverse();
                }
                self.cursor.skip_to_end_of(info_start, info_length)?;
            }

            // global layer mask info, not modeled
            self.cursor.skip_length_prefixed()?;
            self.cursor.skip_to_end_of(section_start, section_length)?;
        }

        Ok((layers, first_alpha_is_merged))
    }

    /// Decode the merged composite image trailing the layer section.
    ///
    /// The composite is not backed by a layer record: dimensions and
    /// channel count come from the header, one compression code covers
    /// all planes and an RLE table of `height * channels` scanline
    /// lengths precedes the data.
    fn decode_composite(&mut self, header: &Header) -> Result<Option<Layer>, PsdDecodeErrors> {
        if self.cursor.is_eof() {
            return Ok(None);
        }

        let code = self.cursor.get_u16_be()?;
        let compression = CompressionMethod::from_int(code)
            .ok_or(PsdDecodeErrors::UnknownCompression(code))?;

        let mut layer = Layer::base(header.width, header.height, header.channel_count);

        if matches!(
            compression,
            CompressionMethod::Zip | CompressionMethod::ZipPrediction
        ) {
            warn!("Composite image uses compression {}, not decoded", code);
            return Ok(Some(layer));
        }

        let mut line_lengths = Vec::new();
        if compression == CompressionMethod::RLE {
            let lines = header.height * usize::from(header.channel_count);
            for _ in 0..lines {
                line_lengths.push(self.cursor.get_u16_be()?);
            }
        }

        let channels = layer.channels_info.clone();
        for (index, channel) in channels.iter().enumerate() {
            let plane = decode_plane(
                &mut self.cursor,
                header.width,
                header.height,
                PlaneHeader::Known(compression),
                &mut line_lengths,
                index
            )?;
            layer.assign_plane(channel.id, plane);
        }

        Ok(Some(layer))
    }
}

//! Layer records and their pixel data.
//!
//! A layer record is a fixed prefix (bounds, channel table, blend data,
//! flags) followed by a length-delimited extra-data region: the mask
//! sub-record, the blending ranges, the Pascal name and a run of tagged
//! blocks. Every tagged block declares its own (even-rounded) length and
//! the cursor is forced to each declared end after its handler ran, so a
//! handler that stops early can never shift the stream for its
//! successors.
//!
//! Pixel planes for all layers follow the records as one contiguous run,
//! see [`Layer::decode_planes`].
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use strata_core::bytestream::{round_even, ByteCursor};
use strata_core::log::{trace, warn};
use strata_core::options::DecoderOptions;

use crate::constants::{BlendMode, ExtraDataTag, SectionType, RESOURCE_SIGNATURE};
use crate::errors::PsdDecodeErrors;
use crate::planes::{decode_plane, PlaneHeader};
use crate::typetool::{decode_type_tool, TextData};

/// A layer's bounding rectangle in document coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub top:    i32,
    pub left:   i32,
    pub bottom: i32,
    pub right:  i32
}

impl Rect {
    /// Decode four signed 32-bit coordinates, top/left/bottom/right.
    ///
    /// Both extents must come out non-negative, a rectangle that closes
    /// before it opens breaks every buffer size derived from it.
    pub(crate) fn decode(cursor: &mut ByteCursor) -> Result<Rect, PsdDecodeErrors> {
        let top = cursor.get_int(4)? as i32;
        let left = cursor.get_int(4)? as i32;
        let bottom = cursor.get_int(4)? as i32;
        let right = cursor.get_int(4)? as i32;

        let rect = Rect { top, left, bottom, right };
        if right < left || bottom < top {
            return Err(PsdDecodeErrors::NegativeLayerBounds(
                i64::from(right) - i64::from(left),
                i64::from(bottom) - i64::from(top)
            ));
        }
        Ok(rect)
    }

    pub const fn width(&self) -> usize {
        (self.right - self.left) as usize
    }

    pub const fn height(&self) -> usize {
        (self.bottom - self.top) as usize
    }
}

/// One entry of a layer's channel table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelInfo {
    /// -1 is alpha, -2 and below are user mask channels, 0/1/2 are
    /// R/G/B.
    pub id:     i16,
    /// Stored byte length of the channel's plane, compression header
    /// included.
    pub length: u32
}

/// The 36/20 byte layer mask sub-record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerMaskData {
    pub rect:          Rect,
    pub default_color: u8,
    pub flags:         u8,
    /// Second rectangle of the extended 36 byte variant.
    pub real_rect:     Option<Rect>
}

/// Decoded channel planes, one byte per sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelPlanes {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
    /// Opacity-scaled at store time, then attenuated by the user mask
    /// plane when the layer carries one.
    pub a: Vec<u8>
}

/// One layer of the document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    pub rect:                    Rect,
    pub channels_info:           Vec<ChannelInfo>,
    pub blend_mode:              BlendMode,
    /// 0 = transparent .. 255 = opaque.
    pub opacity:                 u8,
    /// false = base, true = non-base.
    pub clipping:                bool,
    pub transparency_protected:  bool,
    /// The stored flag bit means hidden, this is the inverted, usable
    /// form.
    pub visible:                 bool,
    pub obsolete:                bool,
    /// Only meaningful when the writer said so via flag bit 3.
    pub pixel_data_irrelevant:   Option<bool>,
    /// From the `lyid` block; layers written before that block existed
    /// keep 0.
    pub layer_id:                u32,
    pub section_type:            SectionType,
    pub mask:                    Option<LayerMaskData>,
    /// Pascal-string name, overridden by the `luni` block when present.
    pub name:                    String,
    /// Type-tool text and resolved style runs.
    pub text:                    Option<TextData>,
    /// Index of the enclosing folder layer, assigned by the hierarchy
    /// pass; never set during section parsing.
    pub parent:                  Option<usize>,
    pub planes:                  ChannelPlanes,
    /// Composed `width * height * 4` RGBA buffer.
    pub image:                   Vec<u8>
}

impl Layer {
    fn with_defaults(rect: Rect) -> Layer {
        Layer {
            rect,
            channels_info: Vec::new(),
            blend_mode: BlendMode::Normal,
            opacity: 255,
            clipping: false,
            transparency_protected: false,
            visible: true,
            obsolete: false,
            pixel_data_irrelevant: None,
            layer_id: 0,
            section_type: SectionType::Other,
            mask: None,
            name: String::new(),
            text: None,
            parent: None,
            planes: ChannelPlanes::default(),
            image: Vec::new()
        }
    }

    /// The synthetic base layer carrying the merged composite image.
    ///
    /// It is not backed by a layer record: bounds and channel table are
    /// derived from the header, with channel ids handed out as R, G, B,
    /// then alpha.
    pub(crate) fn base(width: usize, height: usize, channel_count: u16) -> Layer {
        let rect = Rect {
            top:    0,
            left:   0,
            bottom: height as i32,
            right:  width as i32
        };
        let mut layer = Layer::with_defaults(rect);
        layer.name = String::from("Composite");
        layer.channels_info = (0..channel_count)
            .map(|index| {
                let id = match index {
                    0..=2 => index as i16,
                    3 => -1,
                    _ => index as i16
                };
                ChannelInfo { id, length: 0 }
            })
            .collect();
        layer
    }

    /// Decode one layer record (everything except pixel data).
    pub(crate) fn decode_record(
        cursor: &mut ByteCursor, options: &DecoderOptions
    ) -> Result<Layer, PsdDecodeErrors> {
        let rect = Rect::decode(cursor)?;
        let mut layer = Layer::with_defaults(rect);

        let channel_count = cursor.get_u16_be()?;
        layer.channels_info = (0..channel_count)
            .map(|_| -> Result<ChannelInfo, PsdDecodeErrors> {
                let id = cursor.get_int(2)? as i16;
                let length = cursor.get_u32_be()?;
                Ok(ChannelInfo { id, length })
            })
            .collect::<Result<_, _>>()?;

        let mut signature = [0_u8; 4];
        signature.copy_from_slice(cursor.read_exact(4)?);
        if &signature != RESOURCE_SIGNATURE {
            return Err(PsdDecodeErrors::WrongSignature(signature));
        }

        let mut blend_code = [0_u8; 4];
        blend_code.copy_from_slice(cursor.read_exact(4)?);
        layer.blend_mode = BlendMode::from_fourcc(&blend_code)
            .ok_or(PsdDecodeErrors::UnknownBlendMode(blend_code))?;

        layer.opacity = cursor.get_u8()?;
        layer.clipping = cursor.get_u8()? != 0;

        // bit 0 transparency protected, bit 1 hidden, bit 2 obsolete,
        // bit 3 gates whether bit 4 carries information
        let flags = cursor.get_bit_array(1)?;
        layer.transparency_protected = flags[0];
        layer.visible = !flags[1];
        layer.obsolete = flags[2];
        if flags[3] {
            layer.pixel_data_irrelevant = Some(flags[4]);
        }

        let filler = cursor.get_u8()?;
        if filler != 0 {
            return Err(PsdDecodeErrors::NonZeroFiller(filler));
        }

        let extra_length = cursor.get_u32_be()? as usize;
        let extra_start = cursor.position();

        layer.mask = decode_mask_data(cursor)?;

        // layer blending ranges, not modeled
        cursor.skip_length_prefixed()?;

        layer.name = cursor.get_pascal_string()?;

        while cursor.position() - extra_start < extra_length {
            layer.decode_tagged_block(cursor, options)?;
        }
        cursor.skip_to_end_of(extra_start, extra_length)?;

        trace!("Layer {:?}: {:?}", layer.name, layer.blend_mode);

        Ok(layer)
    }

    /// Decode one `8BIM` + tag + length block of the extra-data region.
    fn decode_tagged_block(
        &mut self, cursor: &mut ByteCursor, options: &DecoderOptions
    ) -> Result<(), PsdDecodeErrors> {
        let mut signature = [0_u8; 4];
        signature.copy_from_slice(cursor.read_exact(4)?);
        if &signature != RESOURCE_SIGNATURE {
            return Err(PsdDecodeErrors::WrongSignature(signature));
        }

        let mut tag = [0_u8; 4];
        tag.copy_from_slice(cursor.read_exact(4)?);
        let length = round_even(u64::from(cursor.get_u32_be()?)) as usize;
        let start = cursor.position();

        match ExtraDataTag::from_fourcc(&tag) {
            ExtraDataTag::LayerId => {
                self.layer_id = cursor.get_u32_be()?;
            }
            ExtraDataTag::Metadata => {
                decode_metadata(cursor)?;
            }
            ExtraDataTag::SectionDivider => {
                let code = cursor.get_u32_be()?;
                self.section_type = SectionType::from_int(code)
                    .ok_or(PsdDecodeErrors::UnknownSectionType(code))?;
            }
            ExtraDataTag::UnicodeName => {
                self.name = cursor.get_unicode_string()?;
            }
            ExtraDataTag::VectorMask => {
                // version and flags only, path records are not modeled
                let _version = cursor.get_u32_be()?;
                let _flags = cursor.get_u32_be()?;
            }
            ExtraDataTag::TypeTool => {
                if options.psd_decode_text() {
                    self.text = decode_type_tool(cursor)?;
                }
            }
            ExtraDataTag::Unsupported(_code) => {
                trace!("Skipping unsupported layer tag {:?}", _code);
            }
        }

        // realign whatever the handler consumed
        cursor.skip_to_end_of(start, length)?;
        Ok(())
    }

    /// Decode this layer's channel planes.
    ///
    /// Channels arrive in channel-table order, each with its own
    /// compression header; the RLE scanline table is read with the
    /// first compressed channel and reused for the rest. A channel
    /// whose compression is recognized but not decodable is skipped by
    /// its declared byte length and costs only its own samples.
    pub(crate) fn decode_planes(&mut self, cursor: &mut ByteCursor) -> Result<(), PsdDecodeErrors> {
        let width = self.rect.width();
        let height = self.rect.height();

        let mut line_lengths: Vec<u16> = Vec::new();
        let mut mask_plane: Option<Vec<u8>> = None;

        let channels = self.channels_info.clone();
        for (index, channel) in channels.iter().enumerate() {
            let channel_start = cursor.position();

            let plane = match decode_plane(
                cursor,
                width,
                height,
                PlaneHeader::Read,
                &mut line_lengths,
                index
            ) {
                Ok(plane) => plane,
                Err(PsdDecodeErrors::UnsupportedCompression(_code)) => {
                    warn!(
                        "Channel {} of layer {:?} uses compression {}, skipping",
                        channel.id, self.name, _code
                    );
                    cursor.skip_to_end_of(channel_start, channel.length as usize)?;
                    continue;
                }
                Err(e) => return Err(e)
            };

            if channel.id < -1 {
                mask_plane = Some(plane);
            } else {
                self.assign_plane(channel.id, plane);
            }
        }

        if let Some(mask) = mask_plane {
            attenuate(&mut self.planes.a, &mask);
        }
        Ok(())
    }

    /// Route a decoded plane to its channel slot.
    ///
    /// Alpha is opacity-scaled here, before storage; ids outside the
    /// composited set are dropped.
    pub(crate) fn assign_plane(&mut self, id: i16, plane: Vec<u8>) {
        match id {
            -1 => {
                let opacity = u16::from(self.opacity);
                self.planes.a = plane
                    .iter()
                    .map(|v| ((u16::from(*v) * opacity) / 255) as u8)
                    .collect();
            }
            0 => self.planes.r = plane,
            1 => self.planes.g = plane,
            2 => self.planes.b = plane,
            _ => {}
        }
    }

    /// Compose the RGBA image buffer from the decoded planes.
    ///
    /// Every sample defaults to 255 (opaque white) and is overwritten
    /// wherever the channel plane has data; short planes leave the tail
    /// at the default.
    pub(crate) fn compose_rgba(&mut self) {
        let pixels = self.rect.width() * self.rect.height();
        let mut image = vec![255_u8; pixels * 4];

        let planes = [&self.planes.r, &self.planes.g, &self.planes.b, &self.planes.a];
        for (slot, plane) in planes.into_iter().enumerate() {
            for (index, value) in plane.iter().take(pixels).enumerate() {
                image[index * 4 + slot] = *value;
            }
        }
        self.image = image;
    }
}

/// Multiply `alpha` pointwise by `mask / 255`.
fn attenuate(alpha: &mut [u8], mask: &[u8]) {
    for (a, m) in alpha.iter_mut().zip(mask.iter()) {
        *a = ((u16::from(*a) * u16::from(*m)) / 255) as u8;
    }
}

/// The mask sub-record opening a layer's extra-data region: 0 (absent),
/// 20 bytes, or the 36 byte variant with a second rectangle.
fn decode_mask_data(cursor: &mut ByteCursor) -> Result<Option<LayerMaskData>, PsdDecodeErrors> {
    let size = cursor.get_u32_be()?;
    let start = cursor.position();

    let mask = match size {
        0 => None,
        20 | 36 => {
            let rect = Rect::decode(cursor)?;
            let default_color = cursor.get_u8()?;
            let flags = cursor.get_u8()?;
            let real_rect = if size == 36 {
                let _real_flags = cursor.get_u8()?;
                let _real_background = cursor.get_u8()?;
                Some(Rect::decode(cursor)?)
            } else {
                None
            };
            Some(LayerMaskData { rect, default_color, flags, real_rect })
        }
        other => return Err(PsdDecodeErrors::InvalidMaskDataSize(other))
    };

    cursor.skip_to_end_of(start, size as usize)?;
    Ok(mask)
}

/// The `shmd` metadata block: a counted list of signature/key/length
/// sub-items. No payload is interpreted yet, each item is skipped by
/// its declared length.
fn decode_metadata(cursor: &mut ByteCursor) -> Result<(), PsdDecodeErrors> {
    let count = cursor.get_u32_be()?;
    for _ in 0..count {
        let mut signature = [0_u8; 4];
        signature.copy_from_slice(cursor.read_exact(4)?);
        if &signature != RESOURCE_SIGNATURE {
            return Err(PsdDecodeErrors::WrongSignature(signature));
        }

        let mut key = [0_u8; 4];
        key.copy_from_slice(cursor.read_exact(4)?);
        // copy-on-duplication byte plus padding
        cursor.skip(4);

        let length = cursor.get_u32_be()? as usize;
        let start = cursor.position();
        if &key == b"mlst" {
            // animation frame list, not modeled
            trace!("Skipping animation metadata, {} bytes", length);
        }
        cursor.skip_to_end_of(start, length)?;
    }
    Ok(())
}

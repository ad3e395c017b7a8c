//! The image resources section.
//!
//! Resources are a flat run of records, each `8BIM` + id + Pascal name +
//! even-rounded length. Only the slices resource (id 1050) is modeled in
//! depth; everything else is skipped by its declared length but its id
//! and name stay queryable.
use alloc::string::String;
use alloc::vec::Vec;

use strata_core::bytestream::{round_even, ByteCursor};
use strata_core::log::{trace, warn};

use crate::constants::{RESOURCE_SIGNATURE, SLICES_RESOURCE_ID};
use crate::errors::PsdDecodeErrors;
use crate::layer::Rect;

/// Id and name of every resource record the section carried.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceRecord {
    pub id:   u16,
    pub name: String
}

/// The decoded image resources section.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageResources {
    pub records: Vec<ResourceRecord>,
    pub slices:  Option<SlicesResource>
}

/// The slices resource: a bounding rectangle and the named slice list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlicesResource {
    pub bounds: Rect,
    pub name:   String,
    pub slices: Vec<Slice>
}

/// One slice of the slices resource.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slice {
    pub id:                  u32,
    pub group_id:            u32,
    pub origin:              u32,
    /// Present when the slice originates from a layer (origin 1).
    pub associated_layer_id: Option<u32>,
    pub name:                String,
    pub slice_type:          u32,
    pub rect:                Rect,
    pub url:                 String,
    pub target:              String,
    pub message:             String,
    pub alt_text:            String,
    pub cell_text_is_html:   bool,
    pub cell_text:           String,
    pub horizontal_alignment: u32,
    pub vertical_alignment:  u32,
    /// Border color as r, g, b, a.
    pub border_color:        [u8; 4]
}

/// Decode the whole image resources section.
pub(crate) fn decode_image_resources(
    cursor: &mut ByteCursor
) -> Result<ImageResources, PsdDecodeErrors> {
    let section_length = cursor.get_u32_be()? as usize;
    let section_start = cursor.position();

    let mut resources = ImageResources::default();

    while cursor.position() < section_start + section_length {
        let mut signature = [0_u8; 4];
        signature.copy_from_slice(cursor.read_exact(4)?);
        if &signature != RESOURCE_SIGNATURE {
            return Err(PsdDecodeErrors::WrongSignature(signature));
        }

        let id = cursor.get_u16_be()?;
        let name = cursor.get_pascal_string()?;
        let length = round_even(u64::from(cursor.get_u32_be()?)) as usize;
        let start = cursor.position();

        if id == SLICES_RESOURCE_ID {
            resources.slices = decode_slices(cursor)?;
        } else {
            trace!("Skipping resource {} ({:?}), {} bytes", id, name, length);
        }

        cursor.skip_to_end_of(start, length)?;
        resources.records.push(ResourceRecord { id, name });
    }

    cursor.skip_to_end_of(section_start, section_length)?;
    Ok(resources)
}

/// Decode the slices resource body.
///
/// Only the version 6 layout is understood; newer descriptor-based
/// versions are left to the record-level skip.
fn decode_slices(cursor: &mut ByteCursor) -> Result<Option<SlicesResource>, PsdDecodeErrors> {
    let version = cursor.get_u32_be()?;
    if version != 6 {
        warn!("Slices resource version {} is not modeled", version);
        return Ok(None);
    }

    let bounds = Rect::decode(cursor)?;
    let name = cursor.get_unicode_string()?;
    let count = cursor.get_u32_be()?;

    let mut slices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        slices.push(decode_slice(cursor)?);
    }

    Ok(Some(SlicesResource { bounds, name, slices }))
}

fn decode_slice(cursor: &mut ByteCursor) -> Result<Slice, PsdDecodeErrors> {
    let id = cursor.get_u32_be()?;
    let group_id = cursor.get_u32_be()?;
    let origin = cursor.get_u32_be()?;
    let associated_layer_id = if origin == 1 {
        Some(cursor.get_u32_be()?)
    } else {
        None
    };
    let name = cursor.get_unicode_string()?;
    let slice_type = cursor.get_u32_be()?;
    let rect = Rect::decode(cursor)?;
    let url = cursor.get_unicode_string()?;
    let target = cursor.get_unicode_string()?;
    let message = cursor.get_unicode_string()?;
    let alt_text = cursor.get_unicode_string()?;
    let cell_text_is_html = cursor.get_u8()? != 0;
    let cell_text = cursor.get_unicode_string()?;
    let horizontal_alignment = cursor.get_u32_be()?;
    let vertical_alignment = cursor.get_u32_be()?;

    // stored alpha first, surfaced as r, g, b, a
    let alpha = cursor.get_u8()?;
    let red = cursor.get_u8()?;
    let green = cursor.get_u8()?;
    let blue = cursor.get_u8()?;

    Ok(Slice {
        id,
        group_id,
        origin,
        associated_layer_id,
        name,
        slice_type,
        rect,
        url,
        target,
        message,
        alt_text,
        cell_text_is_html,
        cell_text,
        horizontal_alignment,
        vertical_alignment,
        border_color: [red, green, blue, alpha]
    })
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    fn unicode(out: &mut Vec<u8>, text: &str) {
        let units: Vec<u16> = text.encode_utf16().collect();
        out.extend_from_slice(&(units.len() as u32).to_be_bytes());
        for unit in units {
            out.extend_from_slice(&unit.to_be_bytes());
        }
    }

    fn rect(out: &mut Vec<u8>, top: i32, left: i32, bottom: i32, right: i32) {
        for value in [top, left, bottom, right] {
            out.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn slices_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&6_u32.to_be_bytes()); // version
        rect(&mut body, 0, 0, 100, 200);
        unicode(&mut body, "page");
        body.extend_from_slice(&1_u32.to_be_bytes()); // one slice

        body.extend_from_slice(&2_u32.to_be_bytes()); // id
        body.extend_from_slice(&0_u32.to_be_bytes()); // group
        body.extend_from_slice(&1_u32.to_be_bytes()); // origin -> layer id follows
        body.extend_from_slice(&7_u32.to_be_bytes()); // associated layer
        unicode(&mut body, "header");
        body.extend_from_slice(&2_u32.to_be_bytes()); // type
        rect(&mut body, 0, 0, 40, 200);
        unicode(&mut body, "https://example.com");
        unicode(&mut body, "_blank");
        unicode(&mut body, "");
        unicode(&mut body, "alt");
        body.push(0); // cell text is html
        unicode(&mut body, "");
        body.extend_from_slice(&1_u32.to_be_bytes()); // horizontal
        body.extend_from_slice(&1_u32.to_be_bytes()); // vertical
        body.extend_from_slice(&[255, 10, 20, 30]); // a, r, g, b
        body
    }

    #[test]
    fn slices_resource_decodes() {
        let body = slices_body();
        let mut cursor = ByteCursor::new(&body);
        let slices = decode_slices(&mut cursor).unwrap().unwrap();

        assert_eq!(slices.name, "page");
        assert_eq!(slices.bounds.width(), 200);
        assert_eq!(slices.slices.len(), 1);

        let slice = &slices.slices[0];
        assert_eq!(slice.id, 2);
        assert_eq!(slice.associated_layer_id, Some(7));
        assert_eq!(slice.name, "header");
        assert_eq!(slice.url, "https://example.com");
        assert_eq!(slice.target, "_blank");
        assert_eq!(slice.alt_text, "alt");
        assert_eq!(slice.border_color, [10, 20, 30, 255]);
        assert_eq!(cursor.position(), body.len());
    }

    #[test]
    fn unknown_slices_version_is_skipped() {
        let mut body = Vec::new();
        body.extend_from_slice(&7_u32.to_be_bytes());
        let mut cursor = ByteCursor::new(&body);
        assert_eq!(decode_slices(&mut cursor).unwrap(), None);
    }

    #[test]
    fn section_loop_skips_unmodeled_records() {
        let mut section = Vec::new();
        // resource 1005, 3 bytes of payload (rounded to 4)
        section.extend_from_slice(b"8BIM");
        section.extend_from_slice(&1005_u16.to_be_bytes());
        section.extend_from_slice(&[0, 0]); // empty Pascal name
        section.extend_from_slice(&3_u32.to_be_bytes());
        section.extend_from_slice(&[1, 2, 3, 0]);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(section.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&section);

        let mut cursor = ByteCursor::new(&bytes);
        let resources = decode_image_resources(&mut cursor).unwrap();
        assert_eq!(
            resources.records,
            vec![ResourceRecord { id: 1005, name: String::new() }]
        );
        assert_eq!(resources.slices, None);
        assert_eq!(cursor.position(), bytes.len());
    }

    #[test]
    fn bad_record_signature_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&8_u32.to_be_bytes());
        bytes.extend_from_slice(b"8BIX");
        bytes.extend_from_slice(&[0; 4]);
        let mut cursor = ByteCursor::new(&bytes);
        assert!(matches!(
            decode_image_resources(&mut cursor),
            Err(PsdDecodeErrors::WrongSignature(_))
        ));
    }
}

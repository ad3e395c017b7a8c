//! Channel plane decompression.
//!
//! A channel plane is either raw (`width * height` samples) or RLE
//! compressed. RLE data is preceded by a two byte length per scanline;
//! for a layer that table arrives with the first compressed channel and
//! is reused for the remaining channels, for the composite image one
//! table covers `height * channels` lines and is indexed by plane.
//!
//! The run-length coding is PackBits shaped with one historical quirk:
//! a control byte above 127 replicates the next byte `255 - n + 2`
//! times, so 128 replicates 129 times instead of being the canonical
//! no-op. Files in the wild decode under this rule and it is kept as
//! observed.
use alloc::vec;
use alloc::vec::Vec;

use strata_core::bytestream::ByteCursor;

use crate::constants::CompressionMethod;
use crate::errors::PsdDecodeErrors;

/// How a plane learns its compression.
#[derive(Copy, Clone)]
pub(crate) enum PlaneHeader {
    /// The plane starts with its own two byte compression code; used by
    /// layer channels. The scanline table is read here once per layer.
    Read,
    /// The compression was decoded up front (the composite image) and
    /// the scanline table, if any, was read externally.
    Known(CompressionMethod)
}

/// Decode one channel plane of `width * height` samples.
///
/// `line_lengths` is the per-layer scanline table: filled on the first
/// RLE channel when the header is read here, supplied by the caller for
/// the composite image. `plane_index` picks the table window for
/// externally supplied tables; planes that read their own header index
/// from zero.
pub(crate) fn decode_plane(
    cursor: &mut ByteCursor, width: usize, height: usize, header: PlaneHeader,
    line_lengths: &mut Vec<u16>, plane_index: usize
) -> Result<Vec<u8>, PsdDecodeErrors> {
    let (compression, plane_index) = match header {
        PlaneHeader::Read => {
            let code = cursor.get_u16_be()?;
            let compression = CompressionMethod::from_int(code)
                .ok_or(PsdDecodeErrors::UnknownCompression(code))?;

            if compression == CompressionMethod::RLE && line_lengths.is_empty() {
                for _ in 0..height {
                    line_lengths.push(cursor.get_u16_be()?);
                }
            }
            (compression, 0)
        }
        PlaneHeader::Known(compression) => (compression, plane_index)
    };

    match compression {
        CompressionMethod::NoCompression => Ok(cursor.read_exact(width * height)?.to_vec()),
        CompressionMethod::RLE => decode_rle_plane(cursor, width, height, line_lengths, plane_index),
        CompressionMethod::Zip | CompressionMethod::ZipPrediction => {
            Err(PsdDecodeErrors::UnsupportedCompression(compression as u16))
        }
    }
}

fn decode_rle_plane(
    cursor: &mut ByteCursor, width: usize, height: usize, line_lengths: &[u16],
    plane_index: usize
) -> Result<Vec<u8>, PsdDecodeErrors> {
    let mut plane = vec![0_u8; width * height];
    let mut line_index = plane_index * height;
    let mut position = 0;

    for _ in 0..height {
        let length = usize::from(
            *line_lengths
                .get(line_index)
                .ok_or(PsdDecodeErrors::BadRle)?
        );
        line_index += 1;

        // pad the source up to width * 2 so literal copies can run into
        // zero bytes instead of out of bounds
        let mut source = cursor.read_exact(length)?.to_vec();
        source.resize(length.max(width * 2), 0);

        decode_packbits(&source, length, &mut plane[position..])?;
        position += width;
    }
    Ok(plane)
}

/// Expand one scanline's control stream into `dst`.
///
/// The output advance is wholly control-driven; the caller steps its
/// destination by `width` per scanline no matter how much a line
/// produced, only the fixed destination size bounds the writes.
fn decode_packbits(src: &[u8], src_len: usize, dst: &mut [u8]) -> Result<(), PsdDecodeErrors> {
    let mut sindex = 0;
    let mut dindex = 0;

    while sindex < src_len {
        let control = usize::from(src[sindex]);
        sindex += 1;

        if control > 127 {
            // replicate the next byte 255 - n + 2 times (129 for 128)
            let n = 255 - control + 2;
            let value = *src.get(sindex).ok_or(PsdDecodeErrors::BadRle)?;
            sindex += 1;

            if dindex + n > dst.len() {
                return Err(PsdDecodeErrors::BadRle);
            }
            dst[dindex..dindex + n].fill(value);
            dindex += n;
        } else {
            // copy the next n + 1 bytes literally
            let n = control + 1;
            if sindex + n > src.len() || dindex + n > dst.len() {
                return Err(PsdDecodeErrors::BadRle);
            }
            dst[dindex..dindex + n].copy_from_slice(&src[sindex..sindex + n]);
            dindex += n;
            sindex += n;
        }
    }
    Ok(())
}

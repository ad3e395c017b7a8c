use core::fmt::{Debug, Formatter};

use strata_core::bytestream::CursorError;

use crate::constants::PSD_IDENTIFIER_BE;

/// Errors that can occur during PSD decoding.
///
/// Every variant except [`PsdDecodeErrors::IoErrors`] is a structural
/// violation: a field that contradicts what the format declares. Both
/// kinds are fatal to the decode, offsets past the failing field cannot
/// be trusted. Recoverable conditions (unsupported compression on a
/// skippable channel, a failing legacy text blob) never surface here,
/// they are logged and absorbed where they occur.
pub enum PsdDecodeErrors {
    WrongMagicBytes(u32),
    UnsupportedFileVersion(u16),
    InvalidChannelCount(u16),
    LargeDimensions(usize, usize),
    ZeroDimensions,
    UnsupportedBitDepth(u16),
    UnknownColorMode(u16),
    WrongSignature([u8; 4]),
    UnknownBlendMode([u8; 4]),
    NonZeroFiller(u8),
    InvalidMaskDataSize(u32),
    NegativeLayerBounds(i64, i64),
    UnknownSectionType(u32),
    UnknownOsType([u8; 4]),
    UnknownCompression(u16),
    UnsupportedCompression(u16),
    BadRle,
    UnbalancedLayerGroups,
    Generic(&'static str),
    IoErrors(CursorError)
}

impl Debug for PsdDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            PsdDecodeErrors::WrongMagicBytes(bytes) => {
                writeln!(
                    f,
                    "Expected {:?} but found {:?}, not a PSD document",
                    PSD_IDENTIFIER_BE.to_be_bytes(),
                    bytes.to_be_bytes()
                )
            }
            PsdDecodeErrors::UnsupportedFileVersion(version) => {
                writeln!(f, "Unsupported file version {version:?}, known versions are 1")
            }
            PsdDecodeErrors::InvalidChannelCount(channels) => {
                writeln!(f, "Channel count {channels} outside the supported 1..=56 range")
            }
            PsdDecodeErrors::LargeDimensions(supported, found) => {
                writeln!(f, "Too large dimensions, supported {supported} but found {found}")
            }
            PsdDecodeErrors::ZeroDimensions => {
                writeln!(f, "Zero found where not expected")
            }
            PsdDecodeErrors::UnsupportedBitDepth(depth) => {
                writeln!(f, "Unsupported bit depth {depth:?}, supported depths are 1, 8 and 16")
            }
            PsdDecodeErrors::UnknownColorMode(mode) => {
                writeln!(f, "Unknown color mode {mode}")
            }
            PsdDecodeErrors::WrongSignature(found) => {
                writeln!(f, "Expected an 8BIM signature but found {found:?}")
            }
            PsdDecodeErrors::UnknownBlendMode(code) => {
                writeln!(f, "Unknown blend mode code {code:?}")
            }
            PsdDecodeErrors::NonZeroFiller(byte) => {
                writeln!(f, "Layer record filler byte should be zero but was {byte}")
            }
            PsdDecodeErrors::InvalidMaskDataSize(size) => {
                writeln!(f, "Layer mask data size must be 36, 20 or 0 but was {size}")
            }
            PsdDecodeErrors::NegativeLayerBounds(width, height) => {
                writeln!(f, "Layer rectangle has negative extent {width}x{height}")
            }
            PsdDecodeErrors::UnknownSectionType(code) => {
                writeln!(f, "Unknown layer section divider type {code}")
            }
            PsdDecodeErrors::UnknownOsType(tag) => {
                writeln!(f, "Unknown descriptor value type {tag:?}")
            }
            PsdDecodeErrors::UnknownCompression(code) => {
                writeln!(f, "Unknown compression format {code}")
            }
            PsdDecodeErrors::UnsupportedCompression(code) => {
                writeln!(f, "Compression format {code} is recognized but not decodable")
            }
            PsdDecodeErrors::BadRle => {
                writeln!(f, "Bad RLE")
            }
            PsdDecodeErrors::UnbalancedLayerGroups => {
                writeln!(f, "Layer folder dividers close more groups than were opened")
            }
            PsdDecodeErrors::Generic(reason) => {
                writeln!(f, "{reason}")
            }
            PsdDecodeErrors::IoErrors(e) => {
                writeln!(f, "I/O error: {e:?}")
            }
        }
    }
}

impl From<&'static str> for PsdDecodeErrors {
    fn from(r: &'static str) -> Self {
        Self::Generic(r)
    }
}

impl From<CursorError> for PsdDecodeErrors {
    fn from(r: CursorError) -> Self {
        Self::IoErrors(r)
    }
}

/// Failure of the legacy text grammar.
///
/// Never escapes the `tdta` handler: an [`EngineParseError::UnexpectedEnd`]
/// means the blob ran out mid-value (silently absent), anything else is
/// logged with its line number and also yields an absent value.
pub enum EngineParseError {
    UnexpectedEnd,
    BadSyntax(usize)
}

impl Debug for EngineParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            EngineParseError::UnexpectedEnd => {
                writeln!(f, "Unexpected end of legacy text data")
            }
            EngineParseError::BadSyntax(line) => {
                writeln!(f, "Legacy text data syntax error in line {line}")
            }
        }
    }
}

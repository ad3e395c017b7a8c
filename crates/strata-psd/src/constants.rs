#![allow(clippy::upper_case_acronyms)]

/// `8BPS`, the container magic, as a big-endian u32.
pub const PSD_IDENTIFIER_BE: u32 = 0x38425053;

/// `8BIM`, the signature guarding blend modes, image resources and
/// tagged extra-data blocks.
pub const RESOURCE_SIGNATURE: &[u8; 4] = b"8BIM";

/// Resource id of the structured slices record.
pub const SLICES_RESOURCE_ID: u16 = 1050;

/// Inclusive channel count range the header accepts.
pub const CHANNEL_COUNT_RANGE: (u16, u16) = (1, 56);

/// The format ceiling for width and height.
pub const MAX_DIMENSION: usize = 30_000;

/// Bit depths the header accepts.
pub const SUPPORTED_DEPTHS: [u16; 3] = [1, 8, 16];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    IndexedColor = 2,
    RGB = 3,
    CMYK = 4,
    MultiChannel = 7,
    DuoTone = 8,
    LabColor = 9
}

impl ColorMode {
    pub fn from_int(int: u16) -> Option<ColorMode> {
        use crate::constants::ColorMode::{
            Bitmap, DuoTone, Grayscale, IndexedColor, LabColor, MultiChannel, CMYK, RGB
        };

        match int {
            0 => Some(Bitmap),
            1 => Some(Grayscale),
            2 => Some(IndexedColor),
            3 => Some(RGB),
            4 => Some(CMYK),
            7 => Some(MultiChannel),
            8 => Some(DuoTone),
            9 => Some(LabColor),
            _ => None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ColorMode::Bitmap => "Bitmap",
            ColorMode::Grayscale => "Grayscale",
            ColorMode::IndexedColor => "Indexed Color",
            ColorMode::RGB => "RGB Color",
            ColorMode::CMYK => "CMYK Color",
            ColorMode::MultiChannel => "Multichannel",
            ColorMode::DuoTone => "Duotone",
            ColorMode::LabColor => "Lab Color"
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionMethod {
    NoCompression = 0,
    RLE = 1,
    Zip = 2,
    ZipPrediction = 3
}

impl CompressionMethod {
    pub fn from_int(int: u16) -> Option<CompressionMethod> {
        match int {
            0 => Some(Self::NoCompression),
            1 => Some(Self::RLE),
            2 => Some(Self::Zip),
            3 => Some(Self::ZipPrediction),
            _ => None
        }
    }
}

/// Layer blend modes, matched on their raw 4-byte codes.
///
/// The dodge code carries a trailing space (`div `), matching on raw
/// bytes instead of trimmed text keeps it reachable.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    Normal,
    Darken,
    Lighten,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Multiply,
    Screen,
    Dissolve,
    Overlay,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    ColorDodge,
    ColorBurn,
    LinearBurn,
    LinearDodge,
    VividLight,
    LinearLight,
    PinLight,
    HardMix
}

impl BlendMode {
    pub fn from_fourcc(code: &[u8; 4]) -> Option<BlendMode> {
        match code {
            b"norm" => Some(BlendMode::Normal),
            b"dark" => Some(BlendMode::Darken),
            b"lite" => Some(BlendMode::Lighten),
            b"hue " => Some(BlendMode::Hue),
            b"sat " => Some(BlendMode::Saturation),
            b"colr" => Some(BlendMode::Color),
            b"lum " => Some(BlendMode::Luminosity),
            b"mul " => Some(BlendMode::Multiply),
            b"scrn" => Some(BlendMode::Screen),
            b"diss" => Some(BlendMode::Dissolve),
            b"over" => Some(BlendMode::Overlay),
            b"hLit" => Some(BlendMode::HardLight),
            b"sLit" => Some(BlendMode::SoftLight),
            b"diff" => Some(BlendMode::Difference),
            b"smud" => Some(BlendMode::Exclusion),
            b"div " => Some(BlendMode::ColorDodge),
            b"idiv" => Some(BlendMode::ColorBurn),
            b"lbrn" => Some(BlendMode::LinearBurn),
            b"lddg" => Some(BlendMode::LinearDodge),
            b"vLit" => Some(BlendMode::VividLight),
            b"lLit" => Some(BlendMode::LinearLight),
            b"pLit" => Some(BlendMode::PinLight),
            b"hMix" => Some(BlendMode::HardMix),
            _ => None
        }
    }

    /// The human label matching the code.
    pub const fn label(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Hue => "hue",
            BlendMode::Saturation => "saturation",
            BlendMode::Color => "color",
            BlendMode::Luminosity => "luminosity",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Dissolve => "dissolve",
            BlendMode::Overlay => "overlay",
            BlendMode::HardLight => "hard light",
            BlendMode::SoftLight => "soft light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::ColorDodge => "color dodge",
            BlendMode::ColorBurn => "color burn",
            BlendMode::LinearBurn => "linear burn",
            BlendMode::LinearDodge => "linear dodge",
            BlendMode::VividLight => "vivid light",
            BlendMode::LinearLight => "linear light",
            BlendMode::PinLight => "pin light",
            BlendMode::HardMix => "hard mix"
        }
    }
}

/// The `lsct` section divider type of a layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectionType {
    #[default]
    Other = 0,
    OpenFolder = 1,
    ClosedFolder = 2,
    BoundingDivider = 3
}

impl SectionType {
    pub fn from_int(int: u32) -> Option<SectionType> {
        match int {
            0 => Some(SectionType::Other),
            1 => Some(SectionType::OpenFolder),
            2 => Some(SectionType::ClosedFolder),
            3 => Some(SectionType::BoundingDivider),
            _ => None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SectionType::Other => "other",
            SectionType::OpenFolder => "open folder",
            SectionType::ClosedFolder => "closed folder",
            SectionType::BoundingDivider => "bounding section divider"
        }
    }
}

/// Tags a layer's extra-data blocks can carry.
///
/// Every block is length prefixed, so an unrecognized tag degrades to
/// [`ExtraDataTag::Unsupported`] and is skipped by its declared length.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExtraDataTag {
    /// `lyid`, the numeric layer id.
    LayerId,
    /// `shmd`, a list of metadata sub-items.
    Metadata,
    /// `lsct`, the section divider type.
    SectionDivider,
    /// `luni`, a Unicode layer name overriding the Pascal one.
    UnicodeName,
    /// `vmsk`, a vector mask; only version and flags are read.
    VectorMask,
    /// `TySh`, a type-tool text block.
    TypeTool,
    Unsupported([u8; 4])
}

impl ExtraDataTag {
    pub fn from_fourcc(code: &[u8; 4]) -> ExtraDataTag {
        match code {
            b"lyid" => ExtraDataTag::LayerId,
            b"shmd" => ExtraDataTag::Metadata,
            b"lsct" => ExtraDataTag::SectionDivider,
            b"luni" => ExtraDataTag::UnicodeName,
            b"vmsk" => ExtraDataTag::VectorMask,
            b"TySh" => ExtraDataTag::TypeTool,
            _ => ExtraDataTag::Unsupported(*code)
        }
    }
}

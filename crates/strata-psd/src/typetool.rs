//! Type-tool (`TySh`) layer data: text content and resolved style runs.
//!
//! A type-tool block nests three layers deep: the tagged block carries a
//! descriptor, the descriptor carries an `EngineData` legacy-text blob,
//! and the blob carries the actual editor state. Resolution digs out the
//! run text, the per-run style sheets and the font table, and flattens
//! them into [`TextStyleRun`] records a consumer can use directly.
//!
//! Everything here is best effort: version guards that do not match and
//! missing engine keys stop resolution silently, the layer simply ends
//! up without text. Only byte-level faults (a read past the end, a
//! broken descriptor) are real errors.
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use strata_core::bytestream::ByteCursor;

use crate::descriptor::{read_descriptor, Descriptor};
use crate::engine_data::PsValue;
use crate::errors::PsdDecodeErrors;

/// Families a decoded font name may be substituted with.
///
/// A PSD font name maps to a family when it contains every word of the
/// family's name, so `ArialMT` and `TimesNewRomanPS-BoldMT` resolve to
/// their web-safe equivalents while anything else keeps its own name.
const WEB_SAFE_FAMILIES: [&str; 8] = [
    "Arial",
    "Comic Sans MS",
    "Courier New",
    "Georgia",
    "Impact",
    "Times New Roman",
    "Trebuchet MS",
    "Verdana"
];

/// Line height of a style run.
///
/// The editor stores automatic leading as the literal value 1500.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineHeight {
    Auto,
    Value(f64)
}

/// One styled slice of a type-tool layer's text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextStyleRun {
    pub text:           String,
    /// Resolved font family, after web-safe substitution.
    pub font:           String,
    pub size:           f64,
    /// Fill color as lowercase `rrggbb` hex.
    pub color:          String,
    pub bold:           bool,
    pub italic:         bool,
    pub underline:      bool,
    pub all_caps:       bool,
    /// Tracking divided by 20, the letter-spacing the editor renders.
    pub letter_spacing: f64,
    pub line_height:    LineHeight,
    /// Whether the run closes a paragraph (ends in `\n` or `\r`).
    pub paragraph_end:  bool
}

/// Decoded text content of a type-tool layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextData {
    pub text:   String,
    pub styles: Vec<TextStyleRun>,
    /// Text bounds as left, top, right, bottom, when the block carried
    /// them.
    pub bounds: Option<[f64; 4]>
}

/// Decode a `TySh` tagged block.
///
/// Returns `Ok(None)` when a version guard fails; the enclosing tag loop
/// realigns the cursor, so stopping short is free.
pub(crate) fn decode_type_tool(
    cursor: &mut ByteCursor
) -> Result<Option<TextData>, PsdDecodeErrors> {
    let version = cursor.get_u16_be()?;
    if version != 1 {
        return Ok(None);
    }

    // affine transform, not used further
    for _ in 0..6 {
        let _ = cursor.get_f64_be()?;
    }

    let text_version = cursor.get_u16_be()?;
    let descriptor_version = cursor.get_u32_be()?;
    if text_version != 50 || descriptor_version != 16 {
        return Ok(None);
    }

    let text_descriptor = read_descriptor(cursor)?;

    // the warp wrapper and bounds trail the text descriptor; a block cut
    // short there still resolves from what we have
    let warp_version = cursor.get_u16_be()?;
    let warp_descriptor_version = cursor.get_u32_be()?;
    if warp_version != 1 || warp_descriptor_version != 16 {
        return Ok(resolve_text_styles(&text_descriptor, None));
    }
    let _warp = read_descriptor(cursor)?;

    let mut bounds = [0_f64; 4];
    for value in &mut bounds {
        *value = cursor.get_f64_be()?;
    }

    Ok(resolve_text_styles(&text_descriptor, Some(bounds)))
}

/// Flatten the engine data of a text descriptor into style runs.
pub(crate) fn resolve_text_styles(
    descriptor: &Descriptor, bounds: Option<[f64; 4]>
) -> Option<TextData> {
    let engine = descriptor.get("EngineData")?.as_engine_data()?;

    let text = engine
        .get_path(&["EngineDict", "Editor", "Text"])?
        .as_str()?
        .to_string();
    let run_lengths = engine
        .get_path(&["EngineDict", "StyleRun", "RunLengthArray"])?
        .as_array()?;
    let run_array = engine
        .get_path(&["EngineDict", "StyleRun", "RunArray"])?
        .as_array()?;

    let empty: [PsValue; 0] = [];
    let font_set = engine
        .get_path(&["ResourceDict", "FontSet"])
        .and_then(PsValue::as_array)
        .unwrap_or(&empty);
    let fonts: Vec<&str> = font_set
        .iter()
        .map(|font| font.get("Name").and_then(PsValue::as_str).unwrap_or(""))
        .collect();

    let characters: Vec<char> = text.chars().collect();
    let mut styles = Vec::with_capacity(run_lengths.len());
    let mut offset = 0_usize;

    for (index, length) in run_lengths.iter().enumerate() {
        let length = length.as_i64().unwrap_or(0).max(0) as usize;
        let end = (offset + length).min(characters.len());
        let slice: String = characters[offset.min(end)..end].iter().collect();
        offset = end;

        let sheet = run_array
            .get(index)
            .and_then(|run| run.get_path(&["StyleSheet", "StyleSheetData"]));

        styles.push(resolve_run(&slice, sheet, &fonts));
    }

    Some(TextData { text, styles, bounds })
}

fn resolve_run(slice: &str, sheet: Option<&PsValue>, fonts: &[&str]) -> TextStyleRun {
    let get = |key: &str| sheet.and_then(|s| s.get(key));

    let font_index = get("Font").and_then(PsValue::as_i64).unwrap_or(0).max(0) as usize;
    let raw_font = fonts.get(font_index).copied().unwrap_or("");

    let color = get("FillColor")
        .and_then(|c| c.get("Values"))
        .and_then(PsValue::as_array)
        .and_then(fill_color_hex)
        .unwrap_or_else(|| "000000".to_string());

    let leading = get("Leading").and_then(PsValue::as_f64);
    let line_height = match leading {
        Some(value) if value != 1500.0 => LineHeight::Value(value),
        _ => LineHeight::Auto
    };

    TextStyleRun {
        text: slice.to_string(),
        font: safe_font(raw_font),
        size: get("FontSize").and_then(PsValue::as_f64).unwrap_or(12.0),
        color,
        bold: get("FauxBold").and_then(PsValue::as_bool).unwrap_or(false)
            || raw_font.contains("Bold"),
        italic: get("FauxItalic").and_then(PsValue::as_bool).unwrap_or(false)
            || raw_font.contains("Italic"),
        underline: get("Underline").and_then(PsValue::as_bool).unwrap_or(false),
        all_caps: get("FontCaps").and_then(PsValue::as_i64) == Some(2),
        letter_spacing: get("Tracking").and_then(PsValue::as_f64).unwrap_or(0.0) / 20.0,
        line_height,
        paragraph_end: slice.ends_with('\n') || slice.ends_with('\r')
    }
}

/// RGB hex from the editor's alpha-first color array: the alpha
/// component is dropped and the remaining three scaled by 255.
fn fill_color_hex(values: &[PsValue]) -> Option<String> {
    if values.len() != 4 {
        return None;
    }
    let mut rgb = [0_u8; 3];
    for (out, value) in rgb.iter_mut().zip(values[1..].iter()) {
        *out = (value.as_f64()? * 255.0) as u8;
    }
    Some(format!("{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]))
}

/// Substitute a font whose name contains all words of a web-safe family
/// name with that family; anything else keeps its name.
fn safe_font(name: &str) -> String {
    for family in WEB_SAFE_FAMILIES {
        if family.split(' ').all(|word| name.contains(word)) {
            return family.to_string();
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;

    use super::*;
    use crate::descriptor::DescriptorValue;
    use crate::engine_data::EngineDataParser;

    const ENGINE_SOURCE: &str = r"<<
/EngineDict
<<
/Editor
<<
/Text (Hello World!
Bye)
>>
/StyleRun
<<
/RunLengthArray [ 13 3 ]
/RunArray [
<<
/StyleSheet
<<
/StyleSheetData
<<
/Font 0
/FontSize 24.0
/FontCaps 2
/Underline true
/Tracking 40
/Leading 1500
/FillColor
<<
/Type 1
/Values [ 1.0 1.0 0.0 0.0 ]
>>
>>
>>
>>
<<
/StyleSheet
<<
/StyleSheetData
<<
/Font 1
/FontSize 10.5
/Leading 12.5
>>
>>
>>
]
>>
>>
/ResourceDict
<<
/FontSet [
<<
/Name (ArialMT)
>>
<<
/Name (TimesNewRomanPS-BoldMT)
>>
]
>>
>>";

    fn text_descriptor() -> Descriptor {
        let engine = EngineDataParser::new(ENGINE_SOURCE.as_bytes())
            .parse()
            .unwrap();
        let mut items = BTreeMap::new();
        items.insert(
            "EngineData".into(),
            DescriptorValue::EngineData(Some(engine))
        );
        Descriptor { name: String::new(), class_id: "TxLr".into(), items }
    }

    #[test]
    fn styles_resolve_per_run() {
        let data = resolve_text_styles(&text_descriptor(), None).unwrap();
        assert_eq!(data.text, "Hello World!\nBye");
        assert_eq!(data.styles.len(), 2);

        let first = &data.styles[0];
        assert_eq!(first.text, "Hello World!\n");
        assert_eq!(first.font, "Arial");
        assert_eq!(first.size, 24.0);
        assert_eq!(first.color, "ff0000");
        assert!(first.underline);
        assert!(first.all_caps);
        assert!(!first.bold);
        assert_eq!(first.letter_spacing, 2.0);
        assert_eq!(first.line_height, LineHeight::Auto);
        assert!(first.paragraph_end);

        let second = &data.styles[1];
        assert_eq!(second.text, "Bye");
        assert_eq!(second.font, "Times New Roman");
        // the raw name carries "Bold" even though no flag is set
        assert!(second.bold);
        assert_eq!(second.line_height, LineHeight::Value(12.5));
        assert!(!second.paragraph_end);
    }

    #[test]
    fn missing_engine_keys_stop_resolution() {
        let descriptor = Descriptor::default();
        assert_eq!(resolve_text_styles(&descriptor, None), None);
    }

    #[test]
    fn version_guard_stops_silently() {
        // version 2 instead of 1
        let bytes = [0_u8, 2, 0xFF, 0xFF];
        let mut cursor = ByteCursor::new(&bytes);
        assert!(decode_type_tool(&mut cursor).unwrap().is_none());

        // good version, bad text version (49 instead of 50)
        let mut bytes = alloc::vec![0_u8, 1];
        bytes.extend_from_slice(&[0; 48]);
        bytes.extend_from_slice(&49_u16.to_be_bytes());
        bytes.extend_from_slice(&16_u32.to_be_bytes());
        let mut cursor = ByteCursor::new(&bytes);
        assert!(decode_type_tool(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn font_substitution() {
        assert_eq!(safe_font("ArialMT"), "Arial");
        assert_eq!(safe_font("Courier-NewRegular"), "Courier New");
        assert_eq!(safe_font("Helvetica-Light"), "Helvetica-Light");
        assert_eq!(safe_font(""), "");
    }
}

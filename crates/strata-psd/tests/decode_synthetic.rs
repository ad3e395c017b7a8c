//! End-to-end decodes over synthetic documents built in memory.
//!
//! The builders below write the container the way the format specifies
//! it, byte for byte, so every test is self-contained and the crate
//! needs no binary fixtures.
use strata_core::options::DecoderOptions;
use strata_psd::constants::{BlendMode, SectionType};
use strata_psd::errors::PsdDecodeErrors;
use strata_psd::typetool::LineHeight;
use strata_psd::{probe_psd, PsdDecoder};

fn be16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn be32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn unicode(out: &mut Vec<u8>, text: &str) {
    let units: Vec<u16> = text.encode_utf16().collect();
    be32(out, units.len() as u32);
    for unit in units {
        be16(out, unit);
    }
}

fn pascal(out: &mut Vec<u8>, name: &str) {
    let length = name.len();
    out.push(length as u8);
    if length == 0 {
        out.push(0);
        return;
    }
    let padded = ((length + 1 + 3) & !3) - 1;
    out.extend_from_slice(name.as_bytes());
    out.extend(std::iter::repeat(0).take(padded - length));
}

fn header(channels: u16, height: u32, width: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"8BPS");
    be16(&mut out, 1); // version
    out.extend_from_slice(&[0; 6]); // reserved
    be16(&mut out, channels);
    be32(&mut out, height);
    be32(&mut out, width);
    be16(&mut out, 8); // depth
    be16(&mut out, 3); // RGB
    out
}

/// A layer under construction: record fields plus raw channel samples.
struct SyntheticLayer {
    rect:     (i32, i32, i32, i32),
    /// (channel id, raw samples); planes are written uncompressed
    channels: Vec<(i16, Vec<u8>)>,
    blend:    [u8; 4],
    opacity:  u8,
    flags:    u8,
    name:     &'static str,
    /// (tag, payload); payloads must be even sized
    blocks:   Vec<([u8; 4], Vec<u8>)>
}

impl SyntheticLayer {
    fn plain(name: &'static str, rect: (i32, i32, i32, i32)) -> SyntheticLayer {
        SyntheticLayer {
            rect,
            channels: Vec::new(),
            blend: *b"norm",
            opacity: 255,
            flags: 0,
            name,
            blocks: Vec::new()
        }
    }

    fn section(mut self, section_type: u32) -> SyntheticLayer {
        let mut payload = Vec::new();
        be32(&mut payload, section_type);
        self.blocks.push((*b"lsct", payload));
        self
    }

    fn layer_id(mut self, id: u32) -> SyntheticLayer {
        let mut payload = Vec::new();
        be32(&mut payload, id);
        self.blocks.push((*b"lyid", payload));
        self
    }

    fn record(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for value in [self.rect.0, self.rect.1, self.rect.2, self.rect.3] {
            be32(&mut out, value as u32);
        }
        be16(&mut out, self.channels.len() as u16);
        for (id, samples) in &self.channels {
            be16(&mut out, *id as u16);
            be32(&mut out, 2 + samples.len() as u32); // code + raw data
        }
        out.extend_from_slice(b"8BIM");
        out.extend_from_slice(&self.blend);
        out.push(self.opacity);
        out.push(0); // clipping
        out.push(self.flags);
        out.push(0); // filler

        let mut extra = Vec::new();
        be32(&mut extra, 0); // no mask record
        be32(&mut extra, 0); // no blending ranges
        pascal(&mut extra, self.name);
        for (tag, payload) in &self.blocks {
            extra.extend_from_slice(b"8BIM");
            extra.extend_from_slice(tag);
            be32(&mut extra, payload.len() as u32);
            extra.extend_from_slice(payload);
        }

        be32(&mut out, extra.len() as u32);
        out.extend_from_slice(&extra);
        out
    }

    fn planes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (_, samples) in &self.channels {
            be16(&mut out, 0); // raw
            out.extend_from_slice(samples);
        }
        out
    }
}

/// Assemble a whole document: header, empty color mode and resources,
/// the given layers in stored (top-first) order, and a raw composite.
fn build_document(layers: &[SyntheticLayer], channels: u16, height: u32, width: u32) -> Vec<u8> {
    let mut out = header(channels, height, width);
    be32(&mut out, 0); // color mode block
    be32(&mut out, 0); // image resources

    if layers.is_empty() {
        be32(&mut out, 0); // no layer and mask section
    } else {
        let mut info = Vec::new();
        be16(&mut info, layers.len() as u16);
        for layer in layers {
            info.extend_from_slice(&layer.record());
        }
        for layer in layers {
            info.extend_from_slice(&layer.planes());
        }
        if info.len() % 2 != 0 {
            info.push(0);
        }

        be32(&mut out, (4 + info.len() + 4) as u32); // section length
        be32(&mut out, info.len() as u32); // layer info length
        out.extend_from_slice(&info);
        be32(&mut out, 0); // global mask info
    }

    // composite image: raw planes of the header's geometry
    be16(&mut out, 0);
    let pixels = (height * width) as usize;
    for index in 0..channels {
        out.extend(std::iter::repeat((index as u8 + 1) * 10).take(pixels));
    }
    out
}

#[test]
fn probe_checks_magic_and_version() {
    assert!(probe_psd(&header(3, 1, 1)));
    assert!(!probe_psd(b"8BPS\x00\x02rest"));
    assert!(!probe_psd(b"GIF89a"));
    assert!(!probe_psd(&[]));
}

#[test]
fn flat_layers_decode_bottom_to_top() {
    let top = {
        let mut layer = SyntheticLayer::plain("top", (0, 0, 1, 2)).layer_id(11);
        layer.channels = vec![
            (0, vec![1, 2]),
            (1, vec![3, 4]),
            (2, vec![5, 6]),
            (-1, vec![200, 255]),
        ];
        layer.opacity = 128;
        layer
    };
    let bottom = {
        let mut layer = SyntheticLayer::plain("bottom", (0, 0, 2, 2)).layer_id(7);
        layer.channels = vec![(0, vec![9; 4]), (1, vec![9; 4]), (2, vec![9; 4])];
        layer.flags = 0b0000_0010; // hidden
        layer
    };

    // stored order is top-first
    let bytes = build_document(&[top, bottom], 3, 2, 2);
    let document = PsdDecoder::new(&bytes).decode().unwrap();

    assert_eq!(document.layer_count(), 2);
    // decode reverses into bottom-to-top stacking
    assert_eq!(document.layers[0].name, "bottom");
    assert_eq!(document.layers[1].name, "top");
    assert_eq!(document.layers[0].layer_id, 7);
    assert_eq!(document.layers[1].layer_id, 11);

    // flag bit 1 means hidden
    assert!(!document.layers[0].visible);
    assert!(document.layers[1].visible);

    // alpha was stored as 200 and 255 under opacity 128
    let top = &document.layers[1];
    assert_eq!(top.blend_mode, BlendMode::Normal);
    assert_eq!(top.planes.a, vec![100, 128]);
    assert_eq!(top.rect.width(), 2);
    assert_eq!(top.rect.height(), 1);
    // composed RGBA: channel samples plus scaled alpha
    assert_eq!(top.image, vec![1, 3, 5, 100, 2, 4, 6, 128]);

    // the merged image is kept next to the explicit layers
    let composite = document.composite.as_ref().unwrap();
    assert_eq!(composite.name, "Composite");
    assert_eq!(composite.planes.r, vec![10; 4]);
    assert_eq!(composite.planes.g, vec![20; 4]);
}

#[test]
fn folders_resolve_parents() {
    // bottom-to-top: open A, plain B, divider, plain C
    // stored top-first, so written in reverse
    let layers = [
        SyntheticLayer::plain("C", (0, 0, 0, 0)),
        SyntheticLayer::plain("", (0, 0, 0, 0)).section(3),
        SyntheticLayer::plain("B", (0, 0, 0, 0)),
        SyntheticLayer::plain("A", (0, 0, 0, 0)).section(1),
    ];
    let bytes = build_document(&layers, 3, 1, 1);
    let document = PsdDecoder::new(&bytes).decode().unwrap();

    assert_eq!(document.layers[0].name, "A");
    assert_eq!(document.layers[0].section_type, SectionType::OpenFolder);
    assert_eq!(document.layers[1].name, "B");
    assert_eq!(document.layers[1].parent, Some(0));
    assert_eq!(document.layers[3].name, "C");
    assert_eq!(document.layers[3].parent, None);
}

#[test]
fn stray_divider_fails_the_decode() {
    // a divider with no folder under it pops past the root
    let layers = [
        SyntheticLayer::plain("x", (0, 0, 0, 0)),
        SyntheticLayer::plain("", (0, 0, 0, 0)).section(3),
    ];
    let bytes = build_document(&layers, 3, 1, 1);
    assert!(matches!(
        PsdDecoder::new(&bytes).decode(),
        Err(PsdDecodeErrors::UnbalancedLayerGroups)
    ));
}

#[test]
fn empty_layer_list_leaves_the_composite_as_sole_layer() {
    let bytes = build_document(&[], 3, 2, 2);
    let document = PsdDecoder::new(&bytes).decode().unwrap();

    assert_eq!(document.layer_count(), 1);
    assert!(document.composite.is_none());
    let base = &document.layers[0];
    assert_eq!(base.name, "Composite");
    assert_eq!(base.rect.width(), 2);
    assert_eq!(base.planes.b, vec![30; 4]);
    // defaulted alpha stays opaque in the composed buffer
    assert_eq!(&base.image[..4], &[10, 20, 30, 255]);
}

#[test]
fn skipping_layers_keeps_only_the_composite() {
    let mut layer = SyntheticLayer::plain("ignored", (0, 0, 1, 1));
    layer.channels = vec![(0, vec![1])];
    let bytes = build_document(&[layer], 3, 2, 2);

    let options = DecoderOptions::default().psd_set_decode_layers(false);
    let document = PsdDecoder::new_with_options(&bytes, options)
        .decode()
        .unwrap();
    assert_eq!(document.layer_count(), 1);
    assert_eq!(document.layers[0].name, "Composite");
}

#[test]
fn decoding_twice_yields_equal_documents() {
    let mut layer = SyntheticLayer::plain("solo", (0, 0, 2, 2)).layer_id(3);
    layer.channels = vec![(0, vec![1, 2, 3, 4]), (-1, vec![255; 4])];
    let bytes = build_document(&[layer], 3, 2, 2);

    let first = PsdDecoder::new(&bytes).decode().unwrap();
    let second = PsdDecoder::new(&bytes).decode().unwrap();
    assert_eq!(first, second);
}

#[test]
fn truncated_header_is_fatal() {
    let bytes = header(3, 2, 2);
    // cut inside the dimension fields
    let mut decoder = PsdDecoder::new(&bytes[..12]);
    assert!(matches!(
        decoder.decode(),
        Err(PsdDecodeErrors::IoErrors(_))
    ));
}

#[test]
fn wrong_magic_is_fatal() {
    let mut bytes = header(3, 2, 2);
    bytes[0] = b'X';
    assert!(matches!(
        PsdDecoder::new(&bytes).decode(),
        Err(PsdDecodeErrors::WrongMagicBytes(_))
    ));
}

#[test]
fn unknown_blend_mode_is_fatal() {
    let mut layer = SyntheticLayer::plain("x", (0, 0, 1, 1));
    layer.blend = *b"wxyz";
    layer.channels = vec![(0, vec![1])];
    let bytes = build_document(&[layer], 3, 1, 1);
    assert!(matches!(
        PsdDecoder::new(&bytes).decode(),
        Err(PsdDecodeErrors::UnknownBlendMode(_))
    ));
}

#[test]
fn rle_composite_decodes() {
    let mut out = header(1, 2, 2);
    be32(&mut out, 0);
    be32(&mut out, 0);
    be32(&mut out, 0); // no layers
    be16(&mut out, 1); // RLE
    // two scanlines, one channel: lengths then packed data
    be16(&mut out, 2);
    be16(&mut out, 3);
    out.extend_from_slice(&[0xFF, 0x61]); // replicate 0x61 twice
    out.extend_from_slice(&[0x01, 0x10, 0x20]); // two literals

    let document = PsdDecoder::new(&out).decode().unwrap();
    let base = &document.layers[0];
    assert_eq!(base.planes.r, vec![0x61, 0x61, 0x10, 0x20]);
}

#[test]
fn header_accessors_answer_after_decode_headers() {
    let bytes = build_document(&[], 4, 3, 5);
    let mut decoder = PsdDecoder::new(&bytes);
    assert_eq!(decoder.dimensions(), None);

    decoder.decode_headers().unwrap();
    assert_eq!(decoder.dimensions(), Some((5, 3)));
    assert_eq!(decoder.bit_depth(), Some(8));
    // calling it again is free and changes nothing
    decoder.decode_headers().unwrap();
    assert_eq!(decoder.dimensions(), Some((5, 3)));
}

/// A full type-tool block: version guards, text descriptor with engine
/// data, warp pair and bounds.
fn type_tool_block() -> Vec<u8> {
    const ENGINE: &str = "<<\n/EngineDict\n<<\n/Editor\n<<\n/Text (Hi!)\n>>\n/StyleRun\n<<\n/RunLengthArray [ 3 ]\n/RunArray [\n<<\n/StyleSheet\n<<\n/StyleSheetData\n<<\n/Font 0\n/FontSize 24.0\n/Leading 1500\n/FillColor\n<<\n/Values [ 1.0 1.0 0.0 0.0 ]\n>>\n>>\n>>\n>>\n]\n>>\n>>\n/ResourceDict\n<<\n/FontSet [\n<<\n/Name (ArialMT)\n>>\n]\n>>\n>>";

    let mut block = Vec::new();
    be16(&mut block, 1); // version
    block.extend_from_slice(&[0; 48]); // transform

    be16(&mut block, 50); // text version
    be32(&mut block, 16); // descriptor version

    // text descriptor: one EngineData item
    unicode(&mut block, "");
    be32(&mut block, 4);
    block.extend_from_slice(b"TxLr");
    be32(&mut block, 1);
    be32(&mut block, 10);
    block.extend_from_slice(b"EngineData");
    block.extend_from_slice(b"tdta");
    be32(&mut block, ENGINE.len() as u32);
    block.extend_from_slice(ENGINE.as_bytes());

    be16(&mut block, 1); // warp version
    be32(&mut block, 16);
    // empty warp descriptor
    unicode(&mut block, "");
    be32(&mut block, 4);
    block.extend_from_slice(b"warp");
    be32(&mut block, 0);

    for _ in 0..4 {
        block.extend_from_slice(&0.0_f64.to_be_bytes());
    }

    if block.len() % 2 != 0 {
        block.push(0);
    }
    block
}

#[test]
fn type_tool_text_resolves_styles() {
    let mut layer = SyntheticLayer::plain("headline", (0, 0, 1, 1));
    layer.channels = vec![(0, vec![0])];
    layer.blocks.push((*b"TySh", type_tool_block()));

    let bytes = build_document(&[layer], 3, 1, 1);
    let document = PsdDecoder::new(&bytes).decode().unwrap();

    let text = document.layers[0].text.as_ref().unwrap();
    assert_eq!(text.text, "Hi!");
    assert_eq!(text.bounds, Some([0.0; 4]));
    assert_eq!(text.styles.len(), 1);

    let style = &text.styles[0];
    assert_eq!(style.text, "Hi!");
    assert_eq!(style.font, "Arial");
    assert_eq!(style.size, 24.0);
    assert_eq!(style.color, "ff0000");
    assert_eq!(style.line_height, LineHeight::Auto);
    assert!(!style.paragraph_end);
}

#[test]
fn text_decoding_can_be_disabled() {
    let mut layer = SyntheticLayer::plain("headline", (0, 0, 1, 1));
    layer.channels = vec![(0, vec![0])];
    layer.blocks.push((*b"TySh", type_tool_block()));

    let bytes = build_document(&[layer], 3, 1, 1);
    let options = DecoderOptions::default().psd_set_decode_text(false);
    let document = PsdDecoder::new_with_options(&bytes, options)
        .decode()
        .unwrap();
    assert!(document.layers[0].text.is_none());
}

#[test]
fn unknown_layer_tags_are_skipped_by_length() {
    let mut layer = SyntheticLayer::plain("x", (0, 0, 1, 1)).layer_id(5);
    layer.channels = vec![(0, vec![1])];
    // an unrecognized tag in front of lyid; its payload must not shift
    // anything that follows
    layer
        .blocks
        .insert(0, (*b"zzzz", vec![0xAA, 0xBB, 0xCC, 0xDD]));

    let bytes = build_document(&[layer], 3, 1, 1);
    let document = PsdDecoder::new(&bytes).decode().unwrap();
    assert_eq!(document.layers[0].layer_id, 5);
}

//! A layered PSD document decoder
//!
//! This crate decodes the Photoshop document container into a structured,
//! queryable document model and reconstructs per-layer pixel buffers.
//!
//! ## What it covers
//! Photoshop is a complicated format, probably one of the most complicated
//! ones, and this library does not claim to understand everything Photoshop
//! and its derivatives will generate.
//!
//! It decodes the header, the image resources (including the slices
//! resource), the full layer records with their tagged extra data
//! (layer ids, section dividers, Unicode names, type-tool text with
//! resolved style runs), raw and RLE compressed channel planes, and it
//! rebuilds the folder hierarchy and a per-layer RGBA image.
//! ZIP compressed planes are detected but not decoded, vector mask path
//! data is skipped, and there is no color management: decoded channels
//! are handed over as they are stored.
//!
//! Decoding is strictly one forward pass; the resulting [`PsdDocument`]
//! is immutable and can be shared across threads for downstream work
//! such as exporting layers.
//!
//! # Example
//! - Reading a psd file
//! ```no_run
//! use strata_psd::errors::PsdDecodeErrors;
//! use strata_psd::PsdDecoder;
//!
//! fn main() -> Result<(), PsdDecodeErrors> {
//!     let data = std::fs::read("document.psd").unwrap();
//!     let mut decoder = PsdDecoder::new(&data);
//!     let document = decoder.decode()?;
//!
//!     for layer in &document.layers {
//!         // layer.image holds width*height RGBA pixels
//!         let _ = (&layer.name, layer.rect.width(), layer.rect.height());
//!     }
//!     Ok(())
//! }
//! ```
#![no_std]
extern crate alloc;
pub extern crate strata_core;

pub use decoder::{probe_psd, PsdDecoder};
pub use document::PsdDocument;

pub mod constants;
pub mod decoder;
pub mod descriptor;
pub mod document;
pub mod engine_data;
pub mod errors;
pub mod layer;
mod planes;
pub mod resources;
pub mod typetool;

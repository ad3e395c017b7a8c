//! Core routines shared by the strata decoder crates
//!
//! This crate provides the plumbing the document decoders under the
//! `strata` umbrella are built from:
//!
//! - A forward-only byte cursor with big-endian reads, the Photoshop
//!   string forms (fixed, Pascal, Unicode) and length-delimited region
//!   alignment.
//! - Decoder options shared by the decoders.
//! - A logging facade that forwards to the `log` crate when the `log`
//!   feature is enabled and compiles to nothing otherwise.
//!
//! This library is `#[no_std]` with `alloc` needed for `Vec` and `String`
//! which we need for storing decoded values.
//!
//! # Features
//!  - `std`: Enables `std` compilation support.
//!  - `log`: Forwards diagnostics to the `log` crate.
//!  - `serde`: Enables serializing of some of the data structures
//!    present in the crate
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;

pub mod bytestream;
pub mod log;
pub mod options;

#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]

//! A crate for decoding CEL, ANIM, and IMAG image containers.
//!
//! These are the chunked bitmap and animation files of 1990s console games:
//! palette-indexed or direct color pixels, usually run-length packed, with
//! per-pixel transparency, brightness, and blend information on the side.
//!
//! The usual entry points are:
//! * [`decode_cel_file`] for every image in a file.
//! * [`decode_animation`] for animations, with their timing and loops.
//! * [`decode_cel`] for a single header and pixel data you already have.
//!
//! Each decode produces a [`DecodedImage`], which holds the raw decoded values
//! and side channels. Call [`DecodedImage::materialize`] to get RGBA pixels.
//!
//! This crate doesn't install a logger, but it does report through the `log`
//! crate: truncated data, orphaned chunks, and units that fail to decode are
//! all logged as warnings.

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod util;

pub mod bit_reader;
pub mod color;
pub mod format;
pub mod header;
pub mod packet;

#[cfg(feature = "alloc")]
pub mod blend;
#[cfg(feature = "alloc")]
pub mod chunk;
#[cfg(feature = "alloc")]
pub mod container;
#[cfg(feature = "alloc")]
pub mod decode;
#[cfg(feature = "alloc")]
pub mod image;
#[cfg(feature = "alloc")]
mod materialize;
#[cfg(feature = "alloc")]
pub mod palette;
#[cfg(feature = "alloc")]
pub mod reorder;

#[cfg(feature = "anim")]
#[cfg_attr(docs_rs, doc(cfg(feature = "anim")))]
pub mod anim;

#[cfg(feature = "imag")]
#[cfg_attr(docs_rs, doc(cfg(feature = "imag")))]
pub mod imag;

#[cfg(test)]
mod test_util;

pub use format::{CelFormat, FormatOverrides};
pub use header::{CcbFlags, CelHeader, PModeSelect};

#[cfg(feature = "alloc")]
pub use self::{
  container::{
    decode_cel_file, decode_cel_file_with, CelFile, DecodeReport, NearestPalette,
    PaletteAssociation, StrictOrder,
  },
  decode::{decode_cel, BlendOptions, DecodeOptions, DecodedImage, PixelData},
  image::{Bitmap, Palmap},
  palette::{Palette, PaletteEncoding},
};

#[cfg(feature = "anim")]
pub use anim::{decode_animation, decode_animation_with, AnimationContainer};

pub use pixel_formats::r8g8b8a8_Srgb;

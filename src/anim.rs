#![forbid(unsafe_code)]

//! Animations: many frames of pixel data under an `ANIM` wrapper chunk.
//!
//! The wrapper gives the frame timing and a table of loops. Frames either
//! each have their own header chunk, or all share the first one.
//!
//! Note that the loop table always holds at least one entry, even when the
//! wrapper says there are zero loops. Files in the wild also often declare a
//! wrapper size that stops short of the loop table, so chunk scanning picks
//! up again after whichever of the two ends is later.

use alloc::vec::Vec;
use core::time::Duration;
use pack1::U32BE;

use crate::{
  container::{decode_units, scan_chunks, DecodeReport, NearestPalette, PaletteAssociation},
  decode::{DecodeOptions, DecodedImage},
  util::try_pull_pod,
  CelResult,
};

/// Animation timing counts in these per second.
pub const TICKS_PER_SECOND: u32 = 60;

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
struct RawAnimHeader {
  version: U32BE,
  kind: U32BE,
  frame_count: U32BE,
  frame_interval: U32BE,
  start_frame: U32BE,
  loop_count: U32BE,
}

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
struct RawAnimLoop {
  start_frame: U32BE,
  end_frame: U32BE,
  repeat_count: U32BE,
  repeat_delay: U32BE,
}

const ANIM_HEADER_LEN: usize = core::mem::size_of::<RawAnimHeader>();
const ANIM_LOOP_LEN: usize = core::mem::size_of::<RawAnimLoop>();

/// Where an animation's frames get their header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimKind {
  /// Each frame has its own header chunk.
  PerFrameHeader,
  /// Every frame uses the first header chunk.
  SharedHeader,
  /// Anything else, decoded like [`AnimKind::PerFrameHeader`].
  Other(u32),
}
impl From<u32> for AnimKind {
  #[inline]
  fn from(value: u32) -> Self {
    match value {
      0 => Self::PerFrameHeader,
      1 => Self::SharedHeader,
      other => Self::Other(other),
    }
  }
}

/// One entry of the loop table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimLoop {
  pub start_frame: u32,
  pub end_frame: u32,
  /// Extra passes through the loop. Negative means forever.
  pub repeat_count: i32,
  /// Ticks to hold the end frame before jumping back.
  pub repeat_delay: u32,
}
impl From<RawAnimLoop> for AnimLoop {
  #[inline]
  fn from(r: RawAnimLoop) -> Self {
    Self {
      start_frame: r.start_frame.get(),
      end_frame: r.end_frame.get(),
      repeat_count: r.repeat_count.get() as i32,
      repeat_delay: r.repeat_delay.get(),
    }
  }
}

/// A parsed `ANIM` payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimHeader {
  pub version: u32,
  pub kind: AnimKind,
  pub frame_count: u32,
  /// Ticks per frame.
  pub frame_interval: u32,
  pub start_frame: u32,
  pub loop_count: u32,
  /// The first `loop_count` loop table entries that were present.
  pub loops: Vec<AnimLoop>,
}
impl AnimHeader {
  /// Parses an `ANIM` payload.
  ///
  /// Loop entries that would run past the end of the payload are left out of
  /// [`loops`](Self::loops), but they still count for
  /// [`loop_table_len`](Self::loop_table_len).
  pub fn try_from_payload(payload: &[u8]) -> CelResult<Self> {
    let (raw, mut rest) = try_pull_pod::<RawAnimHeader>(payload)?;
    let loop_count = raw.loop_count.get();
    let mut loops = Vec::new();
    let present = (rest.len() / ANIM_LOOP_LEN).min(loop_count as usize);
    loops.try_reserve(present)?;
    for _ in 0..present {
      let (l, tail) = try_pull_pod::<RawAnimLoop>(rest)?;
      loops.push(AnimLoop::from(l));
      rest = tail;
    }
    let header = Self {
      version: raw.version.get(),
      kind: AnimKind::from(raw.kind.get()),
      frame_count: raw.frame_count.get(),
      frame_interval: raw.frame_interval.get(),
      start_frame: raw.start_frame.get(),
      loop_count,
      loops,
    };
    log::debug!("animation header: {header:?}");
    Ok(header)
  }

  /// Payload bytes taken by the fixed fields and the loop table. The table
  /// always has at least one entry.
  #[inline]
  #[must_use]
  pub fn loop_table_len(&self) -> usize {
    let entries = (self.loop_count as usize).max(1);
    ANIM_HEADER_LEN.saturating_add(entries.saturating_mul(ANIM_LOOP_LEN))
  }

  #[inline]
  #[must_use]
  pub fn shares_header(&self) -> bool {
    self.kind == AnimKind::SharedHeader
  }
}

/// A decoded animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationContainer {
  pub kind: AnimKind,
  /// The frames that decoded, in file order.
  pub frames: Vec<DecodedImage>,
  /// Ticks per frame. 0 when the file had no `ANIM` wrapper.
  pub frame_interval: u32,
  pub start_frame: u32,
  pub loops: Vec<AnimLoop>,
  pub report: DecodeReport,
}
impl AnimationContainer {
  /// How long each frame is shown.
  #[inline]
  #[must_use]
  pub fn frame_duration(&self) -> Duration {
    ticks_to_duration(self.frame_interval)
  }

  /// The order frames are shown in, with loops expanded.
  ///
  /// An animation with a loop that repeats forever gives an endless iterator.
  #[inline]
  #[must_use]
  pub fn playback(&self) -> Playback<'_> {
    Playback::new(self.frames.len(), self.frame_interval, self.start_frame, &self.loops)
  }
}

/// Converts 1/60 second ticks to a [`Duration`].
#[inline]
#[must_use]
pub fn ticks_to_duration(ticks: u32) -> Duration {
  Duration::from_nanos(u64::from(ticks) * 1_000_000_000 / u64::from(TICKS_PER_SECOND))
}

/// One step of [`Playback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackStep {
  pub frame: usize,
  /// How many ticks to show the frame for.
  pub ticks: u32,
}

/// Iterator over the frames of an animation in display order.
#[derive(Debug, Clone)]
pub struct Playback<'a> {
  frame_count: usize,
  interval: u32,
  loops: &'a [AnimLoop],
  /// Passes left per loop, `None` for forever.
  remaining: Vec<Option<u32>>,
  next: Option<usize>,
}
impl<'a> Playback<'a> {
  fn new(frame_count: usize, interval: u32, start_frame: u32, loops: &'a [AnimLoop]) -> Self {
    let remaining = loops.iter().map(|l| u32::try_from(l.repeat_count).ok()).collect();
    let start = start_frame as usize;
    let next = if start < frame_count {
      Some(start)
    } else if frame_count > 0 {
      Some(0)
    } else {
      None
    };
    Self { frame_count, interval, loops, remaining, next }
  }
}
impl Iterator for Playback<'_> {
  type Item = PlaybackStep;
  fn next(&mut self) -> Option<PlaybackStep> {
    let frame = self.next?;
    let mut ticks = self.interval;
    let mut following = frame + 1;
    for (l, left) in self.loops.iter().zip(self.remaining.iter_mut()) {
      let (start, end) = (l.start_frame as usize, l.end_frame as usize);
      if end != frame || start > end {
        continue;
      }
      let jump = match left {
        None => true,
        Some(0) => false,
        Some(n) => {
          *n -= 1;
          true
        }
      };
      if jump {
        following = start;
        ticks = ticks.saturating_add(l.repeat_delay);
        break;
      }
    }
    self.next = if following < self.frame_count { Some(following) } else { None };
    Some(PlaybackStep { frame, ticks })
  }
}

/// Decodes an animation file, using [`NearestPalette`].
///
/// Files with no `ANIM` wrapper decode as a plain sequence of frames.
///
/// ## Failure
/// Only when an allocation for the whole file fails. Errors in single frames
/// are in the report instead.
pub fn decode_animation(bytes: &[u8], options: &DecodeOptions) -> CelResult<AnimationContainer> {
  decode_animation_with(bytes, options, &NearestPalette)
}

/// Decodes an animation file with the given palette association.
pub fn decode_animation_with(
  bytes: &[u8], options: &DecodeOptions, association: &dyn PaletteAssociation,
) -> CelResult<AnimationContainer> {
  let scan = scan_chunks(bytes)?;
  let shared = scan.anim.as_ref().map_or(false, AnimHeader::shares_header);
  let (frames, report) = decode_units(&scan.chunks, shared, options, association)?;
  let Some(anim) = scan.anim else {
    return Ok(AnimationContainer {
      kind: AnimKind::PerFrameHeader,
      frames,
      frame_interval: 0,
      start_frame: 0,
      loops: Vec::new(),
      report,
    });
  };
  if anim.frame_count as usize != frames.len() {
    log::warn!("animation declares {} frames but {} decoded", anim.frame_count, frames.len());
  }
  Ok(AnimationContainer {
    kind: anim.kind,
    frames,
    frame_interval: anim.frame_interval,
    start_frame: anim.start_frame,
    loops: anim.loops,
    report,
  })
}

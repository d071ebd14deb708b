use operacel::{
  anim::{AnimKind, PlaybackStep},
  decode_animation, DecodeOptions, PixelData,
};

use super::{chunk, ccb_payload, init_logger, packed_8bpp_rows, CCBPRE, PACKED};

fn anim_head(kind: u32, frame_count: u32, loop_count: u32) -> Vec<u8> {
  let mut v = Vec::new();
  for w in [0, kind, frame_count, 6, 0, loop_count] {
    v.extend_from_slice(&w.to_be_bytes());
  }
  v
}

fn frame(value: u8) -> Vec<u8> {
  packed_8bpp_rows(&[&[(3, 2, &[value])], &[(3, 2, &[value])]])
}

#[test]
fn test_decode_animation_no_panics() {
  init_logger();
  for _ in 0..10 {
    let mut v = chunk(b"ANIM", &super::rand_bytes(40));
    v.extend(super::rand_bytes(512));
    let _ = decode_animation(&v, &DecodeOptions::default());
  }
}

#[test]
fn test_zero_loop_count_consumes_one_descriptor() {
  init_logger();
  // declared size only covers the fixed fields, the descriptor trails after
  let head = anim_head(0, 2, 0);
  let mut file = Vec::new();
  file.extend_from_slice(b"ANIM");
  file.extend_from_slice(&(8 + head.len() as u32).to_be_bytes());
  file.extend_from_slice(&head);
  // a descriptor whose bytes would look like a chunk if they were scanned
  file.extend_from_slice(b"PDAT\0\0\0\x10\0\0\0\0\0\0\0\0");
  for v in [1, 2] {
    file.extend(chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, (1 << 6) | 5, 2, 0)));
    file.extend(chunk(b"PDAT", &frame(v)));
  }

  let anim = decode_animation(&file, &DecodeOptions::default()).unwrap();
  assert!(anim.report.is_clean());
  assert_eq!(anim.kind, AnimKind::PerFrameHeader);
  assert_eq!(anim.frames.len(), 2);
  assert!(anim.loops.is_empty());
  assert_eq!(anim.frames[1].pixels, PixelData::Values(vec![2; 4]));
}

#[test]
fn test_shared_header_with_loop() {
  let mut head = anim_head(1, 3, 1);
  for w in [1_u32, 2, 2, 30] {
    head.extend_from_slice(&w.to_be_bytes());
  }
  let mut file = chunk(b"ANIM", &head);
  file.extend(chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, (1 << 6) | 5, 2, 0)));
  for v in [1, 2, 3] {
    file.extend(chunk(b"PDAT", &frame(v)));
  }

  let anim = decode_animation(&file, &DecodeOptions::default()).unwrap();
  assert_eq!(anim.kind, AnimKind::SharedHeader);
  assert_eq!(anim.frames.len(), 3);
  assert_eq!(anim.frame_duration(), std::time::Duration::from_millis(100));
  let order: Vec<_> = anim.playback().map(|PlaybackStep { frame, .. }| frame).collect();
  assert_eq!(order, vec![0, 1, 2, 1, 2, 1, 2]);
  // the end frame is held for the repeat delay on both jumps back
  assert_eq!(anim.playback().filter(|s| s.ticks == 36).count(), 2);
}

#[test]
fn test_plain_frame_sequence() {
  let mut file = Vec::new();
  for v in [4, 5] {
    file.extend(chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, (1 << 6) | 5, 2, 0)));
    file.extend(chunk(b"PDAT", &frame(v)));
  }
  let anim = decode_animation(&file, &DecodeOptions::default()).unwrap();
  assert_eq!(anim.frames.len(), 2);
  assert_eq!(anim.frame_interval, 0);
  assert_eq!(anim.playback().count(), 2);
}

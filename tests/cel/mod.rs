use operacel::{
  decode_cel, decode_cel_file, decode_cel_file_with, r8g8b8a8_Srgb, BlendOptions, CelError,
  CelHeader, DecodeOptions, PixelData, StrictOrder,
};
use walkdir::WalkDir;

use super::{
  chunk, ccb_payload, init_logger, packed_8bpp_rows, plut_payload, BGND, CCBPRE, PACKED,
};

#[test]
fn test_decode_cel_file_no_panics() {
  init_logger();
  // every file in the test folder, none of them cel files, shouldn't panic it
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    let _ = decode_cel_file(&v, &DecodeOptions::default());
  }
  // even totally random data should never panic the decoder!
  for _ in 0..10 {
    let v = super::rand_bytes(1024);
    let _ = decode_cel_file(&v, &DecodeOptions::default());
  }
}

#[test]
fn test_decode_cel_random_payloads_no_panics() {
  init_logger();
  for _ in 0..50 {
    let head = super::rand_bytes(72);
    let data = super::rand_bytes(512);
    if let Ok(header) = CelHeader::try_from_payload(&head) {
      if let Ok(image) = decode_cel(&header, None, &data, &DecodeOptions::default()) {
        let _ = image.materialize(&BlendOptions::default());
        let _ = image.to_palmap();
      }
    }
  }
  // random pixel data behind a well formed header with every format
  for bpp_code in 1..=6 {
    for flags in [CCBPRE, CCBPRE | PACKED] {
      for uncoded in [0, 1 << 4] {
        let pre0 = (15 << 6) | uncoded | bpp_code;
        let header = CelHeader::try_from_payload(&ccb_payload(flags, pre0, 16, 0)).unwrap();
        let data = super::rand_bytes(256);
        let image = decode_cel(&header, None, &data, &DecodeOptions::default()).unwrap();
        assert_eq!(image.pixel_count(), 16 * 16);
        image.materialize(&BlendOptions::default()).unwrap();
      }
    }
  }
}

#[test]
fn test_literal_then_repeat_row() {
  let pixels = packed_8bpp_rows(&[&[(1, 2, &[5, 9]), (3, 3, &[7]), (0, 0, &[])]]);
  let mut file = chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, 5, 5, 1));
  file.extend(chunk(b"PDAT", &pixels));
  let decoded = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  assert!(decoded.report.is_clean());
  let image = &decoded.images[0];
  assert_eq!(image.pixels, PixelData::Values(vec![5, 9, 7, 7, 7]));
  assert!((0..5).all(|i| !image.is_transparent(i)));
}

#[test]
fn test_transparent_run() {
  let pixels = packed_8bpp_rows(&[&[(2, 3, &[]), (1, 1, &[4]), (0, 0, &[])]]);
  let mut file = chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, 5, 4, 1));
  file.extend(chunk(b"PDAT", &pixels));
  let decoded = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  let image = &decoded.images[0];
  assert_eq!(image.transparency, Some(vec![true, true, true, false]));
}

#[test]
fn test_black_palette_entry_alpha() {
  let pixels = packed_8bpp_rows(&[&[(1, 2, &[0, 1])]]);
  for (flags, black_alpha) in [(0, 0), (BGND, 255)] {
    let mut file = chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED | flags, 5, 2, 1));
    file.extend(chunk(b"PLUT", &plut_payload(&[0x0000, 0x7FFF])));
    file.extend(chunk(b"PDAT", &pixels));
    let options = DecodeOptions {
      blend: BlendOptions { enabled: false, ..Default::default() },
      ..Default::default()
    };
    let decoded = decode_cel_file(&file, &options).unwrap();
    let bitmap = decoded.images[0].materialize_with(&options).unwrap();
    assert_eq!(bitmap.pixels[0].a, black_alpha);
    // brightness 0 and no blending: the white entry comes through as is
    assert_eq!(bitmap.pixels[1], r8g8b8a8_Srgb { r: 255, g: 255, b: 255, a: 255 });
  }
}

#[test]
fn test_palette_association_choice() {
  // the palette comes after the pixel data
  let pixels = packed_8bpp_rows(&[&[(3, 1, &[1])]]);
  let mut file = chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, 5, 1, 1));
  file.extend(chunk(b"PDAT", &pixels));
  file.extend(chunk(b"PLUT", &plut_payload(&[0, 0x7C00])));
  let nearest = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  assert_eq!(nearest.images[0].palette.as_ref().map(|p| p.len()), Some(2));
  let strict = decode_cel_file_with(&file, &DecodeOptions::default(), &StrictOrder).unwrap();
  assert_eq!(strict.images[0].palette, None);
}

#[test]
fn test_one_bad_unit_does_not_stop_the_rest() {
  init_logger();
  let good = packed_8bpp_rows(&[&[(3, 2, &[1])]]);
  let mut file = chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, 5, 2, 1));
  file.extend(chunk(b"PDAT", &good));
  // bits per pixel code 7 is illegal
  file.extend(chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, 7, 2, 1)));
  file.extend(chunk(b"PDAT", &good));
  file.extend(chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, 5, 2, 1)));
  file.extend(chunk(b"PDAT", &good));
  let decoded = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  assert_eq!(decoded.images.len(), 2);
  assert_eq!(decoded.report.decoded, 2);
  assert_eq!(decoded.report.failed(), 1);
  assert_eq!(decoded.report.failures[0].error, CelError::IllegalBitDepth);
}

#[test]
fn test_truncated_file_still_decodes() {
  init_logger();
  let pixels = packed_8bpp_rows(&[&[(1, 4, &[1, 2, 3, 4])], &[(1, 4, &[5, 6, 7, 8])]]);
  let mut file = chunk(b"CCB ", &ccb_payload(CCBPRE | PACKED, (1 << 6) | 5, 4, 0));
  file.extend(chunk(b"PDAT", &pixels));
  // cut into the second row
  file.truncate(file.len() - 4);
  let decoded = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  let image = &decoded.images[0];
  assert!(image.truncated);
  assert_eq!((image.width, image.height), (4, 2));
  let PixelData::Values(v) = &image.pixels else { panic!() };
  assert_eq!(&v[..5], &[1, 2, 3, 4, 5]);
  // the rest of the cut row stays transparent
  let mask = image.transparency.as_ref().unwrap();
  assert_eq!(&mask[4..], &[false, true, true, true]);
  let bitmap = image.materialize_with(&DecodeOptions::default()).unwrap();
  assert_eq!(bitmap.pixels[4].a, 255);
  assert!(bitmap.pixels[5..].iter().all(|p| p.a == 0));
}

use operacel::{decode_cel_file, BlendOptions, DecodeOptions, PixelData};

use super::{chunk, init_logger, plut_payload};

fn imag_payload(
  w: u32, h: u32, bytes_per_row: u32, bpp: u8, components: u8, hv: u8, order: u8,
) -> Vec<u8> {
  let mut v = Vec::new();
  for x in [w, h, bytes_per_row] {
    v.extend_from_slice(&x.to_be_bytes());
  }
  v.extend_from_slice(&[bpp, components, 1, 0, 0, hv, order, 0]);
  v
}

#[test]
fn test_imag_no_panics() {
  init_logger();
  for _ in 0..10 {
    let mut v = chunk(b"IMAG", &super::rand_bytes(20));
    v.extend(chunk(b"PDAT", &super::rand_bytes(256)));
    let _ = decode_cel_file(&v, &DecodeOptions::default());
  }
}

#[test]
fn test_half_height_image_doubles_rows() {
  let mut file = chunk(b"IMAG", &imag_payload(8, 8, 8, 8, 1, 2, 0));
  file.extend(chunk(b"PLUT", &plut_payload(&[0x7FFF; 32])));
  let pixels: Vec<u8> = (0..32).collect();
  file.extend(chunk(b"PDAT", &pixels));

  let decoded = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  assert!(decoded.report.is_clean());
  let image = &decoded.images[0];
  assert_eq!((image.width, image.height), (8, 8));
  let PixelData::Values(v) = &image.pixels else { panic!() };
  let expected: Vec<u16> = (0..64).map(|i| (i / 16) * 8 + i % 8).collect();
  assert_eq!(v, &expected);
  let bitmap = image.materialize(&BlendOptions::default()).unwrap();
  assert_eq!(bitmap.pixels.len(), 64);
  assert!(bitmap.pixels.iter().all(|p| p.a == 255));
}

#[test]
fn test_pixel_order_blocks() {
  let mut file = chunk(b"IMAG", &imag_payload(4, 2, 0, 16, 3, 0, 1));
  let values: Vec<u8> = (1..=8_u16).flat_map(|v| (v << 10).to_be_bytes()).collect();
  file.extend(chunk(b"PDAT", &values));
  let decoded = decode_cel_file(&file, &DecodeOptions::default()).unwrap();
  let image = &decoded.images[0];
  let PixelData::Rgba(px) = &image.pixels else { panic!() };
  let reds: Vec<u8> = px.iter().map(|p| p.r).collect();
  let expected: Vec<u8> =
    [1_u32, 2, 5, 6, 3, 4, 7, 8].iter().map(|v| (v * 255 / 31) as u8).collect();
  assert_eq!(reds, expected);
}

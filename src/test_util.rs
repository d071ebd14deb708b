//! Builders for hand-made cel data in unit tests.

use alloc::vec::Vec;

#[derive(Debug, Clone)]
pub enum Packet {
  Literal(Vec<u16>),
  Transparent(u32),
  Repeat(u32, u16),
  Eol,
}

#[derive(Debug, Default)]
pub struct BitWriter {
  pub bytes: Vec<u8>,
  bit_len: usize,
}
impl BitWriter {
  pub fn write(&mut self, count: u32, value: u32) {
    for i in (0..count).rev() {
      if self.bit_len % 8 == 0 {
        self.bytes.push(0);
      }
      let bit = ((value >> i) & 1) as u8;
      let last = self.bytes.len() - 1;
      self.bytes[last] |= bit << (7 - (self.bit_len % 8));
      self.bit_len += 1;
    }
  }
  pub fn align_word(&mut self) {
    while self.bit_len % 32 != 0 {
      self.write(1, 0);
    }
  }
}

/// Writes packed rows, filling in each row's offset header.
#[derive(Debug)]
pub struct PackedCelBuilder {
  bpp: u8,
  w: BitWriter,
}
impl PackedCelBuilder {
  pub fn new(bpp: u8) -> Self {
    Self { bpp, w: BitWriter::default() }
  }

  pub fn row(self, packets: &[Packet]) -> Self {
    self.row_padded(packets, 0)
  }

  pub fn row_padded(mut self, packets: &[Packet], extra_words: usize) -> Self {
    let bpp = u32::from(self.bpp);
    let start = self.w.bytes.len();
    let header_bits = if self.bpp >= 8 { 16 } else { 8 };
    self.w.write(header_bits, 0);
    for p in packets {
      match p {
        Packet::Literal(values) => {
          self.w.write(2, 0b01);
          self.w.write(6, values.len() as u32 - 1);
          for v in values {
            self.w.write(bpp, u32::from(*v));
          }
        }
        Packet::Transparent(n) => {
          self.w.write(2, 0b10);
          self.w.write(6, n - 1);
        }
        Packet::Repeat(n, v) => {
          self.w.write(2, 0b11);
          self.w.write(6, n - 1);
          self.w.write(bpp, u32::from(*v));
        }
        Packet::Eol => self.w.write(2, 0b00),
      }
    }
    self.w.align_word();
    for _ in 0..extra_words {
      self.w.write(32, 0);
    }
    while (self.w.bytes.len() - start) / 4 < 2 {
      self.w.write(32, 0);
    }
    let offset = (self.w.bytes.len() - start) / 4 - 2;
    if self.bpp >= 8 {
      self.w.bytes[start] = ((offset >> 8) & 0b11) as u8;
      self.w.bytes[start + 1] = offset as u8;
    } else {
      self.w.bytes[start] = offset as u8;
    }
    self
  }

  pub fn finish(self) -> Vec<u8> {
    self.w.bytes
  }
}

/// A chunk with its 8 byte head.
pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
  let mut v = Vec::new();
  v.extend_from_slice(tag);
  v.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
  v.extend_from_slice(payload);
  v
}

/// A cel header payload with the given flags, control word, preambles and size.
pub fn ccb_payload(
  flags: u32, ppmp: u32, pre0: u32, pre1: u32, width: u32, height: u32,
) -> Vec<u8> {
  let mut words = [0_u32; 18];
  words[1] = flags;
  words[13] = ppmp;
  words[14] = pre0;
  words[15] = pre1;
  words[16] = width;
  words[17] = height;
  words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

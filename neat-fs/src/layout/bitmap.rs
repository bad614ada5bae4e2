/// A bit vector stored inside a block, one bit per allocatable unit.
///
/// Bit `i` lives in byte `offset + i / 8` at position `i % 8`, lowest bit
/// first. A set bit means "in use".
#[derive(Debug, Clone, Copy)]
pub struct Bitmap {
    /// Byte offset of the bitmap inside its block
    offset: usize,
    /// Number of tracked units
    bits: usize,
}

impl Bitmap {
    #[inline]
    pub const fn new(offset: usize, bits: usize) -> Self {
        Self { offset, bits }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bits
    }

    /// Bytes taken by the bitmap.
    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.bits.div_ceil(8)
    }

    /// Offset of the first byte after the bitmap.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len_bytes()
    }

    pub fn get(&self, block: &[u8], index: usize) -> bool {
        debug_assert!(index < self.bits);
        block[self.offset + index / 8] & (1 << (index % 8)) != 0
    }

    pub fn set(&self, block: &mut [u8], index: usize, used: bool) {
        debug_assert!(index < self.bits);
        let byte = &mut block[self.offset + index / 8];
        if used {
            *byte |= 1 << (index % 8);
        } else {
            *byte &= !(1 << (index % 8));
        }
    }

    /// First clear bit at or after `from`, scanning linearly.
    pub fn first_free(&self, block: &[u8], from: usize) -> Option<usize> {
        let region = &block[self.offset..self.end()];

        region
            .iter()
            .enumerate()
            .skip(from / 8)
            .find_map(|(byte_index, &bits)| {
                // bits below `from` count as taken
                let bits = if byte_index == from / 8 {
                    bits | ((1u16 << (from % 8)) - 1) as u8
                } else {
                    bits
                };
                (bits != u8::MAX).then(|| byte_index * 8 + bits.trailing_ones() as usize)
            })
            .filter(|&index| index < self.bits)
    }

    pub fn count_used(&self, block: &[u8]) -> usize {
        (0..self.bits).filter(|&index| self.get(block, index)).count()
    }
}

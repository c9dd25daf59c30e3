//! Forward-only reader over a block of 16-bit registers

use thiserror::Error;

use super::schema::Block;

/// Errors raised while walking a register block.
///
/// Both variants mean the decode plan and the block disagree about the
/// layout, so the whole block is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("register {offset} + {requested} word(s) is past the end of a {len}-word block")]
    OutOfRange {
        offset: usize,
        requested: usize,
        len: usize,
    },
    #[error("{block} block must be {expected} words, got {actual}")]
    BlockLength {
        block: Block,
        expected: usize,
        actual: usize,
    },
}

/// Registers fetched in one read, starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    address: u16,
    words: Vec<u16>,
}

impl RawBlock {
    pub fn new(address: u16, words: Vec<u16>) -> Self {
        Self { address, words }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn cursor(&self) -> RegisterCursor<'_> {
        RegisterCursor::new(&self.words)
    }
}

/// Primitive field encodings found in the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U16,
    I16,
    /// Two words, most significant first.
    U32,
}

impl FieldKind {
    pub fn words(self) -> usize {
        match self {
            FieldKind::U16 | FieldKind::I16 => 1,
            FieldKind::U32 => 2,
        }
    }
}

/// Sequential decoder with a single advancing offset.
#[derive(Debug)]
pub struct RegisterCursor<'a> {
    words: &'a [u16],
    offset: usize,
}

impl<'a> RegisterCursor<'a> {
    pub fn new(words: &'a [u16]) -> Self {
        Self { words, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.offset
    }

    fn take(&mut self, count: usize) -> Result<&'a [u16], DecodeError> {
        if count > self.remaining() {
            return Err(DecodeError::OutOfRange {
                offset: self.offset,
                requested: count,
                len: self.words.len(),
            });
        }
        let words = self.words;
        let slice = &words[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let pair = self.take(2)?;
        Ok((pair[0] as u32) << 16 | pair[1] as u32)
    }

    /// Reads one field of the given kind, widened so every kind fits.
    pub fn read(&mut self, kind: FieldKind) -> Result<i64, DecodeError> {
        let words = self.take(kind.words())?;
        Ok(match kind {
            FieldKind::U16 => i64::from(words[0]),
            FieldKind::I16 => i64::from(words[0] as i16),
            FieldKind::U32 => i64::from((words[0] as u32) << 16 | words[1] as u32),
        })
    }

    /// Steps over reserved registers.
    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.take(count).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_until_exhausted() {
        let block = RawBlock::new(0, vec![1, 2, 3]);
        let mut cursor = block.cursor();

        assert_eq!(cursor.read_u16(), Ok(1));
        assert_eq!(cursor.read_u16(), Ok(2));
        assert_eq!(cursor.read_u16(), Ok(3));
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(
            cursor.read_u16(),
            Err(DecodeError::OutOfRange {
                offset: 3,
                requested: 1,
                len: 3
            })
        );
    }

    #[test]
    fn test_read_i16_twos_complement() {
        let mut cursor = RegisterCursor::new(&[0xFFFE, 0x8000, 0x7FFF]);

        assert_eq!(cursor.read_i16(), Ok(-2));
        assert_eq!(cursor.read_i16(), Ok(i16::MIN));
        assert_eq!(cursor.read_i16(), Ok(i16::MAX));
    }

    #[test]
    fn test_read_u32_high_word_first() {
        let mut cursor = RegisterCursor::new(&[0x0001, 0x0002, 0xFFFF, 0xFFFF]);

        assert_eq!(cursor.read_u32(), Ok(65538));
        assert_eq!(cursor.read_u32(), Ok(u32::MAX));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_read_u32_needs_two_words() {
        let mut cursor = RegisterCursor::new(&[7, 8, 9]);
        cursor.skip(2).unwrap();

        assert!(matches!(
            cursor.read_u32(),
            Err(DecodeError::OutOfRange { requested: 2, .. })
        ));
        // a failed read does not move the offset
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_u16(), Ok(9));
    }

    #[test]
    fn test_skip() {
        let mut cursor = RegisterCursor::new(&[10, 20, 30, 40]);

        cursor.skip(0).unwrap();
        cursor.skip(3).unwrap();
        assert_eq!(cursor.read_u16(), Ok(40));
        assert!(cursor.skip(1).is_err());
    }

    #[test]
    fn test_read_by_kind() {
        let mut cursor = RegisterCursor::new(&[0xFFFF, 0xFFFF, 0x0001, 0x0000]);

        assert_eq!(cursor.read(FieldKind::U16), Ok(65535));
        assert_eq!(cursor.read(FieldKind::I16), Ok(-1));
        assert_eq!(cursor.read(FieldKind::U32), Ok(65536));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_read_by_kind_checks_width() {
        let mut cursor = RegisterCursor::new(&[0x1234]);

        assert_eq!(
            cursor.read(FieldKind::U32),
            Err(DecodeError::OutOfRange {
                offset: 0,
                requested: 2,
                len: 1
            })
        );
        assert_eq!(cursor.read(FieldKind::U16), Ok(0x1234));
    }
}

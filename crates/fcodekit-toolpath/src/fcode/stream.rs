//! Seekable output with length back-patching
//!
//! Blocks whose size is unknown up front are framed by reserving a zeroed u32,
//! writing the payload, then seeking back to store the real length.

use std::io::{self, Seek, SeekFrom, Write};

use fcodekit_core::FcodeError;

use super::checksum::Crc32;

/// Position of a reserved u32 placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    offset: u64,
}

impl Marker {
    /// Byte offset of the placeholder in the stream
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Output stream for container blocks
#[derive(Debug)]
pub struct FcodeStream<W: Write + Seek> {
    inner: W,
}

impl<W: Write + Seek> FcodeStream<W> {
    /// Wrap a destination, rejecting one that cannot report its position
    pub fn new(mut inner: W) -> Result<Self, FcodeError> {
        inner.stream_position().map_err(FcodeError::NotSeekable)?;
        Ok(Self { inner })
    }

    pub fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    /// Append bytes, folding them into `crc` when given
    pub fn write_bytes(&mut self, bytes: &[u8], crc: Option<&mut Crc32>) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        if let Some(crc) = crc {
            crc.update(bytes);
        }
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32, crc: Option<&mut Crc32>) -> io::Result<()> {
        self.write_bytes(&value.to_le_bytes(), crc)
    }

    /// Append a block length, refusing lengths that do not fit a u32
    pub fn write_length(&mut self, length: usize) -> io::Result<()> {
        self.write_u32(block_length(length as u64)?, None)
    }

    /// Append a u32 length followed by the bytes
    pub fn write_length_prefixed(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_length(bytes.len())?;
        self.write_bytes(bytes, None)
    }

    /// Write a zeroed u32 to be patched later
    pub fn reserve_placeholder(&mut self) -> io::Result<Marker> {
        let offset = self.inner.stream_position()?;
        self.inner.write_all(&[0; 4])?;
        Ok(Marker { offset })
    }

    /// Overwrite bytes at `marker`, then return to the end of the stream
    pub fn write_at(&mut self, marker: Marker, bytes: &[u8]) -> io::Result<()> {
        let end = self.inner.stream_position()?;
        self.inner.seek(SeekFrom::Start(marker.offset))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    /// Store the number of bytes written since `marker`'s placeholder
    pub fn patch_length(&mut self, marker: Marker) -> io::Result<u32> {
        let end = self.inner.stream_position()?;
        let length = block_length(end.saturating_sub(marker.offset + 4))?;
        self.write_at(marker, &length.to_le_bytes())?;
        Ok(length)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn block_length(length: u64) -> io::Result<u32> {
    u32::try_from(length)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "block exceeds 4 GiB"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_placeholder_patch() {
        let mut stream = FcodeStream::new(Cursor::new(Vec::new())).unwrap();
        stream.write_bytes(b"AB", None).unwrap();
        let marker = stream.reserve_placeholder().unwrap();
        assert_eq!(marker.offset(), 2);
        stream.write_bytes(b"hello", None).unwrap();
        assert_eq!(stream.patch_length(marker).unwrap(), 5);
        stream.write_bytes(b"!", None).unwrap();

        let bytes = stream.into_inner().into_inner();
        assert_eq!(&bytes[..2], b"AB");
        assert_eq!(&bytes[2..6], &5u32.to_le_bytes());
        assert_eq!(&bytes[6..], b"hello!");
    }

    #[test]
    fn test_checksum_follows_writes() {
        let mut stream = FcodeStream::new(Cursor::new(Vec::new())).unwrap();
        let mut crc = Crc32::new();
        stream.write_bytes(b"1234", Some(&mut crc)).unwrap();
        stream.write_bytes(b"56789", Some(&mut crc)).unwrap();
        stream.write_u32(7, None).unwrap();
        assert_eq!(crc.value(), 0xCBF4_3926);
    }

    #[test]
    fn test_length_prefixed() {
        let mut stream = FcodeStream::new(Cursor::new(Vec::new())).unwrap();
        stream.write_length_prefixed(b"png").unwrap();
        let bytes = stream.into_inner().into_inner();
        assert_eq!(bytes, [3, 0, 0, 0, b'p', b'n', b'g']);
    }

    #[test]
    fn test_oversize_length_is_refused() {
        assert_eq!(block_length(5).unwrap(), 5);
        assert_eq!(block_length(u32::MAX as u64).unwrap(), u32::MAX);
        let err = block_length(u32::MAX as u64 + 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut stream = FcodeStream::new(Cursor::new(Vec::new())).unwrap();
        stream.write_length(9).unwrap();
        assert_eq!(stream.into_inner().into_inner(), 9u32.to_le_bytes());
    }
}

//! Length-prefixed framing for byte streams
//!
//! Each payload is preceded by its length as a little-endian `u32`.

use std::io::{self, Read, Write};

/// Delivers encoded payloads to one connected tool
pub trait Transceiver {
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;
}

/// Read one frame, refusing frames longer than `limit` bytes.
pub fn read_frame<R: Read>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the limit of {limit} bytes"),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Write one frame.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// A [`Transceiver`] that frames payloads onto a byte stream
#[derive(Debug)]
pub struct FramedTransceiver<W> {
    writer: W,
}

impl<W: Write> FramedTransceiver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transceiver for FramedTransceiver<W> {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        write_frame(&mut self.writer, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frames_read_back_in_order() {
        let mut transceiver = FramedTransceiver::new(Vec::new());
        transceiver.send(b"first").unwrap();
        transceiver.send(b"").unwrap();
        transceiver.send(b"third").unwrap();

        let mut reader = Cursor::new(transceiver.into_inner());
        assert_eq!(read_frame(&mut reader, 64).unwrap(), b"first");
        assert_eq!(read_frame(&mut reader, 64).unwrap(), b"");
        assert_eq!(read_frame(&mut reader, 64).unwrap(), b"third");
        assert!(read_frame(&mut reader, 64).is_err());
    }

    #[test]
    fn test_oversized_frame_is_refused() {
        let mut bytes = Vec::new();
        write_frame(&mut bytes, &[0u8; 32]).unwrap();
        let error = read_frame(&mut Cursor::new(bytes), 16).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_frame() {
        let mut bytes = Vec::new();
        write_frame(&mut bytes, b"payload").unwrap();
        bytes.truncate(6);
        let error = read_frame(&mut Cursor::new(bytes), 64).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }
}

//! Frame reader for parsing channel messages from a stream

use tokio::io::AsyncReadExt;

use super::{Frame, FrameError, MAX_FRAME_PAYLOAD, TAG_BINARY, TAG_TEXT};

/// Reads frames from an async reader
pub struct FrameReader<R> {
    reader: R,
}

impl<R> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: AsyncReadExt + Unpin> FrameReader<R> {
    /// Read the next frame from the stream
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed between frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is malformed, the stream closes
    /// mid-frame, or an I/O error occurs.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let mut tag = [0u8; 1];
        if self.reader.read(&mut tag).await? == 0 {
            return Ok(None);
        }

        let len = self.reader.read_u32().await? as usize;
        if len > MAX_FRAME_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(len));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).await?;

        match tag[0] {
            TAG_TEXT => String::from_utf8(payload)
                .map(|text| Some(Frame::Text(text)))
                .map_err(|_| FrameError::InvalidUtf8),
            TAG_BINARY => Ok(Some(Frame::Binary(payload))),
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::FrameWriter;
    use std::io::Cursor;

    async fn encode(frames: &[Frame]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(Cursor::new(&mut buffer));
            for frame in frames {
                writer.write_frame(frame).await.unwrap();
            }
        }
        buffer
    }

    #[tokio::test]
    async fn test_read_sequence_preserves_order() {
        let frames = vec![
            Frame::Text("{\"type\":\"meta\"}".to_string()),
            Frame::Binary(vec![1, 2, 3]),
            Frame::Binary(vec![4, 5]),
            Frame::Text("{\"type\":\"done\"}".to_string()),
        ];
        let bytes = encode(&frames).await;

        let mut reader = FrameReader::new(Cursor::new(bytes));
        for expected in &frames {
            assert_eq!(reader.read_frame().await.unwrap().as_ref(), Some(expected));
        }
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clean_eof() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        assert_eq!(reader.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let mut reader = FrameReader::new(Cursor::new(vec![TAG_BINARY, 0, 0, 0, 10, 1, 2]));
        assert_eq!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn test_unknown_tag() {
        let mut reader = FrameReader::new(Cursor::new(vec![7, 0, 0, 0, 0]));
        assert_eq!(reader.read_frame().await, Err(FrameError::UnknownTag(7)));
    }

    #[tokio::test]
    async fn test_oversized_length_rejected_before_allocation() {
        let mut reader = FrameReader::new(Cursor::new(vec![TAG_BINARY, 0xff, 0xff, 0xff, 0xff]));
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::PayloadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_text() {
        let mut reader = FrameReader::new(Cursor::new(vec![TAG_TEXT, 0, 0, 0, 2, 0xff, 0xfe]));
        assert_eq!(reader.read_frame().await, Err(FrameError::InvalidUtf8));
    }
}

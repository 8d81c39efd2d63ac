//! Frame writer for sending channel messages to a stream

use tokio::io::AsyncWriteExt;

use super::{Frame, FrameError, HEADER_SIZE, MAX_FRAME_PAYLOAD, TAG_BINARY, TAG_TEXT};

/// Writes frames to an async writer
pub struct FrameWriter<W> {
    writer: W,
}

impl<W> FrameWriter<W> {
    /// Create a new frame writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: AsyncWriteExt + Unpin> FrameWriter<W> {
    /// Write a frame to the stream and flush it
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds [`MAX_FRAME_PAYLOAD`] or an
    /// I/O error occurs.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), FrameError> {
        let (tag, payload) = match frame {
            Frame::Text(text) => (TAG_TEXT, text.as_bytes()),
            Frame::Binary(bytes) => (TAG_BINARY, bytes.as_slice()),
        };
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(FrameError::PayloadTooLarge(payload.len()));
        }

        let mut header = [0u8; HEADER_SIZE];
        header[0] = tag;
        header[1..].copy_from_slice(&(payload.len() as u32).to_be_bytes());
        self.writer.write_all(&header).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shut down the write half of the stream
    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

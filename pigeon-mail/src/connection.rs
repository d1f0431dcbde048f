use pigeon_common::tracing;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    error::FrameError,
    frame::{FRAME_LIMIT, Framed, Framer},
};

/// Size of a single read from the stream
const READ_SIZE: usize = 4096;

/// A client stream with frame extraction on the read side
pub struct Connection<Stream: AsyncRead + AsyncWrite + Unpin + Send> {
    stream: Stream,
    framer: Framer,
}

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send> Connection<Stream> {
    pub(crate) fn new(stream: Stream) -> Self {
        Self {
            stream,
            framer: Framer::new(),
        }
    }

    /// Read the next frame from the client.
    ///
    /// Returns `Ok(None)` once the client has closed its side of the stream.
    ///
    /// # Errors
    /// - [`FrameError::Io`] if reading fails
    /// - [`FrameError::TooLarge`] if the frame was discarded for being too large
    pub(crate) async fn receive(&mut self) -> Result<Option<String>, FrameError> {
        let mut received = [0; READ_SIZE];

        loop {
            match self.framer.next_frame() {
                Some(Framed::Frame(payload)) => return Ok(Some(payload)),
                Some(Framed::Oversized) => return Err(FrameError::TooLarge { limit: FRAME_LIMIT }),
                None => {}
            }

            let bytes_read = self.stream.read(&mut received).await?;
            if bytes_read == 0 {
                if self.framer.in_frame() {
                    tracing::debug!("Client closed the stream in the middle of a frame");
                }
                return Ok(None);
            }

            self.framer.push(&received[..bytes_read]);
        }
    }

    /// Write one response in a single transmission.
    ///
    /// # Errors
    /// If writing to the stream fails
    pub(crate) async fn send(&mut self, response: &str) -> std::io::Result<()> {
        self.stream.write_all(response.as_bytes()).await?;
        self.stream.flush().await
    }

    /// Shut down the write side of the stream, ignoring failures
    pub(crate) async fn shutdown(&mut self) {
        if let Err(err) = self.stream.shutdown().await {
            tracing::debug!("Error shutting down connection: {err}");
        }
    }
}

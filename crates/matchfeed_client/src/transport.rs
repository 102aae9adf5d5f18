//! Frame transport over byte streams.
//!
//! Frames travel as text terminated by a NUL byte. The reader splits the
//! inbound stream on that byte and decodes each chunk; the writer appends it.

use crate::command::Endpoint;
use crate::error::{ClientError, ClientResult};
use matchfeed_protocol::{ClientFrame, RawFrame, FRAME_TERMINATOR};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Reads NUL-terminated frames.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_frame_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a byte stream; frames longer than `max_frame_len` are rejected.
    pub fn new(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
            max_frame_len,
        }
    }

    /// Reads the next frame, or `None` once the peer closed the stream.
    ///
    /// Chunks holding only whitespace between terminators are skipped.
    pub async fn read_frame(&mut self) -> ClientResult<Option<RawFrame>> {
        loop {
            self.buf.clear();
            let limit = self.max_frame_len as u64 + 1;
            let read = (&mut self.inner)
                .take(limit)
                .read_until(FRAME_TERMINATOR, &mut self.buf)
                .await?;
            if read == 0 {
                return Ok(None);
            }

            if self.buf.last() != Some(&FRAME_TERMINATOR) {
                if read as u64 >= limit {
                    return Err(ClientError::transport(format!(
                        "frame exceeds {} bytes",
                        self.max_frame_len
                    )));
                }
                return Err(ClientError::transport("connection closed mid-frame"));
            }

            let text = String::from_utf8_lossy(&self.buf);
            if text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).is_empty() {
                continue;
            }
            trace!(bytes = read, "frame received");
            return Ok(Some(RawFrame::decode(&text)?));
        }
    }
}

/// Writes NUL-terminated frames.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes one untyped frame and flushes.
    pub async fn write_raw(&mut self, frame: &RawFrame) -> ClientResult<()> {
        let mut bytes = frame.encode().into_bytes();
        bytes.push(FRAME_TERMINATOR);
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        trace!(command = %frame.command, bytes = bytes.len(), "frame sent");
        Ok(())
    }

    /// Writes one client frame and flushes.
    pub async fn write_frame(&mut self, frame: &ClientFrame) -> ClientResult<()> {
        self.write_raw(&frame.to_raw()).await
    }

    /// Shuts the write side down.
    pub async fn shutdown(&mut self) -> ClientResult<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

/// Opens a TCP connection to `endpoint`.
pub async fn connect(
    endpoint: &Endpoint,
    max_frame_len: usize,
) -> ClientResult<(FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>)> {
    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| ClientError::transport(format!("could not connect to {endpoint}: {e}")))?;
    stream.set_nodelay(true)?;
    debug!(endpoint = %endpoint, "connected");

    let (read, write) = stream.into_split();
    Ok((FrameReader::new(read, max_frame_len), FrameWriter::new(write)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn splits_frames_on_terminator() {
        let input: &[u8] = b"CONNECTED\nversion:1.2\n\n\0\nRECEIPT\nreceipt-id:3\n\n\0";
        let mut reader = FrameReader::new(input, 1024);

        let first = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(first.command, "CONNECTED");
        assert_eq!(first.header("version"), Some("1.2"));

        let second = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(second.command, "RECEIPT");
        assert_eq!(second.header("receipt-id"), Some("3"));

        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn skips_blank_chunks() {
        let input: &[u8] = b"\n\0\n\0MESSAGE\ndestination:/a_b\n\nbody\0";
        let mut reader = FrameReader::new(input, 1024);

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame.body, "body");
    }

    #[tokio::test]
    async fn oversized_frame_is_a_transport_error() {
        let input = vec![b'x'; 64];
        let mut reader = FrameReader::new(input.as_slice(), 16);

        let err = reader.read_frame().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn truncated_frame_is_a_transport_error() {
        let input: &[u8] = b"RECEIPT\nreceipt-id:1\n";
        let mut reader = FrameReader::new(input, 1024);
        assert!(matches!(reader.read_frame().await, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn writer_appends_terminator() {
        let mut out = Vec::new();
        let mut writer = FrameWriter::new(&mut out);
        writer
            .write_frame(&ClientFrame::Disconnect { receipt: 7 })
            .await
            .unwrap();

        assert_eq!(out, b"DISCONNECT\nreceipt:7\n\n\0");
    }
}

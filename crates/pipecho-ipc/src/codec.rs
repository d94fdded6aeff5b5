//! Newline-delimited text framing over a byte stream.

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};

use crate::error::IpcError;

/// Longest line accepted from the peer, terminator excluded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A byte stream read and written one text line at a time.
///
/// Owns both halves of the stream; dropping it closes the session.
pub struct LineStream<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    buf: Vec<u8>,
}

impl<S> LineStream<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read),
            writer: write,
            buf: Vec::new(),
        }
    }

    /// Read the next line with its `\n` or `\r\n` terminator removed.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream. A final line
    /// without a terminator is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::LineTooLong`] or [`IpcError::InvalidUtf8`] for
    /// malformed input, or the underlying I/O error.
    pub async fn read_line(&mut self) -> Result<Option<String>, IpcError> {
        self.buf.clear();

        // Room for the longest line plus "\r\n".
        let limit = (MAX_LINE_BYTES + 2) as u64;
        let n = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        if self.buf.len() > MAX_LINE_BYTES {
            return Err(IpcError::LineTooLong(MAX_LINE_BYTES));
        }

        String::from_utf8(std::mem::take(&mut self.buf))
            .map(Some)
            .map_err(|_| IpcError::InvalidUtf8)
    }

    /// Write one line and flush it to the peer.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');

        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

//! Line framing shared by the distribution and signing protocols.
//!
//! Every message is a single line terminated by `\n`. Structured messages are
//! JSON documents; byte strings inside them are standard base64.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest request line accepted from a peer, newline included.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Longest JSON message line, newline included. Certificate chains travel as
/// base64 inside a single message, so this is larger than [`MAX_LINE_LEN`].
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Errors raised while framing messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The underlying stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent more than `limit` bytes without a newline.
    #[error("line exceeds {limit} bytes")]
    LineTooLong {
        /// The limit that was exceeded.
        limit: usize,
    },

    /// The stream ended in the middle of a line.
    #[error("stream ended mid-line")]
    Truncated,

    /// The line was not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// The line did not decode into the expected message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Read one line, without its terminator.
///
/// Returns `Ok(None)` on a clean end of stream with no pending data.
///
/// # Errors
///
/// Returns an error on IO failure, an over-long line, invalid UTF-8, or a
/// stream that ends before the newline.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    read_bounded_line(reader, MAX_LINE_LEN).await
}

async fn read_bounded_line<R>(reader: &mut R, max_len: usize) -> Result<Option<String>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = max_len as u64;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') {
        return Err(if n as u64 >= limit {
            CodecError::LineTooLong { limit: max_len }
        } else {
            CodecError::Truncated
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| CodecError::InvalidUtf8)
}

/// Write `line` followed by a newline and flush.
///
/// # Errors
///
/// Returns an error if the write or flush fails.
pub async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(line.len() + 1);
    frame.extend_from_slice(line.as_bytes());
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one JSON message of at most [`MAX_MESSAGE_LEN`] bytes. `Ok(None)`
/// means the peer closed cleanly.
///
/// # Errors
///
/// Returns an error if the line cannot be read or decoded.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, CodecError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    match read_bounded_line(reader, MAX_MESSAGE_LEN).await? {
        Some(line) => Ok(Some(serde_json::from_str(&line)?)),
        None => Ok(None),
    }
}

/// Serialize `message` as one JSON line and write it.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = serde_json::to_string(message)?;
    write_line(writer, &line).await
}

/// Serde adapters for byte strings carried as base64 text.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize bytes from a base64 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }

    /// The same adapters for a list of byte strings.
    pub mod list {
        use super::STANDARD;
        use base64::Engine;
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize a list of byte strings as base64 strings.
        pub fn serialize<S, B>(items: &[B], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            B: AsRef<[u8]>,
        {
            let mut seq = serializer.serialize_seq(Some(items.len()))?;
            for item in items {
                seq.serialize_element(&STANDARD.encode(item.as_ref()))?;
            }
            seq.end()
        }

        /// Deserialize a list of base64 strings into byte strings.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let items = Vec::<String>::deserialize(deserializer)?;
            items
                .into_iter()
                .map(|item| STANDARD.decode(item).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}

//! Frame codec for streaming [`ClientMessage`]s from an instrumented program.
//!
//! Each frame is a big-endian `u32` byte length followed by a facet-json body.

use std::fmt;

use linetrace_types::ClientMessage;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Frames larger than this are treated as a corrupt stream.
pub const MAX_FRAME_BYTES: usize = 128 * 1024 * 1024;

#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    TooLarge(usize),
    Encode(String),
    Decode(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "frame io: {e}"),
            Self::TooLarge(len) => write!(f, "frame too large: {len} bytes"),
            Self::Encode(e) => write!(f, "encode frame: {e}"),
            Self::Decode(e) => write!(f, "decode frame: {e}"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Encodes one message as a complete frame (length prefix included).
pub fn encode_frame(msg: &ClientMessage) -> Result<Vec<u8>, FrameError> {
    let body = facet_json::to_vec(msg).map_err(|e| FrameError::Encode(e.to_string()))?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(body.len()));
    }
    let len = u32::try_from(body.len()).map_err(|_| FrameError::TooLarge(body.len()))?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Writes one message and flushes. Returns the body length.
pub async fn write_frame<W>(writer: &mut W, msg: &ClientMessage) -> Result<usize, FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(frame.len() - 4)
}

/// Reads one message. `Ok(None)` means the stream ended between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<ClientMessage>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    debug!(frame_len = len, "read client frame");

    facet_json::from_slice::<ClientMessage>(&body)
        .map(Some)
        .map_err(|e| FrameError::Decode(e.to_string()))
}

/// Spawns a task that decodes frames from `reader` into a message channel.
///
/// A read or decode failure is forwarded as a final [`ClientMessage::Error`]
/// and closes the channel. The task also stops once the receiver is dropped.
pub fn spawn_frame_reader<R>(mut reader: R, capacity: usize) -> mpsc::Receiver<ClientMessage>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        loop {
            match read_frame(&mut reader).await {
                Ok(Some(msg)) => {
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(%e, "client frame stream failed");
                    let _ = tx.send(ClientMessage::Error(e.to_string())).await;
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use linetrace_types::{FileDescriptor, FilesData, LineMsg};

    fn line(file_index: usize, debug_index: usize, value: i64) -> LineMsg {
        LineMsg {
            file_index,
            debug_index,
            offset: 10 * debug_index,
            item: value.into(),
        }
    }

    #[tokio::test]
    async fn frames_stream_through_a_duplex_pipe() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut rx = spawn_frame_reader(server, 8);

        let files = FilesData {
            files: vec![FileDescriptor {
                file_index: 0,
                filename: "main.go".to_string(),
                file_size: 100,
                file_hash: vec![1, 2, 3],
                debug_len: 3,
            }],
        };
        write_frame(&mut client, &ClientMessage::connected()).await.unwrap();
        write_frame(&mut client, &ClientMessage::FilesData(files.clone()))
            .await
            .unwrap();
        write_frame(
            &mut client,
            &ClientMessage::Lines(vec![line(0, 0, 1), line(0, 2, 2)]),
        )
        .await
        .unwrap();
        drop(client);

        assert!(matches!(rx.recv().await, Some(ClientMessage::Status(s)) if s == "connected"));
        match rx.recv().await {
            Some(ClientMessage::FilesData(got)) => assert_eq!(got, files),
            other => panic!("expected files data, got {other:?}"),
        }
        match rx.recv().await {
            Some(ClientMessage::Lines(lines)) => {
                let slots: Vec<_> = lines.iter().map(|l| (l.file_index, l.debug_index)).collect();
                assert_eq!(slots, vec![(0, 0), (0, 2)]);
            }
            other => panic!("expected a batch, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let len = (MAX_FRAME_BYTES as u32) + 1;
        let mut bytes: &[u8] = &len.to_be_bytes();
        let err = read_frame(&mut bytes).await.expect_err("must reject");
        assert!(matches!(err, FrameError::TooLarge(got) if got == MAX_FRAME_BYTES + 1));
    }

    #[tokio::test]
    async fn garbage_body_becomes_a_terminal_error_message() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut rx = spawn_frame_reader(server, 2);

        let body = b"{not json";
        client
            .write_all(&(body.len() as u32).to_be_bytes())
            .await
            .unwrap();
        client.write_all(body).await.unwrap();

        assert!(matches!(rx.recv().await, Some(ClientMessage::Error(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn truncated_body_is_an_io_error() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(b"{\"x\"");
        let mut reader: &[u8] = &bytes;
        let err = read_frame(&mut reader).await.expect_err("must fail");
        assert!(matches!(err, FrameError::Io(_)));
    }
}

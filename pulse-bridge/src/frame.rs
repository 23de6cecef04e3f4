use std::io;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::Envelope;

/// Largest envelope a companion is expected to accept.
pub const DEFAULT_MAX_FRAME_BYTES: u32 = 2_000_000;

const PREFIX_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to encode bridge message: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode bridge message: {0}")]
    Decode(#[source] postcard::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: u32 },
    #[error("peer closed the connection")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Reads and writes envelopes as a big-endian `u32` length followed by the
/// postcard body. Both directions enforce the same size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_bytes: u32,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameCodec {
    pub fn new(max_bytes: u32) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u32 {
        self.max_bytes
    }

    /// Encodes `envelope` with its length prefix and sends it in one write.
    pub async fn write<W>(&self, w: &mut W, envelope: &Envelope) -> Result<(), FrameError>
    where
        W: AsyncWriteExt + Unpin,
    {
        let mut frame = postcard::to_extend(envelope, vec![0u8; PREFIX_LEN])
            .map_err(FrameError::Encode)?;

        let len = frame.len() - PREFIX_LEN;
        let prefix = self.checked_len(len)?.to_be_bytes();
        frame[..PREFIX_LEN].copy_from_slice(&prefix);

        w.write_all(&frame).await?;
        w.flush().await?;

        Ok(())
    }

    /// A clean EOF before the length prefix is reported as [`FrameError::Closed`].
    pub async fn read<R>(&self, r: &mut R) -> Result<Envelope, FrameError>
    where
        R: AsyncReadExt + Unpin,
    {
        let len = match r.read_u32().await {
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(FrameError::Closed),
            Err(e) => return Err(e.into()),
        };
        let len = self.checked_len(len as usize)?;

        let mut body = vec![0u8; len as usize];
        r.read_exact(&mut body).await?;

        postcard::from_bytes(&body).map_err(FrameError::Decode)
    }

    fn checked_len(&self, len: usize) -> Result<u32, FrameError> {
        let too_large = FrameError::TooLarge {
            len,
            max: self.max_bytes,
        };

        match u32::try_from(len) {
            Ok(len) if len <= self.max_bytes => Ok(len),
            _ => Err(too_large),
        }
    }
}

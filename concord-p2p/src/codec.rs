//! Wire framing: a 4-byte big-endian length followed by the bincode payload.

use concord_common::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetworkError;

/// Frames above this size are refused on both sides.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub fn encode(message: &Message) -> Result<Vec<u8>, NetworkError> {
    let bytes = bincode::serialize(message)?;
    if bytes.len() > MAX_FRAME_LEN {
        return Err(NetworkError::FrameTooLarge(bytes.len()));
    }
    let len = bytes.len() as u32;

    let mut frame = Vec::with_capacity(4 + bytes.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&bytes);
    Ok(frame)
}

pub async fn write_frame<T>(io: &mut T, message: &Message) -> Result<(), NetworkError>
where
    T: AsyncWrite + Unpin + Send,
{
    let frame = encode(message)?;
    io.write_all(&frame).await?;
    io.flush().await?;
    Ok(())
}

pub async fn read_frame<T>(io: &mut T) -> Result<Message, NetworkError>
where
    T: AsyncRead + Unpin + Send,
{
    let mut len_buf = [0u8; 4];
    io.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NetworkError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf).await?;

    Ok(bincode::deserialize(&buf)?)
}

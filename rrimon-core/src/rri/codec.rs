//! Length-prefixed RRI framing: a 4-byte big-endian payload length followed
//! by the UTF-8 payload.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RriError};

pub const MAX_FRAME_SIZE: usize = 1024 * 1024; // 1MB

pub async fn write_frame<W>(writer: &mut W, payload: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len as usize <= MAX_FRAME_SIZE)
        .ok_or_else(|| RriError::Protocol(format!("message too large: {} bytes", payload.len())))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len == 0 {
        return Err(RriError::Protocol("empty message".to_string()));
    }
    if len > MAX_FRAME_SIZE {
        return Err(RriError::Protocol(format!("message too large: {} bytes", len)));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    String::from_utf8(payload)
        .map_err(|e| RriError::Protocol(format!("message is not valid UTF-8: {}", e)))
}

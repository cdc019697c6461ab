//! Wire format shared by the TCP server and the CLI.
//!
//! Request:  `[OpCode (1b)][Length u32 LE (4b)][JSON body]`
//! Response: `[Status (1b)][Length u32 LE (4b)][JSON body]`
//!
//! An error response carries an [`ErrorBody`].

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::LedgerError;
use crate::model::RecordId;

// --- OpCodes ---
pub const OP_SUBMIT_THOUGHT: u8    = 0x01;
pub const OP_SUBMIT_DREAM: u8      = 0x02;
pub const OP_GET_THOUGHT: u8       = 0x03;
pub const OP_GET_DREAM: u8         = 0x04;
pub const OP_USER_THOUGHTS: u8     = 0x05;
pub const OP_USER_DREAMS: u8       = 0x06;
pub const OP_CATEGORY_THOUGHTS: u8 = 0x07;
pub const OP_DELETE_THOUGHT: u8    = 0x08;
pub const OP_ANALYZE_THOUGHTS: u8  = 0x09;
pub const OP_ANALYZE_DREAMS: u8    = 0x0A;

// --- Status ---
pub const STATUS_ERR: u8 = 0x00;
pub const STATUS_OK: u8  = 0x01;

/// Largest request body the server will accept.
pub const MAX_FRAME: usize = 65536;

/// Largest response body. Records and ID lists outgrow the request that
/// produced them, so responses get more room.
pub const MAX_RESPONSE: usize = 16 * 1024 * 1024;

pub const CODE_BAD_REQUEST: &str = "bad_request";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitThought {
    pub author: String,
    pub content: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitDream {
    pub dreamer: String,
    pub content: String,
    #[serde(default)]
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ById {
    pub id: RecordId,
}

/// Lookup by author or category name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByKey {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteThought {
    pub caller: String,
    pub id: RecordId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Submitted {
    pub id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { code: CODE_BAD_REQUEST.to_string(), message: message.into() }
    }
}

impl From<&LedgerError> for ErrorBody {
    fn from(e: &LedgerError) -> Self {
        Self { code: e.code().to_string(), message: e.to_string() }
    }
}

fn too_large(len: usize, max: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Payload too large: {} bytes (Max {})", len, max),
    )
}

// --- BLOCKING (CLI) ---

/// Writes one frame. `max` is the largest body the peer will read.
pub fn write_frame<W: Write>(w: &mut W, tag: u8, body: &[u8], max: usize) -> io::Result<()> {
    if body.len() > max {
        return Err(too_large(body.len(), max));
    }
    w.write_all(&[tag])?;
    w.write_all(&(body.len() as u32).to_le_bytes())?;
    w.write_all(body)?;
    w.flush()
}

pub fn read_frame<R: Read>(r: &mut R, max: usize) -> io::Result<(u8, Vec<u8>)> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)?;

    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > max {
        return Err(too_large(len, max));
    }

    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?;
    Ok((tag[0], body))
}

// --- ASYNC (SERVER) ---

/// Reads one frame. `Ok(None)` means the peer closed the connection between
/// frames.
pub async fn read_frame_async<R: AsyncReadExt + Unpin>(r: &mut R, max: usize) -> io::Result<Option<(u8, Vec<u8>)>> {
    let mut tag = [0u8; 1];
    match r.read_exact(&mut tag).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > max {
        return Err(too_large(len, max));
    }

    let mut body = vec![0u8; len];
    r.read_exact(&mut body).await?;
    Ok(Some((tag[0], body)))
}

pub async fn write_frame_async<W: AsyncWriteExt + Unpin>(w: &mut W, tag: u8, body: &[u8], max: usize) -> io::Result<()> {
    if body.len() > max {
        return Err(too_large(body.len(), max));
    }
    w.write_all(&[tag]).await?;
    w.write_all(&(body.len() as u32).to_le_bytes()).await?;
    w.write_all(body).await?;
    w.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_layout() {
        let mut buf = Vec::new();
        write_frame(&mut buf, OP_GET_THOUGHT, br#"{"id":7}"#, MAX_FRAME).unwrap();
        assert_eq!(buf[0], OP_GET_THOUGHT);
        assert_eq!(&buf[1..5], &8u32.to_le_bytes());

        let (op, body) = read_frame(&mut Cursor::new(buf), MAX_FRAME).unwrap();
        assert_eq!(op, OP_GET_THOUGHT);
        let req: ById = serde_json::from_slice(&body).unwrap();
        assert_eq!(req.id, 7);
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut buf = vec![OP_GET_THOUGHT];
        buf.extend_from_slice(&((MAX_FRAME as u32) + 1).to_le_bytes());
        let err = read_frame(&mut Cursor::new(buf), MAX_FRAME).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_response_limit_is_wider_than_request_limit() {
        let body = vec![b'x'; MAX_FRAME + 100];
        let mut buf = Vec::new();
        assert!(write_frame(&mut buf, STATUS_OK, &body, MAX_FRAME).is_err());
        assert!(buf.is_empty());

        write_frame(&mut buf, STATUS_OK, &body, MAX_RESPONSE).unwrap();
        let (status, read) = read_frame(&mut Cursor::new(buf), MAX_RESPONSE).unwrap();
        assert_eq!(status, STATUS_OK);
        assert_eq!(read.len(), MAX_FRAME + 100);
    }

    #[test]
    fn test_dream_themes_default_to_empty() {
        let req: SubmitDream = serde_json::from_str(r#"{"dreamer":"d","content":"c"}"#).unwrap();
        assert!(req.themes.is_empty());
    }

    #[test]
    fn test_error_body_from_ledger_error() {
        let body = ErrorBody::from(&LedgerError::Unauthorized);
        assert_eq!(body.code, "unauthorized");
        assert_eq!(body.message, "Not authorized");
    }

    #[tokio::test]
    async fn test_async_frames_and_clean_eof() {
        let mut buf = Vec::new();
        write_frame_async(&mut buf, STATUS_OK, b"null", MAX_RESPONSE).await.unwrap();

        let mut reader = Cursor::new(buf);
        let frame = read_frame_async(&mut reader, MAX_RESPONSE).await.unwrap();
        assert_eq!(frame, Some((STATUS_OK, b"null".to_vec())));
        assert_eq!(read_frame_async(&mut reader, MAX_RESPONSE).await.unwrap(), None);
    }
}

//! Fixed-size wire frames.
//!
//! Every frame, inbound or outbound, is 36 bytes: a 4-byte ASCII code followed
//! by a 32-byte field right-padded with NUL bytes.
//!
//! ```text
//! inbound:  [OPEN|SHUT|QUIT][client id ......................]
//! outbound: [QPOS|MTCH|LEFT|GEND|DENY][payload ..............]
//! ```

use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{ConnectionError, ProtocolError};
use super::matchmaking::messages::Notification;
use super::matchmaking::types::{CLIENT_ID_LEN, ClientId};
#[cfg(test)]
use super::matchmaking::types::GameId;
#[cfg(test)]
use uuid::Uuid;

pub const CODE_LEN: usize = 4;
pub const FRAME_LEN: usize = CODE_LEN + CLIENT_ID_LEN;

/// Inbound command code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Open,
    Shut,
    Quit,
    Unknown([u8; CODE_LEN]),
}

impl Command {
    pub fn from_code(code: [u8; CODE_LEN]) -> Self {
        match &code {
            b"OPEN" => Command::Open,
            b"SHUT" => Command::Shut,
            b"QUIT" => Command::Quit,
            _ => Command::Unknown(code),
        }
    }

    pub fn code(&self) -> [u8; CODE_LEN] {
        match self {
            Command::Open => *b"OPEN",
            Command::Shut => *b"SHUT",
            Command::Quit => *b"QUIT",
            Command::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.code()))
    }
}

/// One inbound frame. The id field is kept raw until a caller needs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    raw_id: [u8; CLIENT_ID_LEN],
}

impl Frame {
    #[cfg(test)]
    pub(crate) fn new(command: Command, id: &ClientId) -> Self {
        Self {
            command,
            raw_id: pad_field(id.as_str().as_bytes()),
        }
    }

    pub fn from_bytes(bytes: &[u8; FRAME_LEN]) -> Self {
        let mut code = [0u8; CODE_LEN];
        code.copy_from_slice(&bytes[..CODE_LEN]);
        let mut raw_id = [0u8; CLIENT_ID_LEN];
        raw_id.copy_from_slice(&bytes[CODE_LEN..]);
        Self {
            command: Command::from_code(code),
            raw_id,
        }
    }

    #[cfg(test)]
    pub(crate) fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..CODE_LEN].copy_from_slice(&self.command.code());
        bytes[CODE_LEN..].copy_from_slice(&self.raw_id);
        bytes
    }

    /// Decode the id field, stripping the NUL padding.
    pub fn client_id(&self) -> Result<ClientId, ProtocolError> {
        let text = std::str::from_utf8(trim_field(&self.raw_id))
            .map_err(|_| ProtocolError::InvalidClientId)?;
        ClientId::new(text).ok_or(ProtocolError::InvalidClientId)
    }
}

fn pad_field(value: &[u8]) -> [u8; CLIENT_ID_LEN] {
    let mut field = [0u8; CLIENT_ID_LEN];
    let len = value.len().min(CLIENT_ID_LEN);
    field[..len].copy_from_slice(&value[..len]);
    field
}

fn trim_field(field: &[u8]) -> &[u8] {
    let end = field.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    &field[..end]
}

/// Read one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; FRAME_LEN];
    let mut filled = 0;
    while filled < FRAME_LEN {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::TruncatedFrame(filled).into());
        }
        filled += n;
    }
    Ok(Some(Frame::from_bytes(&buf)))
}

pub async fn write_frame<W>(writer: &mut W, bytes: &[u8; FRAME_LEN]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Serialize a notification to its outbound frame.
pub fn encode_notification(notification: &Notification) -> [u8; FRAME_LEN] {
    let (code, payload): (&[u8; CODE_LEN], String) = match notification {
        Notification::QueuePosition(position) => (b"QPOS", position.to_string()),
        Notification::MatchFound(game_id) => (b"MTCH", game_id.to_string()),
        Notification::LeftQueue => (b"LEFT", String::new()),
        Notification::GameOver(game_id) => (b"GEND", game_id.to_string()),
        Notification::Rejected => (b"DENY", String::new()),
    };
    let mut bytes = [0u8; FRAME_LEN];
    bytes[..CODE_LEN].copy_from_slice(code);
    bytes[CODE_LEN..].copy_from_slice(&pad_field(payload.as_bytes()));
    bytes
}

/// Parse an outbound frame, as a client would.
#[cfg(test)]
pub(crate) fn decode_notification(bytes: &[u8; FRAME_LEN]) -> Option<Notification> {
    let payload = std::str::from_utf8(trim_field(&bytes[CODE_LEN..])).ok()?;
    let game_id = |payload: &str| Uuid::try_parse(payload).ok().map(GameId::from_uuid);
    match &bytes[..CODE_LEN] {
        b"QPOS" => payload.parse().ok().map(Notification::QueuePosition),
        b"MTCH" => game_id(payload).map(Notification::MatchFound),
        b"LEFT" => Some(Notification::LeftQueue),
        b"GEND" => game_id(payload).map(Notification::GameOver),
        b"DENY" => Some(Notification::Rejected),
        _ => None,
    }
}

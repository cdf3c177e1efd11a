/// TCP session for one client.
///
/// Reads the `OPEN` handshake, registers the client with the matchmaking
/// engine, then runs the read loop (commands → events) and the write loop
/// (notifications → frames) side by side. Whichever stops first ends the
/// session, and exactly one `Disconnect` is submitted for a registered client.
use actix::Recipient;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::{ConnectionError, ProtocolError};
use super::matchmaking::messages::Event;
use super::matchmaking::registry::{ClientRecord, NotificationStream};
use super::matchmaking::types::{ClientId, SessionId};
use super::protocol::{encode_notification, read_frame, write_frame, Command};

pub struct Connection<S> {
    stream: S,
    peer: String,
    session: SessionId,
    intake: Recipient<Event>,
    write_timeout: Duration,
    sink_capacity: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        intake: Recipient<Event>,
        write_timeout: Duration,
        sink_capacity: usize,
    ) -> Self {
        Self {
            stream,
            peer: peer.into(),
            session: SessionId::new(),
            intake,
            write_timeout,
            sink_capacity,
        }
    }

    /// Drive the session until the peer leaves, misbehaves or stalls a write.
    pub async fn run(self) -> Result<(), ConnectionError> {
        let Connection {
            stream,
            peer,
            session,
            intake,
            write_timeout,
            sink_capacity,
        } = self;
        let (mut reader, mut writer) = tokio::io::split(stream);

        // Nothing is registered until the handshake succeeds.
        let id = match handshake(&mut reader).await {
            Ok(id) => id,
            Err(e) => {
                warn!("[Connection] Handshake from {} failed: {}", peer, e);
                return Err(e);
            }
        };
        let (record, notifications) = ClientRecord::open(id.clone(), session, sink_capacity);
        intake.do_send(Event::Enqueue(record));
        info!("[Connection] Client {} opened from {} (session {})", id, peer, session);

        let result = tokio::select! {
            res = read_commands(&mut reader, &id, session, &intake) => res,
            res = write_notifications(&mut writer, notifications, write_timeout) => res,
        };

        intake.do_send(Event::Disconnect {
            id: id.clone(),
            session,
        });
        match &result {
            Ok(()) => info!("[Connection] Client {} closed", id),
            Err(e) => warn!("[Connection] Client {} dropped: {}", id, e),
        }
        result
    }
}

async fn handshake<R>(reader: &mut R) -> Result<ClientId, ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let frame = read_frame(reader)
        .await?
        .ok_or(ProtocolError::ClosedBeforeHandshake)?;
    if frame.command != Command::Open {
        return Err(ProtocolError::MissingHandshake(frame.command.to_string()).into());
    }
    Ok(frame.client_id()?)
}

async fn read_commands<R>(
    reader: &mut R,
    id: &ClientId,
    session: SessionId,
    intake: &Recipient<Event>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
{
    while let Some(frame) = read_frame(reader).await? {
        if !matches!(frame.client_id(), Ok(ref frame_id) if frame_id == id) {
            warn!("[Connection] Frame {} from {} carries a different id", frame.command, id);
        }
        match frame.command {
            Command::Shut => {
                info!("[Connection] Client {} is quitting the queue", id);
                intake.do_send(Event::LeaveQueue { id: id.clone(), session });
            }
            Command::Quit => {
                info!("[Connection] Client {} is quitting the game", id);
                intake.do_send(Event::LeaveGame { id: id.clone(), session });
            }
            other => warn!("[Connection] Unknown cmd {} from {}", other, id),
        }
    }
    Ok(())
}

async fn write_notifications<W>(
    writer: &mut W,
    mut notifications: NotificationStream,
    write_timeout: Duration,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(notification) = notifications.recv().await {
        let bytes = encode_notification(&notification);
        match tokio::time::timeout(write_timeout, write_frame(writer, &bytes)).await {
            Ok(res) => res?,
            Err(_) => return Err(ConnectionError::WriteTimeout(write_timeout)),
        }
        debug!("[Connection] Sent {:?}", notification);
    }
    // The engine released this client.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::server::matchmaking::messages::{Notification, Snapshot};
    use crate::server::matchmaking::MatchmakingServer;
    use crate::server::protocol::{decode_notification, Frame, FRAME_LEN};
    use actix::prelude::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    /// Stands in for the engine and remembers what it was sent.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        // Held so the sinks stay open.
        #[allow(dead_code)]
        records: Vec<ClientRecord>,
        greeting: Option<Notification>,
    }

    impl Actor for Recorder {
        type Context = Context<Self>;
    }

    impl Handler<Event> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: Event, _ctx: &mut Self::Context) {
            let (kind, id) = match &msg {
                Event::Enqueue(record) => ("enqueue", record.id()),
                Event::LeaveQueue { id, .. } => ("leave_queue", id),
                Event::LeaveGame { id, .. } => ("leave_game", id),
                Event::Disconnect { id, .. } => ("disconnect", id),
            };
            self.events.push(format!("{}:{}", kind, id));
            if let Event::Enqueue(record) = msg {
                if let Some(greeting) = self.greeting.clone() {
                    record.notify(greeting);
                }
                self.records.push(record);
            }
        }
    }

    #[derive(Message)]
    #[rtype(result = "Vec<String>")]
    struct Recorded;

    impl Handler<Recorded> for Recorder {
        type Result = MessageResult<Recorded>;

        fn handle(&mut self, _msg: Recorded, _ctx: &mut Self::Context) -> Self::Result {
            MessageResult(self.events.clone())
        }
    }

    fn client_id(s: &str) -> ClientId {
        ClientId::new(s).unwrap()
    }

    fn frame(command: Command, id: &str) -> [u8; FRAME_LEN] {
        Frame::new(command, &client_id(id)).to_bytes()
    }

    async fn next_notification(client: &mut DuplexStream) -> Option<Notification> {
        let mut buf = [0u8; FRAME_LEN];
        client.read_exact(&mut buf).await.ok()?;
        Some(decode_notification(&buf).unwrap())
    }

    fn connection(
        stream: DuplexStream,
        intake: Recipient<Event>,
        write_timeout: Duration,
    ) -> Connection<DuplexStream> {
        Connection::new(stream, "test", intake, write_timeout, 8)
    }

    #[actix::test]
    async fn test_open_then_shut_leaves_queue_empty() {
        let engine = MatchmakingServer::new(&Settings {
            players_per_game: 10,
            ..Settings::default()
        })
        .start();
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(
            connection(server, engine.clone().recipient(), Duration::from_secs(2)).run(),
        );

        client.write_all(&frame(Command::Open, "alice")).await.unwrap();
        assert_eq!(next_notification(&mut client).await, Some(Notification::QueuePosition(1)));
        assert_eq!(engine.send(Snapshot).await.unwrap().queued, vec![client_id("alice")]);

        client.write_all(&frame(Command::Shut, "alice")).await.unwrap();
        assert_eq!(next_notification(&mut client).await, Some(Notification::LeftQueue));
        // Sink released, so the server side closes the connection.
        assert_eq!(next_notification(&mut client).await, None);
        assert!(task.await.unwrap().is_ok());

        let state = engine.send(Snapshot).await.unwrap();
        assert!(state.queued.is_empty());
        assert_eq!(state.registered, 0);
    }

    #[actix::test]
    async fn test_first_frame_must_be_open() {
        let recorder = Recorder::default().start();
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&frame(Command::Shut, "alice")).await.unwrap();

        let err = connection(server, recorder.clone().recipient(), Duration::from_secs(2))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Protocol(ProtocolError::MissingHandshake(_))));
        assert!(recorder.send(Recorded).await.unwrap().is_empty());
    }

    #[actix::test]
    async fn test_unknown_command_keeps_connection_open() {
        let recorder = Recorder::default().start();
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(
            connection(server, recorder.clone().recipient(), Duration::from_secs(2)).run(),
        );

        client.write_all(&frame(Command::Open, "bob")).await.unwrap();
        client.write_all(&frame(Command::Unknown(*b"PING"), "bob")).await.unwrap();
        client.write_all(&frame(Command::Quit, "bob")).await.unwrap();
        drop(client);

        assert!(task.await.unwrap().is_ok());
        assert_eq!(
            recorder.send(Recorded).await.unwrap(),
            vec!["enqueue:bob", "leave_game:bob", "disconnect:bob"]
        );
    }

    #[actix::test]
    async fn test_drop_without_shut_disconnects() {
        let engine = MatchmakingServer::new(&Settings {
            players_per_game: 10,
            ..Settings::default()
        })
        .start();
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(
            connection(server, engine.clone().recipient(), Duration::from_secs(2)).run(),
        );

        client.write_all(&frame(Command::Open, "carol")).await.unwrap();
        assert_eq!(next_notification(&mut client).await, Some(Notification::QueuePosition(1)));
        drop(client);

        assert!(task.await.unwrap().is_ok());
        let state = engine.send(Snapshot).await.unwrap();
        assert!(!state.is_queued(&client_id("carol")));
        assert_eq!(state.registered, 0);
    }

    #[actix::test]
    async fn test_truncated_frame_after_open_disconnects() {
        let recorder = Recorder::default().start();
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(
            connection(server, recorder.clone().recipient(), Duration::from_secs(2)).run(),
        );

        client.write_all(&frame(Command::Open, "erin")).await.unwrap();
        client.write_all(b"SHUT").await.unwrap();
        drop(client);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ConnectionError::Protocol(ProtocolError::TruncatedFrame(4))));
        assert_eq!(
            recorder.send(Recorded).await.unwrap(),
            vec!["enqueue:erin", "disconnect:erin"]
        );
    }

    #[actix::test]
    async fn test_write_timeout_disconnects_once() {
        let recorder = Recorder {
            greeting: Some(Notification::QueuePosition(1)),
            ..Recorder::default()
        }
        .start();
        // Smaller than one frame and never read, so the write cannot finish.
        let (mut client, server) = tokio::io::duplex(16);
        let task = tokio::spawn(
            connection(server, recorder.clone().recipient(), Duration::from_millis(50)).run(),
        );

        client.write_all(&frame(Command::Open, "dave")).await.unwrap();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ConnectionError::WriteTimeout(_)));
        assert_eq!(
            recorder.send(Recorded).await.unwrap(),
            vec!["enqueue:dave", "disconnect:dave"]
        );
        drop(client);
    }
}

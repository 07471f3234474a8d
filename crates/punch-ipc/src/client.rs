//! IPC client implementation

use punch_api::{Command, Event, Request, Response, ResponseResult};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::{IpcError, IpcResult};

/// IPC client for talking to punchd
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        })
    }

    /// Send a command and wait for its response.
    ///
    /// Notices that arrive before the response (on a subscribed
    /// connection) are skipped.
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut json = serde_json::to_string(&Request::new(request_id, command))?;
        json.push('\n');
        self.writer.write_all(json.as_bytes()).await?;

        loop {
            let line = read_line(&mut self.reader).await?;
            let value: serde_json::Value = serde_json::from_str(&line)?;
            if value.get("request_id").is_some() {
                return Ok(serde_json::from_value(value)?);
            }
        }
    }

    /// Subscribe to notices and turn this connection into an event stream
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        let response = self.send(Command::SubscribeEvents).await?;

        if let ResponseResult::Err(e) = response.result {
            return Err(IpcError::ServerError(e.message));
        }

        Ok(EventStream {
            reader: self.reader,
        })
    }
}

/// Stream of events from punchd
pub struct EventStream {
    reader: BufReader<OwnedReadHalf>,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next(&mut self) -> IpcResult<Event> {
        let line = read_line(&mut self.reader).await?;
        Ok(serde_json::from_str(&line)?)
    }
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> IpcResult<String> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::ConnectionClosed);
    }
    Ok(line.trim().to_string())
}

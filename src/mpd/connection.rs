//! A single open connection to the server.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::error::ClientError;
use super::protocol::{self, Line, Response};
use crate::config::{ConnectionConfig, Endpoint};

trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// An established, greeted (and authenticated) connection.
pub(crate) struct Connection {
    stream: BufReader<Box<dyn Stream>>,
    version: String,
    response_timeout: Duration,
}

impl Connection {
    /// Connect, read the greeting and send the password, all within the
    /// connect timeout.
    pub(crate) async fn open(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let endpoint = config.endpoint();
        timeout(config.connect_timeout, Self::open_inner(config, &endpoint))
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                endpoint: endpoint.to_string(),
                timeout: config.connect_timeout,
            })?
    }

    async fn open_inner(config: &ConnectionConfig, endpoint: &Endpoint) -> Result<Self, ClientError> {
        let connect_err = |source| ClientError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        let stream: Box<dyn Stream> = match endpoint {
            Endpoint::Tcp { host, port } => {
                let tcp = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(connect_err)?;
                tcp.set_nodelay(true)?;
                Box::new(tcp)
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => Box::new(
                tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(connect_err)?,
            ),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(connect_err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix sockets are not available on this platform",
                )))
            }
        };

        let mut stream = BufReader::new(stream);
        let mut greeting = String::new();
        if stream.read_line(&mut greeting).await? == 0 {
            return Err(ClientError::Closed);
        }
        let version = protocol::parse_greeting(&greeting)?;

        let mut conn = Self {
            stream,
            version,
            response_timeout: config.response_timeout,
        };

        if let Some(password) = &config.password {
            conn.execute(&protocol::command("password", &[password.as_str()]))
                .await?;
        }
        Ok(conn)
    }

    /// Protocol version from the greeting.
    pub(crate) fn version(&self) -> &str {
        &self.version
    }

    /// Send one command line and read its reply.
    pub(crate) async fn execute(&mut self, line: &str) -> Result<Response, ClientError> {
        trace!(command = line, "sending");
        let limit = self.response_timeout;
        timeout(limit, self.round_trip(line))
            .await
            .map_err(|_| ClientError::ResponseTimeout(limit))?
    }

    /// Send several commands as one command list and read the combined reply.
    pub(crate) async fn execute_list(&mut self, lines: &[String]) -> Result<Response, ClientError> {
        let mut batch = String::from("command_list_begin\n");
        for line in lines {
            batch.push_str(line);
            batch.push('\n');
        }
        batch.push_str("command_list_end");
        self.execute(&batch).await
    }

    async fn round_trip(&mut self, line: &str) -> Result<Response, ClientError> {
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        let mut pairs = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.stream.read_line(&mut buf).await? == 0 {
                return Err(ClientError::Closed);
            }
            match protocol::parse_line(&buf)? {
                Line::Ok => return Ok(Response::new(pairs)),
                Line::ListOk => {}
                Line::Ack(ack) => return Err(ClientError::Command(ack)),
                Line::Pair(key, value) => pairs.push((key, value)),
            }
        }
    }

    /// Say goodbye and shut the socket.
    pub(crate) async fn close(mut self) {
        let writer = self.stream.get_mut();
        let result = async {
            writer.write_all(b"close\n").await?;
            writer.shutdown().await
        };
        if let Err(e) = timeout(self.response_timeout, result).await.unwrap_or(Ok(())) {
            debug!(error = %e, "error while closing connection");
        }
    }
}

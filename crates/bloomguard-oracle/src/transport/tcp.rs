//! TCP transport (tokio + socket2 for the keep-alive period).

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{Connector, Transport};

/// Longest reply line accepted from the server.
const MAX_LINE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: &str) -> io::Result<Box<dyn Transport>> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpTransport::new(stream)))
    }
}

#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<BufReader<TcpStream>>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
        }
    }

    fn stream(&mut self) -> io::Result<&mut BufReader<TcpStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport closed"))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;
        stream.get_mut().write_all(buf).await?;
        stream.get_mut().flush().await
    }

    async fn read_line(&mut self) -> io::Result<String> {
        let stream = self.stream()?;
        let mut line = String::new();
        let n = (&mut *stream).take(MAX_LINE_BYTES).read_line(&mut line).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            ));
        }
        if !line.ends_with('\n') {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "reply line too long"));
        }
        Ok(line)
    }

    fn set_keepalive(&mut self, period: Duration) -> io::Result<()> {
        let stream = self.stream()?;
        let keepalive = TcpKeepalive::new().with_time(period);
        SockRef::from(stream.get_ref()).set_tcp_keepalive(&keepalive)
    }

    async fn close(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(stream) => stream.into_inner().shutdown().await,
            None => Ok(()),
        }
    }
}

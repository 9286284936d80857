//! Delimiter-framed connection over a raw byte stream

use std::future::Future;
use std::time::Duration;

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    time::{Instant, timeout, timeout_at},
};
use tracing::{debug, warn};

use crate::{
    core::error::{TransportError, TransportResult},
    protocol::{DELIMITER, MAX_ACK_LEN},
    transport::Connector,
};

/// Upper bound for the best-effort shutdown in [`Connection::close`]
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Point in time a blocking transport call must complete by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    window: Duration,
}

impl Deadline {
    /// Deadline `window` from now
    pub fn after(window: Duration) -> Self {
        Self {
            at: Instant::now() + window,
            window,
        }
    }

    /// Drive `fut` to completion unless the deadline passes first
    pub async fn run<F: Future>(&self, fut: F) -> TransportResult<F::Output> {
        timeout_at(self.at, fut)
            .await
            .map_err(|_| TransportError::Timeout(self.window))
    }
}

/// An open channel to a device
///
/// Incoming data is split on [`DELIMITER`]; outgoing data is written as-is.
/// Bytes following a delimiter stay buffered for the next read.
#[derive(Debug)]
pub struct Connection<S> {
    stream: Option<BufReader<S>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already established stream
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
        }
    }

    /// A connection that was never established
    pub fn closed() -> Self {
        Self { stream: None }
    }

    /// Open a channel to `address` through `connector`
    pub async fn open<C>(connector: &C, address: &str) -> TransportResult<Self>
    where
        C: Connector<Stream = S>,
    {
        let stream = connector.open(address).await?;
        debug!(address, "Transport connected");
        Ok(Self::new(stream))
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Read one delimiter-terminated message, delimiter excluded
    ///
    /// End of stream before a delimiter is [`TransportError::Closed`], never a
    /// short message.
    pub async fn read_until_delimiter(&mut self, deadline: Deadline) -> TransportResult<Vec<u8>> {
        let reader = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let mut frame = Vec::with_capacity(64);

        deadline
            .run(async {
                let mut limited = (&mut *reader).take(MAX_ACK_LEN as u64 + 1);
                limited.read_until(DELIMITER, &mut frame).await
            })
            .await??;

        match frame.last() {
            Some(&DELIMITER) => {
                frame.pop();
                Ok(frame)
            }
            _ if frame.len() > MAX_ACK_LEN => Err(TransportError::AckTooLong(MAX_ACK_LEN)),
            _ => Err(TransportError::Closed),
        }
    }

    /// Write raw bytes and flush them to the driver
    pub async fn write(&mut self, bytes: &[u8], deadline: Deadline) -> TransportResult<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::Connection("connection is not open".into()))?;

        deadline
            .run(async {
                stream.write_all(bytes).await?;
                stream.flush().await
            })
            .await??;

        Ok(())
    }

    /// Release the underlying stream
    ///
    /// Safe to call any number of times, including on a connection that was
    /// never opened.
    pub async fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        match timeout(CLOSE_TIMEOUT, stream.shutdown()).await {
            Ok(Ok(())) => debug!("Transport closed"),
            Ok(Err(e)) => debug!("Transport shutdown failed: {}", e),
            Err(_) => warn!("Transport shutdown timed out, dropping stream"),
        }
    }
}

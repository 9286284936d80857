//! Mock connector for testing

use std::{
    cell::Cell,
    collections::VecDeque,
    marker::PhantomData,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    sync::Mutex,
};

use crate::{
    core::error::{TransportError, TransportResult},
    transport::Connector,
};

/// Scripted result of one `open` call
enum Script<S> {
    Stream(S),
    Failure(String),
    Pending,
}

/// Counters shared between the connector and the streams it handed out
#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    releases: AtomicUsize,
}

/// Mock connector handing out pre-scripted streams
///
/// Every stream is wrapped so the test can observe when it is released.
pub struct MockConnector<S = tokio_test::io::Mock> {
    scripts: Mutex<VecDeque<Script<S>>>,
    addresses: Mutex<Vec<String>>,
    counters: Arc<Counters>,
}

impl<S> MockConnector<S> {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            addresses: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Next `open` succeeds with `stream`
    pub async fn push_stream(&self, stream: S) {
        self.scripts.lock().await.push_back(Script::Stream(stream));
    }

    /// Next `open` fails with a connection error
    pub async fn push_failure(&self, reason: &str) {
        self.scripts
            .lock()
            .await
            .push_back(Script::Failure(reason.to_string()));
    }

    /// Next `open` never completes
    pub async fn push_pending(&self) {
        self.scripts.lock().await.push_back(Script::Pending);
    }

    /// Number of `open` calls so far
    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    /// Number of streams released so far
    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    /// Addresses passed to `open`, in call order
    pub async fn addresses(&self) -> Vec<String> {
        self.addresses.lock().await.clone()
    }
}

impl<S> Default for MockConnector<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Connector for MockConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = TrackedStream<S>;

    async fn open(&self, address: &str) -> TransportResult<Self::Stream> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.addresses.lock().await.push(address.to_string());

        let script = self.scripts.lock().await.pop_front();
        match script {
            Some(Script::Stream(inner)) => Ok(TrackedStream {
                inner,
                counters: self.counters.clone(),
                _not_sync: PhantomData,
            }),
            Some(Script::Failure(reason)) => Err(TransportError::Connection(reason)),
            Some(Script::Pending) => std::future::pending().await,
            None => Err(TransportError::Connection("no scripted stream".into())),
        }
    }
}

/// Stream wrapper counting its own release
///
/// `Send` but not `Sync`, so every session test also checks
/// that spawned sessions only need `Connector::Stream: Send`.
pub struct TrackedStream<S> {
    inner: S,
    counters: Arc<Counters>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<S> Drop for TrackedStream<S> {
    fn drop(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TrackedStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TrackedStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_mock_connector_counts_opens_and_releases() {
        let connector = MockConnector::new();
        connector.push_stream(Builder::new().build()).await;

        let stream = connector.open("AA:BB:CC:DD:EE:FF").await.unwrap();
        assert_eq!(connector.opens(), 1);
        assert_eq!(connector.releases(), 0);

        drop(stream);
        assert_eq!(connector.releases(), 1);
        assert_eq!(connector.addresses().await, vec!["AA:BB:CC:DD:EE:FF"]);
    }

    #[tokio::test]
    async fn test_mock_connector_failure() {
        let connector = MockConnector::<tokio_test::io::Mock>::new();
        connector.push_failure("host is down").await;

        let result = connector.open("AA:BB:CC:DD:EE:FF").await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
        assert_eq!(connector.releases(), 0);
    }
}

//! RFCOMM stream bound to its profile registration

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bluer::rfcomm::{ProfileHandle, Stream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Connected RFCOMM stream
///
/// Holds the client profile registration so it is only unregistered once the
/// stream itself is released.
pub struct RfcommStream {
    stream: Stream,
    _profile: ProfileHandle,
}

impl RfcommStream {
    pub(crate) fn new(stream: Stream, profile: ProfileHandle) -> Self {
        Self {
            stream,
            _profile: profile,
        }
    }
}

impl AsyncRead for RfcommStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for RfcommStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

//! One provisioning session: the handshake stage machine

use std::{future::Future, sync::Arc};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    core::{
        controller::SessionLease,
        error::{ProvisionError, ProvisionResult, TransportResult},
        progress::ProgressSink,
        types::{Credentials, DeviceRef, Outcome, SessionId, Stage},
    },
    protocol::{ACKS_PER_SESSION, Ack},
    transport::{Connection, Connector, framed::Deadline},
};

/// A single attempt to provision one device with one set of credentials
///
/// Owns its connection exclusively. [`Session::run`] always ends in `Success`
/// or `Failed`, and the connection is closed exactly once on either path.
pub struct Session<C: Connector, S: ProgressSink> {
    id: SessionId,
    device: DeviceRef,
    credentials: Credentials,
    settings: Settings,
    connector: Arc<C>,
    connection: Connection<C::Stream>,
    sink: Arc<S>,
    stage: Stage,
    cancel: watch::Receiver<bool>,
    lease: Option<SessionLease>,
}

impl<C: Connector, S: ProgressSink> Session<C, S> {
    pub fn new(
        device: DeviceRef,
        credentials: Credentials,
        settings: Settings,
        connector: Arc<C>,
        sink: Arc<S>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            device,
            credentials,
            settings,
            connector,
            connection: Connection::closed(),
            sink,
            stage: Stage::Idle,
            cancel,
            lease: None,
        }
    }

    /// Attach the controller's slot; released after `Done.` is emitted
    pub(crate) fn with_lease(mut self, lease: SessionLease) -> Self {
        self.id = lease.id();
        self.lease = Some(lease);
        self
    }

    /// Drive the handshake to its terminal state
    ///
    /// The transcript ends with `Success.` or `Failed: <reason>.`, then
    /// `Done.`.
    pub async fn run(mut self) -> Outcome {
        self.sink.clear().await;
        self.emit("Starting config update.").await;

        let result = self.handshake().await;
        self.connection.close().await;

        let outcome = match result {
            Ok(acks) => {
                self.set_stage(Stage::Success);
                self.emit("Success.").await;
                Outcome::Success { acks }
            }
            Err(error) => {
                let stage = self.stage;
                warn!(session = %self.id, %stage, "Provisioning failed: {}", error);
                self.set_stage(Stage::Failed);
                let reason = error.to_string();
                self.emit(&format!("Failed: {}.", reason.trim_end_matches('.')))
                    .await;
                Outcome::Failed { stage, error }
            }
        };

        // The slot stays claimed until the transcript is complete
        self.emit("Done.").await;
        if let Some(lease) = self.lease.take() {
            lease.release(outcome.clone());
        }

        outcome
    }

    async fn handshake(&mut self) -> ProvisionResult<Vec<Ack>> {
        let mut acks = Vec::with_capacity(ACKS_PER_SESSION);

        self.enter(Stage::Connecting)?;
        let line = format!("Device: {}", self.device);
        self.emit(&line).await;
        self.connect().await?;

        self.enter(Stage::AwaitingInitialAck)?;
        self.emit("Connected.").await;
        acks.push(self.await_ack().await?);

        self.enter(Stage::SendingSsid)?;
        self.emit("Sending SSID.").await;
        let ssid = self.credentials.ssid().as_bytes().to_vec();
        self.send(&ssid).await?;

        self.enter(Stage::AwaitingSsidAck)?;
        acks.push(self.await_ack().await?);

        self.enter(Stage::SendingPsk)?;
        self.emit("Sending PSK.").await;
        let passphrase = self.credentials.passphrase().as_bytes().to_vec();
        self.send(&passphrase).await?;

        self.enter(Stage::AwaitingPskAck)?;
        acks.push(self.await_ack().await?);

        Ok(acks)
    }

    async fn connect(&mut self) -> ProvisionResult<()> {
        let deadline = Deadline::after(self.settings.connect_timeout);
        let connection = bounded(
            self.stage,
            &mut self.cancel,
            deadline.run(Connection::open(&*self.connector, &self.device.address)),
        )
        .await?
        .map_err(|e| ProvisionError::at_stage(Stage::Connecting, e))?;
        self.connection = connection;

        // The peer's listener may come up shortly after the link reports connected
        let delay = self.settings.settle_delay;
        if !delay.is_zero() {
            debug!(session = %self.id, ?delay, "Waiting for peer to settle");
            bounded(self.stage, &mut self.cancel, async move {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }

        Ok(())
    }

    async fn await_ack(&mut self) -> ProvisionResult<Ack> {
        let deadline = Deadline::after(self.settings.io_timeout);
        let frame = bounded(
            self.stage,
            &mut self.cancel,
            self.connection.read_until_delimiter(deadline),
        )
        .await?;

        let ack = Ack::from_frame(&frame);
        self.emit(&format!("Received:{ack}")).await;
        Ok(ack)
    }

    async fn send(&mut self, bytes: &[u8]) -> ProvisionResult<()> {
        let deadline = Deadline::after(self.settings.io_timeout);
        bounded(
            self.stage,
            &mut self.cancel,
            self.connection.write(bytes, deadline),
        )
        .await
    }

    /// Move to the next non-terminal stage, honouring cancellation
    fn enter(&mut self, stage: Stage) -> ProvisionResult<()> {
        if *self.cancel.borrow() {
            return Err(ProvisionError::Cancelled);
        }
        debug_assert_eq!(self.stage.next(), Some(stage));
        self.set_stage(stage);
        Ok(())
    }

    fn set_stage(&mut self, stage: Stage) {
        debug!(session = %self.id, from = %self.stage, to = %stage, "Stage transition");
        self.stage = stage;
        if let Some(lease) = &self.lease {
            lease.publish(stage);
        }
    }

    // `&mut` so the run future does not require `C::Stream: Sync`
    async fn emit(&mut self, line: &str) {
        info!(session = %self.id, "{}", line);
        self.sink.append(line).await;
    }
}

/// Run a transport call, failing early if the session is cancelled
async fn bounded<T, F>(
    stage: Stage,
    cancel: &mut watch::Receiver<bool>,
    fut: F,
) -> ProvisionResult<T>
where
    F: Future<Output = TransportResult<T>>,
{
    tokio::select! {
        result = fut => result.map_err(|e| ProvisionError::at_stage(stage, e)),
        _ = cancelled(cancel) => Err(ProvisionError::Cancelled),
    }
}

/// Resolves once cancellation is requested; never if the handle is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let handle_dropped = cancel.wait_for(|requested| *requested).await.is_err();
    if handle_dropped {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::Transcript;
    use crate::transport::MockConnector;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio_test::io::Builder;

    fn device() -> DeviceRef {
        DeviceRef::new(Some("raspberrypi".into()), "B8:27:EB:12:34:56")
    }

    fn credentials() -> Credentials {
        Credentials::new("HomeNet", "correct horse").unwrap()
    }

    fn settings() -> Settings {
        Settings {
            settle_delay: Duration::ZERO,
            ..Settings::default()
        }
    }

    fn session(
        connector: &Arc<MockConnector>,
        transcript: &Arc<Transcript>,
    ) -> (Session<MockConnector, Transcript>, watch::Sender<bool>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let session = Session::new(
            device(),
            credentials(),
            settings(),
            connector.clone(),
            transcript.clone(),
            cancel_rx,
        );
        (session, cancel_tx)
    }

    #[tokio::test]
    async fn test_successful_handshake() {
        let connector = Arc::new(MockConnector::new());
        connector
            .push_stream(
                Builder::new()
                    .read(b"Found ssid:\nHomeNet\n!")
                    .write(b"HomeNet")
                    .read(b"waiting-psk!")
                    .write(b"correct horse")
                    .read(b"ip-address:192.168.1.42!")
                    .build(),
            )
            .await;
        let transcript = Arc::new(Transcript::new());
        let (session, _cancel) = session(&connector, &transcript);

        let outcome = session.run().await;

        match &outcome {
            Outcome::Success { acks } => {
                assert_eq!(acks.len(), 3);
                assert_eq!(acks[2].ip_address(), Some("192.168.1.42"));
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(
            transcript.lines().await,
            vec![
                "Starting config update.",
                "Device: raspberrypi - B8:27:EB:12:34:56",
                "Connected.",
                "Received:Found ssid:\nHomeNet\n",
                "Sending SSID.",
                "Received:waiting-psk",
                "Sending PSK.",
                "Received:ip-address:192.168.1.42",
                "Success.",
                "Done.",
            ]
        );
        assert_eq!(connector.addresses().await, vec!["B8:27:EB:12:34:56"]);
        assert_eq!(connector.releases(), 1);
    }

    #[tokio::test]
    async fn test_stage_at_failure_is_reported() {
        let connector = Arc::new(MockConnector::new());
        connector
            .push_stream(Builder::new().read(b"!").write(b"HomeNet").build())
            .await;
        let transcript = Arc::new(Transcript::new());
        let (session, _cancel) = session(&connector, &transcript);

        let outcome = session.run().await;

        match outcome {
            Outcome::Failed { stage, error } => {
                assert_eq!(stage, Stage::AwaitingSsidAck);
                assert!(matches!(error, ProvisionError::ConnectionClosed));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        let lines = transcript.lines().await;
        assert_eq!(
            &lines[lines.len() - 2..],
            &["Failed: Bluetooth connection closed.", "Done."]
        );
        assert_eq!(connector.releases(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let connector = Arc::new(MockConnector::new());
        let transcript = Arc::new(Transcript::new());
        let (session, cancel) = session(&connector, &transcript);
        cancel.send_replace(true);

        let outcome = session.run().await;

        assert!(matches!(outcome.error(), Some(ProvisionError::Cancelled)));
        assert_eq!(connector.opens(), 0);
        assert_eq!(
            transcript.lines().await,
            vec![
                "Starting config update.",
                "Failed: cancelled by operator.",
                "Done.",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_blocked_read() {
        let connector = Arc::new(MockConnector::new());
        connector
            .push_stream(Builder::new().wait(Duration::from_secs(3600)).build())
            .await;
        let transcript = Arc::new(Transcript::new());
        let (session, cancel) = session(&connector, &transcript);

        let task = tokio::spawn(session.run());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.send_replace(true);
        let outcome = task.await.unwrap();

        match outcome {
            Outcome::Failed { stage, error } => {
                assert_eq!(stage, Stage::AwaitingInitialAck);
                assert!(matches!(error, ProvisionError::Cancelled));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(connector.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_precedes_first_read() {
        let connector = Arc::new(MockConnector::new());
        connector
            .push_stream(
                Builder::new()
                    .read(b"!")
                    .write(b"HomeNet")
                    .read(b"!")
                    .write(b"correct horse")
                    .read(b"!")
                    .build(),
            )
            .await;
        let transcript = Arc::new(Transcript::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let session = Session::new(
            device(),
            credentials(),
            Settings::default(),
            connector.clone(),
            transcript.clone(),
            cancel_rx,
        );

        let started = tokio::time::Instant::now();
        let outcome = session.run().await;
        drop(cancel_tx);

        let settle_delay = Settings::default().settle_delay;
        let elapsed = started.elapsed();
        assert!(outcome.is_success());
        assert!(elapsed >= settle_delay);
        assert!(elapsed < settle_delay * 2);
    }
}

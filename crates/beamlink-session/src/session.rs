use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beamlink_frame::{Framer, MessageCodec};
use beamlink_message::{Classifier, ClassifyError};
use beamlink_transport::{split_stream, ClearToSend, LinkSink};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::dispatch::DispatchScheduler;
use crate::error::Result;
use crate::handler::CommandHandler;
use crate::outbound::OutboundQueue;
use crate::responder::Responder;

/// One live companion connection.
///
/// Owns the inbound framer, the dispatch scheduler and the outbound queue for
/// the lifetime of the link. Both scheduler loops run on tokio tasks spawned
/// by [`Session::start`] and stop on [`Session::disconnect`] (or when the
/// session is dropped).
pub struct Session {
    config: SessionConfig,
    classifier: Classifier,
    framer: Mutex<Framer>,
    dispatch: Arc<DispatchScheduler>,
    outbound: Arc<OutboundQueue>,
    cancel: CancellationToken,
}

impl Session {
    /// Start a session over `sink`.
    ///
    /// `clear_to_send` is the flag the transport raises when it can take the
    /// next write. Must be called from within a tokio runtime.
    pub fn start<H, S>(
        config: SessionConfig,
        handler: H,
        sink: S,
        clear_to_send: Arc<ClearToSend>,
    ) -> Self
    where
        H: CommandHandler,
        S: LinkSink,
    {
        Self::start_with_classifier(config, Classifier::new(), handler, sink, clear_to_send)
    }

    /// Start a session with a custom classifier (e.g. extra shapes).
    pub fn start_with_classifier<H, S>(
        config: SessionConfig,
        classifier: Classifier,
        handler: H,
        sink: S,
        clear_to_send: Arc<ClearToSend>,
    ) -> Self
    where
        H: CommandHandler,
        S: LinkSink,
    {
        let outbound = Arc::new(OutboundQueue::new(config.outbound_config(), clear_to_send));
        let dispatch = Arc::new(DispatchScheduler::new(Arc::clone(&outbound)));
        let cancel = CancellationToken::new();

        tokio::spawn(Arc::clone(&outbound).run(sink, cancel.clone()));
        tokio::spawn(Arc::clone(&dispatch).run(handler, cancel.clone()));

        info!(
            segment_len = config.segment_len,
            shapes = classifier.registry().len(),
            "session started"
        );

        Self {
            framer: Mutex::new(Framer::with_config(config.framer_config())),
            config,
            classifier,
            dispatch,
            outbound,
            cancel,
        }
    }

    /// Start a session over a duplex stream and read it until EOF or
    /// disconnect on a background task.
    pub fn connect_stream<S, H>(stream: S, config: SessionConfig, handler: H) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        H: CommandHandler,
    {
        let (reader, sink) = split_stream(stream);
        let clear_to_send = Arc::clone(sink.clear_to_send());
        let session = Arc::new(Self::start(config, handler, sink, clear_to_send));

        let reading = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(err) = reading.run_reader(reader).await {
                warn!(error = %err, "link reader stopped");
            }
        });

        session
    }

    /// Feed one received character.
    ///
    /// Returns true if it completed a message that was dispatched.
    pub fn receive_char(&self, c: char) -> bool {
        if !self.is_connected() {
            return false;
        }
        let message = self.lock_framer().feed(c);
        message.is_some_and(|text| self.handle_message(&text))
    }

    /// Feed a run of received characters. Returns the number of messages
    /// dispatched.
    pub fn receive_str(&self, input: &str) -> usize {
        if !self.is_connected() {
            return 0;
        }
        let messages = self.lock_framer().feed_all(input);
        messages
            .iter()
            .filter(|text| self.handle_message(text))
            .count()
    }

    /// Classify one framed message and queue it for dispatch.
    ///
    /// Messages that fail to classify are logged and dropped. Returns true if
    /// the message was dispatched.
    pub fn handle_message(&self, text: &str) -> bool {
        match self.classifier.classify(text) {
            Ok(command) => {
                trace!(
                    service = %command.service(),
                    id = command.id(),
                    shape = command.kind.shape_name().unwrap_or("unknown"),
                    "command received"
                );
                self.dispatch.submit(command);
                true
            }
            Err(err @ ClassifyError::Shape { .. }) => {
                warn!(error = %err, len = text.len(), "discarding message");
                false
            }
            Err(err) => {
                debug!(error = %err, len = text.len(), "discarding message");
                false
            }
        }
    }

    /// Read the link until EOF or disconnect, dispatching every message.
    ///
    /// The session is disconnected when this returns.
    pub async fn run_reader<R>(&self, reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let codec = MessageCodec::with_config(self.config.framer_config());
        let mut frames = FramedRead::new(reader, codec);

        let result = loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break Ok(()),
                next = frames.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    self.handle_message(&text);
                }
                Some(Err(err)) => break Err(err.into()),
                None => {
                    info!("link closed by peer");
                    break Ok(());
                }
            }
        };

        self.disconnect();
        result
    }

    /// Unbound responder for unsolicited pushes.
    pub fn responder(&self) -> Responder {
        Responder::unbound(Arc::clone(&self.outbound))
    }

    pub fn dispatcher(&self) -> &Arc<DispatchScheduler> {
        &self.dispatch
    }

    pub fn outbound(&self) -> &Arc<OutboundQueue> {
        &self.outbound
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Tear the session down.
    ///
    /// Stops both scheduler loops, refuses further outbound payloads and
    /// drops any partially framed message. Handlers already running finish,
    /// but their replies are refused.
    pub fn disconnect(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.outbound.close();
        self.lock_framer().reset();
        info!("session disconnected");
    }

    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Wait until the session is disconnected.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    fn lock_framer(&self) -> MutexGuard<'_, Framer> {
        self.framer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

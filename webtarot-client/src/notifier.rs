//! Push Notifier
//!
//! Opens the notify WebSocket for one reading, subscribes once and waits for
//! the matching `done` notice. The notice carries no content, so it triggers
//! exactly one refetch through the [`InterpretationSource`]; the connection is
//! then closed and nothing further is read from it.
//!
//! The user identity travels in the `Sec-WebSocket-Protocol` header. The
//! notifier never reconnects: a dropped connection is reported as
//! `PushDisconnected` and recovery is up to the caller.

use crate::api::api_url;
use crate::fetcher::InterpretationSource;
use crate::{ClientError, Result};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use webtarot_common::store::Identity;
use webtarot_common::{InterpretationResult, NotificationMessage};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// `ws(s)://<host>/api/v1/interpretation/notify` for an `http(s)` base URL
pub fn notify_url(base_url: &Url) -> Result<Url> {
    let mut url = api_url(base_url, &["interpretation", "notify"])?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(ClientError::InvalidInput(format!(
                "Base URL scheme must be http or https, got {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::InvalidInput(format!("Cannot derive notify URL from {}", base_url)))?;
    Ok(url)
}

/// One-shot completion watcher for a single reading
#[derive(Clone)]
pub struct PushNotifier {
    source: Arc<dyn InterpretationSource>,
    url: Url,
    identity: Identity,
}

impl PushNotifier {
    pub fn new(source: Arc<dyn InterpretationSource>, base_url: &Url, identity: Identity) -> Result<Self> {
        Ok(Self {
            source,
            url: notify_url(base_url)?,
            identity,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Wait for `id` to complete and return the refetched result
    ///
    /// `Done` notices for other ids, a `subscribe` echo, unparseable text and
    /// binary frames are skipped. Cancelling closes the connection and returns
    /// `Cancelled`.
    #[instrument(skip(self, cancel))]
    pub async fn watch(&self, id: &str, cancel: &CancellationToken) -> Result<InterpretationResult> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let mut request = self.url.as_str().into_client_request()?;
        let protocol = HeaderValue::from_str(&self.identity.subprotocol())
            .map_err(|e| ClientError::InvalidInput(format!("Identity is not a valid header value: {}", e)))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            connected = tokio_tungstenite::connect_async(request) => {
                let (stream, _response) = connected
                    .map_err(|e| ClientError::PushDisconnected(format!("connect failed: {}", e)))?;
                stream
            }
        };
        let (mut sink, mut frames) = stream.split();

        sink.send(Message::Text(NotificationMessage::subscribe(id).to_text()))
            .await
            .map_err(|e| ClientError::PushDisconnected(format!("subscribe failed: {}", e)))?;
        debug!("Subscribed to completion notice");

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    close(&mut sink).await;
                    return Err(ClientError::Cancelled);
                }
                frame = frames.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => match NotificationMessage::parse(&text) {
                    Ok(message) if message.is_done_for(id) => break,
                    Ok(message) => debug!(uuid = message.uuid(), "Ignoring notice for another subscription"),
                    Err(unrecognized) => debug!("{}", unrecognized),
                },
                Some(Ok(Message::Close(frame))) => {
                    return Err(ClientError::PushDisconnected(format!(
                        "closed by server before completion ({:?})",
                        frame
                    )));
                }
                Some(Ok(Message::Binary(_))) => debug!("Ignoring binary frame"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(ClientError::PushDisconnected(e.to_string())),
                None => {
                    return Err(ClientError::PushDisconnected(
                        "connection ended before completion".to_string(),
                    ))
                }
            }
        }

        info!("Completion notice received, refetching");
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.source.fetch(id) => result,
        };
        close(&mut sink).await;
        result
    }
}

async fn close(sink: &mut WsSink) {
    if let Err(e) = sink.close().await {
        debug!("Closing notify connection: {}", e);
    }
}

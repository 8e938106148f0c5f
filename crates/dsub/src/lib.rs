//! # HIE DSUB
//!
//! Client for the DSUB notification broker (WS-Notification). Owns the
//! subscription lifecycle (subscribe, cancel) and the parsing of inbound
//! `Notify` envelopes into canonical notification records. Correlation of a
//! parsed notification against stored subscriptions is driven by the engine;
//! this crate stays at the protocol boundary.
//!
//! A subscription is never renewed. When a definition is re-registered the
//! old subscriptions are cancelled and re-created.

pub mod author;
pub mod notify;
mod templates;

use std::time::Duration;

use hie_types::consts::{SOAP_ACTION_SUBSCRIBE, SOAP_ACTION_UNSUBSCRIBE};
use hie_wire::{render, SoapRequest, WireClient};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;

pub use notify::{parse_notify, NotifyMessage};

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(2);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum DsubError {
    #[error("broker error: {0}")]
    Broker(String),
    #[error("malformed notification: {0}")]
    Malformed(String),
    #[error(transparent)]
    Transport(#[from] hie_wire::WireError),
}

pub type DsubResult<T> = Result<T, DsubError>;

/// The fixed acknowledgement envelope. Returned to the broker for every
/// inbound notification regardless of downstream processing outcome.
pub const fn ack() -> &'static str {
    templates::ACK
}

/// Broker-facing subscription client.
#[derive(Clone, Debug)]
pub struct DsubClient {
    wire: WireClient,
    broker_url: String,
    consumer_url: String,
}

impl DsubClient {
    pub fn new(wire: WireClient, broker_url: impl Into<String>, consumer_url: impl Into<String>) -> Self {
        Self {
            wire,
            broker_url: broker_url.into(),
            consumer_url: consumer_url.into(),
        }
    }

    /// Create a broker subscription for a topic/expression pair and return
    /// the broker reference issued for it.
    pub async fn subscribe(&self, topic: &str, expression: &str) -> DsubResult<String> {
        let body = render(
            templates::SUBSCRIBE,
            &[
                ("message_id", &uuid::Uuid::new_v4().to_string()),
                ("broker_url", &self.broker_url),
                ("consumer_url", &self.consumer_url),
                ("topic", topic),
                ("expression", expression),
            ],
        );
        let resp = self
            .wire
            .soap(&SoapRequest {
                url: self.broker_url.clone(),
                action: Some(SOAP_ACTION_SUBSCRIBE.to_string()),
                body,
                timeout: SUBSCRIBE_TIMEOUT,
            })
            .await?;
        let broker_ref = subscription_reference(&resp.body)?;
        if broker_ref.is_empty() {
            return Err(DsubError::Broker(
                "broker returned no subscription reference".to_string(),
            ));
        }
        tracing::info!(%topic, %expression, %broker_ref, "broker subscription created");
        Ok(broker_ref)
    }

    /// Cancel the subscription behind a broker reference. Best-effort: the
    /// error is logged and swallowed, the subscription will lapse broker-side.
    pub async fn cancel(&self, broker_ref: &str) {
        let body = render(
            templates::CANCEL,
            &[
                ("message_id", &uuid::Uuid::new_v4().to_string()),
                ("broker_ref", broker_ref),
            ],
        );
        let result = self
            .wire
            .soap(&SoapRequest {
                url: self.broker_url.clone(),
                action: Some(SOAP_ACTION_UNSUBSCRIBE.to_string()),
                body,
                timeout: CANCEL_TIMEOUT,
            })
            .await;
        match result {
            Ok(resp) => {
                tracing::info!(%broker_ref, status = resp.status, "broker subscription cancelled")
            }
            Err(err) => tracing::warn!(%broker_ref, error = %err, "broker cancel failed"),
        }
    }
}

/// Harvest the subscription-reference address from a subscribe response.
fn subscription_reference(body: &str) -> DsubResult<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut in_reference = false;
    let mut in_address = false;
    loop {
        let event = reader
            .read_event()
            .map_err(|err| DsubError::Malformed(err.to_string()))?;
        match event {
            XmlEvent::Start(e) => match e.local_name().as_ref() {
                b"SubscriptionReference" => in_reference = true,
                b"Address" if in_reference => in_address = true,
                _ => {}
            },
            XmlEvent::End(e) => match e.local_name().as_ref() {
                b"SubscriptionReference" => in_reference = false,
                b"Address" => in_address = false,
                _ => {}
            },
            XmlEvent::Text(t) if in_address => {
                return Ok(t
                    .unescape()
                    .map_err(|err| DsubError::Malformed(err.to_string()))?
                    .into_owned());
            }
            XmlEvent::Eof => return Ok(String::new()),
            _ => {}
        }
    }
}

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use pulse_types::api::{SendBroadcastRequest, SendDirectMessageRequest, UnreadCountResponse};
use pulse_types::error::{ErrorBody, ErrorKind};
use pulse_types::models::{Broadcast, BroadcastView, Category, DirectMessage, ReadReceipt};

use crate::api::DeliveryApi;
use crate::config::ClientConfig;
use crate::error::ClientError;

/// `DeliveryApi` over HTTP/JSON. Cheap to clone; clones share one
/// connection pool.
#[derive(Clone)]
pub struct HttpDelivery {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpDelivery {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!("GET {}", path);
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        let mut req = self.client.post(self.url(path)).bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(body);
        }
        decode(req.send().await?).await
    }
}

/// Turn a response into `T`, or into `ClientError::Rejected` carrying the
/// server's error kind.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(ClientError::from);
    }

    let text = resp.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ClientError::Rejected {
            kind: body.error,
            message: body.message,
        },
        Err(_) => ClientError::Rejected {
            kind: kind_for_status(status),
            message: if text.is_empty() { status.to_string() } else { text },
        },
    };
    warn!("Request rejected with {}: {}", status, err);
    Err(err)
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
        StatusCode::UNAUTHORIZED => ErrorKind::Authentication,
        StatusCode::FORBIDDEN => ErrorKind::Authorization,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        _ => ErrorKind::Internal,
    }
}

impl DeliveryApi for HttpDelivery {
    async fn list_direct_messages(&self) -> Result<Vec<DirectMessage>, ClientError> {
        self.get_json("/direct-messages").await
    }

    async fn send_direct_message(&self, body: &str, category: Category) -> Result<DirectMessage, ClientError> {
        let req = SendDirectMessageRequest {
            body: body.to_string(),
            category: category.as_str().to_string(),
        };
        self.post_json("/direct-messages", Some(&req)).await
    }

    async fn mark_direct_message_read(&self, id: Uuid) -> Result<DirectMessage, ClientError> {
        self.post_json::<(), _>(&format!("/direct-messages/{}/read", id), None)
            .await
    }

    async fn list_broadcasts(&self) -> Result<Vec<BroadcastView>, ClientError> {
        self.get_json("/broadcasts").await
    }

    async fn send_broadcast(&self, body: &str, category: Category) -> Result<Broadcast, ClientError> {
        let req = SendBroadcastRequest {
            body: body.to_string(),
            category: category.as_str().to_string(),
        };
        self.post_json("/broadcasts", Some(&req)).await
    }

    async fn mark_broadcast_read(&self, id: Uuid) -> Result<ReadReceipt, ClientError> {
        self.post_json::<(), _>(&format!("/broadcasts/{}/read", id), None)
            .await
    }

    async fn unread_count(&self) -> Result<u64, ClientError> {
        let resp: UnreadCountResponse = self.get_json("/unread-count").await?;
        Ok(resp.unread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_fallback_kinds() {
        assert_eq!(kind_for_status(StatusCode::FORBIDDEN), ErrorKind::Authorization);
        assert_eq!(kind_for_status(StatusCode::NOT_FOUND), ErrorKind::NotFound);
        assert_eq!(kind_for_status(StatusCode::BAD_GATEWAY), ErrorKind::Internal);
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let api = HttpDelivery::new(&ClientConfig::new("http://dash.local:3000/", "token")).unwrap();
        assert_eq!(api.url("/broadcasts"), "http://dash.local:3000/broadcasts");
    }
}

use std::future::Future;

use uuid::Uuid;

use pulse_types::models::{Broadcast, BroadcastView, Category, DirectMessage, ReadReceipt};

use crate::error::ClientError;

/// The delivery boundary as seen from a client: list, send and mark-read for
/// each channel, plus the derived unread count. The caller's identity is
/// carried by the implementation (for HTTP, the bearer token).
pub trait DeliveryApi: Send + Sync {
    fn list_direct_messages(&self) -> impl Future<Output = Result<Vec<DirectMessage>, ClientError>> + Send;

    fn send_direct_message(
        &self,
        body: &str,
        category: Category,
    ) -> impl Future<Output = Result<DirectMessage, ClientError>> + Send;

    fn mark_direct_message_read(&self, id: Uuid) -> impl Future<Output = Result<DirectMessage, ClientError>> + Send;

    fn list_broadcasts(&self) -> impl Future<Output = Result<Vec<BroadcastView>, ClientError>> + Send;

    fn send_broadcast(
        &self,
        body: &str,
        category: Category,
    ) -> impl Future<Output = Result<Broadcast, ClientError>> + Send;

    fn mark_broadcast_read(&self, id: Uuid) -> impl Future<Output = Result<ReadReceipt, ClientError>> + Send;

    fn unread_count(&self) -> impl Future<Output = Result<u64, ClientError>> + Send;
}

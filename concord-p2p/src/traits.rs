use async_trait::async_trait;
use concord_common::{Endpoint, Message};

use crate::error::NetworkError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one message to `destination`. Delivery is best effort.
    async fn send_to(&self, destination: &Endpoint, message: Message) -> Result<(), NetworkError>;
}

use crate::core::errors::SplitbookError;
use crate::infrastructure::notify::{Notification, Notifier};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        InMemoryNotifier::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), SplitbookError> {
        let mut sent = self.sent.write().await;
        sent.push(notification);
        Ok(())
    }
}

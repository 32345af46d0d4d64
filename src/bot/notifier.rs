use async_trait::async_trait;
use serenity::{http::Http, model::id::ChannelId};
use std::sync::Arc;

use crate::audio::{Announcement, Notifier, NotifyTarget};

/// Posts announcements as plain messages in the tenant's last command channel.
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn announce(&self, target: NotifyTarget, announcement: Announcement) -> anyhow::Result<()> {
        ChannelId::new(target.get())
            .say(&self.http, announcement.to_string())
            .await?;
        Ok(())
    }
}

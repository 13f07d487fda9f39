use std::sync::Mutex;

use rede_client::Notification;
use serde::Serialize;
use tracing::debug;

use super::{lock, Context, LastNotice};
use crate::error::AppError;
use crate::notice::Notice;

/// Activity list. Read flags flip locally first and revert if the server
/// refuses.
pub struct NotificationsScreen {
    ctx: Context,
    items: Mutex<Vec<Notification>>,
    notice: LastNotice,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationsState {
    pub items: Vec<Notification>,
    pub unread: usize,
    pub notice: Option<Notice>,
}

impl NotificationsScreen {
    pub(crate) fn new(ctx: Context) -> Self {
        Self {
            ctx,
            items: Mutex::new(Vec::new()),
            notice: LastNotice::default(),
        }
    }

    pub async fn load(&self) -> Result<usize, Notice> {
        match self.ctx.client.notifications().await {
            Ok(page) => {
                let n = page.items.len();
                *lock(&self.items) = page.items;
                self.notice.clear();
                Ok(n)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    pub async fn refresh(&self) -> Result<usize, Notice> {
        self.load().await
    }

    /// Mark one notification read. Already-read or unknown ids make no
    /// request.
    pub async fn mark_read(&self, id: u64) -> Result<(), Notice> {
        let flipped = {
            let mut items = lock(&self.items);
            match items.iter_mut().find(|n| n.id == id) {
                Some(n) if !n.read => {
                    n.read = true;
                    true
                }
                _ => false,
            }
        };
        if !flipped {
            debug!(id, "nothing to mark");
            return Ok(());
        }

        if let Err(e) = self.ctx.client.mark_notification_read(id).await {
            if let Some(n) = lock(&self.items).iter_mut().find(|n| n.id == id) {
                n.read = false;
            }
            return Err(self.fail(e.into()));
        }
        Ok(())
    }

    /// Mark everything read; on failure the previous flags come back.
    pub async fn mark_all_read(&self) -> Result<(), Notice> {
        let previously_unread: Vec<u64> = {
            let mut items = lock(&self.items);
            items
                .iter_mut()
                .filter(|n| !n.read)
                .map(|n| {
                    n.read = true;
                    n.id
                })
                .collect()
        };

        if let Err(e) = self.ctx.client.mark_all_notifications_read().await {
            for n in lock(&self.items).iter_mut() {
                if previously_unread.contains(&n.id) {
                    n.read = false;
                }
            }
            return Err(self.fail(e.into()));
        }
        Ok(())
    }

    /// Unread total as the server counts it.
    pub async fn unread_count(&self) -> Result<u64, Notice> {
        self.ctx
            .client
            .unread_notifications()
            .await
            .map_err(|e| self.fail(e.into()))
    }

    /// Unread among the loaded items.
    pub fn unread(&self) -> usize {
        lock(&self.items).iter().filter(|n| !n.read).count()
    }

    pub fn items(&self) -> Vec<Notification> {
        lock(&self.items).clone()
    }

    pub fn state(&self) -> NotificationsState {
        NotificationsState {
            items: self.items(),
            unread: self.unread(),
            notice: self.notice.get(),
        }
    }

    fn fail(&self, err: AppError) -> Notice {
        self.notice.record(self.ctx.notice(err))
    }
}

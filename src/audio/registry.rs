use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use super::session::{PlayerContext, Session, TenantId};

/// Keyed store of sessions; the entry point for every command.
///
/// Creation goes through a single map entry, so concurrent first commands
/// for the same tenant end up sharing one session.
pub struct SessionRegistry {
    sessions: DashMap<TenantId, Arc<Session>>,
    context: Arc<PlayerContext>,
}

impl SessionRegistry {
    pub fn new(context: PlayerContext) -> Self {
        Self {
            sessions: DashMap::new(),
            context: Arc::new(context),
        }
    }

    /// Returns the tenant's session, creating it on first use.
    pub fn get_or_create(&self, tenant_id: TenantId) -> Arc<Session> {
        let session = self
            .sessions
            .entry(tenant_id)
            .or_insert_with(|| {
                info!("🆕 New playback session for tenant {}", tenant_id);
                Arc::new(Session::new(tenant_id, self.context.clone()))
            })
            .clone();

        session.register_events();
        session
    }

    pub fn get(&self, tenant_id: TenantId) -> Option<Arc<Session>> {
        self.sessions.get(&tenant_id).map(|s| s.clone())
    }

    /// Drops the tenant's session after releasing its connection and timer.
    pub async fn evict(&self, tenant_id: TenantId) -> bool {
        let Some((_, session)) = self.sessions.remove(&tenant_id) else {
            return false;
        };

        session.shutdown().await;
        info!("🧹 Session for tenant {} evicted", tenant_id);
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

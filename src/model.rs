//! Shared application state, stored in Serenity's global context as a `TypeMapKey`.
use std::sync::Arc;

use serenity::prelude::TypeMapKey;

use crate::config::ZkouskaSettings;
use crate::zkouska::ZkouskaStore;

/// An `Arc<AppState>` lives in the client's data map so every event handler can reach
/// the store without threading it through serenity's callbacks.
pub struct AppState {
    pub zkouska: ZkouskaSettings,
    /// Projection of tracked announcements; rebuilt on the first `ready`.
    pub store: Arc<ZkouskaStore>,
}

impl AppState {
    pub fn new(zkouska: ZkouskaSettings) -> Self {
        Self {
            zkouska,
            store: Arc::new(ZkouskaStore::new()),
        }
    }

    pub async fn from_ctx(ctx: &serenity::prelude::Context) -> Option<Arc<Self>> {
        ctx.data.read().await.get::<AppState>().cloned()
    }
}

impl TypeMapKey for AppState {
    type Value = Arc<AppState>;
}

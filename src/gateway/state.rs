use std::sync::Arc;

use crate::store::Store;
use crate::transfer::TransferService;
use crate::user_auth::{SessionGate, UserAuthService};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub transfers: Arc<TransferService>,
    pub user_auth: Arc<UserAuthService>,
    pub gate: Arc<SessionGate>,
    /// Ledger entries returned by GET /wallet
    pub recent_transactions_limit: u32,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        user_auth: Arc<UserAuthService>,
        gate: Arc<SessionGate>,
        recent_transactions_limit: u32,
    ) -> Self {
        Self {
            transfers: Arc::new(TransferService::new(store.clone())),
            store,
            user_auth,
            gate,
            recent_transactions_limit,
        }
    }
}

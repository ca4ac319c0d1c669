//! Background expiry of idle transactions.

use crate::server::LongTxServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Spawns a task that expires idle transactions every
/// `reaper_interval`.
///
/// The task runs until the returned handle is aborted. Must be called from
/// within a tokio runtime.
pub fn spawn_reaper(server: Arc<LongTxServer>) -> JoinHandle<()> {
    let period = server.config().reaper_interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(?period, "reaper started");
        loop {
            ticker.tick().await;
            let expired = server.reap_expired();
            if !expired.is_empty() {
                info!(count = expired.len(), "expired idle transactions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use longtx_core::{LongTxId, TxState};
    use longtx_protocol::{
        BeginTransactionRequest, BeginTransactionResult, CommitTransactionRequest, StatusCode,
        TxTypeId,
    };

    #[tokio::test]
    async fn reaper_expires_idle_transactions() {
        let config = ServerConfig::default()
            .with_idle_timeout(Duration::from_millis(20))
            .with_reaper_interval(Duration::from_millis(10));
        let server = Arc::new(LongTxServer::in_memory(config));

        let tx_id = server
            .begin_transaction(BeginTransactionRequest {
                operation_params: None,
                tx_type: TxTypeId::Read as i32,
            })
            .operation
            .unwrap()
            .unpack_result::<BeginTransactionResult>()
            .unwrap()
            .tx_id;
        let id = LongTxId::parse(&tx_id).unwrap();

        let reaper = spawn_reaper(Arc::clone(&server));
        tokio::time::sleep(Duration::from_millis(200)).await;
        reaper.abort();

        assert_eq!(server.manager().state_of(&id), Some(TxState::Expired));
        assert_eq!(server.manager().active_count(), 0);

        let commit = server
            .commit_transaction(CommitTransactionRequest {
                operation_params: None,
                tx_id,
            })
            .operation
            .unwrap();
        assert_eq!(commit.status(), StatusCode::PreconditionFailed);
    }
}

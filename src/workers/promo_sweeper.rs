use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{db::OrmConn, services::promocode_service::delete_expired_promocodes};

/// Periodically delete promo codes whose expiry has passed.
///
/// The first sweep runs immediately; a failed sweep is logged and retried on
/// the next tick.
pub fn spawn(conn: OrmConn, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match delete_expired_promocodes(&conn).await {
                Ok(0) => tracing::debug!("no expired promo codes"),
                Ok(deleted) => tracing::info!(deleted, "expired promo codes removed"),
                Err(err) => tracing::warn!(error = %err, "promo code sweep failed"),
            }
        }
    })
}

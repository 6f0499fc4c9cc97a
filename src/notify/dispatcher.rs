use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{sync::mpsc, task::JoinHandle};

use super::{Notifier, render_order_message};
use crate::dto::orders::OrderWithItems;

/// Delivery counters, readable while the worker runs.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Orders that never reached the worker because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Outbox for placed-order notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<OrderWithItems>,
    stats: Arc<DispatchStats>,
}

impl NotificationDispatcher {
    /// Start the delivery worker. The worker exits once every dispatcher clone is dropped.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(DispatchStats::default());
        let handle = tokio::spawn(run(notifier, rx, stats.clone()));
        (Self { tx, stats }, handle)
    }

    /// Queue a committed order without waiting for delivery.
    pub fn dispatch(&self, order: OrderWithItems) {
        let order_id = order.order.id;
        if let Err(err) = self.tx.try_send(order) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(order_id = %order_id, error = %err, "order notification dropped");
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }
}

async fn run(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::Receiver<OrderWithItems>,
    stats: Arc<DispatchStats>,
) {
    tracing::info!("notification worker started");

    while let Some(order) = rx.recv().await {
        let order_id = order.order.id;
        let text = render_order_message(&order);
        match notifier.notify(&text).await {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(order_id = %order_id, "order notification delivered");
            }
            Err(err) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(order_id = %order_id, error = %err, "order notification failed");
            }
        }
    }

    tracing::info!("notification channel closed, worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dto::orders::OrderItemView,
        models::{ContactType, Order, OrderStatus, PaymentMethod},
        notify::MockNotifier,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn placed_order() -> OrderWithItems {
        let now = Utc::now();
        OrderWithItems {
            order: Order {
                id: Uuid::new_v4(),
                full_name: "Iryna Shevchenko".into(),
                phone_number: "0671234567".into(),
                address: "Lviv, Rynok 5".into(),
                payment_method: PaymentMethod::Iban,
                contact_type: ContactType::Phone,
                promo_code: None,
                amount_to_pay: Decimal::new(5000, 2),
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            },
            items: vec![OrderItemView {
                product_id: Uuid::new_v4(),
                brand: "Maison".into(),
                name: "Neroli".into(),
                price: Decimal::new(5000, 2),
                quantity: 1,
                volume: 5,
            }],
        }
    }

    #[tokio::test]
    async fn delivers_rendered_summary() {
        let notifier = Arc::new(MockNotifier::new());
        let (dispatcher, handle) = NotificationDispatcher::spawn(notifier.clone(), 8);
        let stats = dispatcher.stats();

        dispatcher.dispatch(placed_order());
        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(stats.delivered(), 1);
        assert_eq!(stats.failed(), 0);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Iryna Shevchenko"));
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() {
        let (dispatcher, handle) =
            NotificationDispatcher::spawn(Arc::new(MockNotifier::failing()), 8);
        let stats = dispatcher.stats();

        dispatcher.dispatch(placed_order());
        dispatcher.dispatch(placed_order());
        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(stats.delivered(), 0);
        assert_eq!(stats.failed(), 2);
    }

    #[tokio::test]
    async fn closed_queue_drops_without_blocking() {
        let (dispatcher, handle) = NotificationDispatcher::spawn(Arc::new(MockNotifier::new()), 1);
        handle.abort();
        let _ = handle.await;

        dispatcher.dispatch(placed_order());
        assert_eq!(dispatcher.stats().dropped(), 1);
    }
}

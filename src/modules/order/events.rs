use super::repository::Order;
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    Updated,
}

#[derive(Serialize, Clone, Debug)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order: Order,
    /// Carried so subscribers can filter without a database round trip.
    pub restaurant_owner_id: String,
}

/// Process-wide order event bus. Every subscriber sees every event; the
/// filtering happens at the subscription edge.
#[derive(Clone)]
pub struct OrderEvents {
    tx: broadcast::Sender<OrderEvent>,
}

impl OrderEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: OrderEvent) {
        // A send error only means nobody is subscribed right now.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }
}

impl Default for OrderEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::order::repository::OrderStatus;
    use bigdecimal::BigDecimal;

    fn order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            customer_id: "customer".to_string(),
            driver_id: None,
            restaurant_id: "restaurant".to_string(),
            status: OrderStatus::Pending,
            total: BigDecimal::from(20),
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_events_published_after_they_joined() {
        let events = OrderEvents::new();
        let mut rx = events.subscribe();

        events.publish(OrderEvent {
            kind: OrderEventKind::Created,
            order: order("order-1"),
            restaurant_owner_id: "owner-1".to_string(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, OrderEventKind::Created);
        assert_eq!(received.order.id, "order-1");
        assert_eq!(received.restaurant_owner_id, "owner-1");
    }

    #[tokio::test]
    async fn events_published_before_subscribing_are_not_delivered() {
        let events = OrderEvents::new();

        events.publish(OrderEvent {
            kind: OrderEventKind::Created,
            order: order("order-1"),
            restaurant_owner_id: "owner-1".to_string(),
        });

        let mut rx = events.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}

use crate::types::GraphEvent;

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<GraphEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: GraphEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<GraphEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(GraphEvent::TransitionSuppressed {
            from: "reception_agent".into(),
            target: "ghost_agent".into(),
        });

        match rx.recv().await.unwrap() {
            GraphEvent::TransitionSuppressed { from, target } => {
                assert_eq!(from, "reception_agent");
                assert_eq!(target, "ghost_agent");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        bus.publish(GraphEvent::HandoffCompleted {
            agent: "faq_agent".into(),
            hop: 0,
        });
    }
}

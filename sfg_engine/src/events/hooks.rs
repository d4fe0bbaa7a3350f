use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderApprovedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_approved_producer: Vec<EventProducer<OrderApprovedEvent>>,
}

pub struct EventHandlers {
    pub on_order_approved: Option<EventHandler<OrderApprovedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_approved = hooks.on_order_approved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_approved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_approved {
            result.order_approved_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_approved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_approved: Option<Handler<OrderApprovedEvent>>,
}

impl EventHooks {
    pub fn on_order_approved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderApprovedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_approved = Some(Arc::new(f));
        self
    }
}

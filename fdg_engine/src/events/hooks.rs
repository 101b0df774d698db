use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    FeedbackRequestedEvent,
    Handler,
    OrderPaidEvent,
    OrderPlacedEvent,
    OrderStatusChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_placed_producer: Vec<EventProducer<OrderPlacedEvent>>,
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub feedback_requested_producer: Vec<EventProducer<FeedbackRequestedEvent>>,
}

pub struct EventHandlers {
    pub on_order_placed: Option<EventHandler<OrderPlacedEvent>>,
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_feedback_requested: Option<EventHandler<FeedbackRequestedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_placed = hooks.on_order_placed.map(|f| EventHandler::new(buffer_size, f));
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_feedback_requested = hooks.on_feedback_requested.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_placed, on_status_changed, on_order_paid, on_feedback_requested }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_placed {
            result.order_placed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_feedback_requested {
            result.feedback_requested_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_placed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_feedback_requested {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_placed: Option<Handler<OrderPlacedEvent>>,
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_feedback_requested: Option<Handler<FeedbackRequestedEvent>>,
}

impl EventHooks {
    pub fn on_order_placed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPlacedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_placed = Some(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_feedback_requested<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(FeedbackRequestedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_feedback_requested = Some(Arc::new(f));
        self
    }
}

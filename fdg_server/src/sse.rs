//! Server-sent event streams for live order views.
//!
//! Every frame carries a JSON `data` line and a named `event`:
//! * `change` - a [`ChangeNotification`], e.g. `{"kind":"update","order_id":"FDG-..."}`. Clients re-fetch the order.
//! * `feedback_requested` - `{"order_id":"FDG-..."}`. Sent once per view, when the order is delivered and unrated.
//!
//! The stream ends when the client disconnects. Dropping the stream drops the underlying subscription, which removes
//! it from the sync hub.
use std::convert::Infallible;

use actix_web::{http::header::CACHE_CONTROL, HttpResponse};
use bytes::Bytes;
use fdg_engine::{
    engine_api::feedback::{OrderViewEvent, OrderViewSession},
    events::{ChangeNotification, Subscription},
    traits::DeliveryDatabase,
};
use futures::{stream, Stream};
use log::*;
use serde::Serialize;
use serde_json::json;

pub const CHANGE_EVENT: &str = "change";
pub const FEEDBACK_EVENT: &str = "feedback_requested";

pub fn sse_frame<T: Serialize>(event: &str, data: &T) -> Bytes {
    let data = serde_json::to_string(data).unwrap_or_else(|e| {
        warn!("💻️ Could not serialize {event} event. {e}");
        "{}".to_string()
    });
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

fn change_frame(note: &ChangeNotification) -> Bytes {
    sse_frame(CHANGE_EVENT, note)
}

pub fn sse_response<S>(stream: S) -> HttpResponse
where S: Stream<Item = Result<Bytes, Infallible>> + 'static {
    HttpResponse::Ok().content_type("text/event-stream").insert_header((CACHE_CONTROL, "no-cache")).streaming(stream)
}

/// Streams every notification on the subscription.
pub fn subscription_stream(subscription: Subscription) -> impl Stream<Item = Result<Bytes, Infallible>> {
    stream::unfold(subscription, |mut sub| async move {
        let note = sub.recv().await?;
        Some((Ok(change_frame(&note)), sub))
    })
}

/// Streams the events of a single-order view, including the feedback prompt.
pub fn order_view_stream<B>(session: OrderViewSession<B>) -> impl Stream<Item = Result<Bytes, Infallible>>
where B: DeliveryDatabase + 'static {
    stream::unfold(session, |mut session| async move {
        let frame = match session.next_event().await? {
            OrderViewEvent::Changed(note) => change_frame(&note),
            OrderViewEvent::FeedbackRequested(order_id) => {
                debug!("💻️ Asking the viewer of [{order_id}] for feedback");
                sse_frame(FEEDBACK_EVENT, &json!({ "order_id": order_id }))
            },
        };
        Some((Ok(frame), session))
    })
}

#[cfg(test)]
mod test {
    use fdg_engine::{
        db_types::OrderId,
        events::{ChangeKind, SyncHub, SyncScope},
    };
    use futures::StreamExt;

    use super::*;

    #[test]
    fn frames_are_named_json_events() {
        let frame = sse_frame(FEEDBACK_EVENT, &json!({ "order_id": "FDG-1234" }));
        assert_eq!(frame, Bytes::from("event: feedback_requested\ndata: {\"order_id\":\"FDG-1234\"}\n\n"));
    }

    #[tokio::test]
    async fn subscription_streams_end_with_the_subscription() {
        let hub = SyncHub::new();
        let sub = hub.subscribe(SyncScope::AllOrders);
        let note = ChangeNotification {
            kind: ChangeKind::Update,
            order_id: OrderId::from("FDG-1234"),
            customer_id: "alice".into(),
        };
        hub.publish(note);
        let mut stream = Box::pin(subscription_stream(sub));
        let frame = stream.next().await.unwrap().unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert_eq!(text, "event: change\ndata: {\"kind\":\"update\",\"order_id\":\"FDG-1234\"}\n\n");
        assert_eq!(hub.subscriber_count(), 1);
        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }
}

use async_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace notifications handed to the delivery layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Event {
    BidPlaced {
        booking_id: Uuid,
        bid_id: Uuid,
        driver_id: Uuid,
        amount: f64,
    },
    BidAccepted {
        booking_id: Uuid,
        bid_id: Uuid,
        driver_id: Uuid,
    },
    BidsRejected {
        booking_id: Uuid,
        bid_ids: Vec<Uuid>,
    },
    BiddingExpired {
        booking_id: Uuid,
        expired_bid_ids: Vec<Uuid>,
    },
    BookingCancelled {
        booking_id: Uuid,
    },
    BookingCompleted {
        booking_id: Uuid,
        driver_id: Uuid,
        commission_amount: f64,
    },
}

/// Fire-and-forget publisher. Publishing never blocks and never fails the
/// operation that triggered it; undeliverable events are logged and dropped.
#[derive(Clone, Debug)]
pub struct EventSink {
    sender: Sender<Event>,
}

pub fn channel(capacity: usize) -> (EventSink, Receiver<Event>) {
    let (sender, receiver) = async_channel::bounded(capacity.max(1));

    (EventSink { sender }, receiver)
}

impl EventSink {
    pub fn publish(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "event buffer full, dropping notification");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(?event, "no event consumer, dropping notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_delivers_in_order() {
        let (sink, receiver) = channel(4);
        let booking_id = Uuid::new_v4();

        sink.publish(Event::BookingCancelled { booking_id });
        sink.publish(Event::BidsRejected {
            booking_id,
            bid_ids: vec![],
        });

        assert_eq!(
            receiver.try_recv().unwrap(),
            Event::BookingCancelled { booking_id }
        );
        assert!(matches!(
            receiver.try_recv().unwrap(),
            Event::BidsRejected { .. }
        ));
    }

    #[test]
    fn publish_never_blocks_when_full_or_closed() {
        let (sink, receiver) = channel(1);
        let booking_id = Uuid::new_v4();

        sink.publish(Event::BookingCancelled { booking_id });
        sink.publish(Event::BookingCancelled { booking_id });
        assert_eq!(receiver.len(), 1);

        drop(receiver);
        sink.publish(Event::BookingCancelled { booking_id });
    }

    #[test]
    fn events_serialize_with_name_tag() {
        let value = serde_json::to_value(Event::BookingCancelled {
            booking_id: Uuid::nil(),
        })
        .unwrap();

        assert_eq!(value["name"], "booking_cancelled");
    }
}

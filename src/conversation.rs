//! One two-way conversation with a remote destination number.
//!
//! A conversation owns an append-only message log and a single waiter slot.
//! Inbound messages are handed in by the dispatcher via `deliver`; test code
//! suspends in `wait_for`/`wait_for_count` until enough of them arrive.
//!
//! Waiting uses the durable-queue model: inbound messages that arrive while
//! no wait is outstanding are buffered and consumed, in delivery order, by
//! the next wait. Delivery order is the order the dispatcher observed the
//! carrier's notifications, which is the only order the carrier exposes.

use crate::error::{TransportError, WaitError};
use crate::message::{Address, Message};
use crate::registry::RegistryInner;
use crate::transport::Transport;
use crate::util::preview;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

/// What a resolved waiter hands back to the suspended caller.
enum WaitOutcome {
    Messages(Vec<Message>),
    Superseded,
}

struct Waiter {
    /// How many inbound messages this wait needs in total.
    needed: usize,
    /// Messages claimed so far, oldest first.
    collected: Vec<Message>,
    tx: oneshot::Sender<WaitOutcome>,
    /// Distinguishes this waiter from a successor when cleaning up after a
    /// timeout.
    generation: u64,
}

struct ConversationState {
    log: Vec<Message>,
    /// Inbound messages not yet claimed by any wait, oldest first.
    unclaimed: VecDeque<Message>,
    waiter: Option<Waiter>,
    next_generation: u64,
}

/// State shared between the test-side handle and the registry entry.
pub(crate) struct Shared {
    destination: Address,
    source: Address,
    transport: Arc<dyn Transport>,
    state: Mutex<ConversationState>,
}

impl Shared {
    pub(crate) fn new(
        destination: Address,
        source: Address,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            destination,
            source,
            transport,
            state: Mutex::new(ConversationState {
                log: Vec::new(),
                unclaimed: VecDeque::new(),
                waiter: None,
                next_generation: 0,
            }),
        }
    }

    /// Append an inbound message and resolve the outstanding waiter if its
    /// count is now met. Called only from the dispatcher path.
    pub(crate) fn deliver(&self, message: Message) {
        let mut state = self.state.lock();
        state.log.push(message.clone());

        match state.waiter.take() {
            Some(mut waiter) => {
                waiter.collected.push(message);
                if waiter.collected.len() >= waiter.needed {
                    if let Err(outcome) = waiter.tx.send(WaitOutcome::Messages(waiter.collected)) {
                        // The waiting task went away without cleaning up its
                        // slot; its messages stay consumable by a later wait.
                        if let WaitOutcome::Messages(messages) = outcome {
                            state.unclaimed.extend(messages);
                        }
                    }
                } else {
                    state.waiter = Some(waiter);
                }
            }
            None => state.unclaimed.push_back(message),
        }
    }
}

/// Handle to an active conversation, returned by `Registry::create`.
///
/// Dropping the handle disposes the conversation, so registration is released
/// on every exit path of the test that created it.
pub struct Conversation {
    shared: Arc<Shared>,
    registry: Weak<RegistryInner>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("destination", &self.shared.destination)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    pub(crate) fn new(shared: Arc<Shared>, registry: Weak<RegistryInner>) -> Self {
        Self { shared, registry }
    }

    pub fn destination(&self) -> &Address {
        &self.shared.destination
    }

    /// Send `body` to the destination through the carrier.
    ///
    /// The outbound message is appended to the log only after the carrier
    /// accepts it; a transport failure leaves the log untouched.
    pub async fn send(&self, body: &str) -> Result<Message, TransportError> {
        let message = self
            .shared
            .transport
            .send(&self.shared.destination, &self.shared.source, body)
            .await?;
        tracing::debug!(
            to = %self.shared.destination,
            id = %message.id,
            "sent {}",
            preview(body, 50)
        );
        self.shared.state.lock().log.push(message.clone());
        Ok(message)
    }

    /// Wait for the next inbound message.
    pub async fn wait_for(&self, timeout: Duration) -> Result<Message, WaitError> {
        let mut messages = self.wait_for_count(1, timeout).await?;
        Ok(messages.remove(0))
    }

    /// Wait until `count` inbound messages have accumulated and return them
    /// in delivery order.
    ///
    /// Messages already buffered before this call count toward `count`. A new
    /// wait supersedes an outstanding one: the earlier caller wakes with
    /// [`WaitError::Superseded`] and any messages it had claimed become
    /// available again. `count == 0` returns immediately with no messages.
    pub async fn wait_for_count(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Message>, WaitError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let (mut rx, generation) = {
            let mut state = self.shared.state.lock();

            if let Some(old) = state.waiter.take() {
                // The superseded waiter's claimed messages predate everything
                // currently unclaimed, so they go back to the front.
                for message in old.collected.into_iter().rev() {
                    state.unclaimed.push_front(message);
                }
                let _ = old.tx.send(WaitOutcome::Superseded);
            }

            let mut collected = Vec::with_capacity(count);
            while collected.len() < count {
                match state.unclaimed.pop_front() {
                    Some(message) => collected.push(message),
                    None => break,
                }
            }
            if collected.len() >= count {
                return Ok(collected);
            }

            let (tx, rx) = oneshot::channel();
            let generation = state.next_generation;
            state.next_generation += 1;
            state.waiter = Some(Waiter {
                needed: count,
                collected,
                tx,
                generation,
            });
            (rx, generation)
        };

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(WaitOutcome::Messages(messages))) => Ok(messages),
            Ok(Ok(WaitOutcome::Superseded)) => Err(WaitError::Superseded),
            // The slot was dropped without resolving; only happens when the
            // conversation is torn down mid-wait.
            Ok(Err(_)) => Err(WaitError::Superseded),
            Err(_elapsed) => {
                let reclaimed = {
                    let mut state = self.shared.state.lock();
                    match state.waiter.take() {
                        Some(waiter) if waiter.generation == generation => {
                            for message in waiter.collected.into_iter().rev() {
                                state.unclaimed.push_front(message);
                            }
                            true
                        }
                        other => {
                            state.waiter = other;
                            false
                        }
                    }
                };
                if !reclaimed {
                    // Our waiter is gone: a delivery or supersede resolved it
                    // in the window between the deadline and the lock.
                    match rx.try_recv() {
                        Ok(WaitOutcome::Messages(messages)) => return Ok(messages),
                        Ok(WaitOutcome::Superseded) => return Err(WaitError::Superseded),
                        Err(_) => {}
                    }
                }
                Err(WaitError::Timeout { waited: timeout })
            }
        }
    }

    /// Snapshot of the full message log, oldest first.
    pub fn log(&self) -> Vec<Message> {
        self.shared.state.lock().log.clone()
    }

    /// Remove this conversation from its registry. Idempotent; also runs on
    /// drop. Later inbound notifications for the destination are dropped.
    pub fn dispose(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_entry(&self.shared.destination, &self.shared);
        }
    }
}

impl Drop for Conversation {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Direction;
    use crate::registry::Registry;
    use crate::transport::mock::MockCarrier;

    fn setup() -> (Arc<MockCarrier>, Registry) {
        let carrier = Arc::new(MockCarrier::new());
        let registry = Registry::new(carrier.clone(), Address::new("+15550001111"));
        (carrier, registry)
    }

    fn inbound(to: &Conversation, body: &str) -> Message {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            from: to.destination().clone(),
            to: Address::new("+15550001111"),
            body: body.to_string(),
            direction: Direction::Inbound,
        };
        to.shared.deliver(message.clone());
        message
    }

    #[tokio::test]
    async fn send_appends_to_log_and_returns_record() {
        let (carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        let sent = conv.send("Hi").await.unwrap();
        assert_eq!(sent.body, "Hi");
        assert_eq!(sent.direction, Direction::Outbound);
        assert_eq!(sent.to, *conv.destination());
        assert_eq!(conv.log(), vec![sent]);
        assert_eq!(carrier.sent().len(), 1);
    }

    #[tokio::test]
    async fn send_failure_propagates_and_leaves_log_unchanged() {
        let (carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        carrier.fail_next_send("carrier unavailable");
        let err = conv.send("Hi").await.unwrap_err();
        assert!(err.to_string().contains("transport"));
        assert!(conv.log().is_empty());
        assert!(carrier.sent().is_empty());
    }

    #[tokio::test]
    async fn buffered_deliveries_satisfy_a_later_wait_in_order() {
        let (_carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        inbound(&conv, "one");
        inbound(&conv, "two");
        inbound(&conv, "three");

        let messages = conv
            .wait_for_count(2, Duration::from_secs(5))
            .await
            .unwrap();
        let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["one", "two"]);

        // The third delivery is still buffered for the next wait.
        let third = conv.wait_for(Duration::from_secs(5)).await.unwrap();
        assert_eq!(third.body, "three");
    }

    #[tokio::test]
    async fn wait_resolves_when_delivery_arrives_later() {
        let (_carrier, registry) = setup();
        let conv = Arc::new(registry.create(Address::new("+15551230000")).unwrap());

        let waiter = {
            let conv = conv.clone();
            tokio::spawn(async move { conv.wait_for(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        inbound(&conv, "Welcome.");

        let message = waiter.await.unwrap().unwrap();
        assert_eq!(message.body, "Welcome.");
    }

    #[tokio::test]
    async fn count_wait_issued_first_gets_the_first_n_in_order() {
        let (_carrier, registry) = setup();
        let conv = Arc::new(registry.create(Address::new("+15551230000")).unwrap());

        let waiter = {
            let conv = conv.clone();
            tokio::spawn(async move { conv.wait_for_count(2, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        inbound(&conv, "one");
        inbound(&conv, "two");
        inbound(&conv, "three");

        let messages = waiter.await.unwrap().unwrap();
        let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["one", "two"]);
    }

    #[tokio::test]
    async fn wait_times_out_without_deliveries() {
        let (_carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        let started = std::time::Instant::now();
        let err = conv.wait_for(Duration::from_millis(100)).await.unwrap_err();
        assert_eq!(
            err,
            WaitError::Timeout {
                waited: Duration::from_millis(100)
            }
        );
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn partial_wait_reclaims_messages_on_timeout() {
        let (_carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        inbound(&conv, "only one");
        let err = conv
            .wait_for_count(2, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));

        // The claimed message went back to the buffer.
        let message = conv.wait_for(Duration::from_secs(5)).await.unwrap();
        assert_eq!(message.body, "only one");
    }

    #[tokio::test]
    async fn new_wait_supersedes_outstanding_one() {
        let (_carrier, registry) = setup();
        let conv = Arc::new(registry.create(Address::new("+15551230000")).unwrap());

        let first = {
            let conv = conv.clone();
            tokio::spawn(async move { conv.wait_for(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = {
            let conv = conv.clone();
            tokio::spawn(async move { conv.wait_for(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(first.await.unwrap(), Err(WaitError::Superseded));

        inbound(&conv, "for the second wait");
        let message = second.await.unwrap().unwrap();
        assert_eq!(message.body, "for the second wait");
    }

    #[tokio::test]
    async fn wait_for_zero_messages_returns_immediately() {
        let (_carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        let messages = conv
            .wait_for_count(0, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn log_keeps_both_directions_in_order() {
        let (_carrier, registry) = setup();
        let conv = registry.create(Address::new("+15551230000")).unwrap();

        conv.send("Hi").await.unwrap();
        inbound(&conv, "Hello yourself");
        conv.send("Bye").await.unwrap();

        let bodies: Vec<_> = conv.log().into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, ["Hi", "Hello yourself", "Bye"]);
    }
}

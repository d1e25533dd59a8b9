//! Event bus with typed pub/sub for Home Assistant
//!
//! The EventBus is the message broker between the host and its
//! integrations. Consumers either hold a broadcast receiver (`subscribe`)
//! or register a callback listener (`listen`, `listen_once`) that runs on
//! its own Tokio task.

use dashmap::DashMap;
use ha_core::{Context, Event, EventData, EventType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A unique identifier for an event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The event bus for publishing and subscribing to events
pub struct EventBus {
    /// Broadcast sender per event type
    listeners: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
    /// Sender for MATCH_ALL subscribers
    match_all_sender: broadcast::Sender<Event<serde_json::Value>>,
    next_listener_id: AtomicU64,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            next_listener_id: AtomicU64::new(1),
            capacity,
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(
        &self,
        event_type: impl Into<EventType>,
    ) -> broadcast::Receiver<Event<serde_json::Value>> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");

        if event_type.is_match_all() {
            return self.match_all_sender.subscribe();
        }

        self.listeners
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to a typed event, skipping payloads that fail to decode
    pub fn subscribe_typed<T: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> TypedEventReceiver<T> {
        TypedEventReceiver::new(self.subscribe(T::event_type()))
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event<serde_json::Value>> {
        self.match_all_sender.subscribe()
    }

    /// Run `callback` for every event of `event_type`
    ///
    /// The subscription is taken before this returns, so no event fired
    /// afterwards is missed. Must be called from within a Tokio runtime.
    pub fn listen<F>(&self, event_type: impl Into<EventType>, callback: F) -> ListenerHandle
    where
        F: Fn(&Event<serde_json::Value>) + Send + Sync + 'static,
    {
        self.spawn_listener(event_type.into(), callback, false)
    }

    /// Run `callback` for the next event of `event_type` only
    pub fn listen_once<F>(&self, event_type: impl Into<EventType>, callback: F) -> ListenerHandle
    where
        F: Fn(&Event<serde_json::Value>) + Send + Sync + 'static,
    {
        self.spawn_listener(event_type.into(), callback, true)
    }

    fn spawn_listener<F>(&self, event_type: EventType, callback: F, once: bool) -> ListenerHandle
    where
        F: Fn(&Event<serde_json::Value>) + Send + Sync + 'static,
    {
        let id = self.next_listener_id();
        let mut rx = self.subscribe(event_type.clone());
        debug!(event_type = %event_type, listener = id.0, once, "Adding listener");

        let task_event_type = event_type.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        callback(&event);
                        if once {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            event_type = %task_event_type,
                            skipped,
                            "Listener lagged behind, events dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            trace!(event_type = %task_event_type, listener = id.0, "Listener finished");
        });

        ListenerHandle {
            id,
            event_type,
            task,
        }
    }

    /// Fire an event to all subscribers
    ///
    /// Delivered to subscribers of the event type and to MATCH_ALL subscribers.
    pub fn fire(&self, event: Event<serde_json::Value>) {
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.listeners.get(&event.event_type) {
            // A send error only means nobody is listening
            let _ = sender.send(event.clone());
        }

        let _ = self.match_all_sender.send(event);
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        let json_data = match serde_json::to_value(&data) {
            Ok(value) => value,
            Err(e) => {
                warn!(event_type = T::event_type(), "Dropping unserializable event: {}", e);
                return;
            }
        };
        self.fire(Event::new(T::event_type(), json_data, context));
    }

    pub fn next_listener_id(&self) -> ListenerId {
        ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Number of live receivers for an event type
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .get(&EventType::new(event_type))
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a callback listener started with `listen` or `listen_once`
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    event_type: EventType,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Whether the listener has stopped (fired once, or removed)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop listening
    pub fn remove(self) {
        debug!(event_type = %self.event_type, listener = self.id.0, "Removing listener");
        self.task.abort();
    }
}

/// A receiver for typed events
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<Event<serde_json::Value>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: EventData + serde::de::DeserializeOwned> TypedEventReceiver<T> {
    fn new(rx: broadcast::Receiver<Event<serde_json::Value>>) -> Self {
        Self {
            rx,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Receive the next event whose payload decodes as `T`
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(Event {
                    event_type: event.event_type,
                    data,
                    origin: event.origin,
                    time_fired: event.time_fired,
                    context: event.context,
                });
            }
        }
    }

    /// Non-blocking variant of `recv`; None when nothing decodable is queued
    pub fn try_recv(&mut self) -> Option<Event<T>> {
        while let Ok(event) = self.rx.try_recv() {
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Some(Event {
                    event_type: event.event_type,
                    data,
                    origin: event.origin,
                    time_fired: event.time_fired,
                    context: event.context,
                });
            }
        }
        None
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
In-process transport.

Services, subscriptions and publisher counts live in one shared table.
Incoming bag-of-words batches and shutdown calls are queued and delivered on
the next `spin_once`, the same point at which a networked bus would run its
callbacks. Freespace calls are answered synchronously on the caller's thread.
*/

use ahash::AHashMap;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    BowHandler, FreespaceHandler, Registration, ShutdownHandler, Transport, CLOCK_TOPIC,
};
use crate::bow::BowQueries;
use crate::error::TransportError;
use crate::freespace::{FreespaceRequest, FreespaceResponse};

const DEFAULT_SPIN_PERIOD: Duration = Duration::from_millis(20);

struct BowSubscription {
    queue_size: usize,
    handler: BowHandler,
    pending: VecDeque<BowQueries>,
}

#[derive(Default)]
struct LocalState {
    freespace_services: AHashMap<String, FreespaceHandler>,
    shutdown_services: AHashMap<String, ShutdownHandler>,
    bow_subscriptions: AHashMap<String, BowSubscription>,
    publishers: AHashMap<String, usize>,
    clock_subscribers: usize,
    pending_shutdown_calls: Vec<String>,
}

fn release_with<F>(state: &Arc<Mutex<LocalState>>, name: &str, release: F) -> Registration
where
    F: FnOnce(&mut LocalState) + Send + 'static,
{
    let weak: Weak<Mutex<LocalState>> = Arc::downgrade(state);
    Registration::new(name, move || {
        if let Some(state) = weak.upgrade() {
            release(&mut *state.lock());
        }
    })
}

/// In-memory message bus
pub struct LocalTransport {
    state: Arc<Mutex<LocalState>>,
    running: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    spin_period: Duration,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::with_spin_period(DEFAULT_SPIN_PERIOD)
    }

    /// Transport whose blocking `spin` polls every `spin_period`
    pub fn with_spin_period(spin_period: Duration) -> Self {
        let (wake_tx, wake_rx) = channel::bounded(1);
        Self {
            state: Arc::new(Mutex::new(LocalState::default())),
            running: AtomicBool::new(true),
            wake_tx,
            wake_rx,
            spin_period,
        }
    }

    /// Advertise a publisher on `topic` until the returned handle is dropped
    pub fn advertise_publisher(&self, topic: &str) -> Registration {
        *self
            .state
            .lock()
            .publishers
            .entry(topic.to_string())
            .or_insert(0) += 1;
        debug!("[LOCAL-TRANSPORT] Publisher advertised on {}", topic);

        let topic_name = topic.to_string();
        release_with(&self.state, topic, move |state| {
            if let Some(count) = state.publishers.get_mut(&topic_name) {
                *count = count.saturating_sub(1);
            }
        })
    }

    /// Nudge a blocked `spin`; one pending wake-up is enough
    fn wake(&self) {
        let _ = self.wake_tx.try_send(());
    }

    /// Queue `batch` for the subscriber of `topic`
    ///
    /// Returns `false` when nobody is subscribed. A full subscription queue
    /// drops its oldest batch.
    pub fn publish_bow_queries(&self, topic: &str, batch: BowQueries) -> bool {
        let mut state = self.state.lock();
        let Some(subscription) = state.bow_subscriptions.get_mut(topic) else {
            return false;
        };
        if subscription.queue_size > 0 && subscription.pending.len() >= subscription.queue_size {
            subscription.pending.pop_front();
            warn!("[LOCAL-TRANSPORT] Subscription queue for {} full; dropped oldest batch", topic);
        }
        subscription.pending.push_back(batch);
        drop(state);
        self.wake();
        true
    }

    /// Call a freespace service on the caller's thread
    pub fn call_freespace(
        &self,
        service: &str,
        request: &FreespaceRequest,
    ) -> Result<FreespaceResponse, TransportError> {
        let handler = self
            .state
            .lock()
            .freespace_services
            .get(service)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(service.to_string()))?;
        handler(request).map_err(TransportError::from)
    }

    /// Request a shutdown service; the handler runs on the next `spin_once`
    pub fn call_shutdown(&self, service: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.shutdown_services.contains_key(service) {
            return Err(TransportError::NotFound(service.to_string()));
        }
        state.pending_shutdown_calls.push(service.to_string());
        drop(state);
        self.wake();
        Ok(())
    }

    pub fn has_service(&self, name: &str) -> bool {
        let state = self.state.lock();
        state.freespace_services.contains_key(name) || state.shutdown_services.contains_key(name)
    }

    /// Queue depth of the subscription on `topic`, if any
    pub fn subscription_queue_size(&self, topic: &str) -> Option<usize> {
        self.state
            .lock()
            .bow_subscriptions
            .get(topic)
            .map(|s| s.queue_size)
    }

    pub fn clock_subscribers(&self) -> usize {
        self.state.lock().clock_subscribers
    }

    /// Deliver queued events; returns how many handlers ran
    pub fn process_pending(&self) -> usize {
        let (bow_deliveries, shutdown_handlers) = {
            let mut state = self.state.lock();
            let mut bow_deliveries = Vec::new();
            for subscription in state.bow_subscriptions.values_mut() {
                for batch in subscription.pending.drain(..) {
                    bow_deliveries.push((Arc::clone(&subscription.handler), batch));
                }
            }
            let calls = std::mem::take(&mut state.pending_shutdown_calls);
            let shutdown_handlers: Vec<ShutdownHandler> = calls
                .iter()
                .filter_map(|name| state.shutdown_services.get(name).cloned())
                .collect();
            (bow_deliveries, shutdown_handlers)
        };

        let delivered = bow_deliveries.len() + shutdown_handlers.len();
        for (handler, batch) in bow_deliveries {
            handler(&batch);
        }
        for handler in shutdown_handlers {
            handler();
        }
        delivered
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    fn ok(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn spin_once(&self) {
        self.process_pending();
    }

    fn spin(&self) {
        while self.ok() {
            self.process_pending();
            let _ = self.wake_rx.recv_timeout(self.spin_period);
        }
        self.process_pending();
    }

    fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("[LOCAL-TRANSPORT] Shutdown requested");
        }
        self.wake();
    }

    fn num_publishers(&self, topic: &str) -> usize {
        self.state.lock().publishers.get(topic).copied().unwrap_or(0)
    }

    fn subscribe_clock(&self) -> Result<Registration, TransportError> {
        self.state.lock().clock_subscribers += 1;
        Ok(release_with(&self.state, CLOCK_TOPIC, |state| {
            state.clock_subscribers = state.clock_subscribers.saturating_sub(1);
        }))
    }

    fn advertise_freespace_service(
        &self,
        name: &str,
        handler: FreespaceHandler,
    ) -> Result<Registration, TransportError> {
        let mut state = self.state.lock();
        if state.freespace_services.contains_key(name) {
            return Err(TransportError::AlreadyRegistered(name.to_string()));
        }
        state.freespace_services.insert(name.to_string(), handler);
        drop(state);

        let service = name.to_string();
        Ok(release_with(&self.state, name, move |state| {
            state.freespace_services.remove(&service);
        }))
    }

    fn subscribe_bow_queries(
        &self,
        topic: &str,
        queue_size: usize,
        handler: BowHandler,
    ) -> Result<Registration, TransportError> {
        let mut state = self.state.lock();
        if state.bow_subscriptions.contains_key(topic) {
            return Err(TransportError::AlreadyRegistered(topic.to_string()));
        }
        state.bow_subscriptions.insert(
            topic.to_string(),
            BowSubscription {
                queue_size,
                handler,
                pending: VecDeque::new(),
            },
        );
        drop(state);

        let topic_name = topic.to_string();
        Ok(release_with(&self.state, topic, move |state| {
            state.bow_subscriptions.remove(&topic_name);
        }))
    }

    fn advertise_shutdown_service(
        &self,
        name: &str,
        handler: ShutdownHandler,
    ) -> Result<Registration, TransportError> {
        let mut state = self.state.lock();
        if state.shutdown_services.contains_key(name) {
            return Err(TransportError::AlreadyRegistered(name.to_string()));
        }
        state.shutdown_services.insert(name.to_string(), handler);
        drop(state);

        let service = name.to_string();
        Ok(release_with(&self.state, name, move |state| {
            state.shutdown_services.remove(&service);
        }))
    }
}

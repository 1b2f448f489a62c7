//! Observable request state on top of a [`Repository`].
//!
//! A [`DataStore`] keeps one [`AsyncResult`] per list [`RequestKey`], one for
//! the selected entity and one per sum/balance key. Each request runs on its
//! own Tokio task; issuing a request for a key that is already in flight
//! cancels the previous task and bumps the key's generation, so the most
//! recently issued request always wins.
//!
//! Every transition is announced as a [`StoreEvent`] on a broadcast channel.
//! Observers read the new state through the getters.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::broadcast;

use crate::{
    Budget, Transaction,
    async_result::AsyncResult,
    entity::Entity,
    error::NetworkError,
    repository::{RemoteSource, Repository, SumSource},
    request_key::RequestKey,
};
use api_types::transaction::SumQuery;
use slot::Slot;

mod slot;

const EVENT_CAPACITY: usize = 64;

/// Which piece of state changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    List(RequestKey),
    Selected,
    Sum(RequestKey),
}

struct Registry<E> {
    lists: HashMap<RequestKey, Slot<Vec<E>>>,
    selected: Slot<E>,
    sums: HashMap<RequestKey, Slot<i64>>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            lists: HashMap::new(),
            selected: Slot::default(),
            sums: HashMap::new(),
        }
    }
}

/// Addresses one slot of the registry.
trait Locate<E, T>: Clone + Send + 'static {
    fn slot<'a>(&self, registry: &'a mut Registry<E>) -> &'a mut Slot<T>;
    fn event(&self) -> StoreEvent;
}

#[derive(Clone)]
struct ListAt(RequestKey);

impl<E: Entity> Locate<E, Vec<E>> for ListAt {
    fn slot<'a>(&self, registry: &'a mut Registry<E>) -> &'a mut Slot<Vec<E>> {
        registry.lists.entry(self.0.clone()).or_default()
    }

    fn event(&self) -> StoreEvent {
        StoreEvent::List(self.0.clone())
    }
}

#[derive(Clone, Copy)]
struct Selected;

impl<E: Entity> Locate<E, E> for Selected {
    fn slot<'a>(&self, registry: &'a mut Registry<E>) -> &'a mut Slot<E> {
        &mut registry.selected
    }

    fn event(&self) -> StoreEvent {
        StoreEvent::Selected
    }
}

#[derive(Clone)]
struct SumAt(RequestKey);

impl<E: Entity> Locate<E, i64> for SumAt {
    fn slot<'a>(&self, registry: &'a mut Registry<E>) -> &'a mut Slot<i64> {
        registry.sums.entry(self.0.clone()).or_default()
    }

    fn event(&self) -> StoreEvent {
        StoreEvent::Sum(self.0.clone())
    }
}

fn lock<E>(registry: &Mutex<Registry<E>>) -> MutexGuard<'_, Registry<E>> {
    // Slots are only mutated through small non-panicking methods.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DataStore<E, S> {
    repository: Repository<E, S>,
    registry: Arc<Mutex<Registry<E>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl<E, S> Clone for DataStore<E, S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
        }
    }
}

impl<E, S> DataStore<E, S>
where
    E: Entity,
    S: RemoteSource<E>,
{
    pub fn new(repository: Repository<E, S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            repository,
            registry: Arc::new(Mutex::new(Registry::default())),
            events,
        }
    }

    pub fn repository(&self) -> &Repository<E, S> {
        &self.repository
    }

    /// Receives one event per state transition, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Starts loading the list for `query` and returns its key.
    ///
    /// The key is Loading when this returns. A request already in flight for
    /// the same key is cancelled and its result discarded.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn request(&self, query: E::Query) -> RequestKey {
        let key = RequestKey::list::<E>(&query);
        tracing::debug!("requesting {key}");

        let repository = self.repository.clone();
        self.spawn(ListAt(key.clone()), async move {
            repository.list(&query).await
        });
        key
    }

    /// Current state for `key`, Empty if it was never requested.
    pub fn list_state(&self, key: &RequestKey) -> AsyncResult<Vec<E>, NetworkError> {
        lock(&self.registry)
            .lists
            .get(key)
            .map(Slot::state)
            .unwrap_or_default()
    }

    /// Keys that have been requested so far.
    pub fn keys(&self) -> Vec<RequestKey> {
        lock(&self.registry).lists.keys().cloned().collect()
    }

    /// Cancels the in-flight request for `key`, leaving its state as is.
    pub fn cancel(&self, key: &RequestKey) {
        if let Some(slot) = lock(&self.registry).lists.get_mut(key) {
            if slot.cancel() {
                tracing::debug!("cancelled {key}");
            }
        }
    }

    pub fn selected(&self) -> AsyncResult<E, NetworkError> {
        lock(&self.registry).selected.state()
    }

    /// Loads one entity into the selected slot.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn load(&self, id: &str) {
        let repository = self.repository.clone();
        let id = id.to_string();
        self.spawn(Selected, async move { repository.get(&id).await });
    }

    /// Shows an entity the caller already holds, without a network round trip.
    pub fn select(&self, entity: E) {
        self.replace_selected(AsyncResult::Success(entity));
    }

    /// Resets the selected slot to Empty.
    pub fn clear(&self) {
        self.replace_selected(AsyncResult::Empty);
    }

    /// Creates or updates `entity` and adopts the server's representation.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn save(&self, entity: E) {
        let repository = self.repository.clone();
        self.spawn(Selected, async move { repository.save(&entity).await });
    }

    /// Deletes an entity. On success the selected slot holds
    /// [`NetworkError::Deleted`].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn delete(&self, id: &str) {
        let repository = self.repository.clone();
        let id = id.to_string();
        self.spawn(Selected, async move {
            repository.delete(&id).await?;
            Err::<E, _>(NetworkError::Deleted)
        });
    }

    /// Current state of a sum or balance request.
    pub fn sum_state(&self, key: &RequestKey) -> AsyncResult<i64, NetworkError> {
        lock(&self.registry)
            .sums
            .get(key)
            .map(Slot::state)
            .unwrap_or_default()
    }

    fn replace_selected(&self, state: AsyncResult<E, NetworkError>) {
        let mut registry = lock(&self.registry);
        registry.selected.replace(state);
        let _ = self.events.send(StoreEvent::Selected);
    }

    fn spawn<T, L, F>(&self, at: L, work: F)
    where
        T: Send + 'static,
        L: Locate<E, T>,
        F: Future<Output = Result<T, NetworkError>> + Send + 'static,
    {
        // The registry stays locked until the task handle is attached, so a
        // concurrent request for the same slot cannot interleave.
        let mut registry = lock(&self.registry);
        let generation = at.slot(&mut *registry).begin();
        let _ = self.events.send(at.event());

        let shared = Arc::clone(&self.registry);
        let events = self.events.clone();
        let target = at.clone();
        let task = tokio::spawn(async move {
            let result = work.await;
            let mut registry = lock(&shared);
            if target.slot(&mut *registry).finish(generation, result) {
                let _ = events.send(target.event());
            } else {
                tracing::debug!("discarded superseded result for {:?}", target.event());
            }
        });

        at.slot(&mut *registry).attach(generation, task.abort_handle());
    }
}

impl<S> DataStore<Transaction, S>
where
    S: RemoteSource<Transaction> + SumSource,
{
    /// Starts a sum request and returns its key; read it with [`Self::sum_state`].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn request_sum(&self, query: SumQuery) -> RequestKey {
        let key = RequestKey::new("transaction/sum", &query);
        let repository = self.repository.clone();
        self.spawn(SumAt(key.clone()), async move {
            repository.sum(&query).await
        });
        key
    }
}

impl<S> DataStore<Budget, S>
where
    S: RemoteSource<Budget> + SumSource,
{
    /// Starts a balance request for a budget; read it with [`Self::sum_state`].
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn request_balance(&self, budget_id: &str) -> RequestKey {
        let key = RequestKey::new("budget/balance", &budget_id);
        let repository = self.repository.clone();
        let budget_id = budget_id.to_string();
        self.spawn(SumAt(key.clone()), async move {
            repository.balance(&budget_id).await
        });
        key
    }
}

//! Process-wide in-memory cache.
//!
//! Entities are kept by id and list results by [`RequestKey`]. The two views
//! are independent: putting an entity never patches a cached list. Entries
//! live until they are explicitly invalidated.
//!
//! Every invalidation bumps the shelf's [`Epoch`]. A fetch that started
//! before an invalidation stores its result with [`Cache::put_list_if`] or
//! [`Cache::put_entity_if`], which refuse to write once the epoch moved on.

use std::{
    collections::HashMap,
    fmt,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{Budget, Category, Transaction, User, entity::Entity, request_key::RequestKey};

/// Cached data of one entity kind.
pub struct Shelf<E> {
    inner: RwLock<ShelfInner<E>>,
}

struct ShelfInner<E> {
    entities: HashMap<String, E>,
    lists: HashMap<RequestKey, Vec<E>>,
    epoch: u64,
}

/// Invalidation counter of one shelf, read before a fetch starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Epoch(u64);

impl<E> ShelfInner<E> {
    fn bump(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

impl<E> Default for Shelf<E> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(ShelfInner {
                entities: HashMap::new(),
                lists: HashMap::new(),
                epoch: 0,
            }),
        }
    }
}

impl<E> fmt::Debug for Shelf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("Shelf")
            .field("entities", &inner.entities.len())
            .field("lists", &inner.lists.len())
            .field("epoch", &inner.epoch)
            .finish()
    }
}

impl<E> Shelf<E> {
    // Every write leaves the maps consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, ShelfInner<E>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ShelfInner<E>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear(&self) {
        let mut inner = self.write();
        inner.entities.clear();
        inner.lists.clear();
        inner.bump();
    }
}

#[derive(Debug, Default)]
pub struct Cache {
    pub(crate) budgets: Shelf<Budget>,
    pub(crate) categories: Shelf<Category>,
    pub(crate) transactions: Shelf<Transaction>,
    pub(crate) users: Shelf<User>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch<E: Entity>(&self) -> Epoch {
        Epoch(E::shelf(self).read().epoch)
    }

    /// Exact id hit only.
    pub fn get_entity<E: Entity>(&self, id: &str) -> Option<E> {
        E::shelf(self).read().entities.get(id).cloned()
    }

    /// Upserts by id.
    pub fn put_entity<E: Entity>(&self, entity: &E) {
        E::shelf(self)
            .write()
            .entities
            .insert(entity.id().to_string(), entity.clone());
    }

    /// Upserts by id unless the shelf was invalidated since `epoch`.
    ///
    /// Returns whether the entity was stored.
    pub fn put_entity_if<E: Entity>(&self, epoch: Epoch, entity: &E) -> bool {
        let mut inner = E::shelf(self).write();
        if inner.epoch != epoch.0 {
            return false;
        }
        inner
            .entities
            .insert(entity.id().to_string(), entity.clone());
        true
    }

    /// Exact key hit only.
    pub fn get_list<E: Entity>(&self, key: &RequestKey) -> Option<Vec<E>> {
        E::shelf(self).read().lists.get(key).cloned()
    }

    pub fn put_list<E: Entity>(&self, key: RequestKey, entities: &[E]) {
        E::shelf(self).write().lists.insert(key, entities.to_vec());
    }

    /// Stores a list unless the shelf was invalidated since `epoch`.
    ///
    /// Returns whether the list was stored.
    pub fn put_list_if<E: Entity>(
        &self,
        epoch: Epoch,
        key: RequestKey,
        entities: &[E],
    ) -> bool {
        let mut inner = E::shelf(self).write();
        if inner.epoch != epoch.0 {
            return false;
        }
        inner.lists.insert(key, entities.to_vec());
        true
    }

    pub fn invalidate<E: Entity>(&self, id: &str) {
        let mut inner = E::shelf(self).write();
        inner.entities.remove(id);
        inner.bump();
    }

    pub fn invalidate_all_lists<E: Entity>(&self) {
        let mut inner = E::shelf(self).write();
        if !inner.lists.is_empty() {
            tracing::debug!(
                "dropping {} cached {} lists",
                inner.lists.len(),
                E::KIND
            );
        }
        inner.lists.clear();
        inner.bump();
    }

    /// Drops every cached entity and list of every kind.
    pub fn clear(&self) {
        self.budgets.clear();
        self.categories.clear();
        self.transactions.clear();
        self.users.clear();
    }
}

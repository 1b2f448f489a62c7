//! Cache-or-network decisions per entity kind.
//!
//! [`Repository`] is generic over the entity and over a [`RemoteSource`]
//! implementing the five entity capabilities. Reads consult the optional
//! [`Cache`] first; mutations always reach the network and then drop every
//! cached list of the same kind, since aggregates built from a partially
//! patched list would be wrong.

use std::{future::Future, marker::PhantomData, sync::Arc};

use crate::{
    Budget, Transaction, cache::Cache, entity::Entity, error::NetworkError,
    request_key::ListQuery, request_key::RequestKey,
};
use api_types::transaction::SumQuery;

pub mod user;

/// Network capabilities of one entity kind.
pub trait RemoteSource<E: Entity>: Send + Sync + 'static {
    fn list(&self, query: &E::Query)
    -> impl Future<Output = Result<Vec<E>, NetworkError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<E, NetworkError>> + Send;

    fn create(&self, entity: &E) -> impl Future<Output = Result<E, NetworkError>> + Send;

    fn update(&self, entity: &E) -> impl Future<Output = Result<E, NetworkError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), NetworkError>> + Send;
}

/// Server-side sum of transaction amounts.
pub trait SumSource: Send + Sync + 'static {
    fn sum(&self, query: &SumQuery) -> impl Future<Output = Result<i64, NetworkError>> + Send;
}

pub struct Repository<E, S> {
    source: Arc<S>,
    cache: Option<Arc<Cache>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S> Clone for Repository<E, S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, S> Repository<E, S>
where
    E: Entity,
    S: RemoteSource<E>,
{
    /// Without a cache every call goes to the network.
    pub fn new(source: Arc<S>, cache: Option<Arc<Cache>>) -> Self {
        Self {
            source,
            cache,
            _entity: PhantomData,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn cache(&self) -> Option<&Arc<Cache>> {
        self.cache.as_ref()
    }

    pub async fn list(&self, query: &E::Query) -> Result<Vec<E>, NetworkError> {
        let query = query.normalized();
        let key = RequestKey::new(E::KIND, &query);

        if let Some(entities) = self.cache.as_deref().and_then(|c| c.get_list::<E>(&key)) {
            tracing::debug!("cache hit for {key}");
            return Ok(entities);
        }

        let epoch = self.cache.as_deref().map(Cache::epoch::<E>);
        let entities = self.source.list(&query).await?;
        tracing::debug!("fetched {} {} entities for {key}", entities.len(), E::KIND);
        if let (Some(cache), Some(epoch)) = (&self.cache, epoch) {
            if !cache.put_list_if(epoch, key.clone(), &entities) {
                tracing::debug!("not caching {key}, invalidated while fetching");
            }
        }
        Ok(entities)
    }

    pub async fn get(&self, id: &str) -> Result<E, NetworkError> {
        if let Some(entity) = self.cache.as_deref().and_then(|c| c.get_entity::<E>(id)) {
            tracing::debug!("cache hit for {} {id}", E::KIND);
            return Ok(entity);
        }

        let epoch = self.cache.as_deref().map(Cache::epoch::<E>);
        let entity = self.source.get(id).await?;
        if let (Some(cache), Some(epoch)) = (&self.cache, epoch) {
            cache.put_entity_if(epoch, &entity);
        }
        Ok(entity)
    }

    pub async fn create(&self, entity: &E) -> Result<E, NetworkError> {
        let created = self.source.create(entity).await?;
        if let Some(cache) = &self.cache {
            cache.put_entity(&created);
            cache.invalidate_all_lists::<E>();
        }
        Ok(created)
    }

    pub async fn update(&self, entity: &E) -> Result<E, NetworkError> {
        let updated = self.source.update(entity).await?;
        if let Some(cache) = &self.cache {
            cache.put_entity(&updated);
            cache.invalidate_all_lists::<E>();
        }
        Ok(updated)
    }

    /// Creates drafts and updates saved entities.
    pub async fn save(&self, entity: &E) -> Result<E, NetworkError> {
        if entity.is_draft() {
            self.create(entity).await
        } else {
            self.update(entity).await
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.source.delete(id).await?;
        if let Some(cache) = &self.cache {
            cache.invalidate::<E>(id);
            cache.invalidate_all_lists::<E>();
        }
        Ok(())
    }
}

impl<S> Repository<Transaction, S>
where
    S: RemoteSource<Transaction> + SumSource,
{
    /// Sum of matching transaction amounts. Always asks the network.
    pub async fn sum(&self, query: &SumQuery) -> Result<i64, NetworkError> {
        self.source.sum(query).await
    }
}

impl<S> Repository<Budget, S>
where
    S: RemoteSource<Budget> + SumSource,
{
    /// Current balance of a budget. Always asks the network.
    pub async fn balance(&self, budget_id: &str) -> Result<i64, NetworkError> {
        let query = SumQuery {
            budget_id: Some(budget_id.to_string()),
            ..SumQuery::default()
        };
        self.source.sum(&query).await
    }
}

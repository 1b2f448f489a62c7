use std::{future::Future, sync::Arc};

use crate::{
    User, cache::Cache, error::NetworkError, request_key::ListQuery, request_key::RequestKey,
};
use api_types::user::{LoginRequest, LoginResponse, RegistrationRequest, UserSearch};

/// Read, search and authentication endpoints for users.
pub trait UserSource: Send + Sync + 'static {
    fn get_user(&self, id: &str) -> impl Future<Output = Result<User, NetworkError>> + Send;

    fn search_users(
        &self,
        query: &UserSearch,
    ) -> impl Future<Output = Result<Vec<User>, NetworkError>> + Send;

    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, NetworkError>> + Send;

    fn register(
        &self,
        request: &RegistrationRequest,
    ) -> impl Future<Output = Result<User, NetworkError>> + Send;
}

/// Users only support lookups and authentication, so they get their own
/// repository instead of the generic CRUD one.
pub struct UserRepository<S> {
    source: Arc<S>,
    cache: Option<Arc<Cache>>,
}

impl<S> Clone for UserRepository<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
        }
    }
}

impl<S: UserSource> UserRepository<S> {
    pub fn new(source: Arc<S>, cache: Option<Arc<Cache>>) -> Self {
        Self { source, cache }
    }

    pub async fn get(&self, id: &str) -> Result<User, NetworkError> {
        if let Some(user) = self.cache.as_deref().and_then(|c| c.get_entity::<User>(id)) {
            return Ok(user);
        }

        let epoch = self.cache.as_deref().map(Cache::epoch::<User>);
        let user = self.source.get_user(id).await?;
        if let (Some(cache), Some(epoch)) = (&self.cache, epoch) {
            cache.put_entity_if(epoch, &user);
        }
        Ok(user)
    }

    /// Fetches the user from the network even when a cached copy exists.
    pub async fn refresh(&self, id: &str) -> Result<User, NetworkError> {
        let epoch = self.cache.as_deref().map(Cache::epoch::<User>);
        let user = self.source.get_user(id).await?;
        if let (Some(cache), Some(epoch)) = (&self.cache, epoch) {
            cache.put_entity_if(epoch, &user);
        }
        Ok(user)
    }

    pub async fn search(&self, query: &UserSearch) -> Result<Vec<User>, NetworkError> {
        let query = query.normalized();
        let key = RequestKey::list::<User>(&query);

        if let Some(users) = self.cache.as_deref().and_then(|c| c.get_list::<User>(&key)) {
            tracing::debug!("cache hit for {key}");
            return Ok(users);
        }

        let epoch = self.cache.as_deref().map(Cache::epoch::<User>);
        let users = self.source.search_users(&query).await?;
        if let (Some(cache), Some(epoch)) = (&self.cache, epoch) {
            cache.put_list_if(epoch, key, &users);
        }
        Ok(users)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, NetworkError> {
        self.source
            .login(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, NetworkError> {
        self.source
            .register(&RegistrationRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
    }
}

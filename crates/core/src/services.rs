use std::sync::Arc;

use crate::{
    Budget, Category, Transaction,
    auth::{AuthenticationSession, credentials::CredentialStore, server::normalize_server},
    cache::Cache,
    client::ApiClient,
    data_store::DataStore,
    error::SessionError,
    repository::{Repository, user::UserRepository},
};

/// Process-wide service container.
///
/// Owns the HTTP client and the shared cache; every repository, data store
/// and session handed out shares both.
#[derive(Debug, Clone)]
pub struct Services {
    client: Arc<ApiClient>,
    cache: Option<Arc<Cache>>,
}

impl Services {
    /// Return a builder for `Services`.
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn cache(&self) -> Option<&Arc<Cache>> {
        self.cache.as_ref()
    }

    pub fn budgets(&self) -> Repository<Budget, ApiClient> {
        Repository::new(Arc::clone(&self.client), self.cache.clone())
    }

    pub fn categories(&self) -> Repository<Category, ApiClient> {
        Repository::new(Arc::clone(&self.client), self.cache.clone())
    }

    pub fn transactions(&self) -> Repository<Transaction, ApiClient> {
        Repository::new(Arc::clone(&self.client), self.cache.clone())
    }

    pub fn users(&self) -> UserRepository<ApiClient> {
        UserRepository::new(Arc::clone(&self.client), self.cache.clone())
    }

    pub fn budget_store(&self) -> DataStore<Budget, ApiClient> {
        DataStore::new(self.budgets())
    }

    pub fn category_store(&self) -> DataStore<Category, ApiClient> {
        DataStore::new(self.categories())
    }

    pub fn transaction_store(&self) -> DataStore<Transaction, ApiClient> {
        DataStore::new(self.transactions())
    }

    pub fn session<C: CredentialStore>(
        &self,
        credentials: Arc<C>,
    ) -> AuthenticationSession<ApiClient, C> {
        AuthenticationSession::new(Arc::clone(&self.client), credentials, self.cache.clone())
    }
}

#[derive(Debug)]
pub struct ServicesBuilder {
    base_url: Option<String>,
    cache: bool,
}

impl Default for ServicesBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            cache: true,
        }
    }
}

impl ServicesBuilder {
    /// Server to talk to before any session is restored. Accepts the same
    /// loose forms as a login, so `example.com` becomes `https://example.com`.
    pub fn base_url(mut self, base_url: &str) -> ServicesBuilder {
        if !base_url.trim().is_empty() {
            self.base_url = Some(base_url.trim().to_string());
        }
        self
    }

    /// Every repository call goes to the network.
    pub fn without_cache(mut self) -> ServicesBuilder {
        self.cache = false;
        self
    }

    pub fn build(self) -> Result<Services, SessionError> {
        tracing::debug!("building services (cache: {})", self.cache);
        let client = match self.base_url {
            Some(base_url) => ApiClient::with_base_url(&normalize_server(&base_url)?)?,
            None => ApiClient::new(),
        };
        Ok(Services {
            client: Arc::new(client),
            cache: self.cache.then(|| Arc::new(Cache::new())),
        })
    }
}

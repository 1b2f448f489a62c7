//! Reactive data-access layer for the Twigs budgeting client.
//!
//! The crate is organized leaf-first:
//!
//! - [`AsyncResult`] is the four-state value every observable field holds.
//! - [`Cache`] keeps entities by id and list results by [`RequestKey`].
//! - [`Repository`] decides per call whether the cache can answer or the
//!   network has to be asked, and invalidates lists after mutations.
//! - [`DataStore`] turns repository calls into observable state, keeping at most
//!   one in-flight request per key.
//! - [`AuthenticationSession`] drives login, registration and profile loading
//!   and persists credentials through a [`CredentialStore`].
//!
//! [`ApiClient`] is the HTTP implementation of every network capability the
//! layer consumes, and [`Services`] wires the shared pieces together.

pub use api_types::{
    budget::{Budget, BudgetQuery, Permission, UserPermission},
    category::{Category, CategoryQuery},
    transaction::{SumQuery, Transaction, TransactionQuery},
    user::{LoginRequest, LoginResponse, RegistrationRequest, User, UserSearch},
};
pub use async_result::AsyncResult;
pub use auth::{
    AuthApi, AuthState, AuthenticationSession, SessionSnapshot,
    credentials::{Credential, CredentialStore, Credentials, FileCredentials, MemoryCredentials},
    server::normalize_server,
};
pub use cache::{Cache, Epoch};
pub use client::ApiClient;
pub use data_store::{DataStore, StoreEvent};
pub use entity::{Entity, EntityKind};
pub use error::{NetworkError, SessionError};
pub use repository::{
    RemoteSource, Repository, SumSource,
    user::{UserRepository, UserSource},
};
pub use request_key::{ListQuery, RequestKey};
pub use services::{Services, ServicesBuilder};

mod async_result;
mod auth;
mod cache;
mod client;
mod data_store;
mod entity;
mod error;
mod repository;
mod request_key;
mod services;

pub type BudgetRepository<S = ApiClient> = Repository<Budget, S>;
pub type CategoryRepository<S = ApiClient> = Repository<Category, S>;
pub type TransactionRepository<S = ApiClient> = Repository<Transaction, S>;

pub type BudgetDataStore<S = ApiClient> = DataStore<Budget, S>;
pub type CategoryDataStore<S = ApiClient> = DataStore<Category, S>;
pub type TransactionDataStore<S = ApiClient> = DataStore<Transaction, S>;

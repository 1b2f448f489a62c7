use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Budget, Category, Transaction, User,
    auth::AuthApi,
    error::NetworkError,
    repository::{RemoteSource, SumSource, user::UserSource},
};
use api_types::{
    budget::BudgetQuery,
    category::CategoryQuery,
    transaction::{BalanceResponse, SumQuery, TransactionQuery},
    user::{LoginRequest, LoginResponse, RegistrationRequest, UserSearch},
};

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "message")]
    error: String,
}

#[derive(Debug, Default)]
struct Endpoint {
    base_url: Option<String>,
    token: Option<String>,
}

type Params = Vec<(&'static str, String)>;

/// HTTP client for the Twigs REST API.
///
/// The base URL and bearer token can change at runtime (login, logout), so
/// they live behind a lock shared by every clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: Arc<RwLock<Endpoint>>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: Arc::new(RwLock::new(Endpoint::default())),
        }
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, NetworkError> {
        let client = Self::new();
        client.set_base_url(base_url)?;
        Ok(client)
    }

    pub fn base_url(&self) -> Option<String> {
        self.endpoint
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .base_url
            .clone()
    }

    /// Points the client at a new server. The URL must be absolute.
    pub fn set_base_url(&self, base_url: &str) -> Result<(), NetworkError> {
        Url::parse(base_url)
            .map_err(|err| NetworkError::Unknown(format!("invalid base_url: {err}")))?;
        self.endpoint
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(())
    }

    pub fn set_token(&self, token: Option<&str>) {
        self.endpoint
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token = token.filter(|t| !t.is_empty()).map(str::to_string);
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, NetworkError> {
        let (base_url, token) = {
            let endpoint = self.endpoint.read().unwrap_or_else(PoisonError::into_inner);
            (endpoint.base_url.clone(), endpoint.token.clone())
        };
        let base_url =
            base_url.ok_or_else(|| NetworkError::Unknown("missing base_url".to_string()))?;
        let url = Url::parse(&format!(
            "{}/api/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
        .map_err(|err| NetworkError::Unknown(format!("invalid url: {err}")))?;

        let mut req = self.http.request(method, url);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, NetworkError> {
        let res = req.send().await?;
        if res.status().is_success() {
            return Ok(res.json::<T>().await?);
        }
        Err(error_for(res).await)
    }

    async fn send_unit(&self, req: RequestBuilder) -> Result<(), NetworkError> {
        let res = req.send().await?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(error_for(res).await)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
    ) -> Result<T, NetworkError> {
        let req = self.request(Method::GET, path)?.query(params);
        self.send(req).await
    }

    async fn write_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, NetworkError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(method, path)?.json(body);
        self.send(req).await
    }

    async fn delete_at(&self, path: &str) -> Result<(), NetworkError> {
        let req = self.request(Method::DELETE, path)?;
        self.send_unit(req).await
    }
}

async fn error_for(res: reqwest::Response) -> NetworkError {
    let status = res.status();
    let message = res
        .json::<ErrorResponse>()
        .await
        .map(|err| err.error)
        .unwrap_or_else(|_| "unknown error".to_string());
    tracing::warn!("request failed with {status}: {message}");
    NetworkError::from_status(status, message)
}

fn paging(params: &mut Params, count: Option<u32>, page: Option<u32>) {
    if let Some(count) = count {
        params.push(("count", count.to_string()));
    }
    if let Some(page) = page {
        params.push(("page", page.to_string()));
    }
}

fn budget_params(query: &BudgetQuery) -> Params {
    let mut params = Params::new();
    paging(&mut params, query.count, query.page);
    params
}

fn category_params(query: &CategoryQuery) -> Params {
    let mut params = Params::new();
    if let Some(budget_id) = &query.budget_id {
        params.push(("budgetIds", budget_id.clone()));
    }
    if let Some(expense) = query.expense {
        params.push(("expense", expense.to_string()));
    }
    if let Some(archived) = query.archived {
        params.push(("archived", archived.to_string()));
    }
    paging(&mut params, query.count, query.page);
    params
}

fn transaction_params(query: &TransactionQuery) -> Params {
    let mut params: Params = query
        .budget_ids
        .iter()
        .map(|id| ("budgetIds", id.clone()))
        .collect();
    for id in query.category_ids.iter().flatten() {
        params.push(("categoryIds", id.clone()));
    }
    if let Some(from) = query.from {
        params.push(("from", from.to_rfc3339()));
    }
    if let Some(to) = query.to {
        params.push(("to", to.to_rfc3339()));
    }
    paging(&mut params, query.count, query.page);
    params
}

fn sum_params(query: &SumQuery) -> Params {
    let mut params = Params::new();
    if let Some(budget_id) = &query.budget_id {
        params.push(("budgetId", budget_id.clone()));
    }
    if let Some(category_id) = &query.category_id {
        params.push(("categoryId", category_id.clone()));
    }
    if let Some(from) = query.from {
        params.push(("from", from.to_rfc3339()));
    }
    if let Some(to) = query.to {
        params.push(("to", to.to_rfc3339()));
    }
    params
}

impl RemoteSource<Budget> for ApiClient {
    async fn list(&self, query: &BudgetQuery) -> Result<Vec<Budget>, NetworkError> {
        self.get_json("budgets", &budget_params(query)).await
    }

    async fn get(&self, id: &str) -> Result<Budget, NetworkError> {
        self.get_json(&format!("budgets/{id}"), &Params::new()).await
    }

    async fn create(&self, budget: &Budget) -> Result<Budget, NetworkError> {
        self.write_json(Method::POST, "budgets", budget).await
    }

    async fn update(&self, budget: &Budget) -> Result<Budget, NetworkError> {
        self.write_json(Method::PUT, &format!("budgets/{}", budget.id), budget)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.delete_at(&format!("budgets/{id}")).await
    }
}

impl RemoteSource<Category> for ApiClient {
    async fn list(&self, query: &CategoryQuery) -> Result<Vec<Category>, NetworkError> {
        self.get_json("categories", &category_params(query)).await
    }

    async fn get(&self, id: &str) -> Result<Category, NetworkError> {
        self.get_json(&format!("categories/{id}"), &Params::new())
            .await
    }

    async fn create(&self, category: &Category) -> Result<Category, NetworkError> {
        self.write_json(Method::POST, "categories", category).await
    }

    async fn update(&self, category: &Category) -> Result<Category, NetworkError> {
        self.write_json(Method::PUT, &format!("categories/{}", category.id), category)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.delete_at(&format!("categories/{id}")).await
    }
}

impl RemoteSource<Transaction> for ApiClient {
    async fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, NetworkError> {
        self.get_json("transactions", &transaction_params(query))
            .await
    }

    async fn get(&self, id: &str) -> Result<Transaction, NetworkError> {
        self.get_json(&format!("transactions/{id}"), &Params::new())
            .await
    }

    async fn create(&self, transaction: &Transaction) -> Result<Transaction, NetworkError> {
        self.write_json(Method::POST, "transactions", transaction)
            .await
    }

    async fn update(&self, transaction: &Transaction) -> Result<Transaction, NetworkError> {
        self.write_json(
            Method::PUT,
            &format!("transactions/{}", transaction.id),
            transaction,
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.delete_at(&format!("transactions/{id}")).await
    }
}

impl SumSource for ApiClient {
    async fn sum(&self, query: &SumQuery) -> Result<i64, NetworkError> {
        let response: BalanceResponse = self
            .get_json("transactions/sum", &sum_params(query))
            .await?;
        Ok(response.balance)
    }
}

impl UserSource for ApiClient {
    async fn get_user(&self, id: &str) -> Result<User, NetworkError> {
        self.get_json(&format!("users/{id}"), &Params::new()).await
    }

    async fn search_users(&self, query: &UserSearch) -> Result<Vec<User>, NetworkError> {
        let params = vec![("query", query.username.clone())];
        self.get_json("users/search", &params).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, NetworkError> {
        self.write_json(Method::POST, "users/login", request).await
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<User, NetworkError> {
        self.write_json(Method::POST, "users/register", request)
            .await
    }
}

impl AuthApi for ApiClient {
    fn base_url(&self) -> Option<String> {
        ApiClient::base_url(self)
    }

    fn set_base_url(&self, base_url: &str) -> Result<(), NetworkError> {
        ApiClient::set_base_url(self, base_url)
    }

    fn set_token(&self, token: Option<&str>) {
        ApiClient::set_token(self, token)
    }
}

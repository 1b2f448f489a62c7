#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use chrono::{TimeZone, Utc};
use tokio::sync::{broadcast, oneshot};
use twigs_core::{
    AsyncResult, AuthApi, Budget, BudgetQuery, Category, CategoryQuery, LoginRequest,
    LoginResponse, NetworkError, RegistrationRequest, RemoteSource, StoreEvent, SumQuery,
    SumSource, Transaction, TransactionQuery, User, UserSearch, UserSource,
};

type Gate<T> = oneshot::Receiver<Result<T, NetworkError>>;

/// In-memory stand-in for the Twigs API that records every call.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<String>>,
    budgets: Mutex<Vec<Budget>>,
    categories: Mutex<Vec<Category>>,
    transactions: Mutex<Vec<Transaction>>,
    users: Mutex<HashMap<String, User>>,
    passwords: Mutex<HashMap<String, String>>,
    category_gates: Mutex<VecDeque<Gate<Vec<Category>>>>,
    failure: Mutex<Option<NetworkError>>,
    profile_failure: Mutex<Option<NetworkError>>,
    base_url: Mutex<Option<String>>,
    token: Mutex<Option<String>>,
    next_id: Mutex<u32>,
    issued_tokens: Mutex<u32>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budgets(self, budgets: Vec<Budget>) -> Self {
        *self.budgets.lock().unwrap() = budgets;
        self
    }

    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        *self.categories.lock().unwrap() = categories;
        self
    }

    pub fn with_transactions(self, transactions: Vec<Transaction>) -> Self {
        *self.transactions.lock().unwrap() = transactions;
        self
    }

    pub fn with_user(self, user: User, password: &str) -> Self {
        self.passwords
            .lock()
            .unwrap()
            .insert(user.username.clone(), password.to_string());
        self.users.lock().unwrap().insert(user.id.clone(), user);
        self
    }

    /// The next category list call waits for the returned sender.
    pub fn gate_category_list(&self) -> oneshot::Sender<Result<Vec<Category>, NetworkError>> {
        let (tx, rx) = oneshot::channel();
        self.category_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Every following call fails with `err`.
    pub fn fail_with(&self, err: NetworkError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn fail_profile_with(&self, err: NetworkError) {
        *self.profile_failure.lock().unwrap() = Some(err);
    }

    pub fn set_transactions(&self, transactions: Vec<Transaction>) {
        *self.transactions.lock().unwrap() = transactions;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url.lock().unwrap().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<(), NetworkError> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fresh_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("new-{next}")
    }
}

impl RemoteSource<Budget> for MockApi {
    async fn list(&self, _query: &BudgetQuery) -> Result<Vec<Budget>, NetworkError> {
        self.record("list budget")?;
        Ok(self.budgets.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> Result<Budget, NetworkError> {
        self.record("get budget")?;
        self.budgets
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(NetworkError::NotFound)
    }

    async fn create(&self, budget: &Budget) -> Result<Budget, NetworkError> {
        self.record("create budget")?;
        let mut created = budget.clone();
        created.id = self.fresh_id();
        self.budgets.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, budget: &Budget) -> Result<Budget, NetworkError> {
        self.record("update budget")?;
        Ok(budget.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.record("delete budget")?;
        self.budgets.lock().unwrap().retain(|b| b.id != id);
        Ok(())
    }
}

impl RemoteSource<Category> for MockApi {
    async fn list(&self, query: &CategoryQuery) -> Result<Vec<Category>, NetworkError> {
        self.record("list category")?;
        let gate = self.category_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(NetworkError::Unknown("gate dropped".to_string())));
        }
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| query.budget_id.as_ref().is_none_or(|id| *id == c.budget_id))
            .filter(|c| query.archived.is_none_or(|archived| archived == c.archived))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Category, NetworkError> {
        self.record("get category")?;
        self.categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(NetworkError::NotFound)
    }

    async fn create(&self, category: &Category) -> Result<Category, NetworkError> {
        self.record("create category")?;
        let mut created = category.clone();
        created.id = self.fresh_id();
        self.categories.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, category: &Category) -> Result<Category, NetworkError> {
        self.record("update category")?;
        let mut categories = self.categories.lock().unwrap();
        let stored = categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or(NetworkError::NotFound)?;
        *stored = category.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.record("delete category")?;
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(NetworkError::NotFound);
        }
        Ok(())
    }
}

impl RemoteSource<Transaction> for MockApi {
    async fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, NetworkError> {
        self.record("list transaction")?;
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| query.budget_ids.is_empty() || query.budget_ids.contains(&t.budget_id))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Transaction, NetworkError> {
        self.record("get transaction")?;
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(NetworkError::NotFound)
    }

    async fn create(&self, transaction: &Transaction) -> Result<Transaction, NetworkError> {
        self.record("create transaction")?;
        let mut created = transaction.clone();
        created.id = self.fresh_id();
        self.transactions.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, transaction: &Transaction) -> Result<Transaction, NetworkError> {
        self.record("update transaction")?;
        let mut transactions = self.transactions.lock().unwrap();
        let stored = transactions
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or(NetworkError::NotFound)?;
        *stored = transaction.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), NetworkError> {
        self.record("delete transaction")?;
        self.transactions.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}

impl SumSource for MockApi {
    async fn sum(&self, query: &SumQuery) -> Result<i64, NetworkError> {
        self.record("sum transaction")?;
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| query.budget_id.as_ref().is_none_or(|id| *id == t.budget_id))
            .map(|t| if t.expense { -t.amount } else { t.amount })
            .sum())
    }
}

impl UserSource for MockApi {
    async fn get_user(&self, id: &str) -> Result<User, NetworkError> {
        self.record(&format!("get user {id}"))?;
        if let Some(err) = self.profile_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.users
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(NetworkError::NotFound)
    }

    async fn search_users(&self, query: &UserSearch) -> Result<Vec<User>, NetworkError> {
        self.record("search user")?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.username.contains(&query.username))
            .cloned()
            .collect())
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, NetworkError> {
        self.record(&format!("login {}", request.username))?;
        let matches = self
            .passwords
            .lock()
            .unwrap()
            .get(&request.username)
            .is_some_and(|p| *p == request.password);
        if !matches {
            return Err(NetworkError::Unauthorized);
        }
        let user_id = self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == request.username)
            .map(|u| u.id.clone())
            .ok_or(NetworkError::NotFound)?;
        let mut issued = self.issued_tokens.lock().unwrap();
        *issued += 1;
        Ok(LoginResponse {
            token: format!("T{issued}"),
            user_id,
            expiration: None,
        })
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<User, NetworkError> {
        self.record(&format!("register {}", request.username))?;
        let user = User {
            id: self.fresh_id(),
            username: request.username.clone(),
            email: Some(request.email.clone()),
            avatar: None,
        };
        self.passwords
            .lock()
            .unwrap()
            .insert(request.username.clone(), request.password.clone());
        self.users
            .lock()
            .unwrap()
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

impl AuthApi for MockApi {
    fn base_url(&self) -> Option<String> {
        MockApi::base_url(self)
    }

    fn set_base_url(&self, base_url: &str) -> Result<(), NetworkError> {
        *self.base_url.lock().unwrap() = Some(base_url.to_string());
        Ok(())
    }

    fn set_token(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(str::to_string);
    }
}

pub fn budget(id: &str, name: &str) -> Budget {
    Budget {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        users: Vec::new(),
    }
}

pub fn category(id: &str, budget_id: &str, title: &str) -> Category {
    Category {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        amount: 10_000,
        budget_id: budget_id.to_string(),
        expense: true,
        archived: false,
    }
}

pub fn transaction(id: &str, budget_id: &str, amount: i64, expense: bool) -> Transaction {
    Transaction {
        id: id.to_string(),
        title: format!("transaction {id}"),
        description: None,
        date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        amount,
        category_id: None,
        expense,
        created_by: "42".to_string(),
        budget_id: budget_id.to_string(),
    }
}

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        avatar: None,
    }
}

/// Waits until `read` reports a settled state, woken by store events.
pub async fn settle<T>(
    events: &mut broadcast::Receiver<StoreEvent>,
    read: impl Fn() -> AsyncResult<T, NetworkError>,
) -> AsyncResult<T, NetworkError> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = read();
            if state.is_settled() {
                return state;
            }
            let _ = events.recv().await;
        }
    })
    .await
    .expect("state did not settle")
}

/// Waits until the mock has recorded `n` calls of `call`.
pub async fn wait_for_calls(api: &MockApi, call: &str, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while api.count(call) < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("call was never made");
}

/// Drains every event already delivered to `events`.
pub fn drain(events: &mut broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

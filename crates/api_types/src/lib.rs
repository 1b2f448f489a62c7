//! Wire types shared with the Twigs REST API.
//!
//! Every type here serializes to the camelCase JSON shapes the server speaks.
//! Identifiers are opaque strings; an empty id marks a draft that was never
//! saved on the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod budget {
    use super::*;

    /// Access level of a user on a shared budget.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Permission {
        Owner,
        Manage,
        Write,
        Read,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserPermission {
        /// User id.
        pub user: String,
        pub permission: Permission,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Budget {
        #[serde(default)]
        pub id: String,
        pub name: String,
        pub description: Option<String>,
        #[serde(default)]
        pub users: Vec<UserPermission>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetQuery {
        pub count: Option<u32>,
        pub page: Option<u32>,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Category {
        #[serde(default)]
        pub id: String,
        pub title: String,
        pub description: Option<String>,
        /// Planned amount in minor units.
        #[serde(default)]
        pub amount: i64,
        pub budget_id: String,
        pub expense: bool,
        #[serde(default)]
        pub archived: bool,
    }

    /// Filters for listing categories.
    ///
    /// `archived` defaults to `Some(false)`: archived categories are hidden
    /// unless explicitly asked for.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CategoryQuery {
        pub budget_id: Option<String>,
        pub expense: Option<bool>,
        pub archived: Option<bool>,
        pub count: Option<u32>,
        pub page: Option<u32>,
    }

    impl Default for CategoryQuery {
        fn default() -> Self {
            Self {
                budget_id: None,
                expense: None,
                archived: Some(false),
                count: None,
                page: None,
            }
        }
    }

    impl CategoryQuery {
        pub fn for_budget(budget_id: &str) -> Self {
            Self {
                budget_id: Some(budget_id.to_string()),
                ..Self::default()
            }
        }
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Transaction {
        #[serde(default)]
        pub id: String,
        pub title: String,
        pub description: Option<String>,
        pub date: DateTime<Utc>,
        /// Amount in minor units (cents), always positive; `expense` gives the sign.
        pub amount: i64,
        pub category_id: Option<String>,
        pub expense: bool,
        pub created_by: String,
        pub budget_id: String,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionQuery {
        pub budget_ids: Vec<String>,
        pub category_ids: Option<Vec<String>>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub count: Option<u32>,
        pub page: Option<u32>,
    }

    impl TransactionQuery {
        pub fn for_budget(budget_id: &str) -> Self {
            Self {
                budget_ids: vec![budget_id.to_string()],
                ..Self::default()
            }
        }
    }

    /// Filters for the transaction sum endpoint.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SumQuery {
        pub budget_id: Option<String>,
        pub category_id: Option<String>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BalanceResponse {
        pub balance: i64,
    }
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub id: String,
        pub username: String,
        pub email: Option<String>,
        pub avatar: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserSearch {
        pub username: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LoginRequest {
        pub username: String,
        pub password: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LoginResponse {
        pub token: String,
        pub user_id: String,
        /// RFC3339 expiration of the token, when the server reports one.
        pub expiration: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RegistrationRequest {
        pub username: String,
        pub email: String,
        pub password: String,
    }
}

use std::fmt;

use serde::Serialize;

use crate::entity::Entity;
use api_types::{
    budget::BudgetQuery,
    category::CategoryQuery,
    transaction::{SumQuery, TransactionQuery},
    user::UserSearch,
};

/// Parameters of a list request.
///
/// Two queries that mean the same thing must normalize to equal values, so
/// that they share one cache entry and one in-flight slot.
pub trait ListQuery: Serialize + Clone + fmt::Debug + Send + Sync + 'static {
    fn normalized(&self) -> Self {
        self.clone()
    }
}

impl ListQuery for BudgetQuery {}

impl ListQuery for CategoryQuery {}

impl ListQuery for TransactionQuery {
    /// Id filters are sets: order and duplicates do not change the result.
    fn normalized(&self) -> Self {
        let mut query = self.clone();
        query.budget_ids.sort();
        query.budget_ids.dedup();
        if let Some(ids) = query.category_ids.as_mut() {
            ids.sort();
            ids.dedup();
        }
        query
    }
}

impl ListQuery for UserSearch {
    fn normalized(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
        }
    }
}

impl ListQuery for SumQuery {}

/// Deterministic identity of a request, derived from all of its parameters.
///
/// The key is the scope followed by the canonical JSON encoding of the
/// normalized query, e.g. `category:{"budgetId":"B1","expense":null,...}`.
/// Field order is fixed by the query struct, so equal parameter sets always
/// produce equal keys and any differing field produces a different key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    /// Key for a list request of entity `E`.
    pub fn list<E: Entity>(query: &E::Query) -> Self {
        Self::new(E::KIND, &query.normalized())
    }

    /// Key for an already normalized query under an arbitrary scope.
    pub fn new<Q>(scope: impl fmt::Display, query: &Q) -> Self
    where
        Q: Serialize + fmt::Debug,
    {
        // Derived `Serialize` on plain structs cannot fail; the debug form is
        // still deterministic if it ever does.
        let encoded = serde_json::to_string(query).unwrap_or_else(|err| {
            tracing::warn!("request key fell back to debug encoding: {err}");
            format!("{query:?}")
        });
        Self(format!("{scope}:{encoded}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

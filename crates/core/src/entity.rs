use std::fmt;

use crate::{
    Budget, Category, Transaction, User,
    cache::{Cache, Shelf},
    request_key::ListQuery,
};
use api_types::{
    budget::BudgetQuery, category::CategoryQuery, transaction::TransactionQuery, user::UserSearch,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Budget,
    Category,
    Transaction,
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Category => "category",
            Self::Transaction => "transaction",
            Self::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote entity the layer can cache and observe.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Parameters of a list request for this entity.
    type Query: ListQuery;

    fn id(&self) -> &str;

    /// An entity without id has never been saved on the server.
    fn is_draft(&self) -> bool {
        self.id().is_empty()
    }

    /// The part of the shared cache that holds this kind.
    fn shelf(cache: &Cache) -> &Shelf<Self>;
}

impl Entity for Budget {
    const KIND: EntityKind = EntityKind::Budget;
    type Query = BudgetQuery;

    fn id(&self) -> &str {
        &self.id
    }

    fn shelf(cache: &Cache) -> &Shelf<Self> {
        &cache.budgets
    }
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;
    type Query = CategoryQuery;

    fn id(&self) -> &str {
        &self.id
    }

    fn shelf(cache: &Cache) -> &Shelf<Self> {
        &cache.categories
    }
}

impl Entity for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;
    type Query = TransactionQuery;

    fn id(&self) -> &str {
        &self.id
    }

    fn shelf(cache: &Cache) -> &Shelf<Self> {
        &cache.transactions
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
    type Query = UserSearch;

    fn id(&self) -> &str {
        &self.id
    }

    fn shelf(cache: &Cache) -> &Shelf<Self> {
        &cache.users
    }
}

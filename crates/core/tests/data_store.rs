mod common;

use std::{sync::Arc, time::Duration};

use common::{MockApi, budget, category, drain, settle, transaction, wait_for_calls};
use twigs_core::{
    AsyncResult, Budget, Cache, Category, CategoryQuery, DataStore, NetworkError, Repository,
    StoreEvent, SumQuery, Transaction, TransactionQuery,
};

fn category_store(api: &Arc<MockApi>, cache: bool) -> DataStore<Category, MockApi> {
    let cache = cache.then(|| Arc::new(Cache::new()));
    DataStore::new(Repository::new(Arc::clone(api), cache))
}

#[tokio::test]
async fn request_moves_from_loading_to_success() {
    let api = Arc::new(MockApi::new().with_categories(vec![
        category("c1", "B1", "Groceries"),
        category("c2", "B1", "Rent"),
        category("c3", "B2", "Travel"),
    ]));
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    let key = store.request(CategoryQuery::for_budget("B1"));
    assert_eq!(store.list_state(&key), AsyncResult::Loading);

    let state = settle(&mut events, || store.list_state(&key)).await;
    let titles: Vec<_> = state
        .value()
        .unwrap()
        .iter()
        .map(|c| c.title.as_str())
        .collect();
    assert_eq!(titles, ["Groceries", "Rent"]);
    assert_eq!(store.keys(), vec![key]);
}

#[tokio::test]
async fn unknown_keys_are_empty() {
    let api = Arc::new(MockApi::new());
    let store = category_store(&api, true);
    let other = category_store(&api, true);

    let key = other.request(CategoryQuery::for_budget("B1"));
    assert_eq!(store.list_state(&key), AsyncResult::Empty);
}

#[tokio::test]
async fn latest_request_for_a_key_wins() {
    let api = Arc::new(MockApi::new());
    let store = category_store(&api, false);
    let mut events = store.subscribe();
    let mut transitions = store.subscribe();

    let first = api.gate_category_list();
    let second = api.gate_category_list();
    let query = CategoryQuery::for_budget("B1");

    let key = store.request(query.clone());
    wait_for_calls(&api, "list category", 1).await;
    let again = store.request(query);
    assert_eq!(key, again);
    wait_for_calls(&api, "list category", 2).await;

    second
        .send(Ok(vec![category("c2", "B1", "Second")]))
        .unwrap();
    let state = settle(&mut events, || store.list_state(&key)).await;
    assert_eq!(state.value().unwrap()[0].title, "Second");

    // The superseded request was aborted; its answer goes nowhere.
    let _ = first.send(Ok(vec![category("c1", "B1", "First")]));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.list_state(&key).value().unwrap()[0].title, "Second");

    // Two Loading transitions, exactly one terminal one.
    let seen = drain(&mut transitions);
    assert_eq!(seen, vec![StoreEvent::List(key); 3]);
}

#[tokio::test]
async fn loading_replaces_previous_data() {
    let api = Arc::new(MockApi::new().with_categories(vec![category("c1", "B1", "Groceries")]));
    let store = category_store(&api, false);
    let mut events = store.subscribe();

    let key = store.request(CategoryQuery::for_budget("B1"));
    assert!(settle(&mut events, || store.list_state(&key)).await.is_success());

    let _gate = api.gate_category_list();
    store.request(CategoryQuery::for_budget("B1"));
    assert_eq!(store.list_state(&key), AsyncResult::Loading);
}

#[tokio::test]
async fn network_failures_end_in_error() {
    let api = Arc::new(MockApi::new());
    api.fail_with(NetworkError::ServerError("database is down".to_string()));
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    let key = store.request(CategoryQuery::for_budget("B1"));
    let state = settle(&mut events, || store.list_state(&key)).await;
    assert_eq!(
        state,
        AsyncResult::Error(NetworkError::ServerError("database is down".to_string()))
    );
}

#[tokio::test]
async fn cached_lists_still_report_loading_first() {
    let api = Arc::new(MockApi::new().with_categories(vec![category("c1", "B1", "Groceries")]));
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    for _ in 0..2 {
        let key = store.request(CategoryQuery::for_budget("B1"));
        assert!(store.list_state(&key).is_loading());
        assert!(settle(&mut events, || store.list_state(&key)).await.is_success());
    }
    assert_eq!(api.count("list category"), 1);
}

#[tokio::test]
async fn cancel_is_idempotent_and_keeps_state() {
    let api = Arc::new(MockApi::new());
    let store = category_store(&api, false);
    let gate = api.gate_category_list();

    let key = store.request(CategoryQuery::for_budget("B1"));
    wait_for_calls(&api, "list category", 1).await;
    store.cancel(&key);
    store.cancel(&key);
    assert_eq!(store.list_state(&key), AsyncResult::Loading);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let _ = gate.send(Ok(Vec::new()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.list_state(&key), AsyncResult::Loading);
}

#[tokio::test]
async fn select_and_clear_do_not_touch_the_network() {
    let api = Arc::new(MockApi::new());
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    let groceries = category("c1", "B1", "Groceries");
    store.select(groceries.clone());
    assert_eq!(store.selected(), AsyncResult::Success(groceries));
    store.clear();
    assert_eq!(store.selected(), AsyncResult::Empty);

    assert!(api.calls().is_empty());
    assert_eq!(drain(&mut events), vec![StoreEvent::Selected; 2]);
}

#[tokio::test]
async fn load_fills_the_selected_slot() {
    let api = Arc::new(MockApi::new().with_categories(vec![category("c1", "B1", "Groceries")]));
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    store.load("c1");
    assert!(store.selected().is_loading());
    let state = settle(&mut events, || store.selected()).await;
    assert_eq!(state.value().unwrap().title, "Groceries");

    store.load("missing");
    let state = settle(&mut events, || store.selected()).await;
    assert_eq!(state, AsyncResult::Error(NetworkError::NotFound));
}

#[tokio::test]
async fn save_adopts_the_server_representation() {
    let api = Arc::new(MockApi::new().with_categories(vec![category("c1", "B1", "Groceries")]));
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    store.save(category("", "B1", "Rent"));
    let state = settle(&mut events, || store.selected()).await;
    assert_eq!(state.value().unwrap().id, "new-1");
    assert_eq!(api.count("create category"), 1);

    store.save(category("c1", "B1", "Food"));
    let state = settle(&mut events, || store.selected()).await;
    assert_eq!(state.value().unwrap().title, "Food");
    assert_eq!(api.count("update category"), 1);
}

#[tokio::test]
async fn delete_marks_the_selection_deleted() {
    let api = Arc::new(MockApi::new().with_categories(vec![category("c1", "B1", "Groceries")]));
    let store = category_store(&api, true);
    let mut events = store.subscribe();

    store.select(category("c1", "B1", "Groceries"));
    store.delete("c1");
    let state = settle(&mut events, || store.selected()).await;
    assert_eq!(state, AsyncResult::Error(NetworkError::Deleted));

    store.delete("c1");
    let state = settle(&mut events, || store.selected()).await;
    assert_eq!(state, AsyncResult::Error(NetworkError::NotFound));
}

#[tokio::test]
async fn mutations_through_the_store_refresh_lists() {
    let api = Arc::new(MockApi::new().with_transactions(vec![transaction("t1", "B1", 100, true)]));
    let store: DataStore<Transaction, _> =
        DataStore::new(Repository::new(Arc::clone(&api), Some(Arc::new(Cache::new()))));
    let mut events = store.subscribe();

    let key = store.request(TransactionQuery::for_budget("B1"));
    settle(&mut events, || store.list_state(&key)).await;

    store.save(transaction("", "B1", 250, true));
    settle(&mut events, || store.selected()).await;

    store.request(TransactionQuery::for_budget("B1"));
    let state = settle(&mut events, || store.list_state(&key)).await;
    assert_eq!(state.value().unwrap().len(), 2);
    assert_eq!(api.count("list transaction"), 2);
}

#[tokio::test]
async fn sums_and_balances_are_observable() {
    let api = Arc::new(
        MockApi::new()
            .with_budgets(vec![budget("B1", "Household")])
            .with_transactions(vec![
                transaction("t1", "B1", 1_000, true),
                transaction("t2", "B1", 4_000, false),
                transaction("t3", "B2", 9_000, false),
            ]),
    );
    let transactions: DataStore<Transaction, _> =
        DataStore::new(Repository::new(Arc::clone(&api), None));
    let budgets: DataStore<Budget, _> = DataStore::new(Repository::new(Arc::clone(&api), None));
    let mut transaction_events = transactions.subscribe();
    let mut budget_events = budgets.subscribe();

    let sum = transactions.request_sum(SumQuery::default());
    let state = settle(&mut transaction_events, || transactions.sum_state(&sum)).await;
    assert_eq!(state, AsyncResult::Success(12_000));

    let balance = budgets.request_balance("B1");
    assert_ne!(balance, sum);
    let state = settle(&mut budget_events, || budgets.sum_state(&balance)).await;
    assert_eq!(state, AsyncResult::Success(3_000));
}

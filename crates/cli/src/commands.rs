use tokio::sync::broadcast::{self, error::RecvError};
use twigs_core::{
    ApiClient, AsyncResult, AuthenticationSession, BudgetQuery, CategoryQuery, CredentialStore,
    NetworkError, Services, StoreEvent, SumQuery, TransactionQuery, UserSearch,
};

use crate::{
    config::{AppConfig, Command},
    error::{AppError, Result},
};

pub async fn run<C: CredentialStore>(
    services: &Services,
    session: &AuthenticationSession<ApiClient, C>,
    settings: &AppConfig,
    command: Command,
) -> Result<()> {
    match command {
        Command::Login { password } => {
            let user = session
                .login(server(settings)?, username(settings)?, &password)
                .await?;
            println!("logged in as {}", user.username);
        }
        Command::Register {
            email,
            password,
            confirm_password,
        } => {
            let user = session
                .register(
                    server(settings)?,
                    username(settings)?,
                    &email,
                    &password,
                    &confirm_password,
                )
                .await?;
            println!("registered and logged in as {}", user.username);
        }
        Command::Logout => {
            session.logout().await?;
            println!("logged out");
        }
        Command::Whoami => {
            let user = session.restore().await?;
            match user.email {
                Some(email) => println!("{} <{email}> ({})", user.username, user.id),
                None => println!("{} ({})", user.username, user.id),
            }
        }
        Command::Budgets { count, page } => {
            session.restore().await?;
            let store = services.budget_store();
            let events = store.subscribe();
            let key = store.request(BudgetQuery { count, page });
            for budget in settle(events, || store.list_state(&key)).await? {
                println!("{}\t{}", budget.id, budget.name);
            }
        }
        Command::Categories {
            budget_id,
            archived,
            expense,
        } => {
            session.restore().await?;
            let store = services.category_store();
            let events = store.subscribe();
            let key = store.request(CategoryQuery {
                archived: Some(archived),
                expense,
                ..CategoryQuery::for_budget(&budget_id)
            });
            for category in settle(events, || store.list_state(&key)).await? {
                let kind = if category.expense { "expense" } else { "income" };
                println!(
                    "{}\t{}\t{}\t{kind}",
                    category.id,
                    category.title,
                    money(category.amount)
                );
            }
        }
        Command::Transactions {
            budget_id,
            categories,
            from,
            to,
            count,
        } => {
            session.restore().await?;
            let store = services.transaction_store();
            let events = store.subscribe();
            let key = store.request(TransactionQuery {
                category_ids: (!categories.is_empty()).then_some(categories),
                from,
                to,
                count,
                ..TransactionQuery::for_budget(&budget_id)
            });
            for transaction in settle(events, || store.list_state(&key)).await? {
                let amount = if transaction.expense {
                    -transaction.amount
                } else {
                    transaction.amount
                };
                println!(
                    "{}\t{}\t{}\t{}",
                    transaction.date.format("%Y-%m-%d"),
                    transaction.id,
                    transaction.title,
                    money(amount)
                );
            }
        }
        Command::Balance { budget_id } => {
            session.restore().await?;
            let store = services.budget_store();
            let events = store.subscribe();
            let key = store.request_balance(&budget_id);
            let balance = settle(events, || store.sum_state(&key)).await?;
            println!("{}", money(balance));
        }
        Command::Sum {
            budget_id,
            category_id,
            from,
            to,
        } => {
            session.restore().await?;
            let store = services.transaction_store();
            let events = store.subscribe();
            let key = store.request_sum(SumQuery {
                budget_id,
                category_id,
                from,
                to,
            });
            let sum = settle(events, || store.sum_state(&key)).await?;
            println!("{}", money(sum));
        }
        Command::Users { username } => {
            session.restore().await?;
            let users = session
                .users()
                .search(&UserSearch { username })
                .await?;
            for user in users {
                println!("{}\t{}", user.id, user.username);
            }
        }
    }
    Ok(())
}

fn server(settings: &AppConfig) -> Result<&str> {
    if settings.base_url.trim().is_empty() {
        return Err(AppError::Usage(
            "no server configured, pass --base-url or set TWIGS_BASE_URL".to_string(),
        ));
    }
    Ok(&settings.base_url)
}

fn username(settings: &AppConfig) -> Result<&str> {
    if settings.username.trim().is_empty() {
        return Err(AppError::Usage(
            "no username configured, pass --username or set TWIGS_USERNAME".to_string(),
        ));
    }
    Ok(&settings.username)
}

/// Waits until the state read by `read` settles.
async fn settle<T>(
    mut events: broadcast::Receiver<StoreEvent>,
    read: impl Fn() -> AsyncResult<T, NetworkError>,
) -> Result<T> {
    loop {
        match read() {
            AsyncResult::Success(value) => return Ok(value),
            AsyncResult::Error(err) => return Err(err.into()),
            AsyncResult::Empty | AsyncResult::Loading => {}
        }
        match events.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => {
                return Err(AppError::Usage("data store went away".to_string()));
            }
        }
    }
}

/// Formats an amount in cents.
fn money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

use crate::domain::commands::accounts::{
    CreateAccountCommand, SetDefaultAccountCommand, UpdateAccountStatusCommand,
};
use crate::domain::commands::beneficiaries::CreateBeneficiaryCommand;
use crate::domain::commands::cards::CreateCardCommand;
use crate::domain::commands::notifications::NotificationListQuery;
use crate::domain::commands::transactions::{CreateTransactionCommand, TransactionListQuery};
use crate::domain::commands::users::CreateUserCommand;
use crate::domain::{
    AccountService, BeneficiaryService, CardService, NotificationService, TransactionService,
    UserService,
};
use crate::error::Result;
use crate::storage::DbConnection;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use shared::{
    Account, Beneficiary, Card, CreateAccountRequest, CreateBeneficiaryRequest, CreateCardRequest,
    CreateTransactionRequest, CreateUserRequest, DeletedResponse, MarkAllNotificationsReadRequest,
    Notification, NotificationStatus, SetDefaultAccountRequest, Transaction, TransactionStatus,
    TransactionType, UnreadCountResponse, UpdateAccountStatusRequest, User,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Application state holding one instance of every domain service.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub account_service: AccountService,
    pub transaction_service: TransactionService,
    pub card_service: CardService,
    pub beneficiary_service: BeneficiaryService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(connection: Arc<DbConnection>) -> Self {
        let notification_service = NotificationService::new(connection.clone());
        Self {
            user_service: UserService::new(connection.clone()),
            account_service: AccountService::new(connection.clone()),
            transaction_service: TransactionService::new(
                connection.clone(),
                notification_service.clone(),
            ),
            card_service: CardService::new(connection.clone()),
            beneficiary_service: BeneficiaryService::new(connection),
            notification_service,
        }
    }
}

/// Build the full API router with permissive CORS.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id", get(get_user))
        .route("/users/:id/accounts", get(list_accounts))
        .route("/users/:id/transactions", get(list_transactions))
        .route("/users/:id/cards", get(list_cards))
        .route("/users/:id/beneficiaries", get(list_beneficiaries))
        .route("/users/:id/notifications", get(list_notifications))
        .route("/users/:id/notifications/unread-count", get(unread_count))
        .route("/accounts", post(create_account))
        .route("/accounts/:id", get(get_account))
        .route(
            "/accounts/by-number/:account_number",
            get(get_account_by_number),
        )
        .route("/accounts/:id/status", put(update_account_status))
        .route("/accounts/:id/default", put(set_default_account))
        .route("/transactions", post(create_transaction))
        .route("/transactions/:id", get(get_transaction))
        .route(
            "/transactions/by-reference/:reference",
            get(get_transaction_by_reference),
        )
        .route("/transactions/:id/process", post(process_transaction))
        .route("/transactions/:id/cancel", post(cancel_transaction))
        .route("/cards", post(create_card))
        .route("/cards/:id", get(get_card))
        .route("/cards/:id/block", post(block_card))
        .route("/cards/:id/unblock", post(unblock_card))
        .route("/beneficiaries", post(create_beneficiary))
        .route(
            "/beneficiaries/:id",
            get(get_beneficiary).delete(delete_beneficiary),
        )
        .route("/beneficiaries/:id/verify", post(verify_beneficiary))
        .route("/notifications/read-all", post(mark_all_notifications_read))
        .route("/notifications/:id/read", post(mark_notification_read))
        .route("/notifications/:id", delete(delete_notification));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// --- users ---

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    info!("POST /api/users - email: {}", request.email);
    let user = state
        .user_service
        .create_user(CreateUserCommand {
            email: request.email,
            name: request.name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>> {
    Ok(Json(state.user_service.get_user(&user_id).await?))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.user_service.list_users().await?))
}

// --- accounts ---

async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>)> {
    info!("POST /api/accounts - user: {}", request.user_id);
    let account = state
        .account_service
        .create_account(CreateAccountCommand {
            user_id: request.user_id,
            account_type: request.account_type,
            currency: request.currency,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<Account>> {
    Ok(Json(state.account_service.get_account(&account_id).await?))
}

async fn get_account_by_number(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> Result<Json<Account>> {
    Ok(Json(
        state
            .account_service
            .get_account_by_number(&account_number)
            .await?,
    ))
}

async fn update_account_status(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(request): Json<UpdateAccountStatusRequest>,
) -> Result<Json<Account>> {
    info!(
        "PUT /api/accounts/{}/status - {}",
        account_id,
        request.status.as_str()
    );
    let account = state
        .account_service
        .update_status(UpdateAccountStatusCommand {
            account_id,
            status: request.status,
        })
        .await?;
    Ok(Json(account))
}

async fn set_default_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(request): Json<SetDefaultAccountRequest>,
) -> Result<Json<Account>> {
    info!("PUT /api/accounts/{}/default", account_id);
    let account = state
        .account_service
        .set_default_account(SetDefaultAccountCommand {
            account_id,
            user_id: request.user_id,
        })
        .await?;
    Ok(Json(account))
}

async fn list_accounts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Account>>> {
    Ok(Json(state.account_service.list_accounts(&user_id).await?))
}

// --- transactions ---

async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>)> {
    info!(
        "POST /api/transactions - {} {} by user {}",
        request.transaction_type.as_str(),
        request.amount,
        request.user_id
    );
    let transaction = state
        .transaction_service
        .create_transaction(CreateTransactionCommand {
            user_id: request.user_id,
            from_account_id: request.from_account_id,
            to_account_id: request.to_account_id,
            transaction_type: request.transaction_type,
            amount: request.amount,
            currency: request.currency,
            description: request.description,
            metadata: request.metadata,
            status: request.status,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>> {
    Ok(Json(
        state
            .transaction_service
            .get_transaction(&transaction_id)
            .await?,
    ))
}

async fn get_transaction_by_reference(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Transaction>> {
    Ok(Json(
        state
            .transaction_service
            .get_transaction_by_reference(&reference)
            .await?,
    ))
}

async fn process_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>> {
    info!("POST /api/transactions/{}/process", transaction_id);
    Ok(Json(
        state
            .transaction_service
            .process_transaction(&transaction_id)
            .await?,
    ))
}

async fn cancel_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>> {
    info!("POST /api/transactions/{}/cancel", transaction_id);
    Ok(Json(
        state
            .transaction_service
            .cancel_transaction(&transaction_id)
            .await?,
    ))
}

/// Query parameters for the transaction list endpoint.
#[derive(Debug, Deserialize)]
pub struct TransactionListParams {
    pub status: Option<TransactionStatus>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub limit: Option<u32>,
}

async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<Vec<Transaction>>> {
    let transactions = state
        .transaction_service
        .list_transactions(
            &user_id,
            TransactionListQuery {
                status: params.status,
                transaction_type: params.transaction_type,
                limit: params.limit,
            },
        )
        .await?;
    Ok(Json(transactions))
}

// --- cards ---

async fn create_card(
    State(state): State<AppState>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>)> {
    info!("POST /api/cards - user: {}", request.user_id);
    let card = state
        .card_service
        .create_card(CreateCardCommand {
            user_id: request.user_id,
            card_holder_name: request.card_holder_name,
            card_type: request.card_type,
            expiry_month: request.expiry_month,
            expiry_year: request.expiry_year,
            is_virtual: request.is_virtual.unwrap_or(false),
            credit_limit: request.credit_limit,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<Card>> {
    Ok(Json(state.card_service.get_card(&card_id).await?))
}

async fn block_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<Card>> {
    info!("POST /api/cards/{}/block", card_id);
    Ok(Json(state.card_service.block_card(&card_id).await?))
}

async fn unblock_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<Card>> {
    info!("POST /api/cards/{}/unblock", card_id);
    Ok(Json(state.card_service.unblock_card(&card_id).await?))
}

async fn list_cards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Card>>> {
    Ok(Json(state.card_service.list_cards(&user_id).await?))
}

// --- beneficiaries ---

async fn create_beneficiary(
    State(state): State<AppState>,
    Json(request): Json<CreateBeneficiaryRequest>,
) -> Result<(StatusCode, Json<Beneficiary>)> {
    info!("POST /api/beneficiaries - user: {}", request.user_id);
    let beneficiary = state
        .beneficiary_service
        .add_beneficiary(CreateBeneficiaryCommand {
            user_id: request.user_id,
            name: request.name,
            account_number: request.account_number,
            bank_name: request.bank_name,
            bank_code: request.bank_code,
            email: request.email,
            phone_number: request.phone_number,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(beneficiary)))
}

async fn get_beneficiary(
    State(state): State<AppState>,
    Path(beneficiary_id): Path<String>,
) -> Result<Json<Beneficiary>> {
    Ok(Json(
        state
            .beneficiary_service
            .get_beneficiary(&beneficiary_id)
            .await?,
    ))
}

async fn verify_beneficiary(
    State(state): State<AppState>,
    Path(beneficiary_id): Path<String>,
) -> Result<Json<Beneficiary>> {
    info!("POST /api/beneficiaries/{}/verify", beneficiary_id);
    Ok(Json(
        state
            .beneficiary_service
            .verify_beneficiary(&beneficiary_id)
            .await?,
    ))
}

async fn delete_beneficiary(
    State(state): State<AppState>,
    Path(beneficiary_id): Path<String>,
) -> Result<Json<DeletedResponse>> {
    info!("DELETE /api/beneficiaries/{}", beneficiary_id);
    let deleted = state
        .beneficiary_service
        .remove_beneficiary(&beneficiary_id)
        .await?;
    Ok(Json(DeletedResponse { deleted }))
}

async fn list_beneficiaries(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Beneficiary>>> {
    Ok(Json(
        state
            .beneficiary_service
            .list_beneficiaries(&user_id)
            .await?,
    ))
}

// --- notifications ---

/// Query parameters for the notification list endpoint.
#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub status: Option<NotificationStatus>,
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<NotificationListParams>,
) -> Result<Json<Vec<Notification>>> {
    let notifications = state
        .notification_service
        .list_notifications(
            &user_id,
            NotificationListQuery {
                status: params.status,
            },
        )
        .await?;
    Ok(Json(notifications))
}

async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UnreadCountResponse>> {
    let count = state.notification_service.unread_count(&user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>> {
    Ok(Json(
        state
            .notification_service
            .mark_as_read(&notification_id)
            .await?,
    ))
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Json(request): Json<MarkAllNotificationsReadRequest>,
) -> Result<Json<UnreadCountResponse>> {
    info!(
        "POST /api/notifications/read-all - user: {}",
        request.user_id
    );
    let count = state
        .notification_service
        .mark_all_as_read(&request.user_id)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> Result<Json<DeletedResponse>> {
    info!("DELETE /api/notifications/{}", notification_id);
    let deleted = state
        .notification_service
        .delete_notification(&notification_id)
        .await?;
    Ok(Json(DeletedResponse { deleted }))
}

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::{
    api::routes::middleware::CurrentProfile,
    api::routes::profiles::Pagination,
    domain::wallet::{NewWalletTransaction, TransactionDirection},
    infrastructure::database::{Database, WalletRepository},
    infrastructure::error::AppResult,
};

/// Requête de mouvement manuel du portefeuille
#[derive(Deserialize, Validate)]
pub struct AmountRequest {
    #[validate(range(min = 100, message = "Le montant minimum est de 1 €"))]
    pub amount_cents: i64,
}

/// Solde du portefeuille courant
#[get("/wallet")]
pub async fn balance(current: CurrentProfile, db: web::Data<Database>) -> AppResult<HttpResponse> {
    let wallet_repo = WalletRepository::new(db.pool.clone());
    let balance_cents = wallet_repo.balance(&current.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "balance_cents": balance_cents
    })))
}

/// Historique paginé des écritures du portefeuille courant
#[get("/wallet/transactions")]
pub async fn history(
    current: CurrentProfile,
    query: web::Query<Pagination>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = query.limits();

    let wallet_repo = WalletRepository::new(db.pool.clone());
    let transactions = wallet_repo.list(&current.id, limit, offset).await?;

    Ok(HttpResponse::Ok().json(transactions))
}

/// Rechargement du portefeuille
#[post("/wallet/top-up")]
pub async fn top_up(
    current: CurrentProfile,
    request: web::Json<AmountRequest>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let wallet_repo = WalletRepository::new(db.pool.clone());
    let entry = wallet_repo
        .append(&NewWalletTransaction {
            profile_id: current.id,
            direction: TransactionDirection::Credit,
            amount_cents: request.amount_cents,
            reservation_id: None,
            label: "Rechargement du portefeuille".to_string(),
        })
        .await?;

    Ok(HttpResponse::Created().json(entry))
}

/// Retrait vers le compte bancaire du titulaire.
///
/// Refusé (402) si le solde est insuffisant.
#[post("/wallet/withdraw")]
pub async fn withdraw(
    current: CurrentProfile,
    request: web::Json<AmountRequest>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let wallet_repo = WalletRepository::new(db.pool.clone());
    let entry = wallet_repo
        .append(&NewWalletTransaction {
            profile_id: current.id,
            direction: TransactionDirection::Debit,
            amount_cents: request.amount_cents,
            reservation_id: None,
            label: "Retrait vers le compte bancaire".to_string(),
        })
        .await?;

    Ok(HttpResponse::Created().json(entry))
}

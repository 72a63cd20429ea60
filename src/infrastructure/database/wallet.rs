use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{Error as SqlxError, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    domain::wallet::{NewWalletTransaction, TransactionDirection, WalletTransaction},
    infrastructure::error::{AppError, AppResult},
};

const TRANSACTION_COLUMNS: &str = "id, profile_id, direction, amount_cents, balance_after_cents, \
     reference, reservation_id, label, created_at";

/// Repository du grand livre des portefeuilles.
///
/// Le livre est en append-only : chaque écriture fige le solde résultant
/// dans `balance_after_cents`. La dernière écriture d'un profil est
/// verrouillée (`FOR UPDATE`) le temps d'ajouter la suivante, ce qui
/// sérialise les écritures concurrentes d'un même portefeuille.
#[derive(Clone)]
pub struct WalletRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Solde insuffisant: {available} centimes disponibles, {requested} demandés")]
    InsufficientFunds { available: i64, requested: i64 },
    #[error("Montant invalide: {0}")]
    InvalidAmount(i64),
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl From<WalletError> for AppError {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::InsufficientFunds { .. } => {
                AppError::PaymentRequired("Solde du portefeuille insuffisant".to_string())
            }
            WalletError::InvalidAmount(_) => {
                AppError::BadRequest("Le montant doit être strictement positif".to_string())
            }
            WalletError::DatabaseError(e) => AppError::DatabaseError(e),
        }
    }
}

impl WalletRepository {
    /// Crée une nouvelle instance du repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Solde courant d'un portefeuille (0 si aucune écriture)
    pub async fn balance(&self, profile_id: &Uuid) -> AppResult<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE((SELECT balance_after_cents FROM wallet_transactions \
             WHERE profile_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1), 0)",
        )
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await
        .map_err(WalletError::DatabaseError)?;

        Ok(balance)
    }

    /// Historique paginé des écritures d'un portefeuille
    pub async fn list(
        &self,
        profile_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<WalletTransaction>> {
        let transactions = sqlx::query_as::<_, WalletTransaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions \
             WHERE profile_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(profile_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(WalletError::DatabaseError)?;

        Ok(transactions)
    }

    /// Ajoute une écriture au livre dans sa propre transaction
    pub async fn append(&self, new: &NewWalletTransaction) -> AppResult<WalletTransaction> {
        let mut tx = self.pool.begin().await.map_err(WalletError::DatabaseError)?;
        let entry = Self::append_in(&mut *tx, new).await?;
        tx.commit().await.map_err(WalletError::DatabaseError)?;
        Ok(entry)
    }

    /// Ajoute une écriture au sein d'une transaction existante.
    ///
    /// Un débit ne peut jamais rendre le solde négatif.
    pub(crate) async fn append_in(
        conn: &mut PgConnection,
        new: &NewWalletTransaction,
    ) -> Result<WalletTransaction, WalletError> {
        if new.amount_cents <= 0 {
            return Err(WalletError::InvalidAmount(new.amount_cents));
        }

        let current = sqlx::query_scalar::<_, i64>(
            "SELECT balance_after_cents FROM wallet_transactions \
             WHERE profile_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1 FOR UPDATE",
        )
        .bind(new.profile_id)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or(0);

        let balance_after = new.direction.apply(current, new.amount_cents);
        if matches!(new.direction, TransactionDirection::Debit) && balance_after < 0 {
            return Err(WalletError::InsufficientFunds {
                available: current,
                requested: new.amount_cents,
            });
        }

        let entry = sqlx::query_as::<_, WalletTransaction>(&format!(
            "INSERT INTO wallet_transactions \
                 (id, profile_id, direction, amount_cents, balance_after_cents, reference, \
                  reservation_id, label, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.profile_id)
        .bind(new.direction)
        .bind(new.amount_cents)
        .bind(balance_after)
        .bind(generate_reference())
        .bind(new.reservation_id)
        .bind(&new.label)
        .fetch_one(&mut *conn)
        .await?;

        Ok(entry)
    }
}

/// Référence lisible affichée sur les relevés, ex: TX-4QZX8R2M
fn generate_reference() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("TX-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let reference = generate_reference();
        assert!(reference.starts_with("TX-"));
        assert_eq!(reference.len(), 11);
        assert!(reference[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_references_are_distinct() {
        assert_ne!(generate_reference(), generate_reference());
    }
}

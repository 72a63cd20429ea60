use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sens d'une écriture du portefeuille
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TransactionDirection {
    /// Ajout de fonds (paiement reçu, remboursement, rechargement)
    #[serde(rename = "CREDIT")]
    #[sqlx(rename = "CREDIT")]
    Credit,
    /// Retrait de fonds (paiement d'une réservation, virement sortant)
    #[serde(rename = "DEBIT")]
    #[sqlx(rename = "DEBIT")]
    Debit,
}

/// Écriture du grand livre d'un portefeuille.
///
/// Le livre est en append-only : le solde d'un portefeuille est le
/// `balance_after_cents` de sa dernière écriture. Les montants sont
/// toujours positifs, le sens porte le signe.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    /// Identifiant unique de l'écriture
    pub id: Uuid,
    /// Profil titulaire du portefeuille
    pub profile_id: Uuid,
    /// Sens de l'écriture
    pub direction: TransactionDirection,
    /// Montant en centimes (toujours positif)
    pub amount_cents: i64,
    /// Solde du portefeuille après cette écriture
    pub balance_after_cents: i64,
    /// Référence lisible (affichée au client)
    pub reference: String,
    /// Réservation liée, le cas échéant
    pub reservation_id: Option<Uuid>,
    /// Libellé de l'écriture
    pub label: String,
    /// Date de l'écriture
    pub created_at: DateTime<Utc>,
}

/// Données d'une nouvelle écriture, avant calcul du solde
#[derive(Debug, Clone)]
pub struct NewWalletTransaction {
    pub profile_id: Uuid,
    pub direction: TransactionDirection,
    pub amount_cents: i64,
    pub reservation_id: Option<Uuid>,
    pub label: String,
}

impl TransactionDirection {
    /// Applique le sens de l'écriture à un solde
    pub fn apply(self, balance_cents: i64, amount_cents: i64) -> i64 {
        match self {
            TransactionDirection::Credit => balance_cents + amount_cents,
            TransactionDirection::Debit => balance_cents - amount_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_increases_balance() {
        assert_eq!(TransactionDirection::Credit.apply(1000, 250), 1250);
    }

    #[test]
    fn test_debit_decreases_balance() {
        assert_eq!(TransactionDirection::Debit.apply(1000, 250), 750);
    }

    #[test]
    fn test_serialized_direction_values() {
        assert_eq!(
            serde_json::to_string(&TransactionDirection::Credit).unwrap(),
            "\"CREDIT\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionDirection::Debit).unwrap(),
            "\"DEBIT\""
        );
    }
}

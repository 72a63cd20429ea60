use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// État d'une réservation.
///
/// Le pipeline nominal est PAYEE → CONFIRMEE → EN_COURS → TERMINEE.
/// ANNULEE et LITIGE sont des états terminaux alternatifs : ANNULEE est
/// accessible tant que la location n'a pas démarré, LITIGE uniquement
/// depuis une location en cours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ReservationStatus {
    /// Paiement encaissé, en attente de confirmation du propriétaire
    #[serde(rename = "PAYEE")]
    #[sqlx(rename = "PAYEE")]
    Payee,
    /// Confirmée par le propriétaire
    #[serde(rename = "CONFIRMEE")]
    #[sqlx(rename = "CONFIRMEE")]
    Confirmee,
    /// Véhicule remis, location en cours
    #[serde(rename = "EN_COURS")]
    #[sqlx(rename = "EN_COURS")]
    EnCours,
    /// Location terminée, véhicule restitué
    #[serde(rename = "TERMINEE")]
    #[sqlx(rename = "TERMINEE")]
    Terminee,
    /// Annulée avant le début de la location
    #[serde(rename = "ANNULEE")]
    #[sqlx(rename = "ANNULEE")]
    Annulee,
    /// Litige ouvert pendant la location
    #[serde(rename = "LITIGE")]
    #[sqlx(rename = "LITIGE")]
    Litige,
}

impl ReservationStatus {
    /// Table des transitions autorisées du pipeline
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Payee, Confirmee)
                | (Payee, Annulee)
                | (Confirmee, EnCours)
                | (Confirmee, Annulee)
                | (EnCours, Terminee)
                | (EnCours, Litige)
        )
    }

    /// Un état terminal n'accepte plus aucune transition
    pub fn is_terminal(self) -> bool {
        use ReservationStatus::*;
        matches!(self, Terminee | Annulee | Litige)
    }
}

/// Une réservation d'un véhicule par un locataire
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    /// Identifiant unique (UUID)
    pub id: Uuid,
    /// Véhicule réservé
    pub vehicle_id: Uuid,
    /// Profil locataire
    pub renter_id: Uuid,
    /// Premier jour de location
    pub start_date: chrono::NaiveDate,
    /// Dernier jour de location (inclus)
    pub end_date: chrono::NaiveDate,
    /// Prix total en centimes, figé à la création
    pub total_price_cents: i64,
    /// État courant du pipeline
    pub status: ReservationStatus,
    /// Date de confirmation par le propriétaire
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Date de remise du véhicule
    pub started_at: Option<DateTime<Utc>>,
    /// Date de clôture (restitution, annulation ou résolution de litige)
    pub closed_at: Option<DateTime<Utc>>,
    /// Date de création
    pub created_at: DateTime<Utc>,
    /// Date de dernière mise à jour
    pub updated_at: DateTime<Utc>,
}

/// Données requises pour créer une réservation
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub vehicle_id: Uuid,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

impl NewReservation {
    /// Nombre de jours facturés, bornes incluses
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

impl Reservation {
    /// La réservation est-elle encore annulable (avant remise du véhicule)
    pub fn is_cancellable(&self) -> bool {
        self.status.can_transition_to(ReservationStatus::Annulee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn test_nominal_pipeline_is_allowed() {
        assert!(Payee.can_transition_to(Confirmee));
        assert!(Confirmee.can_transition_to(EnCours));
        assert!(EnCours.can_transition_to(Terminee));
    }

    #[test]
    fn test_alternate_terminal_states() {
        assert!(Payee.can_transition_to(Annulee));
        assert!(Confirmee.can_transition_to(Annulee));
        assert!(EnCours.can_transition_to(Litige));
        // pas d'annulation une fois la location démarrée
        assert!(!EnCours.can_transition_to(Annulee));
        // pas de litige avant la remise du véhicule
        assert!(!Payee.can_transition_to(Litige));
        assert!(!Confirmee.can_transition_to(Litige));
    }

    #[test]
    fn test_terminal_states_accept_no_transition() {
        for terminal in [Terminee, Annulee, Litige] {
            assert!(terminal.is_terminal());
            for next in [Payee, Confirmee, EnCours, Terminee, Annulee, Litige] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Payee.can_transition_to(EnCours));
        assert!(!Payee.can_transition_to(Terminee));
        assert!(!Confirmee.can_transition_to(Terminee));
    }

    #[test]
    fn test_duration_is_inclusive_of_both_bounds() {
        let r = NewReservation {
            vehicle_id: Uuid::new_v4(),
            start_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
        };
        assert_eq!(r.duration_days(), 7);
    }

    #[test]
    fn test_serialized_status_values() {
        assert_eq!(serde_json::to_string(&EnCours).unwrap(), "\"EN_COURS\"");
        assert_eq!(serde_json::to_string(&Payee).unwrap(), "\"PAYEE\"");
        assert_eq!(serde_json::to_string(&Litige).unwrap(), "\"LITIGE\"");
    }
}

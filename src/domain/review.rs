use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Avis laissé à l'issue d'une location terminée
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    /// Identifiant unique de l'avis
    pub id: Uuid,
    /// Réservation concernée (une seule par auteur)
    pub reservation_id: Uuid,
    /// Auteur de l'avis
    pub author_id: Uuid,
    /// Profil évalué (l'autre partie de la réservation)
    pub target_id: Uuid,
    /// Note de 1 à 5
    pub rating: i16,
    /// Commentaire libre
    pub comment: String,
    /// Date de publication
    pub created_at: DateTime<Utc>,
}

/// Données requises pour publier un avis
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReview {
    pub reservation_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "La note doit être comprise entre 1 et 5"))]
    pub rating: i16,
    #[validate(length(min = 1, max = 2000, message = "Le commentaire doit faire entre 1 et 2000 caractères"))]
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds_are_enforced() {
        let review = NewReview {
            reservation_id: Uuid::new_v4(),
            rating: 6,
            comment: "Très bon véhicule".to_string(),
        };
        assert!(review.validate().is_err());

        let review = NewReview { rating: 0, ..review };
        assert!(review.validate().is_err());

        let review = NewReview { rating: 5, ..review };
        assert!(review.validate().is_ok());
    }

    #[test]
    fn test_empty_comment_is_rejected() {
        let review = NewReview {
            reservation_id: Uuid::new_v4(),
            rating: 4,
            comment: String::new(),
        };
        assert!(review.validate().is_err());
    }
}

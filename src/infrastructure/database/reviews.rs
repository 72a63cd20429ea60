use sqlx::{Error as SqlxError, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::reservation::ReservationStatus,
    domain::review::{NewReview, Review},
    infrastructure::error::{AppError, AppResult},
};

const REVIEW_COLUMNS: &str =
    "id, reservation_id, author_id, target_id, rating, comment, created_at";

/// Repository des avis
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Réservation non trouvée")]
    ReservationNotFound,
    #[error("La location n'est pas terminée")]
    ReservationNotFinished,
    #[error("L'auteur n'a pas pris part à cette location")]
    NotAParticipant,
    #[error("Un avis a déjà été publié pour cette location")]
    AlreadyReviewed,
    #[error("Validation échouée: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl From<ReviewError> for AppError {
    fn from(error: ReviewError) -> Self {
        match error {
            ReviewError::ReservationNotFound => AppError::NotFound("Réservation".to_string()),
            ReviewError::ReservationNotFinished => AppError::Conflict(
                "Un avis ne peut être publié que sur une location terminée".to_string(),
            ),
            ReviewError::NotAParticipant => {
                AppError::Forbidden("Seuls les participants peuvent laisser un avis".to_string())
            }
            ReviewError::AlreadyReviewed => {
                AppError::Conflict("Un avis a déjà été publié pour cette location".to_string())
            }
            ReviewError::ValidationError(errors) => AppError::ValidationError(errors),
            ReviewError::DatabaseError(e) => AppError::DatabaseError(e),
        }
    }
}

/// Parties d'une réservation, pour déterminer la cible d'un avis
#[derive(sqlx::FromRow)]
struct ReservationParties {
    renter_id: Uuid,
    owner_id: Uuid,
    status: ReservationStatus,
}

impl ReviewRepository {
    /// Crée une nouvelle instance du repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Publie un avis sur une location terminée.
    ///
    /// L'auteur doit être le locataire ou le propriétaire de la
    /// réservation ; la cible est l'autre partie. Un seul avis par
    /// auteur et par réservation.
    pub async fn create(&self, author_id: &Uuid, new_review: &NewReview) -> AppResult<Review> {
        new_review.validate().map_err(ReviewError::ValidationError)?;

        let parties = sqlx::query_as::<_, ReservationParties>(
            "SELECT r.renter_id, v.owner_id, r.status FROM reservations r \
             JOIN vehicles v ON v.id = r.vehicle_id WHERE r.id = $1",
        )
        .bind(new_review.reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ReviewError::DatabaseError)?
        .ok_or(ReviewError::ReservationNotFound)?;

        if parties.status != ReservationStatus::Terminee {
            return Err(ReviewError::ReservationNotFinished.into());
        }

        let target_id = if *author_id == parties.renter_id {
            parties.owner_id
        } else if *author_id == parties.owner_id {
            parties.renter_id
        } else {
            return Err(ReviewError::NotAParticipant.into());
        };

        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE reservation_id = $1 AND author_id = $2)",
        )
        .bind(new_review.reservation_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(ReviewError::DatabaseError)?;

        if already {
            return Err(ReviewError::AlreadyReviewed.into());
        }

        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews \
                 (id, reservation_id, author_id, target_id, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new_review.reservation_id)
        .bind(author_id)
        .bind(target_id)
        .bind(new_review.rating)
        .bind(&new_review.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(ReviewError::DatabaseError)?;

        Ok(review)
    }

    /// Avis reçus par un profil
    pub async fn list_for_profile(&self, target_id: &Uuid) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews \
             WHERE target_id = $1 ORDER BY created_at DESC"
        ))
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ReviewError::DatabaseError)?;

        Ok(reviews)
    }

    /// Avis portant sur les locations d'un véhicule
    pub async fn list_for_vehicle(&self, vehicle_id: &Uuid) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT rv.id, rv.reservation_id, rv.author_id, rv.target_id, rv.rating, \
                    rv.comment, rv.created_at \
             FROM reviews rv \
             JOIN reservations r ON r.id = rv.reservation_id \
             WHERE r.vehicle_id = $1 ORDER BY rv.created_at DESC",
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ReviewError::DatabaseError)?;

        Ok(reviews)
    }
}

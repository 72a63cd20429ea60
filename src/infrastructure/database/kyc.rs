use sqlx::{Error as SqlxError, PgPool};
use uuid::Uuid;

use crate::{
    domain::profile::{KycStatus, KycSubmission},
    infrastructure::error::{AppError, AppResult},
};

const SUBMISSION_COLUMNS: &str = "id, profile_id, document_type, document_ref, status, \
     reviewer_note, reviewed_at, created_at";

/// Repository des dossiers de vérification d'identité
#[derive(Clone)]
pub struct KycRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum KycError {
    #[error("Dossier non trouvé")]
    NotFound,
    #[error("Le profil est déjà vérifié")]
    AlreadyVerified,
    #[error("Un dossier est déjà en attente de vérification")]
    AlreadyPending,
    #[error("Le dossier n'est pas en attente de verdict")]
    NotAwaitingReview,
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl From<KycError> for AppError {
    fn from(error: KycError) -> Self {
        match error {
            KycError::NotFound => AppError::NotFound("Dossier KYC".to_string()),
            KycError::AlreadyVerified => {
                AppError::Conflict("Le profil est déjà vérifié".to_string())
            }
            KycError::AlreadyPending => AppError::Conflict(
                "Un dossier est déjà en attente de vérification".to_string(),
            ),
            KycError::NotAwaitingReview => {
                AppError::Conflict("Le dossier n'est pas en attente de verdict".to_string())
            }
            KycError::DatabaseError(e) => AppError::DatabaseError(e),
        }
    }
}

impl KycRepository {
    /// Crée une nouvelle instance du repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Soumet une pièce justificative et passe le profil en EN_ATTENTE.
    ///
    /// Une re-soumission est possible après un refus, pas pendant une
    /// vérification en cours ni après une vérification réussie.
    pub async fn submit(
        &self,
        profile_id: &Uuid,
        document_type: &str,
        document_ref: &str,
    ) -> AppResult<KycSubmission> {
        let mut tx = self.pool.begin().await.map_err(KycError::DatabaseError)?;

        let current_status = sqlx::query_scalar::<_, KycStatus>(
            "SELECT kyc_status FROM profiles WHERE id = $1 FOR UPDATE",
        )
        .bind(profile_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(KycError::DatabaseError)?
        .ok_or(AppError::NotFound("Profil".to_string()))?;

        match current_status {
            KycStatus::Verifie => return Err(KycError::AlreadyVerified.into()),
            KycStatus::EnAttente => return Err(KycError::AlreadyPending.into()),
            KycStatus::NonSoumis | KycStatus::Refuse => {}
        }

        let submission = sqlx::query_as::<_, KycSubmission>(&format!(
            "INSERT INTO kyc_submissions \
                 (id, profile_id, document_type, document_ref, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(document_type)
        .bind(document_ref)
        .bind(KycStatus::EnAttente)
        .fetch_one(&mut *tx)
        .await
        .map_err(KycError::DatabaseError)?;

        sqlx::query("UPDATE profiles SET kyc_status = $1, updated_at = now() WHERE id = $2")
            .bind(KycStatus::EnAttente)
            .bind(profile_id)
            .execute(&mut *tx)
            .await
            .map_err(KycError::DatabaseError)?;

        tx.commit().await.map_err(KycError::DatabaseError)?;

        Ok(submission)
    }

    /// Dernier dossier soumis par un profil
    pub async fn latest_for_profile(&self, profile_id: &Uuid) -> AppResult<Option<KycSubmission>> {
        let submission = sqlx::query_as::<_, KycSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM kyc_submissions \
             WHERE profile_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(KycError::DatabaseError)?;

        Ok(submission)
    }

    /// Dossiers en attente de verdict (admin)
    pub async fn list_pending(&self, limit: i64, offset: i64) -> AppResult<Vec<KycSubmission>> {
        let submissions = sqlx::query_as::<_, KycSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM kyc_submissions \
             WHERE status = 'EN_ATTENTE' ORDER BY created_at ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(KycError::DatabaseError)?;

        Ok(submissions)
    }

    /// Rend le verdict sur un dossier en attente et répercute le
    /// nouveau statut sur le profil.
    pub async fn review(
        &self,
        submission_id: &Uuid,
        approve: bool,
        reviewer_note: Option<&str>,
    ) -> AppResult<KycSubmission> {
        let verdict = if approve {
            KycStatus::Verifie
        } else {
            KycStatus::Refuse
        };

        let mut tx = self.pool.begin().await.map_err(KycError::DatabaseError)?;

        let current = sqlx::query_as::<_, KycSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM kyc_submissions WHERE id = $1 FOR UPDATE"
        ))
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(KycError::DatabaseError)?
        .ok_or(KycError::NotFound)?;

        if !current.status.awaiting_review() {
            return Err(KycError::NotAwaitingReview.into());
        }

        let reviewed = sqlx::query_as::<_, KycSubmission>(&format!(
            "UPDATE kyc_submissions \
             SET status = $1, reviewer_note = $2, reviewed_at = now() \
             WHERE id = $3 \
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(verdict)
        .bind(reviewer_note)
        .bind(submission_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(KycError::DatabaseError)?;

        sqlx::query("UPDATE profiles SET kyc_status = $1, updated_at = now() WHERE id = $2")
            .bind(verdict)
            .bind(current.profile_id)
            .execute(&mut *tx)
            .await
            .map_err(KycError::DatabaseError)?;

        tx.commit().await.map_err(KycError::DatabaseError)?;

        Ok(reviewed)
    }
}

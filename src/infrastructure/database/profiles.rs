use sqlx::{Error as SqlxError, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::profile::{KycStatus, NewProfile, Profile, ProfileRole},
    infrastructure::error::{AppError, AppResult},
};

const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, phone, role, kyc_status, \
     idp_subject, password_hash, is_active, created_at, updated_at";

/// Repository pour les opérations sur les profils
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Profil non trouvé")]
    NotFound,
    #[error("Email déjà utilisé")]
    EmailExists,
    #[error("Authentification échouée")]
    AuthenticationFailed,
    #[error("Erreur de hashage de mot de passe: {0}")]
    PasswordHashError(argon2::password_hash::Error),
    #[error("Validation échouée: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl From<ProfileError> for AppError {
    fn from(error: ProfileError) -> Self {
        match error {
            ProfileError::NotFound => AppError::NotFound("Profil".to_string()),
            ProfileError::EmailExists => AppError::Conflict("Email déjà utilisé".to_string()),
            ProfileError::AuthenticationFailed => {
                AppError::Unauthorized("Authentification échouée".to_string())
            }
            ProfileError::PasswordHashError(e) => {
                AppError::InternalError(format!("Erreur de hashage: {}", e))
            }
            ProfileError::ValidationError(errors) => AppError::ValidationError(errors),
            ProfileError::DatabaseError(e) => AppError::DatabaseError(e),
        }
    }
}

/// Données pour mettre à jour un profil
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<ProfileRole>,
}

impl ProfileRepository {
    /// Crée une nouvelle instance du repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crée un nouveau profil
    ///
    /// # Retourne
    /// * `Ok(Profile)` - Le profil créé avec son ID généré
    /// * `Err(AppError)` - En cas d'erreur (email existant, validation échouée)
    pub async fn create(&self, new_profile: &NewProfile) -> AppResult<Profile> {
        new_profile.validate().map_err(ProfileError::ValidationError)?;

        if self.email_exists(&new_profile.email).await? {
            return Err(ProfileError::EmailExists.into());
        }

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles \
                 (id, email, first_name, last_name, phone, role, kyc_status, idp_subject, \
                  is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, now(), now()) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_profile.email)
        .bind(&new_profile.first_name)
        .bind(&new_profile.last_name)
        .bind(&new_profile.phone)
        .bind(new_profile.role)
        .bind(KycStatus::NonSoumis)
        .bind(&new_profile.idp_subject)
        .fetch_one(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        Ok(profile)
    }

    /// Récupère un profil par son ID
    pub async fn get_by_id(&self, profile_id: &Uuid) -> AppResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 AND is_active = true"
        ))
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?
        .ok_or(ProfileError::NotFound)?;

        Ok(profile)
    }

    /// Récupère un profil par son identifiant chez le fournisseur d'identité
    pub async fn get_by_idp_subject(&self, idp_subject: &str) -> AppResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE idp_subject = $1 AND is_active = true"
        ))
        .bind(idp_subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        Ok(profile)
    }

    /// Retrouve le profil lié à une identité externe, ou le crée au
    /// premier passage (connexion par token externe).
    pub async fn find_or_create_from_idp(
        &self,
        idp_subject: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> AppResult<Profile> {
        if let Some(profile) = self.get_by_idp_subject(idp_subject).await? {
            return Ok(profile);
        }

        let new_profile = NewProfile {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: None,
            role: ProfileRole::Locataire,
            idp_subject: idp_subject.to_string(),
        };

        self.create(&new_profile).await
    }

    /// Met à jour les informations modifiables d'un profil
    pub async fn update(&self, profile_id: &Uuid, update: &ProfileUpdate) -> AppResult<Profile> {
        let mut existing = self.get_by_id(profile_id).await?;

        if let Some(first_name) = &update.first_name {
            existing.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            existing.last_name = last_name.clone();
        }
        if let Some(phone) = &update.phone {
            existing.phone = Some(phone.clone());
        }
        if let Some(role) = update.role {
            existing.role = role;
        }

        let updated = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles \
             SET first_name = $1, last_name = $2, phone = $3, role = $4, updated_at = now() \
             WHERE id = $5 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&existing.first_name)
        .bind(&existing.last_name)
        .bind(&existing.phone)
        .bind(existing.role)
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        Ok(updated)
    }

    /// Récupère un profil par son email
    pub async fn get_by_email(&self, email: &str) -> AppResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1 AND is_active = true"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?
        .ok_or(ProfileError::NotFound)?;

        Ok(profile)
    }

    /// Authentifie un compte back-office par email et mot de passe.
    ///
    /// Les profils issus du fournisseur d'identité n'ont pas de mot de
    /// passe et sont systématiquement refusés ici.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<Profile> {
        let profile = match self.get_by_email(email).await {
            Ok(profile) => profile,
            // même réponse qu'un mauvais mot de passe
            Err(_) => return Err(ProfileError::AuthenticationFailed.into()),
        };

        if !profile.verify_password(password) {
            return Err(ProfileError::AuthenticationFailed.into());
        }

        Ok(profile)
    }

    /// Définit le mot de passe d'un compte back-office
    pub async fn set_password(&self, profile_id: &Uuid, password: &str) -> AppResult<()> {
        let password_hash =
            Profile::hash_password(password).map_err(ProfileError::PasswordHashError)?;

        let result = sqlx::query(
            "UPDATE profiles SET password_hash = $1, updated_at = now() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(profile_id)
        .execute(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ProfileError::NotFound.into());
        }

        Ok(())
    }

    /// Met à jour le statut KYC d'un profil
    pub async fn set_kyc_status(&self, profile_id: &Uuid, status: KycStatus) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE profiles SET kyc_status = $1, updated_at = now() WHERE id = $2",
        )
        .bind(status)
        .bind(profile_id)
        .execute(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ProfileError::NotFound.into());
        }

        Ok(())
    }

    /// Désactive un profil (soft delete)
    pub async fn deactivate(&self, profile_id: &Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE profiles SET is_active = false, updated_at = now() WHERE id = $1",
        )
        .bind(profile_id)
        .execute(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ProfileError::NotFound.into());
        }

        Ok(())
    }

    /// Liste paginée des profils (admin)
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        Ok(profiles)
    }

    /// Vérifie si un email existe déjà
    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM profiles WHERE email = $1 AND is_active = true)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(ProfileError::DatabaseError)?;

        Ok(exists)
    }
}

use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::routes::auth::ProfileResponse,
    api::routes::middleware::CurrentProfile,
    domain::profile::ProfileRole,
    infrastructure::database::{profiles::ProfileUpdate, Database, ProfileRepository},
    infrastructure::error::{AppError, AppResult},
};

/// Requête de mise à jour du profil courant
#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Le prénom ne peut pas être vide"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Le nom ne peut pas être vide"))]
    pub last_name: Option<String>,
    #[validate(length(min = 6, message = "Numéro de téléphone invalide"))]
    pub phone: Option<String>,
    pub role: Option<ProfileRole>,
}

/// Paramètres de pagination
#[derive(Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn limits(&self) -> (i64, i64) {
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (self.page.unwrap_or(1).max(1) - 1) * per_page;
        (per_page, offset)
    }
}

/// Profil courant
#[get("/profiles/me")]
pub async fn me(current: CurrentProfile, db: web::Data<Database>) -> AppResult<HttpResponse> {
    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profile = profile_repo.get_by_id(&current.id).await?;

    Ok(HttpResponse::Ok().json(ProfileResponse::from(profile)))
}

/// Mise à jour du profil courant.
///
/// Le rôle peut basculer entre LOCATAIRE et PROPRIETAIRE, jamais vers
/// ADMIN par cette route.
#[patch("/profiles/me")]
pub async fn update_me(
    current: CurrentProfile,
    request: web::Json<UpdateProfileRequest>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    if matches!(request.role, Some(ProfileRole::Admin)) {
        return Err(AppError::Forbidden(
            "Le rôle administrateur ne peut pas être auto-attribué".to_string(),
        ));
    }

    let update = ProfileUpdate {
        first_name: request.first_name.clone(),
        last_name: request.last_name.clone(),
        phone: request.phone.clone(),
        role: request.role,
    };

    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profile = profile_repo.update(&current.id, &update).await?;

    Ok(HttpResponse::Ok().json(ProfileResponse::from(profile)))
}

/// Liste paginée des profils (admin)
#[get("/profiles")]
pub async fn list_all(
    query: web::Query<Pagination>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = query.limits();

    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profiles = profile_repo.list(limit, offset).await?;

    let responses: Vec<ProfileResponse> = profiles.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// Requête de définition de mot de passe back-office
#[derive(Deserialize, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 12, message = "Le mot de passe doit contenir au moins 12 caractères"))]
    pub password: String,
}

/// Définition du mot de passe d'un compte back-office (admin).
///
/// Permet à un compte de se connecter via `/auth/login` en plus du
/// fournisseur d'identité.
#[post("/profiles/{id}/password")]
pub async fn set_password(
    path: web::Path<Uuid>,
    request: web::Json<SetPasswordRequest>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let profile_id = path.into_inner();

    let profile_repo = ProfileRepository::new(db.pool.clone());
    profile_repo.set_password(&profile_id, &request.password).await?;

    tracing::info!(%profile_id, "mot de passe back-office défini");

    Ok(HttpResponse::NoContent().finish())
}

/// Désactivation d'un profil (admin, soft delete)
#[delete("/profiles/{id}")]
pub async fn deactivate(
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let profile_id = path.into_inner();

    let profile_repo = ProfileRepository::new(db.pool.clone());
    profile_repo.deactivate(&profile_id).await?;

    tracing::info!(%profile_id, "profil désactivé");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let pagination = Pagination {
            page: None,
            per_page: None,
        };
        assert_eq!(pagination.limits(), (20, 0));
    }

    #[test]
    fn test_pagination_is_clamped() {
        let pagination = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        let (limit, offset) = pagination.limits();
        assert_eq!(limit, 100);
        assert_eq!(offset, 200);

        let pagination = Pagination {
            page: Some(0),
            per_page: Some(10),
        };
        assert_eq!(pagination.limits(), (10, 0));
    }
}

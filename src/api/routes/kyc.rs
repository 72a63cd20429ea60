use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::routes::middleware::CurrentProfile,
    api::routes::profiles::Pagination,
    infrastructure::database::{Database, KycRepository, ProfileRepository},
    infrastructure::error::{AppError, AppResult},
};

const DOCUMENT_TYPES: [&str; 3] = ["permis", "carte_identite", "justificatif_domicile"];

/// Soumission d'une pièce justificative
#[derive(Deserialize, Validate)]
pub struct SubmitKycRequest {
    #[validate(custom = "validate_document_type")]
    pub document_type: String,
    #[validate(length(min = 1, message = "La référence du document est requise"))]
    pub document_ref: String,
}

/// Verdict rendu par un admin sur un dossier
#[derive(Deserialize)]
pub struct KycVerdictRequest {
    pub approve: bool,
    pub note: Option<String>,
}

fn validate_document_type(document_type: &str) -> Result<(), validator::ValidationError> {
    if DOCUMENT_TYPES.contains(&document_type) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("document_type");
        err.message = Some(
            "Type de document non supporté. Utilisez: permis, carte_identite, justificatif_domicile"
                .into(),
        );
        Err(err)
    }
}

/// Soumission d'un dossier de vérification d'identité
#[post("/kyc/submissions")]
pub async fn submit(
    current: CurrentProfile,
    request: web::Json<SubmitKycRequest>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let kyc_repo = KycRepository::new(db.pool.clone());
    let submission = kyc_repo
        .submit(&current.id, &request.document_type, &request.document_ref)
        .await?;

    tracing::info!(profile_id = %current.id, "dossier KYC soumis");

    Ok(HttpResponse::Created().json(submission))
}

/// Statut KYC du profil courant, avec son dernier dossier
#[get("/kyc/me")]
pub async fn my_status(
    current: CurrentProfile,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profile = profile_repo.get_by_id(&current.id).await?;

    let kyc_repo = KycRepository::new(db.pool.clone());
    let latest = kyc_repo.latest_for_profile(&current.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "kyc_status": profile.kyc_status,
        "latest_submission": latest
    })))
}

/// Dossiers en attente de verdict (admin)
#[get("/kyc/pending")]
pub async fn list_pending(
    query: web::Query<Pagination>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = query.limits();

    let kyc_repo = KycRepository::new(db.pool.clone());
    let submissions = kyc_repo.list_pending(limit, offset).await?;

    Ok(HttpResponse::Ok().json(submissions))
}

/// Verdict sur un dossier (admin)
#[post("/kyc/submissions/{id}/review")]
pub async fn review(
    path: web::Path<Uuid>,
    request: web::Json<KycVerdictRequest>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    if !request.approve && request.note.is_none() {
        return Err(AppError::BadRequest(
            "Une note est requise pour motiver un refus".to_string(),
        ));
    }

    let kyc_repo = KycRepository::new(db.pool.clone());
    let submission = kyc_repo
        .review(&path.into_inner(), request.approve, request.note.as_deref())
        .await?;

    tracing::info!(
        submission_id = %submission.id,
        approve = request.approve,
        "verdict KYC rendu"
    );

    Ok(HttpResponse::Ok().json(submission))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_document_types_are_accepted() {
        for document_type in DOCUMENT_TYPES {
            assert!(validate_document_type(document_type).is_ok());
        }
    }

    #[test]
    fn test_unknown_document_type_is_rejected() {
        assert!(validate_document_type("passeport_galactique").is_err());
    }
}

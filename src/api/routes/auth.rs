use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::auth::{AuthService, AuthTokens, IdentityProvider},
    domain::profile::{KycStatus, Profile, ProfileRole},
    infrastructure::database::{Database, ProfileRepository},
    infrastructure::error::AppResult,
};

/// Requête de connexion par token de session externe
#[derive(Deserialize, Validate)]
pub struct LoginTokenRequest {
    #[validate(length(min = 1, message = "Le token de session est requis"))]
    pub token: String,
}

/// Requête de connexion back-office (email/mot de passe)
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Format d'email invalide"))]
    pub email: String,
    pub password: String,
}

/// Requête de renouvellement de token
#[derive(Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Le refresh token est requis"))]
    pub refresh_token: String,
}

/// Réponse d'authentification réussie
#[derive(Serialize)]
pub struct AuthResponse {
    pub profile: ProfileResponse,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// Réponse simplifiée pour le profil (exclut les données sensibles)
#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: ProfileRole,
    pub kyc_status: KycStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            role: profile.role,
            kyc_status: profile.kyc_status,
            created_at: profile.created_at,
        }
    }
}

/// Connexion par token externe : résout l'identité auprès du
/// fournisseur, retrouve ou crée le profil, puis émet la paire
/// access/refresh consommée par la passerelle.
#[post("/auth/login-token")]
pub async fn login_token(
    request: web::Json<LoginTokenRequest>,
    db: web::Data<Database>,
    auth: web::Data<AuthService>,
    idp: web::Data<dyn IdentityProvider>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let idp_user = idp.resolve(&request.token).await?;

    // Valeurs de repli si le fournisseur ne renvoie pas l'état civil
    let first_name = if idp_user.given_name.is_empty() {
        "Membre".to_string()
    } else {
        idp_user.given_name.clone()
    };
    let last_name = if idp_user.family_name.is_empty() {
        "CarLoc".to_string()
    } else {
        idp_user.family_name.clone()
    };

    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profile = profile_repo
        .find_or_create_from_idp(&idp_user.sub, &idp_user.email, &first_name, &last_name)
        .await?;

    let tokens = auth.issue_pair(&profile)?;

    tracing::info!(profile_id = %profile.id, "connexion par token externe");

    Ok(HttpResponse::Ok().json(AuthResponse {
        profile: profile.into(),
        tokens,
    }))
}

/// Connexion back-office par email et mot de passe.
///
/// Réservée aux comptes disposant d'un mot de passe (les profils issus
/// du fournisseur d'identité passent par `/auth/login-token`).
#[post("/auth/login")]
pub async fn login(
    credentials: web::Json<LoginRequest>,
    db: web::Data<Database>,
    auth: web::Data<AuthService>,
) -> AppResult<HttpResponse> {
    credentials.validate()?;

    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profile = profile_repo
        .authenticate(&credentials.email, &credentials.password)
        .await?;

    let tokens = auth.issue_pair(&profile)?;

    tracing::info!(profile_id = %profile.id, "connexion back-office");

    Ok(HttpResponse::Ok().json(AuthResponse {
        profile: profile.into(),
        tokens,
    }))
}

/// Renouvellement de l'access token par refresh token.
///
/// Le refresh token est renvoyé inchangé dans la réponse.
#[post("/auth/refresh")]
pub async fn refresh(
    request: web::Json<RefreshRequest>,
    auth: web::Data<AuthService>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let tokens = auth.refresh(&request.refresh_token)?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// Déconnexion : les tokens sont stateless, la passerelle efface
/// simplement ses cookies.
#[post("/auth/logout")]
pub async fn logout() -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Déconnexion réussie",
        "success": true
    })))
}

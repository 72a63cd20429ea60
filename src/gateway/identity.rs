use actix_web::{http::StatusCode, post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::gateway::cookies::{
    access_cookie, refresh_cookie, removal_cookie, ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::gateway::proxy::{missing_config_response, GatewayState};

/// Requête d'ouverture de session avec un token du fournisseur d'identité
#[derive(Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(length(min = 1, message = "Le token de session est requis"))]
    pub token: String,
}

/// Paire de tokens renvoyée par l'endpoint de connexion de l'API
#[derive(Deserialize)]
struct LoginTokens {
    access_token: String,
    refresh_token: String,
}

/// Pont d'identité : échange le token de session externe contre la
/// paire access/refresh de l'API et la pose en cookies httpOnly.
///
/// Si l'API est injoignable, l'échange est abandonné silencieusement et
/// le token externe est posé tel quel dans `nest_access` : le navigateur
/// reste connecté, l'API tranchera à la première requête relayée.
#[post("/session")]
pub async fn create_session(
    request: web::Json<SessionRequest>,
    state: web::Data<GatewayState>,
) -> HttpResponse {
    if request.validate().is_err() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Le token de session est requis",
            "code": 400
        }));
    }

    let base = match &state.backend_api_url {
        Some(base) => base.clone(),
        None => return missing_config_response(),
    };

    let exchange = state
        .http
        .post(format!("{}/api/v1/auth/login-token", base))
        .json(&serde_json::json!({ "token": request.token }))
        .send()
        .await;

    match exchange {
        Ok(response) if response.status().is_success() => {
            match response.json::<LoginTokens>().await {
                Ok(tokens) => HttpResponse::NoContent()
                    .cookie(access_cookie(&tokens.access_token))
                    .cookie(refresh_cookie(&tokens.refresh_token))
                    .finish(),
                Err(error) => {
                    tracing::error!(%error, "réponse de connexion illisible");
                    HttpResponse::BadGateway().json(serde_json::json!({
                        "error": "Réponse du backend illisible",
                        "code": 502
                    }))
                }
            }
        }
        // identifiants refusés par l'API : statut propagé tel quel
        Ok(response) => {
            let status = StatusCode::from_u16(response.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            HttpResponse::build(status).finish()
        }
        // backend injoignable : repli sur le token externe
        Err(error) => {
            tracing::warn!(%error, "échange de tokens impossible, repli sur le token externe");
            HttpResponse::NoContent()
                .cookie(access_cookie(&request.token))
                .finish()
        }
    }
}

/// Fermeture de session : efface les deux cookies
#[post("/session/logout")]
pub async fn delete_session() -> HttpResponse {
    HttpResponse::NoContent()
        .cookie(removal_cookie(ACCESS_COOKIE))
        .cookie(removal_cookie(REFRESH_COOKIE))
        .finish()
}

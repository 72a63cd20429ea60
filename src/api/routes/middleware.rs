//! Middlewares de sécurité de l'API :
//! - `AuthMiddleware` : valide le JWT d'accès et injecte les claims
//! - `AdminGuard` : restreint un scope au rôle ADMIN
//! - `CurrentProfile` : extracteur du profil authentifié

use std::future::{ready, Ready};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ResponseError,
    http::header::AUTHORIZATION,
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::{
    core::auth::{AuthService, JwtClaims, TokenType},
    domain::profile::ProfileRole,
    infrastructure::error::AppError,
};

/// Middleware d'authentification JWT
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            Err(error) => {
                let (request, _) = req.into_parts();
                let response = error.error_response().map_into_right_body();
                Box::pin(ready(Ok(ServiceResponse::new(request, response))))
            }
        }
    }
}

/// Valide le header Authorization et retourne les claims du token d'accès
fn authenticate(req: &ServiceRequest) -> Result<JwtClaims, AppError> {
    let auth = req
        .app_data::<web::Data<AuthService>>()
        .ok_or_else(|| {
            AppError::ConfigurationError("AuthService absent de l'application".to_string())
        })?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Header Authorization manquant".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Schéma d'authentification invalide".to_string()))?;

    auth.validate(token, TokenType::Access)
}

/// Middleware d'autorisation admin, à poser à l'intérieur d'un scope
/// déjà protégé par `AuthMiddleware`.
pub struct AdminGuard;

impl<S, B> Transform<S, ServiceRequest> for AdminGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardService { service }))
    }
}

pub struct AdminGuardService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let is_admin = req
            .extensions()
            .get::<JwtClaims>()
            .map(|claims| claims.role == "ADMIN")
            .unwrap_or(false);

        if is_admin {
            let fut = self.service.call(req);
            Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
        } else {
            let (request, _) = req.into_parts();
            let response = AppError::Forbidden("Droits administrateur requis".to_string())
                .error_response()
                .map_into_right_body();
            Box::pin(ready(Ok(ServiceResponse::new(request, response))))
        }
    }
}

/// Profil authentifié, reconstruit depuis les claims du token
#[derive(Debug, Clone)]
pub struct CurrentProfile {
    pub id: Uuid,
    pub role: ProfileRole,
}

impl FromRequest for CurrentProfile {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<JwtClaims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentification requise".to_string()))
            .and_then(|claims| {
                let id = Uuid::parse_str(&claims.sub).map_err(|_| {
                    AppError::Unauthorized("Identifiant de token invalide".to_string())
                })?;
                let role = serde_json::from_value::<ProfileRole>(serde_json::Value::String(
                    claims.role.clone(),
                ))
                .map_err(|_| AppError::Unauthorized("Rôle de token invalide".to_string()))?;
                Ok(CurrentProfile { id, role })
            })
            .map_err(Error::from);

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{KycStatus, Profile};
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use chrono::{Duration, Utc};

    fn auth_service() -> AuthService {
        AuthService::from_parts(
            "une-clef-de-test-suffisamment-longue",
            Duration::hours(1),
            Duration::days(30),
        )
    }

    fn profile(role: ProfileRole) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "Utilisateur".to_string(),
            phone: None,
            role,
            kyc_status: KycStatus::Verifie,
            idp_subject: "idp|1".to_string(),
            password_hash: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn protected_ok(current: CurrentProfile) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "id": current.id }))
    }

    #[actix_web::test]
    async fn test_valid_access_token_passes() {
        let auth = auth_service();
        let tokens = auth.issue_pair(&profile(ProfileRole::Locataire)).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth))
                .wrap(AuthMiddleware)
                .route("/", web::get().to(protected_ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((AUTHORIZATION, format!("Bearer {}", tokens.access_token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_missing_header_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth_service()))
                .wrap(AuthMiddleware)
                .route("/", web::get().to(protected_ok)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let auth = auth_service();
        let tokens = auth.issue_pair(&profile(ProfileRole::Locataire)).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(auth))
                .wrap(AuthMiddleware)
                .route("/", web::get().to(protected_ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((AUTHORIZATION, format!("Bearer {}", tokens.refresh_token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_admin_guard_rejects_non_admin() {
        let auth = auth_service();
        let tokens = auth.issue_pair(&profile(ProfileRole::Locataire)).unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(auth)).service(
                web::scope("")
                    .wrap(AuthMiddleware)
                    .service(web::scope("/admin").wrap(AdminGuard).route(
                        "/profiles",
                        web::get().to(|| async { HttpResponse::Ok().finish() }),
                    )),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/profiles")
            .insert_header((AUTHORIZATION, format!("Bearer {}", tokens.access_token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_admin_guard_accepts_admin() {
        let auth = auth_service();
        let tokens = auth.issue_pair(&profile(ProfileRole::Admin)).unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(auth)).service(
                web::scope("")
                    .wrap(AuthMiddleware)
                    .service(web::scope("/admin").wrap(AdminGuard).route(
                        "/profiles",
                        web::get().to(|| async { HttpResponse::Ok().finish() }),
                    )),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/profiles")
            .insert_header((AUTHORIZATION, format!("Bearer {}", tokens.access_token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

//! Garde de routes de la passerelle.
//!
//! La garde ne juge que de la présence du cookie d'accès : la validité
//! du token reste l'affaire de l'API, qui la contrôle sur chaque appel
//! relayé. Elle redirige les visiteurs non connectés hors des pages
//! protégées, et les visiteurs connectés hors des pages de connexion.

use std::future::{ready, Ready};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse,
};
use futures_util::future::LocalBoxFuture;

use crate::gateway::cookies::ACCESS_COOKIE;

/// Préfixes de pages réservées aux visiteurs connectés
pub const PROTECTED_PREFIXES: [&str; 5] = [
    "/dashboard",
    "/compte",
    "/mes-vehicules",
    "/mes-locations",
    "/portefeuille",
];

/// Pages réservées aux visiteurs non connectés
pub const AUTH_PREFIXES: [&str; 2] = ["/connexion", "/inscription"];

const LOGIN_PATH: &str = "/connexion";
const DASHBOARD_PATH: &str = "/dashboard";

/// Décision prise par la garde pour un chemin donné
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Laisser passer
    Allow,
    /// Rediriger vers la page de connexion, chemin d'origine en `next`
    ToLogin { next: String },
    /// Rediriger vers le tableau de bord
    ToDashboard,
}

/// Applique les règles de garde à un chemin
pub fn decide(path: &str, authenticated: bool) -> GuardDecision {
    let matches_prefix = |prefix: &str| {
        path == prefix || path.starts_with(&format!("{}/", prefix))
    };

    if PROTECTED_PREFIXES.iter().any(|p| matches_prefix(p)) && !authenticated {
        return GuardDecision::ToLogin {
            next: path.to_string(),
        };
    }

    if AUTH_PREFIXES.iter().any(|p| matches_prefix(p)) && authenticated {
        return GuardDecision::ToDashboard;
    }

    GuardDecision::Allow
}

/// Middleware appliquant la garde aux routes de pages
pub struct RouteGuard;

impl<S, B> Transform<S, ServiceRequest> for RouteGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RouteGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RouteGuardService { service }))
    }
}

pub struct RouteGuardService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RouteGuardService<S>
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
        let authenticated = req.cookie(ACCESS_COOKIE).is_some();

        let target = match decide(req.path(), authenticated) {
            GuardDecision::Allow => {
                let fut = self.service.call(req);
                return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
            }
            GuardDecision::ToLogin { next } => {
                format!("{}?next={}", LOGIN_PATH, urlencoding::encode(&next))
            }
            GuardDecision::ToDashboard => DASHBOARD_PATH.to_string(),
        };

        let (request, _) = req.into_parts();
        let response = HttpResponse::Found()
            .insert_header((header::LOCATION, target))
            .finish()
            .map_into_right_body();

        Box::pin(ready(Ok(ServiceResponse::new(request, response))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::cookies::access_cookie;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};

    #[::core::prelude::v1::test]
    fn test_protected_paths_require_authentication() {
        assert_eq!(
            decide("/dashboard", false),
            GuardDecision::ToLogin {
                next: "/dashboard".to_string()
            }
        );
        assert_eq!(
            decide("/mes-vehicules/42", false),
            GuardDecision::ToLogin {
                next: "/mes-vehicules/42".to_string()
            }
        );
        assert_eq!(decide("/dashboard", true), GuardDecision::Allow);
    }

    #[::core::prelude::v1::test]
    fn test_auth_pages_reject_authenticated_visitors() {
        assert_eq!(decide("/connexion", true), GuardDecision::ToDashboard);
        assert_eq!(decide("/inscription", true), GuardDecision::ToDashboard);
        assert_eq!(decide("/connexion", false), GuardDecision::Allow);
    }

    #[::core::prelude::v1::test]
    fn test_public_paths_are_always_allowed() {
        for path in ["/", "/vehicules/42", "/assets/app.js", "/mentions-legales"] {
            assert_eq!(decide(path, false), GuardDecision::Allow);
            assert_eq!(decide(path, true), GuardDecision::Allow);
        }
    }

    #[::core::prelude::v1::test]
    fn test_prefix_matching_does_not_catch_lookalikes() {
        // /compteuse ne doit pas être traité comme /compte
        assert_eq!(decide("/comptes-rendus", false), GuardDecision::Allow);
        assert_eq!(decide("/dashboard-public", false), GuardDecision::Allow);
    }

    async fn page_ok() -> HttpResponse {
        HttpResponse::Ok().body("page")
    }

    #[actix_web::test]
    async fn test_unauthenticated_visitor_is_redirected_to_login() {
        let app = test::init_service(
            App::new()
                .wrap(RouteGuard)
                .route("/dashboard", web::get().to(page_ok)),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/dashboard").to_request())
                .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/connexion?next=%2Fdashboard"
        );
    }

    #[actix_web::test]
    async fn test_authenticated_visitor_reaches_protected_page() {
        let app = test::init_service(
            App::new()
                .wrap(RouteGuard)
                .route("/dashboard", web::get().to(page_ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/dashboard")
            .cookie(access_cookie("jeton"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_authenticated_visitor_is_redirected_away_from_login() {
        let app = test::init_service(
            App::new()
                .wrap(RouteGuard)
                .route("/connexion", web::get().to(page_ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/connexion")
            .cookie(access_cookie("jeton"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/dashboard"
        );
    }
}

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::gateway::cookies::{access_cookie, refresh_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::infrastructure::config::GatewayConfig;
use crate::infrastructure::error::{AppError, AppResult};

/// Message fixe renvoyé quand l'URL du backend n'est pas configurée
pub const MISSING_BACKEND_MESSAGE: &str = "Configuration du backend manquante";

/// Headers hop-by-hop, jamais relayés dans un sens ni dans l'autre
const SKIPPED_REQUEST_HEADERS: [&str; 5] =
    ["host", "cookie", "authorization", "content-length", "connection"];
const SKIPPED_RESPONSE_HEADERS: [&str; 4] =
    ["connection", "transfer-encoding", "content-length", "keep-alive"];

/// État partagé de la passerelle
#[derive(Clone)]
pub struct GatewayState {
    pub http: reqwest::Client,
    pub backend_api_url: Option<String>,
}

impl GatewayState {
    /// Construit l'état de la passerelle.
    ///
    /// Le client HTTP ne suit jamais les redirections : les réponses 3xx
    /// du backend sont relayées telles quelles au navigateur.
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            http,
            backend_api_url: config.backend_api_url.clone(),
        })
    }
}

/// Tokens renvoyés par l'endpoint de renouvellement de l'API
#[derive(Debug, Deserialize)]
struct RefreshedTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Relaie une requête navigateur vers l'API.
///
/// Le token d'accès est lu dans le cookie `nest_access` et injecté en
/// header bearer. Sur un 401 de l'API : un seul renouvellement silencieux
/// via le cookie `nest_refresh`, une seule relance de la requête
/// d'origine, et les cookies mis à jour sont propagés. Si le
/// renouvellement échoue, le 401 d'origine est renvoyé tel quel.
pub async fn forward(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<GatewayState>,
) -> HttpResponse {
    let base = match &state.backend_api_url {
        Some(base) => base.clone(),
        None => return missing_config_response(),
    };

    let tail = req.match_info().get("tail").unwrap_or("");
    let mut url = format!("{}/{}", base, tail.trim_start_matches('/'));
    if !req.query_string().is_empty() {
        url.push('?');
        url.push_str(req.query_string());
    }

    let access_token = req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string());

    let first = match send_upstream(&state.http, &req, &url, body.clone(), access_token.as_deref())
        .await
    {
        Ok(response) => response,
        Err(error) => return upstream_error_response(&error),
    };

    if first.status() != reqwest::StatusCode::UNAUTHORIZED {
        return into_actix_response(first, Vec::new()).await;
    }

    // Un seul renouvellement silencieux, puis une seule relance
    let refresh_token = match req.cookie(REFRESH_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return into_actix_response(first, Vec::new()).await,
    };

    let tokens = match refresh_tokens(&state.http, &base, &refresh_token).await {
        Some(tokens) => tokens,
        // échec du renouvellement : 401 d'origine, inchangé
        None => return into_actix_response(first, Vec::new()).await,
    };

    tracing::debug!(path = tail, "token d'accès renouvelé, relance de la requête");

    match send_upstream(&state.http, &req, &url, body, Some(&tokens.access_token)).await {
        Ok(replayed) => {
            let mut cookies = vec![access_cookie(&tokens.access_token)];
            if let Some(refreshed) = &tokens.refresh_token {
                cookies.push(refresh_cookie(refreshed));
            }
            into_actix_response(replayed, cookies).await
        }
        Err(error) => upstream_error_response(&error),
    }
}

/// Réponse 500 fixe pour configuration manquante
pub(crate) fn missing_config_response() -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": MISSING_BACKEND_MESSAGE,
        "code": 500
    }))
}

pub(crate) fn upstream_error_response(error: &reqwest::Error) -> HttpResponse {
    tracing::error!(%error, "backend injoignable");
    HttpResponse::BadGateway().json(serde_json::json!({
        "error": "Backend injoignable",
        "code": 502
    }))
}

/// Envoie la requête d'origine vers l'API, méthode, query string et
/// corps préservés, bearer injecté.
async fn send_upstream(
    http: &reqwest::Client,
    req: &HttpRequest,
    url: &str,
    body: web::Bytes,
    bearer: Option<&str>,
) -> Result<reqwest::Response, reqwest::Error> {
    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let mut builder = http.request(method, url).body(body.to_vec());

    for (name, value) in req.headers() {
        if SKIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    if let Some(token) = bearer {
        builder = builder.bearer_auth(token);
    }

    builder.send().await
}

/// Appelle l'endpoint de renouvellement de l'API. Retourne None sur
/// toute erreur : le proxy retombe alors sur le 401 d'origine.
async fn refresh_tokens(
    http: &reqwest::Client,
    base: &str,
    refresh_token: &str,
) -> Option<RefreshedTokens> {
    let response = http
        .post(format!("{}/api/v1/auth/refresh", base))
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    response.json::<RefreshedTokens>().await.ok()
}

/// Reconstruit la réponse actix depuis la réponse de l'API, statut et
/// headers préservés, corps relayé en binaire.
async fn into_actix_response(
    upstream: reqwest::Response,
    cookies: Vec<actix_web::cookie::Cookie<'static>>,
) -> HttpResponse {
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);

    for (name, value) in upstream.headers() {
        if SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder.append_header((name.as_str(), value.as_bytes()));
    }

    for cookie in cookies {
        builder.cookie(cookie);
    }

    match upstream.bytes().await {
        Ok(bytes) => builder.body(bytes),
        Err(_) => HttpResponse::BadGateway().json(serde_json::json!({
            "error": "Réponse du backend illisible",
            "code": 502
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
    use actix_web::{test, web, App};
    use assert_json_diff::assert_json_eq;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state(backend: Option<String>) -> web::Data<GatewayState> {
        let config = GatewayConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            backend_api_url: backend,
            static_dir: "./public".to_string(),
        };
        web::Data::new(GatewayState::new(&config).unwrap())
    }

    macro_rules! gateway_app {
        ($backend:expr) => {
            test::init_service(
                App::new()
                    .app_data(state($backend))
                    .service(web::resource("/nest{tail:.*}").route(web::route().to(forward))),
            )
            .await
        };
    }

    fn set_cookies(resp: &actix_web::dev::ServiceResponse) -> Vec<String> {
        resp.headers()
            .get_all(SET_COOKIE)
            .map(|v| v.to_str().unwrap_or_default().to_string())
            .collect()
    }

    #[actix_web::test]
    async fn test_valid_access_cookie_is_forwarded_once_unchanged() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/vehicles"))
            .and(query_param("city", "Lyon"))
            .and(header("authorization", "Bearer jeton-valide"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "make": "Renault" }])),
            )
            .expect(1)
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::get()
            .uri("/nest/api/v1/vehicles?city=Lyon")
            .cookie(access_cookie("jeton-valide"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        // pas de renouvellement : aucun cookie mis à jour
        assert!(set_cookies(&resp).is_empty());

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_json_eq!(json, serde_json::json!([{ "make": "Renault" }]));
    }

    #[actix_web::test]
    async fn test_expired_access_with_valid_refresh_replays_once_and_updates_cookies() {
        let backend = MockServer::start().await;

        // premier passage : le token expiré est refusé
        Mock::given(method("GET"))
            .and(path("/api/v1/profiles/me"))
            .and(header("authorization", "Bearer jeton-expire"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&backend)
            .await;

        // exactement un appel de renouvellement
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .and(body_json(serde_json::json!({ "refresh_token": "refresh-valide" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jeton-neuf",
                "refresh_token": "refresh-valide",
                "token_type": "Bearer",
                "expires_in": 86400
            })))
            .expect(1)
            .mount(&backend)
            .await;

        // exactement une relance avec le nouveau token
        Mock::given(method("GET"))
            .and(path("/api/v1/profiles/me"))
            .and(header("authorization", "Bearer jeton-neuf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "email": "a@b.fr" })),
            )
            .expect(1)
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::get()
            .uri("/nest/api/v1/profiles/me")
            .cookie(access_cookie("jeton-expire"))
            .cookie(refresh_cookie("refresh-valide"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookies = set_cookies(&resp);
        assert!(cookies.iter().any(|c| c.starts_with("nest_access=jeton-neuf")));

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["email"], "a@b.fr");
    }

    #[actix_web::test]
    async fn test_expired_access_without_refresh_returns_original_401() {
        let backend = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/profiles/me"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "error": "token expiré" })),
            )
            .expect(1)
            .mount(&backend)
            .await;

        // aucun appel de renouvellement ne doit partir
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::get()
            .uri("/nest/api/v1/profiles/me")
            .cookie(access_cookie("jeton-expire"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&resp).is_empty());

        // le corps du 401 d'origine est relayé tel quel
        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "token expiré");
    }

    #[actix_web::test]
    async fn test_invalid_refresh_returns_original_401_after_single_attempt() {
        let backend = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/wallet"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({ "error": "non autorisé" })),
            )
            .expect(1)
            .mount(&backend)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::get()
            .uri("/nest/api/v1/wallet")
            .cookie(access_cookie("jeton-expire"))
            .cookie(refresh_cookie("refresh-perime"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&resp).is_empty());
    }

    #[actix_web::test]
    async fn test_redirects_are_passed_through_verbatim() {
        let backend = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/documents/42"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", "https://cdn.example.com/documents/42"),
            )
            .expect(1)
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::get()
            .uri("/nest/api/v1/documents/42")
            .cookie(access_cookie("jeton-valide"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(LOCATION).unwrap(),
            "https://cdn.example.com/documents/42"
        );
        // jamais converti en corps JSON
        assert!(resp.headers().get(CONTENT_TYPE).is_none());
        let body = test::read_body(resp).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_binary_bodies_are_relayed() {
        let backend = MockServer::start().await;
        let payload: Vec<u8> = vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff];

        Mock::given(method("GET"))
            .and(path("/api/v1/documents/logo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(payload.clone()),
            )
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::get()
            .uri("/nest/api/v1/documents/logo")
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(test::read_body(resp).await.to_vec(), payload);
    }

    #[actix_web::test]
    async fn test_post_body_and_method_are_preserved() {
        let backend = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/reservations"))
            .and(body_json(serde_json::json!({ "vehicle_id": "v-1" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "r-1" })))
            .expect(1)
            .mount(&backend)
            .await;

        let app = gateway_app!(Some(backend.uri()));

        let req = test::TestRequest::post()
            .uri("/nest/api/v1/reservations")
            .cookie(access_cookie("jeton-valide"))
            .set_json(serde_json::json!({ "vehicle_id": "v-1" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[actix_web::test]
    async fn test_missing_backend_configuration_yields_fixed_500() {
        let app = gateway_app!(None);

        for uri in ["/nest/api/v1/vehicles", "/nest/api/v1/wallet", "/nest"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = test::read_body(resp).await;
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], MISSING_BACKEND_MESSAGE);
        }
    }
}

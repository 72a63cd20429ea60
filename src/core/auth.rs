use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    domain::profile::Profile,
    infrastructure::config::ApiConfig,
    infrastructure::error::{AppError, AppResult},
};

/// Nature d'un token JWT émis par l'API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims portées par les tokens d'accès et de renouvellement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Identifiant du profil
    pub sub: String,
    /// Rôle du profil au moment de l'émission
    pub role: String,
    /// Nature du token (access/refresh)
    pub token_type: TokenType,
    /// Date d'émission (epoch secondes)
    pub iat: i64,
    /// Date d'expiration (epoch secondes)
    pub exp: i64,
}

/// Paire de tokens renvoyée à la passerelle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Identité résolue auprès du fournisseur externe
#[derive(Debug, Clone, Deserialize)]
pub struct IdpUser {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

/// Résolution d'un token de session externe en identité
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, external_token: &str) -> AppResult<IdpUser>;
}

/// Implémentation HTTP : appelle l'endpoint userinfo du fournisseur
/// avec le token externe en header bearer.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    userinfo_url: String,
}

impl HttpIdentityProvider {
    pub fn new(userinfo_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            userinfo_url: userinfo_url.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, external_token: &str) -> AppResult<IdpUser> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(external_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized(
                "Token de session externe invalide".to_string(),
            ));
        }

        Ok(response.json::<IdpUser>().await?)
    }
}

/// Émission et validation des tokens JWT de l'API
#[derive(Clone)]
pub struct AuthService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl: Duration::hours(config.access_token_ttl_hours),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
        }
    }

    /// Construction directe, utilisée par les tests
    pub fn from_parts(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret: secret.to_string(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Émet la paire access/refresh pour un profil
    pub fn issue_pair(&self, profile: &Profile) -> AppResult<AuthTokens> {
        let access_token = self.create_token(profile, TokenType::Access, self.access_ttl)?;
        let refresh_token = self.create_token(profile, TokenType::Refresh, self.refresh_ttl)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Valide un token et vérifie sa nature.
    ///
    /// Un refresh token n'est jamais accepté là où un access token est
    /// attendu, et réciproquement.
    pub fn validate(&self, token: &str, expected: TokenType) -> AppResult<JwtClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        if data.claims.token_type != expected {
            return Err(AppError::Unauthorized(
                "Nature de token inattendue".to_string(),
            ));
        }

        Ok(data.claims)
    }

    /// Renouvelle un access token à partir d'un refresh token valide.
    ///
    /// Le refresh token n'est pas renouvelé : il reste valable jusqu'à
    /// sa propre expiration.
    pub fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let claims = self.validate(refresh_token, TokenType::Refresh)?;

        let now = Utc::now();
        let access_claims = JwtClaims {
            sub: claims.sub,
            role: claims.role,
            token_type: TokenType::Access,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(AuthTokens {
            access_token,
            refresh_token: refresh_token.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    fn create_token(
        &self,
        profile: &Profile,
        token_type: TokenType,
        ttl: Duration,
    ) -> AppResult<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: profile.id.to_string(),
            role: serde_json::to_value(profile.role)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{KycStatus, ProfileRole};
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service() -> AuthService {
        AuthService::from_parts(
            "une-clef-de-test-suffisamment-longue",
            Duration::hours(24),
            Duration::days(30),
        )
    }

    fn profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "marie.martin@example.com".to_string(),
            first_name: "Marie".to_string(),
            last_name: "Martin".to_string(),
            phone: None,
            role: ProfileRole::Proprietaire,
            kyc_status: KycStatus::Verifie,
            idp_subject: "idp|456".to_string(),
            password_hash: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_pair_round_trips() {
        let auth = service();
        let profile = profile();
        let tokens = auth.issue_pair(&profile).unwrap();

        let claims = auth.validate(&tokens.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, profile.id.to_string());
        assert_eq!(claims.role, "PROPRIETAIRE");

        let claims = auth
            .validate(&tokens.refresh_token, TokenType::Refresh)
            .unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let auth = service();
        let tokens = auth.issue_pair(&profile()).unwrap();

        // un refresh token ne passe pas pour un access token
        assert!(auth.validate(&tokens.refresh_token, TokenType::Access).is_err());
        // et inversement
        assert!(auth.validate(&tokens.access_token, TokenType::Refresh).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = AuthService::from_parts(
            "une-clef-de-test-suffisamment-longue",
            Duration::seconds(-120),
            Duration::days(30),
        );
        let tokens = auth.issue_pair(&profile()).unwrap();

        let verifier = service();
        assert!(verifier
            .validate(&tokens.access_token, TokenType::Access)
            .is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let tokens = service().issue_pair(&profile()).unwrap();
        let other = AuthService::from_parts("autre-clef", Duration::hours(24), Duration::days(30));
        assert!(other.validate(&tokens.access_token, TokenType::Access).is_err());
    }

    #[test]
    fn test_refresh_issues_new_access_and_keeps_refresh() {
        let auth = service();
        let tokens = auth.issue_pair(&profile()).unwrap();

        let refreshed = auth.refresh(&tokens.refresh_token).unwrap();
        assert_eq!(refreshed.refresh_token, tokens.refresh_token);

        let claims = auth
            .validate(&refreshed.access_token, TokenType::Access)
            .unwrap();
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let auth = service();
        let tokens = auth.issue_pair(&profile()).unwrap();
        assert!(auth.refresh(&tokens.access_token).is_err());
    }

    #[actix_web::test]
    async fn test_http_identity_provider_resolves_userinfo() {
        let idp = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer jeton-externe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "idp|789",
                "email": "paul@example.com",
                "given_name": "Paul",
                "family_name": "Durand"
            })))
            .mount(&idp)
            .await;

        let provider = HttpIdentityProvider::new(&format!("{}/userinfo", idp.uri()));
        let user = provider.resolve("jeton-externe").await.unwrap();
        assert_eq!(user.sub, "idp|789");
        assert_eq!(user.email, "paul@example.com");
    }

    #[actix_web::test]
    async fn test_http_identity_provider_rejects_invalid_token() {
        let idp = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&idp)
            .await;

        let provider = HttpIdentityProvider::new(&format!("{}/userinfo", idp.uri()));
        let result = provider.resolve("mauvais-jeton").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}

use dotenv::dotenv;
use serde::Deserialize;
use std::env;

use crate::infrastructure::error::{AppError, AppResult};

/// Configuration du serveur d'API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    // Environnement et serveur
    pub run_mode: String,
    pub server_host: String,
    pub server_port: u16,
    pub workers: usize,

    // Base de données
    pub database_url: String,
    pub database_max_connections: u32,

    // Sécurité
    pub jwt_secret: String,
    pub access_token_ttl_hours: i64,
    pub refresh_token_ttl_days: i64,

    // Fournisseur d'identité externe
    pub idp_userinfo_url: String,

    // URLs
    pub frontend_url: String,
}

/// Configuration de la passerelle BFF.
///
/// `backend_api_url` reste optionnelle : son absence ne bloque pas le
/// démarrage, le proxy répond alors systématiquement 500 avec un message
/// fixe.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub server_host: String,
    pub server_port: u16,
    pub backend_api_url: Option<String>,
    pub static_dir: String,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> AppResult<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| AppError::ConfigurationError(format!("{} doit être un nombre", name)))
}

impl ApiConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> AppResult<Self> {
        // Charger le fichier .env si présent
        let _ = dotenv().ok();

        // Variables requises
        let required_vars = ["DATABASE_URL", "JWT_SECRET", "IDP_USERINFO_URL"];
        for var in &required_vars {
            if env::var(var).is_err() {
                return Err(AppError::ConfigurationError(format!(
                    "Variable d'environnement requise manquante: {}",
                    var
                )));
            }
        }

        let config = ApiConfig {
            run_mode: env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("SERVER_PORT", "8080")?,
            workers: parse_var("WORKERS", "4")?,

            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::ConfigurationError("DATABASE_URL manquante".to_string()))?,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "20")?,

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::ConfigurationError("JWT_SECRET manquante".to_string()))?,
            access_token_ttl_hours: parse_var("ACCESS_TOKEN_TTL_HOURS", "24")?,
            refresh_token_ttl_days: parse_var("REFRESH_TOKEN_TTL_DAYS", "30")?,

            idp_userinfo_url: env::var("IDP_USERINFO_URL").map_err(|_| {
                AppError::ConfigurationError("IDP_USERINFO_URL manquante".to_string())
            })?,

            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        };

        if config.jwt_secret.len() < 32 {
            tracing::warn!("JWT_SECRET trop court (< 32 caractères) - risque de sécurité");
        }

        Ok(config)
    }

    /// Vérifie si on est en production
    pub fn is_production(&self) -> bool {
        self.run_mode == "production"
    }
}

impl GatewayConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenv().ok();

        Ok(GatewayConfig {
            server_host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("GATEWAY_PORT", "3000")?,
            backend_api_url: env::var("BACKEND_API_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string()),
            static_dir: env::var("GATEWAY_STATIC_DIR").unwrap_or_else(|_| "./public".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_trailing_slash_is_normalized() {
        let config = GatewayConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            backend_api_url: Some("http://api.local/".trim_end_matches('/').to_string()),
            static_dir: "./public".to_string(),
        };
        assert_eq!(config.backend_api_url.as_deref(), Some("http://api.local"));
    }

    #[test]
    fn test_parse_var_rejects_non_numeric() {
        std::env::set_var("CARLOC_TEST_PORT", "abc");
        let parsed: AppResult<u16> = parse_var("CARLOC_TEST_PORT", "8080");
        assert!(parsed.is_err());
        std::env::remove_var("CARLOC_TEST_PORT");
    }
}

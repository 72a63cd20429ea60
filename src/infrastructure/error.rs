use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use validator::ValidationErrors;

/// Type de résultat standard pour l'application
pub type AppResult<T> = Result<T, AppError>;

/// Erreurs principales de l'application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Erreur d'authentification (401 Unauthorized)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Permissions insuffisantes (403 Forbidden)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Ressource non trouvée (404 Not Found)
    #[error("{0} not found")]
    NotFound(String),

    /// Conflit de ressources (409 Conflict)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Solde ou crédits insuffisants (402 Payment Required)
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    /// Données invalides (422 Unprocessable Entity)
    #[error("Validation failed: {0}")]
    ValidationError(ValidationErrors),

    /// Requête mal formée (400 Bad Request)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Erreur interne du serveur (500 Internal Server Error)
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// Erreur de base de données (500 Internal Server Error)
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    /// Erreur de sérialisation/désérialisation (500 Internal Server Error)
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Erreur de configuration (500 Internal Server Error)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Timeout d'opération (504 Gateway Timeout)
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Erreur de connexion vers un service externe (502 Bad Gateway)
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

impl AppError {
    /// Convertit l'erreur en code HTTP approprié
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::ConnectionError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message destiné au client, distinct du détail technique loggé
    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::Unauthorized(_) => {
                "Authentification échouée. Veuillez vous reconnecter.".to_string()
            }
            AppError::Forbidden(_) => {
                "Vous n'avez pas les permissions nécessaires pour cette action.".to_string()
            }
            AppError::NotFound(resource) => format!("{} non trouvé", resource),
            AppError::Conflict(message) => message.clone(),
            AppError::PaymentRequired(message) => message.clone(),
            AppError::ValidationError(errors) => {
                let mut messages = Vec::new();
                for field_errors in errors.errors().values() {
                    if let validator::ValidationErrorsKind::Field(field_errors) = field_errors {
                        for error in field_errors {
                            if let Some(msg) = error.message.as_ref() {
                                messages.push(msg.to_string());
                            }
                        }
                    }
                }
                if messages.is_empty() {
                    "Données invalides. Veuillez vérifier le format des champs.".to_string()
                } else {
                    messages.join("; ")
                }
            }
            AppError::BadRequest(message) => message.clone(),
            AppError::Timeout(_) => {
                "L'opération a pris trop de temps. Veuillez réessayer plus tard.".to_string()
            }
            AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::SerializationError(_)
            | AppError::ConfigurationError(_)
            | AppError::ConnectionError(_) => {
                "Une erreur interne est survenue. Notre équipe technique a été notifiée.".to_string()
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "erreur serveur");
        }

        let error_response = ErrorResponse {
            error: self.user_friendly_message(),
            code: self.status_code().as_u16(),
        };

        HttpResponse::build(self.status_code()).json(error_response)
    }
}

/// Structure de réponse d'erreur standardisée
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

// Implémentations From pour les conversions automatiques

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::InternalError(format!("IO error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::InternalError(error.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(error: uuid::Error) -> Self {
        AppError::BadRequest(format!("Identifiant invalide: {}", error))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        AppError::Unauthorized(format!("Token invalide: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AppError::Timeout("Request timeout".to_string())
        } else if error.is_connect() {
            AppError::ConnectionError("Connection failed".to_string())
        } else {
            AppError::ConnectionError(format!("HTTP request error: {}", error))
        }
    }
}

// Helper functions pour créer des erreurs courantes

pub fn not_found<T: Into<String>>(resource: T) -> AppError {
    AppError::NotFound(resource.into())
}

pub fn unauthorized<T: Into<String>>(message: T) -> AppError {
    AppError::Unauthorized(message.into())
}

pub fn forbidden<T: Into<String>>(message: T) -> AppError {
    AppError::Forbidden(message.into())
}

pub fn conflict<T: Into<String>>(message: T) -> AppError {
    AppError::Conflict(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            unauthorized("token expiré").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(not_found("Véhicule").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::PaymentRequired("solde insuffisant".into()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_internal_detail_is_not_leaked_to_client() {
        let err = AppError::InternalError("pool exhausted on pg-replica-2".to_string());
        let message = err.user_friendly_message();
        assert!(!message.contains("pg-replica-2"));
    }

    #[test]
    fn test_not_found_message_names_resource() {
        assert_eq!(
            not_found("Véhicule").user_friendly_message(),
            "Véhicule non trouvé"
        );
    }
}

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Rôle d'un profil sur la marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ProfileRole {
    /// Locataire : réserve des véhicules
    #[serde(rename = "LOCATAIRE")]
    #[sqlx(rename = "LOCATAIRE")]
    Locataire,
    /// Propriétaire : publie des véhicules
    #[serde(rename = "PROPRIETAIRE")]
    #[sqlx(rename = "PROPRIETAIRE")]
    Proprietaire,
    /// Administrateur de la plateforme
    #[serde(rename = "ADMIN")]
    #[sqlx(rename = "ADMIN")]
    Admin,
}

/// Statut de vérification d'identité (KYC) d'un profil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum KycStatus {
    #[serde(rename = "NON_SOUMIS")]
    #[sqlx(rename = "NON_SOUMIS")]
    NonSoumis,
    #[serde(rename = "EN_ATTENTE")]
    #[sqlx(rename = "EN_ATTENTE")]
    EnAttente,
    #[serde(rename = "VERIFIE")]
    #[sqlx(rename = "VERIFIE")]
    Verifie,
    #[serde(rename = "REFUSE")]
    #[sqlx(rename = "REFUSE")]
    Refuse,
}

/// Représente un utilisateur de la marketplace (locataire ou propriétaire)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    /// Identifiant unique du profil (UUID)
    pub id: Uuid,
    /// Email (unique)
    pub email: String,
    /// Prénom
    pub first_name: String,
    /// Nom de famille
    pub last_name: String,
    /// Téléphone (optionnel)
    pub phone: Option<String>,
    /// Rôle sur la plateforme
    pub role: ProfileRole,
    /// Statut de vérification d'identité
    pub kyc_status: KycStatus,
    /// Identifiant `sub` chez le fournisseur d'identité externe
    #[serde(skip_serializing)]
    pub idp_subject: String,
    /// Hash Argon2 du mot de passe (comptes back-office uniquement)
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Statut du compte (actif/désactivé)
    pub is_active: bool,
    /// Date de création du compte
    pub created_at: DateTime<Utc>,
    /// Date de dernière mise à jour
    pub updated_at: DateTime<Utc>,
}

/// Données requises pour créer un nouveau profil
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProfile {
    #[validate(email(message = "Format d'email invalide"))]
    pub email: String,
    #[validate(length(min = 1, message = "Le prénom est requis"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Le nom est requis"))]
    pub last_name: String,
    pub phone: Option<String>,
    pub role: ProfileRole,
    pub idp_subject: String,
}

/// Pièce justificative soumise pour la vérification d'identité
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KycSubmission {
    /// Identifiant unique de la soumission
    pub id: Uuid,
    /// Profil concerné
    pub profile_id: Uuid,
    /// Type de document (permis, carte d'identité, justificatif de domicile)
    pub document_type: String,
    /// Référence du document dans le stockage externe
    pub document_ref: String,
    /// Statut de la soumission (miroir du statut du profil)
    pub status: KycStatus,
    /// Note du vérificateur lors du verdict
    pub reviewer_note: Option<String>,
    /// Date du verdict
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Date de soumission
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Vérifie si le profil peut publier des véhicules
    pub fn can_list_vehicles(&self) -> bool {
        matches!(self.role, ProfileRole::Proprietaire | ProfileRole::Admin)
            && self.kyc_status == KycStatus::Verifie
    }

    /// Vérifie si le profil a les droits d'administration
    pub fn is_admin(&self) -> bool {
        matches!(self.role, ProfileRole::Admin)
    }

    /// Nom complet affichable
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Hash un mot de passe avec Argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string())
    }

    /// Vérifie si un mot de passe correspond au hash stocké
    pub fn verify_password(&self, password: &str) -> bool {
        let Some(hash) = &self.password_hash else {
            return false;
        };
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl KycStatus {
    /// Un verdict ne peut être rendu que sur un dossier en attente
    pub fn awaiting_review(self) -> bool {
        self == KycStatus::EnAttente
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(role: ProfileRole, kyc: KycStatus) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "jean.dupont@example.com".to_string(),
            first_name: "Jean".to_string(),
            last_name: "Dupont".to_string(),
            phone: None,
            role,
            kyc_status: kyc,
            idp_subject: "idp|123".to_string(),
            password_hash: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_publication_requires_owner_role_and_verified_kyc() {
        assert!(profile(ProfileRole::Proprietaire, KycStatus::Verifie).can_list_vehicles());
        assert!(!profile(ProfileRole::Proprietaire, KycStatus::EnAttente).can_list_vehicles());
        assert!(!profile(ProfileRole::Locataire, KycStatus::Verifie).can_list_vehicles());
    }

    #[test]
    fn test_serialized_role_values() {
        let json = serde_json::to_string(&ProfileRole::Proprietaire).unwrap();
        assert_eq!(json, "\"PROPRIETAIRE\"");
        let json = serde_json::to_string(&KycStatus::NonSoumis).unwrap();
        assert_eq!(json, "\"NON_SOUMIS\"");
    }

    #[test]
    fn test_password_round_trip() {
        let mut p = profile(ProfileRole::Admin, KycStatus::Verifie);
        p.password_hash = Some(Profile::hash_password("correct horse battery").unwrap());

        assert!(p.verify_password("correct horse battery"));
        assert!(!p.verify_password("mauvais mot de passe"));
    }

    #[test]
    fn test_profile_without_password_rejects_everything() {
        let p = profile(ProfileRole::Locataire, KycStatus::Verifie);
        assert!(!p.verify_password(""));
        assert!(!p.verify_password("nimporte"));
    }

    #[test]
    fn test_idp_subject_is_not_serialized() {
        let p = profile(ProfileRole::Locataire, KycStatus::Verifie);
        let value = serde_json::to_value(&p).unwrap();
        assert!(value.get("idp_subject").is_none());
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "jean.dupont@example.com");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Un véhicule publié par un propriétaire
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    /// Identifiant unique du véhicule (UUID)
    pub id: Uuid,
    /// Profil propriétaire
    pub owner_id: Uuid,
    /// Marque
    pub make: String,
    /// Modèle
    pub model: String,
    /// Année de mise en circulation
    pub year: i32,
    /// Plaque d'immatriculation (unique)
    pub registration: String,
    /// Ville de mise à disposition
    pub city: String,
    /// Tarif journalier en centimes
    pub daily_rate_cents: i64,
    /// Tarif journalier appliqué à partir de 7 jours
    pub weekly_daily_rate_cents: i64,
    /// Tarif journalier appliqué à partir de 30 jours
    pub monthly_daily_rate_cents: i64,
    /// Le véhicule est-il visible dans la recherche publique
    pub is_published: bool,
    /// Date de création de l'annonce
    pub created_at: DateTime<Utc>,
    /// Date de dernière mise à jour
    pub updated_at: DateTime<Utc>,
}

/// Données requises pour publier un nouveau véhicule
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewVehicle {
    #[validate(length(min = 1, message = "La marque est requise"))]
    pub make: String,
    #[validate(length(min = 1, message = "Le modèle est requis"))]
    pub model: String,
    #[validate(range(min = 1980, max = 2100, message = "Année invalide"))]
    pub year: i32,
    #[validate(length(min = 4, message = "Immatriculation invalide"))]
    pub registration: String,
    #[validate(length(min = 1, message = "La ville est requise"))]
    pub city: String,
    #[validate(range(min = 100, message = "Le tarif journalier minimum est de 1 €"))]
    pub daily_rate_cents: i64,
    #[validate(range(min = 100, message = "Le tarif hebdomadaire minimum est de 1 €"))]
    pub weekly_daily_rate_cents: i64,
    #[validate(range(min = 100, message = "Le tarif mensuel minimum est de 1 €"))]
    pub monthly_daily_rate_cents: i64,
}

/// Données pour mettre à jour une annonce
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleUpdate {
    pub city: Option<String>,
    pub daily_rate_cents: Option<i64>,
    pub weekly_daily_rate_cents: Option<i64>,
    pub monthly_daily_rate_cents: Option<i64>,
    pub is_published: Option<bool>,
}

impl Vehicle {
    /// Sélectionne le palier tarifaire applicable à une durée de location.
    ///
    /// Les paliers sont dégressifs : le tarif hebdomadaire s'applique à
    /// partir de 7 jours, le tarif mensuel à partir de 30 jours.
    pub fn rate_for_duration(&self, days: i64) -> i64 {
        if days >= 30 {
            self.monthly_daily_rate_cents
        } else if days >= 7 {
            self.weekly_daily_rate_cents
        } else {
            self.daily_rate_cents
        }
    }

    /// Prix total d'une location en centimes pour une durée donnée
    pub fn price_for_duration(&self, days: i64) -> i64 {
        self.rate_for_duration(days) * days
    }

    /// Libellé affichable de l'annonce
    pub fn title(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            make: "Renault".to_string(),
            model: "Clio".to_string(),
            year: 2021,
            registration: "AB-123-CD".to_string(),
            city: "Lyon".to_string(),
            daily_rate_cents: 4500,
            weekly_daily_rate_cents: 4000,
            monthly_daily_rate_cents: 3200,
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_daily_rate_below_one_week() {
        let v = vehicle();
        assert_eq!(v.rate_for_duration(1), 4500);
        assert_eq!(v.rate_for_duration(6), 4500);
        assert_eq!(v.price_for_duration(3), 13_500);
    }

    #[test]
    fn test_weekly_tier_from_seven_days() {
        let v = vehicle();
        assert_eq!(v.rate_for_duration(7), 4000);
        assert_eq!(v.rate_for_duration(29), 4000);
        assert_eq!(v.price_for_duration(7), 28_000);
    }

    #[test]
    fn test_monthly_tier_from_thirty_days() {
        let v = vehicle();
        assert_eq!(v.rate_for_duration(30), 3200);
        assert_eq!(v.price_for_duration(30), 96_000);
        assert_eq!(v.price_for_duration(45), 144_000);
    }
}

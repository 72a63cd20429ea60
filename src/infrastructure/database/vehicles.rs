use sqlx::{Error as SqlxError, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::vehicle::{NewVehicle, Vehicle, VehicleUpdate},
    infrastructure::error::{AppError, AppResult},
};

const VEHICLE_COLUMNS: &str = "id, owner_id, make, model, year, registration, city, \
     daily_rate_cents, weekly_daily_rate_cents, monthly_daily_rate_cents, \
     is_published, created_at, updated_at";

/// Repository pour les annonces de véhicules
#[derive(Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum VehicleError {
    #[error("Véhicule non trouvé")]
    NotFound,
    #[error("Immatriculation déjà enregistrée")]
    RegistrationExists,
    #[error("Le véhicule a des réservations actives")]
    HasActiveReservations,
    #[error("Validation échouée: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl From<VehicleError> for AppError {
    fn from(error: VehicleError) -> Self {
        match error {
            VehicleError::NotFound => AppError::NotFound("Véhicule".to_string()),
            VehicleError::RegistrationExists => {
                AppError::Conflict("Immatriculation déjà enregistrée".to_string())
            }
            VehicleError::HasActiveReservations => AppError::Conflict(
                "Impossible de supprimer une annonce avec des réservations actives".to_string(),
            ),
            VehicleError::ValidationError(errors) => AppError::ValidationError(errors),
            VehicleError::DatabaseError(e) => AppError::DatabaseError(e),
        }
    }
}

/// Filtres de recherche publique
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct VehicleSearch {
    pub city: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl VehicleRepository {
    /// Crée une nouvelle instance du repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Publie une nouvelle annonce pour un propriétaire
    pub async fn create(&self, owner_id: &Uuid, new_vehicle: &NewVehicle) -> AppResult<Vehicle> {
        new_vehicle.validate().map_err(VehicleError::ValidationError)?;

        if self.registration_exists(&new_vehicle.registration).await? {
            return Err(VehicleError::RegistrationExists.into());
        }

        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "INSERT INTO vehicles \
                 (id, owner_id, make, model, year, registration, city, daily_rate_cents, \
                  weekly_daily_rate_cents, monthly_daily_rate_cents, is_published, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, now(), now()) \
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&new_vehicle.make)
        .bind(&new_vehicle.model)
        .bind(new_vehicle.year)
        .bind(&new_vehicle.registration)
        .bind(&new_vehicle.city)
        .bind(new_vehicle.daily_rate_cents)
        .bind(new_vehicle.weekly_daily_rate_cents)
        .bind(new_vehicle.monthly_daily_rate_cents)
        .fetch_one(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?;

        Ok(vehicle)
    }

    /// Récupère un véhicule par son ID
    pub async fn get_by_id(&self, vehicle_id: &Uuid) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"
        ))
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?
        .ok_or(VehicleError::NotFound)?;

        Ok(vehicle)
    }

    /// Met à jour une annonce (tarifs, ville, publication)
    pub async fn update(&self, vehicle_id: &Uuid, update: &VehicleUpdate) -> AppResult<Vehicle> {
        let mut existing = self.get_by_id(vehicle_id).await?;

        if let Some(city) = &update.city {
            existing.city = city.clone();
        }
        if let Some(rate) = update.daily_rate_cents {
            existing.daily_rate_cents = rate;
        }
        if let Some(rate) = update.weekly_daily_rate_cents {
            existing.weekly_daily_rate_cents = rate;
        }
        if let Some(rate) = update.monthly_daily_rate_cents {
            existing.monthly_daily_rate_cents = rate;
        }
        if let Some(published) = update.is_published {
            existing.is_published = published;
        }

        let updated = sqlx::query_as::<_, Vehicle>(&format!(
            "UPDATE vehicles \
             SET city = $1, daily_rate_cents = $2, weekly_daily_rate_cents = $3, \
                 monthly_daily_rate_cents = $4, is_published = $5, updated_at = now() \
             WHERE id = $6 \
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(&existing.city)
        .bind(existing.daily_rate_cents)
        .bind(existing.weekly_daily_rate_cents)
        .bind(existing.monthly_daily_rate_cents)
        .bind(existing.is_published)
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?;

        Ok(updated)
    }

    /// Supprime une annonce sans réservation active
    pub async fn delete(&self, vehicle_id: &Uuid) -> AppResult<()> {
        let has_active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reservations \
             WHERE vehicle_id = $1 AND status IN ('PAYEE', 'CONFIRMEE', 'EN_COURS'))",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?;

        if has_active {
            return Err(VehicleError::HasActiveReservations.into());
        }

        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(vehicle_id)
            .execute(&self.pool)
            .await
            .map_err(VehicleError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(VehicleError::NotFound.into());
        }

        Ok(())
    }

    /// Recherche publique des annonces publiées
    pub async fn list_published(&self, search: &VehicleSearch) -> AppResult<Vec<Vehicle>> {
        let per_page = search.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (search.page.unwrap_or(1).max(1) - 1) * per_page;

        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles \
             WHERE is_published = true AND ($1::text IS NULL OR city ILIKE $1) \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&search.city)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?;

        Ok(vehicles)
    }

    /// Liste les annonces d'un propriétaire
    pub async fn list_by_owner(&self, owner_id: &Uuid) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles \
             WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?;

        Ok(vehicles)
    }

    /// Vérifie si une immatriculation est déjà enregistrée
    async fn registration_exists(&self, registration: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE registration = $1)",
        )
        .bind(registration)
        .fetch_one(&self.pool)
        .await
        .map_err(VehicleError::DatabaseError)?;

        Ok(exists)
    }
}

use sqlx::{Error as SqlxError, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    domain::reservation::{NewReservation, Reservation, ReservationStatus},
    domain::vehicle::Vehicle,
    domain::wallet::{NewWalletTransaction, TransactionDirection},
    infrastructure::database::wallet::{WalletError, WalletRepository},
    infrastructure::error::{AppError, AppResult},
};

const RESERVATION_COLUMNS: &str = "id, vehicle_id, renter_id, start_date, end_date, \
     total_price_cents, status, confirmed_at, started_at, closed_at, created_at, updated_at";

const RESERVATION_COLUMNS_R: &str = "r.id, r.vehicle_id, r.renter_id, r.start_date, r.end_date, \
     r.total_price_cents, r.status, r.confirmed_at, r.started_at, r.closed_at, \
     r.created_at, r.updated_at";

/// Repository des réservations.
///
/// Les changements d'état et les mouvements de portefeuille associés
/// (paiement, remboursement, reversement) sont appliqués dans une même
/// transaction SQL : la ligne de réservation est verrouillée le temps de
/// vérifier la légalité de la transition.
#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Réservation non trouvée")]
    NotFound,
    #[error("Transition interdite: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    #[error("Le véhicule n'est pas disponible sur ces dates")]
    VehicleUnavailable,
    #[error("Dates invalides: {0}")]
    InvalidDates(String),
    #[error("Le litige est déjà résolu")]
    DisputeAlreadyResolved,
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("Erreur de base de données: {0}")]
    DatabaseError(#[from] SqlxError),
}

impl From<ReservationError> for AppError {
    fn from(error: ReservationError) -> Self {
        match error {
            ReservationError::NotFound => AppError::NotFound("Réservation".to_string()),
            ReservationError::InvalidTransition { .. } => AppError::Conflict(
                "Ce changement d'état n'est pas autorisé par le cycle de réservation".to_string(),
            ),
            ReservationError::VehicleUnavailable => {
                AppError::Conflict("Le véhicule n'est pas disponible sur ces dates".to_string())
            }
            ReservationError::InvalidDates(message) => AppError::BadRequest(message),
            ReservationError::DisputeAlreadyResolved => {
                AppError::Conflict("Le litige est déjà résolu".to_string())
            }
            ReservationError::Wallet(e) => e.into(),
            ReservationError::DatabaseError(e) => AppError::DatabaseError(e),
        }
    }
}

impl ReservationRepository {
    /// Crée une nouvelle instance du repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crée une réservation payée.
    ///
    /// Dans une seule transaction : verrouille le véhicule, vérifie
    /// l'absence de chevauchement avec une réservation active, insère la
    /// réservation en PAYEE puis débite le portefeuille du locataire du
    /// prix total calculé sur les paliers tarifaires du véhicule.
    pub async fn create_paid(
        &self,
        renter_id: &Uuid,
        new: &NewReservation,
        vehicle: &Vehicle,
    ) -> AppResult<Reservation> {
        if new.start_date > new.end_date {
            return Err(ReservationError::InvalidDates(
                "La date de fin doit être postérieure à la date de début".to_string(),
            )
            .into());
        }

        let days = new.duration_days();
        let total_price_cents = vehicle.price_for_duration(days);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(ReservationError::DatabaseError)?;

        // Sérialise les contrôles de chevauchement sur ce véhicule
        sqlx::query("SELECT 1 FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(vehicle.id)
            .execute(&mut *tx)
            .await
            .map_err(ReservationError::DatabaseError)?;

        let overlaps = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reservations \
             WHERE vehicle_id = $1 \
               AND status IN ('PAYEE', 'CONFIRMEE', 'EN_COURS') \
               AND start_date <= $3 AND end_date >= $2)",
        )
        .bind(vehicle.id)
        .bind(new.start_date)
        .bind(new.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(ReservationError::DatabaseError)?;

        if overlaps {
            return Err(ReservationError::VehicleUnavailable.into());
        }

        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "INSERT INTO reservations \
                 (id, vehicle_id, renter_id, start_date, end_date, total_price_cents, status, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now()) \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(vehicle.id)
        .bind(renter_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(total_price_cents)
        .bind(ReservationStatus::Payee)
        .fetch_one(&mut *tx)
        .await
        .map_err(ReservationError::DatabaseError)?;

        WalletRepository::append_in(
            &mut tx,
            &NewWalletTransaction {
                profile_id: *renter_id,
                direction: TransactionDirection::Debit,
                amount_cents: total_price_cents,
                reservation_id: Some(reservation.id),
                label: format!("Paiement location {}", vehicle.title()),
            },
        )
        .await
        .map_err(ReservationError::Wallet)?;

        tx.commit().await.map_err(ReservationError::DatabaseError)?;

        Ok(reservation)
    }

    /// Récupère une réservation par son ID
    pub async fn get_by_id(&self, reservation_id: &Uuid) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ReservationError::DatabaseError)?
        .ok_or(ReservationError::NotFound)?;

        Ok(reservation)
    }

    /// Applique une transition du pipeline, avec les mouvements de
    /// portefeuille induits (reversement au propriétaire sur TERMINEE,
    /// remboursement du locataire sur ANNULEE).
    pub async fn transition(
        &self,
        reservation_id: &Uuid,
        next: ReservationStatus,
    ) -> AppResult<Reservation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(ReservationError::DatabaseError)?;

        let current = Self::lock(&mut tx, reservation_id).await?;

        if !current.status.can_transition_to(next) {
            return Err(ReservationError::InvalidTransition {
                from: current.status,
                to: next,
            }
            .into());
        }

        let sql = match next {
            ReservationStatus::Confirmee => {
                "UPDATE reservations SET status = $1, confirmed_at = now(), updated_at = now() \
                 WHERE id = $2 RETURNING id, vehicle_id, renter_id, start_date, end_date, \
                 total_price_cents, status, confirmed_at, started_at, closed_at, created_at, updated_at"
            }
            ReservationStatus::EnCours => {
                "UPDATE reservations SET status = $1, started_at = now(), updated_at = now() \
                 WHERE id = $2 RETURNING id, vehicle_id, renter_id, start_date, end_date, \
                 total_price_cents, status, confirmed_at, started_at, closed_at, created_at, updated_at"
            }
            ReservationStatus::Terminee | ReservationStatus::Annulee => {
                "UPDATE reservations SET status = $1, closed_at = now(), updated_at = now() \
                 WHERE id = $2 RETURNING id, vehicle_id, renter_id, start_date, end_date, \
                 total_price_cents, status, confirmed_at, started_at, closed_at, created_at, updated_at"
            }
            // le litige reste ouvert jusqu'à résolution par un admin
            ReservationStatus::Litige => {
                "UPDATE reservations SET status = $1, updated_at = now() \
                 WHERE id = $2 RETURNING id, vehicle_id, renter_id, start_date, end_date, \
                 total_price_cents, status, confirmed_at, started_at, closed_at, created_at, updated_at"
            }
            // aucune transition ne mène vers PAYEE, can_transition_to l'a rejeté
            ReservationStatus::Payee => unreachable!("transition vers PAYEE rejetée en amont"),
        };

        let updated = sqlx::query_as::<_, Reservation>(sql)
            .bind(next)
            .bind(reservation_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(ReservationError::DatabaseError)?;

        match next {
            ReservationStatus::Terminee => {
                let owner_id = Self::vehicle_owner(&mut tx, &updated.vehicle_id).await?;
                WalletRepository::append_in(
                    &mut tx,
                    &NewWalletTransaction {
                        profile_id: owner_id,
                        direction: TransactionDirection::Credit,
                        amount_cents: updated.total_price_cents,
                        reservation_id: Some(updated.id),
                        label: "Reversement location terminée".to_string(),
                    },
                )
                .await
                .map_err(ReservationError::Wallet)?;
            }
            ReservationStatus::Annulee => {
                WalletRepository::append_in(
                    &mut tx,
                    &NewWalletTransaction {
                        profile_id: updated.renter_id,
                        direction: TransactionDirection::Credit,
                        amount_cents: updated.total_price_cents,
                        reservation_id: Some(updated.id),
                        label: "Remboursement réservation annulée".to_string(),
                    },
                )
                .await
                .map_err(ReservationError::Wallet)?;
            }
            _ => {}
        }

        tx.commit().await.map_err(ReservationError::DatabaseError)?;

        Ok(updated)
    }

    /// Résout un litige (admin) : clôture la réservation et applique le
    /// verdict au portefeuille (remboursement du locataire, ou
    /// reversement au propriétaire).
    pub async fn resolve_dispute(
        &self,
        reservation_id: &Uuid,
        refund_renter: bool,
    ) -> AppResult<Reservation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(ReservationError::DatabaseError)?;

        let current = Self::lock(&mut tx, reservation_id).await?;

        if current.status != ReservationStatus::Litige {
            return Err(ReservationError::InvalidTransition {
                from: current.status,
                to: ReservationStatus::Litige,
            }
            .into());
        }
        if current.closed_at.is_some() {
            return Err(ReservationError::DisputeAlreadyResolved.into());
        }

        let updated = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET closed_at = now(), updated_at = now() \
             WHERE id = $1 RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(ReservationError::DatabaseError)?;

        let (profile_id, label) = if refund_renter {
            (updated.renter_id, "Remboursement suite à litige")
        } else {
            (
                Self::vehicle_owner(&mut tx, &updated.vehicle_id).await?,
                "Reversement suite à litige",
            )
        };

        WalletRepository::append_in(
            &mut tx,
            &NewWalletTransaction {
                profile_id,
                direction: TransactionDirection::Credit,
                amount_cents: updated.total_price_cents,
                reservation_id: Some(updated.id),
                label: label.to_string(),
            },
        )
        .await
        .map_err(ReservationError::Wallet)?;

        tx.commit().await.map_err(ReservationError::DatabaseError)?;

        Ok(updated)
    }

    /// Réservations passées par un locataire
    pub async fn list_by_renter(&self, renter_id: &Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE renter_id = $1 ORDER BY created_at DESC"
        ))
        .bind(renter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ReservationError::DatabaseError)?;

        Ok(reservations)
    }

    /// Réservations reçues par un propriétaire sur l'ensemble de ses véhicules
    pub async fn list_by_owner(&self, owner_id: &Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS_R} FROM reservations r \
             JOIN vehicles v ON v.id = r.vehicle_id \
             WHERE v.owner_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ReservationError::DatabaseError)?;

        Ok(reservations)
    }

    /// Liste paginée de toutes les réservations (admin)
    pub async fn list_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ReservationError::DatabaseError)?;

        Ok(reservations)
    }

    /// Verrouille une réservation le temps d'une transition
    async fn lock(
        conn: &mut PgConnection,
        reservation_id: &Uuid,
    ) -> Result<Reservation, ReservationError> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(ReservationError::NotFound)
    }

    async fn vehicle_owner(
        conn: &mut PgConnection,
        vehicle_id: &Uuid,
    ) -> Result<Uuid, ReservationError> {
        sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM vehicles WHERE id = $1")
            .bind(vehicle_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(ReservationError::NotFound)
    }
}

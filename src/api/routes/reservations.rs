use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::routes::middleware::CurrentProfile,
    api::routes::profiles::Pagination,
    domain::reservation::{NewReservation, Reservation, ReservationStatus},
    infrastructure::database::{Database, ReservationRepository, VehicleRepository},
    infrastructure::error::{AppError, AppResult},
};

/// Verdict d'un litige rendu par un admin
#[derive(Deserialize)]
pub struct DisputeVerdict {
    /// true : remboursement du locataire, false : reversement au propriétaire
    pub refund_renter: bool,
}

/// Création d'une réservation par un locataire.
///
/// Le prix total est calculé côté serveur à partir des paliers
/// tarifaires du véhicule, puis débité du portefeuille. La réservation
/// démarre en PAYEE.
#[post("/reservations")]
pub async fn create(
    current: CurrentProfile,
    request: web::Json<NewReservation>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicle = vehicle_repo.get_by_id(&request.vehicle_id).await?;

    if !vehicle.is_published {
        return Err(AppError::Conflict(
            "Cette annonce n'est plus disponible".to_string(),
        ));
    }
    if vehicle.owner_id == current.id {
        return Err(AppError::Conflict(
            "Impossible de réserver son propre véhicule".to_string(),
        ));
    }

    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let reservation = reservation_repo
        .create_paid(&current.id, &request, &vehicle)
        .await?;

    tracing::info!(
        reservation_id = %reservation.id,
        vehicle_id = %vehicle.id,
        total_cents = reservation.total_price_cents,
        "réservation créée"
    );

    Ok(HttpResponse::Created().json(reservation))
}

/// Détail d'une réservation, visible par ses participants et les admins
#[get("/reservations/{id}")]
pub async fn detail(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let (reservation, owner_id) = load_with_owner(&db, &path.into_inner()).await?;

    let is_participant = current.id == reservation.renter_id || current.id == owner_id;
    if !is_participant && !matches!(current.role, crate::domain::profile::ProfileRole::Admin) {
        return Err(AppError::Forbidden(
            "Cette réservation ne vous concerne pas".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(reservation))
}

/// Confirmation par le propriétaire (PAYEE → CONFIRMEE)
#[post("/reservations/{id}/confirm")]
pub async fn confirm(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    transition_as_owner(&db, &current, &path.into_inner(), ReservationStatus::Confirmee).await
}

/// Remise du véhicule par le propriétaire (CONFIRMEE → EN_COURS)
#[post("/reservations/{id}/start")]
pub async fn start(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    transition_as_owner(&db, &current, &path.into_inner(), ReservationStatus::EnCours).await
}

/// Restitution du véhicule (EN_COURS → TERMINEE).
///
/// Déclenche le reversement du prix au propriétaire.
#[post("/reservations/{id}/finish")]
pub async fn finish(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    transition_as_owner(&db, &current, &path.into_inner(), ReservationStatus::Terminee).await
}

/// Annulation avant le début de la location, par l'une ou l'autre
/// partie. Déclenche le remboursement du locataire.
#[post("/reservations/{id}/cancel")]
pub async fn cancel(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let reservation_id = path.into_inner();
    let (reservation, owner_id) = load_with_owner(&db, &reservation_id).await?;

    if current.id != reservation.renter_id && current.id != owner_id {
        return Err(AppError::Forbidden(
            "Cette réservation ne vous concerne pas".to_string(),
        ));
    }

    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let updated = reservation_repo
        .transition(&reservation_id, ReservationStatus::Annulee)
        .await?;

    tracing::info!(reservation_id = %updated.id, "réservation annulée");

    Ok(HttpResponse::Ok().json(updated))
}

/// Ouverture d'un litige pendant la location, par l'une ou l'autre partie
#[post("/reservations/{id}/dispute")]
pub async fn open_dispute(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let reservation_id = path.into_inner();
    let (reservation, owner_id) = load_with_owner(&db, &reservation_id).await?;

    if current.id != reservation.renter_id && current.id != owner_id {
        return Err(AppError::Forbidden(
            "Cette réservation ne vous concerne pas".to_string(),
        ));
    }

    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let updated = reservation_repo
        .transition(&reservation_id, ReservationStatus::Litige)
        .await?;

    tracing::warn!(reservation_id = %updated.id, "litige ouvert");

    Ok(HttpResponse::Ok().json(updated))
}

/// Réservations passées par le locataire courant
#[get("/my/reservations")]
pub async fn my_rentals(
    current: CurrentProfile,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let reservations = reservation_repo.list_by_renter(&current.id).await?;

    Ok(HttpResponse::Ok().json(reservations))
}

/// Réservations reçues sur les véhicules du propriétaire courant
#[get("/my/bookings")]
pub async fn my_bookings(
    current: CurrentProfile,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let reservations = reservation_repo.list_by_owner(&current.id).await?;

    Ok(HttpResponse::Ok().json(reservations))
}

/// Liste paginée de toutes les réservations (admin)
#[get("/reservations")]
pub async fn list_all(
    query: web::Query<Pagination>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let (limit, offset) = query.limits();

    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let reservations = reservation_repo.list_all(limit, offset).await?;

    Ok(HttpResponse::Ok().json(reservations))
}

/// Résolution d'un litige par un admin
#[post("/reservations/{id}/resolve")]
pub async fn resolve_dispute(
    path: web::Path<Uuid>,
    verdict: web::Json<DisputeVerdict>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let updated = reservation_repo
        .resolve_dispute(&path.into_inner(), verdict.refund_renter)
        .await?;

    tracing::info!(
        reservation_id = %updated.id,
        refund_renter = verdict.refund_renter,
        "litige résolu"
    );

    Ok(HttpResponse::Ok().json(updated))
}

/// Charge une réservation et l'identifiant du propriétaire du véhicule
async fn load_with_owner(
    db: &web::Data<Database>,
    reservation_id: &Uuid,
) -> AppResult<(Reservation, Uuid)> {
    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let reservation = reservation_repo.get_by_id(reservation_id).await?;

    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicle = vehicle_repo.get_by_id(&reservation.vehicle_id).await?;

    Ok((reservation, vehicle.owner_id))
}

/// Transition réservée au propriétaire du véhicule
async fn transition_as_owner(
    db: &web::Data<Database>,
    current: &CurrentProfile,
    reservation_id: &Uuid,
    next: ReservationStatus,
) -> AppResult<HttpResponse> {
    let (_, owner_id) = load_with_owner(db, reservation_id).await?;

    if current.id != owner_id {
        return Err(AppError::Forbidden(
            "Seul le propriétaire du véhicule peut effectuer cette action".to_string(),
        ));
    }

    let reservation_repo = ReservationRepository::new(db.pool.clone());
    let updated = reservation_repo.transition(reservation_id, next).await?;

    Ok(HttpResponse::Ok().json(updated))
}

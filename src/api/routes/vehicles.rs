use actix_web::{delete, get, patch, post, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::routes::middleware::CurrentProfile,
    domain::vehicle::{NewVehicle, VehicleUpdate},
    infrastructure::database::{vehicles::VehicleSearch, Database, ProfileRepository, VehicleRepository},
    infrastructure::error::{AppError, AppResult},
};

/// Recherche publique des annonces publiées
#[get("/vehicles")]
pub async fn search(
    query: web::Query<VehicleSearch>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicles = vehicle_repo.list_published(&query).await?;

    Ok(HttpResponse::Ok().json(vehicles))
}

/// Détail public d'une annonce
#[get("/vehicles/{id}")]
pub async fn detail(path: web::Path<Uuid>, db: web::Data<Database>) -> AppResult<HttpResponse> {
    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicle = vehicle_repo.get_by_id(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(vehicle))
}

/// Publication d'une nouvelle annonce.
///
/// Réservé aux propriétaires dont l'identité est vérifiée.
#[post("/vehicles")]
pub async fn create(
    current: CurrentProfile,
    request: web::Json<NewVehicle>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let profile_repo = ProfileRepository::new(db.pool.clone());
    let profile = profile_repo.get_by_id(&current.id).await?;

    if !profile.can_list_vehicles() {
        return Err(AppError::Forbidden(
            "Seul un propriétaire dont l'identité est vérifiée peut publier une annonce"
                .to_string(),
        ));
    }

    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicle = vehicle_repo.create(&current.id, &request).await?;

    tracing::info!(vehicle_id = %vehicle.id, owner_id = %current.id, "annonce créée");

    Ok(HttpResponse::Created().json(vehicle))
}

/// Mise à jour d'une annonce par son propriétaire
#[patch("/vehicles/{id}")]
pub async fn update(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    request: web::Json<VehicleUpdate>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let vehicle_id = path.into_inner();

    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicle = vehicle_repo.get_by_id(&vehicle_id).await?;

    if vehicle.owner_id != current.id {
        return Err(AppError::Forbidden(
            "Seul le propriétaire peut modifier cette annonce".to_string(),
        ));
    }

    let updated = vehicle_repo.update(&vehicle_id, &request).await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Suppression d'une annonce sans réservation active
#[delete("/vehicles/{id}")]
pub async fn delete(
    current: CurrentProfile,
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let vehicle_id = path.into_inner();

    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicle = vehicle_repo.get_by_id(&vehicle_id).await?;

    if vehicle.owner_id != current.id {
        return Err(AppError::Forbidden(
            "Seul le propriétaire peut supprimer cette annonce".to_string(),
        ));
    }

    vehicle_repo.delete(&vehicle_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Annonces du propriétaire courant
#[get("/my/vehicles")]
pub async fn my_vehicles(
    current: CurrentProfile,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let vehicle_repo = VehicleRepository::new(db.pool.clone());
    let vehicles = vehicle_repo.list_by_owner(&current.id).await?;

    Ok(HttpResponse::Ok().json(vehicles))
}

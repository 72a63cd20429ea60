use actix_web::{get, post, web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::routes::middleware::CurrentProfile,
    domain::review::NewReview,
    infrastructure::database::{Database, ReviewRepository},
    infrastructure::error::AppResult,
};

/// Publication d'un avis sur une location terminée
#[post("/reviews")]
pub async fn create(
    current: CurrentProfile,
    request: web::Json<NewReview>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    request.validate()?;

    let review_repo = ReviewRepository::new(db.pool.clone());
    let review = review_repo.create(&current.id, &request).await?;

    Ok(HttpResponse::Created().json(review))
}

/// Avis portant sur un véhicule (public)
#[get("/vehicles/{id}/reviews")]
pub async fn list_for_vehicle(
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let review_repo = ReviewRepository::new(db.pool.clone());
    let reviews = review_repo.list_for_vehicle(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(reviews))
}

/// Avis reçus par un profil (public)
#[get("/profiles/{id}/reviews")]
pub async fn list_for_profile(
    path: web::Path<Uuid>,
    db: web::Data<Database>,
) -> AppResult<HttpResponse> {
    let review_repo = ReviewRepository::new(db.pool.clone());
    let reviews = review_repo.list_for_profile(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(reviews))
}

use actix_web::web;

pub mod auth;
pub mod kyc;
pub mod middleware;
pub mod profiles;
pub mod reservations;
pub mod reviews;
pub mod vehicles;
pub mod wallet;

/// Configure toutes les routes de l'API
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Routes publiques
            .service(auth::login_token)
            .service(auth::login)
            .service(auth::refresh)
            .service(auth::logout)
            .service(vehicles::search)
            .service(vehicles::detail)
            .service(reviews::list_for_vehicle)
            .service(reviews::list_for_profile)
            // Routes protégées par authentification
            .service(
                web::scope("")
                    .wrap(middleware::AuthMiddleware)
                    .service(profiles::me)
                    .service(profiles::update_me)
                    .service(vehicles::create)
                    .service(vehicles::update)
                    .service(vehicles::delete)
                    .service(vehicles::my_vehicles)
                    .service(reservations::create)
                    .service(reservations::my_rentals)
                    .service(reservations::my_bookings)
                    .service(reservations::detail)
                    .service(reservations::confirm)
                    .service(reservations::start)
                    .service(reservations::finish)
                    .service(reservations::cancel)
                    .service(reservations::open_dispute)
                    .service(wallet::balance)
                    .service(wallet::history)
                    .service(wallet::top_up)
                    .service(wallet::withdraw)
                    .service(reviews::create)
                    .service(kyc::submit)
                    .service(kyc::my_status)
                    // Routes admin (protégées par rôle)
                    .service(
                        web::scope("/admin")
                            .wrap(middleware::AdminGuard)
                            .service(profiles::list_all)
                            .service(profiles::set_password)
                            .service(profiles::deactivate)
                            .service(reservations::list_all)
                            .service(reservations::resolve_dispute)
                            .service(kyc::list_pending)
                            .service(kyc::review),
                    ),
            ),
    );

    // Endpoint de santé
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
}

/// Endpoint de santé pour monitoring
async fn health_check() -> impl actix_web::Responder {
    actix_web::HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

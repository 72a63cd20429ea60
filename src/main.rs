use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use carloc::api;
use carloc::core::auth::{AuthService, HttpIdentityProvider, IdentityProvider};
use carloc::infrastructure::{config::ApiConfig, database::Database, telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialisation du logging
    telemetry::setup_tracing();
    info!("🚀 Démarrage du backend CarLoc");

    // Chargement de la configuration
    let config = ApiConfig::from_env().expect("❌ Impossible de charger la configuration");
    info!("✅ Configuration chargée avec succès");
    info!("🔧 Mode: {}", config.run_mode);

    // Initialisation des services
    let db = Database::new(&config.database_url, config.database_max_connections)
        .await
        .expect("❌ Impossible de se connecter à la base de données");

    db.migrate()
        .await
        .expect("❌ Impossible d'appliquer les migrations");

    let auth = AuthService::new(&config);
    let idp: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(&config.idp_userinfo_url));

    let bind_addr = (config.server_host.clone(), config.server_port);
    let workers = config.workers;
    let frontend_url = config.frontend_url.clone();

    // Configuration du serveur Actix-Web
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(auth.clone()))
            .app_data(web::Data::from(idp.clone()))
            .configure(api::config)
    })
    .bind(bind_addr)?
    .workers(workers)
    .shutdown_timeout(10);

    info!("✅ Backend démarré avec succès!");

    server.run().await
}

use actix_files::{Files, NamedFile};
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::{middleware, web, App, HttpServer};
use tracing::{info, warn};

use carloc::gateway::{self, guard::RouteGuard, GatewayState};
use carloc::infrastructure::{config::GatewayConfig, telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialisation du logging
    telemetry::setup_tracing();
    info!("🚀 Démarrage de la passerelle CarLoc");

    // Chargement de la configuration
    let config = GatewayConfig::from_env().expect("❌ Impossible de charger la configuration");

    if config.backend_api_url.is_none() {
        // la passerelle démarre quand même : le proxy répondra 500
        warn!("⚠️  BACKEND_API_URL absente: les appels relayés répondront 500");
    }

    let state = web::Data::new(
        GatewayState::new(&config).expect("❌ Impossible d'initialiser le client HTTP"),
    );

    let bind_addr = (config.server_host.clone(), config.server_port);
    let static_dir = config.static_dir.clone();

    let server = HttpServer::new(move || {
        let static_dir = static_dir.clone();
        let index_path = format!("{}/index.html", static_dir);

        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(gateway::config)
            // Pages et assets du bundle frontend, derrière la garde.
            // Les routes applicatives inconnues retombent sur index.html.
            .service(
                web::scope("")
                    .wrap(RouteGuard)
                    .service(
                        Files::new("/", &static_dir)
                            .index_file("index.html")
                            .default_handler(fn_service(move |req: ServiceRequest| {
                                let index_path = index_path.clone();
                                async move {
                                    let (req, _) = req.into_parts();
                                    let file = NamedFile::open_async(&index_path).await?;
                                    let res = file.into_response(&req);
                                    Ok(ServiceResponse::new(req, res))
                                }
                            })),
                    ),
            )
    })
    .bind(bind_addr)?
    .shutdown_timeout(10);

    info!("✅ Passerelle démarrée avec succès!");

    server.run().await
}

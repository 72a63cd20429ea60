//! Passerelle BFF : pont d'identité, proxy vers l'API et garde de routes.
//!
//! La passerelle est le seul composant que voit le navigateur : elle
//! échange le token de session du fournisseur d'identité contre la paire
//! access/refresh de l'API, conserve les deux en cookies httpOnly, et
//! relaie les appels `/nest/*` vers l'API en y injectant le bearer.

pub mod cookies;
pub mod guard;
pub mod identity;
pub mod proxy;

pub use proxy::GatewayState;

use actix_web::web;

/// Configure les routes de la passerelle (hors fichiers statiques)
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(identity::create_session)
        .service(identity::delete_session)
        .service(web::resource("/nest{tail:.*}").route(web::route().to(proxy::forward)));
}

mod chain;
mod health;
pub mod models;
mod peer;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blocks)
            .service(chain::validate_chain)
            .service(chain::mine_transactions)
            .service(chain::known_addresses)
            .service(tx::post_transact)
            .service(tx::get_pool_map)
            .service(wallet::create_wallet)
            .service(wallet::wallet_info)
            .service(stats::get_stats)
            .service(peer::replace_chain)
            .service(peer::admit_transaction)
            .service(peer::replace_pool),
    );
}

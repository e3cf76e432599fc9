use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

use cryptochain::api::{self, AppState};
use cryptochain::config::NodeConfig;
use cryptochain::node::{LogBroadcaster, Node};
use cryptochain::wallet::Wallet;
use cryptochain::LedgerError;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env();
    let node = Node::new(Wallet::new(), Arc::new(LogBroadcaster));

    if config.seed_demo_data {
        if let Err(e) = seed_demo_data(&node) {
            warn!("demo seeding stopped early: {}", e);
        }
    }

    info!(
        "⛓️ Starting ledger node {} at http://{}:{}",
        node.wallet_info().address,
        config.host,
        config.port
    );

    let state: web::Data<AppState> = web::Data::new(node);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

/// Ten rounds of payments between the node wallet and two demo wallets,
/// mining after every round.
fn seed_demo_data(node: &Node) -> Result<(), LedgerError> {
    let mut foo = Wallet::new();
    let mut bar = Wallet::new();
    let node_address = node.wallet_info().address;

    for round in 0..10 {
        match round % 3 {
            0 => {
                node.submit_transaction(&foo.address(), 5)?;
                node.submit_transaction_with(&mut foo, &bar.address(), 10)?;
            }
            1 => {
                node.submit_transaction_with(&mut foo, &bar.address(), 10)?;
                node.submit_transaction_with(&mut bar, &node_address, 15)?;
            }
            _ => {
                node.submit_transaction_with(&mut bar, &node_address, 15)?;
                node.submit_transaction(&foo.address(), 5)?;
            }
        }
        node.mine_transactions()?;
    }

    info!("seeded {} demo blocks", node.chain().len() - 1);
    Ok(())
}

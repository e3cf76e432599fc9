use actix_web::{HttpResponse, Responder, get, post, web};
use serde::Serialize;

use super::models::AppState;
use crate::crypto::generate_keypair_hex;

#[derive(Serialize)]
struct NewWalletResponse {
    private_key: String,
    public_key: String,
    address: String,
}

#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let (sk, pk, addr) = generate_keypair_hex();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: sk,
        public_key: pk,
        address: addr,
    })
}

/// Address and chain-derived balance of this node's wallet.
#[get("/wallet-info/")]
pub async fn wallet_info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.wallet_info())
}

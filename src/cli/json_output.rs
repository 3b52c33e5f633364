use serde::Serialize;

use timevault::vault::{VaultId, VaultView};

/// JSON response for `timevault list --json`.
#[derive(Serialize)]
pub struct ListResponse {
    pub vaults: Vec<VaultView>,
}

/// JSON response for `timevault get --json`.
#[derive(Serialize)]
pub struct SecretResponse {
    pub id: VaultId,
    pub title: String,
    pub secret: String,
}

/// JSON response for `timevault delete --json`.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub id: VaultId,
    pub deleted: bool,
}

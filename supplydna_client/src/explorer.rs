/// Block explorer base URL for a network name. Unknown networks fall back to
/// Polygon mainnet.
pub fn explorer_base(network: &str) -> &'static str {
    match network {
        "ethereum" => "https://etherscan.io",
        "polygon_mumbai" => "https://mumbai.polygonscan.com",
        "polygon_amoy" => "https://amoy.polygonscan.com",
        "bsc" => "https://bscscan.com",
        "sepolia" => "https://sepolia.etherscan.io",
        _ => "https://polygonscan.com",
    }
}

/// Explorer page for `token_id` minted by `contract_address`
pub fn token_url(network: &str, contract_address: &str, token_id: &str) -> String {
    format!(
        "{}/token/{}?a={}",
        explorer_base(network),
        contract_address,
        token_id
    )
}

/// Explorer page for a transaction
pub fn transaction_url(network: &str, transaction_hash: &str) -> String {
    format!("{}/tx/{}", explorer_base(network), transaction_hash)
}

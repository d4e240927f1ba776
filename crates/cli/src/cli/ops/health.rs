use clap::Args;

use common::signer::WalletSigner;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match ctx.state() {
            Ok(state) => {
                lines.push(format!("  directory:   {}", state.payunlock_dir.display()));
                lines.push("  config.toml: OK".to_string());
                match state.load_wallet() {
                    Ok(wallet) => lines.push(format!(
                        "  wallet.pem:  OK ({}, {})",
                        wallet.scheme(),
                        wallet.address()
                    )),
                    Err(e) => lines.push(format!("  wallet.pem:  {}", e)),
                }
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        let network = ctx.config.network.config();
        lines.push(format!("  network:     {}", network.network));
        lines.push(format!("  contract:    {}", network.contract_address));

        // 2. Check the upload service
        lines.push(String::new());
        lines.push(format!("Upload service ({}):", ctx.store.upload_url));
        match ctx.store.ping().await {
            Ok(body) if body.trim() == "OK" => lines.push("  status: OK".to_string()),
            Ok(body) => lines.push(format!("  status: UNEXPECTED ({})", body.trim())),
            Err(e) => {
                tracing::debug!("upload service check failed: {}", e);
                lines.push("  status: NOT REACHABLE".to_string());
            }
        }

        // 3. Check the CDN answers at all; a 404 on the bare prefix is fine
        lines.push(String::new());
        lines.push(format!("CDN ({}):", ctx.store.cdn_base_url));
        match reqwest::Client::new()
            .head(ctx.store.cdn_base_url.clone())
            .send()
            .await
        {
            Ok(resp) if resp.status().is_server_error() => {
                lines.push(format!("  status: UNHEALTHY ({})", resp.status()));
            }
            Ok(_) => lines.push("  status: OK".to_string()),
            Err(_) => lines.push("  status: NOT REACHABLE".to_string()),
        }

        Ok(lines.join("\n"))
    }
}

use clap::Args;

use common::blob_store::BlobStore;
use common::escrow::EscrowContract;
use common::listing::ZERO_ADDRESS;

use crate::cli::ops::ChainError;

/// One product's on-chain record and listing document
#[derive(Args, Debug, Clone)]
pub struct Show {
    #[arg(long)]
    pub id: u64,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Show {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let record = ctx.escrow()?.product(self.id).await?;
        let currency = if record.is_hbar() {
            "HBAR".to_string()
        } else {
            record.currency.clone()
        };

        let mut lines = vec![
            format!("id:         {}", self.id),
            format!("status:     {}", record.status),
            format!("price:      {} {}", record.formatted_price(), currency),
            format!("seller:     {}", record.seller),
            format!("file_id:    {}", record.file_id),
        ];
        if record.buyer != ZERO_ADDRESS {
            lines.push(format!("buyer:      {}", record.buyer));
        }
        if record.paid_at > 0 {
            lines.push(format!("paid_at:    {}", record.paid_at));
        }
        if record.code_sent_at > 0 {
            lines.push(format!("code_sent:  {}", record.code_sent_at));
        }

        match ctx.store.fetch(&record.file_id).await {
            Ok(document) => {
                lines.push(format!("name:       {}", document.name));
                lines.push(format!("about:      {}", document.description));
            }
            Err(e) => {
                tracing::warn!("no listing document for product {}: {}", self.id, e);
                lines.push("document:   unavailable".to_string());
            }
        }
        Ok(lines.join("\n"))
    }
}

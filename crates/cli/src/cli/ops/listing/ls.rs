use clap::Args;

use common::lifecycle::load_products;

use crate::cli::ops::ChainError;

/// Every product on the escrow contract with its listing document
#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Hide products that are refunded or paid out
    #[arg(long)]
    pub open_only: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = ChainError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let products = load_products(&ctx.escrow()?, &ctx.store).await?;
        let lines = products
            .iter()
            .filter(|product| !(self.open_only && product.status.is_final()))
            .map(|product| {
                format!(
                    "{:>4}  {:<18} {:>12}  {}  [{}]",
                    product.id, product.status, product.price, product.name, product.file_id
                )
            })
            .collect::<Vec<_>>();

        if lines.is_empty() {
            Ok("No products found".to_string())
        } else {
            Ok(lines.join("\n"))
        }
    }
}

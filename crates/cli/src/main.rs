// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{
    args::Args, op::Op, Health, Init, Keygen, Listing, Mint, Open, Order, Rewrap, Seal, Sign,
    Version,
};

command_enum! {
    (Init, Init),
    (Seed, Mint),
    (Sign, Sign),
    (Keygen, Keygen),
    (Seal, Seal),
    (Rewrap, Rewrap),
    (Open, Open),
    (Listing, Listing),
    (Order, Order),
    (Health, Health),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _guards = payunlock_cli::logging::init_logging(args.log_level, args.log_dir.as_deref());

    // Resolve config: explicit flags > config file > defaults
    let config = cli::op::resolve_config(
        args.config_path.clone(),
        args.cdn_url,
        args.upload_url,
        args.rpc_url,
    );

    let ctx = match cli::op::OpContext::new(config, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create network clients: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

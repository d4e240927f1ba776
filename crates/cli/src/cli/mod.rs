pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Health, Init, Keygen, Listing, Mint, Open, Order, Rewrap, Seal, Sign, Version};

pub mod bithumb_client;
pub mod dto;

pub use bithumb_client::BithumbClient;

pub mod contracts;
pub mod ethereum_client;
pub mod traits;

pub use ethereum_client::EthereumClient;
pub use traits::{ChainReader, RawAccountData, RawReserveRates, ReceiptStatus};

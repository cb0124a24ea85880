pub mod registry;
pub mod settings;

pub use registry::{ContractAddresses, NATIVE_DECIMALS, USDC_DECIMALS};
pub use settings::Settings;

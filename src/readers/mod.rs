pub mod balance;
pub mod position;

pub use balance::BalanceReader;
pub use position::PositionReader;

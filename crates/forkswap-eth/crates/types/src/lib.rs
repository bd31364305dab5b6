pub mod chain;

pub use chain::Network;

pub const GOERLI: u64 = 5;
pub const ETH: u64 = 1;
pub const POLYGON: u64 = 137;

pub const SUPPORTED_CHAINS: [u64; 3] = [GOERLI, ETH, POLYGON];

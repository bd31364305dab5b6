pub mod erc20;
pub mod swapper;

// Re-Exports
pub use alloy_dyn_abi;
pub use alloy_json_abi;
pub use alloy_primitives;
pub use alloy_sol_types;

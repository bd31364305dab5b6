pub use abi;
pub use revm_utils;
pub use types;

pub use abi::{alloy_dyn_abi, alloy_json_abi, alloy_primitives, alloy_sol_types};
pub use revm_utils::revm;

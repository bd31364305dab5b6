use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue, sol};

sol! {
    contract IERC20 {
        event Approval(address indexed owner, address indexed spender, uint value);
        event Transfer(address indexed from, address indexed to, uint value);

        function balanceOf(address owner) external view returns (uint256 balance);
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function transfer(address recipient, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
}
}

// ** ABI Encode Functions

pub fn encode_balance_of(owner: Address) -> Bytes {
    let c = IERC20::balanceOfCall { owner };
    Bytes::from(c.abi_encode())
}

pub fn encode_allowance(owner: Address, spender: Address) -> Bytes {
    let c = IERC20::allowanceCall { owner, spender };
    Bytes::from(c.abi_encode())
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    let c = IERC20::approveCall { spender, amount };
    Bytes::from(c.abi_encode())
}

// ** ABI Decode Functions

pub fn decode_balance_of(bytes: &Bytes) -> Result<U256, anyhow::Error> {
    let b = U256::abi_decode(bytes)?;
    Ok(b)
}

pub fn decode_allowance(bytes: &Bytes) -> Result<U256, anyhow::Error> {
    let a = U256::abi_decode(bytes)?;
    Ok(a)
}

/// Decode the return value of `approve`
///
/// Some tokens (eg. USDT) return nothing from `approve`, empty return data counts as success.
/// Any non-zero word counts as `true`.
pub fn decode_approve(bytes: &Bytes) -> Result<bool, anyhow::Error> {
    if bytes.is_empty() {
        return Ok(true);
    }
    let word = U256::abi_decode(bytes)?;
    Ok(!word.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex};

    #[test]
    fn encodes_balance_of_with_selector() {
        let owner = address!("41653c7d61609D856f29355E404F310Ec4142Cfb");
        let data = encode_balance_of(owner);
        assert_eq!(&data[..4], &hex!("70a08231"));
        assert_eq!(data.len(), 36);
        assert_eq!(&data[16..], owner.as_slice());
    }

    #[test]
    fn encodes_approve_with_selector() {
        let spender = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
        let data = encode_approve(spender, U256::from(1000));
        assert_eq!(&data[..4], &hex!("095ea7b3"));
        assert_eq!(data.len(), 68);
    }

    #[test]
    fn approve_return_values() {
        assert!(decode_approve(&Bytes::new()).unwrap());
        assert!(decode_approve(&Bytes::from(U256::from(1).abi_encode())).unwrap());
        assert!(!decode_approve(&Bytes::from(U256::ZERO.abi_encode())).unwrap());
        assert!(decode_approve(&Bytes::from(vec![1u8; 3])).is_err());
    }
}

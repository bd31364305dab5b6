use forkswap_eth::alloy_primitives::{
   U256,
   utils::{format_units, parse_units},
};

use crate::HarnessError;

/// Decimals of every token the fixtures use
pub const TOKEN_DECIMALS: u8 = 18;

/// `amount` whole tokens in wei
pub fn parse_tokens(amount: &str) -> Result<U256, HarnessError> {
   let parsed = parse_units(amount, TOKEN_DECIMALS)
      .map_err(|e| HarnessError::InvalidSwapParameters(format!("{}: {}", amount, e)))?;
   Ok(parsed.get_absolute())
}

/// Format a wei amount in token units with two decimals
pub fn format_tokens(amount: U256) -> String {
   match format_units(amount, TOKEN_DECIMALS) {
      Ok(formatted) => match formatted.parse::<f64>() {
         Ok(value) => format!("{:.2}", value),
         Err(_) => formatted,
      },
      Err(_) => amount.to_string(),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn formats_with_two_decimals() {
      let one_and_a_bit = U256::from(1_234_567_000_000_000_000u64);
      assert_eq!(format_tokens(one_and_a_bit), "1.23");
      assert_eq!(format_tokens(U256::ZERO), "0.00");
   }

   #[test]
   fn parses_whole_tokens() {
      let million = parse_tokens("1000000").unwrap();
      assert_eq!(million, U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(18)));
      assert!(parse_tokens("lots").is_err());
   }
}

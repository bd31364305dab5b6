use super::{ETH, GOERLI, POLYGON, SUPPORTED_CHAINS};
use anyhow::bail;
use url::Url;

const ERR_MSG: &str = "Supported chains are: Goerli(5), Ethereum(1), Polygon(137)";

/// A network we know how to fork from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
   Goerli(u64),
   Ethereum(u64),
   Polygon(u64),
}

impl Default for Network {
   fn default() -> Self {
      Network::Ethereum(ETH)
   }
}

impl TryFrom<u64> for Network {
   type Error = anyhow::Error;

   fn try_from(id: u64) -> Result<Self, Self::Error> {
      Network::new(id)
   }
}

impl Network {
   pub fn new(id: u64) -> Result<Self, anyhow::Error> {
      let network = match id {
         GOERLI => Network::Goerli(id),
         ETH => Network::Ethereum(id),
         POLYGON => Network::Polygon(id),
         _ => bail!("Unsupported chain id: {}\n{}", id, ERR_MSG),
      };
      Ok(network)
   }

   pub fn goerli() -> Self {
      Network::Goerli(GOERLI)
   }

   pub fn eth() -> Self {
      Network::Ethereum(ETH)
   }

   pub fn polygon() -> Self {
      Network::Polygon(POLYGON)
   }

   pub fn is_goerli(&self) -> bool {
      matches!(self, Network::Goerli(_))
   }

   pub fn is_ethereum(&self) -> bool {
      matches!(self, Network::Ethereum(_))
   }

   pub fn is_polygon(&self) -> bool {
      matches!(self, Network::Polygon(_))
   }

   pub fn is_supported(chain_id: u64) -> bool {
      SUPPORTED_CHAINS.contains(&chain_id)
   }

   pub fn id(&self) -> u64 {
      match self {
         Network::Goerli(id) => *id,
         Network::Ethereum(id) => *id,
         Network::Polygon(id) => *id,
      }
   }

   pub fn name(&self) -> &str {
      match self {
         Network::Goerli(_) => "Goerli",
         Network::Ethereum(_) => "Ethereum",
         Network::Polygon(_) => "Polygon",
      }
   }

   pub fn coin_symbol(&self) -> &str {
      match self {
         Network::Polygon(_) => "MATIC",
         _ => "ETH",
      }
   }

   /// Subdomain Infura serves this network under
   fn infura_subdomain(&self) -> &str {
      match self {
         Network::Goerli(_) => "goerli",
         Network::Ethereum(_) => "mainnet",
         Network::Polygon(_) => "polygon-mainnet",
      }
   }

   /// Infura JSON-RPC endpoint for this network
   pub fn infura_url(&self, api_key: &str) -> Result<Url, anyhow::Error> {
      if api_key.trim().is_empty() {
         bail!("Infura API key is empty");
      }
      let url = format!(
         "https://{}.infura.io/v3/{}",
         self.infura_subdomain(),
         api_key.trim()
      );
      Ok(Url::parse(&url)?)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn resolves_supported_chains() {
      assert_eq!(Network::new(5).unwrap(), Network::goerli());
      assert_eq!(Network::new(1).unwrap(), Network::eth());
      assert_eq!(Network::new(137).unwrap(), Network::polygon());
      assert!(Network::new(56).is_err());
   }

   #[test]
   fn builds_infura_endpoints() {
      let url = Network::polygon().infura_url("abc").unwrap();
      assert_eq!(url.as_str(), "https://polygon-mainnet.infura.io/v3/abc");
      assert_eq!(url.host_str(), Some("polygon-mainnet.infura.io"));

      let url = Network::goerli().infura_url("abc").unwrap();
      assert_eq!(url.host_str(), Some("goerli.infura.io"));

      assert!(Network::eth().infura_url("  ").is_err());
   }
}

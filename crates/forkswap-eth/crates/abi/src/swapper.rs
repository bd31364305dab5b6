use alloy_dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy_json_abi::{JsonAbi, Param};
use alloy_primitives::{Address, Bytes, U256};
use anyhow::{anyhow, bail};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Name of the swap entry point on the Swapper contract
pub const SWAP_FUNCTION: &str = "swap";

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    /// Hardhat layout: `"bytecode": "0x.."`
    Hex(String),
    /// Foundry layout: `"bytecode": { "object": "0x.." }`
    Object { object: String },
}

impl ArtifactBytecode {
    fn hex(&self) -> &str {
        match self {
            ArtifactBytecode::Hex(s) => s,
            ArtifactBytecode::Object { object } => object,
        }
    }
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(rename = "contractName", default)]
    contract_name: Option<String>,
    #[serde(default)]
    abi: Option<JsonAbi>,
    #[serde(default)]
    bytecode: Option<ArtifactBytecode>,
}

/// A compiled Swapper contract, ready to be deployed
#[derive(Clone, Debug)]
pub struct SwapperArtifact {
    pub name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl SwapperArtifact {
    pub fn new(name: impl Into<String>, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            abi,
            bytecode,
        }
    }

    /// Load a Hardhat or Foundry artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read artifact {}: {}", path.display(), e))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, anyhow::Error> {
        let raw: RawArtifact = serde_json::from_str(json)?;

        let abi = raw.abi.ok_or(anyhow!("Artifact has no ABI"))?;
        let code = raw.bytecode.ok_or(anyhow!("Artifact has no bytecode"))?;
        let bytecode = Bytes::from_str(code.hex().trim())
            .map_err(|e| anyhow!("Artifact bytecode is not valid hex: {}", e))?;

        if bytecode.is_empty() {
            bail!("Artifact bytecode is empty (abstract contract or interface?)");
        }

        Ok(Self {
            name: raw.contract_name.unwrap_or_else(|| "Swapper".to_string()),
            abi,
            bytecode,
        })
    }

    /// Creation code with the ABI-encoded constructor arguments appended
    pub fn deploy_code(&self, args: &[DynSolValue]) -> Result<Bytes, anyhow::Error> {
        encode_deploy(&self.abi, &self.bytecode, args)
    }
}

/// Append the constructor arguments to `bytecode`, checked against the constructor in `abi`
pub fn encode_deploy(abi: &JsonAbi, bytecode: &Bytes, args: &[DynSolValue]) -> Result<Bytes, anyhow::Error> {
    if bytecode.is_empty() {
        bail!("Missing creation bytecode");
    }

    let encoded_args = match &abi.constructor {
        Some(constructor) => constructor
            .abi_encode_input(args)
            .map_err(|e| anyhow!("Constructor arguments do not match the ABI: {}", e))?,
        None if args.is_empty() => Vec::new(),
        None => bail!(
            "Contract has no constructor but {} argument(s) were given",
            args.len()
        ),
    };

    let mut code = bytecode.to_vec();
    code.extend_from_slice(&encoded_args);
    Ok(code.into())
}

/// Encode `swap(path, fee, amountIn)` against the `swap` function declared in `abi`
///
/// The integer widths are taken from the ABI so `uint24` and `uint256` fee tiers both work.
pub fn encode_swap(abi: &JsonAbi, path: &[Address], fee: u32, amount_in: U256) -> Result<Bytes, anyhow::Error> {
    let function = abi
        .function(SWAP_FUNCTION)
        .and_then(|overloads| overloads.first())
        .ok_or(anyhow!("ABI has no `{}` function", SWAP_FUNCTION))?;

    if function.inputs.len() != 3 {
        bail!(
            "Expected `{}` to take (path, fee, amountIn) but it takes {} argument(s)",
            SWAP_FUNCTION,
            function.inputs.len()
        );
    }

    let path = DynSolValue::Array(path.iter().map(|a| DynSolValue::Address(*a)).collect());
    let fee = uint_value(&function.inputs[1], U256::from(fee))?;
    let amount = uint_value(&function.inputs[2], amount_in)?;

    let data = function
        .abi_encode_input(&[path, fee, amount])
        .map_err(|e| anyhow!("Failed to encode `{}` call: {}", SWAP_FUNCTION, e))?;
    Ok(data.into())
}

fn uint_value(param: &Param, value: U256) -> Result<DynSolValue, anyhow::Error> {
    match param.resolve()? {
        DynSolType::Uint(bits) => {
            if bits < 256 && value >= (U256::from(1) << bits) {
                bail!("{} does not fit in uint{} ({})", value, bits, param.name);
            }
            Ok(DynSolValue::Uint(value, bits))
        }
        other => bail!("Expected an unsigned integer for `{}`, found {:?}", param.name, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, hex, keccak256};

    const ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"_swapRouter","type":"address","internalType":"address"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"swap","inputs":[
            {"name":"_path","type":"address[]","internalType":"address[]"},
            {"name":"_fee","type":"uint24","internalType":"uint24"},
            {"name":"_amountIn","type":"uint256","internalType":"uint256"}
        ],"outputs":[{"name":"amountOut","type":"uint256","internalType":"uint256"}],"stateMutability":"nonpayable"}
    ]"#;

    fn abi() -> JsonAbi {
        serde_json::from_str(ABI).unwrap()
    }

    #[test]
    fn loads_hardhat_and_foundry_artifacts() {
        let hardhat = format!(r#"{{"contractName":"Swapper","abi":{},"bytecode":"0x6080"}}"#, ABI);
        let artifact = SwapperArtifact::from_json(&hardhat).unwrap();
        assert_eq!(artifact.name, "Swapper");
        assert_eq!(artifact.bytecode, Bytes::from(hex!("6080")));

        let foundry = format!(r#"{{"abi":{},"bytecode":{{"object":"0x6080"}}}}"#, ABI);
        let artifact = SwapperArtifact::from_json(&foundry).unwrap();
        assert_eq!(artifact.bytecode.len(), 2);
    }

    #[test]
    fn rejects_artifacts_without_code() {
        let empty = format!(r#"{{"abi":{},"bytecode":"0x"}}"#, ABI);
        assert!(SwapperArtifact::from_json(&empty).is_err());

        let missing = format!(r#"{{"abi":{}}}"#, ABI);
        assert!(SwapperArtifact::from_json(&missing).is_err());

        assert!(SwapperArtifact::from_json(r#"{"bytecode":"0x6080"}"#).is_err());
    }

    #[test]
    fn appends_constructor_args() {
        let router = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
        let code = encode_deploy(&abi(), &Bytes::from(hex!("6080")), &[DynSolValue::Address(router)]).unwrap();
        assert_eq!(code.len(), 2 + 32);
        assert_eq!(&code[14..], router.as_slice());
    }

    #[test]
    fn rejects_malformed_constructor_args() {
        let code = Bytes::from(hex!("6080"));
        assert!(encode_deploy(&abi(), &code, &[]).is_err());
        assert!(encode_deploy(&abi(), &code, &[DynSolValue::Bool(true)]).is_err());
        assert!(encode_deploy(&JsonAbi::default(), &code, &[DynSolValue::Bool(true)]).is_err());
        assert!(encode_deploy(&abi(), &Bytes::new(), &[]).is_err());
    }

    #[test]
    fn encodes_swap_against_abi_widths() {
        let uni = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
        let weth = address!("B4FBF271143F4FBf7B91A5ded31805e42b2208d6");
        let data = encode_swap(&abi(), &[uni, weth], 3000, U256::from(10)).unwrap();

        let selector = keccak256("swap(address[],uint24,uint256)");
        assert_eq!(&data[..4], &selector[..4]);
        // head (3 words) + length + 2 addresses
        assert_eq!(data.len(), 4 + 32 * 6);
    }

    #[test]
    fn rejects_fee_overflowing_its_width() {
        let uni = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
        let weth = address!("B4FBF271143F4FBf7B91A5ded31805e42b2208d6");
        assert!(encode_swap(&abi(), &[uni, weth], 1 << 24, U256::from(1)).is_err());
        assert!(encode_swap(&JsonAbi::default(), &[uni, weth], 3000, U256::from(1)).is_err());
    }
}

use chia::protocol::Bytes32;
use serde::{Serialize, Serializer};

/// A server coin found on chain for a data layer store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerRecord {
    pub amount: u64,
    #[serde(serialize_with = "prefixed_hex")]
    pub coin_id: Bytes32,
    #[serde(serialize_with = "prefixed_hex")]
    pub launcher_id: Bytes32,
    pub ours: bool,
    pub urls: Vec<String>,
}

fn prefixed_hex<S>(value: &Bytes32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(value)))
}

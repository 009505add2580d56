use chia::protocol::{Bytes, Bytes32};
use clvm_traits::{apply_constants, FromClvm, ToClvm};
use clvmr::{Allocator, NodePtr};
use itertools::Itertools;

use crate::{Error, Result};

pub const CREATE_COIN: u32 = 51;

/// `(51 mirror_puzzle_hash amount (hint url ...))`
#[derive(ToClvm, FromClvm)]
#[apply_constants]
#[derive(Debug, Clone, PartialEq, Eq)]
#[clvm(list)]
pub struct CreateServerCoin {
    #[clvm(constant = 51)]
    pub opcode: u8,
    pub puzzle_hash: Bytes32,
    pub amount: u64,
    pub memos: ServerCoinMemos,
}

#[derive(Debug, Clone, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct ServerCoinMemos {
    pub hint: Bytes32,
    #[clvm(rest)]
    pub urls: Vec<Bytes>,
}

/// `(51 puzzle_hash amount)`, with no memos.
#[derive(ToClvm, FromClvm)]
#[apply_constants]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[clvm(list)]
pub struct CreateChange {
    #[clvm(constant = 51)]
    pub opcode: u8,
    pub puzzle_hash: Bytes32,
    pub amount: u64,
}

/// A server coin as recovered from its parent's conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCoin {
    pub amount: u64,
    pub urls: Vec<String>,
}

pub fn encode_create_server_coin(
    mirror_puzzle_hash: Bytes32,
    amount: u64,
    hint: Bytes32,
    urls: &[String],
) -> CreateServerCoin {
    CreateServerCoin {
        puzzle_hash: mirror_puzzle_hash,
        amount,
        memos: ServerCoinMemos {
            hint,
            urls: urls
                .iter()
                .map(|url| Bytes::new(url.as_bytes().to_vec()))
                .collect(),
        },
    }
}

pub fn encode_change(puzzle_hash: Bytes32, amount: u64) -> CreateChange {
    CreateChange {
        puzzle_hash,
        amount,
    }
}

/// Finds every `CREATE_COIN` in `conditions` that pays `expected_puzzle_hash`
/// and decodes its memos into URLs. No match is an empty list.
pub fn decode_server_coins(
    allocator: &Allocator,
    conditions: NodePtr,
    expected_puzzle_hash: Bytes32,
) -> Result<Vec<ServerCoin>> {
    let conditions = Vec::<NodePtr>::from_clvm(allocator, conditions)?;
    let mut server_coins = Vec::new();

    for condition in conditions {
        let Ok(fields) = Vec::<NodePtr>::from_clvm(allocator, condition) else {
            continue;
        };

        let Some((&opcode, rest)) = fields.split_first() else {
            continue;
        };

        if u32::from_clvm(allocator, opcode).ok() != Some(CREATE_COIN) {
            continue;
        }

        let Some(&puzzle_hash) = rest.first() else {
            continue;
        };

        if Bytes32::from_clvm(allocator, puzzle_hash).ok() != Some(expected_puzzle_hash) {
            continue;
        }

        let [_, _, amount, memos] = fields.as_slice() else {
            return Err(Error::MalformedCondition(format!(
                "expected 4 fields in CREATE_COIN to {expected_puzzle_hash}, found {}",
                fields.len()
            )));
        };

        server_coins.push(decode_server_coin(allocator, *amount, *memos)?);
    }

    Ok(server_coins)
}

fn decode_server_coin(allocator: &Allocator, amount: NodePtr, memos: NodePtr) -> Result<ServerCoin> {
    let amount = u64::from_clvm(allocator, amount)
        .map_err(|error| Error::MalformedCondition(format!("invalid amount: {error}")))?;

    let memos = Vec::<Bytes>::from_clvm(allocator, memos)
        .map_err(|error| Error::MalformedCondition(format!("invalid memo list: {error}")))?;

    let mut memos = memos.into_iter();

    if memos.next().is_none() {
        return Err(Error::MalformedCondition("missing hint memo".to_string()));
    }

    let urls: Vec<String> = memos
        .map(|url| {
            String::from_utf8(url.into())
                .map_err(|_| Error::MalformedCondition("url is not valid UTF-8".to_string()))
        })
        .try_collect()?;

    Ok(ServerCoin { amount, urls })
}

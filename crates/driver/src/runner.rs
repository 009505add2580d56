use chia::protocol::CoinSpend;
use chia_wallet_sdk::types::run_puzzle;
use clvm_traits::ToClvm;
use clvmr::{Allocator, NodePtr};

use crate::{decode_server_coins, mirror_puzzle_hash, Result, ServerCoin};

/// Evaluates a puzzle against a solution and returns its condition list.
pub trait PuzzleRunner {
    fn run(&self, allocator: &mut Allocator, puzzle: NodePtr, solution: NodePtr) -> Result<NodePtr>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClvmRunner;

impl PuzzleRunner for ClvmRunner {
    fn run(&self, allocator: &mut Allocator, puzzle: NodePtr, solution: NodePtr) -> Result<NodePtr> {
        Ok(run_puzzle(allocator, puzzle, solution)?)
    }
}

/// Reruns the spend that created a coin and decodes the server coins it
/// produced.
pub fn replay_server_coins(
    allocator: &mut Allocator,
    runner: &impl PuzzleRunner,
    parent: &CoinSpend,
) -> Result<Vec<ServerCoin>> {
    let puzzle = parent.puzzle_reveal.to_clvm(allocator)?;
    let solution = parent.solution.to_clvm(allocator)?;
    let output = runner.run(allocator, puzzle, solution)?;

    decode_server_coins(allocator, output, mirror_puzzle_hash())
}

#[cfg(test)]
mod tests {
    use chia::protocol::{Bytes32, Coin, Program};
    use clvm_traits::FromClvm;

    use crate::{encode_change, encode_create_server_coin};

    use super::*;

    /// Returns the quoted body of `(q . conditions)` without evaluation.
    struct QuoteRunner;

    impl PuzzleRunner for QuoteRunner {
        fn run(&self, allocator: &mut Allocator, puzzle: NodePtr, _solution: NodePtr) -> Result<NodePtr> {
            let (_, body) = <(u8, NodePtr)>::from_clvm(allocator, puzzle)?;
            Ok(body)
        }
    }

    fn quoted_spend(allocator: &mut Allocator, conditions: NodePtr) -> CoinSpend {
        let puzzle = (1_u8, conditions).to_clvm(allocator).unwrap();

        CoinSpend::new(
            Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 1_000),
            Program::from_clvm(allocator, puzzle).unwrap(),
            Program::from_clvm(allocator, NodePtr::NIL).unwrap(),
        )
    }

    #[test]
    fn replays_quoted_parent() {
        let mut allocator = Allocator::new();
        let urls = vec!["https://a.example.com".to_string()];

        let conditions = vec![
            encode_create_server_coin(mirror_puzzle_hash(), 250, Bytes32::new([9; 32]), &urls)
                .to_clvm(&mut allocator)
                .unwrap(),
            encode_change(Bytes32::new([3; 32]), 700)
                .to_clvm(&mut allocator)
                .unwrap(),
        ]
        .to_clvm(&mut allocator)
        .unwrap();

        let parent = quoted_spend(&mut allocator, conditions);

        let evaluated = replay_server_coins(&mut allocator, &ClvmRunner, &parent).unwrap();
        let quoted = replay_server_coins(&mut allocator, &QuoteRunner, &parent).unwrap();

        assert_eq!(evaluated, quoted);
        assert_eq!(evaluated.len(), 1);
        assert_eq!(evaluated[0].amount, 250);
        assert_eq!(evaluated[0].urls, urls);
    }

    #[test]
    fn failing_puzzle_is_an_eval_error() {
        let mut allocator = Allocator::new();

        // `(x)` raises unconditionally.
        let puzzle = vec![8_u8].to_clvm(&mut allocator).unwrap();
        let parent = CoinSpend::new(
            Coin::new(Bytes32::new([1; 32]), Bytes32::new([2; 32]), 1),
            Program::from_clvm(&allocator, puzzle).unwrap(),
            Program::from_clvm(&allocator, NodePtr::NIL).unwrap(),
        );

        assert!(matches!(
            replay_server_coins(&mut allocator, &ClvmRunner, &parent),
            Err(crate::Error::Eval(_))
        ));
    }
}

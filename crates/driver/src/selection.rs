use itertools::Itertools;
use server_coin_types::CoinRecord;

use crate::{Error, Result};

/// Picks coins smallest first until `target` is covered. Ties are broken by
/// coin id so the same wallet state always yields the same selection.
///
/// Returns an empty list when the available coins can't cover `target`.
pub fn select(available: &[CoinRecord], target: u64) -> Vec<CoinRecord> {
    let total: u128 = available.iter().map(|record| u128::from(record.amount())).sum();

    if total < u128::from(target) {
        return Vec::new();
    }

    let mut selected = Vec::new();
    let mut sum: u128 = 0;

    for record in available
        .iter()
        .sorted_by_key(|record| (record.amount(), record.coin_id()))
    {
        selected.push(*record);
        sum += u128::from(record.amount());

        if sum >= u128::from(target) {
            break;
        }
    }

    selected
}

pub fn select_coins(available: &[CoinRecord], target: u64) -> Result<Vec<CoinRecord>> {
    let selected = select(available, target);

    if selected.is_empty() {
        return Err(Error::InsufficientBalance {
            needed: target,
            available: available.iter().map(CoinRecord::amount).sum(),
        });
    }

    Ok(selected)
}

pub fn total_amount(coins: &[CoinRecord]) -> u64 {
    coins.iter().map(CoinRecord::amount).sum()
}

/// `sum(selected) - fee - spend_amount`. Underflow is an integrity fault, since
/// [`select`] only returns coins that cover the target.
pub fn compute_change(selected: &[CoinRecord], fee: u64, spend_amount: u64) -> Result<u64> {
    let total = total_amount(selected);
    let spent = fee
        .checked_add(spend_amount)
        .ok_or(Error::ChangeUnderflow { total, spent: u64::MAX })?;

    total
        .checked_sub(spent)
        .ok_or(Error::ChangeUnderflow { total, spent })
}

#[cfg(test)]
mod tests {
    use chia::protocol::{Bytes32, Coin};

    use super::*;

    fn record(seed: u8, amount: u64) -> CoinRecord {
        CoinRecord::new(
            Coin::new(Bytes32::new([seed; 32]), Bytes32::new([0xaa; 32]), amount),
            100,
        )
    }

    fn amounts(coins: &[CoinRecord]) -> Vec<u64> {
        coins.iter().map(CoinRecord::amount).collect()
    }

    #[test]
    fn selects_smallest_first() {
        let available = [record(3, 100), record(1, 10), record(2, 50)];

        let selected = select(&available, 60);
        assert_eq!(amounts(&selected), vec![10, 50]);

        let change = compute_change(&selected, 5, 50).unwrap();
        assert_eq!(change, 60 - 5 - 50);
    }

    #[test]
    fn covers_target_exactly_or_more() {
        let available = [record(1, 10), record(2, 50), record(3, 100)];

        for target in [1, 10, 11, 60, 61, 160] {
            let selected = select(&available, target);
            assert!(!selected.is_empty());
            assert!(total_amount(&selected) >= target);
            assert!(compute_change(&selected, 0, target).is_ok());
        }
    }

    #[test]
    fn empty_when_insufficient() {
        let available = [record(1, 10), record(2, 50), record(3, 100)];

        assert!(select(&available, 161).is_empty());
        assert!(select(&[], 1).is_empty());

        assert!(matches!(
            select_coins(&available, 161),
            Err(Error::InsufficientBalance {
                needed: 161,
                available: 160
            })
        ));
    }

    #[test]
    fn ties_break_by_coin_id() {
        let available = [record(9, 10), record(4, 10), record(7, 10)];

        let expected = *available
            .iter()
            .min_by_key(|record| record.coin_id())
            .unwrap();

        assert_eq!(select(&available, 10), vec![expected]);
        assert_eq!(select(&available, 10), select(&available, 10));
    }

    #[test]
    fn zero_target_still_spends_one_coin() {
        let available = [record(1, 10), record(2, 5)];
        assert_eq!(amounts(&select(&available, 0)), vec![5]);
    }

    #[test]
    fn change_underflow_is_reported() {
        let selected = [record(1, 10)];

        assert!(matches!(
            compute_change(&selected, 5, 6),
            Err(Error::ChangeUnderflow { total: 10, spent: 11 })
        ));
    }
}

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Bet, BetStatus};

/// Dashboard figures over a set of bets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BetStatistics {
    pub count: usize,
    pub settled: usize,
    pub wins: usize,
    pub total_staked: Decimal,
    pub total_profit: Decimal,
    /// Profit over stake, in percent.
    pub roi_pct: Decimal,
    /// Wins over settled (non-pending) bets, in percent.
    pub win_rate_pct: Decimal,
    pub avg_coef: Decimal,
}

pub fn summarize(bets: &[Bet]) -> BetStatistics {
    let count = bets.len();
    let settled = bets.iter().filter(|b| b.status.is_settled()).count();
    let wins = bets.iter().filter(|b| b.status == BetStatus::Win).count();

    let total_staked: Decimal = bets.iter().map(|b| b.amount).sum();
    let total_profit: Decimal = bets.iter().map(Bet::profit).sum();

    let roi_pct = if total_staked > Decimal::ZERO {
        total_profit / total_staked * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    let win_rate_pct = if settled > 0 {
        Decimal::from(wins) / Decimal::from(settled) * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };
    let avg_coef = if count > 0 {
        bets.iter().map(|b| b.total_coef).sum::<Decimal>() / Decimal::from(count)
    } else {
        Decimal::ZERO
    };

    BetStatistics {
        count,
        settled,
        wins,
        total_staked,
        total_profit,
        roi_pct,
        win_rate_pct,
        avg_coef,
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::services::attachment::Receipt;

// ---------------------------------------------------------------------------
// BetStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    #[default]
    Pending,
    Win,
    Lose,
    Return,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Win => "win",
            BetStatus::Lose => "lose",
            BetStatus::Return => "return",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(BetStatus::Pending),
            "win" => Some(BetStatus::Win),
            "lose" => Some(BetStatus::Lose),
            "return" => Some(BetStatus::Return),
            _ => None,
        }
    }

    /// Settled bets count toward the win rate.
    pub fn is_settled(&self) -> bool {
        !matches!(self, BetStatus::Pending)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BetKind: single vs express, derived from the number of events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetKind {
    #[default]
    Single,
    Express,
}

impl BetKind {
    pub fn for_event_count(count: usize) -> Self {
        if count > 1 {
            BetKind::Express
        } else {
            BetKind::Single
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetKind::Single => "single",
            BetKind::Express => "express",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" => Some(BetKind::Single),
            "express" => Some(BetKind::Express),
            _ => None,
        }
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

/// One leg of a bet.
#[derive(Debug, Clone, PartialEq)]
pub struct BetEvent {
    pub name: String,
    pub market: String,
    pub coef: Decimal,
}

impl BetEvent {
    pub fn new(name: impl Into<String>, market: impl Into<String>, coef: Decimal) -> Self {
        Self {
            name: name.into(),
            market: market.into(),
            coef,
        }
    }
}

/// A tracked bet in its domain shape. Stored and sent via its wire mapping,
/// see `services::record`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bet {
    pub id: i64,
    pub events: Vec<BetEvent>,
    pub total_coef: Decimal,
    pub amount: Decimal,
    pub status: BetStatus,
    /// Wire name `type`.
    pub kind: BetKind,
    pub profile_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
}

impl Bet {
    /// Net result of the bet given its current status.
    pub fn profit(&self) -> Decimal {
        match self.status {
            BetStatus::Win => self.amount * self.total_coef - self.amount,
            BetStatus::Lose => -self.amount,
            BetStatus::Return | BetStatus::Pending => Decimal::ZERO,
        }
    }

    pub fn is_express(&self) -> bool {
        self.kind == BetKind::Express
    }
}

/// Product of all event coefficients, `None` on overflow.
pub fn combined_coef(events: &[BetEvent]) -> Option<Decimal> {
    events
        .iter()
        .try_fold(Decimal::ONE, |acc, e| acc.checked_mul(e.coef))
}

// ---------------------------------------------------------------------------
// BetDraft: what the caller supplies on save
// ---------------------------------------------------------------------------

/// Complete caller-side description of a bet.
///
/// `id: None` creates a new bet, `Some(id)` replaces the existing one. There is
/// deliberately no date field: the creation timestamp is assigned once by the
/// tracker. Total coefficient and kind are always recomputed from `events`.
#[derive(Debug, Clone, Default)]
pub struct BetDraft {
    pub id: Option<i64>,
    pub events: Vec<BetEvent>,
    pub amount: Decimal,
    pub status: BetStatus,
    /// `None` on create tags the bet with the active profile filter;
    /// on update it keeps the stored assignment.
    pub profile_id: Option<i64>,
    /// New receipt photo; on update `None` keeps the stored image.
    pub receipt: Option<Receipt>,
}

impl BetDraft {
    pub fn new(events: Vec<BetEvent>, amount: Decimal) -> Self {
        Self {
            events,
            amount,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: BetStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_profile(mut self, profile_id: i64) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    /// Turn an existing bet back into a draft for editing.
    pub fn from_bet(bet: &Bet) -> Self {
        Self {
            id: Some(bet.id),
            events: bet.events.clone(),
            amount: bet.amount,
            status: bet.status,
            profile_id: bet.profile_id,
            receipt: None,
        }
    }

    /// Reject drafts that must never reach storage. Returns the normalized
    /// events and their combined coefficient.
    pub fn validate(&self) -> Result<(Vec<BetEvent>, Decimal), String> {
        if self.events.is_empty() {
            return Err("a bet needs at least one event".into());
        }
        if self.amount < Decimal::ZERO {
            return Err(format!("stake must not be negative (got {})", self.amount));
        }

        let mut events = Vec::with_capacity(self.events.len());
        for (i, event) in self.events.iter().enumerate() {
            let name = event.name.trim();
            let market = event.market.trim();
            if name.is_empty() {
                return Err(format!("event #{} is missing a name", i + 1));
            }
            if market.is_empty() {
                return Err(format!("event #{} is missing a market", i + 1));
            }
            if event.coef < Decimal::ONE {
                return Err(format!(
                    "event #{} coefficient must be at least 1 (got {})",
                    i + 1,
                    event.coef
                ));
            }
            events.push(BetEvent::new(name, market, event.coef));
        }

        let total = combined_coef(&events).ok_or("combined coefficient is too large")?;
        Ok((events, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bet(status: BetStatus, amount: i64, total_coef: Decimal) -> Bet {
        Bet {
            id: 1,
            events: vec![BetEvent::new("A vs B", "1X2", total_coef)],
            total_coef,
            amount: Decimal::from(amount),
            status,
            kind: BetKind::Single,
            profile_id: None,
            date: Utc::now(),
            image: None,
        }
    }

    #[test]
    fn test_profit_per_status() {
        let coef = Decimal::new(18, 1);
        assert_eq!(bet(BetStatus::Win, 100, coef).profit(), Decimal::from(80));
        assert_eq!(bet(BetStatus::Lose, 100, coef).profit(), Decimal::from(-100));
        assert_eq!(bet(BetStatus::Return, 100, coef).profit(), Decimal::ZERO);
        assert_eq!(bet(BetStatus::Pending, 100, coef).profit(), Decimal::ZERO);
    }

    #[test]
    fn test_kind_from_event_count() {
        assert_eq!(BetKind::for_event_count(0), BetKind::Single);
        assert_eq!(BetKind::for_event_count(1), BetKind::Single);
        assert_eq!(BetKind::for_event_count(2), BetKind::Express);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(BetStatus::from_str("WIN"), Some(BetStatus::Win));
        assert_eq!(BetStatus::from_str(" return "), Some(BetStatus::Return));
        assert_eq!(BetStatus::from_str("void"), None);
    }

    #[test]
    fn test_validate_computes_product() {
        let draft = BetDraft::new(
            vec![
                BetEvent::new("A vs B", "1", Decimal::new(15, 1)),
                BetEvent::new("C vs D", "2", Decimal::new(20, 1)),
            ],
            Decimal::from(50),
        );
        let (events, total) = draft.validate().expect("draft should be valid");
        assert_eq!(events.len(), 2);
        assert_eq!(total, Decimal::from(3));
    }

    #[test]
    fn test_validate_trims_names() {
        let draft = BetDraft::new(
            vec![BetEvent::new("  A vs B ", " TB 2.5", Decimal::new(19, 1))],
            Decimal::from(10),
        );
        let (events, _) = draft.validate().unwrap();
        assert_eq!(events[0].name, "A vs B");
        assert_eq!(events[0].market, "TB 2.5");
    }

    #[test]
    fn test_validate_rejects_bad_drafts() {
        assert!(BetDraft::new(vec![], Decimal::from(10)).validate().is_err());

        let low_coef = BetDraft::new(
            vec![BetEvent::new("A vs B", "1", Decimal::new(9, 1))],
            Decimal::from(10),
        );
        assert!(low_coef.validate().is_err());

        let no_market = BetDraft::new(
            vec![BetEvent::new("A vs B", "  ", Decimal::new(19, 1))],
            Decimal::from(10),
        );
        assert!(no_market.validate().is_err());

        let negative = BetDraft::new(
            vec![BetEvent::new("A vs B", "1", Decimal::new(19, 1))],
            Decimal::from(-1),
        );
        assert!(negative.validate().is_err());
    }
}

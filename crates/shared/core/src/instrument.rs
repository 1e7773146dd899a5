//! Instruments - equity and multi-leg options structures
//!
//! Positions share one shape (`Position`) with instrument-specific leg data
//! carried in a tagged variant rather than a type hierarchy. Options
//! structures precompute their payoff bounds (max loss / max profit per
//! contract) at construction so sizing and exit checks never re-derive them.

use crate::chain::ChainSnapshot;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Shares-per-contract multiplier for standard equity options
pub const CONTRACT_MULTIPLIER: Decimal = dec!(100);

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => -Decimal::ONE,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

/// Whether a leg is bought or sold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegSide {
    Buy,
    Sell,
}

impl LegSide {
    /// Sign of the leg's premium in the structure's entry cost:
    /// bought legs cost money (+), sold legs collect it (-)
    pub fn cost_sign(&self) -> Decimal {
        match self {
            LegSide::Buy => Decimal::ONE,
            LegSide::Sell => -Decimal::ONE,
        }
    }
}

/// One leg of a multi-leg options structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionLeg {
    pub option_type: OptionType,
    pub side: LegSide,
    pub strike: Decimal,
    /// Premium per share at entry
    pub premium: Decimal,
    /// Contracts per structure unit (2 for the butterfly body)
    pub contracts: u32,
}

/// What kind of trade a proposal or position represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    Equity,
    BullCallSpread,
    BearPutSpread,
    IronCondor,
    Butterfly,
}

impl StrategyKind {
    pub fn slot(&self) -> StrategySlot {
        match self {
            StrategyKind::Equity => StrategySlot::Equity,
            _ => StrategySlot::Options,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Equity => "equity",
            StrategyKind::BullCallSpread => "bull-call-spread",
            StrategyKind::BearPutSpread => "bear-put-spread",
            StrategyKind::IronCondor => "iron-condor",
            StrategyKind::Butterfly => "butterfly",
        }
    }
}

/// Logical bucket limiting one open position per symbol per slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategySlot {
    Equity,
    Options,
}

/// A multi-leg options structure with precomputed payoff bounds
///
/// Entry cost convention: `net_premium` is the per-share cost to enter the
/// structure now (sum of bought premiums minus sold premiums). Debit
/// structures have positive net premium, credit structures negative. The
/// structure is always held "long"; P&L per contract is
/// `(mark_value - net_premium) * CONTRACT_MULTIPLIER`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsStructure {
    pub kind: StrategyKind,
    pub legs: Vec<OptionLeg>,
    pub expiry: NaiveDate,
    /// Per-share cost to enter (negative = credit collected)
    pub net_premium: Decimal,
    /// Maximum loss per contract, in dollars (positive)
    pub max_loss: Decimal,
    /// Maximum profit per contract, in dollars (positive)
    pub max_profit: Decimal,
    pub break_even_lower: Decimal,
    pub break_even_upper: Decimal,
}

impl OptionsStructure {
    /// Per-share cost to enter the structure at current chain quotes.
    ///
    /// Returns `None` when any leg's quote is missing from the snapshot,
    /// which the caller treats as data-unavailable for the cycle.
    pub fn mark_value(&self, chain: &ChainSnapshot) -> Option<Decimal> {
        let mut value = Decimal::ZERO;
        for leg in &self.legs {
            let quote = chain.quote(leg.option_type, leg.strike, self.expiry)?;
            value += leg.side.cost_sign() * quote.last_price * Decimal::from(leg.contracts);
        }
        Some(value)
    }

    /// Risk/reward ratio used to rank candidate structures
    pub fn reward_ratio(&self) -> Decimal {
        if self.max_loss.is_zero() {
            Decimal::ZERO
        } else {
            (self.max_profit / self.max_loss).abs()
        }
    }
}

/// Tagged instrument variant shared by proposals, trades, and positions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Instrument {
    Equity,
    Options(OptionsStructure),
}

impl Instrument {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Instrument::Equity => StrategyKind::Equity,
            Instrument::Options(s) => s.kind,
        }
    }

    pub fn slot(&self) -> StrategySlot {
        self.kind().slot()
    }

    /// Dollars of P&L per one point of per-unit price move, per unit held
    pub fn unit_multiplier(&self) -> Decimal {
        match self {
            Instrument::Equity => Decimal::ONE,
            Instrument::Options(_) => CONTRACT_MULTIPLIER,
        }
    }
}

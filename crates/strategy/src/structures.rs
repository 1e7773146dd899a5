//! Multi-leg options structure construction
//!
//! Builds vertical spreads, iron condors, and butterflies from a chain
//! snapshot, with payoff bounds computed at construction. Builders return
//! `None` when the chain can't support the structure (too few strikes,
//! missing quotes, or degenerate pricing) - an ordinary outcome, not an
//! error.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sextant_core::{
    CONTRACT_MULTIPLIER, ChainSnapshot, LegSide, OptionLeg, OptionType, OptionsStructure,
    StrategyKind,
};

/// Build a debit vertical spread: bull call or bear put.
///
/// Bull call buys the lowest in-range strike and sells the highest; bear
/// put mirrors it on the put side.
pub fn build_vertical_spread(
    chain: &ChainSnapshot,
    expiry: NaiveDate,
    kind: StrategyKind,
    width_pct: Decimal,
) -> Option<OptionsStructure> {
    let strikes = chain.strikes_within(width_pct);
    if strikes.len() < 2 {
        return None;
    }
    let lower = strikes[0];
    let upper = *strikes.last()?;
    let width = upper - lower;

    let (option_type, long_strike, short_strike) = match kind {
        StrategyKind::BullCallSpread => (OptionType::Call, lower, upper),
        StrategyKind::BearPutSpread => (OptionType::Put, upper, lower),
        _ => return None,
    };

    let long_premium = chain.quote(option_type, long_strike, expiry)?.last_price;
    let short_premium = chain.quote(option_type, short_strike, expiry)?.last_price;

    // Per-share debit paid; a non-positive debit means the quotes are
    // crossed and the structure is untradeable
    let net_premium = long_premium - short_premium;
    if net_premium <= Decimal::ZERO || net_premium >= width {
        return None;
    }

    let max_loss = net_premium * CONTRACT_MULTIPLIER;
    let max_profit = (width - net_premium) * CONTRACT_MULTIPLIER;

    let (break_even_lower, break_even_upper) = match kind {
        StrategyKind::BullCallSpread => (long_strike + net_premium, long_strike + net_premium),
        _ => (long_strike - net_premium, long_strike - net_premium),
    };

    Some(OptionsStructure {
        kind,
        legs: vec![
            OptionLeg {
                option_type,
                side: LegSide::Buy,
                strike: long_strike,
                premium: long_premium,
                contracts: 1,
            },
            OptionLeg {
                option_type,
                side: LegSide::Sell,
                strike: short_strike,
                premium: short_premium,
                contracts: 1,
            },
        ],
        expiry,
        net_premium,
        max_loss,
        max_profit,
        break_even_lower,
        break_even_upper,
    })
}

/// Build an iron condor: put spread below spot, call spread above.
///
/// Requires at least four distinct strikes in range. The structure
/// collects a net credit, so its `net_premium` is negative.
pub fn build_iron_condor(
    chain: &ChainSnapshot,
    expiry: NaiveDate,
    width_pct: Decimal,
) -> Option<OptionsStructure> {
    let strikes = chain.strikes_within(width_pct);
    if strikes.len() < 4 {
        return None;
    }

    let put_long = strikes[0];
    let put_short = strikes[1];
    let call_short = strikes[strikes.len() - 2];
    let call_long = strikes[strikes.len() - 1];
    if put_short >= call_short {
        return None;
    }

    let long_put = chain.quote(OptionType::Put, put_long, expiry)?.last_price;
    let short_put = chain.quote(OptionType::Put, put_short, expiry)?.last_price;
    let short_call = chain.quote(OptionType::Call, call_short, expiry)?.last_price;
    let long_call = chain.quote(OptionType::Call, call_long, expiry)?.last_price;

    let net_credit = short_put + short_call - long_put - long_call;
    if net_credit <= Decimal::ZERO {
        return None;
    }

    let max_profit = net_credit * CONTRACT_MULTIPLIER;
    let narrow_width = (call_long - call_short).min(put_short - put_long);
    let max_loss = narrow_width * CONTRACT_MULTIPLIER - max_profit;
    if max_loss <= Decimal::ZERO {
        return None;
    }

    Some(OptionsStructure {
        kind: StrategyKind::IronCondor,
        legs: vec![
            OptionLeg {
                option_type: OptionType::Put,
                side: LegSide::Buy,
                strike: put_long,
                premium: long_put,
                contracts: 1,
            },
            OptionLeg {
                option_type: OptionType::Put,
                side: LegSide::Sell,
                strike: put_short,
                premium: short_put,
                contracts: 1,
            },
            OptionLeg {
                option_type: OptionType::Call,
                side: LegSide::Sell,
                strike: call_short,
                premium: short_call,
                contracts: 1,
            },
            OptionLeg {
                option_type: OptionType::Call,
                side: LegSide::Buy,
                strike: call_long,
                premium: long_call,
                contracts: 1,
            },
        ],
        expiry,
        net_premium: -net_credit,
        max_loss,
        max_profit,
        break_even_lower: put_short - net_credit,
        break_even_upper: call_short + net_credit,
    })
}

/// Build a long call butterfly: buy the wings, sell two at the body.
pub fn build_butterfly(
    chain: &ChainSnapshot,
    expiry: NaiveDate,
    width_pct: Decimal,
) -> Option<OptionsStructure> {
    let strikes = chain.strikes_within(width_pct);
    if strikes.len() < 3 {
        return None;
    }

    let lower = strikes[0];
    let middle = strikes[strikes.len() / 2];
    let upper = *strikes.last()?;
    if lower == middle || middle == upper {
        return None;
    }

    let lower_call = chain.quote(OptionType::Call, lower, expiry)?.last_price;
    let middle_call = chain.quote(OptionType::Call, middle, expiry)?.last_price;
    let upper_call = chain.quote(OptionType::Call, upper, expiry)?.last_price;

    let net_premium = lower_call - Decimal::TWO * middle_call + upper_call;
    if net_premium <= Decimal::ZERO {
        return None;
    }

    let max_loss = net_premium * CONTRACT_MULTIPLIER;
    let max_profit = (middle - lower) * CONTRACT_MULTIPLIER - max_loss;
    if max_profit <= Decimal::ZERO {
        return None;
    }

    Some(OptionsStructure {
        kind: StrategyKind::Butterfly,
        legs: vec![
            OptionLeg {
                option_type: OptionType::Call,
                side: LegSide::Buy,
                strike: lower,
                premium: lower_call,
                contracts: 1,
            },
            OptionLeg {
                option_type: OptionType::Call,
                side: LegSide::Sell,
                strike: middle,
                premium: middle_call,
                contracts: 2,
            },
            OptionLeg {
                option_type: OptionType::Call,
                side: LegSide::Buy,
                strike: upper,
                premium: upper_call,
                contracts: 1,
            },
        ],
        expiry,
        net_premium,
        max_loss,
        max_profit,
        break_even_lower: lower + net_premium,
        break_even_upper: upper - net_premium,
    })
}

//! Pricing engine.
//!
//! Pure functions over a shape's economic parameters. Every monetary result is
//! rounded up to the next integer unit. Inputs that would make a formula divide
//! by zero, or yield `NaN`/`Infinity`, are reported as errors and never clamped
//! to a default price.

mod gda;

pub use gda::{gda_buy_price, listing_gda_price, unit_price};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;


/// Default GDA reference period, in seconds
pub const DEFAULT_PERIOD: f64 = 3600.0;

/// Inputs of the GDA curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingParams {
    /// Target price of one unit at the start of the curve
    pub value: f64,
    /// Reference period length, seconds
    pub period: f64,
    /// Per-period decay factor
    pub decay: f64,
    /// Per-period sale-rate constant
    pub rate: f64,
    /// Cumulative units sold since start
    pub sold: f64,
    /// Curve start, seconds since the Unix epoch
    pub start_time: f64,
}

impl PricingParams {
    /// Reject configurations the formulas cannot evaluate
    pub fn validate(&self) -> Result<(), PricingError> {
        let fields = [
            self.value,
            self.period,
            self.decay,
            self.rate,
            self.sold,
            self.start_time,
        ];
        if !fields.iter().all(|v| v.is_finite()) {
            return Err(PricingError::DegenerateParameters("non-finite parameter"));
        }
        if self.value < 0.0 {
            return Err(PricingError::DegenerateParameters("negative value"));
        }
        if self.period <= 0.0 {
            return Err(PricingError::DegenerateParameters("period must be positive"));
        }
        if self.rate <= 0.0 {
            return Err(PricingError::DegenerateParameters("rate must be positive"));
        }
        if self.decay <= 0.0 {
            return Err(PricingError::DegenerateParameters("decay must be positive"));
        }
        if self.decay == 1.0 {
            return Err(PricingError::DegenerateParameters("decay of 1 has no curve"));
        }
        if self.sold < 0.0 {
            return Err(PricingError::DegenerateParameters("negative units sold"));
        }
        Ok(())
    }

    /// Number of reference periods between `start_time` and `now`
    pub fn periods_elapsed(&self, now: f64) -> f64 {
        (now - self.start_time) / self.period
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Recognized pricing tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingKind {
    /// Flat `value * amt`
    Fixed,
    /// Gradual Dutch Auction curve (buy side)
    Gda,
    /// Multiplier over the buy price (sell side)
    Scaled,
}

impl PricingKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "FIXED" => Some(PricingKind::Fixed),
            "GDA" => Some(PricingKind::Gda),
            "SCALED" => Some(PricingKind::Scaled),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            PricingKind::Fixed => "FIXED",
            PricingKind::Gda => "GDA",
            PricingKind::Scaled => "SCALED",
        }
    }
}

/// Pricing configuration of one side of a listing, as read from the world.
///
/// `kind` stays a raw tag so that unknown tags surface at pricing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSide {
    pub kind: String,
    #[serde(default = "default_period")]
    pub period: f64,
    #[serde(default)]
    pub decay: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub scale: f64,
}

fn default_period() -> f64 {
    DEFAULT_PERIOD
}

impl PricingSide {
    pub fn fixed() -> Self {
        Self {
            kind: PricingKind::Fixed.as_tag().to_string(),
            period: DEFAULT_PERIOD,
            decay: 0.0,
            rate: 0.0,
            scale: 0.0,
        }
    }

    pub fn gda(period: f64, decay: f64, rate: f64) -> Self {
        Self {
            kind: PricingKind::Gda.as_tag().to_string(),
            period,
            decay,
            rate,
            scale: 0.0,
        }
    }

    pub fn scaled(scale: f64) -> Self {
        Self {
            kind: PricingKind::Scaled.as_tag().to_string(),
            period: DEFAULT_PERIOD,
            decay: 0.0,
            rate: 0.0,
            scale,
        }
    }

    pub fn kind(&self) -> Option<PricingKind> {
        PricingKind::from_tag(&self.kind)
    }

    /// Curve parameters of this side for an item's value and sales
    pub fn params(&self, value: f64, sold: f64, start_time: f64) -> PricingParams {
        PricingParams {
            value,
            period: self.period,
            decay: self.decay,
            rate: self.rate,
            sold,
            start_time,
        }
    }
}

/// Anything sold at a price: the economic slice of a shape
pub trait Priced {
    /// Unit value in whole pay-item units
    fn unit_value(&self) -> f64;

    fn sold(&self) -> f64;

    /// Seconds since the Unix epoch
    fn start_time(&self) -> f64;

    fn pricing(&self, side: Side) -> Option<&PricingSide>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Tag unknown, or not valid for this side
    #[error("unsupported {side} pricing kind '{kind}'")]
    UnsupportedPricingKind { side: Side, kind: String },

    /// Parameters that would divide by zero or leave the curve's domain
    #[error("degenerate pricing parameters: {0}")]
    DegenerateParameters(&'static str),

    #[error("no {0} pricing configured")]
    NoPricing(Side),

    /// Result does not fit an integer price
    #[error("price is not representable")]
    Overflow,
}

/// Price of buying `amt` units.
///
/// Buy side supports `FIXED` and `GDA`.
pub fn buy_price<P: Priced + ?Sized>(item: &P, now: f64, amt: u64) -> Result<u64, PricingError> {
    let side = item.pricing(Side::Buy).ok_or(PricingError::NoPricing(Side::Buy))?;
    match side.kind() {
        Some(PricingKind::Fixed) => fixed_price(item.unit_value(), amt),
        Some(PricingKind::Gda) => {
            if amt == 0 {
                return Ok(0);
            }
            let params = side.params(item.unit_value(), item.sold(), item.start_time());
            listing_gda_price(&params, now, amt)
        }
        _ => Err(PricingError::UnsupportedPricingKind {
            side: Side::Buy,
            kind: side.kind.clone(),
        }),
    }
}

/// Price paid out for selling `amt` units.
///
/// Sell side supports `FIXED` and `SCALED` (a multiple of [`buy_price`]).
pub fn sell_price<P: Priced + ?Sized>(item: &P, now: f64, amt: u64) -> Result<u64, PricingError> {
    let side = item
        .pricing(Side::Sell)
        .ok_or(PricingError::NoPricing(Side::Sell))?;
    match side.kind() {
        Some(PricingKind::Fixed) => fixed_price(item.unit_value(), amt),
        Some(PricingKind::Scaled) => {
            if !side.scale.is_finite() || side.scale < 0.0 {
                return Err(PricingError::DegenerateParameters("scale must be non-negative"));
            }
            if amt == 0 {
                return Ok(0);
            }
            let buy = buy_price(item, now, amt)?;
            round_up(side.scale * buy as f64)
        }
        _ => Err(PricingError::UnsupportedPricingKind {
            side: Side::Sell,
            kind: side.kind.clone(),
        }),
    }
}

/// `value * amt`, rounded up
pub fn fixed_price(value: f64, amt: u64) -> Result<u64, PricingError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PricingError::DegenerateParameters("value must be non-negative"));
    }
    if amt == 0 {
        return Ok(0);
    }
    round_up(value * amt as f64)
}

/// Floating-point slack, in ulps, tolerated around an exact integer price
const SNAP_ULPS: f64 = 16.0;

/// Convert a raw price into whole units, rounding towards the seller.
///
/// Values within a few ulps of an integer are that integer: `0.07 * 100` is 7,
/// not 8.
pub(crate) fn round_up(raw: f64) -> Result<u64, PricingError> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(PricingError::Overflow);
    }
    let nearest = raw.round();
    let price = if (raw - nearest).abs() <= nearest * SNAP_ULPS * f64::EPSILON {
        nearest
    } else {
        raw.ceil()
    };
    if price >= u64::MAX as f64 {
        return Err(PricingError::Overflow);
    }
    Ok(price as u64)
}

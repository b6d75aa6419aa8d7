use super::{round_up, PricingError, PricingParams};

/// Instantaneous price of the next unit: `value * decay^(tDelta - sold/rate)`
pub fn unit_price(params: &PricingParams, now: f64) -> Result<f64, PricingError> {
    params.validate()?;
    let t_delta = params.periods_elapsed(now);
    Ok(params.value * params.decay.powf(t_delta - params.sold / params.rate))
}

/// Cost of buying `amt` units off a continuous GDA curve.
///
/// Integral form:
///
/// ```text
/// value * decay^(tDelta - sold/rate) * (decay^(-amt/rate) - 1) / (decay^-1 - 1)
/// ```
pub fn gda_buy_price(params: &PricingParams, now: f64, amt: u64) -> Result<u64, PricingError> {
    let current = unit_price(params, now)?;
    if amt == 0 {
        return Ok(0);
    }

    let amt = amt as f64;
    let numerator = params.decay.powf(-amt / params.rate) - 1.0;
    let denominator = params.decay.recip() - 1.0;
    round_up(current * numerator / denominator)
}

/// Cost of buying `amt` units off a listing's discrete GDA curve.
///
/// One unit costs the instantaneous price; more units sum a geometric series
/// with ratio `decay^(-1/rate)`.
pub fn listing_gda_price(params: &PricingParams, now: f64, amt: u64) -> Result<u64, PricingError> {
    let mut price = unit_price(params, now)?;
    if amt == 0 {
        return Ok(0);
    }

    if amt > 1 {
        let scale = params.decay.powf(-1.0 / params.rate);
        if scale == 1.0 {
            // rate so large that the ratio rounds to exactly one
            return Err(PricingError::DegenerateParameters("sale rate too large for decay"));
        }
        price = price * (scale.powf(amt as f64) - 1.0) / (scale - 1.0);
    }

    round_up(price)
}

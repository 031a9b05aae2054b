//! Window bounds and the sample standard deviation.
//!
//! The statistic is computed in decimal arithmetic end to end: mean,
//! squared deviations, the `n - 1` division and the square root. Inputs are
//! exact decimal prices, so no binary floating-point rounding enters the
//! stored value. Deviations are shifted and widened by a power of ten before
//! squaring, so tiny prices keep the same significant digits as large ones.
//! Only when a decimal operation would overflow (prices far
//! beyond any quoted asset) does the computation fall back to `f64`.

use coinvol_core::{Statistic, UnixSeconds, MIN_WINDOW_OBSERVATIONS};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use tracing::warn;

use crate::error::{AggregatorError, AggregatorResult};

/// Inclusive time bounds of a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub from: UnixSeconds,
    pub to: UnixSeconds,
}

impl WindowBounds {
    /// `[end - length, end]`.
    pub fn trailing(end: UnixSeconds, length: i64) -> Self {
        Self {
            from: end.saturating_sub(length.max(0)),
            to: end,
        }
    }

    #[inline]
    pub fn contains(&self, time: UnixSeconds) -> bool {
        self.from <= time && time <= self.to
    }
}

/// Sample standard deviation (denominator `n - 1`).
///
/// Returns `Ok(None)` for fewer than two values.
pub fn sample_std_dev(values: &[Decimal]) -> AggregatorResult<Option<Statistic>> {
    if values.len() < MIN_WINDOW_OBSERVATIONS {
        return Ok(None);
    }

    if let Some(std_dev) = exact_std_dev(values) {
        return Ok(Some(Statistic::new(std_dev)));
    }

    warn!(
        count = values.len(),
        "Decimal overflow in std dev, falling back to f64"
    );
    let std_dev = float_std_dev(values).ok_or_else(|| {
        AggregatorError::Numeric(format!(
            "std dev of {} values not representable",
            values.len()
        ))
    })?;
    Ok(Some(Statistic::new(std_dev)))
}

fn exact_std_dev(values: &[Decimal]) -> Option<Decimal> {
    // Shift to the window minimum and widen so the largest deviation has
    // RESCALE_TARGET_DIGITS integer digits.
    let min = values.iter().copied().min()?;
    let shifted = values
        .iter()
        .map(|v| v.checked_sub(min))
        .collect::<Option<Vec<_>>>()?;
    let range = shifted.iter().copied().max()?;
    if range.is_zero() {
        return Some(Decimal::ZERO);
    }

    let factor = rescale_factor(range)?;
    let scaled = shifted
        .iter()
        .map(|v| v.checked_mul(factor))
        .collect::<Option<Vec<_>>>()?;

    let n = Decimal::from(values.len());
    let sum = scaled
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    let mean = sum.checked_div(n)?;

    let squared_deviations = scaled.iter().try_fold(Decimal::ZERO, |acc, v| {
        let d = v.checked_sub(mean)?;
        acc.checked_add(d.checked_mul(d)?)
    })?;

    let variance = squared_deviations.checked_div(n - Decimal::ONE)?;
    variance.sqrt()?.checked_div(factor)
}

/// Integer digits the widest scaled deviation is brought up to.
const RESCALE_TARGET_DIGITS: u32 = 12;

/// `10^k` with the smallest `k <= 28` that lifts `range` to at least
/// `10^(RESCALE_TARGET_DIGITS - 1)`. Ranges already that wide get `1`.
fn rescale_factor(range: Decimal) -> Option<Decimal> {
    let threshold = Decimal::from(10_i64.pow(RESCALE_TARGET_DIGITS - 1));
    let mut exponent = 0_u32;
    let mut widened = range;
    while widened < threshold && exponent < Decimal::MAX_SCALE {
        widened = widened.checked_mul(Decimal::TEN)?;
        exponent += 1;
    }
    Some(Decimal::from_i128_with_scale(10_i128.pow(exponent), 0))
}

fn float_std_dev(values: &[Decimal]) -> Option<Decimal> {
    let floats = values
        .iter()
        .map(|v| v.to_f64())
        .collect::<Option<Vec<f64>>>()?;
    let n = floats.len() as f64;
    let mean = floats.iter().sum::<f64>() / n;
    let variance = floats.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if !std_dev.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(std_dev)
}

//! Exact grain arithmetic.
//!
//! A [`GrainAmount`] counts atomic units with [`GRAIN_DECIMALS`] implicit
//! decimal places (1 g = 10^18 units). All arithmetic is checked integer
//! arithmetic; no floating-point representation is ever used for amounts,
//! and serialization uses decimal strings to survive precision-lossy
//! transports.
//!
//! The one place fractional values appear is proportional allocation
//! ([`split_budget`]), which computes each share with exact integer
//! `budget * w / W` and then distributes the truncation remainder
//! deterministically.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{GRAIN_DECIMALS, ONE_GRAIN};
use crate::error::AmountError;

/// A non-negative grain amount in atomic units.
///
/// Ordering, equality and hashing follow the underlying integer. The
/// default value is zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GrainAmount(u128);

impl GrainAmount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Construct from raw atomic units.
    pub const fn from_atoms(atoms: u128) -> Self {
        Self(atoms)
    }

    /// Construct from a whole number of grain (`n * 10^18` atoms).
    ///
    /// # Errors
    ///
    /// [`AmountError::ArithmeticOverflow`] if the scaled value exceeds `u128`.
    pub fn from_grain(whole: u64) -> Result<Self, AmountError> {
        (whole as u128)
            .checked_mul(ONE_GRAIN)
            .map(Self)
            .ok_or(AmountError::ArithmeticOverflow)
    }

    /// The raw atomic unit count.
    pub const fn atoms(&self) -> u128 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// [`AmountError::ArithmeticOverflow`] on `u128` overflow.
    pub fn checked_add(self, other: Self) -> Result<Self, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(AmountError::ArithmeticOverflow)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// [`AmountError::InsufficientBalance`] if the result would be negative;
    /// amounts are unsigned and the ledger never represents debt.
    pub fn checked_sub(self, other: Self) -> Result<Self, AmountError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(AmountError::InsufficientBalance {
                have: self.0,
                need: other.0,
            })
    }

    /// Exact `self * numerator / denominator`, truncated toward zero.
    ///
    /// Returns the floor quotient and the remainder of the division, so
    /// callers can implement largest-remainder rounding.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ZeroDenominator`] if `denominator` is zero
    /// - [`AmountError::ArithmeticOverflow`] if `self * numerator` exceeds `u128`
    pub fn mul_div(self, numerator: u128, denominator: u128) -> Result<(Self, u128), AmountError> {
        if denominator == 0 {
            return Err(AmountError::ZeroDenominator);
        }
        let product = self
            .0
            .checked_mul(numerator)
            .ok_or(AmountError::ArithmeticOverflow)?;
        Ok((Self(product / denominator), product % denominator))
    }

    /// Format for display: thousands-separated whole part, `decimals`
    /// fractional digits (truncated, never rounded), then `suffix`.
    ///
    /// Pure string transform; the underlying integer is never altered.
    /// `decimals` above [`GRAIN_DECIMALS`] is clamped.
    pub fn format(&self, decimals: u32, suffix: &str) -> String {
        let whole = self.0 / ONE_GRAIN;
        let frac = self.0 % ONE_GRAIN;

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let decimals = decimals.min(GRAIN_DECIMALS) as usize;
        if decimals == 0 {
            return format!("{grouped}{suffix}");
        }
        let frac_digits = format!("{frac:018}");
        format!("{grouped}.{}{suffix}", &frac_digits[..decimals])
    }
}

impl fmt::Display for GrainAmount {
    /// Displays the raw atomic unit count as a decimal string. This is the
    /// serialized wire form; use [`GrainAmount::format`] for human display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GrainAmount {
    type Err = AmountError;

    /// Parses a decimal atomic-unit string. Signs, whitespace, decimal
    /// points and values over `u128::MAX` are all rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::ParseAmount(s.to_string()));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| AmountError::ParseAmount(s.to_string()))
    }
}

impl Serialize for GrainAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for GrainAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Sum an iterator of amounts with overflow checking.
pub fn checked_sum<I: IntoIterator<Item = GrainAmount>>(amounts: I) -> Result<GrainAmount, AmountError> {
    amounts
        .into_iter()
        .try_fold(GrainAmount::ZERO, GrainAmount::checked_add)
}

/// Split `budget` across `weights` proportionally, conserving the total.
///
/// Each entry's floor share is the exact integer `budget * w_i / W`. The
/// remainder (`budget` minus the floor-share sum, always less than the
/// number of entries) is then assigned one atomic unit at a time to the
/// entries with the largest truncation remainder, ties broken by lowest
/// index. Callers supply weights in ascending identity-id order, which
/// makes the tie-break reproducible across runs and machines.
///
/// Postcondition: the returned shares sum to exactly `budget`.
///
/// # Errors
///
/// - [`AmountError::ZeroDenominator`] if the weights sum to zero
/// - [`AmountError::ArithmeticOverflow`] if `budget * w_i` or the weight
///   total exceeds `u128`
pub fn split_budget(budget: GrainAmount, weights: &[u128]) -> Result<Vec<GrainAmount>, AmountError> {
    let total: u128 = weights.iter().try_fold(0u128, |acc, w| {
        acc.checked_add(*w).ok_or(AmountError::ArithmeticOverflow)
    })?;
    if total == 0 {
        return Err(AmountError::ZeroDenominator);
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut allocated = GrainAmount::ZERO;
    for &w in weights {
        let (share, rem) = budget.mul_div(w, total)?;
        allocated = allocated.checked_add(share)?;
        shares.push(share);
        remainders.push(rem);
    }

    // budget - allocated < weights.len(), since each remainder < total.
    let mut leftover = budget.checked_sub(allocated)?.atoms();
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]).then(a.cmp(&b)));
    for &i in &order {
        if leftover == 0 {
            break;
        }
        shares[i] = shares[i].checked_add(GrainAmount::from_atoms(1))?;
        leftover -= 1;
    }

    Ok(shares)
}

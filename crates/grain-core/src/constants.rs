//! Ledger-wide constants. All monetary values are in atomic grain units
//! (1 g = 10^18 units).

/// Number of implicit decimal places carried by every [`GrainAmount`](crate::amount::GrainAmount).
pub const GRAIN_DECIMALS: u32 = 18;

/// Atomic units per whole grain.
pub const ONE_GRAIN: u128 = 10u128.pow(GRAIN_DECIMALS);

/// Fixed-point scale for converting floating-point Cred scores into integer
/// weights (micro-Cred). This is the single rounding point between the
/// external scoring pipeline and the exact allocation arithmetic.
pub const CRED_PRECISION: u64 = 1_000_000;

/// Maximum length of an identity display name.
pub const MAX_NAME_LENGTH: usize = 40;

/// Default currency suffix used by display formatting.
pub const DEFAULT_SUFFIX: &str = "g";

/// Default number of fractional digits shown by display formatting.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_grain_matches_decimals() {
        assert_eq!(ONE_GRAIN, 1_000_000_000_000_000_000);
        assert_eq!(ONE_GRAIN, 10u128.pow(GRAIN_DECIMALS));
    }
}

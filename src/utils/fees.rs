/// Platform fee arithmetic.
///
/// All amounts are `BigDecimal` at 2 decimal places. The fee is a percentage
/// of the charged amount, rounded half-up; the escrow amount is the exact
/// remainder, so `escrow_amount + platform_fee == amount` holds by
/// construction for every fee percentage in [0, 100).
use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{ToPrimitive, Zero};

#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
    pub platform_fee: BigDecimal,
    pub escrow_amount: BigDecimal,
}

pub fn split_platform_fee(amount: &BigDecimal, fee_percent: &BigDecimal) -> Result<FeeBreakdown, String> {
    if amount <= &BigDecimal::zero() {
        return Err("Amount must be positive".to_string());
    }
    if fee_percent < &BigDecimal::zero() || fee_percent >= &BigDecimal::from(100) {
        return Err("Fee percentage must be in [0, 100)".to_string());
    }

    let amount = amount.with_scale_round(2, RoundingMode::HalfUp);
    let platform_fee = (&amount * fee_percent / BigDecimal::from(100))
        .with_scale_round(2, RoundingMode::HalfUp);
    let escrow_amount = (&amount - &platform_fee).with_scale(2);

    Ok(FeeBreakdown {
        platform_fee,
        escrow_amount,
    })
}

/// Convert a major-unit amount to the gateway's minor units (kobo for NGN).
pub fn to_minor_units(amount: &BigDecimal) -> Option<i64> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn ten_percent_of_1000() {
        let split = split_platform_fee(&dec("1000.00"), &dec("10")).unwrap();
        assert_eq!(split.platform_fee, dec("100.00"));
        assert_eq!(split.escrow_amount, dec("900.00"));
    }

    #[test]
    fn rounds_half_up() {
        // 10% of 0.05 = 0.005 -> 0.01
        let split = split_platform_fee(&dec("0.05"), &dec("10")).unwrap();
        assert_eq!(split.platform_fee, dec("0.01"));
        assert_eq!(split.escrow_amount, dec("0.04"));

        // 2.5% of 12345.67 = 308.64175 -> 308.64
        let split = split_platform_fee(&dec("12345.67"), &dec("2.5")).unwrap();
        assert_eq!(split.platform_fee, dec("308.64"));
        assert_eq!(split.escrow_amount, dec("12037.03"));
    }

    #[test]
    fn parts_always_sum_to_amount() {
        let amount = dec("9999.99");
        for pct in 0..100 {
            let split = split_platform_fee(&amount, &BigDecimal::from(pct)).unwrap();
            assert_eq!(
                &split.platform_fee + &split.escrow_amount,
                amount.with_scale(2),
                "fee split broke at {}%",
                pct
            );
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(split_platform_fee(&dec("0"), &dec("10")).is_err());
        assert!(split_platform_fee(&dec("-5"), &dec("10")).is_err());
        assert!(split_platform_fee(&dec("100"), &dec("-1")).is_err());
        assert!(split_platform_fee(&dec("100"), &dec("100")).is_err());
        assert!(split_platform_fee(&dec("100"), &dec("0")).is_ok());
    }

    #[test]
    fn minor_unit_conversion() {
        assert_eq!(to_minor_units(&dec("1000.00")), Some(100000));
        assert_eq!(to_minor_units(&dec("0.50")), Some(50));
        assert_eq!(to_minor_units(&dec("123.456")), Some(12346));
    }
}

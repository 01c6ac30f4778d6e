use rand::distr::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Fresh gateway reference for a charge. Random suffix so a re-initiated
/// checkout after a failed charge gets a distinct reference.
pub fn charge_reference() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..10).map(|_| rng.sample(Alphanumeric) as char).collect();
    format!("SVH-CHG-{}", suffix.to_uppercase())
}

/// Transfer reference for a payout. Derived from the payment id and nothing
/// else: retries reuse it, and the gateway deduplicates on it.
pub fn payout_reference(payment_id: Uuid) -> String {
    format!("SVH-PAYOUT-{}", payment_id.simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_references_are_unique() {
        assert_ne!(charge_reference(), charge_reference());
    }

    #[test]
    fn payout_reference_is_stable_per_payment() {
        let payment_id = Uuid::new_v4();
        assert_eq!(payout_reference(payment_id), payout_reference(payment_id));
        assert_ne!(payout_reference(payment_id), payout_reference(Uuid::new_v4()));
    }
}

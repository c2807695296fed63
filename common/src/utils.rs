use crate::{asset::Denomination, config::COIN_VALUE, ledger::Amount};

// Format an amount in minor units as a human readable decimal string
pub fn format_coin(amount: Amount, decimals: u8) -> String {
    let scale = 10u128.pow(decimals as u32);
    let major = amount / scale;
    let minor = amount % scale;
    if minor == 0 {
        return major.to_string();
    }

    let fraction = format!("{:0width$}", minor, width = decimals as usize);
    format!("{}.{}", major, fraction.trim_end_matches('0'))
}

// Format with the denomination symbol appended
pub fn format_usdtg(amount: Amount, denom: Denomination) -> String {
    format!("{} {}", format_coin(amount, denom.decimals()), denom)
}

// Parse a decimal string into minor units.
// Rejects more fractional digits than the fixed-point scale carries.
pub fn parse_coin(value: &str, decimals: u8) -> Option<Amount> {
    let mut parts = value.splitn(2, '.');
    let major: u128 = parts.next()?.parse().ok()?;
    let fraction = parts.next().unwrap_or("");
    if fraction.len() > decimals as usize || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let scale = 10u128.pow(decimals as u32);
    let minor: u128 = if fraction.is_empty() {
        0
    } else {
        let parsed: u128 = fraction.parse().ok()?;
        parsed * 10u128.pow((decimals as usize - fraction.len()) as u32)
    };

    major.checked_mul(scale)?.checked_add(minor)
}

// Convenience for the 18-decimals family
pub fn to_minor_units(major: u128) -> Amount {
    major * COIN_VALUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::COIN_DECIMALS;

    #[test]
    fn test_format_coin() {
        assert_eq!(format_coin(COIN_VALUE, COIN_DECIMALS), "1");
        assert_eq!(format_coin(COIN_VALUE / 2, COIN_DECIMALS), "0.5");
        assert_eq!(
            format_coin(3 * COIN_VALUE + COIN_VALUE / 2, COIN_DECIMALS),
            "3.5"
        );
        assert_eq!(format_coin(0, COIN_DECIMALS), "0");
    }

    #[test]
    fn test_parse_coin() {
        assert_eq!(parse_coin("1", COIN_DECIMALS), Some(COIN_VALUE));
        assert_eq!(parse_coin("3.5", COIN_DECIMALS), Some(3 * COIN_VALUE + COIN_VALUE / 2));
        assert_eq!(parse_coin("0", COIN_DECIMALS), Some(0));
        assert_eq!(parse_coin("1.2.3", COIN_DECIMALS), None);
        assert_eq!(parse_coin("abc", COIN_DECIMALS), None);
    }

    #[test]
    fn test_roundtrip() {
        let amounts = [0, 1, COIN_VALUE, 42 * COIN_VALUE + 7];
        for amount in amounts {
            let formatted = format_coin(amount, COIN_DECIMALS);
            assert_eq!(parse_coin(&formatted, COIN_DECIMALS), Some(amount));
        }
    }
}

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .unwrap()
});

const MAX_EMAIL_LEN: usize = 254;

/// Money columns are NUMERIC(14, 2).
const MONEY_SCALE: u32 = 2;
const MONEY_INTEGER_DIGITS: u32 = 12;

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Parse a monetary amount from a JSON number or numeric string.
pub fn parse_amount(value: &Value) -> Result<Decimal, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err("A valid number is required.".to_string()),
    };

    // Large or tiny JSON numbers print in exponent form
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| "A valid number is required.".to_string())?;

    if amount.normalize().scale() > MONEY_SCALE {
        return Err(format!(
            "Ensure that there are no more than {MONEY_SCALE} decimal places."
        ));
    }
    if amount.abs() >= Decimal::from(10_i64.pow(MONEY_INTEGER_DIGITS)) {
        return Err(format!(
            "Ensure that there are no more than {MONEY_INTEGER_DIGITS} digits before the decimal point."
        ));
    }
    Ok(amount)
}

/// A strictly positive amount, as required for deposits.
pub fn parse_positive_amount(value: Option<&Value>) -> Result<Decimal, String> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| "Amount is required.".to_string())?;
    let amount = parse_amount(value)?;
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero.".to_string());
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "plain", "@example.com", "user@", "user@host", "a b@example.com", "user@@example.com"] {
            assert!(!is_valid_email(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn amounts_from_numbers_and_strings() {
        assert_eq!(parse_amount(&json!(50)).unwrap(), Decimal::from(50));
        assert_eq!(parse_amount(&json!("12.50")).unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_amount(&json!(-3.5)).unwrap(), Decimal::new(-35, 1));
    }

    #[test]
    fn amounts_reject_garbage_and_extra_precision() {
        assert!(parse_amount(&json!("abc")).is_err());
        assert!(parse_amount(&json!(true)).is_err());
        assert!(parse_amount(&json!({"amount": 1})).is_err());
        assert!(parse_amount(&json!(1.005)).is_err());
    }

    #[test]
    fn amounts_must_fit_the_money_column() {
        assert!(parse_amount(&json!("999999999999.99")).is_ok());
        assert!(parse_amount(&json!("-999999999999.99")).is_ok());
        assert!(parse_amount(&json!("1000000000000")).is_err());
        assert!(parse_amount(&json!(-1e12)).is_err());
        assert!(parse_amount(&json!(1e20)).is_err());
    }

    #[test]
    fn deposits_must_be_present_and_positive() {
        assert!(parse_positive_amount(None).is_err());
        assert!(parse_positive_amount(Some(&Value::Null)).is_err());
        assert!(parse_positive_amount(Some(&json!(0))).is_err());
        assert!(parse_positive_amount(Some(&json!(-10))).is_err());
        assert_eq!(
            parse_positive_amount(Some(&json!(50))).unwrap().to_string(),
            "50"
        );
    }
}

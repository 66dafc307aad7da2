use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Decimals used when a format leaves precision automatic.
const AUTO_MAX_DECIMALS: u8 = 2;
const MAX_DECIMALS: u8 = 12;

/// Number-to-label formatting used for axis ticks and bar end labels.
///
/// With `decimals: None` the value is rounded to two places and trailing
/// zeros are trimmed, so `10` prints as `10` and `2.50` as `2.5`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueFormat {
    pub prefix: String,
    pub suffix: String,
    pub decimals: Option<u8>,
    pub thousands_separator: bool,
}

impl ValueFormat {
    #[must_use]
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_thousands_separator(mut self) -> Self {
        self.thousands_separator = true;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.decimals.is_some_and(|decimals| decimals > MAX_DECIMALS) {
            return Err(ChartError::InvalidData(format!(
                "value format decimals must be <= {MAX_DECIMALS}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let decimals = usize::from(self.decimals.unwrap_or(AUTO_MAX_DECIMALS).min(MAX_DECIMALS));
        let mut digits = format!("{:.*}", decimals, value.abs());
        if self.decimals.is_none() && digits.contains('.') {
            let trimmed = digits.trim_end_matches('0').trim_end_matches('.').len();
            digits.truncate(trimmed);
        }
        if self.thousands_separator {
            digits = group_thousands(&digits);
        }

        let is_zero = digits.chars().all(|c| matches!(c, '0' | '.' | ','));
        let sign = if value < 0.0 && !is_zero { "-" } else { "" };
        format!("{sign}{}{digits}{}", self.prefix, self.suffix)
    }
}

fn group_thousands(digits: &str) -> String {
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3 + 4);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::ValueFormat;

    #[test]
    fn automatic_precision_trims_trailing_zeros() {
        let format = ValueFormat::default();
        assert_eq!(format.format(10.0), "10");
        assert_eq!(format.format(2.5), "2.5");
        assert_eq!(format.format(1.0 / 3.0), "0.33");
        assert_eq!(format.format(-5.0), "-5");
    }

    #[test]
    fn sign_goes_before_prefix() {
        let format = ValueFormat::default().with_prefix("$").with_suffix("bn");
        assert_eq!(format.format(-1.25), "-$1.25bn");
    }

    #[test]
    fn negative_values_rounding_to_zero_drop_the_sign() {
        let format = ValueFormat::default().with_decimals(1);
        assert_eq!(format.format(-0.01), "0.0");
    }

    #[test]
    fn thousands_are_grouped() {
        let format = ValueFormat::default()
            .with_decimals(1)
            .with_thousands_separator();
        assert_eq!(format.format(1_234_567.0), "1,234,567.0");
        assert_eq!(format.format(999.0), "999.0");
    }

    #[test]
    fn excessive_precision_is_rejected() {
        assert!(ValueFormat::default().with_decimals(13).validate().is_err());
    }
}

//! Currency translation to the gateway's numeric codes.

use crate::{RedsysError, Result};

/// Alphabetic currency code paired with the numeric code the gateway expects.
const CURRENCY_TABLE: &[(&str, &str)] = &[
    ("EUR", "978"),
    ("USD", "840"),
    ("GBP", "826"),
    ("JPY", "392"),
    ("ARS", "032"),
    ("CAD", "124"),
    ("CLF", "152"),
    ("COP", "170"),
    ("INR", "356"),
    ("MXN", "484"),
    ("PEN", "604"),
    ("CHF", "756"),
    ("BRL", "986"),
    ("VEF", "937"),
    ("TRY", "949"),
];

/// Translate an alphabetic currency code into the gateway's 3-digit code.
///
/// Matching is exact: `"eur"` is not `"EUR"`.
///
/// # Example
///
/// ```
/// use redsys_lib::currency::to_numeric_code;
///
/// assert_eq!(to_numeric_code("EUR").unwrap(), "978");
/// assert_eq!(to_numeric_code("ARS").unwrap(), "032");
/// assert!(to_numeric_code("XYZ").is_err());
/// ```
pub fn to_numeric_code(currency: &str) -> Result<&'static str> {
    CURRENCY_TABLE
        .iter()
        .find(|(alpha, _)| *alpha == currency)
        .map(|(_, numeric)| *numeric)
        .ok_or_else(|| RedsysError::UnsupportedCurrency(currency.to_string()))
}

/// All supported currencies as `(alphabetic, numeric)` pairs.
pub fn supported_currencies() -> &'static [(&'static str, &'static str)] {
    CURRENCY_TABLE
}

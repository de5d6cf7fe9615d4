//! Minor-unit money helpers. Amounts are `i64` cents throughout the
//! engine; conversion to and from decimal strings is integer math with at
//! most 2 decimal places. No floats.

/// Parse a decimal money string ("1234.5", "1,234.56", "-12") into cents.
pub fn parse_cents(s: &str) -> Result<i64, String> {
    let s = s.trim().replace(',', "");
    if s.is_empty() {
        return Err("empty amount".into());
    }
    let negative = s.starts_with('-');
    let s = s.trim_start_matches('-');
    let (units, cents) = if let Some(dot) = s.find('.') {
        let u: i64 = s[..dot]
            .parse()
            .map_err(|e| format!("bad units: {e}"))?;
        let frac = &s[dot + 1..];
        let c: i64 = match frac.len() {
            0 => 0,
            1 => {
                frac.parse::<i64>()
                    .map_err(|e| format!("bad cents: {e}"))?
                    * 10
            }
            2 => frac.parse().map_err(|e| format!("bad cents: {e}"))?,
            _ => return Err(format!("too many decimal places: {s}")),
        };
        (u, c)
    } else {
        (s.parse().map_err(|e| format!("bad amount: {e}"))?, 0)
    };
    let minor = units * 100 + cents;
    Ok(if negative { -minor } else { minor })
}

/// Format cents as a fixed two-decimal string with thousands separators,
/// e.g. `123456` → `"1,234.56"`.
pub fn format_cents(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let units = abs / 100;
    let frac = abs % 100;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{frac:02}")
}

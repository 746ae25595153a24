use chrono::NaiveDate;

pub const MONTHS_SHORT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

pub const MONTHS_LONG: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// Formats a monetary value in the pt-PT style, e.g. `1 234,50 AOA`
///
/// Thousands are grouped with a space, decimals use a comma and there are
/// always two of them. Negative values get a leading minus sign.
///
/// # Examples
/// ```
/// use financecontrol::format::format_currency;
///
/// assert_eq!(format_currency(1234.5, "AOA"), "1 234,50 AOA");
/// assert_eq!(format_currency(0.0, "EUR"), "0,00 EUR");
/// ```
pub fn format_currency(value: f64, currency: &str) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = cents / 100;
    let fraction = cents % 100;

    let digits = units.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02} {}", sign, grouped, fraction, currency)
}

/// `dd/mm/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Capitalised long month name for a 1-based month
pub fn month_title(month: u32) -> String {
    let name = MONTHS_LONG[(month.clamp(1, 12) - 1) as usize];
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

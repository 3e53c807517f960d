use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// A price read out of free text such as `"$1,299.00"` or `"EUR 49,95"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrice {
    pub amount: Decimal,
    pub currency: Option<String>,
}

/// Turns the display strings some pages hand back in place of a number into
/// a decimal amount and, when the text says so, a currency code.
pub struct PriceParser {
    price_regex: Regex,
    currency_symbols: Vec<(&'static str, &'static str)>,
    currency_codes: Vec<&'static str>,
}

impl Default for PriceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceParser {
    pub fn new() -> Self {
        // Longer symbols first so "US$" wins over "$".
        let currency_symbols = vec![
            ("USD$", "USD"),
            ("US$", "USD"),
            ("A$", "AUD"),
            ("C$", "CAD"),
            ("£", "GBP"),
            ("€", "EUR"),
            ("¥", "JPY"),
            ("₹", "INR"),
            ("$", "USD"),
        ];

        PriceParser {
            price_regex: Regex::new(r"(\d{1,3}(?:[.,\s]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?)")
                .expect("price pattern is a valid regex"),
            currency_symbols,
            currency_codes: vec!["USD", "EUR", "GBP", "AUD", "CAD", "JPY", "INR", "CNY", "KRW"],
        }
    }

    pub fn parse(&self, text: &str) -> Option<ParsedPrice> {
        let captures = self.price_regex.captures(text)?;
        let amount = normalize_amount(captures.get(1)?.as_str())?;

        Some(ParsedPrice {
            amount,
            currency: self.extract_currency(text),
        })
    }

    fn extract_currency(&self, text: &str) -> Option<String> {
        let upper = text.to_uppercase();
        if let Some(code) = self.currency_codes.iter().find(|code| upper.contains(**code)) {
            return Some(code.to_string());
        }

        self.currency_symbols
            .iter()
            .find(|(symbol, _)| text.contains(symbol))
            .map(|(_, code)| code.to_string())
    }
}

/// `"1,299.00"` and `"1.299,00"` both mean 1299; a lone comma followed by one
/// or two digits is a decimal comma.
fn normalize_amount(raw: &str) -> Option<Decimal> {
    let compact: String = raw.chars().filter(|c: &char| !c.is_whitespace()).collect();

    let last_sep = compact.rfind(|c: char| c == '.' || c == ',');
    let normalized = match last_sep {
        Some(idx) if compact.len() - idx - 1 <= 2 => {
            let (int_part, frac_part) = compact.split_at(idx);
            let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();
            format!("{}.{}", int_digits, &frac_part[1..])
        }
        _ => compact.chars().filter(|c| c.is_ascii_digit()).collect(),
    };

    Decimal::from_str(&normalized).ok()
}

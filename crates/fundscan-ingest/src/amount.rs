//! Funding amounts
//!
//! Amounts arrive as free text ("$5M", "USD 1.2 billion", "€300K", "n/a").
//! Anything that carries a currency marker or a magnitude suffix is turned
//! into a [`Money`] value in whole currency units; everything else is kept
//! verbatim as [`Amount::Unparsed`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Inr,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Inr => "INR",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Currency::Usd => '$',
            Currency::Eur => '€',
            Currency::Gbp => '£',
            Currency::Jpy => '¥',
            Currency::Inr => '₹',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '$' => Some(Currency::Usd),
            '€' => Some(Currency::Eur),
            '£' => Some(Currency::Gbp),
            '¥' => Some(Currency::Jpy),
            '₹' => Some(Currency::Inr),
            _ => None,
        }
    }

    fn from_code(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            "GBP" => Some(Currency::Gbp),
            "JPY" => Some(Currency::Jpy),
            "INR" => Some(Currency::Inr),
            _ => None,
        }
    }
}

/// A currency and a magnitude in whole units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Money {
    pub currency: Currency,
    pub value: u64,
}

impl Money {
    pub fn new(currency: Currency, value: u64) -> Self {
        Self { currency, value }
    }
}

const MAGNITUDES: [(u64, char); 3] = [(1_000_000_000, 'B'), (1_000_000, 'M'), (1_000, 'K')];

/// Compact display: `$5M`, `$6.5B`, `€300K`, `£950`
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.currency.symbol())?;

        for (unit, suffix) in MAGNITUDES {
            if self.value >= unit {
                let whole = self.value / unit;
                let rem = self.value % unit;
                if rem == 0 {
                    return write!(f, "{}{}", whole, suffix);
                }
                let width = unit.ilog10() as usize;
                let frac = format!("{:0width$}", rem, width = width);
                return write!(f, "{}.{}{}", whole, frac.trim_end_matches('0'), suffix);
            }
        }

        write!(f, "{}", self.value)
    }
}

/// A normalized amount, or the original text when it could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Amount {
    Money(Money),
    Unparsed(String),
}

impl Amount {
    /// Parse `text`, falling back to keeping it verbatim.
    pub fn parse(text: &str) -> Self {
        match parse_money(text) {
            Some(money) => Amount::Money(money),
            None => Amount::Unparsed(text.to_string()),
        }
    }

    pub fn is_unparsed(&self) -> bool {
        matches!(self, Amount::Unparsed(_))
    }

    pub fn money(&self) -> Option<Money> {
        match self {
            Amount::Money(money) => Some(*money),
            Amount::Unparsed(_) => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Money(money) => money.fmt(f),
            Amount::Unparsed(raw) => f.write_str(raw),
        }
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl From<String> for Amount {
    fn from(text: String) -> Self {
        Amount::parse(&text)
    }
}

/// Find the first money expression in `text`.
///
/// A candidate number is accepted when it has a currency marker (symbol or
/// ISO code, before or after) or a magnitude word (`K`, `M`, `B`, `mn`, `bn`,
/// `thousand`, `million`, `billion`), or when the whole input is just the
/// number. Bare amounts are taken as USD.
pub fn parse_money(text: &str) -> Option<Money> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut i = 0;

    while i < chars.len() {
        // A number glued to letters ("B2B") only counts after a currency code
        let starts_number = chars[i].is_ascii_digit()
            && match i.checked_sub(1).map(|prev| chars[prev]) {
                None => true,
                Some(prev) if is_number_char(prev) => false,
                Some(prev) if prev.is_alphabetic() => currency_before(&chars, i).is_some(),
                Some(_) => true,
            };
        if starts_number {
            if let Some(money) = money_at(&chars, i) {
                return Some(money);
            }
        }
        i += 1;
    }

    None
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == ','
}

fn money_at(chars: &[char], start: usize) -> Option<Money> {
    let mut currency = currency_before(chars, start);

    // Integer part, allowing thousands separators
    let mut pos = start;
    let mut int_digits = String::new();
    while pos < chars.len() {
        let c = chars[pos];
        if c.is_ascii_digit() {
            int_digits.push(c);
            pos += 1;
        } else if c == ','
            && chars
                .get(pos + 1..pos + 4)
                .is_some_and(|group| group.iter().all(|d| d.is_ascii_digit()))
            && chars.get(pos + 4).is_none_or(|d| !d.is_ascii_digit())
        {
            pos += 1;
        } else {
            break;
        }
    }

    let mut frac_digits = String::new();
    if chars.get(pos) == Some(&'.') && chars.get(pos + 1).is_some_and(|c| c.is_ascii_digit()) {
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            frac_digits.push(chars[pos]);
            pos += 1;
        }
    }
    let number_end = pos;

    let mut multiplier: Option<u64> = None;
    let (word, after_word) = word_after(chars, pos);
    if let Some(word) = word {
        if let Some(m) = magnitude(&word) {
            multiplier = Some(m);
            let (next, _) = word_after(chars, after_word);
            if currency.is_none() {
                currency = next.as_deref().and_then(Currency::from_code);
            }
        } else if currency.is_none() {
            currency = Currency::from_code(&word);
        }
    }

    let whole_input = start == 0 && number_end == chars.len();
    if currency.is_none() && multiplier.is_none() && !whole_input {
        return None;
    }

    let value = scale(&int_digits, &frac_digits, multiplier.unwrap_or(1))?;
    Some(Money::new(currency.unwrap_or(Currency::Usd), value))
}

/// Currency marker immediately before the number, ignoring whitespace.
fn currency_before(chars: &[char], start: usize) -> Option<Currency> {
    let mut pos = start;
    while pos > 0 && chars[pos - 1].is_whitespace() {
        pos -= 1;
    }
    if pos == 0 {
        return None;
    }
    if let Some(currency) = Currency::from_symbol(chars[pos - 1]) {
        return Some(currency);
    }
    if pos >= 3 {
        let code: String = chars[pos - 3..pos].iter().collect();
        let bounded = pos == 3 || !chars[pos - 4].is_alphabetic();
        if bounded {
            return Currency::from_code(&code);
        }
    }
    None
}

/// The alphabetic word starting after optional whitespace at `pos`.
///
/// A word running straight into digits is not returned.
fn word_after(chars: &[char], mut pos: usize) -> (Option<String>, usize) {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    let begin = pos;
    while pos < chars.len() && chars[pos].is_alphabetic() {
        pos += 1;
    }
    // "B2B" or "M3" is a token of its own, not a suffix
    let glued = chars.get(pos).is_some_and(|c| c.is_alphanumeric());
    if pos == begin || glued {
        (None, begin)
    } else {
        (Some(chars[begin..pos].iter().collect()), pos)
    }
}

fn magnitude(word: &str) -> Option<u64> {
    match word.to_lowercase().as_str() {
        "k" | "thousand" => Some(1_000),
        "m" | "mn" | "mm" | "million" => Some(1_000_000),
        "b" | "bn" | "billion" => Some(1_000_000_000),
        _ => None,
    }
}

/// `int.frac * multiplier` in integer arithmetic; sub-unit remainders are dropped.
fn scale(int_digits: &str, frac_digits: &str, multiplier: u64) -> Option<u64> {
    let int: u128 = int_digits.parse().ok()?;
    let mut value = int.checked_mul(multiplier as u128)?;

    if !frac_digits.is_empty() {
        let frac: u128 = frac_digits.parse().ok()?;
        let denom = 10u128.checked_pow(frac_digits.len() as u32)?;
        value = value.checked_add(frac.checked_mul(multiplier as u128)? / denom)?;
    }

    u64::try_from(value).ok()
}

//! English spoken-number preprocessor.
//!
//! Opt-in [`TextPreprocess`] that rewrites digits as words before the chunker
//! cleans the text, so the backend never has to guess how to read "1,250".

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::text::TextPreprocess;

const ONES: &[&str] = &[
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen",
    "seventeen", "eighteen", "nineteen",
];
const TENS: &[&str] = &["", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety"];
const SCALES: &[&str] = &["", "thousand", "million", "billion", "trillion", "quadrillion", "quintillion"];
const DIGITS: &[&str] = &["zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine"];

// Optional sign, digits with optional thousands separators, optional decimals.
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w.])(-?)(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d+))?\b").unwrap());

fn below_thousand(n: u64) -> String {
    let mut parts = Vec::new();
    if n >= 100 {
        parts.push(format!("{} hundred", ONES[(n / 100) as usize]));
    }
    let rest = n % 100;
    if rest >= 20 {
        let (tens, ones) = (TENS[(rest / 10) as usize], ONES[(rest % 10) as usize]);
        parts.push(if ones.is_empty() { tens.to_string() } else { format!("{tens}-{ones}") });
    } else if rest > 0 {
        parts.push(ONES[rest as usize].to_string());
    }
    parts.join(" ")
}

/// Read a whole number in words ("one thousand two hundred fifty").
pub fn integer_to_words(n: u64) -> String {
    if n == 0 {
        return "zero".to_string();
    }
    let mut groups = Vec::new();
    let mut remaining = n;
    for scale in SCALES {
        let group = remaining % 1000;
        if group > 0 {
            let words = below_thousand(group);
            groups.push(if scale.is_empty() { words } else { format!("{words} {scale}") });
        }
        remaining /= 1000;
        if remaining == 0 {
            break;
        }
    }
    groups.reverse();
    groups.join(" ")
}

/// Read a decimal string: integer part as a number, fraction digit by digit.
pub fn decimal_to_words(integer: &str, fraction: Option<&str>, negative: bool) -> String {
    let digits: String = integer.chars().filter(char::is_ascii_digit).collect();
    let mut words = match digits.parse::<u64>() {
        Ok(n) => integer_to_words(n),
        // Too large for u64: read every digit.
        Err(_) => spell_digits(&digits),
    };
    if let Some(frac) = fraction {
        words = format!("{words} point {}", spell_digits(frac));
    }
    if negative {
        format!("minus {words}")
    } else {
        words
    }
}

fn spell_digits(s: &str) -> String {
    s.chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| DIGITS[d as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrites every number in the text as English words.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpokenNumbers;

impl TextPreprocess for SpokenNumbers {
    fn preprocess(&self, text: &str) -> String {
        RE_NUMBER
            .replace_all(text, |caps: &Captures| {
                let words = decimal_to_words(
                    &caps[3],
                    caps.get(4).map(|m| m.as_str()),
                    !caps[2].is_empty(),
                );
                format!("{}{}", &caps[1], words)
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_to_words() {
        assert_eq!(integer_to_words(0), "zero");
        assert_eq!(integer_to_words(7), "seven");
        assert_eq!(integer_to_words(42), "forty-two");
        assert_eq!(integer_to_words(100), "one hundred");
        assert_eq!(integer_to_words(1_250), "one thousand two hundred fifty");
        assert_eq!(integer_to_words(3_000_001), "three million one");
    }

    #[test]
    fn test_decimal_to_words() {
        assert_eq!(decimal_to_words("3", Some("14"), false), "three point one four");
        assert_eq!(decimal_to_words("7", None, true), "minus seven");
        assert_eq!(decimal_to_words("1,000", None, false), "one thousand");
    }

    #[test]
    fn test_spoken_numbers_in_text() {
        let p = SpokenNumbers;
        assert_eq!(p.preprocess("I have 2 cats."), "I have two cats.");
        assert_eq!(p.preprocess("It costs 1,250 and -3.5 more"), "It costs one thousand two hundred fifty and minus three point five more");
        assert_eq!(p.preprocess("12 apples"), "twelve apples");
    }

    #[test]
    fn test_spoken_numbers_leaves_words_alone() {
        let p = SpokenNumbers;
        assert_eq!(p.preprocess("mp3 and A4"), "mp3 and A4");
        assert_eq!(p.preprocess("no digits"), "no digits");
    }
}

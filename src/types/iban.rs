//! IBAN structural validation and mod-97 checksum
//!
//! Classification only: a malformed IBAN is flagged, not rejected, since
//! account numbers frequently arrive mangled from free-text extraction.

use super::{InvalidReason, TypeContract, Validity};

/// Registered IBAN lengths per country code. Countries not listed here
/// fall back to the generic 15 to 34 character bound.
const IBAN_LENGTHS: &[(&str, usize)] = &[
    ("AD", 24), ("AE", 23), ("AL", 28), ("AT", 20), ("AZ", 28), ("BA", 20),
    ("BE", 16), ("BG", 22), ("BH", 22), ("BI", 27), ("BR", 29), ("BY", 28),
    ("CH", 21), ("CR", 22), ("CY", 28), ("CZ", 24), ("DE", 22), ("DJ", 27),
    ("DK", 18), ("DO", 28), ("EE", 20), ("EG", 29), ("ES", 24), ("FI", 18),
    ("FO", 18), ("FR", 27), ("GB", 22), ("GE", 22), ("GI", 23), ("GL", 18),
    ("GR", 27), ("GT", 28), ("HR", 21), ("HU", 28), ("IE", 22), ("IL", 23),
    ("IQ", 23), ("IS", 26), ("IT", 27), ("JO", 30), ("KW", 30), ("KZ", 20),
    ("LB", 28), ("LC", 32), ("LI", 21), ("LT", 20), ("LU", 20), ("LV", 21),
    ("LY", 25), ("MC", 27), ("MD", 24), ("ME", 22), ("MK", 19), ("MN", 20),
    ("MR", 27), ("MT", 31), ("MU", 30), ("NI", 28), ("NL", 18), ("NO", 15),
    ("OM", 23), ("PK", 24), ("PL", 28), ("PS", 29), ("PT", 25), ("QA", 29),
    ("RO", 24), ("RS", 22), ("RU", 33), ("SA", 24), ("SC", 31), ("SD", 18),
    ("SE", 24), ("SI", 19), ("SK", 24), ("SM", 27), ("SO", 23), ("ST", 25),
    ("SV", 28), ("TL", 23), ("TN", 24), ("TR", 26), ("UA", 29), ("VA", 22),
    ("VG", 24), ("XK", 20),
];

pub(super) struct IbanType;

impl TypeContract for IbanType {
    fn validate(&self, raw: &str) -> Validity {
        check(&compact(raw))
    }

    fn normalize(&self, raw: &str) -> String {
        compact(raw)
    }
}

/// Strip whitespace and uppercase, the canonical electronic format.
fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn check(iban: &str) -> Validity {
    if !iban.is_ascii() || iban.len() < 5 || iban.len() > 34 {
        return Validity::Invalid(InvalidReason::BadFormat);
    }
    let country = &iban[..2];
    if !country.chars().all(|c| c.is_ascii_uppercase()) {
        return Validity::Invalid(InvalidReason::BadFormat);
    }
    if !iban[2..4].chars().all(|c| c.is_ascii_digit()) {
        return Validity::Invalid(InvalidReason::BadFormat);
    }
    if !iban[4..]
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    {
        return Validity::Invalid(InvalidReason::BadFormat);
    }
    match expected_length(country) {
        Some(expected) if iban.len() != expected => {
            return Validity::Invalid(InvalidReason::BadFormat)
        }
        None if iban.len() < 15 => return Validity::Invalid(InvalidReason::BadFormat),
        _ => {}
    }
    if mod97(iban) == 1 {
        Validity::Valid
    } else {
        Validity::Invalid(InvalidReason::BadChecksum)
    }
}

fn expected_length(country: &str) -> Option<usize> {
    IBAN_LENGTHS
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, length)| *length)
}

/// Mod-97 over the rearranged IBAN with letters mapped to 10..35.
fn mod97(iban: &str) -> u32 {
    let rearranged = iban[4..].chars().chain(iban[..4].chars());
    let mut remainder: u32 = 0;
    for c in rearranged {
        if c.is_ascii_digit() {
            remainder = (remainder * 10 + (c as u32 - '0' as u32)) % 97;
        } else {
            remainder = (remainder * 100 + (c as u32 - 'A' as u32 + 10)) % 97;
        }
    }
    remainder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ibans() {
        assert!(IbanType.validate("DE44500105175407324931").is_valid());
        assert!(IbanType.validate("GB82WEST12345698765432").is_valid());
    }

    #[test]
    fn test_spaces_and_case_are_normalized() {
        assert!(IbanType.validate("de44 5001 0517 5407 3249 31").is_valid());
        assert_eq!(
            IbanType.normalize("de44 5001 0517 5407 3249 31"),
            "DE44500105175407324931"
        );
    }

    #[test]
    fn test_wrong_length_is_bad_format() {
        assert_eq!(
            IbanType.validate("DE00123"),
            Validity::Invalid(InvalidReason::BadFormat)
        );
    }

    #[test]
    fn test_corrupted_digit_is_bad_checksum() {
        assert_eq!(
            IbanType.validate("DE44500105175407324932"),
            Validity::Invalid(InvalidReason::BadChecksum)
        );
    }

    #[test]
    fn test_garbage_is_bad_format() {
        assert_eq!(
            IbanType.validate("not an iban at all"),
            Validity::Invalid(InvalidReason::BadFormat)
        );
        assert_eq!(
            IbanType.validate(""),
            Validity::Invalid(InvalidReason::BadFormat)
        );
    }
}

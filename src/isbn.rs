//! ISBN normalisation and copy barcode generation
//!
//! Books are stored with their ISBN-13 (EAN-13) form. Each physical copy gets
//! a barcode derived from that EAN plus a per-book sequence number.

/// Strip separators and upper-case a trailing `x` check digit
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn digits(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

fn isbn10_check_digit(first_nine: &[u32]) -> char {
    let sum: u32 = first_nine
        .iter()
        .enumerate()
        .map(|(i, d)| d * (10 - i as u32))
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

fn ean13_check_digit(first_twelve: &[u32]) -> u32 {
    let sum: u32 = first_twelve
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}

/// Check an ISBN-10 (already normalised)
pub fn is_valid_isbn10(isbn: &str) -> bool {
    if isbn.len() != 10 {
        return false;
    }
    let (body, check) = isbn.split_at(9);
    match digits(body) {
        Some(d) => check.chars().next() == Some(isbn10_check_digit(&d)),
        None => false,
    }
}

/// Check an ISBN-13 / EAN-13 (already normalised)
pub fn is_valid_isbn13(isbn: &str) -> bool {
    if isbn.len() != 13 {
        return false;
    }
    match digits(isbn) {
        Some(d) => ean13_check_digit(&d[..12]) == d[12],
        None => false,
    }
}

/// Convert any valid ISBN (10 or 13, with or without separators) to ISBN-13.
/// Returns `None` when the input is not a valid ISBN.
pub fn to_isbn13(isbn: &str) -> Option<String> {
    let isbn = normalize_isbn(isbn);
    match isbn.len() {
        13 if is_valid_isbn13(&isbn) => Some(isbn),
        10 if is_valid_isbn10(&isbn) => {
            let mut d = digits(&format!("978{}", &isbn[..9]))?;
            d.push(ean13_check_digit(&d));
            Some(d.iter().map(|n| char::from_digit(*n, 10).unwrap_or('0')).collect())
        }
        _ => None,
    }
}

/// Key to match against stored ISBNs: the ISBN-13 form when the input is a
/// valid ISBN, the bare normalised text otherwise
pub fn search_key(isbn: &str) -> String {
    to_isbn13(isbn).unwrap_or_else(|| normalize_isbn(isbn))
}

/// Barcode for the `sequence`-th copy of a book.
///
/// Uses the EAN-13 when the book has an ISBN, otherwise a `B`-prefixed book id.
pub fn copy_barcode(isbn13: Option<&str>, book_id: i32, sequence: i64) -> String {
    match isbn13 {
        Some(ean) if !ean.is_empty() => format!("{}-{:03}", ean, sequence),
        _ => format!("B{:07}-{:03}", book_id, sequence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(normalize_isbn("978-2-07-040850-4"), "9782070408504");
        assert_eq!(normalize_isbn("0-8044-2957-x"), "080442957X");
    }

    #[test]
    fn test_isbn10_validation() {
        assert!(is_valid_isbn10("2070408507"));
        assert!(is_valid_isbn10("080442957X"));
        assert!(!is_valid_isbn10("2070408508"));
        assert!(!is_valid_isbn10("20704085"));
    }

    #[test]
    fn test_isbn13_validation() {
        assert!(is_valid_isbn13("9782070408504"));
        assert!(!is_valid_isbn13("9782070408505"));
        assert!(!is_valid_isbn13("97820704085X4"));
    }

    #[test]
    fn test_to_isbn13() {
        assert_eq!(to_isbn13("2-07-040850-7").as_deref(), Some("9782070408504"));
        assert_eq!(to_isbn13("978-0-8044-2957-3").as_deref(), Some("9780804429573"));
        assert_eq!(to_isbn13("080442957X").as_deref(), Some("9780804429573"));
        assert_eq!(to_isbn13("not an isbn"), None);
    }

    #[test]
    fn test_search_key_matches_stored_form() {
        assert_eq!(search_key("2-07-040850-7"), "9782070408504");
        assert_eq!(search_key("978-2-07-040850-4"), "9782070408504");
        assert_eq!(search_key("12-34"), "1234");
    }

    #[test]
    fn test_copy_barcode() {
        assert_eq!(copy_barcode(Some("9782070408504"), 12, 3), "9782070408504-003");
        assert_eq!(copy_barcode(None, 12, 1), "B0000012-001");
        assert_eq!(copy_barcode(Some(""), 5, 10), "B0000005-010");
    }
}

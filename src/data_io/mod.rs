pub mod reader;
pub mod writer;

pub use reader::*;
pub use writer::*;

use crate::error::EftsError;

/// Decode one fixed width byte row into a trimmed string.
///
/// Station names are stored as fixed width character rows padded with
/// NUL bytes or spaces.
pub fn byte_row_to_string(bytes: &[u8]) -> Result<String, EftsError> {
    let end = bytes
        .iter()
        .position(|b| *b == 0)
        .unwrap_or(bytes.len());
    let s = std::str::from_utf8(&bytes[..end])
        .map_err(|e| EftsError::Conversion(format!("station name is not valid UTF-8: {}", e)))?;
    Ok(s.trim_end().to_string())
}

/// Decode a `[station, str_len]` byte matrix into one string per station.
pub fn byte_rows_to_strings(
    bytes: &[u8],
    n_rows: usize,
    row_len: usize,
) -> Result<Vec<String>, EftsError> {
    if bytes.len() != n_rows * row_len {
        return Err(EftsError::Conversion(format!(
            "expected {} station name bytes, got {}",
            n_rows * row_len,
            bytes.len()
        )));
    }
    bytes.chunks(row_len).map(byte_row_to_string).collect()
}

/// Encode strings as a `[station, str_len]` byte matrix, NUL padded.
/// Names longer than `row_len` bytes are cut at the row width.
pub fn strings_to_byte_rows(names: &[String], row_len: usize) -> Vec<u8> {
    let mut out = vec![0_u8; names.len() * row_len];
    for (i, name) in names.iter().enumerate() {
        let mut n = name.len().min(row_len);
        // Never split a multi-byte character at the row boundary.
        while !name.is_char_boundary(n) {
            n -= 1;
        }
        out[i * row_len..i * row_len + n].copy_from_slice(&name.as_bytes()[..n]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_rows_round_trip() {
        let names = vec!["upper_a".to_string(), "b".to_string()];
        let bytes = strings_to_byte_rows(&names, 10);
        assert_eq!(bytes.len(), 20);
        let back = byte_rows_to_strings(&bytes, 2, 10).unwrap();
        assert_eq!(back, names);
    }

    #[test]
    fn long_names_are_cut_at_row_width() {
        let names = vec!["abcdefghijk".to_string()];
        let bytes = strings_to_byte_rows(&names, 5);
        let back = byte_rows_to_strings(&bytes, 1, 5).unwrap();
        assert_eq!(back[0], "abcde");
    }

    #[test]
    fn wrong_byte_count_is_an_error() {
        assert!(byte_rows_to_strings(&[0_u8; 7], 2, 4).is_err());
    }

    #[test]
    fn trailing_spaces_are_trimmed() {
        let bytes = b"name      ";
        assert_eq!(byte_row_to_string(bytes).unwrap(), "name");
    }
}

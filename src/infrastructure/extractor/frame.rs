//! Frame transport decoding

use base64::Engine;

use crate::domain::DomainError;

/// Decode a base64 frame, stripping an optional `data:<mime>;base64,` prefix
pub fn decode_frame(encoded: &str) -> Result<Vec<u8>, DomainError> {
    let encoded = encoded.trim();
    let payload = if encoded.starts_with("data:") {
        encoded
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| DomainError::validation("Failed to decode frame: malformed data URL"))?
    } else {
        encoded
    };

    if payload.is_empty() {
        return Err(DomainError::validation("Failed to decode frame: empty payload"));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| DomainError::validation(format!("Failed to decode frame: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_base64() {
        assert_eq!(decode_frame("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_strips_data_url_prefix() {
        let decoded = decode_frame("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_frame("not base64!!"),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(decode_frame("").is_err());
        assert!(decode_frame("data:image/png;base64,").is_err());
    }
}

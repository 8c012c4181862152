//! Frame codec: `CODE {compact-json-object}`.
//!
//! The transport delivers one frame per call; this module only cares about
//! the code/payload split. A malformed payload is reported as an error value
//! so the session can drop the frame and keep the connection alive.

use thiserror::Error;

use crate::fields::FieldMap;

/// Length of a command code in bytes.
pub const CODE_LEN: usize = 3;

/// Failure to split or parse an inbound frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame shorter than a bare command code.
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// First three bytes are not ASCII uppercase letters.
    #[error("invalid command code '{0}'")]
    BadCode(String),

    /// Payload is not valid JSON.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Payload parsed, but is not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Encode a command and payload into a wire frame.
///
/// An empty field map produces a bare `CODE` frame; otherwise the payload is
/// a compact JSON object with fields in insertion order.
pub fn encode(code: &str, fields: &FieldMap) -> String {
    if fields.is_empty() {
        code.to_string()
    } else {
        format!("{} {}", code, fields.to_json())
    }
}

/// Decode a wire frame into `(code, payload)`.
///
/// The first three bytes are the command code. If the frame is longer than
/// four bytes, everything from offset 4 onward is parsed as a JSON object.
pub fn decode(frame: &str) -> Result<(String, FieldMap), CodecError> {
    let bytes = frame.as_bytes();
    if bytes.len() < CODE_LEN {
        return Err(CodecError::TooShort(bytes.len()));
    }
    // Byte-level check before any slicing: a multi-byte character straddling
    // the code or separator must come back as an error, not a panic.
    if !bytes[..CODE_LEN].iter().all(u8::is_ascii_uppercase) {
        return Err(CodecError::BadCode(frame.chars().take(CODE_LEN).collect()));
    }
    let code = &frame[..CODE_LEN];
    let fields = if bytes.len() > CODE_LEN + 1 {
        if !frame.is_char_boundary(CODE_LEN + 1) {
            return Err(CodecError::BadCode(code.to_string()));
        }
        let payload: serde_json::Value = serde_json::from_str(&frame[CODE_LEN + 1..])?;
        match payload {
            serde_json::Value::Object(map) => FieldMap::from_object(map),
            _ => return Err(CodecError::NotAnObject),
        }
    } else {
        FieldMap::new()
    };
    Ok((code.to_string(), fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bare_code() {
        let (code, fields) = decode("PIN").expect("decode");
        assert_eq!(code, "PIN");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_decode_with_payload() {
        let (code, fields) =
            decode(r#"MSG {"channel":"Frontpage","character":"Bob","message":"hi"}"#)
                .expect("decode");
        assert_eq!(code, "MSG");
        assert_eq!(fields.string("channel"), Ok("Frontpage"));
        assert_eq!(fields.string("message"), Ok("hi"));
    }

    #[test]
    fn test_decode_rejects_short_frame() {
        assert!(matches!(decode("PI"), Err(CodecError::TooShort(2))));
    }

    #[test]
    fn test_decode_rejects_lowercase_code() {
        assert!(matches!(decode("pin"), Err(CodecError::BadCode(_))));
    }

    #[test]
    fn test_decode_rejects_multibyte_character_in_code() {
        assert!(matches!(decode("PI\u{d1}"), Err(CodecError::BadCode(_))));
        assert!(matches!(decode("\u{30c6}ST {}"), Err(CodecError::BadCode(_))));
    }

    #[test]
    fn test_decode_rejects_multibyte_separator() {
        assert!(matches!(decode("MSG\u{e9}x"), Err(CodecError::BadCode(_))));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(
            decode(r#"MSG {"channel":"#),
            Err(CodecError::Payload(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_object_payload() {
        assert!(matches!(
            decode(r#"MSG ["not","an","object"]"#),
            Err(CodecError::NotAnObject)
        ));
    }

    #[test]
    fn test_encode_empty_fields_is_bare_code() {
        assert_eq!(encode("UPT", &FieldMap::new()), "UPT");
    }

    #[test]
    fn test_encode_preserves_insertion_order() {
        let fields = FieldMap::new()
            .with("channel", "Frontpage")
            .with("message", "hello");
        assert_eq!(
            encode("MSG", &fields),
            r#"MSG {"channel":"Frontpage","message":"hello"}"#
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let fields = FieldMap::new().with("character", "Alice").with("time", 5);
        let frame = encode("CTU", &fields);
        let (code, decoded) = decode(&frame).expect("decode");
        assert_eq!(code, "CTU");
        assert_eq!(decoded.string("character"), Ok("Alice"));
        assert_eq!(decoded.int("time"), Ok(5));
    }
}

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::from_value;

// Standard alphabet that tolerates both padded and unpadded input. Facebook omits padding, but
// some intermediaries re-pad the value before it reaches us.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes base64url text by mapping `-`/`_` onto `+`/`/` and applying standard base64 decoding.
pub(crate) fn base64_url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let translated = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect::<String>();
    STANDARD_LENIENT.decode(translated)
}

pub(crate) fn base64_url_encode<T>(input: T) -> String
where
    T: AsRef<[u8]>,
{
    BASE64_URL_SAFE_NO_PAD.encode(input)
}

// Attempt to deserialize the value; if the value is null or an error occurs, return None.
// Signed request payloads and Graph API objects both carry loosely typed optional fields, and a
// single unexpected field type should not prevent the remaining fields from being read.
pub(crate) fn deserialize_option_or_none<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match from_value::<Option<T>>(value) {
        Ok(val) => Ok(val),
        Err(_) => Ok(None),
    }
}

/// Converts a Facebook timestamp (seconds since the unix epoch) into a UTC instant.
pub(crate) fn seconds_to_utc(seconds: &serde_json::Number) -> Option<DateTime<Utc>> {
    if let Some(secs) = seconds.as_i64() {
        Utc.timestamp_opt(secs, 0).single()
    } else {
        let secs_f64 = seconds.as_f64()?;
        let secs = secs_f64.floor();
        Utc.timestamp_opt(
            secs as i64,
            ((secs_f64 - secs) * 1_000_000_000.).floor() as u32,
        )
        .single()
    }
}

//! Serialization utilities for common data types

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Custom serialization module for Duration as microseconds
///
/// Transmission windows are short, so microseconds keep config values
/// readable without losing the precision a guard interval needs.
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use airtime_queue::utils::duration_micros;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_micros")]
///     guard: Duration,
/// }
/// ```
pub mod duration_micros {
    use super::*;

    /// Serde serialization result type
    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as microseconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
    }

    /// Deserialize microseconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u64::deserialize(deserializer)?;
        Ok(Duration::from_micros(micros))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for serialization utilities

    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestStruct {
        #[serde(with = "duration_micros")]
        guard: Duration,
        name: String,
    }

    /// Tests that Duration serializes to microseconds as u64
    #[test]
    fn test_duration_micros_serialize() {
        let data = TestStruct { guard: Duration::from_micros(1500), name: "test".to_string() };

        let json = serde_json::to_string(&data).expect("Should serialize valid struct");
        assert_eq!(json, r#"{"guard":1500,"name":"test"}"#);
    }

    /// Tests that microseconds deserialize to Duration
    #[test]
    fn test_duration_micros_deserialize() {
        let data: TestStruct =
            serde_json::from_str(r#"{"guard":250,"name":"x"}"#).expect("Should deserialize");
        assert_eq!(data.guard, Duration::from_micros(250));
    }

    /// Tests that a zero guard stays zero
    #[test]
    fn test_duration_micros_zero() {
        let data = TestStruct { guard: Duration::ZERO, name: String::new() };
        let json = serde_json::to_string(&data).expect("Should serialize");
        let back: TestStruct = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(back, data);
    }
}

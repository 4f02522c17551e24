//! Size Estimation
//!
//! Converts values into the byte counts used for capacity accounting.
//! Estimates only need to be consistent with themselves, not exact.

use serde::Serialize;

/// Estimates the resident size of a value in bytes.
pub trait SizeEstimator<V>: Send + Sync {
    fn estimate(&self, value: &V) -> u64;
}

impl<V, F> SizeEstimator<V> for F
where
    F: Fn(&V) -> u64 + Send + Sync,
{
    fn estimate(&self, value: &V) -> u64 {
        self(value)
    }
}

// == JSON Size Estimator ==
/// Sizes a value by the length of its JSON encoding.
///
/// Values that cannot be encoded fall back to their in-memory size.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSizeEstimator;

impl<V: Serialize> SizeEstimator<V> for JsonSizeEstimator {
    fn estimate(&self, value: &V) -> u64 {
        match serde_json::to_vec(value) {
            Ok(bytes) => bytes.len() as u64,
            Err(_) => std::mem::size_of::<V>() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_json_estimate_string() {
        // Quotes are counted
        assert_eq!(JsonSizeEstimator.estimate(&"abc".to_string()), 5);
    }

    #[test]
    fn test_json_estimate_object() {
        let value = serde_json::json!({"name": "ada", "age": 36});
        let expected = serde_json::to_vec(&value).unwrap().len() as u64;
        assert_eq!(JsonSizeEstimator.estimate(&value), expected);
    }

    #[test]
    fn test_json_estimate_unencodable_falls_back() {
        let mut map: HashMap<(u8, u8), u8> = HashMap::new();
        map.insert((1, 2), 3);
        assert_eq!(
            JsonSizeEstimator.estimate(&map),
            std::mem::size_of::<HashMap<(u8, u8), u8>>() as u64
        );
    }

    #[test]
    fn test_closure_estimator() {
        let estimator = |v: &Vec<u8>| v.len() as u64 * 2;
        assert_eq!(estimator.estimate(&vec![0u8; 10]), 20);
    }
}

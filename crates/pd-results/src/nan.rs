//! `NaN` ⇄ `null` for series whose absent samples are `NaN`.
//!
//! JSON has no NaN; serde_json writes non-finite floats as `null` but will
//! not read them back into `f64`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn to_option(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

pub mod series {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[f64], s: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|v| to_option(*v))
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(d)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

pub mod rows {
    use super::*;

    pub fn serialize<S: Serializer>(rows: &[Vec<f64>], s: S) -> Result<S::Ok, S::Error> {
        rows.iter()
            .map(|row| row.iter().map(|v| to_option(*v)).collect::<Vec<_>>())
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<f64>>, D::Error> {
        let raw: Vec<Vec<Option<f64>>> = Vec::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Wrapped(#[serde(with = "super::series")] Vec<f64>);

    proptest! {
        #[test]
        fn absent_positions_are_preserved(
            values in proptest::collection::vec(prop_oneof![Just(f64::NAN), -1e6f64..1e6], 0..40)
        ) {
            let json = serde_json::to_string(&Wrapped(values.clone())).unwrap();
            let Wrapped(back) = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back.len(), values.len());
            for (a, b) in values.iter().zip(&back) {
                prop_assert_eq!(a.is_nan(), b.is_nan());
                if !a.is_nan() {
                    prop_assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
                }
            }
        }
    }
}

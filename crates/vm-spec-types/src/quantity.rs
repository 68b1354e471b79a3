// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resource quantities that appear in VM specs.
//!
//! Both types here accept the notations users write in their documents
//! (`"250m"` or `0.25` for CPUs, `"1Gi"` for memory) and compare by the amount
//! they denote, not by how that amount was spelled.

use std::fmt::Display;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MILLIS_PER_CPU: u32 = 1000;

/// Errors produced while parsing a quantity from its textual form.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity {0:?} has no leading digits")]
    MissingDigits(String),

    #[error("quantity {input:?} has unknown suffix {suffix:?}")]
    UnknownSuffix { input: String, suffix: String },

    #[error("quantity {0:?} has more precision than is representable")]
    TooPrecise(String),

    #[error("quantity {0:?} is out of range")]
    OutOfRange(String),
}

/// An amount of CPU, in thousandths of a core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MilliCpu(u32);

impl MilliCpu {
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    pub const fn from_cpus(cpus: u32) -> Self {
        Self(cpus * MILLIS_PER_CPU)
    }

    #[inline]
    pub fn millis(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_whole(&self) -> bool {
        self.0 % MILLIS_PER_CPU == 0
    }

    fn from_f64(cpus: f64) -> Result<Self, QuantityError> {
        let scaled = cpus * f64::from(MILLIS_PER_CPU);
        let millis = scaled.round();
        if !millis.is_finite() || millis < 0.0 || millis > f64::from(u32::MAX)
        {
            return Err(QuantityError::OutOfRange(cpus.to_string()));
        }

        // Anything finer than a millicpu can't be represented. The tolerance
        // absorbs binary rounding in values like 0.001.
        if (scaled - millis).abs() > 1e-6 {
            return Err(QuantityError::TooPrecise(cpus.to_string()));
        }

        Ok(Self(millis as u32))
    }
}

impl FromStr for MilliCpu {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let out_of_range = || QuantityError::OutOfRange(s.to_string());

        if let Some(millis) = s.strip_suffix('m') {
            return parse_digits(millis, s)?
                .try_into()
                .map(Self)
                .map_err(|_| out_of_range());
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (s, None),
        };

        let whole = parse_digits(whole, s)?;
        let frac = match frac {
            None => 0,
            // Anything finer than a millicpu can't be represented.
            Some(frac) if frac.len() > 3 => {
                return Err(QuantityError::TooPrecise(s.to_string()));
            }
            Some(frac) => {
                parse_digits(frac, s)? * 10u64.pow(3 - frac.len() as u32)
            }
        };

        whole
            .checked_mul(u64::from(MILLIS_PER_CPU))
            .and_then(|millis| millis.checked_add(frac))
            .and_then(|millis| u32::try_from(millis).ok())
            .map(Self)
            .ok_or_else(out_of_range)
    }
}

impl Display for MilliCpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / MILLIS_PER_CPU;
        let frac = self.0 % MILLIS_PER_CPU;
        if frac == 0 {
            return write!(f, "{}", whole);
        }

        let frac = format!("{:03}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl Serialize for MilliCpu {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_whole() {
            serializer.serialize_u64(u64::from(self.0 / MILLIS_PER_CPU))
        } else {
            serializer.serialize_str(&self.to_string())
        }
    }
}

impl<'d> Deserialize<'d> for MilliCpu {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        struct MilliCpuVisitor;

        impl de::Visitor<'_> for MilliCpuVisitor {
            type Value = MilliCpu;

            fn expecting(
                &self,
                f: &mut std::fmt::Formatter<'_>,
            ) -> std::fmt::Result {
                f.write_str("a CPU amount such as 2, 0.5, \"0.5\" or \"500m\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MilliCpu, E> {
                v.checked_mul(u64::from(MILLIS_PER_CPU))
                    .and_then(|millis| u32::try_from(millis).ok())
                    .map(MilliCpu)
                    .ok_or_else(|| E::custom(format!("{} CPUs is too many", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MilliCpu, E> {
                let v = u64::try_from(v).map_err(|_| {
                    E::custom(format!("CPU amount {} is negative", v))
                })?;
                self.visit_u64(v)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MilliCpu, E> {
                MilliCpu::from_f64(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MilliCpu, E> {
                MilliCpu::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MilliCpuVisitor)
    }
}

impl JsonSchema for MilliCpu {
    fn schema_name() -> String {
        "MilliCpu".to_owned()
    }

    fn json_schema(
        _generator: &mut schemars::gen::SchemaGenerator,
    ) -> schemars::schema::Schema {
        number_or_string_schema(
            "An amount of CPU: a number of cores, or a string such as \
             \"0.25\" or \"250m\".",
        )
    }
}

// Binary suffixes come first so that Display prefers them when a value is
// evenly divisible by both kinds.
const BYTE_SUFFIXES: &[(&str, u64)] = &[
    ("Ei", 1 << 60),
    ("Pi", 1 << 50),
    ("Ti", 1 << 40),
    ("Gi", 1 << 30),
    ("Mi", 1 << 20),
    ("Ki", 1 << 10),
    ("E", 1_000_000_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("T", 1_000_000_000_000),
    ("G", 1_000_000_000),
    ("M", 1_000_000),
    ("k", 1_000),
];

/// A number of bytes, written in Kubernetes quantity notation (e.g. `"1Gi"`,
/// `"500M"`, or a bare integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteQuantity(u64);

impl ByteQuantity {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn from_mib(mib: u64) -> Self {
        Self(mib << 20)
    }

    pub const fn from_gib(gib: u64) -> Self {
        Self(gib << 30)
    }

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl FromStr for ByteQuantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, suffix) = s.split_at(split);
        let value = parse_digits(digits, s)?;

        if suffix.is_empty() {
            return Ok(Self(value));
        }

        if suffix.starts_with('.') {
            return Err(QuantityError::TooPrecise(s.to_string()));
        }

        let (_, multiplier) = BYTE_SUFFIXES
            .iter()
            .find(|(name, _)| *name == suffix)
            .ok_or_else(|| QuantityError::UnknownSuffix {
                input: s.to_string(),
                suffix: suffix.to_string(),
            })?;

        value
            .checked_mul(*multiplier)
            .map(Self)
            .ok_or_else(|| QuantityError::OutOfRange(s.to_string()))
    }
}

impl Display for ByteQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == 0 {
            return f.write_str("0");
        }

        match BYTE_SUFFIXES.iter().find(|(_, mult)| self.0 % mult == 0) {
            Some((suffix, mult)) => write!(f, "{}{}", self.0 / mult, suffix),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for ByteQuantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(format!("{}", self).as_str())
    }
}

impl<'d> Deserialize<'d> for ByteQuantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        struct ByteQuantityVisitor;

        impl de::Visitor<'_> for ByteQuantityVisitor {
            type Value = ByteQuantity;

            fn expecting(
                &self,
                f: &mut std::fmt::Formatter<'_>,
            ) -> std::fmt::Result {
                f.write_str("a byte quantity such as 1073741824 or \"1Gi\"")
            }

            fn visit_u64<E: de::Error>(
                self,
                v: u64,
            ) -> Result<ByteQuantity, E> {
                Ok(ByteQuantity(v))
            }

            fn visit_i64<E: de::Error>(
                self,
                v: i64,
            ) -> Result<ByteQuantity, E> {
                u64::try_from(v).map(ByteQuantity).map_err(|_| {
                    E::custom(format!("byte quantity {} is negative", v))
                })
            }

            fn visit_str<E: de::Error>(
                self,
                v: &str,
            ) -> Result<ByteQuantity, E> {
                ByteQuantity::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(ByteQuantityVisitor)
    }
}

impl JsonSchema for ByteQuantity {
    fn schema_name() -> String {
        "ByteQuantity".to_owned()
    }

    fn json_schema(
        _generator: &mut schemars::gen::SchemaGenerator,
    ) -> schemars::schema::Schema {
        number_or_string_schema(
            "A number of bytes: an integer, or a string with a decimal \
             (k, M, G, ...) or binary (Ki, Mi, Gi, ...) suffix.",
        )
    }
}

fn parse_digits(digits: &str, input: &str) -> Result<u64, QuantityError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuantityError::MissingDigits(input.to_string()));
    }

    // Only overflow is left once every byte is known to be a digit.
    digits
        .parse()
        .map_err(|_| QuantityError::OutOfRange(input.to_string()))
}

fn number_or_string_schema(description: &str) -> schemars::schema::Schema {
    use schemars::schema::*;

    SchemaObject {
        metadata: Some(
            Metadata {
                description: Some(description.to_string()),
                ..Default::default()
            }
            .into(),
        ),
        instance_type: Some(SingleOrVec::Vec(vec![
            InstanceType::Integer,
            InstanceType::Number,
            InstanceType::String,
        ])),
        ..Default::default()
    }
    .into()
}

use std::{fmt, str::FromStr};

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::error::SamplerError;

/// Fixed point decimal weight: `mantissa / 10^scale`.
///
/// Decimal weights are compared as exact integers once every entry of a
/// sampler has been rescaled to the largest scale among them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i64,
    scale: u32,
}

impl Decimal {
    /// Largest scale whose power of ten still fits an `i64`.
    pub const MAX_SCALE: u32 = 18;

    pub fn new(mantissa: i64, scale: u32) -> Result<Self, SamplerError> {
        if scale > Self::MAX_SCALE {
            return Err(SamplerError::ScaleOutOfRange {
                scale,
                max: Self::MAX_SCALE,
            });
        }
        Ok(Self { mantissa, scale })
    }

    pub const fn mantissa(&self) -> i64 {
        self.mantissa
    }

    pub const fn scale(&self) -> u32 {
        self.scale
    }

    pub const fn is_positive(&self) -> bool {
        self.mantissa > 0
    }

    /// Integer value of this decimal expressed at `scale`, `None` if the
    /// scale is smaller than ours or the result overflows.
    pub fn rescale(&self, scale: u32) -> Option<i64> {
        let shift = scale.checked_sub(self.scale)?;
        self.mantissa.checked_mul(10i64.checked_pow(shift)?)
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let scale = self.scale.max(other.scale);
        let mantissa = self.rescale(scale)?.checked_add(other.rescale(scale)?)?;
        Some(Self { mantissa, scale })
    }
}

impl From<i64> for Decimal {
    fn from(mantissa: i64) -> Self {
        Self { mantissa, scale: 0 }
    }
}

impl TryFrom<f64> for Decimal {
    type Error = SamplerError;

    /// Goes through the shortest decimal text that round-trips to `value`,
    /// so `0.1` becomes `1 / 10^1` rather than its binary expansion.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(SamplerError::MalformedDecimal(value.to_string()));
        }
        format!("{value}").parse()
    }
}

impl FromStr for Decimal {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SamplerError::MalformedDecimal(s.to_owned());
        let text = s.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let fraction = fraction.trim_end_matches('0');
        let scale = u32::try_from(fraction.len()).map_err(|_| malformed())?;
        if scale > Self::MAX_SCALE {
            return Err(SamplerError::ScaleOutOfRange {
                scale,
                max: Self::MAX_SCALE,
            });
        }

        let mut mantissa: i64 = 0;
        for b in whole.bytes().chain(fraction.bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(b - b'0')))
                .ok_or_else(malformed)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Ok(Self { mantissa, scale })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa < 0 {
            f.write_str("-")?;
        }
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        let digits = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = digits.split_at(digits.len() - scale);
        write!(f, "{whole}.{fraction}")
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DecimalVisitor;

        impl Visitor<'_> for DecimalVisitor {
            type Value = Decimal;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal number or numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
                Ok(Decimal::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
                i64::try_from(v)
                    .map(Decimal::from)
                    .map_err(|_| E::custom(format!("{v} does not fit a decimal weight")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
                Decimal::try_from(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}

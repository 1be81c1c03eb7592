// =============================================================================
// Timeframe — candle width expressed in minutes
// =============================================================================
//
// Both market-data sources accept only a fixed set of widths.  Commands and the
// config file use the Binance-style labels ("15m", "1h", "1d", "1w").

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const MINUTE: u32 = 1;
const HOUR: u32 = 60;
const DAY: u32 = 24 * HOUR;
const WEEK: u32 = 7 * DAY;

/// Every width supported by the candle sources, in minutes.
const SUPPORTED_MINUTES: &[u32] = &[
    MINUTE,
    3,
    5,
    15,
    30,
    HOUR,
    2 * HOUR,
    4 * HOUR,
    6 * HOUR,
    8 * HOUR,
    12 * HOUR,
    DAY,
    3 * DAY,
    WEEK,
];

/// Candle width.  Construct through [`Timeframe::from_minutes`] or by parsing
/// a label so that only supported widths exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe(u32);

impl Timeframe {
    pub const ONE_HOUR: Timeframe = Timeframe(HOUR);

    pub fn from_minutes(minutes: u32) -> Result<Self> {
        if SUPPORTED_MINUTES.contains(&minutes) {
            Ok(Self(minutes))
        } else {
            bail!("unsupported timeframe: {minutes} minutes")
        }
    }

    /// Binance kline interval label ("1m", "4h", "1d", "1w").
    pub fn binance_interval(self) -> String {
        self.to_string()
    }

    /// CryptoCompare history endpoint plus aggregation factor.
    pub fn cryptocompare_endpoint(self) -> (&'static str, u32) {
        let m = self.0;
        if m >= DAY {
            ("histoday", m / DAY)
        } else if m >= HOUR {
            ("histohour", m / HOUR)
        } else {
            ("histominute", m)
        }
    }

    /// Every supported timeframe, shortest first.
    pub fn all() -> impl Iterator<Item = Timeframe> {
        SUPPORTED_MINUTES.iter().map(|&m| Timeframe(m))
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::ONE_HOUR
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        if m % WEEK == 0 {
            write!(f, "{}w", m / WEEK)
        } else if m % DAY == 0 {
            write!(f, "{}d", m / DAY)
        } else if m % HOUR == 0 {
            write!(f, "{}h", m / HOUR)
        } else {
            write!(f, "{m}m")
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_ascii_lowercase();
        if label.is_empty() {
            bail!("empty timeframe");
        }

        // Bare numbers are minutes.
        if let Ok(minutes) = label.parse::<u32>() {
            return Self::from_minutes(minutes);
        }

        let Some((split, unit)) = label.char_indices().last() else {
            bail!("empty timeframe");
        };
        let count: u32 = label[..split]
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timeframe: {s}"))?;
        let scale = match unit {
            'm' => MINUTE,
            'h' => HOUR,
            'd' => DAY,
            'w' => WEEK,
            _ => bail!("invalid timeframe unit in {s}"),
        };
        let minutes = count
            .checked_mul(scale)
            .ok_or_else(|| anyhow::anyhow!("invalid timeframe: {s}"))?;
        Self::from_minutes(minutes)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_labels() {
        assert_eq!("1h".parse::<Timeframe>().unwrap(), Timeframe(60));
        assert_eq!("15M".parse::<Timeframe>().unwrap(), Timeframe(15));
        assert_eq!("4h".parse::<Timeframe>().unwrap(), Timeframe(240));
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe(1440));
        assert_eq!("1w".parse::<Timeframe>().unwrap(), Timeframe(10080));
        assert_eq!("60".parse::<Timeframe>().unwrap(), Timeframe::ONE_HOUR);
    }

    #[test]
    fn reject_unsupported() {
        assert!("7m".parse::<Timeframe>().is_err());
        assert!("1y".parse::<Timeframe>().is_err());
        assert!("".parse::<Timeframe>().is_err());
        assert!("h".parse::<Timeframe>().is_err());
        assert!("4é".parse::<Timeframe>().is_err());
        assert!("99999999w".parse::<Timeframe>().is_err());
    }

    #[test]
    fn display_roundtrips_every_supported_width() {
        for tf in Timeframe::all() {
            let label = tf.to_string();
            assert_eq!(label.parse::<Timeframe>().unwrap(), tf, "label {label}");
        }
    }

    #[test]
    fn cryptocompare_mapping() {
        let tf: Timeframe = "4h".parse().unwrap();
        assert_eq!(tf.cryptocompare_endpoint(), ("histohour", 4));
        let tf: Timeframe = "15m".parse().unwrap();
        assert_eq!(tf.cryptocompare_endpoint(), ("histominute", 15));
        let tf: Timeframe = "1w".parse().unwrap();
        assert_eq!(tf.cryptocompare_endpoint(), ("histoday", 7));
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&Timeframe::ONE_HOUR).unwrap();
        assert_eq!(json, "\"1h\"");
        let tf: Timeframe = serde_json::from_str("\"30m\"").unwrap();
        assert_eq!(tf, Timeframe(30));
        assert!(serde_json::from_str::<Timeframe>("\"2m\"").is_err());
    }
}

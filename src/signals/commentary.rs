// =============================================================================
// Per-indicator commentary
// =============================================================================
//
// Each available indicator contributes one line.  These verdicts are for
// display only and never feed back into the aggregate direction.

use crate::indicators::bollinger::BandPosition;
use crate::indicators::rsi::{rsi_zone, RsiZone};
use crate::indicators::{IndicatorKind, IndicatorSnapshot};
use crate::runtime_config::StrategyParams;
use crate::types::Verdict;

use super::Commentary;

/// Commentary lines in `IndicatorKind::ALL` order, skipping missing indicators.
pub fn build_commentary(close: f64, snapshot: &IndicatorSnapshot, params: &StrategyParams) -> Vec<Commentary> {
    IndicatorKind::ALL
        .into_iter()
        .filter_map(|kind| {
            comment(kind, close, snapshot, params).map(|(verdict, note)| Commentary {
                indicator: kind,
                verdict,
                note,
            })
        })
        .collect()
}

fn comment(
    kind: IndicatorKind,
    close: f64,
    snap: &IndicatorSnapshot,
    params: &StrategyParams,
) -> Option<(Verdict, String)> {
    match kind {
        IndicatorKind::Ema => {
            let ema = snap.ema?;
            let (f, s) = (ema.fast_period, ema.slow_period);
            Some(if ema.fast > ema.slow {
                (Verdict::Bullish, format!("EMA{f} above EMA{s}"))
            } else if ema.fast < ema.slow {
                (Verdict::Bearish, format!("EMA{f} below EMA{s}"))
            } else {
                (Verdict::Neutral, format!("EMA{f} flat against EMA{s}"))
            })
        }
        IndicatorKind::EmaTrend => {
            let trend = snap.ema_trend?;
            let p = trend.period;
            Some(if close > trend.value {
                (Verdict::Bullish, format!("price above EMA{p}, long-term uptrend"))
            } else if close < trend.value {
                (Verdict::Bearish, format!("price below EMA{p}, long-term downtrend"))
            } else {
                (Verdict::Neutral, format!("price at EMA{p}"))
            })
        }
        IndicatorKind::Rsi => {
            let rsi = snap.rsi?;
            let v = rsi.value;
            Some(match rsi_zone(v, params.rsi_overbought, params.rsi_oversold) {
                RsiZone::Overbought => (Verdict::Bearish, format!("{v:.1} overbought")),
                RsiZone::Oversold => (Verdict::Bullish, format!("{v:.1} oversold")),
                RsiZone::Neutral if v > params.rsi_midline => {
                    (Verdict::Bullish, format!("{v:.1} above {:.0}", params.rsi_midline))
                }
                RsiZone::Neutral if v < params.rsi_midline => {
                    (Verdict::Bearish, format!("{v:.1} below {:.0}", params.rsi_midline))
                }
                RsiZone::Neutral => (Verdict::Neutral, format!("{v:.1} at midline")),
            })
        }
        IndicatorKind::Macd => {
            let m = snap.macd?;
            let h = m.histogram;
            Some(if m.macd > m.signal {
                (Verdict::Bullish, format!("line above signal, histogram {h:+.4}"))
            } else if m.macd < m.signal {
                (Verdict::Bearish, format!("line below signal, histogram {h:+.4}"))
            } else {
                (Verdict::Neutral, "line on signal".to_string())
            })
        }
        IndicatorKind::Bollinger => {
            let bb = snap.bollinger?;
            let w = bb.width;
            Some(match bb.position(close) {
                BandPosition::AboveUpper => (Verdict::Bearish, format!("price above upper band (width {w:.2}%)")),
                BandPosition::BelowLower => (Verdict::Bullish, format!("price below lower band (width {w:.2}%)")),
                BandPosition::Inside => (Verdict::Neutral, format!("price inside bands (width {w:.2}%)")),
            })
        }
        IndicatorKind::Adx => {
            let adx = snap.adx?;
            let v = adx.adx;
            Some(if v < params.adx_trend_threshold {
                (Verdict::Neutral, format!("{v:.1} weak trend"))
            } else if adx.plus_di > adx.minus_di {
                (Verdict::Bullish, format!("{v:.1} strong trend, +DI leads"))
            } else if adx.plus_di < adx.minus_di {
                (Verdict::Bearish, format!("{v:.1} strong trend, -DI leads"))
            } else {
                (Verdict::Neutral, format!("{v:.1} strong trend, no side leads"))
            })
        }
        IndicatorKind::Atr => {
            let atr = snap.atr?;
            let note = if close > 0.0 {
                format!("{atr:.4} ({:.2}% of price)", atr / close * 100.0)
            } else {
                format!("{atr:.4}")
            };
            Some((Verdict::Neutral, note))
        }
        IndicatorKind::Obv => {
            let obv = snap.obv?;
            Some(match obv.change {
                Some(c) if c > 0.0 => (Verdict::Bullish, "volume flow rising".to_string()),
                Some(c) if c < 0.0 => (Verdict::Bearish, "volume flow falling".to_string()),
                Some(_) => (Verdict::Neutral, "volume flow flat".to_string()),
                None => (Verdict::Neutral, "not enough bars for a trend".to_string()),
            })
        }
        IndicatorKind::StochRsi => {
            let s = snap.stoch_rsi?;
            let (k, d) = (s.k, s.d);
            Some(if k >= params.stoch_overbought {
                (Verdict::Bearish, format!("%K {k:.1} overbought"))
            } else if k <= params.stoch_oversold {
                (Verdict::Bullish, format!("%K {k:.1} oversold"))
            } else if k > d {
                (Verdict::Bullish, format!("%K {k:.1} above %D {d:.1}"))
            } else if k < d {
                (Verdict::Bearish, format!("%K {k:.1} below %D {d:.1}"))
            } else {
                (Verdict::Neutral, format!("%K {k:.1} on %D"))
            })
        }
        IndicatorKind::Fibonacci => {
            let fib = snap.fibonacci.as_ref()?;
            let level = |l: crate::indicators::fibonacci::FibLevel| {
                format!("{:.1}% ({:.4})", l.ratio * 100.0, l.price)
            };
            let note = match fib.bracket(close) {
                (Some(s), Some(r)) => format!("between {} and {}", level(s), level(r)),
                (Some(s), None) => format!("above range, support {}", level(s)),
                (None, Some(r)) => format!("below range, resistance {}", level(r)),
                (None, None) => match fib.nearest(close) {
                    Some(l) => format!("at {}", level(l)),
                    None => return None,
                },
            };
            Some((Verdict::Neutral, note))
        }
    }
}

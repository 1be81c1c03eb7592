// =============================================================================
// Signal Pipeline — candles -> indicator snapshot -> signal
// =============================================================================
//
// `analyze` is the pure core: same candles and config in, same `Analysis` out.
// `SignalPipeline` adds the fetch step in front of it.  Neither holds mutable
// state, so one instance is shared across every chat via `Arc`.
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::indicators::{IndicatorKind, IndicatorSnapshot};
use crate::market_data::{Candle, CandleSource, Timeframe};
use crate::runtime_config::BotConfig;
use crate::signals::{evaluate, Signal};

/// Everything computed for one (symbol, timeframe) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candle_count: usize,
    /// Open time of the newest candle (ms since epoch).
    pub last_open_time: i64,
    pub close: f64,
    pub snapshot: IndicatorSnapshot,
    pub signal: Signal,
    /// Indicators left empty for lack of history.
    pub missing: Vec<IndicatorKind>,
}

/// Run indicators and evaluator over an in-memory candle window.
pub fn analyze(
    symbol: &str,
    timeframe: Timeframe,
    candles: &[Candle],
    config: &BotConfig,
) -> Result<Analysis, PipelineError> {
    let Some(last) = candles.last() else {
        return Err(PipelineError::data_unavailable(symbol, "no candles returned"));
    };
    if candles.len() < config.min_candles {
        return Err(PipelineError::data_unavailable(
            symbol,
            format!("only {} candles, need {}", candles.len(), config.min_candles),
        ));
    }
    if let Some(pos) = candles.iter().position(|c| !c.is_finite()) {
        return Err(PipelineError::data_unavailable(
            symbol,
            format!("candle {pos} of {} has a non-finite value", candles.len()),
        ));
    }
    if last.close <= 0.0 {
        return Err(PipelineError::data_unavailable(symbol, "latest close is not a valid price"));
    }

    let params = config.indicator_params_for(timeframe);
    let snapshot = IndicatorSnapshot::compute(candles, &params);
    let signal = evaluate(last.close, &snapshot, &config.strategy);
    let missing = snapshot.missing();

    if !missing.is_empty() {
        debug!(symbol, %timeframe, candles = candles.len(), ?missing, "insufficient history for some indicators");
    }

    Ok(Analysis {
        symbol: symbol.to_string(),
        timeframe,
        candle_count: candles.len(),
        last_open_time: last.open_time,
        close: last.close,
        snapshot,
        signal,
        missing,
    })
}

/// Fetch-and-analyze entry point used by the bot and the HTTP API.
pub struct SignalPipeline {
    source: Arc<dyn CandleSource>,
    config: Arc<BotConfig>,
}

impl SignalPipeline {
    pub fn new(source: Arc<dyn CandleSource>, config: Arc<BotConfig>) -> Self {
        Self { source, config }
    }

    /// Fetch candles for `symbol` and evaluate them.  Fetch failures become
    /// `DataUnavailable`; there is no retry here.
    pub async fn run(&self, symbol: &str, timeframe: Timeframe) -> Result<Analysis, PipelineError> {
        let candles = match self.source.fetch(symbol, timeframe, self.config.candle_limit).await {
            Ok(c) => c,
            Err(e) => {
                warn!(symbol, %timeframe, source = self.source.name(), error = %e, "candle fetch failed");
                return Err(PipelineError::data_unavailable(symbol, format!("{e:#}")));
            }
        };

        let analysis = analyze(symbol, timeframe, &candles, &self.config)?;
        info!(
            symbol,
            %timeframe,
            candles = analysis.candle_count,
            direction = %analysis.signal.direction,
            close = analysis.close,
            "signal computed"
        );
        Ok(analysis)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::source::tests::StaticSource;
    use crate::types::Direction;

    fn series(closes: impl IntoIterator<Item = f64>) -> Vec<Candle> {
        closes
            .into_iter()
            .enumerate()
            .map(|(i, c)| Candle::new(i as i64 * 3_600_000, c, c + 0.5, c - 0.5, c, 100.0))
            .collect()
    }

    #[test]
    fn empty_input_is_data_unavailable() {
        let err = analyze("BTCUSDT", Timeframe::ONE_HOUR, &[], &BotConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
        assert_eq!(err.symbol(), "BTCUSDT");
    }

    #[test]
    fn below_min_candles_is_data_unavailable() {
        let config = BotConfig {
            min_candles: 50,
            ..Default::default()
        };
        let err = analyze("ETHUSDT", Timeframe::ONE_HOUR, &series((0..49).map(|i| 10.0 + i as f64)), &config)
            .unwrap_err();
        assert!(err.to_string().contains("only 49 candles"));
    }

    #[test]
    fn short_window_is_partial_not_error() {
        let analysis =
            analyze("BTCUSDT", Timeframe::ONE_HOUR, &series([10.0, 11.0, 12.0]), &BotConfig::default()).unwrap();
        assert_eq!(analysis.signal.direction, Direction::Neutral);
        assert!(analysis.missing.contains(&IndicatorKind::Rsi));
        assert!(analysis.signal.stop_loss.is_none());
    }

    #[test]
    fn gap_inside_window_is_data_unavailable() {
        // Rally, one NaN close, then a collapse: nothing from before the gap
        // may be reported as the latest reading.
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + 3.0 * i as f64).collect();
        closes.push(f64::NAN);
        closes.extend((0..19).map(|i| 250.0 - 6.0 * i as f64));
        let err = analyze("BTCUSDT", Timeframe::ONE_HOUR, &series(closes), &BotConfig::default()).unwrap_err();
        assert_eq!(err.symbol(), "BTCUSDT");
        assert!(err.to_string().contains("candle 60 of 80"));

        let mut candles = series((0..80).map(|i| 100.0 + i as f64));
        candles[10].volume = f64::INFINITY;
        assert!(analyze("BTCUSDT", Timeframe::ONE_HOUR, &candles, &BotConfig::default()).is_err());
    }

    #[test]
    fn rising_series_goes_long() {
        // Accelerating rise keeps the MACD line ahead of its signal.
        let closes = (0..120).map(|i| 100.0 + 0.02 * (i * i) as f64);
        let analysis = analyze("BTCUSDT", Timeframe::ONE_HOUR, &series(closes), &BotConfig::default()).unwrap();
        assert_eq!(analysis.signal.direction, Direction::Long);
        let sl = analysis.signal.stop_loss.unwrap();
        assert!((sl - analysis.close * 0.97).abs() < 1e-9);
    }

    #[test]
    fn falling_series_goes_short() {
        let closes = (0..120).map(|i| 500.0 - 0.02 * (i * i) as f64);
        let analysis = analyze("BTCUSDT", Timeframe::ONE_HOUR, &series(closes), &BotConfig::default()).unwrap();
        assert_eq!(analysis.signal.direction, Direction::Short);
        assert!(analysis.signal.take_profits[0] < analysis.close);
    }

    #[test]
    fn analysis_is_idempotent() {
        let candles = series((0..200).map(|i| 100.0 + (i as f64 / 7.0).sin() * 5.0));
        let config = BotConfig::default();
        let a = analyze("BTCUSDT", Timeframe::ONE_HOUR, &candles, &config).unwrap();
        let b = analyze("BTCUSDT", Timeframe::ONE_HOUR, &candles, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_vec(&a.signal).unwrap(), serde_json::to_vec(&b.signal).unwrap());
    }

    #[test]
    fn ema_override_applies_per_timeframe() {
        let mut config = BotConfig::default();
        config.ema_overrides.push(crate::runtime_config::EmaOverride {
            timeframe: Timeframe::from_minutes(240).unwrap(),
            ema_fast: 20,
            ema_slow: 50,
        });
        let candles = series((0..120).map(|i| 100.0 + i as f64));
        let h4 = analyze("BTCUSDT", Timeframe::from_minutes(240).unwrap(), &candles, &config).unwrap();
        let h1 = analyze("BTCUSDT", Timeframe::ONE_HOUR, &candles, &config).unwrap();
        assert_eq!(h4.snapshot.ema.unwrap().slow_period, 50);
        assert_eq!(h1.snapshot.ema.unwrap().slow_period, 21);
    }

    #[tokio::test]
    async fn run_maps_fetch_failure() {
        let pipeline = SignalPipeline::new(Arc::new(StaticSource::failing()), Arc::new(BotConfig::default()));
        let err = pipeline.run("DOTUSDT", Timeframe::ONE_HOUR).await.unwrap_err();
        assert_eq!(err.symbol(), "DOTUSDT");
    }

    #[tokio::test]
    async fn run_requests_configured_limit() {
        let candles = series((0..400).map(|i| 50.0 + i as f64 * 0.1));
        let config = BotConfig {
            candle_limit: 120,
            ..Default::default()
        };
        let pipeline = SignalPipeline::new(Arc::new(StaticSource::ok(candles)), Arc::new(config));
        let analysis = pipeline.run("SUIUSDT", Timeframe::ONE_HOUR).await.unwrap();
        assert_eq!(analysis.candle_count, 120);
    }
}

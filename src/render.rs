// =============================================================================
// Message Renderer — Telegram Markdown text
// =============================================================================
//
// Pure string templating over `Analysis`.  Output uses Telegram's legacy
// Markdown, so notes and labels must stay free of `_` and unpaired `*`.
// =============================================================================

use std::fmt::Write as _;

use crate::error::PipelineError;
use crate::market_data::Timeframe;
use crate::pipeline::Analysis;
use crate::runtime_config::PairAlias;
use crate::types::{Direction, Verdict};

const RULE: &str = "━━━━━━━━━━━━━━━━━━";
const DISCLAIMER: &str = "ℹ️ Heuristic signal, not financial advice.";

/// Price with precision scaled to its magnitude.
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1_000.0 {
        format!("{price:.2}")
    } else if abs >= 1.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.6}")
    }
}

fn opt_price(value: Option<f64>) -> String {
    value.map(format_price).unwrap_or_else(|| "n/a".to_string())
}

/// `/BTC /ETH /LINK ...`
pub fn shortcut_line(pairs: &[PairAlias]) -> String {
    pairs
        .iter()
        .map(|p| format!("/{}", p.alias))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn fetching(symbol: &str) -> String {
    format!("🔄 Fetching signal for *{symbol}* ...")
}

pub fn unavailable(err: &PipelineError) -> String {
    format!("⚠️ Data unavailable for {}, try again later.", err.symbol())
}

pub fn welcome(pairs: &[PairAlias]) -> String {
    let list = pairs
        .iter()
        .map(|p| format!("/{}", p.alias))
        .collect::<Vec<_>>()
        .join("\n");
    format!("👋 Welcome to Crypto Signal Bot\nUse:\n{list}\n\nSend /help for all commands.")
}

pub fn help(pairs: &[PairAlias]) -> String {
    let timeframes = Timeframe::all().map(|tf| tf.to_string()).collect::<Vec<_>>().join(" ");
    format!(
        "📖 *Commands*\n\
         {shortcuts} - signal on the default timeframe\n\
         /signal SYMBOL TF - signal for any pair, e.g. /signal SOLUSDT 4h\n\
         /auto SYMBOL TF - send this signal on a schedule\n\
         /stop - cancel scheduled signals\n\
         /pairs - list configured pairs\n\n\
         TF is optional. Timeframes: {timeframes}",
        shortcuts = shortcut_line(pairs)
    )
}

pub fn pairs(pairs: &[PairAlias]) -> String {
    let mut out = String::from("💱 *Pairs*\n");
    for p in pairs {
        let _ = writeln!(out, "/{} → {}", p.alias, p.symbol);
    }
    out
}

pub fn unknown_command(command: &str) -> String {
    format!("❓ Unknown command /{command}. Send /help for the list.")
}

pub fn usage(text: &str) -> String {
    format!("⚠️ {text}\nSend /help for usage.")
}

pub fn auto_started(symbol: &str, timeframe: &str, every_secs: u64) -> String {
    format!(
        "⏰ Auto updates on for *{symbol}* ({timeframe}), every {}.\nSend /stop to cancel.",
        human_interval(every_secs)
    )
}

pub fn auto_stopped(had_subscription: bool) -> String {
    if had_subscription {
        "🛑 Auto updates stopped.".to_string()
    } else {
        "ℹ️ No auto updates were running.".to_string()
    }
}

fn human_interval(secs: u64) -> String {
    match secs {
        s if s % 3600 == 0 && s >= 3600 => format!("{}h", s / 3600),
        s if s % 60 == 0 && s >= 60 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

fn verdict_marker(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Bullish => "🟢",
        Verdict::Bearish => "🔴",
        Verdict::Neutral => "⚪",
    }
}

/// Full signal message for one analysis.
pub fn signal_message(analysis: &Analysis, pairs: &[PairAlias]) -> String {
    let snap = &analysis.snapshot;
    let signal = &analysis.signal;
    let tf = analysis.timeframe.to_string().to_uppercase();
    let mut out = String::new();

    let _ = writeln!(out, "📊 *{} — {} Technical Signal*", analysis.symbol, tf);
    let _ = writeln!(out, "{RULE}");
    match signal.direction {
        Direction::Long => {
            let _ = writeln!(out, "✅ *LONG SIGNAL*");
            let _ = writeln!(out, "➡️ Recommended: *📈 BUY*");
        }
        Direction::Short => {
            let _ = writeln!(out, "🔻 *SHORT SIGNAL*");
            let _ = writeln!(out, "➡️ Recommended: *📉 SELL*");
        }
        Direction::Neutral => {
            let _ = writeln!(out, "⚠️ *NO CLEAR SIGNAL — WAIT*");
        }
    }
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "💰 Price: {}", format_price(analysis.close));
    match snap.ema {
        Some(e) => {
            let _ = writeln!(out, "{} EMA: {}", e.fast_period, format_price(e.fast));
            let _ = writeln!(out, "{} EMA: {}", e.slow_period, format_price(e.slow));
        }
        None => {
            let _ = writeln!(out, "EMA: n/a");
        }
    }
    if let Some(t) = snap.ema_trend {
        let _ = writeln!(out, "{} EMA: {}", t.period, format_price(t.value));
    }
    match snap.rsi {
        Some(r) => {
            let sma = r.sma.map(|s| format!(" (avg {s:.2})")).unwrap_or_default();
            let _ = writeln!(out, "RSI: {:.2}{sma}", r.value);
        }
        None => {
            let _ = writeln!(out, "RSI: n/a");
        }
    }
    match snap.macd {
        Some(m) => {
            let _ = writeln!(out, "MACD: {:.4}", m.macd);
            let _ = writeln!(out, "Signal: {:.4}", m.signal);
        }
        None => {
            let _ = writeln!(out, "MACD: n/a");
        }
    }
    match snap.obv {
        Some(o) => {
            let _ = writeln!(out, "OBV: {:.2}", o.value);
        }
        None => {
            let _ = writeln!(out, "OBV: n/a");
        }
    }
    if let Some(bb) = snap.bollinger {
        let _ = writeln!(
            out,
            "Bollinger: {} / {} / {}",
            format_price(bb.upper),
            format_price(bb.middle),
            format_price(bb.lower)
        );
    }
    if let Some(adx) = snap.adx {
        let _ = writeln!(out, "ADX: {:.2} (+DI {:.1} / -DI {:.1})", adx.adx, adx.plus_di, adx.minus_di);
    }
    if let Some(atr) = snap.atr {
        let _ = writeln!(out, "ATR: {}", format_price(atr));
    }
    if let Some(s) = snap.stoch_rsi {
        let _ = writeln!(out, "Stoch RSI: %K {:.2} / %D {:.2}", s.k, s.d);
    }

    if !signal.commentary.is_empty() {
        let _ = writeln!(out);
        for c in &signal.commentary {
            let _ = writeln!(out, "{} {}: {}", verdict_marker(c.verdict), c.indicator, c.note);
        }
    }

    let _ = writeln!(out);
    match signal.take_profits.as_slice() {
        _ if !signal.is_actionable() => {
            let _ = writeln!(out, "🎯 Take Profit: n/a");
        }
        [] => {
            let _ = writeln!(out, "🎯 Take Profit: n/a");
        }
        [tp] => {
            let _ = writeln!(out, "🎯 Take Profit: {}", format_price(*tp));
        }
        tps => {
            for (i, tp) in tps.iter().enumerate() {
                let _ = writeln!(out, "🎯 TP{}: {}", i + 1, format_price(*tp));
            }
        }
    }
    let _ = writeln!(out, "🛑 Stop Loss: {}", opt_price(signal.stop_loss));

    let _ = writeln!(out);
    let _ = writeln!(out, "⏱️ Timeframe: {tf}");
    let _ = writeln!(out, "{DISCLAIMER}");
    let _ = writeln!(out, "{RULE}");
    out.push_str(&shortcut_line(pairs));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Candle;
    use crate::pipeline::analyze;
    use crate::runtime_config::{BotConfig, StopPolicy};

    fn analysis_for(closes: impl Iterator<Item = f64>, config: &BotConfig) -> Analysis {
        let candles: Vec<Candle> = closes
            .enumerate()
            .map(|(i, c)| Candle::new(i as i64 * 3_600_000, c, c + 0.5, c - 0.5, c, 10.0))
            .collect();
        analyze("BTCUSDT", Timeframe::ONE_HOUR, &candles, config).unwrap()
    }

    #[test]
    fn price_precision() {
        assert_eq!(format_price(43_087.8654), "43087.87");
        assert_eq!(format_price(6.25), "6.2500");
        assert_eq!(format_price(0.000123), "0.000123");
    }

    #[test]
    fn long_message() {
        let config = BotConfig::default();
        let a = analysis_for((0..120).map(|i| 100.0 + 0.02 * (i * i) as f64), &config);
        let text = signal_message(&a, &config.pairs);
        assert!(text.starts_with("📊 *BTCUSDT — 1H Technical Signal*"));
        assert!(text.contains("✅ *LONG SIGNAL*"));
        assert!(text.contains("Recommended: *📈 BUY*"));
        assert!(text.contains("🎯 Take Profit:"));
        assert!(text.contains("🟢 EMA: EMA9 above EMA21"));
        assert!(text.contains(DISCLAIMER));
        assert!(text.ends_with("/BTC /ETH /LINK /DOT /SUI"));
    }

    #[test]
    fn atr_targets_are_numbered() {
        let mut config = BotConfig::default();
        config.strategy.stop_policy = StopPolicy::atr();
        let a = analysis_for((0..120).map(|i| 500.0 - 0.02 * (i * i) as f64), &config);
        let text = signal_message(&a, &config.pairs);
        assert!(text.contains("🔻 *SHORT SIGNAL*"));
        assert!(text.contains("🎯 TP1:"));
        assert!(text.contains("🎯 TP2:"));
    }

    #[test]
    fn neutral_message_has_no_levels() {
        let config = BotConfig::default();
        let a = analysis_for([10.0, 10.5, 10.2].into_iter(), &config);
        let text = signal_message(&a, &config.pairs);
        assert!(text.contains("NO CLEAR SIGNAL"));
        assert!(text.contains("🎯 Take Profit: n/a"));
        assert!(text.contains("🛑 Stop Loss: n/a"));
        assert!(text.contains("MACD: n/a"));
    }

    #[test]
    fn unavailable_text() {
        let err = PipelineError::data_unavailable("ETHUSDT", "timeout");
        assert_eq!(unavailable(&err), "⚠️ Data unavailable for ETHUSDT, try again later.");
    }

    #[test]
    fn welcome_lists_aliases() {
        let config = BotConfig::default();
        let text = welcome(&config.pairs);
        assert!(text.contains("/BTC\n/ETH"));
        let help = help(&config.pairs);
        assert!(help.contains("/signal SYMBOL TF"));
        assert!(help.contains("Timeframes: 1m 3m 5m 15m 30m 1h 2h 4h 6h 8h 12h 1d 3d 1w"));
        assert!(pairs(&config.pairs).contains("/SUI → SUIUSDT"));
    }

    #[test]
    fn intervals() {
        assert_eq!(human_interval(3600), "1h");
        assert_eq!(human_interval(900), "15m");
        assert_eq!(human_interval(45), "45s");
    }
}

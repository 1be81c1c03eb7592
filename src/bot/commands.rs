// =============================================================================
// Chat command parsing
// =============================================================================
//
// Commands are case-insensitive and may carry an `@botname` suffix, which
// Telegram adds in group chats.  A suffix naming a different bot means the
// command is not for us.
// =============================================================================

use crate::market_data::Timeframe;
use crate::runtime_config::BotConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Pairs,
    /// `/signal SYMBOL [TF]` or a configured alias such as `/BTC [TF]`.
    Signal {
        symbol: String,
        timeframe: Option<Timeframe>,
    },
    /// `/auto SYMBOL [TF]`
    Auto {
        symbol: String,
        timeframe: Option<Timeframe>,
    },
    Stop,
    /// Recognised command with bad arguments; carries the problem.
    Invalid(String),
    Unknown(String),
}

/// Parse a message text.  `None` for non-command text and for commands
/// addressed to another bot.
pub fn parse_command(text: &str, bot_username: Option<&str>, config: &BotConfig) -> Option<Command> {
    let text = text.trim();
    let body = text.strip_prefix('/')?;

    let mut parts = body.split_whitespace();
    let head = parts.next()?;
    let args: Vec<&str> = parts.collect();

    let name = match head.split_once('@') {
        Some((name, target)) => {
            if let Some(me) = bot_username {
                if !target.eq_ignore_ascii_case(me) {
                    return None;
                }
            }
            name
        }
        None => head,
    };
    if name.is_empty() {
        return None;
    }
    let lower = name.to_lowercase();

    let command = match lower.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "pairs" => Command::Pairs,
        "stop" => Command::Stop,
        "signal" => match symbol_and_timeframe(&args, config) {
            Ok((symbol, timeframe)) => Command::Signal { symbol, timeframe },
            Err(problem) => Command::Invalid(problem),
        },
        "auto" => match symbol_and_timeframe(&args, config) {
            Ok((symbol, timeframe)) => Command::Auto { symbol, timeframe },
            Err(problem) => Command::Invalid(problem),
        },
        _ => match config.pair_for_alias(name) {
            Some(pair) => match optional_timeframe(args.first().copied()) {
                Ok(timeframe) => Command::Signal {
                    symbol: pair.symbol.clone(),
                    timeframe,
                },
                Err(problem) => Command::Invalid(problem),
            },
            None => Command::Unknown(name.to_string()),
        },
    };
    Some(command)
}

fn symbol_and_timeframe(args: &[&str], config: &BotConfig) -> Result<(String, Option<Timeframe>), String> {
    let Some(raw) = args.first() else {
        return Err("Please name a pair, e.g. BTCUSDT.".to_string());
    };
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '-') {
        return Err(format!("{raw} is not a valid pair."));
    }
    let symbol = config.resolve_symbol(raw);
    let timeframe = optional_timeframe(args.get(1).copied())?;
    Ok((symbol, timeframe))
}

fn optional_timeframe(arg: Option<&str>) -> Result<Option<Timeframe>, String> {
    match arg {
        None => Ok(None),
        Some(raw) => raw
            .parse::<Timeframe>()
            .map(Some)
            .map_err(|_| format!("{raw} is not a supported timeframe.")),
    }
}

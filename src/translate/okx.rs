//! OKX translation scheme.
//!
//! Not named in the original distillation — added to prove the `Translator` abstraction
//! generalizes past Bitfinex's sign-based dispatch and Poloniex's tag-based one. OKX instead
//! tags every `books` message with an explicit `action` of `"snapshot"` or `"update"`.

use serde_json::{json, Value};

use crate::book::{Level, Side};

use super::{Instruction, OutboundFrame, TranslateError, Translator};

/// OKX confirms subscriptions but carries no channel id worth tracking; the state exists only
/// to satisfy the `Translator` contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OkxState;

#[derive(Debug, Clone, Copy, Default)]
pub struct OkxTranslator;

impl Translator for OkxTranslator {
    type State = OkxState;

    fn initial_state(&self, _base: &str, _quote: &str) -> Self::State {
        OkxState
    }

    fn subscribe_msg(&self, base: &str, quote: &str) -> Vec<OutboundFrame> {
        let inst_id = format!("{}-{}-SWAP", base.to_uppercase(), quote.to_uppercase());
        vec![json!({"op": "subscribe", "args": [{"channel": "books", "instId": inst_id}]})]
    }

    fn ping_msg(&self, _state: &Self::State) -> Vec<OutboundFrame> {
        vec![json!("ping")]
    }

    fn synchronised(&self, _state: &Self::State) -> bool {
        true
    }

    fn translate(
        &self,
        message: &Value,
        state: Self::State,
    ) -> Result<(Vec<Instruction>, Self::State), TranslateError> {
        match message {
            Value::String(s) if s == "pong" => Ok((vec![Instruction::NoOp], state)),
            Value::Object(_) if message.get("event").is_some() => Ok((vec![Instruction::NoOp], state)),
            Value::Object(_) => {
                let action = message.get("action").and_then(Value::as_str);
                let data = message.get("data").and_then(Value::as_array);
                match (action, data) {
                    (Some(action), Some(entries)) => {
                        let mut instructions = Vec::with_capacity(entries.len());
                        for entry in entries {
                            let bids = parse_levels(entry.get("bids"))?;
                            let asks = parse_levels(entry.get("asks"))?;
                            if action == "snapshot" {
                                instructions.push(Instruction::Snapshot { bids, asks });
                            } else {
                                let mut deltas = Vec::with_capacity(bids.len() + asks.len());
                                deltas.extend(bids.into_iter().map(|l| (Side::Bid, l.price, l.liquidity)));
                                deltas.extend(asks.into_iter().map(|l| (Side::Ask, l.price, l.liquidity)));
                                instructions.push(Instruction::Deltas(deltas));
                            }
                        }
                        Ok((instructions, state))
                    }
                    _ => Ok((vec![Instruction::NoOp], state)),
                }
            }
            _ => Ok((vec![Instruction::NoOp], state)),
        }
    }
}

fn parse_levels(value: Option<&Value>) -> Result<Vec<Level>, TranslateError> {
    let arr = value.and_then(Value::as_array).ok_or(TranslateError::UnrecognizedShape)?;
    arr.iter()
        .map(|level| {
            let tuple = level.as_array().ok_or(TranslateError::UnrecognizedShape)?;
            let price: f64 = tuple
                .first()
                .and_then(Value::as_str)
                .ok_or(TranslateError::UnrecognizedShape)?
                .parse()
                .map_err(|_| TranslateError::UnrecognizedShape)?;
            let size: f64 = tuple
                .get(1)
                .and_then(Value::as_str)
                .ok_or(TranslateError::UnrecognizedShape)?
                .parse()
                .map_err(|_| TranslateError::UnrecognizedShape)?;
            Ok(Level::new(price, size))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_action() {
        let t = OkxTranslator;
        let state = t.initial_state("BTC", "USDT");
        let message = json!({
            "arg": {"channel": "books", "instId": "BTC-USDT-SWAP"},
            "action": "snapshot",
            "data": [{"bids": [["30000.0", "1.0"], ["29990.0", "2.0"]], "asks": [["30010.0", "2.0"]], "ts": "1597026383085"}],
        });
        let (instr, _state) = t.translate(&message, state).unwrap();
        assert_eq!(
            instr,
            vec![Instruction::Snapshot {
                bids: vec![Level::new(30000.0, 1.0), Level::new(29990.0, 2.0)],
                asks: vec![Level::new(30010.0, 2.0)],
            }]
        );
    }

    #[test]
    fn update_action_becomes_deltas() {
        let t = OkxTranslator;
        let state = t.initial_state("BTC", "USDT");
        let message = json!({
            "arg": {"channel": "books", "instId": "BTC-USDT-SWAP"},
            "action": "update",
            "data": [{"bids": [["30000.0", "0"]], "asks": [], "ts": "1597026383100"}],
        });
        let (instr, _state) = t.translate(&message, state).unwrap();
        assert_eq!(instr, vec![Instruction::Deltas(vec![(Side::Bid, 30000.0, 0.0)])]);
    }

    #[test]
    fn event_acks_are_noop() {
        let t = OkxTranslator;
        let state = t.initial_state("BTC", "USDT");
        let (instr, _state) = t.translate(&json!({"event": "subscribe", "arg": {"channel": "books"}}), state).unwrap();
        assert_eq!(instr, vec![Instruction::NoOp]);
    }
}

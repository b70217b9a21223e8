//! Poloniex translation scheme, shared by spot and futures markets.
//!
//! The futures wire format actually differs from spot in places Poloniex doesn't document
//! consistently; this scheme assumes spot framing throughout. Treat futures support as a TODO
//! rather than a guarantee — see `DESIGN.md`.

use chrono::DateTime;
use serde_json::{json, Value};

use crate::book::{Level, Side};

use super::{Instruction, OutboundFrame, TradeEvent, TranslateError, Translator};

/// Translation state: the last sequence number seen on the data channel.
///
/// Stored, but the scheme makes no gap-detection guarantee over it — see `DESIGN.md`'s Open
/// Questions for why this is deliberately inert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoloniexState {
    pub previous_sequence_number: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoloniexTranslator;

impl Translator for PoloniexTranslator {
    type State = PoloniexState;

    fn initial_state(&self, _base: &str, _quote: &str) -> Self::State {
        PoloniexState::default()
    }

    fn subscribe_msg(&self, base: &str, quote: &str) -> Vec<OutboundFrame> {
        let channel = format!("{}_{}", quote.to_uppercase(), base.to_uppercase());
        vec![json!({"command": "subscribe", "channel": channel})]
    }

    fn ping_msg(&self, _state: &Self::State) -> Vec<OutboundFrame> {
        vec![json!({"op": "ping"})]
    }

    fn synchronised(&self, _state: &Self::State) -> bool {
        true
    }

    fn translate(
        &self,
        message: &Value,
        mut state: Self::State,
    ) -> Result<(Vec<Instruction>, Self::State), TranslateError> {
        let arr = message.as_array().ok_or(TranslateError::UnrecognizedShape)?;

        // Ticker / heartbeat channels: [1010], [1002], [1003].
        if arr.len() == 1 {
            return Ok((vec![Instruction::NoOp], state));
        }

        if arr.len() < 3 {
            return Ok((vec![Instruction::NoOp], state));
        }

        state.previous_sequence_number = arr[1].as_i64();

        let messages = arr[2].as_array().ok_or(TranslateError::UnrecognizedShape)?;
        let mut instructions = Vec::with_capacity(messages.len());
        for entry in messages {
            let tuple = entry.as_array().ok_or(TranslateError::UnrecognizedShape)?;
            let tag = tuple.first().and_then(Value::as_str).ok_or(TranslateError::UnrecognizedShape)?;
            let instruction = match tag {
                "i" => translate_snapshot(tuple)?,
                "o" => translate_delta(tuple)?,
                "t" => translate_trade(tuple)?,
                _ => Instruction::NoOp,
            };
            instructions.push(instruction);
        }

        Ok((instructions, state))
    }
}

fn parse_f64(value: &Value) -> Result<f64, TranslateError> {
    value
        .as_str()
        .ok_or(TranslateError::UnrecognizedShape)?
        .parse()
        .map_err(|_| TranslateError::UnrecognizedShape)
}

fn parse_level_map(map: &serde_json::Map<String, Value>) -> Result<Vec<Level>, TranslateError> {
    map.iter()
        .map(|(price, size)| {
            let price: f64 = price.parse().map_err(|_| TranslateError::UnrecognizedShape)?;
            let size = parse_f64(size)?;
            Ok(Level::new(price, size))
        })
        .collect()
}

fn translate_snapshot(tuple: &[Value]) -> Result<Instruction, TranslateError> {
    let snapshot = tuple.get(1).ok_or(TranslateError::UnrecognizedShape)?;
    let order_book = snapshot
        .get("orderBook")
        .and_then(Value::as_array)
        .ok_or(TranslateError::UnrecognizedShape)?;
    if order_book.len() != 2 {
        return Err(TranslateError::UnrecognizedShape);
    }
    let asks_map = order_book[0].as_object().ok_or(TranslateError::UnrecognizedShape)?;
    let bids_map = order_book[1].as_object().ok_or(TranslateError::UnrecognizedShape)?;

    Ok(Instruction::Snapshot {
        bids: parse_level_map(bids_map)?,
        asks: parse_level_map(asks_map)?,
    })
}

fn translate_delta(tuple: &[Value]) -> Result<Instruction, TranslateError> {
    let side_flag = tuple.get(1).and_then(Value::as_i64).ok_or(TranslateError::UnrecognizedShape)?;
    let price = parse_f64(tuple.get(2).ok_or(TranslateError::UnrecognizedShape)?)?;
    let size = parse_f64(tuple.get(3).ok_or(TranslateError::UnrecognizedShape)?)?;
    let side = if side_flag == 1 { Side::Bid } else { Side::Ask };
    Ok(Instruction::Deltas(vec![(side, price, size)]))
}

fn translate_trade(tuple: &[Value]) -> Result<Instruction, TranslateError> {
    let side_flag = tuple.get(2).and_then(Value::as_i64).ok_or(TranslateError::UnrecognizedShape)?;
    let price = parse_f64(tuple.get(3).ok_or(TranslateError::UnrecognizedShape)?)?;
    let size = parse_f64(tuple.get(4).ok_or(TranslateError::UnrecognizedShape)?)?;
    let epoch_str = tuple.get(6).and_then(Value::as_str).ok_or(TranslateError::UnrecognizedShape)?;
    let epoch_ms: i64 = epoch_str.parse().map_err(|_| TranslateError::UnrecognizedShape)?;
    let timestamp = DateTime::from_timestamp_millis(epoch_ms).ok_or(TranslateError::UnrecognizedShape)?;
    let trade = TradeEvent::new(price, size, timestamp);

    if side_flag == 1 {
        Ok(Instruction::Buys(vec![trade]))
    } else {
        Ok(Instruction::Sells(vec![trade]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn e3_snapshot() {
        let t = PoloniexTranslator;
        let state = t.initial_state("ETH", "BTC");

        let message = json!([148, 1, [["i", {"orderBook": [{"10.0": "2.0"}, {"9.0": "3.0"}]}, 1_700_000_000_000i64]]]);
        let (instr, state) = t.translate(&message, state).unwrap();

        assert_eq!(
            instr,
            vec![Instruction::Snapshot {
                bids: vec![Level::new(9.0, 3.0)],
                asks: vec![Level::new(10.0, 2.0)],
            }]
        );
        assert_eq!(state.previous_sequence_number, Some(1));
    }

    #[test]
    fn e4_delta_pair() {
        let t = PoloniexTranslator;
        let state = t.initial_state("ETH", "BTC");

        let message = json!([148, 2, [["o", 1, "9.5", "1.0", 1_700_000_000_001i64]]]);
        let (instr, state) = t.translate(&message, state).unwrap();
        assert_eq!(instr, vec![Instruction::Deltas(vec![(Side::Bid, 9.5, 1.0)])]);

        let message = json!([148, 3, [["o", 0, "10.5", "0", 1_700_000_000_002i64]]]);
        let (instr, _state) = t.translate(&message, state).unwrap();
        assert_eq!(instr, vec![Instruction::Deltas(vec![(Side::Ask, 10.5, 0.0)])]);
    }

    #[test]
    fn trade_buy_and_sell() {
        let t = PoloniexTranslator;
        let state = t.initial_state("ETH", "BTC");

        let message = json!([148, 4, [
            ["t", "1234", 1, "9.9", "0.5", 0, "1700000000500"],
            ["t", "1235", 0, "9.8", "0.25", 0, "1700000000600"],
        ]]);
        let (instr, _state) = t.translate(&message, state).unwrap();

        assert_eq!(instr.len(), 2);
        assert!(matches!(instr[0], Instruction::Buys(_)));
        assert!(matches!(instr[1], Instruction::Sells(_)));
    }

    #[test]
    fn ticker_heartbeat_channels_are_noop() {
        let t = PoloniexTranslator;
        for payload in [json!([1010]), json!([1002]), json!([1003])] {
            let state = t.initial_state("ETH", "BTC");
            let (instr, _state) = t.translate(&payload, state).unwrap();
            assert_eq!(instr, vec![Instruction::NoOp]);
        }
    }
}

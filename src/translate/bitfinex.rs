//! Bitfinex translation scheme.
//!
//! Subscribes to one `book` and one `trades` channel per symbol (`t<BASE><QUOTE>`); channel ids
//! are only known once the venue confirms the subscription, so every rule downstream of that is
//! keyed on the recorded `chanId`.

use serde_json::{json, Value};

use crate::book::{Level, Side};

use super::{micros_from_epoch_ms, Instruction, OutboundFrame, TradeEvent, TranslateError, Translator};

/// Translation state: the channel ids assigned by Bitfinex on subscription confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitfinexState {
    pub book_cid: Option<i64>,
    pub trades_cid: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BitfinexTranslator;

impl Translator for BitfinexTranslator {
    type State = BitfinexState;

    fn initial_state(&self, _base: &str, _quote: &str) -> Self::State {
        BitfinexState::default()
    }

    fn subscribe_msg(&self, base: &str, quote: &str) -> Vec<OutboundFrame> {
        let symbol = format!("t{}{}", base.to_uppercase(), quote.to_uppercase());
        vec![
            json!({"event": "subscribe", "channel": "book", "symbol": symbol}),
            json!({"event": "subscribe", "channel": "trades", "symbol": symbol}),
        ]
    }

    fn ping_msg(&self, state: &Self::State) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        if let Some(cid) = state.book_cid {
            frames.push(json!({"event": "ping", "cid": cid}));
        }
        if let Some(cid) = state.trades_cid {
            frames.push(json!({"event": "ping", "cid": cid}));
        }
        frames
    }

    fn synchronised(&self, _state: &Self::State) -> bool {
        true
    }

    fn translate(
        &self,
        message: &Value,
        mut state: Self::State,
    ) -> Result<(Vec<Instruction>, Self::State), TranslateError> {
        match message {
            Value::Array(arr) if arr.len() == 2 && arr[1].as_str() == Some("hb") => {
                Ok((vec![Instruction::NoOp], state))
            }
            Value::Array(arr) if arr.len() == 2 => {
                let chan_id = arr[0].as_i64();
                if chan_id.is_some() && chan_id == state.book_cid {
                    let instructions = translate_book(&arr[1])?;
                    Ok((instructions, state))
                } else if chan_id.is_some() && chan_id == state.trades_cid {
                    Ok((vec![Instruction::NoOp], state))
                } else {
                    Ok((vec![Instruction::NoOp], state))
                }
            }
            Value::Array(arr) if arr.len() == 3 => {
                let chan_id = arr[0].as_i64();
                if chan_id.is_some() && chan_id == state.trades_cid {
                    let instruction = translate_trade(&arr[2])?;
                    Ok((vec![instruction], state))
                } else if chan_id.is_some() && chan_id == state.book_cid {
                    // Exhaustive only for trades: reject rather than silently pattern-fail.
                    Err(TranslateError::UnrecognizedShape)
                } else {
                    Ok((vec![Instruction::NoOp], state))
                }
            }
            Value::Object(_) => {
                let event = message.get("event").and_then(Value::as_str);
                match event {
                    Some("info") | Some("conf") | Some("pong") => Ok((vec![Instruction::NoOp], state)),
                    Some("subscribed") => {
                        let channel = message.get("channel").and_then(Value::as_str);
                        let chan_id = message.get("chanId").and_then(Value::as_i64);
                        match (channel, chan_id) {
                            (Some("book"), Some(id)) => state.book_cid = Some(id),
                            (Some("trades"), Some(id)) => state.trades_cid = Some(id),
                            _ => {}
                        }
                        Ok((vec![Instruction::NoOp], state))
                    }
                    _ => Ok((vec![Instruction::NoOp], state)),
                }
            }
            _ => Ok((vec![Instruction::NoOp], state)),
        }
    }
}

fn translate_book(data: &Value) -> Result<Vec<Instruction>, TranslateError> {
    let arr = data.as_array().ok_or(TranslateError::UnrecognizedShape)?;

    let is_single_level = arr.len() == 3 && arr.iter().all(Value::is_number);
    if is_single_level {
        let price = arr[0].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
        let count = arr[1].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
        let amount = arr[2].as_f64().ok_or(TranslateError::UnrecognizedShape)?;

        let (side, liquidity) = if amount > 0.0 {
            (Side::Bid, if count == 0.0 { 0.0 } else { amount })
        } else {
            (Side::Ask, if count == 0.0 { 0.0 } else { -amount })
        };
        return Ok(vec![Instruction::Deltas(vec![(side, price, liquidity)])]);
    }

    let mut bids = Vec::with_capacity(arr.len());
    let mut asks = Vec::with_capacity(arr.len());
    for level in arr {
        let triple = level.as_array().ok_or(TranslateError::UnrecognizedShape)?;
        if triple.len() != 3 {
            return Err(TranslateError::UnrecognizedShape);
        }
        let price = triple[0].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
        let amount = triple[2].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
        if amount > 0.0 {
            bids.push(Level::new(price, amount));
        } else {
            asks.push(Level::new(price, -amount));
        }
    }
    Ok(vec![Instruction::Snapshot { bids, asks }])
}

fn translate_trade(data: &Value) -> Result<Instruction, TranslateError> {
    let arr = data.as_array().ok_or(TranslateError::UnrecognizedShape)?;
    if arr.len() != 4 {
        return Err(TranslateError::UnrecognizedShape);
    }
    let epoch_ms = arr[1].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
    let amount = arr[2].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
    let price = arr[3].as_f64().ok_or(TranslateError::UnrecognizedShape)?;
    let timestamp = micros_from_epoch_ms(epoch_ms).ok_or(TranslateError::UnrecognizedShape)?;
    let trade = TradeEvent::new(price, amount.abs(), timestamp);

    if amount > 0.0 {
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
    fn e1_subscribe_snapshot_delta() {
        let t = BitfinexTranslator;
        let state = t.initial_state("BTC", "USD");

        let (instr, state) = t
            .translate(&json!({"event": "subscribed", "channel": "book", "chanId": 42}), state)
            .unwrap();
        assert_eq!(instr, vec![Instruction::NoOp]);
        assert_eq!(state.book_cid, Some(42));

        let (instr, state) = t
            .translate(
                &json!([42, [[100.0, 1, 2.0], [99.0, 1, 1.5], [101.0, 1, -3.0]]]),
                state,
            )
            .unwrap();
        assert_eq!(
            instr,
            vec![Instruction::Snapshot {
                bids: vec![Level::new(100.0, 2.0), Level::new(99.0, 1.5)],
                asks: vec![Level::new(101.0, 3.0)],
            }]
        );

        let (instr, _state) = t.translate(&json!([42, [100.0, 0, 2.0]]), state).unwrap();
        assert_eq!(instr, vec![Instruction::Deltas(vec![(Side::Bid, 100.0, 0.0)])]);
    }

    #[test]
    fn e2_trade() {
        let t = BitfinexTranslator;
        let state = BitfinexState { book_cid: None, trades_cid: Some(7) };

        let (instr, _state) = t
            .translate(&json!([7, "te", [555, 1_700_000_000_000i64, -0.5, 250.0]]), state)
            .unwrap();

        let expected_ts = micros_from_epoch_ms(1_700_000_000_000.0).unwrap();
        assert_eq!(instr, vec![Instruction::Sells(vec![TradeEvent::new(250.0, 0.5, expected_ts)])]);
        assert_eq!(expected_ts.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn e6_heartbeat_passthrough() {
        let t = BitfinexTranslator;
        let state = BitfinexState { book_cid: Some(42), trades_cid: None };
        let (instr, next) = t.translate(&json!([42, "hb"]), state).unwrap();
        assert_eq!(instr, vec![Instruction::NoOp]);
        assert_eq!(next, state);
    }

    #[test]
    fn trades_summary_array_is_noop() {
        let t = BitfinexTranslator;
        let state = BitfinexState { book_cid: None, trades_cid: Some(7) };
        let (instr, _) = t.translate(&json!([7, [[1, 2, 3]]]), state).unwrap();
        assert_eq!(instr, vec![Instruction::NoOp]);
    }

    #[test]
    fn unrecognized_book_triple_shape_errors() {
        let t = BitfinexTranslator;
        let state = BitfinexState { book_cid: Some(42), trades_cid: None };
        let err = t.translate(&json!([42, "tu", [1, 2, 3]]), state).unwrap_err();
        assert!(matches!(err, TranslateError::UnrecognizedShape));
    }

    #[test]
    fn info_conf_pong_are_noop() {
        let t = BitfinexTranslator;
        for event in ["info", "conf", "pong"] {
            let state = t.initial_state("BTC", "USD");
            let (instr, next) = t.translate(&json!({"event": event}), state).unwrap();
            assert_eq!(instr, vec![Instruction::NoOp]);
            assert_eq!(next, BitfinexState::default());
        }
    }
}

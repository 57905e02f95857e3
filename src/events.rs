// 11.0: every state change produces an event. used for audit trails and for
// notifying the off-chain keepers/matchers. the EventPayload enum lists all
// event types the ledger emits.

use crate::types::{AccountId, OptionKind, Price, Quote, StrikeLevel, Timestamp, UnderlyingId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // account events
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),

    // trade events
    PositionRecorded(PositionRecordedEvent),

    // round lifecycle
    Settlement(SettlementEvent),
    RoundRolled(RoundRolledEvent),

    // risk events
    Liquidation(LiquidationEvent),

    // administration
    PauseToggled(PauseToggledEvent),
    ConfigChanged(ConfigChangedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub account: AccountId,
    pub amount: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub account: AccountId,
    pub amount: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecordedEvent {
    pub buyer: AccountId,
    pub seller: AccountId,
    pub trade_price: Price,
    pub quantity: Decimal,
    pub kind: OptionKind,
    pub underlying: UnderlyingId,
    pub strike_level: StrikeLevel,
    pub expiry: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub caller: AccountId,
    pub round: u64,
    pub positions_settled: usize,
    pub insurance_drawn: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRolledEvent {
    pub round: u64,
    pub expiry: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub target: AccountId,
    pub liquidator: AccountId,
    pub positions_taken: usize,
    pub positions_netted: usize,
    pub reward: Quote,
    pub insurance_cut: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseToggledEvent {
    pub caller: AccountId,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangedEvent {
    pub parameter: String,
    pub new_value: String,
    pub caller: AccountId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn events_serialize() {
        let event = Event::new(
            EventId(1),
            Timestamp::from_millis(1000),
            EventPayload::Deposit(DepositEvent {
                account: AccountId(7),
                amount: Quote::new(dec!(100)),
                new_balance: Quote::new(dec!(100)),
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Deposit"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, EventId(1));
    }

    #[test]
    fn position_recorded_fields() {
        let ev = PositionRecordedEvent {
            buyer: AccountId(1),
            seller: AccountId(2),
            trade_price: Price::new_unchecked(dec!(12.5)),
            quantity: dec!(3),
            kind: OptionKind::Call,
            underlying: UnderlyingId(1),
            strike_level: StrikeLevel::new(7).unwrap(),
            expiry: Timestamp::from_millis(9999),
        };
        assert!(ev.kind.is_call());
        assert_eq!(ev.trade_price.value(), dec!(12.5));
    }
}

// 14.1 engine/core.rs: the ledger store. accounts, positions, smiles, round
// state, and the insurance book all live here; the other engine files add
// the trade/settle/liquidate/rollover operations onto this struct.

use super::results::EngineError;
use crate::account::{Account, AccountError};
use crate::config::EngineParams;
use crate::custody::{CollateralGate, TransferError};
use crate::events::{
    ConfigChangedEvent, DepositEvent, Event, EventId, EventPayload, PauseToggledEvent,
    WithdrawalEvent,
};
use crate::fixed;
use crate::instrument::OptionKey;
use crate::margin::{MarginKind, MarginParams};
use crate::oracle::FeedBoard;
use crate::position::PositionArena;
use crate::round::{next_weekly_expiry, RoundState};
use crate::smile::VolSmile;
use crate::types::{
    AccountId, Bps, Price, Quote, StrikeLevel, Timestamp, UnderlyingId, STRIKE_LEVELS,
};
use std::collections::{HashMap, HashSet};

/// The distinguished backstop account. Exempt from the balance cap, drawn on
/// by settlement shortfalls, fed by liquidation penalties.
pub const INSURANCE_ACCOUNT: AccountId = AccountId(0);

#[derive(Debug)]
pub struct Engine {
    pub(super) params: EngineParams,
    pub(super) margin_params: MarginParams,
    pub(super) oracle: FeedBoard,
    pub(super) gate: Option<Box<dyn CollateralGate>>,

    pub(super) accounts: HashMap<AccountId, Account>,
    pub(super) arena: PositionArena,
    pub(super) smiles: HashMap<OptionKey, VolSmile>,
    pub(super) round: RoundState,
    pub(super) underlyings: HashSet<UnderlyingId>,

    pub(super) admin: AccountId,
    pub(super) keepers: HashSet<AccountId>,
    pub(super) whitelist: HashSet<AccountId>,
    pub(super) paused: bool,

    pub(super) insurance_drawn: Quote,
    pub(super) insurance_contributed: Quote,

    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) now: Timestamp,
    pub(super) transfer_lock: bool,
}

impl Engine {
    pub fn new(admin: AccountId, params: EngineParams) -> Self {
        Self::new_at(admin, params, Timestamp::from_millis(0))
    }

    /// Engine whose clock and first weekly expiry start from `genesis`.
    pub fn new_at(admin: AccountId, params: EngineParams, genesis: Timestamp) -> Self {
        let now = genesis;
        let mut accounts = HashMap::new();
        accounts.insert(INSURANCE_ACCOUNT, Account::default());

        Self {
            params,
            margin_params: MarginParams::default(),
            oracle: FeedBoard::new(),
            gate: None,
            accounts,
            arena: PositionArena::default(),
            smiles: HashMap::new(),
            round: RoundState::new(1, next_weekly_expiry(now)),
            underlyings: HashSet::new(),
            admin,
            keepers: HashSet::new(),
            whitelist: HashSet::new(),
            paused: false,
            insurance_drawn: Quote::zero(),
            insurance_contributed: Quote::zero(),
            events: Vec::new(),
            next_event_id: 1,
            now,
            transfer_lock: false,
        }
    }

    pub fn with_gate(mut self, gate: Box<dyn CollateralGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    // --- clock -----------------------------------------------------------

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.now = timestamp;
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.now = Timestamp::from_millis(self.now.as_millis() + millis);
    }

    pub fn time(&self) -> Timestamp {
        self.now
    }

    // --- accessors -------------------------------------------------------

    pub fn balance(&self, account: AccountId) -> Quote {
        self.accounts
            .get(&account)
            .map(|a| a.balance)
            .unwrap_or_else(Quote::zero)
    }

    pub fn insurance_balance(&self) -> Quote {
        self.balance(INSURANCE_ACCOUNT)
    }

    pub fn insurance_drawn_total(&self) -> Quote {
        self.insurance_drawn
    }

    pub fn insurance_contributed_total(&self) -> Quote {
        self.insurance_contributed
    }

    pub fn account(&self, account: AccountId) -> Option<&Account> {
        self.accounts.get(&account)
    }

    pub fn round_number(&self) -> u64 {
        self.round.number
    }

    pub fn round_expiry(&self) -> Timestamp {
        self.round.expiry
    }

    pub fn round_settled(&self) -> bool {
        self.round.settled
    }

    pub fn strike_menu(&self, underlying: UnderlyingId) -> Option<&[Price; STRIKE_LEVELS]> {
        self.round.menu(underlying)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_keeper(&self, account: AccountId) -> bool {
        self.keepers.contains(&account)
    }

    pub fn is_whitelisted(&self, account: AccountId) -> bool {
        self.whitelist.contains(&account)
    }

    pub fn position_count(&self) -> usize {
        self.arena.len()
    }

    pub fn smile(&self, key: &OptionKey) -> Option<&VolSmile> {
        self.smiles.get(key)
    }

    pub fn oracle_mut(&mut self) -> &mut FeedBoard {
        &mut self.oracle
    }

    // --- deposits & withdrawals -----------------------------------------

    pub fn deposit(&mut self, account: AccountId, amount: Quote) -> Result<(), EngineError> {
        self.validate_deposit(account, amount)?;
        self.credit_deposit(account, amount);
        Ok(())
    }

    fn validate_deposit(&self, account: AccountId, amount: Quote) -> Result<(), EngineError> {
        if amount.value() <= rust_decimal::Decimal::ZERO {
            return Err(EngineError::ZeroAmount);
        }
        if account != INSURANCE_ACCOUNT {
            if let Some(cap) = self.params.max_account_balance {
                if self.balance(account).add(amount) > cap {
                    return Err(EngineError::Account(AccountError::BalanceCapExceeded {
                        cap,
                    }));
                }
            }
        }
        Ok(())
    }

    fn credit_deposit(&mut self, account: AccountId, amount: Quote) {
        let entry = self.accounts.entry(account).or_default();
        entry.credit(amount);
        let new_balance = entry.balance;

        self.emit_event(EventPayload::Deposit(DepositEvent {
            account,
            amount,
            new_balance,
        }));
    }

    /// Withdraw gated on the maintenance-margin check as if the withdrawal
    /// had already happened: balance - amount + unrealized loss - MM >= 0.
    pub fn withdraw(&mut self, account: AccountId, amount: Quote) -> Result<(), EngineError> {
        self.validate_withdraw(account, amount)?;
        self.apply_withdraw(account, amount)
    }

    fn validate_withdraw(&self, account: AccountId, amount: Quote) -> Result<(), EngineError> {
        if amount.value() <= rust_decimal::Decimal::ZERO {
            return Err(EngineError::ZeroAmount);
        }
        let balance = self.balance(account);
        if amount > balance {
            return Err(EngineError::Account(AccountError::InsufficientBalance {
                requested: amount,
                available: balance,
            }));
        }

        let loss = self.unrealized_payoff(account, true)?;
        let mm = self.margin_requirement(account, MarginKind::Maintenance)?;
        let equity_after = balance.sub(amount).add(loss).sub(mm);
        if equity_after.is_negative() {
            return Err(EngineError::InsufficientMargin(account));
        }
        Ok(())
    }

    fn apply_withdraw(&mut self, account: AccountId, amount: Quote) -> Result<(), EngineError> {
        let entry = self
            .accounts
            .get_mut(&account)
            .ok_or(EngineError::AccountNotFound(account))?;
        entry.debit(amount)?;
        let new_balance = entry.balance;

        self.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
            account,
            amount,
            new_balance,
        }));
        Ok(())
    }

    /// Withdraw the maximum amount that still passes the margin gate.
    pub fn withdraw_all(&mut self, account: AccountId) -> Result<Quote, EngineError> {
        let balance = self.balance(account);
        let loss = self.unrealized_payoff(account, true)?;
        let mm = self.margin_requirement(account, MarginKind::Maintenance)?;

        let free = balance.add(loss).sub(mm).min(balance);
        if free.value() <= rust_decimal::Decimal::ZERO {
            return Err(EngineError::ZeroAmount);
        }
        self.withdraw(account, free)?;
        Ok(free)
    }

    /// Deposit raw token units through the collateral gate. All ledger-side
    /// checks run before the external pull so a rejected deposit never
    /// strands tokens in custody.
    pub fn deposit_tokens(&mut self, account: AccountId, raw: i128) -> Result<(), EngineError> {
        let decimals = self.gate.as_ref().ok_or(EngineError::GateMissing)?.decimals();
        let amount = Quote::new(fixed::from_token_units(raw, decimals)?);

        self.validate_deposit(account, amount)?;
        self.locked_gate(|gate| gate.pull(account, raw))?;
        self.credit_deposit(account, amount);
        Ok(())
    }

    /// Withdraw through the collateral gate, margin-gated like `withdraw`.
    /// The balance is only debited once the external push has succeeded.
    pub fn withdraw_tokens(&mut self, account: AccountId, raw: i128) -> Result<(), EngineError> {
        let decimals = self.gate.as_ref().ok_or(EngineError::GateMissing)?.decimals();
        let amount = Quote::new(fixed::from_token_units(raw, decimals)?);

        self.validate_withdraw(account, amount)?;
        self.locked_gate(|gate| gate.push(account, raw))?;
        self.apply_withdraw(account, amount)
    }

    fn locked_gate(
        &mut self,
        f: impl FnOnce(&mut dyn CollateralGate) -> Result<(), TransferError>,
    ) -> Result<(), EngineError> {
        if self.transfer_lock {
            return Err(EngineError::ReentrantTransfer);
        }
        let gate = self.gate.as_mut().ok_or(EngineError::GateMissing)?;
        self.transfer_lock = true;
        let result = f(gate.as_mut());
        self.transfer_lock = false;
        result.map_err(EngineError::from)
    }

    /// Top up the backstop. Open to anyone, exempt from the balance cap.
    pub fn fund_insurance(&mut self, amount: Quote) -> Result<(), EngineError> {
        self.deposit(INSURANCE_ACCOUNT, amount)
    }

    // --- administration --------------------------------------------------

    pub(super) fn require_admin(&self, caller: AccountId) -> Result<(), EngineError> {
        if caller != self.admin {
            return Err(EngineError::NotAdmin(caller));
        }
        Ok(())
    }

    pub(super) fn require_keeper(&self, caller: AccountId) -> Result<(), EngineError> {
        if !self.keepers.contains(&caller) {
            return Err(EngineError::NotKeeper(caller));
        }
        Ok(())
    }

    pub fn add_keeper(&mut self, caller: AccountId, keeper: AccountId) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.keepers.insert(keeper);
        self.emit_config_changed(caller, "keeper.add", format!("{keeper:?}"));
        Ok(())
    }

    pub fn remove_keeper(
        &mut self,
        caller: AccountId,
        keeper: AccountId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.keepers.remove(&keeper);
        self.emit_config_changed(caller, "keeper.remove", format!("{keeper:?}"));
        Ok(())
    }

    pub fn add_whitelist(
        &mut self,
        caller: AccountId,
        member: AccountId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.whitelist.insert(member);
        self.emit_config_changed(caller, "whitelist.add", format!("{member:?}"));
        Ok(())
    }

    pub fn remove_whitelist(
        &mut self,
        caller: AccountId,
        member: AccountId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.whitelist.remove(&member);
        self.emit_config_changed(caller, "whitelist.remove", format!("{member:?}"));
        Ok(())
    }

    /// Register the price feed for an underlying by seeding its first spot
    /// quote. Real deployments would wire an oracle address here.
    pub fn set_oracle(
        &mut self,
        caller: AccountId,
        underlying: UnderlyingId,
        spot: Price,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.oracle.push_spot(underlying, spot, self.now);
        self.emit_config_changed(caller, "oracle", format!("{underlying:?}@{spot}"));
        Ok(())
    }

    /// Activate an underlying for trading: requires a registered oracle and
    /// generates the current round's strike menu from its spot.
    pub fn activate_underlying(
        &mut self,
        caller: AccountId,
        underlying: UnderlyingId,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        if !self.oracle.has_spot(underlying) {
            return Err(EngineError::MissingOracle(underlying));
        }
        let spot = self.spot(underlying)?;
        let menu = crate::strikes::strike_menu(spot)?;
        self.underlyings.insert(underlying);
        self.round.strike_menus.insert(underlying, menu);
        self.emit_config_changed(caller, "underlying.activate", format!("{underlying:?}"));
        Ok(())
    }

    pub fn set_max_insured(&mut self, caller: AccountId, pct: Bps) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.params.max_insured_pct = pct;
        self.emit_config_changed(caller, "max_insured_pct", pct.value().to_string());
        Ok(())
    }

    pub fn set_minimum_margin(&mut self, caller: AccountId, pct: Bps) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.margin_params.alternative_minimum = pct;
        self.emit_config_changed(caller, "alternative_minimum", pct.value().to_string());
        Ok(())
    }

    pub fn set_balance_cap(
        &mut self,
        caller: AccountId,
        cap: Option<Quote>,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.params.max_account_balance = cap;
        let rendered = cap.map(|c| c.to_string()).unwrap_or_else(|| "none".into());
        self.emit_config_changed(caller, "max_account_balance", rendered);
        Ok(())
    }

    pub fn set_paused(&mut self, caller: AccountId, paused: bool) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.paused = paused;
        self.emit_event(EventPayload::PauseToggled(PauseToggledEvent {
            caller,
            paused,
        }));
        Ok(())
    }

    // --- keeper price feeds ---------------------------------------------

    pub fn push_spot(
        &mut self,
        caller: AccountId,
        underlying: UnderlyingId,
        price: Price,
    ) -> Result<(), EngineError> {
        self.require_keeper(caller)?;
        if !self.oracle.has_spot(underlying) {
            return Err(EngineError::MissingOracle(underlying));
        }
        self.oracle.push_spot(underlying, price, self.now);
        Ok(())
    }

    pub fn push_mark(
        &mut self,
        caller: AccountId,
        underlying: UnderlyingId,
        is_call: bool,
        level: StrikeLevel,
        price: Price,
    ) -> Result<(), EngineError> {
        self.require_keeper(caller)?;
        self.oracle.push_mark(underlying, is_call, level, price, self.now);
        Ok(())
    }

    // --- events ----------------------------------------------------------

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    fn emit_config_changed(&mut self, caller: AccountId, parameter: &str, new_value: String) {
        self.emit_event(EventPayload::ConfigChanged(ConfigChangedEvent {
            parameter: parameter.to_string(),
            new_value,
            caller,
        }));
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.now, payload);
        self.next_event_id += 1;

        if self.params.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.params.max_events {
            let drain_count = self.events.len() - self.params.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

//! Options Settlement Ledger Simulation.
//!
//! Walks the engine through a full weekly round: collateral deposits, trade
//! entry with smile updates, a margin-gated withdrawal, expiry settlement
//! with an insurance draw, a liquidation, and the rollover into round two.

use chrono::{TimeZone, Utc};
use options_ledger::*;
use rust_decimal_macros::dec;

const ETH: UnderlyingId = UnderlyingId(1);
const ADMIN: AccountId = AccountId(100);
const KEEPER: AccountId = AccountId(101);
const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);
const CAROL: AccountId = AccountId(3);
const DAVE: AccountId = AccountId(4);

fn main() {
    println!("Options Settlement Ledger Simulation");
    println!("Weekly Rounds, Reg-T Margin, Insurance Backstop\n");

    scenario_1_deposits_and_margin_gate();
    scenario_2_trade_and_settle();
    scenario_3_insurance_draw();
    scenario_4_liquidation();
    scenario_5_token_custody();

    println!("\nAll simulations completed successfully.");
}

fn ts(y: i32, mo: u32, d: u32, h: u32) -> Timestamp {
    let dt = Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap();
    Timestamp::from_millis(dt.timestamp_millis())
}

/// Engine bootstrapped on Monday 2024-01-01 with an ETH feed at 1500.
/// The first weekly expiry lands on Friday 2024-01-05 08:00 UTC.
fn setup() -> Engine {
    let mut engine = Engine::new_at(ADMIN, EngineParams::default(), ts(2024, 1, 1, 0));
    engine.add_keeper(ADMIN, KEEPER).unwrap();
    engine
        .set_oracle(ADMIN, ETH, Price::new_unchecked(dec!(1500)))
        .unwrap();
    engine.activate_underlying(ADMIN, ETH).unwrap();
    let level = StrikeLevel::new(7).unwrap();
    engine
        .push_mark(KEEPER, ETH, true, level, Price::new_unchecked(dec!(60)))
        .unwrap();
    engine
}

/// Deposits, then a withdrawal that the maintenance-margin gate rejects.
fn scenario_1_deposits_and_margin_gate() {
    println!("Scenario 1: Deposits and the Margin Gate\n");

    let mut engine = setup();
    engine.deposit(ALICE, Quote::new(dec!(10000))).unwrap();
    engine.deposit(BOB, Quote::new(dec!(10000))).unwrap();
    println!("  Alice and Bob each deposit 10,000");

    let level = StrikeLevel::new(7).unwrap();
    engine
        .record_position(
            KEEPER,
            ALICE,
            BOB,
            Price::new_unchecked(dec!(60)),
            dec!(1),
            ETH,
            OptionKind::Call,
            level,
        )
        .unwrap();
    println!("  Keeper records: Alice buys 1 CALL L7 (strike 1850) @ 60 from Bob");

    let mm = engine
        .margin_requirement(BOB, MarginKind::Maintenance)
        .unwrap();
    println!("  Bob's maintenance margin: {mm}");

    let too_much = engine.withdraw(BOB, Quote::new(dec!(9950)));
    println!("  Bob withdraws 9,950 -> {:?}", too_much.err().unwrap());

    engine.withdraw(BOB, Quote::new(dec!(5000))).unwrap();
    println!("  Bob withdraws 5,000 -> ok, balance {}\n", engine.balance(BOB));
}

/// Spot rises from 1500 to 2000; the call finishes 150 in the money and the
/// buyer nets 90 over the 60 premium.
fn scenario_2_trade_and_settle() {
    println!("Scenario 2: Trade Entry and Settlement\n");

    let mut engine = setup();
    engine.deposit(ALICE, Quote::new(dec!(10000))).unwrap();
    engine.deposit(BOB, Quote::new(dec!(10000))).unwrap();

    let level = StrikeLevel::new(7).unwrap();
    engine
        .record_position(
            KEEPER,
            ALICE,
            BOB,
            Price::new_unchecked(dec!(60)),
            dec!(1),
            ETH,
            OptionKind::Call,
            level,
        )
        .unwrap();

    let key = OptionKey {
        underlying: ETH,
        kind: OptionKind::Call,
        level,
    };
    println!("  Smile seeded at {:?}", engine.smile(&key).unwrap().vols()[2]);

    engine
        .push_spot(KEEPER, ETH, Price::new_unchecked(dec!(2000)))
        .unwrap();
    engine.set_time(ts(2024, 1, 5, 9));
    let summary = engine.settle(KEEPER).unwrap();

    println!("  Spot moves to 2,000; round settles at expiry");
    println!(
        "  Positions settled: {}, insurance drawn: {}",
        summary.positions_settled, summary.insurance_drawn
    );
    println!("  Alice: {}  Bob: {}", engine.balance(ALICE), engine.balance(BOB));

    let round = engine
        .rollover(KEEPER, &[ALICE, BOB])
        .unwrap();
    println!(
        "  Rolled into round {round}, next expiry {}\n",
        engine.round_expiry()
    );
}

/// A thinly collateralized seller blows up; the insurance draw is capped at
/// half the payoff and the buyer takes a partial payment.
fn scenario_3_insurance_draw() {
    println!("Scenario 3: Capped Insurance Draw\n");

    let mut engine = setup();
    engine.fund_insurance(Quote::new(dec!(10000))).unwrap();
    engine.deposit(ALICE, Quote::new(dec!(10000))).unwrap();
    engine.deposit(CAROL, Quote::new(dec!(200))).unwrap();

    let level = StrikeLevel::new(7).unwrap();
    engine
        .record_position(
            KEEPER,
            ALICE,
            CAROL,
            Price::new_unchecked(dec!(60)),
            dec!(1),
            ETH,
            OptionKind::Call,
            level,
        )
        .unwrap();
    println!("  Carol sells 1 CALL L7 @ 60 with only 200 collateral");

    engine
        .push_spot(KEEPER, ETH, Price::new_unchecked(dec!(5000)))
        .unwrap();
    engine.set_time(ts(2024, 1, 5, 9));
    let summary = engine.settle(KEEPER).unwrap();

    // owed 3,090: carol pays her whole 200, insurance covers at most 50%
    println!("  Spot gaps to 5,000; Carol owes 3,090 at settlement");
    println!("  Insurance drawn: {}", summary.insurance_drawn);
    println!(
        "  Alice: {}  Carol: {}  Insurance: {}\n",
        engine.balance(ALICE),
        engine.balance(CAROL),
        engine.insurance_balance()
    );
}

/// Mid-round liquidation of an under-margined short by a third party.
fn scenario_4_liquidation() {
    println!("Scenario 4: Liquidation\n");

    let mut engine = setup();
    engine.deposit(ALICE, Quote::new(dec!(10000))).unwrap();
    engine.deposit(CAROL, Quote::new(dec!(200))).unwrap();
    engine.deposit(DAVE, Quote::new(dec!(50000))).unwrap();

    let level = StrikeLevel::new(7).unwrap();
    engine
        .record_position(
            KEEPER,
            ALICE,
            CAROL,
            Price::new_unchecked(dec!(60)),
            dec!(1),
            ETH,
            OptionKind::Call,
            level,
        )
        .unwrap();

    engine
        .push_spot(KEEPER, ETH, Price::new_unchecked(dec!(2000)))
        .unwrap();
    engine
        .push_mark(KEEPER, ETH, true, level, Price::new_unchecked(dec!(170)))
        .unwrap();
    engine.set_time(ts(2024, 1, 3, 12));

    assert!(!engine.margin_ok(CAROL, MarginKind::Maintenance).unwrap());
    println!("  Spot at 2,000: Carol's short fails maintenance margin");

    let report = engine.liquidate(DAVE, CAROL).unwrap();
    println!(
        "  Dave liquidates: {:?}, recovered: {}",
        report.outcomes, report.target_recovered
    );
    println!(
        "  Dave reward: {}, insurance cut: {}",
        report.reward, report.insurance_cut
    );
    println!(
        "  Carol: {}  Dave: {}  Insurance: {}\n",
        engine.balance(CAROL),
        engine.balance(DAVE),
        engine.insurance_balance()
    );
}

/// Raw token units flow through the collateral gate.
fn scenario_5_token_custody() {
    println!("Scenario 5: Token Custody\n");

    let mut vault = MockVault::new(6);
    vault.mint(ALICE, 25_000_000); // 25 tokens at 6 decimals
    let mut engine = setup().with_gate(Box::new(vault));

    engine.deposit_tokens(ALICE, 10_000_000).unwrap();
    println!("  Alice deposits 10 tokens -> balance {}", engine.balance(ALICE));

    engine.withdraw_tokens(ALICE, 4_000_000).unwrap();
    println!("  Alice withdraws 4 tokens -> balance {}", engine.balance(ALICE));
}

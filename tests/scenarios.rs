//! Cross-crate scenario tests, one per published end-to-end scenario: a risk-gated order
//! rejection, emergency-stop idempotency, and backtest determinism. Scenarios that require a
//! live exchange or cache connection (grid bot lifecycle, job retry-to-DLQ, stream-reset
//! recovery) are covered by each owning crate's own unit tests against an in-process fake, since
//! this crate has no network fixture to drive them end-to-end.

use async_trait::async_trait;
use ferrotrade_exchange::model::{OrderType, PlaceOrderRequest, Side, TimeInForce};
use ferrotrade_integration::Id;
use ferrotrade_risk::{evaluate_new_order, EmergencyStop, EmergencyStopHooks, OrderRiskDecision, RiskLimit, RiskLimitCatalog, RiskLimitKind, RiskMetricsSnapshot, RiskScope};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scenario 1: a global `max-position-size` limit of 10000 USDT, an existing long position of
/// 9000 notional, and a new market buy that would push projected notional to 11500 — above the
/// limit's `breach` threshold — is rejected with `Violation` before any venue call is made.
#[test]
fn risk_gated_order_is_rejected_before_reaching_the_venue() {
    let limits = RiskLimitCatalog::new().with_limit(
        RiskLimit::new(RiskLimitKind::AggregateExposure, RiskScope::User, dec!(8000), dec!(9500), dec!(10000))
            .for_symbol("BTCUSDT"),
    );

    let mut exposure_by_symbol = HashMap::new();
    exposure_by_symbol.insert("BTCUSDT".to_string(), dec!(9000));
    let snapshot = RiskMetricsSnapshot {
        equity: dec!(5000),
        exposure_by_symbol,
        aggregate_exposure: dec!(9000),
        leverage: dec!(1.8),
        margin_level: dec!(2.0),
        day_to_date_pnl: Decimal::ZERO,
        drawdown: Decimal::ZERO,
        open_position_count: 1,
    };

    let order = PlaceOrderRequest {
        client_order_id: "test-order-1".to_string(),
        symbol: "BTCUSDT".to_string(),
        side: Side::Buy,
        order_type: OrderType::Market,
        time_in_force: Some(TimeInForce::GoodTilCanceled),
        quantity: dec!(0.05),
        price: None,
        reduce_only: false,
    };

    let decision = evaluate_new_order(&order, &snapshot, dec!(50000), &limits, &RiskScope::User);
    assert_eq!(decision, OrderRiskDecision::Violation { limit: RiskLimitKind::AggregateExposure });
}

struct StatefulHooks {
    calls: AtomicUsize,
    orders: usize,
    positions: usize,
    bots: usize,
}

#[async_trait]
impl EmergencyStopHooks for StatefulHooks {
    async fn cancel_all_open_orders(&self, _user: Id) -> usize {
        if self.calls.load(Ordering::SeqCst) == 0 {
            self.orders
        } else {
            0
        }
    }

    async fn close_all_positions_reduce_only(&self, _user: Id) -> usize {
        if self.calls.load(Ordering::SeqCst) == 0 {
            self.positions
        } else {
            0
        }
    }

    async fn stop_all_bots(&self, _user: Id) -> usize {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst);
        if calls == 0 {
            self.bots
        } else {
            0
        }
    }
}

/// Scenario 5: a user with 3 active bots, 7 open orders across 2 symbols and 2 open positions
/// gets `{botsStopped=3, ordersCancelled=7, positionsClosed=2}` on the first call, and
/// `{0,0,0}` on an immediate second call.
#[tokio::test]
async fn emergency_stop_is_idempotent_on_a_second_call() {
    let hooks = StatefulHooks { calls: AtomicUsize::new(0), orders: 7, positions: 2, bots: 3 };
    let stop = EmergencyStop::new(hooks);
    let user = Id::new();

    let first = stop.execute(user, "manual stop").await.unwrap();
    assert_eq!((first.orders_canceled, first.positions_closed, first.bots_stopped), (7, 2, 3));

    let second = stop.execute(user, "manual stop").await.unwrap();
    assert_eq!((second.orders_canceled, second.positions_closed, second.bots_stopped), (0, 0, 0));
}

mod backtest_determinism {
    use chrono::{TimeZone, Utc};
    use ferrotrade_backtest::{BacktestConfig, BacktestEngine, Candle, CommissionModel, SlippageModel};
    use ferrotrade_strategy::model::DcaParams;
    use ferrotrade_strategy::{build_strategy, StrategyConfig};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn candles() -> Vec<Candle> {
        (0..48i64)
            .map(|hour| {
                let open = dec!(40000) + Decimal::from(hour % 7) * dec!(25);
                Candle {
                    open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(hour),
                    open,
                    high: open + dec!(50),
                    low: open - dec!(50),
                    close: open + dec!(10),
                    volume: dec!(100),
                }
            })
            .collect()
    }

    fn config() -> BacktestConfig {
        let mut config = BacktestConfig::new("BTCUSDT", "1h", dec!(10000));
        config.commission = CommissionModel::Percentage(dec!(0.0004));
        config.slippage = SlippageModel::Random { bound_pct: dec!(0.001) };
        config.seed = 42;
        config
    }

    fn strategy_config() -> StrategyConfig {
        StrategyConfig::Dca(DcaParams {
            symbol: "BTCUSDT".to_string(),
            interval_seconds: 3600,
            notional_per_buy: dec!(500),
            max_position_size: dec!(0.5),
            take_profit_percent: dec!(2),
        })
    }

    /// Scenario 4: running the same backtest twice with the same seed produces a byte-identical
    /// equity curve and final statistics.
    #[test]
    fn backtest_run_twice_with_the_same_seed_is_byte_identical() {
        let run = || {
            let config = config();
            let strategy = build_strategy(&config.symbol, &strategy_config()).unwrap();
            let mut engine = BacktestEngine::new(config, strategy);
            engine.run(candles(), Arc::new(AtomicBool::new(false)), |_| {}).unwrap().unwrap()
        };

        let first = run();
        let second = run();

        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }
}

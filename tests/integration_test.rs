//! Engine integration tests over in-memory market data.
//!
//! Tests cover:
//! - The two-ticker take-profit walkthrough
//! - Days without any market data carrying equity forward
//! - Entry skips (insufficient funds, zero quantity, predictor failures)
//! - Exit rules (stop loss, time limit, holding through missing data)
//! - Forecast windows never reaching the decision day
//! - Reruns producing identical output

mod common;

use approx::assert_relative_eq;
use common::*;
use momtrader::domain::backtest::{BacktestEngine, RunState};
use momtrader::domain::execution::Side;
use momtrader::domain::metrics::PerformanceReport;
use momtrader::domain::trade::{ExitReason, replay_cash};

mod walkthrough {
    use super::*;

    fn ab_market() -> momtrader::domain::market_data::MarketData {
        market(vec![
            (
                "A",
                tagged_days(
                    1,
                    &[
                        (date(2025, 6, 13), 10.0, 10.0),
                        (date(2025, 6, 16), 10.0, 10.0),
                        (date(2025, 6, 17), 10.2, 10.2),
                    ],
                ),
            ),
            (
                "B",
                tagged_days(
                    2,
                    &[
                        (date(2025, 6, 13), 20.0, 20.0),
                        (date(2025, 6, 16), 20.0, 20.0),
                        (date(2025, 6, 17), 20.0, 20.0),
                    ],
                ),
            ),
        ])
    }

    fn ab_predictor() -> ScriptedPredictor {
        ScriptedPredictor::new(1).forecast(1, 0.05).forecast(2, 0.01)
    }

    #[test]
    fn buy_then_take_profit_next_day() {
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 17));
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&ab_market(), &ab_predictor()).unwrap();

        let buy = &result.trades[0];
        assert_eq!(buy.ticker, "A");
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.date, date(2025, 6, 16));
        assert_eq!(buy.quantity, 100);
        assert_relative_eq!(buy.fill_price, 10.0);

        let sell = &result.trades[1];
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.date, date(2025, 6, 17));
        assert_eq!(sell.quantity, 100);
        assert_relative_eq!(sell.fill_price, 10.2);
        let realized = sell.realized.as_ref().unwrap();
        assert_eq!(realized.reason, ExitReason::TakeProfit);
        assert_relative_eq!(realized.pnl_value, 20.0, epsilon = 1e-9);
        assert_relative_eq!(realized.pnl_pct, 0.02, epsilon = 1e-9);

        assert_relative_eq!(replay_cash(1000.0, &result.trades[..2]), 1020.0, epsilon = 1e-9);
        assert_relative_eq!(result.equity_curve[0].equity, 1000.0);
        assert_relative_eq!(result.equity_curve[1].equity, 1020.0, epsilon = 1e-9);
    }

    #[test]
    fn sells_are_logged_before_same_day_buys() {
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 17));
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&ab_market(), &ab_predictor()).unwrap();

        let same_day: Vec<Side> = result
            .trades
            .iter()
            .filter(|t| t.date == date(2025, 6, 17))
            .map(|t| t.side)
            .collect();
        assert_eq!(same_day, vec![Side::Sell, Side::Buy]);
    }

    #[test]
    fn rerun_is_identical() {
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 17));
        let engine = BacktestEngine::new(config).unwrap();
        let first = engine.run(&ab_market(), &ab_predictor()).unwrap();
        let second = engine.run(&ab_market(), &ab_predictor()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn report_profit_factor_infinite_with_only_wins() {
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 17));
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&ab_market(), &ab_predictor()).unwrap();
        let report = PerformanceReport::compute(&result.trades, &result.equity_curve);

        assert_eq!(report.sells, 1);
        assert_eq!(report.wins, 1);
        assert_eq!(report.profit_factor, Some(f64::INFINITY));
        assert_relative_eq!(report.win_rate.unwrap(), 1.0);
        assert_relative_eq!(report.total_return, 0.02, epsilon = 1e-9);
    }
}

mod missing_data {
    use super::*;

    #[test]
    fn day_without_any_data_repeats_equity() {
        let data = market(vec![(
            "A",
            tagged_days(
                1,
                &[
                    (date(2025, 6, 13), 10.0, 10.0),
                    (date(2025, 6, 16), 10.0, 10.0),
                    (date(2025, 6, 18), 10.0, 10.0),
                ],
            ),
        )]);
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 18));
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1).forecast(1, 0.05);
        let result = engine.run(&data, &predictor).unwrap();

        let dates: Vec<_> = result.equity_curve.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 6, 16), date(2025, 6, 17), date(2025, 6, 18)]
        );
        assert_relative_eq!(result.equity_curve[1].equity, result.equity_curve[0].equity);
        assert!(result.trades.iter().all(|t| t.date != date(2025, 6, 17)));
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn empty_first_day_records_initial_capital() {
        let data = market(vec![(
            "A",
            tagged_days(
                1,
                &[
                    (date(2025, 6, 13), 10.0, 10.0),
                    (date(2025, 6, 17), 10.0, 10.0),
                ],
            ),
        )]);
        let config = sample_config(&["A"], date(2025, 6, 16), date(2025, 6, 17));
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1);
        let mut run = engine.start(&data, &predictor).unwrap();

        let first = run.step().unwrap();
        assert!(first.carried_forward);
        assert_relative_eq!(first.equity, 1000.0);
        let second = run.step().unwrap();
        assert!(!second.carried_forward);
        assert_eq!(second.entries, 1);
        assert!(run.step().is_none());
        assert_eq!(run.state(), RunState::Finished);
    }

    #[test]
    fn weekends_are_not_processed() {
        let data = market(vec![("A", flat_days(1, date(2025, 6, 2), date(2025, 6, 30), 10.0))]);
        let config = sample_config(&["A"], date(2025, 6, 13), date(2025, 6, 16));
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&data, &ScriptedPredictor::new(1)).unwrap();

        let dates: Vec<_> = result.equity_curve.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2025, 6, 13), date(2025, 6, 16)]);
    }

    #[test]
    fn held_position_without_open_is_kept_and_marked_at_last_price() {
        let data = market(vec![
            (
                "A",
                tagged_days(
                    1,
                    &[
                        (date(2025, 6, 13), 10.0, 10.0),
                        (date(2025, 6, 16), 10.0, 10.0),
                        (date(2025, 6, 18), 10.0, 10.0),
                    ],
                ),
            ),
            ("B", flat_days(2, date(2025, 6, 13), date(2025, 6, 18), 20.0)),
        ]);
        let mut config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 18));
        config.max_hold_days = 1;
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1).forecast(1, 0.05).forecast(2, 0.01);
        let result = engine.run(&data, &predictor).unwrap();

        assert!(result.trades.iter().all(|t| t.date != date(2025, 6, 17)));
        assert_relative_eq!(result.equity_curve[1].equity, 1000.0);

        let sell = &result.trades[1];
        assert_eq!(sell.date, date(2025, 6, 18));
        assert_eq!(
            sell.realized.as_ref().unwrap().reason,
            ExitReason::TimeLimit
        );
    }
}

mod entries {
    use super::*;

    #[test]
    fn insufficient_funds_skips_candidate() {
        let data = market(vec![
            ("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
            ("B", flat_days(2, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
            ("C", flat_days(3, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
        ]);
        let mut config = sample_config(&["A", "B", "C"], date(2025, 6, 16), date(2025, 6, 16));
        config.portfolio_size = 2;
        config.transaction_cost_pct = 0.01;
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1)
            .forecast(1, 0.3)
            .forecast(2, 0.2)
            .forecast(3, 0.1);
        let result = engine.run(&data, &predictor).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].ticker, "A");
        assert_eq!(result.trades[0].quantity, 50);
        assert_relative_eq!(result.trades[0].transaction_cost, 5.0, epsilon = 1e-9);
        assert_relative_eq!(replay_cash(1000.0, &result.trades), 495.0, epsilon = 1e-9);
        assert_relative_eq!(result.equity_curve[0].equity, 995.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_quantity_candidate_skipped_within_slots() {
        let data = market(vec![
            ("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 16), 600.0)),
            ("B", flat_days(2, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
        ]);
        let mut config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 16));
        config.portfolio_size = 2;
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1).forecast(1, 0.3).forecast(2, 0.2);
        let result = engine.run(&data, &predictor).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].ticker, "B");
        assert_eq!(result.trades[0].quantity, 50);
    }

    #[test]
    fn zero_quantity_top_candidate_does_not_pull_in_next_ranked() {
        let data = market(vec![
            ("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 16), 2000.0)),
            ("B", flat_days(2, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
        ]);
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 16));
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1).forecast(1, 0.3).forecast(2, 0.2);
        let result = engine.run(&data, &predictor).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 1);
        assert_relative_eq!(result.equity_curve[0].equity, 1000.0);
    }

    #[test]
    fn top_candidate_without_open_does_not_pull_in_next_ranked() {
        let data = market(vec![
            ("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 13), 10.0)),
            ("B", flat_days(2, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
        ]);
        let config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 16));
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1).forecast(1, 0.3).forecast(2, 0.2);
        let result = engine.run(&data, &predictor).unwrap();

        assert!(result.trades.is_empty());
        assert_relative_eq!(result.equity_curve[0].equity, 1000.0);
    }

    #[test]
    fn failed_and_non_finite_forecasts_are_excluded() {
        let data = market(vec![
            ("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
            ("B", flat_days(2, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
            ("C", flat_days(3, date(2025, 6, 13), date(2025, 6, 16), 10.0)),
        ]);
        let config = sample_config(&["A", "B", "C"], date(2025, 6, 16), date(2025, 6, 16));
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = ScriptedPredictor::new(1)
            .failing(1)
            .forecast(2, -0.01)
            .forecast(3, f64::NAN);
        let result = engine.run(&data, &predictor).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].ticker, "B");
    }

    #[test]
    fn slippage_and_costs_apply_to_buy() {
        let data = market(vec![("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 16), 10.0))]);
        let mut config = sample_config(&["A"], date(2025, 6, 16), date(2025, 6, 16));
        config.portfolio_size = 2;
        config.slippage_pct = 0.01;
        config.transaction_cost_pct = 0.001;
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&data, &ScriptedPredictor::new(1)).unwrap();

        let buy = &result.trades[0];
        assert_relative_eq!(buy.nominal_price, 10.0);
        assert_relative_eq!(buy.fill_price, 10.1, epsilon = 1e-9);
        assert_eq!(buy.quantity, 49);
        assert_relative_eq!(buy.transaction_cost, 10.1 * 49.0 * 0.001, epsilon = 1e-9);
    }

    #[test]
    fn forecast_windows_end_before_decision_day() {
        let data = market(vec![
            ("A", flat_days(1, date(2025, 6, 2), date(2025, 6, 20), 10.0)),
            ("B", flat_days(2, date(2025, 6, 2), date(2025, 6, 20), 10.0)),
        ]);
        let mut config = sample_config(&["A", "B"], date(2025, 6, 16), date(2025, 6, 20));
        config.lookback_window = 3;
        config.take_profit_pct = 0.5;
        config.stop_loss_pct = 0.5;
        config.max_hold_days = 100;
        let engine = BacktestEngine::new(config).unwrap();
        let predictor = RecordingPredictor::new(3);
        let mut run = engine.start(&data, &predictor).unwrap();

        let mut checked = 0;
        while let Some(report) = run.step() {
            for window in predictor.take() {
                assert_eq!(window.len(), 3);
                assert!(window.iter().all(|d| *d < report.date));
                checked += 1;
            }
        }
        assert!(checked >= 5);
    }
}

mod exits {
    use super::*;

    #[test]
    fn stop_loss_sells_at_open() {
        let data = market(vec![(
            "A",
            tagged_days(
                1,
                &[
                    (date(2025, 6, 13), 10.0, 10.0),
                    (date(2025, 6, 16), 10.0, 10.0),
                    (date(2025, 6, 17), 9.5, 9.5),
                ],
            ),
        )]);
        let config = sample_config(&["A"], date(2025, 6, 16), date(2025, 6, 17));
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&data, &ScriptedPredictor::new(1)).unwrap();

        assert_eq!(result.trades.len(), 2);
        let realized = result.trades[1].realized.as_ref().unwrap();
        assert_eq!(realized.reason, ExitReason::StopLoss);
        assert_relative_eq!(realized.pnl_value, -50.0, epsilon = 1e-9);
        assert_relative_eq!(result.equity_curve[1].equity, 950.0, epsilon = 1e-9);
    }

    #[test]
    fn time_limit_uses_calendar_days() {
        let data = market(vec![("A", flat_days(1, date(2025, 6, 13), date(2025, 6, 20), 10.0))]);
        let mut config = sample_config(&["A"], date(2025, 6, 16), date(2025, 6, 18));
        config.max_hold_days = 2;
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&data, &ScriptedPredictor::new(1)).unwrap();

        let sells: Vec<_> = result.trades.iter().filter(|t| t.side == Side::Sell).collect();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].date, date(2025, 6, 18));
        let realized = sells[0].realized.as_ref().unwrap();
        assert_eq!(realized.reason, ExitReason::TimeLimit);
        assert_relative_eq!(realized.pnl_value, 0.0);
    }

    #[test]
    fn sell_costs_reduce_proceeds_but_not_pnl() {
        let data = market(vec![(
            "A",
            tagged_days(
                1,
                &[
                    (date(2025, 6, 13), 10.0, 10.0),
                    (date(2025, 6, 16), 10.0, 10.0),
                    (date(2025, 6, 17), 11.0, 11.0),
                ],
            ),
        )]);
        let mut config = sample_config(&["A"], date(2025, 6, 16), date(2025, 6, 17));
        config.portfolio_size = 2;
        config.transaction_cost_pct = 0.001;
        let engine = BacktestEngine::new(config).unwrap();
        let result = engine.run(&data, &ScriptedPredictor::new(1)).unwrap();

        let buy = &result.trades[0];
        let sell = &result.trades[1];
        assert_eq!(buy.quantity, 50);
        let realized = sell.realized.as_ref().unwrap();
        assert_relative_eq!(realized.pnl_value, 50.0, epsilon = 1e-9);
        assert_relative_eq!(sell.cash_delta(), 11.0 * 50.0 * 0.999, epsilon = 1e-9);
    }
}

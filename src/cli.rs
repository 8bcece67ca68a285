//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestEngine, BacktestResult};
use crate::domain::config_validation::{PredictorKind, RunConfig, load_run_config};
use crate::domain::error::MomtraderError;
use crate::domain::market_data::MarketData;
use crate::domain::metrics::PerformanceReport;
use crate::domain::predictor::MomentumPredictor;
use crate::domain::training::{TrainingParams, build_training_set, fit_linear};
use crate::domain::universe::load_universe;
use crate::ports::data_port::FeatureProvider;
use crate::ports::predictor_port::Predictor;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "momtrader", about = "Momentum portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for the universe or one ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest { config, dry_run } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, MomtraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    load_run_config(&adapter)
}

/// Everything a backtest produces.
pub struct PipelineOutput {
    pub result: BacktestResult,
    pub report: PerformanceReport,
    pub skipped: Vec<String>,
}

/// Load data, build the predictor, run the engine and write artifacts.
pub fn run_pipeline(
    provider: &dyn FeatureProvider,
    reporter: &dyn ReportPort,
    run_config: &RunConfig,
) -> Result<PipelineOutput, MomtraderError> {
    let bt = &run_config.backtest;
    let engine = BacktestEngine::new(bt.clone())?;

    let loaded = load_universe(
        provider,
        &bt.universe,
        NaiveDate::MIN,
        bt.end_date,
        bt.lookback_window,
    )?;
    let predictor = build_predictor(run_config, &loaded.data, &loaded.loaded)?;

    let result = engine.run(&loaded.data, predictor.as_ref())?;
    let report = PerformanceReport::compute(&result.trades, &result.equity_curve);

    if let Some(path) = &run_config.output.trades_path {
        reporter.write_trades(&result, path)?;
    }
    if let Some(path) = &run_config.output.equity_path {
        reporter.write_equity(&result, path)?;
    }

    Ok(PipelineOutput {
        result,
        report,
        skipped: loaded.skipped.into_iter().map(|s| s.ticker).collect(),
    })
}

/// Momentum needs no fitting; the linear model is trained on the
/// `training_years` before the start date only.
pub fn build_predictor(
    run_config: &RunConfig,
    data: &MarketData,
    tickers: &[String],
) -> Result<Box<dyn Predictor>, MomtraderError> {
    let bt = &run_config.backtest;
    match run_config.model.kind {
        PredictorKind::Momentum => Ok(Box::new(MomentumPredictor::new(bt.lookback_window))),
        PredictorKind::Linear => {
            let from = run_config
                .model
                .training_start(bt.start_date)
                .ok_or_else(|| {
                    MomtraderError::invalid("model", "training_years", "training window out of range")
                })?;
            eprintln!(
                "Training linear predictor on {} to {}",
                from,
                bt.start_date.pred_opt().unwrap_or(bt.start_date)
            );
            let set = build_training_set(data, tickers, from, bt.start_date, bt.lookback_window);
            let params = TrainingParams {
                lookback_window: bt.lookback_window,
                epochs: run_config.model.epochs,
                learning_rate: run_config.model.learning_rate,
            };
            let model = fit_linear(&set, &params, bt.start_date)?;
            Ok(Box::new(model))
        }
    }
}

fn run_backtest(config_path: &Path) -> Result<(), MomtraderError> {
    let run_config = load_config(config_path)?;
    let bt = &run_config.backtest;

    eprintln!(
        "Running backtest: {} tickers, {} to {}",
        bt.universe.len(),
        bt.start_date,
        bt.end_date
    );

    let provider = CsvAdapter::new(run_config.data_dir.clone());
    let output = run_pipeline(&provider, &CsvReportAdapter, &run_config)?;

    if !output.skipped.is_empty() {
        eprintln!("Skipped tickers: {}", output.skipped.join(", "));
    }
    print_summary(&output.report, &output.result);

    if let Some(path) = &run_config.output.trades_path {
        eprintln!("Trade log written to: {}", path.display());
    }
    if let Some(path) = &run_config.output.equity_path {
        eprintln!("Equity curve written to: {}", path.display());
    }
    Ok(())
}

fn fmt_optional(value: Option<f64>, scale: f64, suffix: &str) -> String {
    match value {
        Some(v) if v.is_infinite() => "inf".to_string(),
        Some(v) => format!("{:.2}{}", v * scale, suffix),
        None => "n/a".to_string(),
    }
}

pub fn print_summary(report: &PerformanceReport, result: &BacktestResult) {
    eprintln!("\n=== Backtest Results ===");
    if let (Some(start), Some(end)) = (report.start_date, report.end_date) {
        eprintln!("Period:           {} to {}", start, end);
    }
    eprintln!("Initial Equity:   {:.2}", report.initial_equity);
    eprintln!("Final Equity:     {:.2}", report.final_equity);
    eprintln!("Total Return:     {:.2}%", report.total_return * 100.0);
    eprintln!("Sharpe Ratio:     {}", fmt_optional(report.sharpe_ratio, 1.0, ""));
    eprintln!("Max Drawdown:     -{:.1}%", report.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", result.trades.len());
    eprintln!(
        "Sells:            {} ({} wins, {} losses)",
        report.sells, report.wins, report.losses
    );
    eprintln!("Win Rate:         {}", fmt_optional(report.win_rate, 100.0, "%"));
    eprintln!("Profit Factor:    {}", fmt_optional(report.profit_factor, 1.0, ""));
    eprintln!("Avg Win:          {}", fmt_optional(report.avg_win_pct, 100.0, "%"));
    eprintln!("Avg Loss:         {}", fmt_optional(report.avg_loss_pct, 100.0, "%"));
    eprintln!("Avg PnL / Sell:   {}", fmt_optional(report.avg_pnl, 1.0, ""));
    eprintln!("Total PnL:        {:.2}", report.total_pnl);
    eprintln!("Costs Paid:       {:.2}", report.total_transaction_costs);
}

fn run_dry_run(config_path: &Path) -> Result<(), MomtraderError> {
    let run_config = load_config(config_path)?;
    eprintln!("Config validated successfully");
    describe(&run_config);
    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MomtraderError> {
    let run_config = load_config(config_path)?;
    describe(&run_config);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn describe(run_config: &RunConfig) {
    let bt = &run_config.backtest;
    eprintln!("\nBacktest:");
    eprintln!("  period:          {} to {}", bt.start_date, bt.end_date);
    eprintln!("  universe:        {}", bt.universe.join(", "));
    eprintln!("  portfolio size:  {}", bt.portfolio_size);
    eprintln!("  per-slot target: {:.2}", bt.target_investment_per_slot());
    eprintln!(
        "  exits:           TP {:.2}%, SL {:.2}%, max {} days",
        bt.take_profit_pct * 100.0,
        bt.stop_loss_pct * 100.0,
        bt.max_hold_days
    );
    eprintln!(
        "  costs:           {:.3}% per side, {:.3}% slippage",
        bt.transaction_cost_pct * 100.0,
        bt.slippage_pct * 100.0
    );
    eprintln!("\nModel:");
    match run_config.model.kind {
        PredictorKind::Momentum => {
            eprintln!("  momentum, lookback {}", bt.lookback_window)
        }
        PredictorKind::Linear => eprintln!(
            "  linear, lookback {}, {} training years, {} epochs, learning rate {}",
            bt.lookback_window,
            run_config.model.training_years,
            run_config.model.epochs,
            run_config.model.learning_rate
        ),
    }
    eprintln!("\nData directory: {}", run_config.data_dir.display());
}

fn run_info(config_path: &Path, ticker: Option<&str>) -> Result<(), MomtraderError> {
    let run_config = load_config(config_path)?;
    let provider = CsvAdapter::new(run_config.data_dir.clone());

    let tickers = match ticker {
        Some(t) => vec![t.trim().to_uppercase()],
        None => run_config.backtest.universe.clone(),
    };

    for t in &tickers {
        match provider.data_range(t)? {
            Some((min_date, max_date, count)) => {
                println!("{}: {} rows, {} to {}", t, count, min_date, max_date);
            }
            None => {
                eprintln!("{}: no data found", t);
            }
        }
    }
    Ok(())
}

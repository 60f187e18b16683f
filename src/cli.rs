//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{simulate, CostBasis, CostModel, SimulationResult};
use crate::domain::combine::{combine, CombineMode, Decisions};
use crate::domain::config_validation::{
    parse_optional_date, validate_backtest_config, validate_signal_config,
};
use crate::domain::error::SignalbenchError;
use crate::domain::indicator::MaType;
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::domain::ranker::{rank_with_costs, RankingRow, RankingTable};
use crate::domain::signal_gen::{
    build_signals, in_ranking_order, streams, CciParams, ModelOutput, OttParams, RsiParams,
    SignalParams, TmaParams, DEFAULT_MODELS,
};
use crate::domain::signal_model::{parse_models, SignalModel};
use crate::domain::symbol::symbol_meta;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportPort, RunReport};

/// A backtest needs at least one return.
pub const MIN_PRICE_BARS: usize = 2;

#[derive(Parser, Debug)]
#[command(
    name = "signalbench",
    about = "Combine trading signals and backtest them long-only"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one signal combination and report its metrics
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        /// Write the daily series to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank every model subset under ANY, ALL and VOTE policies
    Rank {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Show only the first N rows
        #[arg(long)]
        top: Option<usize>,
        /// Backtest the best row after ranking
        #[arg(long)]
        apply_best: bool,
    },
    /// Show the latest indicator values and signal flags per model
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, default_value_t = 5)]
        last: usize,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    #[arg(long)]
    pub symbol: Option<String>,
    /// NONE, ANY, ALL, VOTE or "VOTE k"
    #[arg(long)]
    pub mode: Option<String>,
    #[arg(long)]
    pub vote_k: Option<usize>,
    #[arg(long)]
    pub fee_bps: Option<u32>,
}

/// Everything a run needs, resolved from config and overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_dir: PathBuf,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub models: Vec<SignalModel>,
    pub mode: CombineMode,
    pub costs: CostModel,
    pub periods_per_year: u32,
    pub initial_capital: f64,
}

/// Bars and the price view the engine runs on.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub bars: Vec<OhlcvBar>,
    pub prices: PriceSeries,
}

#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub prices: PriceSeries,
    pub decisions: Decisions,
    pub result: SimulationResult,
    pub metrics: Metrics,
    pub buy_and_hold: f64,
    pub final_value: f64,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            overrides,
            output,
        } => run_backtest(&config, &overrides, output.as_deref()),
        Command::Rank {
            config,
            symbol,
            top,
            apply_best,
        } => run_rank(&config, symbol, top, apply_best),
        Command::Signals {
            config,
            symbol,
            last,
        } => run_signals(&config, symbol, last),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: SignalbenchError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Load and fully validate a config file.
fn load_validated(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    validate_backtest_config(&adapter).map_err(fail)?;
    validate_signal_config(&adapter).map_err(fail)?;
    Ok(adapter)
}

/// Resolve the combination policy from a mode string and an optional vote
/// threshold. The threshold only applies to a bare `VOTE`.
pub fn resolve_mode(
    mode: Option<&str>,
    vote_k: Option<usize>,
) -> Result<CombineMode, SignalbenchError> {
    let mode = match mode {
        Some(m) => m.parse()?,
        None => CombineMode::None,
    };
    Ok(match (mode, vote_k) {
        (CombineMode::Vote(None), Some(k)) => CombineMode::Vote(Some(k)),
        (mode, _) => mode,
    })
}

fn config_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SignalbenchError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| SignalbenchError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{key} must be non-negative"),
    })
}

fn config_u32(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: u32,
) -> Result<u32, SignalbenchError> {
    let value = config.get_int(section, key, i64::from(default));
    u32::try_from(value).map_err(|_| SignalbenchError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: format!("{key} is out of range"),
    })
}

fn config_vote_k(config: &dyn ConfigPort) -> Result<Option<usize>, SignalbenchError> {
    match config.get_string("backtest", "vote_k") {
        Some(_) => config_usize(config, "backtest", "vote_k", 0).map(Some),
        None => Ok(None),
    }
}

fn config_ma(config: &dyn ConfigPort, section: &str) -> Result<MaType, SignalbenchError> {
    match config.get_string(section, "ma") {
        None => Ok(MaType::default()),
        Some(s) => s.parse().map_err(|reason| SignalbenchError::ConfigInvalid {
            section: section.into(),
            key: "ma".into(),
            reason,
        }),
    }
}

pub fn build_run_settings(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<RunSettings, SignalbenchError> {
    let symbol = overrides
        .symbol
        .clone()
        .or_else(|| config.get_string("data", "symbol"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SignalbenchError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        })?;

    let models = match config.get_string("signals", "models") {
        Some(list) => parse_models(&list).map_err(|e| SignalbenchError::ConfigInvalid {
            section: "signals".into(),
            key: "models".into(),
            reason: e.to_string(),
        })?,
        None => DEFAULT_MODELS.to_vec(),
    };

    let mode_str = overrides
        .mode
        .clone()
        .or_else(|| config.get_string("backtest", "mode"));
    let vote_k = match overrides.vote_k {
        Some(k) => Some(k),
        None => config_vote_k(config)?,
    };
    let mode = resolve_mode(mode_str.as_deref(), vote_k)?;

    let basis = match config.get_string("backtest", "cost_basis") {
        Some(s) => s
            .parse::<CostBasis>()
            .map_err(|reason| SignalbenchError::ConfigInvalid {
                section: "backtest".into(),
                key: "cost_basis".into(),
                reason,
            })?,
        None => CostBasis::default(),
    };
    let fee_bps = match overrides.fee_bps {
        Some(fee) => fee,
        None => config_u32(config, "backtest", "fee_bps", 20)?,
    };
    let slip_bps = config_u32(config, "backtest", "slip_bps", 0)?;

    Ok(RunSettings {
        data_dir: PathBuf::from(
            config
                .get_string("data", "dir")
                .unwrap_or_else(|| "data".to_string()),
        ),
        symbol,
        start_date: parse_optional_date(config, "start_date")?,
        end_date: parse_optional_date(config, "end_date")?,
        models,
        mode,
        costs: CostModel::new(fee_bps, slip_bps).with_basis(basis),
        periods_per_year: config_u32(config, "backtest", "periods_per_year", 252)?,
        initial_capital: config.get_double("backtest", "initial_capital", 10_000.0),
    })
}

pub fn build_signal_params(config: &dyn ConfigPort) -> Result<SignalParams, SignalbenchError> {
    let rsi_defaults = RsiParams::default();
    let cci_defaults = CciParams::default();
    let ott_defaults = OttParams::default();
    let tma_defaults = TmaParams::default();

    Ok(SignalParams {
        rsi: RsiParams {
            period: config_usize(config, "rsi", "n", rsi_defaults.period)?,
            overbought: config.get_double("rsi", "overbought", rsi_defaults.overbought),
            oversold: config.get_double("rsi", "oversold", rsi_defaults.oversold),
        },
        cci: CciParams {
            period: config_usize(config, "cci", "n", cci_defaults.period)?,
            upper: config.get_double("cci", "upper", cci_defaults.upper),
            lower: config.get_double("cci", "lower", cci_defaults.lower),
        },
        ott: OttParams {
            length: config_usize(config, "ott", "length", ott_defaults.length)?,
            percent: config.get_double("ott", "percent", ott_defaults.percent),
            ma: config_ma(config, "ott")?,
        },
        tma: TmaParams {
            fast: config_usize(config, "tma", "fast", tma_defaults.fast)?,
            mid: config_usize(config, "tma", "mid", tma_defaults.mid)?,
            slow: config_usize(config, "tma", "slow", tma_defaults.slow)?,
            ma: config_ma(config, "tma")?,
        },
    })
}

/// Fetch the configured window. Open ends of the window fall back to the
/// symbol's full data range.
pub fn load_series(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<LoadedSeries, SignalbenchError> {
    let symbol = settings.symbol.as_str();
    let (start, end) = match (settings.start_date, settings.end_date) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let (first, last, _) =
                data_port
                    .get_data_range(symbol)?
                    .ok_or_else(|| SignalbenchError::NoData {
                        symbol: symbol.to_string(),
                    })?;
            (start.unwrap_or(first), end.unwrap_or(last))
        }
    };

    info!(symbol, %start, %end, "fetching price data");
    let bars = data_port.fetch_ohlcv(symbol, start, end)?;
    if bars.is_empty() {
        return Err(SignalbenchError::NoData {
            symbol: symbol.to_string(),
        });
    }
    if bars.len() < MIN_PRICE_BARS {
        return Err(SignalbenchError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: MIN_PRICE_BARS,
        });
    }

    let prices = PriceSeries::from_bars(symbol, &bars)?;
    Ok(LoadedSeries { bars, prices })
}

/// Load data, generate signals, combine, simulate and measure.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
    params: &SignalParams,
) -> Result<BacktestOutcome, SignalbenchError> {
    let series = load_series(data_port, settings)?;
    let outputs = build_signals(&series.bars, params, &settings.models)?;
    let signals = streams(&outputs);

    info!(mode = %settings.mode, models = signals.len(), "combining signals");
    let decisions = combine(&signals, settings.mode, Some(series.prices.len()))?;
    let result = simulate(&series.prices.closes, &decisions, &settings.costs)?;
    let metrics = Metrics::from_simulation(&result, settings.periods_per_year);

    Ok(BacktestOutcome {
        buy_and_hold: series.prices.buy_and_hold_return(),
        final_value: result
            .equity_value(settings.initial_capital)
            .last()
            .copied()
            .unwrap_or(settings.initial_capital),
        prices: series.prices,
        decisions,
        result,
        metrics,
    })
}

/// Rank the configured models under the run's own costs, so the best row
/// re-runs to the same result.
pub fn run_rank_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
    params: &SignalParams,
) -> Result<RankingTable, SignalbenchError> {
    let series = load_series(data_port, settings)?;
    let models = in_ranking_order(&settings.models);
    let outputs = build_signals(&series.bars, params, &models)?;
    info!(models = outputs.len(), costs = ?settings.costs, "ranking combinations");
    rank_with_costs(&series.prices.closes, &streams(&outputs), &settings.costs)
}

/// Models and policy of a ranking row, for re-running it as a backtest.
pub fn selection_from_row(
    row: &RankingRow,
) -> Result<(Vec<SignalModel>, CombineMode), SignalbenchError> {
    let models = parse_models(&row.combo.join(",")).map_err(|e| SignalbenchError::Data {
        reason: format!("ranking row has an unknown model: {e}"),
    })?;
    Ok((models, row.mode))
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn model_list(models: &[SignalModel]) -> String {
    models
        .iter()
        .map(|m| m.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_outcome(settings: &RunSettings, outcome: &BacktestOutcome) {
    let meta = symbol_meta(&settings.symbol);
    let m = &outcome.metrics;

    println!("=== Results ===");
    println!(
        "Symbol:           {} ({}, {})",
        settings.symbol, meta.exchange, meta.currency
    );
    println!("Models:           {}", model_list(&settings.models));
    println!("Mode:             {}", settings.mode);
    if let (Some(first), Some(last)) = (outcome.prices.dates.first(), outcome.prices.dates.last())
    {
        println!("Period:           {} to {} ({} bars)", first, last, m.days);
    }
    println!("Total Return:     {}", pct(m.total_return));
    println!("CAGR:             {}", pct(m.cagr));
    println!("Max Drawdown:     {}", pct(m.max_drawdown));
    println!("Volatility:       {}", pct(m.volatility));
    println!(
        "Trades:           {} ({} open)",
        outcome.result.trade_count, outcome.result.open_trade_count
    );
    println!("Buy & Hold:       {}", pct(outcome.buy_and_hold));
    println!(
        "Final Value:      {:.2} {} (from {:.2})",
        outcome.final_value, meta.currency, settings.initial_capital
    );

    let trips = outcome.result.round_trips();
    if !trips.is_empty() {
        println!("\n=== Round Trips ===");
        for trip in &trips {
            let entry = outcome.prices.dates[trip.entry_index];
            let exit = outcome.prices.dates[trip.exit_index];
            let ret = outcome.prices.closes[trip.exit_index] / outcome.prices.closes[trip.entry_index]
                - 1.0;
            println!("  {} -> {}  {}", entry, exit, pct(ret));
        }
    }
}

fn print_ranking(table: &RankingTable, top: Option<usize>) {
    let shown = top.unwrap_or(table.len()).min(table.len());
    println!(
        "{:<28} {:<8} {:>6} {:>15}",
        "Combo", "Mode", "Trades", "TotalReturn(%)"
    );
    for row in &table.rows[..shown] {
        println!(
            "{:<28} {:<8} {:>6} {:>15.2}",
            row.combo_label(),
            row.mode.to_string(),
            row.trades,
            row.total_return_pct()
        );
    }
    if let Some(best) = table.best() {
        println!(
            "\nBest: {} ({}) {:.2}%",
            best.combo_label(),
            best.mode,
            best.total_return_pct()
        );
    }
}

fn print_signals(prices: &PriceSeries, outputs: &[ModelOutput], last: usize) {
    let start = prices.len().saturating_sub(last);
    for output in outputs {
        println!("\n=== {} ===", output.model);
        let columns: Vec<&str> = output.indicators.iter().map(|c| c.name).collect();
        println!(
            "{:<12} {:>12} {} {:>4} {:>4}",
            "date",
            "close",
            columns
                .iter()
                .map(|c| format!("{:>12}", c))
                .collect::<Vec<_>>()
                .join(" "),
            "buy",
            "sell"
        );
        for i in start..prices.len() {
            let values = output
                .indicators
                .iter()
                .map(|c| match c.values[i] {
                    Some(v) => format!("{:>12.4}", v),
                    None => format!("{:>12}", "-"),
                })
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "{:<12} {:>12.4} {} {:>4} {:>4}",
                prices.dates[i].to_string(),
                prices.closes[i],
                values,
                u8::from(output.stream.buy[i]),
                u8::from(output.stream.sell[i])
            );
        }
    }
}

fn run_backtest(config_path: &Path, overrides: &Overrides, output: Option<&Path>) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let settings = match build_run_settings(&adapter, overrides) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let params = match build_signal_params(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    eprintln!(
        "Running backtest: {} [{}] {}",
        settings.symbol,
        model_list(&settings.models),
        settings.mode
    );
    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let outcome = match run_backtest_pipeline(&data_port, &settings, &params) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    print_outcome(&settings, &outcome);

    if let Some(path) = output {
        let report = RunReport {
            prices: &outcome.prices,
            decisions: &outcome.decisions,
            result: &outcome.result,
        };
        if let Err(e) = CsvReportAdapter::new().write(&report, path) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_rank(
    config_path: &Path,
    symbol: Option<String>,
    top: Option<usize>,
    apply_best: bool,
) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let overrides = Overrides {
        symbol,
        ..Overrides::default()
    };
    let mut settings = match build_run_settings(&adapter, &overrides) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let params = match build_signal_params(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    eprintln!(
        "Ranking {} models on {}...",
        settings.models.len(),
        settings.symbol
    );
    let table = match run_rank_pipeline(&data_port, &settings, &params) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    print_ranking(&table, top);

    if !apply_best {
        return ExitCode::SUCCESS;
    }
    let Some(best) = table.best() else {
        eprintln!("No ranking rows to apply");
        return ExitCode::SUCCESS;
    };
    match selection_from_row(best) {
        Ok((models, mode)) => {
            settings.models = models;
            settings.mode = mode;
        }
        Err(e) => return fail(e),
    }

    println!();
    match run_backtest_pipeline(&data_port, &settings, &params) {
        Ok(outcome) => {
            print_outcome(&settings, &outcome);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_signals(config_path: &Path, symbol: Option<String>, last: usize) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let overrides = Overrides {
        symbol,
        ..Overrides::default()
    };
    let settings = match build_run_settings(&adapter, &overrides) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let params = match build_signal_params(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let series = match load_series(&data_port, &settings) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let outputs = match build_signals(&series.bars, &params, &settings.models) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    let meta = symbol_meta(&settings.symbol);
    println!(
        "{} ({}, {})",
        settings.symbol, meta.exchange, meta.currency
    );
    print_signals(&series.prices, &outputs, last);
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = config
        .get_string("data", "dir")
        .unwrap_or_else(|| "data".to_string());
    let adapter = CsvAdapter::new(PathBuf::from(&dir));

    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let params = match build_signal_params(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let models = match adapter.get_string("signals", "models") {
        Some(list) => match parse_models(&list) {
            Ok(m) => m,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(2);
            }
        },
        None => DEFAULT_MODELS.to_vec(),
    };
    let mode = match config_vote_k(&adapter).and_then(|vote_k| {
        resolve_mode(adapter.get_string("backtest", "mode").as_deref(), vote_k)
    }) {
        Ok(m) => m,
        Err(e) => return fail(e),
    };

    eprintln!("\nModels: {}", model_list(&models));
    eprintln!("Mode:   {}", mode);
    eprintln!(
        "RSI({}) {}/{}  CCI({}) {}/{}  OTT({},{},{})  TMA({},{},{},{})",
        params.rsi.period,
        params.rsi.oversold,
        params.rsi.overbought,
        params.cci.period,
        params.cci.lower,
        params.cci.upper,
        params.ott.length,
        params.ott.percent,
        params.ott.ma,
        params.tma.fast,
        params.tma.mid,
        params.tma.slow,
        params.tma.ma
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

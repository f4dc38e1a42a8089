use chrono::NaiveDate;
use rocsq_core::{ParameterCombination, PriceSeries, Universe};
use rocsq_runner::{load_synthetic, BacktestConfig, BacktestRunner, GridSearch, ParamGrid};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn synthetic() -> Universe {
    let symbols: Vec<String> = ["AAPL", "MSFT", "NVDA"].iter().map(|s| s.to_string()).collect();
    load_synthetic(&symbols, start(), NaiveDate::from_ymd_opt(2023, 12, 29).unwrap()).universe
}

fn grid_search() -> GridSearch {
    GridSearch::new(BacktestRunner::new(BacktestConfig::default()).unwrap())
}

#[test]
fn two_by_two_grid_yields_four_distinct_results() {
    let results = grid_search()
        .search(&synthetic(), &ParamGrid::new(vec![10, 20], vec![5, 10]))
        .unwrap();

    assert_eq!(results.len(), 4);
    let mut params: Vec<ParameterCombination> =
        results.ranked().iter().map(|r| r.parameters).collect();
    params.sort();
    params.dedup();
    assert_eq!(params.len(), 4);

    for pair in results.ranked().windows(2) {
        assert!(pair[0].metrics.total_return >= pair[1].metrics.total_return);
    }
    let winner = results.winner().unwrap();
    assert_eq!(winner.metrics.total_return, results.ranked()[0].metrics.total_return);
}

#[test]
fn default_grid_covers_nine_combinations() {
    let results = grid_search().search(&synthetic(), &ParamGrid::default()).unwrap();
    assert_eq!(results.len(), 9);
    assert!(results.ranked().iter().all(|r| r.failed_instruments.is_empty()));
}

#[test]
fn duplicate_candidates_collapse() {
    let results = grid_search()
        .search(&synthetic(), &ParamGrid::new(vec![10, 10, 20], vec![5, 5]))
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn flat_universe_gives_zero_trade_results() {
    let universe: Universe = vec![
        PriceSeries::from_closes("FLAT1", start(), &[50.0; 50]),
        PriceSeries::from_closes("FLAT2", start(), &[20.0; 50]),
    ]
    .into_iter()
    .collect();

    let results = grid_search()
        .search(&universe, &ParamGrid::new(vec![5, 10], vec![3, 7]))
        .unwrap();
    assert_eq!(results.len(), 4);
    for r in results.ranked() {
        assert_eq!(r.metrics.num_trades, 0);
        assert_eq!(r.metrics.total_return, 0.0);
        assert_eq!(r.metrics.sharpe_ratio, 0.0);
        assert_eq!(r.metrics.max_drawdown, 0.0);
        assert!(r.trade_log.is_empty());
    }
    // All tied on return and Sharpe: parameter order decides.
    assert_eq!(
        results.best_parameters(),
        Some(ParameterCombination::new(5, 3).unwrap())
    );
}

#[test]
fn lookback_longer_than_history_is_not_an_error() {
    let universe: Universe = vec![PriceSeries::from_closes("SHORT", start(), &[10.0, 11.0, 12.0])]
        .into_iter()
        .collect();
    let results = grid_search()
        .search(&universe, &ParamGrid::new(vec![30], vec![5]))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.ranked()[0].metrics.num_trades, 0);
}

//! Collect → normalize → merge → features → simulate, all in memory.

use std::sync::Arc;

use chrono::NaiveDate;
use minutegym_core::calendar::{session_minutes, CalendarBuilder};
use minutegym_core::data::csv_io::{read_series, write_series};
use minutegym_core::data::{
    anomaly_report, collect_symbol, generate_sessions, resample_minutes, InMemoryProvider,
    NullProgress, RawTable, SyntheticParams,
};
use minutegym_core::features::FeatureSet;
use minutegym_core::rng::RngHierarchy;
use minutegym_core::sim::{
    evaluate_random_seeds, run_episode, MarketSimulator, SimulatorConfig, SmaCrossPolicy,
};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

/// One akshare-style day: Chinese labels, time-of-day only, a stray bar from
/// the previous evening and one unparseable price.
fn raw_day(day: NaiveDate, base: f64) -> RawTable {
    let mut text = String::from("时间,开盘,最高,最低,收盘,成交量\n");
    text.push_str(&format!(
        "{} 14:59:00,1,1,1,1,1\n",
        day.pred_opt().unwrap().format("%Y-%m-%d")
    ));
    for (i, ts) in session_minutes(day).iter().enumerate() {
        let p = base + (i as f64 * 0.05).sin();
        text.push_str(&format!(
            "{},{p},{},{},{p},{}\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            p + 0.1,
            p - 0.1,
            100 + i % 50
        ));
    }
    text.push_str(&format!("{} 15:00:00,--,1,1,1,1\n", day.format("%Y-%m-%d")));
    RawTable::from_csv_str(&text).unwrap()
}

#[test]
fn collect_then_simulate() {
    // Thu 2nd, Fri 3rd, Mon 6th; nothing under the sh prefix
    let provider = InMemoryProvider::new()
        .with_day("sz000001", date(2), raw_day(date(2), 10.0))
        .with_day("sz000001", date(3), raw_day(date(3), 10.5))
        .with_day("sz000001", date(6), raw_day(date(6), 11.0));

    let collected = collect_symbol(&provider, "000001", date(2), date(6), &NullProgress).unwrap();
    assert_eq!(collected.prefix, "sz");
    assert!(collected.summary.all_succeeded());

    let series = collected.series;
    assert_eq!(series.len(), 3 * 242);
    assert_eq!(series.days(), vec![date(2), date(3), date(6)]);
    assert!(anomaly_report(&series).unwrap().is_empty());

    // flat file round trip keeps the series intact
    let mut buf = Vec::new();
    write_series(&series, &mut buf).unwrap();
    assert_eq!(read_series(buf.as_slice()).unwrap(), series);

    // 5-minute bars: 24 full buckets plus the lone closing minute, per half-session
    let five = resample_minutes(&series, 5).unwrap();
    assert_eq!(five.len(), 3 * 50);
    let volume = |s: &minutegym_core::OhlcvSeries| s.iter().map(|b| b.volume).sum::<f64>();
    assert_eq!(volume(&five), volume(&series));

    let fs = FeatureSet::from_series(&series, 5, 20).unwrap();
    assert_eq!(fs.len(), series.len() - 19);

    let config = SimulatorConfig {
        window: 30,
        transaction_cost: 0.0005,
    };
    let (features, prices) = fs.into_parts();
    let features = Arc::new(features);
    let prices: Arc<[f64]> = Arc::from(prices);

    let mut sim = MarketSimulator::from_shared(features.clone(), prices.clone(), config).unwrap();
    let summary = run_episode(&mut sim, &mut SmaCrossPolicy).unwrap();
    assert_eq!(summary.steps, prices.len() - 30);
    assert!(summary.trades > 0);
    assert!(summary.final_equity.is_finite());

    let hierarchy = RngHierarchy::new(42);
    let seeds: Vec<u64> = (0..8).map(|i| hierarchy.sub_seed("policy", i)).collect();
    let a = evaluate_random_seeds(features.clone(), prices.clone(), config, &seeds).unwrap();
    let b = evaluate_random_seeds(features, prices, config, &seeds).unwrap();
    assert_eq!(a, b);
    assert!(a.iter().all(|(_, s)| s.steps == summary.steps));
}

#[test]
fn synthetic_sessions_feed_the_simulator() {
    let mut rng = RngHierarchy::new(42).rng_for("synthetic", 0);
    let series = generate_sessions(
        &CalendarBuilder::default(),
        date(2),
        2,
        SyntheticParams::default(),
        &mut rng,
    )
    .unwrap();
    let fs = FeatureSet::from_series(&series, 5, 20).unwrap();
    let (features, prices) = fs.into_parts();
    let mut sim = MarketSimulator::new(features, prices, SimulatorConfig::default()).unwrap();
    let summary = run_episode(&mut sim, &mut SmaCrossPolicy).unwrap();
    assert_eq!(summary.steps, 2 * 242 - 19 - 30);
}

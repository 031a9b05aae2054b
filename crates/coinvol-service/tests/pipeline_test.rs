//! End-to-end pipeline tests.
//!
//! Ingestion writer -> observation store -> change feed -> window
//! aggregator -> statistic store -> query service, with change events
//! delivered by hand so interleavings are deterministic.

mod integration;
use integration::common::pipeline::{id, quote, Pipeline};

use coinvol_aggregator::WritePolicy;
use coinvol_core::PriceObservation;
use coinvol_store::ObservationStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn assert_close(actual: Decimal, expected: Decimal) {
    let diff = (actual - expected).abs();
    assert!(diff < dec!(0.000000000000000001), "{actual} != {expected}");
}

/// Three batches 60s apart; every instrument's three prices are symmetric
/// around a centre, so the sample stddev at 1000 equals the offset.
fn seed_three_batches(p: &mut Pipeline) {
    p.ingest(
        &[
            quote("a/usd", dec!(97.5)),
            quote("b/usd", dec!(92.9)),
            quote("c/usd", dec!(9.7)),
        ],
        880,
    );
    p.ingest(
        &[
            quote("a/usd", dec!(100)),
            quote("b/usd", dec!(100)),
            quote("c/usd", dec!(10)),
        ],
        940,
    );
    p.ingest(
        &[
            quote("a/usd", dec!(102.5)),
            quote("b/usd", dec!(107.1)),
            quote("c/usd", dec!(10.3)),
            quote("e/usd", dec!(1)),
        ],
        1000,
    );
}

#[test]
fn test_ranks_latest_batch_descending() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    seed_three_batches(&mut p);
    let report = p.drain();

    // 880: three skips; 940: three writes; 1000: three writes + e skipped
    assert_eq!(report.written, 6);
    assert_eq!(report.skipped, 4);
    assert_eq!(report.failed, 0);

    let rows = p.query.rank_top(2).unwrap();
    let pairs: Vec<_> = rows.iter().map(|r| r.instrument.as_str()).collect();
    assert_eq!(pairs, vec!["b/usd", "a/usd"]);
    assert_close(rows[0].statistic.inner(), dec!(7.1));
    assert_close(rows[1].statistic.inner(), dec!(2.5));
    assert!(rows.iter().all(|r| r.batch == 1000));

    let all = p.query.rank_top(100).unwrap();
    assert_eq!(all.len(), 3);
    assert_close(all[2].statistic.inner(), dec!(0.3));
}

#[test]
fn test_single_observation_instrument_never_served() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    seed_three_batches(&mut p);
    p.drain();

    assert!(p.query.get_one(&id("e/usd")).unwrap().is_none());
    assert!(p
        .query
        .rank_top(100)
        .unwrap()
        .iter()
        .all(|r| r.instrument.as_str() != "e/usd"));
}

#[test]
fn test_marker_ahead_of_append_reads_absent() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    seed_three_batches(&mut p);
    p.drain();

    // marker for 1060 visible, d/usd not appended yet
    p.marker.publish(1060).unwrap();
    assert!(p.query.get_one(&id("d/usd")).unwrap().is_none());
    assert!(p.query.rank_top(10).unwrap().is_empty());
    assert!(p.query.get_one(&id("a/usd")).unwrap().is_none());

    for (time, price) in [(940, dec!(4)), (1060, dec!(6))] {
        p.observations
            .append(PriceObservation::new(
                id("d/usd"),
                time,
                coinvol_core::Price::new(price),
            ))
            .unwrap();
    }
    p.drain();

    let d = p.query.get_one(&id("d/usd")).unwrap().unwrap();
    assert_eq!(d.batch, 1060);
    assert_close(d.statistic.inner(), dec!(1.4142135623730950488));
}

#[test]
fn test_previous_batch_hidden_until_aggregated() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    seed_three_batches(&mut p);
    p.drain();

    p.ingest(&[quote("a/usd", dec!(100))], 1060);
    assert!(p.query.get_one(&id("a/usd")).unwrap().is_none());
    assert!(p.query.get_one(&id("b/usd")).unwrap().is_none());

    p.drain();
    let a = p.query.get_one(&id("a/usd")).unwrap().unwrap();
    assert_eq!(a.batch, 1060);
    // b/usd was not in the 1060 batch and stays stale
    assert!(p.query.get_one(&id("b/usd")).unwrap().is_none());
    assert_eq!(p.query.rank_top(10).unwrap().len(), 1);
}

#[test]
fn test_redelivery_is_idempotent() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    seed_three_batches(&mut p);
    let events = p.take_events();

    p.aggregator.process_batch(events.clone());
    let first = p.query.rank_top(10).unwrap();

    let report = p.aggregator.process_batch(events);
    assert_eq!(report.rejected_stale, 3, "older batches lose to the stored 1000");
    assert_eq!(p.query.rank_top(10).unwrap(), first);
}

#[test]
fn test_out_of_order_delivery_conditional() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    seed_three_batches(&mut p);
    let mut events = p.take_events();
    events.reverse();

    let report = p.aggregator.process_batch(events);
    assert_eq!(report.rejected_stale, 3);

    let a = p.query.get_one(&id("a/usd")).unwrap().unwrap();
    assert_eq!(a.batch, 1000);
    assert_close(a.statistic.inner(), dec!(2.5));
}

#[test]
fn test_out_of_order_delivery_last_write_wins() {
    let mut p = Pipeline::new(WritePolicy::LastWriteWins);
    seed_three_batches(&mut p);
    let mut events = p.take_events();
    events.reverse();

    let report = p.aggregator.process_batch(events);
    assert_eq!(report.rejected_stale, 0);

    // the 940 computation landed last and is stale for the 1000 marker
    assert!(p.query.get_one(&id("a/usd")).unwrap().is_none());
    assert!(p.query.rank_top(10).unwrap().is_empty());
}

#[test]
fn test_partial_append_never_converges() {
    let mut p = Pipeline::refusing(&["c/usd"]);
    seed_three_batches(&mut p);

    let view = p.query.batch_status().unwrap();
    let status = view.progress.clone().unwrap();
    assert_eq!(view.time, 1000);
    assert_eq!(status.expected, 4);
    assert_eq!(status.failed_appends, 1);
    assert!(!view.converged);

    p.drain();
    let view = p.query.batch_status().unwrap();
    let status = view.progress.unwrap();
    assert_eq!(status.written, 2);
    assert_eq!(status.skipped, 1);
    assert!(status.is_settled());
    assert!(!view.converged);

    let pairs: Vec<_> = p
        .query
        .rank_top(10)
        .unwrap()
        .into_iter()
        .map(|r| r.instrument)
        .collect();
    assert_eq!(pairs, vec![id("b/usd"), id("a/usd")]);
}

#[test]
fn test_full_batch_converges() {
    let mut p = Pipeline::new(WritePolicy::Conditional);
    p.ingest(&[quote("a/usd", dec!(1))], 940);
    p.ingest(&[quote("a/usd", dec!(3))], 1000);

    assert!(!p.query.batch_status().unwrap().converged);
    p.drain();
    assert!(p.query.batch_status().unwrap().converged);
    assert_eq!(p.progress.status(1000).unwrap().pending(), 0);
}

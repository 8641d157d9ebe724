//! Drives a completed bar stream through the Signal/matching/ledger
//! pipeline for one job, publishing progress onto its `Topic::Backtest`
//! topic and updating the job registry as it goes.
//!
//! The worker removes its own entry from the registry's in-flight set on
//! every exit — completed, failed, or cancelled — so cancellation can
//! never race a job into lingering forever in the in-flight set.

use std::sync::atomic::Ordering;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use qtk_eventbus::{Event, EventBus, Topic};
use qtk_matching::{Fill as MatchingFill, MatchingEngine};
use qtk_portfolio::{Ledger, MICROS_SCALE};
use qtk_runtime::{fill_to_ledger_fill, signal_to_order_request, LedgerEquityView};
use qtk_strategy::{EventStrategy, MarketEvent};

use crate::types::BacktestBar;

use super::job::TradeLogEntry;
use super::metrics::compute_metrics;
use super::registry::JobRegistry;

enum StopReason {
    Cancelled,
    Failed(String),
}

fn bar_to_event(bar: &BacktestBar) -> MarketEvent {
    MarketEvent::Bar {
        symbol: bar.symbol.clone(),
        open: bar.open_micros as f64 / MICROS_SCALE as f64,
        high: bar.high_micros as f64 / MICROS_SCALE as f64,
        low: bar.low_micros as f64 / MICROS_SCALE as f64,
        close: bar.close_micros as f64 / MICROS_SCALE as f64,
        volume: bar.volume as f64,
        end_ts_ms: bar.end_ts * 1000,
    }
}

/// Runs `job_id` to completion (or cancellation/failure) over `bars`,
/// driving `strategy` one bar at a time. `bars` is assumed pre-filtered to
/// the job's requested date range; incomplete bars are skipped, matching
/// the reject-window convention the legacy replay engine also honors.
pub async fn run_job(
    registry: JobRegistry,
    bus: EventBus,
    job_id: Uuid,
    mut strategy: impl EventStrategy,
    bars: Vec<BacktestBar>,
) {
    let topic = Topic::Backtest(job_id.to_string());

    let Some(job) = registry.get(job_id).await else {
        return;
    };
    let initial_equity = job.request.initial_equity;

    registry.update(job_id, |j| j.set_running(Utc::now())).await;
    publish_progress(&bus, &topic, 0.0).await;

    let cancel_flag = registry.cancel_flag(job_id).await;

    let mut matching = MatchingEngine::default();
    let mut ledger = Ledger::new((initial_equity * MICROS_SCALE as f64).round() as i64);

    {
        let equity = LedgerEquityView::new(&ledger, &matching);
        strategy.on_start(&equity);
    }

    let mut trade_log: Vec<TradeLogEntry> = Vec::new();
    let mut equity_curve: Vec<f64> = vec![initial_equity];
    let mut last_realized_micros: i64 = 0;
    let total_bars = bars.iter().filter(|b| b.is_complete).count().max(1);
    let mut processed = 0usize;
    let mut stop_reason: Option<StopReason> = None;

    for bar in &bars {
        if let Some(flag) = &cancel_flag {
            if flag.load(Ordering::SeqCst) {
                stop_reason = Some(StopReason::Cancelled);
                break;
            }
        }
        if !bar.is_complete {
            continue;
        }

        let tick = processed as u64;
        let reference_price = bar.close_micros as f64 / MICROS_SCALE as f64;

        let price_fills = matching.on_price(&bar.symbol, reference_price, tick);
        if let Err(reason) = apply_fills(
            &mut ledger,
            &mut trade_log,
            &mut last_realized_micros,
            &price_fills,
        ) {
            stop_reason = Some(StopReason::Failed(reason));
            break;
        }

        let event = bar_to_event(bar);
        let signals = {
            let equity = LedgerEquityView::new(&ledger, &matching);
            strategy.on_bar(&event, &equity)
        };

        let mut submit_failed = false;
        for signal in &signals {
            let Some(price) = matching.last_price(&signal.symbol) else {
                continue;
            };
            let req = {
                let equity = LedgerEquityView::new(&ledger, &matching);
                signal_to_order_request(signal, price, &equity)
            };
            let Some(req) = req else { continue };

            let ids = match matching.submit(req, tick) {
                Ok(ids) => ids,
                Err(e) => {
                    stop_reason = Some(StopReason::Failed(format!("matching rejected order: {e:?}")));
                    submit_failed = true;
                    break;
                }
            };

            let signal_fills: Vec<MatchingFill> = matching
                .filled_orders()
                .filter(|o| ids.contains(&o.id) && o.filled_tick == Some(tick))
                .map(|o| MatchingFill {
                    order_id: o.id,
                    instrument: o.instrument.clone(),
                    side: o.side,
                    qty: o.fill_qty,
                    price: o.fill_price.unwrap_or(0.0),
                    fee: o.fee,
                    is_taker: true,
                    tick,
                })
                .collect();

            if let Err(reason) = apply_fills(
                &mut ledger,
                &mut trade_log,
                &mut last_realized_micros,
                &signal_fills,
            ) {
                stop_reason = Some(StopReason::Failed(reason));
                submit_failed = true;
                break;
            }
        }
        if submit_failed {
            break;
        }

        let equity_now = LedgerEquityView::new(&ledger, &matching).total_equity();
        equity_curve.push(equity_now);

        processed += 1;
        let progress = processed as f64 / total_bars as f64;
        registry.update(job_id, |j| j.set_progress(progress)).await;
        publish_progress(&bus, &topic, progress).await;
    }

    match stop_reason {
        None => {
            let pnls: Vec<f64> = trade_log.iter().map(|t| t.pnl).collect();
            let metrics = compute_metrics(initial_equity, &equity_curve, &pnls);
            registry
                .update(job_id, |j| {
                    j.trade_log = trade_log.clone();
                    j.equity_curve = equity_curve.clone();
                    j.complete(metrics.clone(), Utc::now());
                })
                .await;
            publish_progress(&bus, &topic, 1.0).await;
            bus.publish(
                &topic,
                Event::new(
                    "backtest.completed",
                    json!({ "job_id": job_id.to_string() }),
                    Utc::now(),
                ),
            )
            .await;
        }
        Some(StopReason::Cancelled) => {
            registry.update(job_id, |j| j.cancel(Utc::now())).await;
        }
        Some(StopReason::Failed(reason)) => {
            registry
                .update(job_id, |j| j.fail(reason.clone(), Utc::now()))
                .await;
            bus.publish(
                &topic,
                Event::new(
                    "backtest.failed",
                    json!({ "job_id": job_id.to_string(), "error": reason }),
                    Utc::now(),
                ),
            )
            .await;
        }
    }

    registry.remove_in_flight(job_id).await;
}

fn apply_fills(
    ledger: &mut Ledger,
    trade_log: &mut Vec<TradeLogEntry>,
    last_realized_micros: &mut i64,
    fills: &[MatchingFill],
) -> Result<(), String> {
    for fill in fills {
        let ledger_fill = fill_to_ledger_fill(fill);
        ledger
            .append_fill(ledger_fill)
            .map_err(|e| format!("ledger rejected fill: {e}"))?;

        let realized = ledger.realized_pnl_micros();
        let pnl = (realized - *last_realized_micros) as f64 / MICROS_SCALE as f64;
        *last_realized_micros = realized;

        let side = match fill.side {
            qtk_matching::Side::Buy => "buy",
            qtk_matching::Side::Sell => "sell",
        };
        trade_log.push(TradeLogEntry {
            symbol: fill.instrument.clone(),
            side: side.to_string(),
            qty: fill.qty,
            price: fill.price,
            fee: fill.fee,
            pnl,
            tick: fill.tick,
        });
    }
    Ok(())
}

async fn publish_progress(bus: &EventBus, topic: &Topic, progress: f64) {
    bus.publish(
        topic,
        Event::new(
            "backtest.progress",
            json!({ "progress": progress }),
            Utc::now(),
        ),
    )
    .await;
}

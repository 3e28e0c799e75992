mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use cardbook::clock::FixedClock;
use cardbook::models::{CardState, MovementKind, SequentialIdGenerator};
use cardbook::reconcile::Reconciler;
use cardbook::storage::{MemorySnapshotStore, SnapshotStore};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use support::{billed, date, dec, statement, summary, unbilled, MockSource};

fn reconciler(source: Arc<MockSource>) -> Reconciler {
    Reconciler::new(source)
        .with_clock(Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 25, 15, 0, 0).unwrap(),
        )))
        .with_id_generator(Arc::new(SequentialIdGenerator::new()))
}

fn pending_card(source: MockSource, id: &str) -> MockSource {
    source
        .with_card(id, vec![date(2024, 4, 20), date(2024, 3, 20)])
        .with_unbilled(
            id,
            vec![
                unbilled("5990", "NAC", "NETFLIX COM", "0", "0"),
                unbilled("60000", "NAC", "FALABELLA", "1", "6"),
                unbilled("9.99", "INT", "SPOTIFY", "0", "0"),
                unbilled("-5990", "NAC", "NETFLIX COM REVERSA", "0", "0"),
            ],
        )
        .with_statement(
            id,
            date(2024, 4, 20),
            MovementKind::National,
            statement(vec![
                billed("5990", "NETFLIX COM", ""),
                billed("30000", "GIMNASIO", "2/6"),
                billed("12000", "TIENDA", "6/6"),
            ]),
        )
        .with_statement(
            id,
            date(2024, 3, 20),
            MovementKind::National,
            statement(vec![billed("5990", "NETFLIX   COM", "")]),
        )
        .with_statement(
            id,
            date(2024, 4, 20),
            MovementKind::International,
            statement(vec![billed("9.99", "SPOTIFY", "")]),
        )
        .with_statement(
            id,
            date(2024, 3, 20),
            MovementKind::International,
            statement(vec![billed("9.99", "SPOTIFY", "")]),
        )
}

#[tokio::test]
async fn pending_card_uses_itemized_movements() -> Result<()> {
    let source = Arc::new(pending_card(MockSource::new("900"), "c1"));
    let snapshot = reconciler(source.clone()).run().await?;

    let card = &snapshot.cards["c1"];
    assert_eq!(card.state, CardState::Pending);
    // 5990 + 60000 / 6 + 9.99 * 900
    assert_eq!(card.unbilled_total, dec("24981"));
    // Only the 2/6 slice is outstanding; 6/6 is settled.
    assert_eq!(card.outstanding_installment_total, dec("30000"));
    // NETFLIX and SPOTIFY each seen three times.
    assert_eq!(card.recurring_total, dec("14981"));
    assert_eq!(card.recurring_count, 2);

    assert_eq!(source.unbilled_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.statement_calls.load(Ordering::SeqCst), 4);
    Ok(())
}

#[tokio::test]
async fn billed_card_uses_statement_summary() -> Result<()> {
    let source = Arc::new(
        MockSource::new("900")
            .with_card("c2", vec![date(2024, 5, 20), date(2024, 4, 20)])
            .with_statement("c2", date(2024, 5, 20), MovementKind::National, summary("150000"))
            .with_statement(
                "c2",
                date(2024, 5, 20),
                MovementKind::International,
                summary("100"),
            ),
    );
    let snapshot = reconciler(source.clone()).run().await?;

    let card = &snapshot.cards["c2"];
    assert_eq!(card.state, CardState::Billed);
    assert_eq!(card.unbilled_total, dec("240000"));
    assert_eq!(card.outstanding_installment_total, Decimal::ZERO);
    assert_eq!(card.recurring_total, Decimal::ZERO);

    assert_eq!(source.unbilled_calls.load(Ordering::SeqCst), 0);
    assert_eq!(source.statement_calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn aggregate_totals_span_all_cards() -> Result<()> {
    let source = pending_card(MockSource::new("900"), "c1")
        .with_card("c2", vec![date(2024, 5, 20)])
        .with_statement("c2", date(2024, 5, 20), MovementKind::National, summary("150000"))
        .with_statement("c2", date(2024, 5, 20), MovementKind::International, summary("100"));

    let snapshot = reconciler(Arc::new(source))
        .with_fixed_expenses_total(dec("50000"))
        .run()
        .await?;

    assert_eq!(snapshot.cards.len(), 2);
    assert_eq!(snapshot.usd_rate, dec("900"));
    assert_eq!(snapshot.totals.unbilled_total, dec("264981"));
    assert_eq!(snapshot.totals.outstanding_installment_total, dec("30000"));
    assert_eq!(snapshot.totals.recurring_total, dec("14981"));
    assert_eq!(snapshot.totals.grand_total, dec("309962"));
    assert_eq!(snapshot.fixed_expenses_total, dec("50000"));
    assert!(snapshot.failed_cards.is_empty());
    Ok(())
}

#[tokio::test]
async fn case_sensitive_descriptions_are_not_recurring() -> Result<()> {
    let source = MockSource::new("900")
        .with_card("c1", vec![date(2024, 4, 20), date(2024, 3, 20)])
        .with_unbilled("c1", vec![unbilled("100", "NAC", "uber eats", "0", "0")])
        .with_statement(
            "c1",
            date(2024, 4, 20),
            MovementKind::National,
            statement(vec![billed("100.2", "uber eats", "")]),
        )
        .with_statement(
            "c1",
            date(2024, 3, 20),
            MovementKind::National,
            statement(vec![billed("99.9", "UBER", "")]),
        );

    let snapshot = reconciler(Arc::new(source)).run().await?;
    let card = &snapshot.cards["c1"];
    assert_eq!(card.recurring_total, Decimal::ZERO);
    assert_eq!(card.recurring_count, 0);
    assert_eq!(card.unbilled_total, dec("100"));
    Ok(())
}

#[tokio::test]
async fn card_without_billing_dates_only_counts_unbilled() -> Result<()> {
    let source = Arc::new(
        MockSource::new("900")
            .with_card("new", Vec::new())
            .with_unbilled("new", vec![unbilled("25000", "NAC", "PRIMERA COMPRA", "0", "0")]),
    );
    let snapshot = reconciler(source.clone()).run().await?;

    let card = &snapshot.cards["new"];
    assert_eq!(card.state, CardState::Pending);
    assert_eq!(card.unbilled_total, dec("25000"));
    assert_eq!(source.statement_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn billing_month_follows_configured_timezone() -> Result<()> {
    // Already June in UTC, still May 31st in Santiago.
    let source = MockSource::new("900")
        .with_card("c2", vec![date(2024, 5, 20)])
        .with_statement("c2", date(2024, 5, 20), MovementKind::National, summary("1000"));

    let snapshot = Reconciler::new(Arc::new(source))
        .with_clock(Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap(),
        )))
        .with_timezone(chrono_tz::America::Santiago)
        .run()
        .await?;

    assert_eq!(snapshot.cards["c2"].state, CardState::Billed);
    Ok(())
}

#[tokio::test]
async fn failing_card_aborts_run_by_default() {
    let source = pending_card(MockSource::new("900"), "good")
        .with_card("bad", vec![date(2024, 4, 20)])
        .failing("bad");

    let err = reconciler(Arc::new(source)).run().await.unwrap_err();
    assert!(format!("{err:#}").contains("bad"));
}

#[tokio::test]
async fn isolated_failures_skip_only_the_failing_card() -> Result<()> {
    let source = MockSource::new("900")
        .with_card("bad", vec![date(2024, 4, 20)])
        .failing("bad");
    let source = pending_card(source, "good");

    let snapshot = reconciler(Arc::new(source))
        .isolate_card_failures(true)
        .run()
        .await?;

    assert_eq!(snapshot.cards.len(), 1);
    assert!(snapshot.cards.contains_key("good"));
    assert_eq!(snapshot.failed_cards, vec!["bad".to_string()]);
    assert_eq!(snapshot.totals.unbilled_total, dec("24981"));
    Ok(())
}

#[tokio::test]
async fn run_and_save_persists_the_snapshot() -> Result<()> {
    let source = Arc::new(pending_card(MockSource::new("900"), "c1"));
    let store = MemorySnapshotStore::new();

    let (snapshot, saved) = reconciler(source).run_and_save(&store).await?;
    assert!(saved.archived.is_none());
    assert_eq!(store.latest().await?, Some(snapshot));
    Ok(())
}

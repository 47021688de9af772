//! Integration tests for stores kept in step through the event bus.
//!
//! Every test wires two or more stores to one in-memory backend and one bus,
//! the way several views of the same dashboard share them.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tarimas_core::{
    DateWindow, EvolutionFilterUpdate, Granularity, Indicators, ListFilterKey, Metric, OrderId,
    PalletCode, ReleasePatch,
};
use tarimas_integration_tests::{MemoryBackend, bucket, line, scenario};
use tarimas_inventory::{
    BusEvent, DataChange, EventBus, EventKind, InventoryStore, Origin, StoreSettings,
};

type Store = InventoryStore<Arc<MemoryBackend>>;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, day).unwrap()
}

fn store(backend: &Arc<MemoryBackend>, bus: &EventBus, origin: &str) -> Store {
    InventoryStore::with_settings(
        Arc::clone(backend),
        bus.clone(),
        StoreSettings {
            origin: Some(Origin::new(origin)),
            evolution_window: DateWindow::new(date(1), date(30)),
            evolution_granularity: Granularity::Day,
        },
    )
}

fn backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(scenario()).with_order(OrderId::new(12), "Frutas del Norte", Some("Monterrey")))
}

// =============================================================================
// Derived Views
// =============================================================================

#[tokio::test]
async fn test_scenario_indicators_and_distribution() {
    let bus = EventBus::new();
    let store = store(&backend(), &bus, "inventario");

    store.mount().await.unwrap();

    assert_eq!(
        store.indicators(),
        Indicators {
            total_weight: Decimal::from(22),
            assigned_pallets: 1,
            unassigned_pallets: 1,
            unassigned_weight: Decimal::from(15),
        }
    );

    let rows: Vec<(String, Decimal, Decimal)> = store
        .formatted_distribution()
        .into_iter()
        .map(|row| (row.box_type.to_string(), row.quantity, row.percentage))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("XL".to_string(), Decimal::from(10), Decimal::new(4545, 2)),
            ("L".to_string(), Decimal::from(5), Decimal::new(2273, 2)),
            ("M".to_string(), Decimal::from(7), Decimal::new(3182, 2)),
        ]
    );
}

#[tokio::test]
async fn test_pallet_counts_cover_every_pallet() {
    let lines = vec![
        line("A", "XL", 4, None),
        line("A", "S", 1, None),
        line("B", "M", 2, Some("Acme")),
        line("C", "XS", 3, Some("Verde")),
        line("C", "XL", 3, Some("Verde")),
        line("D", "Granel", 9, None),
    ];
    let bus = EventBus::new();
    let store = store(&Arc::new(MemoryBackend::new(lines)), &bus, "inventario");

    store.load().await.unwrap();

    assert_eq!(store.indicators().total_pallets(), 4);
    assert_eq!(store.indicators().assigned_pallets, 2);
}

#[tokio::test]
async fn test_list_filters_combine() {
    let lines = vec![
        line("A1", "XL", 4, Some("Acme")),
        line("A2", "L", 1, Some("Acme")),
        line("B1", "XL", 2, None),
    ];
    let bus = EventBus::new();
    let store = store(&Arc::new(MemoryBackend::new(lines)), &bus, "inventario");
    store.load().await.unwrap();

    store.set_list_filter(ListFilterKey::Search, "xl");
    assert_eq!(store.filtered_records().len(), 2);

    store.set_list_filter(ListFilterKey::Client, "Acme");
    let codes: Vec<String> = store
        .filtered_records()
        .into_iter()
        .map(|l| l.pallet_code.into_inner())
        .collect();
    assert_eq!(codes, vec!["A1"]);

    store.set_list_filter(ListFilterKey::Search, "");
    store.set_list_filter(ListFilterKey::Client, "Sin asignar");
    assert_eq!(store.filtered_records().len(), 1);
}

// =============================================================================
// Bus Discipline
// =============================================================================

#[tokio::test]
async fn test_confirmed_assignment_reaches_other_store() {
    let backend = backend();
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    let orders = store(&backend, &bus, "pedidos");
    dashboard.load().await.unwrap();
    orders.load().await.unwrap();

    let codes = [PalletCode::from("P1")];
    orders
        .assign_confirmed(backend.as_ref(), OrderId::new(12), &codes)
        .await
        .unwrap();

    // The acting store shows the change right away without reloading.
    assert_eq!(orders.indicators().assigned_pallets, 2);
    assert_eq!(orders.process_events().await.unwrap(), 0);

    // The other store reloads once and sees the backend state.
    assert_eq!(dashboard.indicators().assigned_pallets, 1);
    assert_eq!(dashboard.process_events().await.unwrap(), 1);
    assert_eq!(dashboard.indicators().assigned_pallets, 2);
    assert_eq!(dashboard.pending_overrides(), 0);
    assert_eq!(backend.inventory_reads(), 3);
}

#[tokio::test]
async fn test_queued_events_fold_into_one_reload() {
    let backend = backend();
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    let orders = store(&backend, &bus, "pedidos");
    dashboard.load().await.unwrap();
    orders.load().await.unwrap();
    let reads = backend.inventory_reads();

    orders.apply_unassignment(&[PalletCode::from("P2")]);
    orders.apply_assignment(&tarimas_core::AssignmentPatch {
        order_id: OrderId::new(12),
        target: tarimas_core::AssignmentTarget {
            client: "Frutas del Norte".to_string(),
            branch: None,
        },
        pallet_codes: vec![PalletCode::from("P2")],
    });

    assert_eq!(dashboard.process_events().await.unwrap(), 2);
    assert_eq!(backend.inventory_reads(), reads + 1);
}

#[tokio::test]
async fn test_refresh_invalidates_and_notifies_others() {
    let backend = backend();
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    let orders = store(&backend, &bus, "pedidos");
    dashboard.load().await.unwrap();
    orders.load().await.unwrap();

    backend.set_lines(vec![line("P9", "S", 3, None)]);
    dashboard.refresh().await.unwrap();

    assert_eq!(backend.invalidations(), vec![Origin::new("inventario")]);
    assert_eq!(dashboard.records().len(), 1);
    assert!(!dashboard.refreshing());
    assert_eq!(dashboard.process_events().await.unwrap(), 0);

    assert_eq!(orders.records().len(), 3);
    assert_eq!(orders.process_events().await.unwrap(), 1);
    assert_eq!(orders.records().len(), 1);
}

#[tokio::test]
async fn test_foreign_origin_event_triggers_reload() {
    let backend = backend();
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    dashboard.load().await.unwrap();

    bus.publish_data_updated(
        DataChange::Other("inventario-actualizado".to_string()),
        &Origin::new("importador"),
    );
    bus.publish_data_updated(
        DataChange::Other("inventario-actualizado".to_string()),
        &Origin::new("inventario"),
    );

    assert_eq!(dashboard.process_events().await.unwrap(), 1);
    assert_eq!(backend.inventory_reads(), 2);
}

#[tokio::test]
async fn test_listeners_see_mutation_names() {
    let backend = backend();
    let bus = EventBus::new();
    let store = store(&backend, &bus, "inventario");
    store.load().await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let _subscription = bus.subscribe(EventKind::DataUpdated, move |event: &BusEvent| {
        if let BusEvent::DataUpdated { change, origin } = event {
            recorder
                .lock()
                .unwrap()
                .push(format!("{}@{origin}", change.name()));
        }
    });

    store
        .assign_confirmed(backend.as_ref(), OrderId::new(12), &[PalletCode::from("P1")])
        .await
        .unwrap();
    store
        .unassign_confirmed(
            backend.as_ref(),
            &[ReleasePatch {
                order_id: OrderId::new(12),
                pallet_code: PalletCode::from("P1"),
            }],
        )
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["tarima-assigned@inventario", "tarima-unassigned@inventario"]
    );
}

#[tokio::test]
async fn test_unknown_order_applies_nothing() {
    let backend = backend();
    let bus = EventBus::new();
    let store = store(&backend, &bus, "inventario");
    store.load().await.unwrap();

    let result = store
        .assign_confirmed(backend.as_ref(), OrderId::new(404), &[PalletCode::from("P1")])
        .await;

    assert!(result.is_err());
    assert_eq!(store.indicators().assigned_pallets, 1);
    assert_eq!(store.pending_overrides(), 0);
}

#[tokio::test]
async fn test_dropping_store_unsubscribes() {
    let backend = backend();
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    let before = bus.subscriber_count();

    let orders = store(&backend, &bus, "pedidos");
    assert_eq!(bus.subscriber_count(), before + 2);

    drop(orders);
    assert_eq!(bus.subscriber_count(), before);
    assert_eq!(dashboard.origin(), &Origin::new("inventario"));
}

#[tokio::test]
async fn test_run_reloads_in_background() {
    let backend = backend();
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    dashboard.load().await.unwrap();

    let task = tokio::spawn(dashboard.run());

    backend.set_lines(vec![line("P5", "M", 1, Some("Acme"))]);
    bus.publish_cache_invalidated("inventario", &Origin::new("pedidos"));

    tokio::time::timeout(Duration::from_secs(5), async {
        while dashboard.records().len() != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(dashboard.indicators().assigned_pallets, 1);
    task.abort();
}

#[tokio::test]
async fn test_run_ends_when_last_handle_dropped() {
    let backend = backend();
    let bus = EventBus::new();
    let before = bus.subscriber_count();
    let dashboard = store(&backend, &bus, "inventario");
    dashboard.load().await.unwrap();
    let task = tokio::spawn(dashboard.run());

    drop(dashboard);
    assert_eq!(bus.subscriber_count(), before);
    bus.publish_cache_invalidated("inventario", &Origin::new("pedidos"));

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(backend.inventory_reads(), 1);
}

// =============================================================================
// Evolution
// =============================================================================

#[tokio::test]
async fn test_deferred_evolution_follows_bus_reload() {
    let backend = Arc::new(MemoryBackend::new(Vec::new()).with_evolution(
        Granularity::Day,
        vec![bucket(date(1), 10, 1), bucket(date(2), 12, 2)],
    ));
    let bus = EventBus::new();
    let dashboard = store(&backend, &bus, "inventario");
    dashboard.mount().await.unwrap();
    assert_eq!(backend.evolution_reads(), 0);

    backend.set_lines(scenario());
    bus.publish_cache_invalidated("inventario", &Origin::new("pedidos"));
    assert_eq!(dashboard.process_events().await.unwrap(), 1);
    bus.publish_cache_invalidated("inventario", &Origin::new("pedidos"));
    assert_eq!(dashboard.process_events().await.unwrap(), 1);

    assert_eq!(dashboard.records().len(), 3);
    assert_eq!(dashboard.formatted_evolution().len(), 2);
    assert_eq!(backend.evolution_reads(), 1);
}

#[tokio::test]
async fn test_evolution_per_granularity() {
    let backend = Arc::new(
        MemoryBackend::new(scenario())
            .with_evolution(
                Granularity::Day,
                vec![bucket(date(1), 10, 1), bucket(date(2), 12, 2)],
            )
            .with_evolution(Granularity::Month, vec![bucket(date(1), 300, 20)]),
    );
    let bus = EventBus::new();
    let store = store(&backend, &bus, "inventario");

    store.mount().await.unwrap();
    assert_eq!(store.formatted_evolution().len(), 2);
    assert_eq!(store.formatted_evolution()[0].label, "01/09/2026");

    store
        .set_evolution_filter(EvolutionFilterUpdate::Granularity(Granularity::Month))
        .await
        .unwrap();
    store
        .set_evolution_filter(EvolutionFilterUpdate::Metric(Metric::Count))
        .await
        .unwrap();

    let rows = store.formatted_evolution();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values[&tarimas_core::BoxType::Xl], Decimal::from(20));
    assert_eq!(backend.evolution_reads(), 2);
    assert!(store.evolution_fetched_at(Granularity::Day).is_some());
    assert!(store.evolution_fetched_at(Granularity::Week).is_none());
}

#[tokio::test]
async fn test_window_change_refetches() {
    let backend = Arc::new(MemoryBackend::new(scenario()).with_evolution(
        Granularity::Day,
        vec![bucket(date(1), 10, 1), bucket(date(20), 12, 2)],
    ));
    let bus = EventBus::new();
    let store = store(&backend, &bus, "inventario");
    store.mount().await.unwrap();

    store
        .set_evolution_filter(EvolutionFilterUpdate::Window(DateWindow::new(
            date(15),
            date(25),
        )))
        .await
        .unwrap();

    assert_eq!(backend.evolution_reads(), 2);
    assert_eq!(store.formatted_evolution().len(), 1);
    assert_eq!(store.evolution_filters().window.start(), date(15));
}

use super::*;

use crate::model::PayrollStatus;
use crate::fixtures::*;

fn departments(records: Vec<Department>) -> Fetcher {
    fetcher(move || async move { Ok(Collection::Departments(records)) })
}

fn employees(records: Vec<Employee>) -> Fetcher {
    fetcher(move || async move { Ok(Collection::Employees(records)) })
}

fn failing(err: GatewayError) -> Fetcher {
    fetcher(move || async move { Err(err) })
}

#[tokio::test]
async fn starts_not_loaded_without_snapshot() {
    let store = CollectionStore::new();
    assert_eq!(store.status(), &LoadStatus::NotLoaded);
    assert!(store.snapshot().is_none());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn successful_batch_replaces_snapshot() {
    let mut store = CollectionStore::new();
    let applied = store
        .load(vec![
            departments(vec![department(1, "Engineering", None)]),
            employees(vec![employee(1, "Ada", "Lovelace", Some(1))]),
        ])
        .await;

    assert_eq!(applied, Applied::Replaced);
    assert_eq!(store.status(), &LoadStatus::Ready);
    let snapshot = store.snapshot().expect("snapshot");
    assert_eq!(snapshot.departments.len(), 1);
    assert_eq!(snapshot.employees.len(), 1);
    assert_eq!(snapshot.find::<Employee>(1).map(|e| e.full_name()), Some("Ada Lovelace".to_string()));
}

#[tokio::test]
async fn one_failing_fetcher_keeps_previous_snapshot() {
    let mut store = CollectionStore::new();
    store
        .load(vec![departments(vec![department(1, "Engineering", None)])])
        .await;
    let before = store.snapshot().cloned();

    let applied = store
        .load(vec![
            departments(vec![department(2, "Finance", None)]),
            failing(GatewayError::Transport("connection reset".into())),
            employees(vec![employee(4, "Grace", "Hopper", Some(2))]),
        ])
        .await;

    assert_eq!(
        applied,
        Applied::Failed(GatewayError::Transport("connection reset".into()))
    );
    assert!(matches!(store.status(), LoadStatus::Failed(reason) if reason.contains("connection reset")));
    assert_eq!(store.snapshot().cloned(), before);
}

#[tokio::test]
async fn first_failure_in_fetcher_order_wins() {
    let mut store = CollectionStore::new();
    let applied = store
        .load(vec![
            failing(GatewayError::NotFound("employee".into())),
            failing(GatewayError::Auth("expired".into())),
        ])
        .await;

    assert_eq!(applied, Applied::Failed(GatewayError::NotFound("employee".into())));
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn snapshot_stays_visible_while_reloading() {
    let mut store = CollectionStore::new();
    store
        .load(vec![departments(vec![department(1, "Engineering", None)])])
        .await;

    let pending = store.begin_load(vec![departments(vec![])]);
    assert!(store.is_loading());
    assert_eq!(store.snapshot().map(|s| s.departments.len()), Some(1));

    let outcome = pending.run().await;
    assert_eq!(store.finish_load(outcome), Applied::Replaced);
    assert_eq!(store.snapshot().map(|s| s.departments.len()), Some(0));
}

#[tokio::test]
async fn superseded_load_is_discarded() {
    let mut store = CollectionStore::new();
    let first = store.begin_load(vec![departments(vec![department(1, "Old", None)])]);
    let second = store.begin_load(vec![departments(vec![department(2, "New", None)])]);
    assert!(second.generation() > first.generation());

    let second_outcome = second.run().await;
    assert_eq!(store.finish_load(second_outcome), Applied::Replaced);

    let first_outcome = first.run().await;
    assert_eq!(store.finish_load(first_outcome), Applied::Discarded);
    assert_eq!(
        store.snapshot().map(|s| s.departments[0].name.clone()),
        Some("New".to_string())
    );
}

#[tokio::test]
async fn cancel_restores_prior_status_and_discards_result() {
    let mut store = CollectionStore::new();
    store
        .load(vec![failing(GatewayError::Transport("down".into()))])
        .await;
    let failed = store.status().clone();

    let pending = store.begin_load(vec![departments(vec![department(1, "Engineering", None)])]);
    store.cancel();
    assert_eq!(store.status(), &failed);

    let outcome = pending.run().await;
    assert_eq!(store.finish_load(outcome), Applied::Discarded);
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn payroll_breaking_net_identity_fails_the_load() {
    let mut bad = payroll(9, 1, 5, 2024, (1000.0, 200.0, 50.0), PayrollStatus::Pending);
    bad.net_salary = 1200.0;

    let mut store = CollectionStore::new();
    let applied = store
        .load(vec![fetcher(move || async move {
            Ok(Collection::Payrolls(vec![bad]))
        })])
        .await;

    assert!(matches!(applied, Applied::Failed(GatewayError::Transport(reason)) if reason.contains("#9")));
    assert!(store.snapshot().is_none());
}

#[test]
fn dataset_remove_and_upsert_by_id() {
    let mut dataset = Dataset {
        departments: vec![department(1, "Engineering", None), department(2, "Finance", None)],
        ..Dataset::default()
    };

    assert!(dataset.remove::<Department>(1));
    assert!(!dataset.remove::<Department>(1));
    assert_eq!(dataset.upsert(department(2, "Treasury", None)), Ok(true));
    assert_eq!(dataset.upsert(department(7, "Legal", None)), Ok(false));
    assert_eq!(dataset.records::<Department>(), &[department(2, "Treasury", None)][..]);
}

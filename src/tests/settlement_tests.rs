use crate::InMemoryStorage;
use crate::core::errors::SplitbookError;
use crate::core::models::settlement::SettlementKind;
use crate::core::services::SettlementRequest;
use crate::infrastructure::storage::Storage;
use crate::tests::{amt, create_test_service, equal_expense, seed_group};

async fn seeded_ninety(
    service: &crate::tests::TestService,
) -> crate::core::models::Group {
    let group = seed_group(
        service,
        &["a@example.com", "b@example.com", "c@example.com"],
    )
    .await;
    service
        .add_expense(
            &group.id,
            equal_expense("90", "a@example.com", &["a@example.com", "b@example.com", "c@example.com"]),
            "a@example.com",
        )
        .await
        .unwrap();
    group
}

#[tokio::test]
async fn test_settle_debt_updates_pair_balances() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let outcome = service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("30"), None, "b@example.com")
        .await
        .unwrap();

    assert_eq!(outcome.updated_balances["b@example.com"], amt("0"));
    assert_eq!(outcome.updated_balances["a@example.com"], amt("30"));

    let response = service
        .group_balances(&group.id, "a@example.com")
        .await
        .unwrap();
    assert_eq!(response.balances["b@example.com"].net, amt("0"));
    assert_eq!(response.balances["a@example.com"].net, amt("30"));
    assert_eq!(response.balances["c@example.com"].net, amt("-30"));
    let total: rust_decimal::Decimal = response.balances.values().map(|b| b.net).sum();
    assert_eq!(total, amt("0"));
}

#[tokio::test]
async fn test_over_settlement_rejected_without_write() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let result = service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("30.01"), None, "b@example.com")
        .await;
    match result {
        Err(SplitbookError::ExceedsOutstandingBalance { outstanding }) => {
            assert_eq!(outstanding, amt("30"));
        }
        other => panic!("expected ExceedsOutstandingBalance, got {:?}", other),
    }

    let entries = service.get_entries(&group.id, "a@example.com").await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_repeated_settlements_cannot_go_below_zero() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("20"), None, "b@example.com")
        .await
        .unwrap();
    service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("10"), None, "b@example.com")
        .await
        .unwrap();

    let result = service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("0.01"), None, "b@example.com")
        .await;
    assert!(matches!(
        result,
        Err(SplitbookError::ExceedsOutstandingBalance { .. })
    ));
}

#[tokio::test]
async fn test_settlement_input_validation() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let result = service
        .settle_debt(&group.id, "b@example.com", "b@example.com", amt("10"), None, "b@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::SelfSettlement)));

    let result = service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("-5"), None, "b@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::InvalidAmount(_))));

    let result = service
        .settle_debt(&group.id, "mallory@example.com", "a@example.com", amt("5"), None, "b@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::MemberNotInGroup(_))));
}

#[tokio::test]
async fn test_settlements_are_append_only() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let outcome = service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("30"), None, "b@example.com")
        .await
        .unwrap();

    let result = service
        .delete_expense(&group.id, &outcome.settlement.id, "a@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::SettlementImmutable)));
}

#[tokio::test]
async fn test_settlement_history_written_with_entry() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("30"), None, "b@example.com")
        .await
        .unwrap();

    let history = service
        .settlement_history(&group.id, "a@example.com")
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, SettlementKind::Individual);
    assert_eq!(history[0].settled_by, "b@example.com");
    assert_eq!(history[0].amount, amt("30"));
    assert!(history[0].batch_id.is_none());
}

#[tokio::test]
async fn test_batch_settlement_applies_all_under_one_batch_id() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let outcome = service
        .settle_multiple(
            &group.id,
            vec![
                SettlementRequest {
                    from_email: "b@example.com".to_string(),
                    to_email: "a@example.com".to_string(),
                    amount: amt("30"),
                    note: None,
                },
                SettlementRequest {
                    from_email: "c@example.com".to_string(),
                    to_email: "a@example.com".to_string(),
                    amount: amt("30"),
                    note: None,
                },
            ],
            "a@example.com",
        )
        .await
        .unwrap();
    assert_eq!(outcome.applied, 2);

    let history = service
        .settlement_history(&group.id, "a@example.com")
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    for record in &history {
        assert_eq!(record.kind, SettlementKind::Multiple);
        assert_eq!(record.batch_id.as_deref(), Some(outcome.batch_id.as_str()));
    }

    let response = service
        .group_balances(&group.id, "a@example.com")
        .await
        .unwrap();
    assert!(response.balances.values().all(|b| b.net == amt("0")));
}

#[tokio::test]
async fn test_batch_settlement_is_all_or_nothing() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let result = service
        .settle_multiple(
            &group.id,
            vec![
                SettlementRequest {
                    from_email: "b@example.com".to_string(),
                    to_email: "a@example.com".to_string(),
                    amount: amt("30"),
                    note: None,
                },
                SettlementRequest {
                    from_email: "c@example.com".to_string(),
                    to_email: "a@example.com".to_string(),
                    amount: amt("31"),
                    note: None,
                },
            ],
            "a@example.com",
        )
        .await;
    assert!(matches!(
        result,
        Err(SplitbookError::ExceedsOutstandingBalance { .. })
    ));

    // Nothing persisted: no settlements, no history.
    let entries = service.get_entries(&group.id, "a@example.com").await.unwrap();
    assert_eq!(entries.len(), 1);
    let history = service
        .settlement_history(&group.id, "a@example.com")
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_batch_catches_cumulative_over_settlement() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    // Each item alone is within B's debt of 30, together they exceed it.
    let result = service
        .settle_multiple(
            &group.id,
            vec![
                SettlementRequest {
                    from_email: "b@example.com".to_string(),
                    to_email: "a@example.com".to_string(),
                    amount: amt("20"),
                    note: None,
                },
                SettlementRequest {
                    from_email: "b@example.com".to_string(),
                    to_email: "a@example.com".to_string(),
                    amount: amt("20"),
                    note: None,
                },
            ],
            "b@example.com",
        )
        .await;
    assert!(matches!(
        result,
        Err(SplitbookError::ExceedsOutstandingBalance { .. })
    ));
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let service = create_test_service();
    let group = seeded_ninety(&service).await;

    let result = service
        .settle_multiple(&group.id, Vec::new(), "a@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::EmptyBatch)));
}

#[tokio::test]
async fn test_stale_version_append_is_rejected() {
    let storage = InMemoryStorage::new();
    let ledger = storage.ledger("g1").await.unwrap();
    assert_eq!(ledger.version, 0);

    storage
        .append_entries("g1", 0, Vec::new(), Vec::new())
        .await
        .unwrap();

    // A writer holding the old version loses the race.
    let result = storage.append_entries("g1", 0, Vec::new(), Vec::new()).await;
    assert!(matches!(
        result,
        Err(SplitbookError::ConcurrentModification)
    ));
}

use crate::core::errors::SplitbookError;
use crate::core::models::Role;
use crate::infrastructure::notify::Notification;
use crate::tests::{amt, create_test_service, create_test_service_with_notifier, equal_expense, seed_group, usd};

#[tokio::test]
async fn test_create_group_seeds_owner() {
    let service = create_test_service();
    let group = seed_group(&service, &["alice@example.com", "bob@example.com"]).await;

    assert_eq!(group.name, "Trip");
    assert_eq!(group.owner_email, "alice@example.com");
    assert_eq!(group.members.len(), 2);
    assert_eq!(group.members[0].role, Role::Owner);
    assert_eq!(group.members[1].role, Role::Member);
    assert!(group.is_member("bob@example.com"));
}

#[tokio::test]
async fn test_create_group_rejects_duplicate_member() {
    let service = create_test_service();
    let result = service
        .create_group(
            "Trip".to_string(),
            usd(),
            vec!["bob@example.com".to_string(), "bob@example.com".to_string()],
            "alice@example.com",
        )
        .await;
    assert!(matches!(result, Err(SplitbookError::MemberAlreadyExists(_))));
}

#[tokio::test]
async fn test_add_member_idempotency_and_notification() {
    let (service, notifier) = create_test_service_with_notifier();
    let group = seed_group(&service, &["alice@example.com"]).await;

    service
        .add_member(&group.id, "bob@example.com", "alice@example.com")
        .await
        .unwrap();

    let result = service
        .add_member(&group.id, "bob@example.com", "alice@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::MemberAlreadyExists(_))));

    let sent = notifier.sent().await;
    assert_eq!(
        sent,
        vec![Notification::MemberAdded {
            group_id: group.id.clone(),
            email: "bob@example.com".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_add_member_requires_owner() {
    let service = create_test_service();
    let group = seed_group(&service, &["alice@example.com", "bob@example.com"]).await;

    let result = service
        .add_member(&group.id, "carol@example.com", "bob@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::NotGroupOwner(_))));
}

#[tokio::test]
async fn test_owner_cannot_be_removed() {
    let service = create_test_service();
    let group = seed_group(&service, &["alice@example.com", "bob@example.com"]).await;

    let result = service
        .remove_member(&group.id, "alice@example.com", "alice@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::OwnerCannotBeRemoved)));
}

#[tokio::test]
async fn test_remove_member_blocked_by_outstanding_balance() {
    let service = create_test_service();
    let group = seed_group(
        &service,
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

    // B owes 30 and must settle before leaving.
    let result = service
        .remove_member(&group.id, "b@example.com", "a@example.com")
        .await;
    match result {
        Err(SplitbookError::OutstandingBalance { email, net }) => {
            assert_eq!(email, "b@example.com");
            assert_eq!(net, amt("-30"));
        }
        other => panic!("expected OutstandingBalance, got {:?}", other),
    }

    service
        .settle_debt(&group.id, "b@example.com", "a@example.com", amt("30"), None, "b@example.com")
        .await
        .unwrap();
    service
        .remove_member(&group.id, "b@example.com", "a@example.com")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rename_is_owner_only() {
    let service = create_test_service();
    let group = seed_group(&service, &["alice@example.com", "bob@example.com"]).await;

    let result = service
        .rename_group(&group.id, "New Name".to_string(), "bob@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::NotGroupOwner(_))));

    let renamed = service
        .rename_group(&group.id, "New Name".to_string(), "alice@example.com")
        .await
        .unwrap();
    assert_eq!(renamed.name, "New Name");
}

#[tokio::test]
async fn test_delete_group_cascades_ledger() {
    let service = create_test_service();
    let group = seed_group(&service, &["alice@example.com", "bob@example.com"]).await;

    service
        .add_expense(
            &group.id,
            equal_expense("50", "alice@example.com", &["alice@example.com", "bob@example.com"]),
            "alice@example.com",
        )
        .await
        .unwrap();

    let result = service.delete_group(&group.id, "bob@example.com").await;
    assert!(matches!(result, Err(SplitbookError::NotGroupOwner(_))));

    service
        .delete_group(&group.id, "alice@example.com")
        .await
        .unwrap();

    let result = service.get_entries(&group.id, "alice@example.com").await;
    assert!(matches!(result, Err(SplitbookError::GroupNotFound(_))));

    let groups = service.get_member_groups("alice@example.com").await.unwrap();
    assert!(groups.is_empty());

    // Audit history survives the deletion.
    let audits = service.get_group_audits(&group.id).await.unwrap();
    assert!(!audits.is_empty());
}

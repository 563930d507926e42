use crate::core::balance::BalanceSheet;
use crate::core::errors::SplitbookError;
use crate::core::models::summary::{Contribution, ContributionSpec, MemberShare, SliceSpec};
use crate::core::services::SummaryDraft;
use crate::tests::{amt, create_test_service, seed_group};

fn custom_summary(amount: &str, shares: &[(&str, &str)], contributions: &[(&str, &str)]) -> SummaryDraft {
    SummaryDraft {
        description: "Groceries".to_string(),
        amount: amt(amount),
        slice: SliceSpec::Custom {
            shares: shares
                .iter()
                .map(|(email, share)| MemberShare {
                    email: email.to_string(),
                    share_amount: amt(share),
                })
                .collect(),
        },
        contribution: ContributionSpec::Custom {
            contributions: contributions
                .iter()
                .map(|(email, contributed)| Contribution {
                    email: email.to_string(),
                    contributed_amount: amt(contributed),
                })
                .collect(),
        },
    }
}

#[tokio::test]
async fn test_all_clear_equivalent_summary_is_square() {
    let service = create_test_service();
    let group = seed_group(
        &service,
        &["a@example.com", "b@example.com", "c@example.com"],
    )
    .await;

    // Shares [40, 35, 25] with matching contributions: everyone is square.
    let summary = service
        .create_summary(
            &group.id,
            custom_summary(
                "100",
                &[("a@example.com", "40"), ("b@example.com", "35"), ("c@example.com", "25")],
                &[("a@example.com", "40"), ("b@example.com", "35"), ("c@example.com", "25")],
            ),
            "a@example.com",
        )
        .await
        .unwrap();

    let balances = service
        .summary_balances(&group.id, &summary.id, "a@example.com")
        .await
        .unwrap();
    assert!(balances.values().all(|net| net.is_zero()));
}

#[tokio::test]
async fn test_equal_slice_all_clear_derives_contributions() {
    let service = create_test_service();
    let group = seed_group(
        &service,
        &["a@example.com", "b@example.com", "c@example.com"],
    )
    .await;

    let summary = service
        .create_summary(
            &group.id,
            SummaryDraft {
                description: "Fuel".to_string(),
                amount: amt("100"),
                slice: SliceSpec::Equal {
                    members: vec![
                        "a@example.com".to_string(),
                        "b@example.com".to_string(),
                        "c@example.com".to_string(),
                    ],
                },
                contribution: ContributionSpec::AllClear,
            },
            "a@example.com",
        )
        .await
        .unwrap();

    let shares: Vec<_> = summary.members_share_list.iter().map(|s| s.share_amount).collect();
    assert_eq!(shares, vec![amt("33.33"), amt("33.33"), amt("33.34")]);
    assert_eq!(summary.contribution_list.len(), 3);
    assert!(summary.balances().values().all(|net| net.is_zero()));
}

#[tokio::test]
async fn test_contribution_mismatch_rejected() {
    let service = create_test_service();
    let group = seed_group(&service, &["a@example.com", "b@example.com"]).await;

    let result = service
        .create_summary(
            &group.id,
            custom_summary(
                "100",
                &[("a@example.com", "50"), ("b@example.com", "50")],
                &[("a@example.com", "50"), ("b@example.com", "40")],
            ),
            "a@example.com",
        )
        .await;
    assert!(matches!(
        result,
        Err(SplitbookError::ContributionMismatch { .. })
    ));
}

#[tokio::test]
async fn test_payback_adjusts_and_is_capped() {
    let service = create_test_service();
    let group = seed_group(&service, &["a@example.com", "b@example.com"]).await;

    // A fronted everything, B owes its 50 share.
    let summary = service
        .create_summary(
            &group.id,
            custom_summary(
                "100",
                &[("a@example.com", "50"), ("b@example.com", "50")],
                &[("a@example.com", "100"), ("b@example.com", "0")],
            ),
            "a@example.com",
        )
        .await
        .unwrap();

    let result = service
        .add_payback(&group.id, &summary.id, "b@example.com", "a@example.com", amt("60"), "b@example.com")
        .await;
    match result {
        Err(SplitbookError::ExceedsOutstandingBalance { outstanding }) => {
            assert_eq!(outstanding, amt("50"));
        }
        other => panic!("expected ExceedsOutstandingBalance, got {:?}", other),
    }

    service
        .add_payback(&group.id, &summary.id, "b@example.com", "a@example.com", amt("50"), "b@example.com")
        .await
        .unwrap();

    let balances = service
        .summary_balances(&group.id, &summary.id, "a@example.com")
        .await
        .unwrap();
    assert!(balances.values().all(|net| net.is_zero()));

    let result = service
        .add_payback(&group.id, &summary.id, "b@example.com", "a@example.com", amt("0.01"), "b@example.com")
        .await;
    assert!(matches!(
        result,
        Err(SplitbookError::ExceedsOutstandingBalance { .. })
    ));
}

#[tokio::test]
async fn test_migration_preserves_nets() {
    let service = create_test_service();
    let group = seed_group(
        &service,
        &["a@example.com", "b@example.com", "c@example.com"],
    )
    .await;

    // C's negative contribution means it owes beyond its share.
    let summary = service
        .create_summary(
            &group.id,
            custom_summary(
                "90",
                &[("a@example.com", "30"), ("b@example.com", "30"), ("c@example.com", "30")],
                &[("a@example.com", "80"), ("b@example.com", "20"), ("c@example.com", "-10")],
            ),
            "a@example.com",
        )
        .await
        .unwrap();

    service
        .add_payback(&group.id, &summary.id, "b@example.com", "a@example.com", amt("10"), "b@example.com")
        .await
        .unwrap();

    let before = service
        .summary_balances(&group.id, &summary.id, "a@example.com")
        .await
        .unwrap();

    let entries = service
        .migrate_summary(&group.id, &summary.id, "a@example.com")
        .await
        .unwrap();
    assert_eq!(entries.len(), 2); // one expense + one payback settlement

    let result = service
        .summary_balances(&group.id, &summary.id, "a@example.com")
        .await;
    assert!(matches!(result, Err(SplitbookError::SummaryNotFound(_))));

    let ledger_entries = service.get_entries(&group.id, "a@example.com").await.unwrap();
    let sheet = BalanceSheet::compute(&ledger_entries);
    for (email, net) in &before {
        assert_eq!(sheet.net(email), *net, "net diverged for {}", email);
    }
    assert_eq!(sheet.total_net(), amt("0"));
}

//! Organization provisioning integration tests.
//! Covers idempotent creation, slug derivation, and input validation.

mod common;

use common::TestEngine;

use collections_service::models::{CreateOrganizationRequest, Role};
use collections_service::store::OrganizationStore;
use service_core::error::AppError;
use uuid::Uuid;

fn request(name: &str, idempotency_key: &str) -> CreateOrganizationRequest {
    CreateOrganizationRequest {
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        country_code: Some("de".to_string()),
        default_currency: "eur".to_string(),
        idempotency_key: idempotency_key.to_string(),
    }
}

#[tokio::test]
async fn provisioning_creates_organization_and_owner_atomically() {
    let engine = TestEngine::new();

    let req = request("Northwind Trading", "key-1");
    let provisioned = engine
        .provisioning
        .create_organization_with_owner(&req)
        .await
        .unwrap();

    assert!(!provisioned.is_duplicate);
    assert_eq!(provisioned.organization.name, "Northwind Trading");
    assert_eq!(provisioned.organization.slug, "northwind-trading");
    assert_eq!(provisioned.organization.default_currency, "EUR");
    assert_eq!(provisioned.organization.country_code.as_deref(), Some("DE"));
    assert_eq!(provisioned.membership.role, Role::Owner);
    assert_eq!(provisioned.membership.user_id, req.user_id);

    let membership = engine
        .store
        .membership_for(provisioned.organization.organization_id, req.user_id)
        .await
        .unwrap();
    assert!(membership.is_some(), "owner membership is persisted");
}

#[tokio::test]
async fn replayed_idempotency_key_returns_the_original() {
    let engine = TestEngine::new();

    let first = engine
        .provisioning
        .create_organization_with_owner(&request("Acme", "key-2"))
        .await
        .unwrap();
    let second = engine
        .provisioning
        .create_organization_with_owner(&request("Acme", "key-2"))
        .await
        .unwrap();

    assert!(!first.is_duplicate);
    assert!(second.is_duplicate);
    assert_eq!(
        second.organization.organization_id,
        first.organization.organization_id
    );

    // Only the original slug exists; no second tenant was created.
    assert!(engine.store.slug_exists("acme").await.unwrap());
    assert!(!engine.store.slug_exists("acme-2").await.unwrap());
}

#[tokio::test]
async fn concurrent_duplicate_submissions_yield_one_tenant() {
    let engine = TestEngine::new();

    let req_a = request("Contoso", "key-3");
    let req_b = request("Contoso", "key-3");
    let (a, b) = tokio::join!(
        engine
            .provisioning
            .create_organization_with_owner(&req_a),
        engine
            .provisioning
            .create_organization_with_owner(&req_b),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(
        a.organization.organization_id,
        b.organization.organization_id
    );
    assert_ne!(a.is_duplicate, b.is_duplicate, "exactly one call creates");
}

#[tokio::test]
async fn colliding_slugs_get_numeric_suffixes() {
    let engine = TestEngine::new();

    for (key, expected_slug) in [("k-1", "acme"), ("k-2", "acme-2"), ("k-3", "acme-3")] {
        let provisioned = engine
            .provisioning
            .create_organization_with_owner(&request("Acme", key))
            .await
            .unwrap();
        assert_eq!(provisioned.organization.slug, expected_slug);
    }
}

#[tokio::test]
async fn slugs_fold_diacritics() {
    let engine = TestEngine::new();

    let provisioned = engine
        .provisioning
        .create_organization_with_owner(&request("Café São Paulo", "key-4"))
        .await
        .unwrap();
    assert_eq!(provisioned.organization.slug, "cafe-sao-paulo");
}

#[tokio::test]
async fn name_is_required() {
    let engine = TestEngine::new();

    let err = engine
        .provisioning
        .create_organization_with_owner(&request("", "key-5"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = engine
        .provisioning
        .create_organization_with_owner(&request("   ", "key-6"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn default_currency_must_be_allowed() {
    let engine = TestEngine::new();

    let mut req = request("Globex", "key-7");
    req.default_currency = "XXX".to_string();
    let err = engine
        .provisioning
        .create_organization_with_owner(&req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn idempotency_key_is_required() {
    let engine = TestEngine::new();

    let err = engine
        .provisioning
        .create_organization_with_owner(&request("Initech", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

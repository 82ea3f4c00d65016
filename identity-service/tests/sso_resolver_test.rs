mod common;

use common::TestHarness;
use identity_service::services::{ServiceError, SsoHint};

async fn seed_connection(h: &TestHarness, slug: &str, domain: Option<&str>) {
    let team = h.seed_team(slug).await;
    h.sso
        .register_connection(
            team.team_id,
            domain.map(|d| d.to_string()),
            "product-1".to_string(),
            format!("https://idp.example.com/{}", slug),
            format!("https://idp.example.com/{}/sso", slug),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unique_domain_resolves_directly() {
    let h = TestHarness::new();
    seed_connection(&h, "unique-corp", Some("unique-corp.com")).await;

    let resolution = h
        .sso
        .resolve(&SsoHint::Email("user@unique-corp.com".to_string()))
        .await
        .unwrap();

    assert_eq!(resolution.team.slug, "unique-corp");
    assert_eq!(resolution.connection.product_id, "product-1");
}

#[tokio::test]
async fn test_shared_domain_is_ambiguous() {
    let h = TestHarness::new();
    seed_connection(&h, "acme", Some("shared.example")).await;
    seed_connection(&h, "globex", Some("shared.example")).await;

    assert!(matches!(
        h.sso
            .resolve(&SsoHint::Email("user@shared.example".to_string()))
            .await,
        Err(ServiceError::Ambiguous)
    ));

    // An explicit slug disambiguates.
    let resolution = h
        .sso
        .resolve(&SsoHint::Slug("globex".to_string()))
        .await
        .unwrap();
    assert_eq!(resolution.team.slug, "globex");
}

#[tokio::test]
async fn test_unconfigured_hints_are_not_found() {
    let h = TestHarness::new();

    // No connection registered for the domain.
    assert!(matches!(
        h.sso
            .resolve(&SsoHint::Email("user@nowhere.example".to_string()))
            .await,
        Err(ServiceError::NotFound)
    ));

    // Unknown slug.
    assert!(matches!(
        h.sso.resolve(&SsoHint::Slug("missing".to_string())).await,
        Err(ServiceError::NotFound)
    ));

    // Team exists but has no connection.
    h.seed_team("plain-team").await;
    assert!(matches!(
        h.sso.resolve(&SsoHint::Slug("plain-team".to_string())).await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_malformed_email_hint_is_rejected() {
    let h = TestHarness::new();

    assert!(matches!(
        h.sso.resolve(&SsoHint::Email("not-an-email".to_string())).await,
        Err(ServiceError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_domain_matching_is_case_insensitive() {
    let h = TestHarness::new();
    seed_connection(&h, "acme", Some("Acme.COM")).await;

    let resolution = h
        .sso
        .resolve(&SsoHint::Email("user@ACME.com".to_string()))
        .await
        .unwrap();
    assert_eq!(resolution.team.slug, "acme");
}

#[tokio::test]
async fn test_one_connection_per_team() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;

    h.sso
        .register_connection(
            team.team_id,
            Some("acme.com".to_string()),
            "product-1".to_string(),
            "https://idp.example.com/acme".to_string(),
            "https://idp.example.com/acme/sso".to_string(),
        )
        .await
        .unwrap();

    assert!(matches!(
        h.sso
            .register_connection(
                team.team_id,
                Some("acme.io".to_string()),
                "product-1".to_string(),
                "https://idp.example.com/acme2".to_string(),
                "https://idp.example.com/acme2/sso".to_string(),
            )
            .await,
        Err(ServiceError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_redirect_url_carries_tenant_and_product() {
    let h = TestHarness::new();
    seed_connection(&h, "acme", Some("acme.com")).await;

    let resolution = h
        .sso
        .resolve(&SsoHint::Email("user@acme.com".to_string()))
        .await
        .unwrap();
    let url = h.sso.redirect_url(&resolution);

    assert!(url.starts_with("https://idp.example.com/acme/sso?"));
    assert!(url.contains(&format!("tenant={}", resolution.team.team_id)));
    assert!(url.contains("product=product-1"));
}

#[tokio::test]
async fn test_removed_connection_stops_resolving() {
    let h = TestHarness::new();
    let team = h.seed_team("acme").await;
    let connection = h
        .sso
        .register_connection(
            team.team_id,
            Some("acme.com".to_string()),
            "product-1".to_string(),
            "https://idp.example.com/acme".to_string(),
            "https://idp.example.com/acme/sso".to_string(),
        )
        .await
        .unwrap();

    h.sso.remove_connection(connection.connection_id).await.unwrap();

    assert!(matches!(
        h.sso
            .resolve(&SsoHint::Email("user@acme.com".to_string()))
            .await,
        Err(ServiceError::NotFound)
    ));
}

//! End-to-end scope and retention scenarios over an on-disk SQLite store.

use envkeep_integration_tests::Workspace;
use envkeep_secrets::{EncryptionKey, RenameTarget, Vault, VaultError};

#[tokio::test]
async fn test_listing_shows_only_active_values() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    vault.set("CAT1", "CAT1", true).await.unwrap();
    vault.set("CAT2", "CAT2", false).await.unwrap();
    vault.set("CAT1", "CAT1.2", true).await.unwrap();
    vault.close().await;

    let vault = ws.vault("test").await;
    let listed: Vec<(String, String)> = vault
        .entries()
        .iter()
        .map(|(k, v)| (k.to_string(), v.expose_secret().to_string()))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("CAT1".to_string(), "CAT1.2".to_string()),
            ("CAT2".to_string(), "CAT2".to_string()),
        ]
    );
    assert!(!listed.iter().any(|(k, v)| k == "CAT1" && v == "CAT1"));
}

#[tokio::test]
async fn test_project_value_shadows_earlier_global() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    vault.set("GET1", "GET1", true).await.unwrap();
    vault.set("GET1", "GET1.2", false).await.unwrap();
    vault.close().await;

    assert_eq!(ws.lookup("test", "GET1").await.as_deref(), Some("GET1.2"));
    assert_eq!(ws.lookup("other", "GET1").await.as_deref(), Some("GET1"));
    assert_eq!(ws.lookup("*", "GET1").await.as_deref(), Some("GET1"));
}

#[tokio::test]
async fn test_global_write_does_not_override_project_value() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    vault.set("URL", "local", false).await.unwrap();
    vault.set("URL", "shared", true).await.unwrap();
    assert_eq!(vault.get("URL").unwrap().expose_secret(), "local");
    vault.close().await;

    assert_eq!(ws.lookup("test", "URL").await.as_deref(), Some("local"));
    assert_eq!(ws.lookup("other", "URL").await.as_deref(), Some("shared"));
}

#[tokio::test]
async fn test_removing_global_value_hides_it_everywhere() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    vault.set("RM1", "RM1", true).await.unwrap();
    assert_eq!(ws.lookup("other", "RM1").await.as_deref(), Some("RM1"));

    let deleted = vault.delete("RM1", false, true).await.unwrap();
    assert_eq!(deleted, vec!["RM1".to_string()]);
    assert!(vault.get("RM1").is_none());
    vault.close().await;

    assert_eq!(ws.lookup("test", "RM1").await, None);
    assert_eq!(ws.lookup("other", "RM1").await, None);
}

#[tokio::test]
async fn test_clear_with_zero_offset_restarts_history() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    for value in ["v1", "v2", "v3"] {
        vault.set("TMP", value, false).await.unwrap();
    }
    assert_eq!(vault.history("TMP", false, true).await.unwrap().len(), 3);

    let deleted = vault.clear(0, false).await.unwrap();
    assert_eq!(deleted.len(), 3);
    assert!(vault.get("TMP").is_none());

    vault.set("TMP", "fresh", false).await.unwrap();
    let history = vault.history("TMP", false, true).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].deprecated);
    vault.close().await;

    assert_eq!(ws.lookup("test", "TMP").await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_prune_keeps_newest_deprecated_versions() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    for value in ["v1", "v2", "v3", "v4"] {
        vault.set("TMP", value, false).await.unwrap();
    }

    let deleted = vault.prune(1, false).await.unwrap();
    assert_eq!(deleted.len(), 2);

    let history = vault.history("TMP", false, true).await.unwrap();
    let values: Vec<String> = history
        .iter()
        .map(|v| vault.reveal(v).unwrap().expose_secret().to_string())
        .collect();
    assert_eq!(values, vec!["v4".to_string(), "v3".to_string()]);
    vault.close().await;
}

#[tokio::test]
async fn test_project_rename_moves_variables() {
    let ws = Workspace::new();
    let mut vault = ws.vault("billing").await;
    vault.set("TOKEN", "t", false).await.unwrap();

    let moved = vault
        .rename("billing", "invoicing", RenameTarget::Project)
        .await
        .unwrap();
    assert_eq!(moved, 1);
    assert_eq!(vault.project().as_str(), "invoicing");
    vault.close().await;

    assert_eq!(ws.lookup("invoicing", "TOKEN").await.as_deref(), Some("t"));
    assert_eq!(ws.lookup("billing", "TOKEN").await, None);
}

#[tokio::test]
async fn test_rotation_survives_reopen() {
    let ws = Workspace::new();
    let mut vault = ws.vault("test").await;
    vault.set("A", "project", false).await.unwrap();
    vault.set("B", "global", true).await.unwrap();

    let new_key = EncryptionKey::generate();
    assert_eq!(vault.rotate(new_key.clone()).await.unwrap(), 2);
    vault.close().await;

    let mut config = ws.config("test");
    config.encryption_key = Some(new_key.to_hex());
    let mut reopened = Vault::open(&config).await.unwrap();
    reopened.load().await.unwrap();
    assert_eq!(reopened.get("A").unwrap().expose_secret(), "project");
    assert_eq!(reopened.get("B").unwrap().expose_secret(), "global");
    reopened.close().await;

    let mut stale = Vault::open(&ws.config("test")).await.unwrap();
    assert!(matches!(stale.load().await, Err(VaultError::Decryption(_))));
}

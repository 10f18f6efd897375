//! Authorization scenarios over the reference policy set, end to end
//! through the policy store and ACL cache.

use std::time::Duration;

use serde_json::json;

use strongroom::{Authorization, Operation, Request, Strongroom, StrongroomConfig};
use strongroom_store::MemoryStorage;
use strongroom_testkit::reference_policies;

async fn strongroom() -> Strongroom<MemoryStorage> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let strongroom = Strongroom::new(MemoryStorage::new(), StrongroomConfig::default()).unwrap();
    for policy in reference_policies() {
        strongroom.policies().set_policy(policy).await.unwrap();
    }
    strongroom
}

async fn allowed(sr: &Strongroom<MemoryStorage>, policy: &str, op: Operation, path: &str) -> bool {
    sr.authorize(&[policy], &Request::new(op, path))
        .await
        .unwrap()
        .allowed
}

fn deploy() -> Request {
    Request::new(Operation::Update, "secret/ci/deploy")
        .with_param("env", json!("staging"))
        .with_param("version", json!("1.4.2"))
        .with_wrap_ttl(Duration::from_secs(600))
}

#[tokio::test]
async fn test_dev_scopes() {
    let sr = strongroom().await;

    assert!(allowed(&sr, "dev", Operation::Update, "secret/dev/app").await);
    assert!(allowed(&sr, "dev", Operation::Create, "secret/dev/app/db").await);
    assert!(allowed(&sr, "dev", Operation::List, "secret/shared/").await);
    assert!(!allowed(&sr, "dev", Operation::Update, "secret/shared/token").await);
    assert!(!allowed(&sr, "dev", Operation::Read, "secret/prod/db").await);
    assert!(!allowed(&sr, "dev", Operation::Patch, "secret/dev/app").await);
    assert!(!allowed(&sr, "dev", Operation::Recover, "secret/dev/app").await);
}

#[tokio::test]
async fn test_help_is_always_allowed() {
    let sr = strongroom().await;
    let decision = sr
        .authorize(&["nobody"], &Request::new(Operation::Help, "anything"))
        .await
        .unwrap();
    assert_eq!(decision, Authorization::new(true, false));
}

#[tokio::test]
async fn test_sudo_and_exact_deny() {
    let sr = strongroom().await;

    let mounts = sr
        .authorize(&["ops"], &Request::new(Operation::Read, "sys/mounts"))
        .await
        .unwrap();
    assert_eq!(mounts, Authorization::new(true, true));

    let seal = sr
        .authorize(&["ops"], &Request::new(Operation::Update, "sys/seal"))
        .await
        .unwrap();
    assert!(!seal.allowed);
    assert_eq!(sr.capabilities(&["ops"], "sys/seal").await.unwrap(), vec!["deny"]);
    assert_eq!(
        sr.capabilities(&["ops"], "sys/mounts").await.unwrap(),
        vec!["sudo", "read", "update"]
    );
}

#[tokio::test]
async fn test_deny_survives_other_policies() {
    let sr = strongroom().await;
    let everyone = ["dev", "ops", "ci", "auditor"];

    let decision = sr
        .authorize(&everyone, &Request::new(Operation::Read, "sys/seal"))
        .await
        .unwrap();
    assert!(!decision.allowed);
}

#[tokio::test]
async fn test_parameter_filtering() {
    let sr = strongroom().await;
    let ci = ["ci"];

    assert!(sr.authorize(&ci, &deploy()).await.unwrap().allowed);

    let glob_value = deploy().with_param("env", json!("prod-eu-1"));
    assert!(sr.authorize(&ci, &glob_value).await.unwrap().allowed);

    let bad_value = deploy().with_param("env", json!("dev"));
    assert!(!sr.authorize(&ci, &bad_value).await.unwrap().allowed);

    let forced = deploy().with_param("FORCE", json!(false));
    assert!(!sr.authorize(&ci, &forced).await.unwrap().allowed);

    let unknown = deploy().with_param("region", json!("eu"));
    assert!(!sr.authorize(&ci, &unknown).await.unwrap().allowed);

    let mut missing = deploy();
    missing.data.remove("version");
    assert!(!sr.authorize(&ci, &missing).await.unwrap().allowed);
}

#[tokio::test]
async fn test_wrapping_ttl_bounds() {
    let sr = strongroom().await;
    let ci = ["ci"];

    let mut unwrapped = deploy();
    unwrapped.wrap_ttl = None;
    assert!(!sr.authorize(&ci, &unwrapped).await.unwrap().allowed);

    let short = deploy().with_wrap_ttl(Duration::from_secs(30));
    assert!(!sr.authorize(&ci, &short).await.unwrap().allowed);

    let long = deploy().with_wrap_ttl(Duration::from_secs(7200));
    assert!(!sr.authorize(&ci, &long).await.unwrap().allowed);

    let edge = deploy().with_wrap_ttl(Duration::from_secs(3600));
    assert!(sr.authorize(&ci, &edge).await.unwrap().allowed);
}

#[tokio::test]
async fn test_glob_everything_and_exact_override() {
    let sr = strongroom().await;
    let auditor = ["auditor"];

    assert!(sr
        .authorize(&auditor, &Request::new(Operation::List, "secret/anything"))
        .await
        .unwrap()
        .allowed);
    assert!(!sr
        .authorize(&auditor, &Request::new(Operation::Read, "secret/anything"))
        .await
        .unwrap()
        .allowed);

    // The exact rule replaces the glob match; it does not inherit list.
    assert_eq!(
        sr.capabilities(&auditor, "sys/audit").await.unwrap(),
        vec!["read"]
    );
}

#[tokio::test]
async fn test_root_and_unknown_policies() {
    let sr = strongroom().await;

    let root = sr
        .authorize(&["Root"], &Request::new(Operation::Delete, "sys/seal"))
        .await
        .unwrap();
    assert_eq!(root, Authorization::ROOT);

    let nobody = sr
        .authorize(&["ghost"], &Request::new(Operation::Read, "secret/dev/app"))
        .await
        .unwrap();
    assert_eq!(nobody, Authorization::DENIED);
}

#[tokio::test]
async fn test_policy_update_takes_effect() {
    let sr = strongroom().await;
    let request = Request::new(Operation::Read, "secret/dev/app");
    assert!(sr.authorize(&["dev"], &request).await.unwrap().allowed);

    sr.policies().delete_policy("dev").await.unwrap();
    assert!(!sr.authorize(&["dev"], &request).await.unwrap().allowed);
}

mod common;

use chrono::Duration;
use financecontrol::auth::{AuthService, SESSION_FILE};
use financecontrol::error::AuthError;
use financecontrol::seed::{ADMIN_EMAIL, ADMIN_ID, ADMIN_PASSWORD};
use tempfile::TempDir;

fn service(dir: &TempDir) -> AuthService {
    let mut auth = AuthService::new(dir.path().join("database"));
    auth.seed_admin().unwrap();
    auth
}

#[test]
fn admin_logs_in_and_is_restored() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();

    assert!(auth.restore().unwrap().is_none());

    let session = auth.login(&mut store, " ADMIN@empresa.com", ADMIN_PASSWORD).unwrap();
    assert_eq!(session.user.id, ADMIN_ID);
    assert!(session.user.data_ultima_sessao.is_some());
    assert_eq!(store.user(ADMIN_ID).unwrap().data_ultima_sessao, session.user.data_ultima_sessao);
    assert_eq!(auth.validate_session(&session.token), Some(ADMIN_ID));
    assert!(dir.path().join("database").join(SESSION_FILE).exists());

    let restored = auth.restore().unwrap().expect("persisted user");
    assert_eq!(restored.email, ADMIN_EMAIL);
    println!("✓ Login persisted the session user");
}

#[test]
fn wrong_credentials_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();

    let err = auth.login(&mut store, ADMIN_EMAIL, "errada").unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(err.to_string(), "Email ou senha inválidos");

    let err = auth.login(&mut store, "ninguem@empresa.com", ADMIN_PASSWORD).unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    // generated accounts have no password until one is set
    let active = store.users().iter().find(|u| u.ativo && u.id != ADMIN_ID).unwrap().clone();
    let err = auth.login(&mut store, &active.email, "qualquer").unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    auth.set_password(active.id, "segredo1").unwrap();
    assert!(auth.login(&mut store, &active.email, "segredo1").is_ok());
}

#[test]
fn inactive_users_cannot_log_in() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();
    let inactive = store.users().iter().find(|u| !u.ativo).unwrap().clone();
    auth.set_password(inactive.id, "segredo1").unwrap();

    let err = auth.login(&mut store, &inactive.email, "segredo1").unwrap_err();
    assert!(matches!(err, AuthError::InactiveUser));
}

#[test]
fn sessions_expire() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir).with_session_duration(Duration::zero());
    let mut store = common::seeded_store();

    let session = auth.login(&mut store, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
    assert_eq!(auth.validate_session(&session.token), None);
    assert_eq!(auth.purge_expired(), vec![session.token.clone()]);
    assert!(auth.purge_expired().is_empty());
}

#[test]
fn logout_forgets_session_and_file() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();

    let session = auth.login(&mut store, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
    auth.logout(&session.token).unwrap();
    assert_eq!(auth.validate_session(&session.token), None);
    assert!(auth.restore().unwrap().is_none());

    // nothing left to remove
    auth.logout(&session.token).unwrap();
}

#[test]
fn current_user_is_only_rewritten_for_the_same_account() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();
    let session = auth.login(&mut store, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();

    let mut renamed = session.user.clone();
    renamed.nome = "Administradora".to_string();
    assert!(auth.update_current_user(&renamed).unwrap());
    assert_eq!(auth.restore().unwrap().unwrap().nome, "Administradora");

    let other = store.users().iter().find(|u| u.id != ADMIN_ID).unwrap().clone();
    assert!(!auth.update_current_user(&other).unwrap());
    assert_eq!(auth.restore().unwrap().unwrap().id, ADMIN_ID);
}

#[test]
fn password_changes() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();

    assert!(matches!(
        auth.change_password(ADMIN_ID, "errada", "novasenha"),
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.change_password(ADMIN_ID, ADMIN_PASSWORD, "curta"),
        Err(AuthError::PasswordTooShort)
    ));

    auth.change_password(ADMIN_ID, ADMIN_PASSWORD, "novasenha").unwrap();
    assert!(auth.login(&mut store, ADMIN_EMAIL, ADMIN_PASSWORD).is_err());
    assert!(auth.login(&mut store, ADMIN_EMAIL, "novasenha").is_ok());
}

#[test]
fn removed_users_lose_credentials_and_sessions() {
    let dir = TempDir::new().unwrap();
    let mut auth = service(&dir);
    let mut store = common::seeded_store();
    let session = auth.login(&mut store, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();

    assert_eq!(auth.remove_user(ADMIN_ID), vec![session.token.clone()]);
    assert!(!auth.has_password(ADMIN_ID));
    assert_eq!(auth.validate_session(&session.token), None);
}

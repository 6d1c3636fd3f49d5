use imsreg_core::db::open_db_in_memory;
use imsreg_core::repo::legal_register_repo::SqliteLegalRegisterRepository;
use imsreg_core::repo::lifecycle::{
    ArchiveChange, RecordLifecycleRepository, SqliteRecordLifecycleRepository,
};
use imsreg_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use imsreg_core::service::legal_register_service::LegalRegisterService;
use imsreg_core::service::lifecycle_service::RecordLifecycleService;
use imsreg_core::{
    FormData, Permission, RecordKind, RecordingInvalidator, RepoError, ServiceContext,
    ServiceError, SessionAccess, User,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> (Connection, User) {
    let conn = open_db_in_memory().unwrap();
    let user = User::new(Uuid::new_v4(), "Compliance Lead", "compliance@example.com");
    SqliteUserRepository::try_new(&conn)
        .unwrap()
        .upsert_user(&user)
        .unwrap();
    (conn, user)
}

fn create_entry(conn: &Connection, access: &SessionAccess, title: &str) -> Uuid {
    let routes = RecordingInvalidator::new();
    let service = LegalRegisterService::new(
        SqliteLegalRegisterRepository::try_new(conn).unwrap(),
        SqliteRecordLifecycleRepository::try_new(conn).unwrap(),
        ServiceContext::new(access, &routes),
    );
    service
        .create_from_form(&FormData::new().with("title", title))
        .unwrap()
        .id
}

#[test]
fn archive_is_reversible() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write]);
    let id = create_entry(&conn, &access, "Working Time Regulations");
    let routes = RecordingInvalidator::new();
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&access, &routes),
    );

    assert_eq!(
        service.archive(RecordKind::LegalRegister, id).unwrap(),
        ArchiveChange::Changed
    );
    assert_eq!(service.count(RecordKind::LegalRegister, false).unwrap(), 0);
    assert_eq!(service.count(RecordKind::LegalRegister, true).unwrap(), 1);

    assert_eq!(
        service.unarchive(RecordKind::LegalRegister, id).unwrap(),
        ArchiveChange::Changed
    );
    assert_eq!(service.count(RecordKind::LegalRegister, false).unwrap(), 1);
    assert_eq!(routes.snapshot(), vec!["/legal-register".to_string()]);
}

#[test]
fn archiving_twice_reports_unchanged() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write]);
    let id = create_entry(&conn, &access, "Equality Act");
    let routes = RecordingInvalidator::new();
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&access, &routes),
    );

    service.archive(RecordKind::LegalRegister, id).unwrap();
    assert_eq!(
        service.archive(RecordKind::LegalRegister, id).unwrap(),
        ArchiveChange::Unchanged
    );
}

#[test]
fn toggle_flips_archived_state() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write]);
    let id = create_entry(&conn, &access, "GDPR");
    let routes = RecordingInvalidator::new();
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&access, &routes),
    );

    assert!(service.toggle_archive(RecordKind::LegalRegister, id).unwrap());
    assert!(!service.toggle_archive(RecordKind::LegalRegister, id).unwrap());
}

#[test]
fn delete_requires_delete_permission() {
    let (conn, user) = setup();
    let writer = SessionAccess::new(user.clone(), [Permission::Write]);
    let id = create_entry(&conn, &writer, "Fire Safety Order");
    let routes = RecordingInvalidator::new();
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&writer, &routes),
    );

    let err = service.delete(RecordKind::LegalRegister, id).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
    assert_eq!(service.count(RecordKind::LegalRegister, true).unwrap(), 1);
    assert!(routes.snapshot().is_empty());
}

#[test]
fn delete_is_terminal() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write, Permission::Delete]);
    let id = create_entry(&conn, &access, "COSHH");
    let routes = RecordingInvalidator::new();
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&access, &routes),
    );

    service.delete(RecordKind::LegalRegister, id).unwrap();
    assert_eq!(service.count(RecordKind::LegalRegister, true).unwrap(), 0);

    let err = service.delete(RecordKind::LegalRegister, id).unwrap_err();
    match err {
        ServiceError::NotFound { entity, id: missing } => {
            assert_eq!(entity, "legal register entry");
            assert_eq!(missing, id);
        }
        other => panic!("unexpected error: {other}"),
    }
    let err = service.unarchive(RecordKind::LegalRegister, id).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn anonymous_and_inactive_users_cannot_mutate() {
    let (conn, user) = setup();
    let writer = SessionAccess::new(user.clone(), [Permission::Write]);
    let id = create_entry(&conn, &writer, "RIDDOR");
    let routes = RecordingInvalidator::new();

    let anonymous = SessionAccess::anonymous();
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&anonymous, &routes),
    );
    let err = service.archive(RecordKind::LegalRegister, id).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));

    let mut inactive_user = user;
    inactive_user.active = false;
    let inactive = SessionAccess::new(inactive_user, [Permission::Write, Permission::Delete]);
    let service = RecordLifecycleService::new(
        SqliteRecordLifecycleRepository::try_new(&conn).unwrap(),
        ServiceContext::new(&inactive, &routes),
    );
    let err = service.archive(RecordKind::LegalRegister, id).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
    assert!(routes.snapshot().is_empty());
}

#[test]
fn repository_reports_missing_records() {
    let (conn, user) = setup();
    let repo = SqliteRecordLifecycleRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    for kind in RecordKind::ALL {
        assert_eq!(repo.archived_state(kind, missing).unwrap(), None);
        let err = repo.set_archived(kind, missing, true, user.id).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
        let err = repo.delete_record(kind, missing).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { .. }));
    }
}

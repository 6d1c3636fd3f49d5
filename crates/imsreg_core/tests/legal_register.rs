use imsreg_core::db::open_db_in_memory;
use imsreg_core::model::legal_register::LegalRegisterEntry;
use imsreg_core::repo::legal_register_repo::SqliteLegalRegisterRepository;
use imsreg_core::repo::lifecycle::SqliteRecordLifecycleRepository;
use imsreg_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use imsreg_core::service::legal_register_service::LegalRegisterService;
use imsreg_core::{
    FormData, Permission, RecordingInvalidator, ServiceContext, ServiceError, SessionAccess, User,
};
use rusqlite::Connection;
use uuid::Uuid;

type Service<'a> = LegalRegisterService<
    'a,
    SqliteLegalRegisterRepository<'a>,
    SqliteRecordLifecycleRepository<'a>,
>;

fn setup() -> (Connection, User) {
    let conn = open_db_in_memory().unwrap();
    let user = User::new(Uuid::new_v4(), "Compliance Lead", "compliance@example.com");
    SqliteUserRepository::try_new(&conn)
        .unwrap()
        .upsert_user(&user)
        .unwrap();
    (conn, user)
}

fn service<'a>(conn: &'a Connection, ctx: ServiceContext<'a>) -> Service<'a> {
    LegalRegisterService::new(
        SqliteLegalRegisterRepository::try_new(conn).unwrap(),
        SqliteRecordLifecycleRepository::try_new(conn).unwrap(),
        ctx,
    )
}

fn create(service: &Service<'_>, title: &str) -> LegalRegisterEntry {
    service
        .create_from_form(
            &FormData::new()
                .with("title", title)
                .with("legislation", "UK statute")
                .with("requirements", "Annual review"),
        )
        .unwrap()
}

fn titles(entries: &[LegalRegisterEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.title.as_str()).collect()
}

#[test]
fn new_entries_await_approval() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write]);
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = create(&service, "Health and Safety at Work Act");
    assert!(!entry.approved);
    assert!(entry.latest_review.is_none());

    let views = service.views().unwrap();
    assert!(views.approved.is_empty());
    assert_eq!(
        titles(&views.awaiting_approval),
        vec!["Health and Safety at Work Act"]
    );
    assert!(views.archived.is_empty());
}

#[test]
fn views_split_by_state_newest_first() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write]);
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let first = create(&service, "Environmental Protection Act");
    let second = create(&service, "Data Protection Act");
    let third = create(&service, "Modern Slavery Act");
    create(&service, "Bribery Act");

    service.approve(first.id).unwrap();
    service.approve(second.id).unwrap();
    service.archive(third.id).unwrap();

    let views = service.views().unwrap();
    assert_eq!(
        titles(&views.approved),
        vec!["Data Protection Act", "Environmental Protection Act"]
    );
    assert_eq!(titles(&views.awaiting_approval), vec!["Bribery Act"]);
    assert_eq!(titles(&views.archived), vec!["Modern Slavery Act"]);
}

#[test]
fn approve_stamps_and_invalidates_detail_route() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user.clone(), [Permission::Write]);
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = create(&service, "Working at Height Regulations");
    routes.take();

    let approved = service.approve(entry.id).unwrap();
    assert!(approved.approved);
    assert_eq!(approved.stamp.updated_by, Some(user.id));
    let invalidated = routes.take();
    assert!(invalidated.contains(&"/legal-register".to_string()));
    assert!(invalidated.contains(&format!("/legal-register/{}", entry.id)));
}

#[test]
fn approve_requires_write_and_existing_entry() {
    let (conn, user) = setup();
    let writer = SessionAccess::new(user, [Permission::Write]);
    let routes = RecordingInvalidator::new();
    let editor = service(&conn, ServiceContext::new(&writer, &routes));
    let entry = create(&editor, "Noise at Work Regulations");

    let reader_access = SessionAccess::new(
        User::new(Uuid::new_v4(), "Reader", "reader@example.com"),
        [],
    );
    let reader = service(&conn, ServiceContext::new(&reader_access, &routes));
    assert!(matches!(
        reader.approve(entry.id).unwrap_err(),
        ServiceError::Unauthorized
    ));

    assert!(matches!(
        editor.approve(Uuid::new_v4()).unwrap_err(),
        ServiceError::NotFound { .. }
    ));
}

#[test]
fn latest_review_is_most_recent_review_date() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user.clone(), [Permission::Write]);
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = create(&service, "Control of Asbestos Regulations");
    service.approve(entry.id).unwrap();

    for (date, notes) in [
        ("2025-06-01", "Initial review"),
        ("2026-06-01", "No changes"),
        ("2025-12-01", "Amendment noted"),
    ] {
        service
            .add_review_from_form(
                entry.id,
                &FormData::new().with("reviewDate", date).with("notes", notes),
            )
            .unwrap();
    }

    let loaded = service.get(entry.id).unwrap();
    let latest = loaded.latest_review.unwrap();
    assert_eq!(latest.review_date.to_string(), "2026-06-01");
    assert_eq!(latest.notes, "No changes");
    assert_eq!(latest.reviewed_by, user.id);

    let reviews = service.reviews(entry.id).unwrap();
    let dates = reviews
        .iter()
        .map(|review| review.review_date.to_string())
        .collect::<Vec<_>>();
    assert_eq!(dates, vec!["2026-06-01", "2025-12-01", "2025-06-01"]);

    let views = service.views().unwrap();
    assert_eq!(
        views.approved[0]
            .latest_review
            .as_ref()
            .map(|review| review.notes.as_str()),
        Some("No changes")
    );
}

#[test]
fn review_requires_date_and_existing_entry() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write]);
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = create(&service, "Electricity at Work Regulations");
    let err = service
        .add_review_from_form(entry.id, &FormData::new().with("notes", "missing date"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = service
        .add_review_from_form(
            Uuid::new_v4(),
            &FormData::new().with("reviewDate", "2026-01-01"),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert!(service.reviews(entry.id).unwrap().is_empty());
}

#[test]
fn delete_removes_reviews() {
    let (conn, user) = setup();
    let access = SessionAccess::new(user, [Permission::Write, Permission::Delete]);
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = create(&service, "PUWER");
    service
        .add_review_from_form(entry.id, &FormData::new().with("reviewDate", "2026-01-01"))
        .unwrap();

    service.delete(entry.id).unwrap();
    let remaining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM legal_register_reviews WHERE legal_register_id = ?1;",
            [entry.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}

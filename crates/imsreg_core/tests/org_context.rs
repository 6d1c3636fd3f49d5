use imsreg_core::db::open_db_in_memory;
use imsreg_core::repo::lifecycle::SqliteRecordLifecycleRepository;
use imsreg_core::repo::org_context_repo::SqliteOrganizationalContextRepository;
use imsreg_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use imsreg_core::service::org_context_service::OrganizationalContextService;
use imsreg_core::{
    ArchiveView, FormData, Permission, RecordKind, RecordingInvalidator, ServiceContext,
    ServiceError, SessionAccess, User,
};
use rusqlite::Connection;
use uuid::Uuid;

type Service<'a> = OrganizationalContextService<
    'a,
    SqliteOrganizationalContextRepository<'a>,
    SqliteRecordLifecycleRepository<'a>,
>;

fn setup() -> (Connection, SessionAccess) {
    let conn = open_db_in_memory().unwrap();
    let user = User::new(Uuid::new_v4(), "Managing Director", "md@example.com");
    SqliteUserRepository::try_new(&conn)
        .unwrap()
        .upsert_user(&user)
        .unwrap();
    (
        conn,
        SessionAccess::new(user, [Permission::Write, Permission::Delete]),
    )
}

fn service<'a>(conn: &'a Connection, ctx: ServiceContext<'a>) -> Service<'a> {
    OrganizationalContextService::new(
        SqliteOrganizationalContextRepository::try_new(conn).unwrap(),
        SqliteRecordLifecycleRepository::try_new(conn).unwrap(),
        ctx,
    )
}

fn issue(category: &str, text: &str) -> FormData {
    FormData::new().with("category", category).with("issue", text)
}

#[test]
fn create_keeps_objectives_in_submitted_order() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = service
        .create_from_form(
            &issue("External", "New packaging regulations")
                .with("subCategory", "Legal")
                .with("objectives", "Reduce plastic use")
                .with("objectives", "Stay compliant")
                .with("initialLikelihood", "2")
                .with("initialSeverity", "4")
                .with("controlsRecommendations", "Track consultation"),
        )
        .unwrap();

    assert_eq!(entry.category, "external");
    assert_eq!(entry.sub_category.as_deref(), Some("Legal"));
    assert_eq!(entry.objectives, vec!["Reduce plastic use", "Stay compliant"]);
    assert_eq!(entry.initial_risk_level(), 8);
    assert_eq!(entry.residual_risk_level(), 9);

    let loaded = service.get(entry.id).unwrap();
    assert_eq!(loaded, entry);
    assert!(routes
        .snapshot()
        .contains(&"/organisational-context".to_string()));
}

#[test]
fn grouped_list_sorts_categories_and_keeps_newest_first() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    service
        .create_from_form(&issue("internal", "Staff turnover"))
        .unwrap();
    service
        .create_from_form(&issue("external", "Energy prices"))
        .unwrap();
    service
        .create_from_form(&issue("internal", "Ageing IT estate"))
        .unwrap();

    let groups = service.list_grouped(ArchiveView::Active).unwrap();
    let categories = groups
        .iter()
        .map(|group| group.category.as_str())
        .collect::<Vec<_>>();
    assert_eq!(categories, vec!["external", "internal"]);

    let internal = groups[1]
        .entries
        .iter()
        .map(|entry| entry.issue.as_str())
        .collect::<Vec<_>>();
    assert_eq!(internal, vec!["Ageing IT estate", "Staff turnover"]);
}

#[test]
fn archived_entries_show_only_when_requested() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = service
        .create_from_form(&issue("external", "Brexit customs changes"))
        .unwrap();
    service
        .create_from_form(&issue("external", "Competitor pricing"))
        .unwrap();
    let archived = service.toggle_archive(entry.id).unwrap();
    assert!(archived.archived);

    assert_eq!(service.list(ArchiveView::Active).unwrap().len(), 1);
    let shown = ArchiveView::from_show_archived(RecordKind::OrganizationalContext, Some("true"));
    assert_eq!(shown, ArchiveView::All);
    assert_eq!(service.list(shown).unwrap().len(), 2);

    let restored = service.toggle_archive(entry.id).unwrap();
    assert!(!restored.archived);
}

#[test]
fn update_replaces_objectives() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let entry = service
        .create_from_form(&issue("internal", "Key person dependency").with("objectives", "A"))
        .unwrap();
    let updated = service
        .update_from_form(
            entry.id,
            &issue("internal", "Key person dependency").with("objectives", "B"),
        )
        .unwrap();
    assert_eq!(updated.objectives, vec!["B"]);
    assert!(updated.stamp.updated_by.is_some());
}

#[test]
fn missing_issue_is_rejected_and_missing_entry_not_found() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let err = service
        .create_from_form(&FormData::new().with("category", "internal"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = service
        .update_from_form(Uuid::new_v4(), &issue("internal", "Anything"))
        .unwrap_err();
    match err {
        ServiceError::NotFound { entity, .. } => {
            assert_eq!(entity, "organizational context entry")
        }
        other => panic!("unexpected error: {other}"),
    }
}

use imsreg_core::db::open_db_in_memory;
use imsreg_core::model::improvement::{Improvement, ImprovementListQuery, ImprovementType};
use imsreg_core::repo::improvement_repo::SqliteImprovementRepository;
use imsreg_core::repo::lifecycle::SqliteRecordLifecycleRepository;
use imsreg_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use imsreg_core::service::improvement_service::ImprovementService;
use imsreg_core::{
    ArchiveView, CompletionFilter, FormData, Permission, RecordKind, RecordingInvalidator,
    ServiceContext, ServiceError, SessionAccess, User, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

type Service<'a> =
    ImprovementService<'a, SqliteImprovementRepository<'a>, SqliteRecordLifecycleRepository<'a>>;

fn setup() -> (Connection, SessionAccess) {
    let conn = open_db_in_memory().unwrap();
    let user = User::new(Uuid::new_v4(), "Quality Manager", "qm@example.com");
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
    ImprovementService::new(
        SqliteImprovementRepository::try_new(conn).unwrap(),
        SqliteRecordLifecycleRepository::try_new(conn).unwrap(),
        ctx,
    )
}

fn report(category: &str, improvement_type: &str) -> FormData {
    FormData::new()
        .with("category", category)
        .with("type", improvement_type)
        .with("description", "Pallet dropped in goods-in")
        .with("dateRaised", "2026-02-10")
}

fn numbers(improvements: &[Improvement]) -> Vec<i64> {
    improvements.iter().map(|item| item.number).collect()
}

#[test]
fn numbers_are_assigned_in_sequence_and_listed_newest_first() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    assert_eq!(service.next_number().unwrap(), 1);
    let first = service.create_from_form(&report("Near Miss", "ofi")).unwrap();
    let second = service
        .create_from_form(&report("Complaint", "Non Conformance"))
        .unwrap();

    assert_eq!(first.number, 1);
    assert_eq!(second.number, 2);
    assert_eq!(second.improvement_type, ImprovementType::NonConformance);
    assert_eq!(service.next_number().unwrap(), 3);

    let listed = service.list(&ImprovementListQuery::default()).unwrap();
    assert_eq!(numbers(&listed), vec![2, 1]);
    assert!(routes.snapshot().contains(&"/improvement-register".to_string()));
}

#[test]
fn archived_improvements_keep_their_number() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    service.create_from_form(&report("Near Miss", "ofi")).unwrap();
    let second = service.create_from_form(&report("Accident", "ofi")).unwrap();
    service.archive(second.id).unwrap();

    let third = service.create_from_form(&report("Accident", "ofi")).unwrap();
    assert_eq!(third.number, 3);
    assert_eq!(service.get(second.id).unwrap().number, 2);
}

#[test]
fn show_archived_swaps_to_archived_only() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    service.create_from_form(&report("Near Miss", "ofi")).unwrap();
    let archived = service.create_from_form(&report("Accident", "ofi")).unwrap();
    service.archive(archived.id).unwrap();

    let view = ArchiveView::from_show_archived(RecordKind::Improvement, Some("true"));
    let query = ImprovementListQuery {
        view,
        ..ImprovementListQuery::default()
    };
    assert_eq!(numbers(&service.list(&query).unwrap()), vec![2]);
    assert_eq!(
        numbers(&service.list(&ImprovementListQuery::default()).unwrap()),
        vec![1]
    );
}

#[test]
fn filters_combine() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    service
        .create_from_form(&report("Near Miss", "ofi").with("rootCauseType", "Human Error"))
        .unwrap();
    service
        .create_from_form(
            &report("Near Miss", "non_conformance")
                .with("rootCauseType", "Machinery")
                .with("dateCompleted", "2026-03-01"),
        )
        .unwrap();
    service
        .create_from_form(&report("Complaint", "major_non_conformance"))
        .unwrap();

    let open = ImprovementListQuery {
        completion: CompletionFilter::Open,
        ..ImprovementListQuery::default()
    };
    assert_eq!(numbers(&service.list(&open).unwrap()), vec![3, 1]);

    let completed = ImprovementListQuery {
        completion: CompletionFilter::Completed,
        ..ImprovementListQuery::default()
    };
    let done = service.list(&completed).unwrap();
    assert_eq!(numbers(&done), vec![2]);
    assert!(done[0].is_completed());

    let near_misses = ImprovementListQuery {
        category: Some("Near Miss".to_string()),
        ..ImprovementListQuery::default()
    };
    assert_eq!(numbers(&service.list(&near_misses).unwrap()), vec![2, 1]);

    let majors = ImprovementListQuery {
        improvement_type: Some(ImprovementType::MajorNonConformance),
        ..ImprovementListQuery::default()
    };
    assert_eq!(numbers(&service.list(&majors).unwrap()), vec![3]);

    let human_error = ImprovementListQuery {
        category: Some("Near Miss".to_string()),
        root_cause_type: Some("Human Error".to_string()),
        ..ImprovementListQuery::default()
    };
    assert_eq!(numbers(&service.list(&human_error).unwrap()), vec![1]);
}

#[test]
fn update_keeps_number() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let created = service.create_from_form(&report("Near Miss", "ofi")).unwrap();
    let updated = service
        .update_from_form(
            created.id,
            &report("Health and Safety", "ofi")
                .with("correctiveAction", "Re-train forklift drivers")
                .with("dateCompleted", "2026-02-20"),
        )
        .unwrap();

    assert_eq!(updated.number, created.number);
    assert_eq!(updated.category, "Health and Safety");
    assert_eq!(
        updated.corrective_action.as_deref(),
        Some("Re-train forklift drivers")
    );
    assert!(updated.is_completed());
}

#[test]
fn unknown_category_is_rejected() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let err = service
        .create_from_form(&report("Parking", "ofi"))
        .unwrap_err();
    match err {
        ServiceError::Validation(ValidationError::UnknownOption { field, value }) => {
            assert_eq!(field, "category");
            assert_eq!(value, "Parking");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.next_number().unwrap(), 1);
}

#[test]
fn reader_cannot_raise_reports() {
    let (conn, _) = setup();
    let routes = RecordingInvalidator::new();
    let reader = SessionAccess::new(User::new(Uuid::new_v4(), "Reader", "r@example.com"), []);
    let service = service(&conn, ServiceContext::new(&reader, &routes));

    let err = service
        .create_from_form(&report("Near Miss", "ofi"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

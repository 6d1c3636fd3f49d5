use imsreg_core::db::open_db_in_memory;
use imsreg_core::model::interested_party::{InterestedParty, MoveDirection, ReorderOutcome};
use imsreg_core::repo::interested_party_repo::SqliteInterestedPartyRepository;
use imsreg_core::repo::lifecycle::SqliteRecordLifecycleRepository;
use imsreg_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use imsreg_core::service::interested_party_service::InterestedPartyService;
use imsreg_core::{
    ArchiveView, FormData, Permission, RecordingInvalidator, ServiceContext, ServiceError,
    SessionAccess, User,
};
use rusqlite::Connection;
use uuid::Uuid;

type PartyService<'a> = InterestedPartyService<
    'a,
    SqliteInterestedPartyRepository<'a>,
    SqliteRecordLifecycleRepository<'a>,
>;

fn setup() -> (Connection, SessionAccess) {
    let conn = open_db_in_memory().unwrap();
    let user = User::new(Uuid::new_v4(), "Quality Manager", "qm@example.com");
    SqliteUserRepository::try_new(&conn)
        .unwrap()
        .upsert_user(&user)
        .unwrap();
    let access = SessionAccess::new(user, [Permission::Write, Permission::Delete]);
    (conn, access)
}

fn service<'a>(conn: &'a Connection, ctx: ServiceContext<'a>) -> PartyService<'a> {
    InterestedPartyService::new(
        SqliteInterestedPartyRepository::try_new(conn).unwrap(),
        SqliteRecordLifecycleRepository::try_new(conn).unwrap(),
        ctx,
    )
}

fn create(service: &PartyService<'_>, name: &str) -> InterestedParty {
    service
        .create_from_form(&FormData::new().with("name", name))
        .unwrap()
}

fn active_names(service: &PartyService<'_>) -> Vec<String> {
    service
        .list(ArchiveView::Active)
        .unwrap()
        .into_iter()
        .map(|party| party.name)
        .collect()
}

fn active_orders(service: &PartyService<'_>) -> Vec<i64> {
    service
        .list(ArchiveView::Active)
        .unwrap()
        .into_iter()
        .map(|party| party.order)
        .collect()
}

#[test]
fn create_appends_to_end_of_order() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let first = create(&service, "Customers");
    let second = create(&service, "Suppliers");
    let third = create(&service, "Regulators");

    assert_eq!(first.order, 1);
    assert_eq!(second.order, 2);
    assert_eq!(third.order, 3);
    assert_eq!(
        active_names(&service),
        vec!["Customers", "Suppliers", "Regulators"]
    );
    assert!(routes.snapshot().contains(&"/interested-parties".to_string()));
}

#[test]
fn create_derives_risk_levels_with_default_ratings() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let party = service
        .create_from_form(
            &FormData::new()
                .with("name", "Employees")
                .with("initialLikelihood", "4")
                .with("initialSeverity", "5"),
        )
        .unwrap();

    assert_eq!(party.risk_level(), 20);
    assert_eq!(party.residual_risk_level(), 9);
}

#[test]
fn move_up_swaps_with_previous_neighbor() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    create(&service, "A");
    let b = create(&service, "B");
    let c = create(&service, "C");

    let outcome = service.reorder(c.id, MoveDirection::Up).unwrap();
    assert_eq!(
        outcome,
        ReorderOutcome::Moved {
            from: 3,
            to: 2,
            neighbor: b.id,
        }
    );
    assert_eq!(active_names(&service), vec!["A", "C", "B"]);
    assert_eq!(active_orders(&service), vec![1, 2, 3]);
}

#[test]
fn move_down_swaps_with_next_neighbor() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let a = create(&service, "A");
    create(&service, "B");
    create(&service, "C");

    service.reorder(a.id, MoveDirection::Down).unwrap();
    assert_eq!(active_names(&service), vec!["B", "A", "C"]);

    let moved = service.get(a.id).unwrap();
    assert_eq!(moved.order, 2);
    assert!(moved.stamp.updated_by.is_some());
}

#[test]
fn moving_past_either_end_is_a_successful_noop() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let a = create(&service, "A");
    create(&service, "B");
    let c = create(&service, "C");

    assert_eq!(
        service.reorder(a.id, MoveDirection::Up).unwrap(),
        ReorderOutcome::Unchanged
    );
    assert_eq!(
        service.reorder(c.id, MoveDirection::Down).unwrap(),
        ReorderOutcome::Unchanged
    );
    assert_eq!(active_names(&service), vec!["A", "B", "C"]);
    assert_eq!(active_orders(&service), vec![1, 2, 3]);
}

#[test]
fn moving_second_of_twenty_up_only_touches_the_pair() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let parties = (1..=20)
        .map(|index| create(&service, &format!("Party {index:02}")))
        .collect::<Vec<_>>();

    service.reorder(parties[1].id, MoveDirection::Up).unwrap();

    let listed = service.list(ArchiveView::Active).unwrap();
    assert_eq!(listed[0].id, parties[1].id);
    assert_eq!(listed[1].id, parties[0].id);
    for (index, party) in listed.iter().enumerate().skip(2) {
        assert_eq!(party.id, parties[index].id);
    }
    assert_eq!(active_orders(&service), (1..=20).collect::<Vec<i64>>());
}

#[test]
fn archive_closes_gap_and_unarchive_restores_position() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    create(&service, "A");
    let b = create(&service, "B");
    create(&service, "C");

    let archived = service.archive(b.id).unwrap();
    assert!(archived.archived);
    assert_eq!(archived.order, b.order);
    assert_eq!(active_names(&service), vec!["A", "C"]);
    assert_eq!(active_orders(&service), vec![1, 2]);

    let restored = service.unarchive(b.id).unwrap();
    assert!(!restored.archived);
    assert_eq!(restored.order, b.order);
    assert_eq!(restored.name, b.name);
    assert_eq!(restored.risk, b.risk);
    assert_eq!(active_names(&service), vec!["A", "B", "C"]);
    assert_eq!(active_orders(&service), vec![1, 2, 3]);
}

#[test]
fn unarchive_after_list_shrinks_lands_at_end() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let a = create(&service, "A");
    let b = create(&service, "B");
    create(&service, "C");

    service.archive(create(&service, "D").id).unwrap();
    service.delete(a.id).unwrap();
    service.delete(b.id).unwrap();

    let d = service
        .list(ArchiveView::Archived)
        .unwrap()
        .into_iter()
        .find(|party| party.name == "D")
        .unwrap();
    let restored = service.unarchive(d.id).unwrap();
    assert_eq!(restored.order, 2);
    assert_eq!(active_names(&service), vec!["C", "D"]);
    assert_eq!(active_orders(&service), vec![1, 2]);
}

#[test]
fn show_archived_lists_archived_after_active() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let a = create(&service, "A");
    create(&service, "B");
    service.archive(a.id).unwrap();

    let names = service
        .list(ArchiveView::All)
        .unwrap()
        .into_iter()
        .map(|party| party.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["B", "A"]);
    assert_eq!(active_names(&service), vec!["B"]);
}

#[test]
fn delete_closes_gap() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let a = create(&service, "A");
    create(&service, "B");
    create(&service, "C");

    service.delete(a.id).unwrap();
    assert_eq!(active_names(&service), vec!["B", "C"]);
    assert_eq!(active_orders(&service), vec![1, 2]);

    let err = service.get(a.id).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[test]
fn reorder_of_archived_party_is_noop() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    create(&service, "A");
    let b = create(&service, "B");
    service.archive(b.id).unwrap();

    assert_eq!(
        service.reorder(b.id, MoveDirection::Up).unwrap(),
        ReorderOutcome::Unchanged
    );
    assert_eq!(active_names(&service), vec!["A"]);
}

#[test]
fn reorder_missing_party_returns_not_found() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let err = service
        .reorder(Uuid::new_v4(), MoveDirection::Down)
        .unwrap_err();
    match err {
        ServiceError::NotFound { entity, .. } => assert_eq!(entity, "interested party"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reorder_requires_write_permission() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let editor = service(&conn, ServiceContext::new(&access, &routes));
    let a = create(&editor, "A");
    create(&editor, "B");

    let reader_access = SessionAccess::new(
        User::new(Uuid::new_v4(), "Reader", "reader@example.com"),
        [],
    );
    let reader = service(&conn, ServiceContext::new(&reader_access, &routes));
    let err = reader.reorder(a.id, MoveDirection::Down).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
    assert_eq!(active_names(&editor), vec!["A", "B"]);
}

#[test]
fn update_rewrites_fields_and_invalidates_detail_route() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let party = create(&service, "Customers");
    routes.take();

    let updated = service
        .update_from_form(
            party.id,
            &FormData::new()
                .with("name", "Key customers")
                .with("residualLikelihood", "1")
                .with("residualSeverity", "2"),
        )
        .unwrap();

    assert_eq!(updated.name, "Key customers");
    assert_eq!(updated.order, party.order);
    assert_eq!(updated.residual_risk_level(), 2);
    let invalidated = routes.take();
    assert!(invalidated.contains(&"/interested-parties".to_string()));
    assert!(invalidated.contains(&format!("/interested-parties/{}", party.id)));
}

#[test]
fn rejected_form_does_not_write() {
    let (conn, access) = setup();
    let routes = RecordingInvalidator::new();
    let service = service(&conn, ServiceContext::new(&access, &routes));

    let err = service
        .create_from_form(
            &FormData::new()
                .with("name", "Neighbours")
                .with("initialSeverity", "6"),
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(service.list(ArchiveView::All).unwrap().is_empty());
    assert!(routes.snapshot().is_empty());
}

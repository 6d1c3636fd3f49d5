//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, register-level actions to Dart via FRB.
//! - Resolve the caller's session, run one core service call and convert
//!   the outcome into a uniform envelope.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported as `ok = false` with one of
//!   `Unauthorized`, `<Register> not found` or
//!   `Failed to <verb> <register>: <detail>`.
//! - Routes invalidated by successful mutations are queued until the shell
//!   calls `drain_invalidated_routes`.

use imsreg_core::db::open_db;
use imsreg_core::intake::FormData;
use imsreg_core::logging::sanitize_message;
use imsreg_core::model::audit::{AuditListQuery, AuditStatus};
use imsreg_core::model::document::DocumentOwner;
use imsreg_core::model::improvement::{ImprovementListQuery, ImprovementType};
use imsreg_core::model::interested_party::{MoveDirection, ReorderOutcome};
use imsreg_core::model::maintenance::{
    DueStatus, MaintenanceItem, MaintenanceKind, MaintenanceListQuery,
};
use imsreg_core::repo::audit_repo::SqliteAuditRepository;
use imsreg_core::repo::document_repo::SqliteDocumentRepository;
use imsreg_core::repo::improvement_repo::SqliteImprovementRepository;
use imsreg_core::repo::interested_party_repo::SqliteInterestedPartyRepository;
use imsreg_core::repo::legal_register_repo::SqliteLegalRegisterRepository;
use imsreg_core::repo::lifecycle::{ArchiveChange, SqliteRecordLifecycleRepository};
use imsreg_core::repo::maintenance_repo::SqliteMaintenanceRepository;
use imsreg_core::repo::org_context_repo::SqliteOrganizationalContextRepository;
use imsreg_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use imsreg_core::service::audit_service::AuditService;
use imsreg_core::service::document_service::DocumentService;
use imsreg_core::service::improvement_service::ImprovementService;
use imsreg_core::service::interested_party_service::InterestedPartyService;
use imsreg_core::service::legal_register_service::LegalRegisterService;
use imsreg_core::service::lifecycle_service::RecordLifecycleService;
use imsreg_core::service::maintenance_service::MaintenanceService;
use imsreg_core::service::org_context_service::OrganizationalContextService;
use imsreg_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ArchiveView, CompletionFilter, Permission, RecordId, RecordKind, RecordingInvalidator,
    ServiceContext, ServiceError, ServiceResult, SessionAccess, User,
};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "imsreg.sqlite3";
const MAX_LOGGED_ERROR_CHARS: usize = 200;
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static INVALIDATED_ROUTES: OnceLock<RecordingInvalidator> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive); blank
///   defers to `IMSREG_LOG_LEVEL`, then the build default.
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Caller identity resolved by the shell's auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSession {
    /// Stable user id (UUID). Blank or malformed means signed out.
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    /// Granted permissions (`write`, `delete`); unknown values are ignored.
    pub permissions: Vec<String>,
}

/// One submitted form field. Keys may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: String,
    pub value: String,
}

/// Result envelope for mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the affected record on success.
    pub id: Option<String>,
    /// Human-readable message for UI toasts.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: RecordId) -> Self {
        Self {
            ok: true,
            id: Some(id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Result envelope for reads; `payload_json` is empty on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsResponse {
    pub ok: bool,
    pub payload_json: String,
    pub message: String,
}

impl RecordsResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload_json: String::new(),
            message: message.into(),
        }
    }
}

/// Returns and clears routes invalidated since the previous call.
#[flutter_rust_bridge::frb(sync)]
pub fn drain_invalidated_routes() -> Vec<String> {
    invalidated_routes().take()
}

// ---- interested parties ----------------------------------------------------

#[flutter_rust_bridge::frb(sync)]
pub fn interested_party_create(session: ActionSession, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    respond(CREATE, RecordKind::InterestedParty.label(), &session, |conn, ctx| {
        Ok(party_service(conn, ctx)?.create_from_form(&form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn interested_party_update(
    session: ActionSession,
    id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(UPDATE, RecordKind::InterestedParty.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(party_service(conn, ctx)?.update_from_form(id, &form)?.id)
    })
}

/// Moves a party one step; `direction` is `up` or `down`.
///
/// A move past either end of the list succeeds without changes.
#[flutter_rust_bridge::frb(sync)]
pub fn interested_party_reorder(
    session: ActionSession,
    id: String,
    direction: String,
) -> ActionResponse {
    let label = RecordKind::InterestedParty.label();
    let outcome = run_action(REORDER, label, &session, |conn, ctx| {
        let id = parse_id(&id)?;
        let direction = MoveDirection::parse(&direction).ok_or_else(|| {
            invalid_field("direction", format!("expected up|down, got `{direction}`"))
        })?;
        let outcome = party_service(conn, ctx)?.reorder(id, direction)?;
        Ok((id, outcome))
    });
    match outcome {
        Ok((id, ReorderOutcome::Moved { .. })) => {
            ActionResponse::success(success_message(REORDER, label), id)
        }
        Ok((id, ReorderOutcome::Unchanged)) => {
            ActionResponse::success(format!("{} already at the end of the list.", capitalize(label)), id)
        }
        Err(message) => ActionResponse::failure(message),
    }
}

/// Lists parties in display order. `show_archived = "true"` includes
/// archived parties after the active ones.
#[flutter_rust_bridge::frb(sync)]
pub fn interested_parties_list(show_archived: Option<String>) -> RecordsResponse {
    let kind = RecordKind::InterestedParty;
    let view = ArchiveView::from_show_archived(kind, show_archived.as_deref());
    query(kind.label(), |conn, ctx| party_service(conn, ctx)?.list(view))
}

// ---- organizational context -------------------------------------------------

#[flutter_rust_bridge::frb(sync)]
pub fn org_context_create(session: ActionSession, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    respond(CREATE, RecordKind::OrganizationalContext.label(), &session, |conn, ctx| {
        Ok(context_service(conn, ctx)?.create_from_form(&form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn org_context_update(
    session: ActionSession,
    id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(UPDATE, RecordKind::OrganizationalContext.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(context_service(conn, ctx)?.update_from_form(id, &form)?.id)
    })
}

/// Entries grouped by category (ascending), newest first within a group.
#[flutter_rust_bridge::frb(sync)]
pub fn org_context_list(show_archived: Option<String>) -> RecordsResponse {
    let kind = RecordKind::OrganizationalContext;
    let view = ArchiveView::from_show_archived(kind, show_archived.as_deref());
    query(kind.label(), |conn, ctx| context_service(conn, ctx)?.list_grouped(view))
}

// ---- improvement register ---------------------------------------------------

#[flutter_rust_bridge::frb(sync)]
pub fn improvement_create(session: ActionSession, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    respond(CREATE, RecordKind::Improvement.label(), &session, |conn, ctx| {
        Ok(improvement_service(conn, ctx)?.create_from_form(&form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn improvement_update(
    session: ActionSession,
    id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(UPDATE, RecordKind::Improvement.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(improvement_service(conn, ctx)?.update_from_form(id, &form)?.id)
    })
}

/// Lists improvements, newest report first.
///
/// Filters: `completion` (`all|open|completed`), `category`, `improvement_type`
/// (storage value or label) and `root_cause_type`; blank means no filter.
#[flutter_rust_bridge::frb(sync)]
pub fn improvements_list(
    show_archived: Option<String>,
    completion: Option<String>,
    category: Option<String>,
    improvement_type: Option<String>,
    root_cause_type: Option<String>,
) -> RecordsResponse {
    let kind = RecordKind::Improvement;
    query(kind.label(), |conn, ctx| {
        let query = ImprovementListQuery {
            view: ArchiveView::from_show_archived(kind, show_archived.as_deref()),
            completion: parse_completion(completion.as_deref())?,
            category: non_blank(category),
            improvement_type: non_blank(improvement_type)
                .map(|raw| {
                    ImprovementType::parse(&raw)
                        .ok_or_else(|| unknown_option("improvementType", raw))
                })
                .transpose()?,
            root_cause_type: non_blank(root_cause_type),
        };
        improvement_service(conn, ctx)?.list(&query)
    })
}

// ---- maintenance & calibration ----------------------------------------------

#[flutter_rust_bridge::frb(sync)]
pub fn maintenance_create(session: ActionSession, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    respond(CREATE, RecordKind::MaintenanceItem.label(), &session, |conn, ctx| {
        Ok(maintenance_service(conn, ctx)?.create_from_form(&form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn maintenance_update(
    session: ActionSession,
    id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(UPDATE, RecordKind::MaintenanceItem.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(maintenance_service(conn, ctx)?.update_from_form(id, &form)?.id)
    })
}

/// Lists schedule items, soonest due first, each with its `due_status`
/// relative to today.
///
/// `status` accepts `all|pending|completed`; other filters are exact matches.
#[flutter_rust_bridge::frb(sync)]
pub fn maintenance_list(
    show_archived: Option<String>,
    category: Option<String>,
    sub_category: Option<String>,
    status: Option<String>,
    owner_id: Option<String>,
    allocated_to_id: Option<String>,
) -> RecordsResponse {
    let kind = RecordKind::MaintenanceItem;
    query(kind.label(), |conn, ctx| {
        let query = MaintenanceListQuery {
            view: ArchiveView::from_show_archived(kind, show_archived.as_deref()),
            kind: non_blank(category)
                .map(|raw| {
                    MaintenanceKind::parse(&raw).ok_or_else(|| unknown_option("category", raw))
                })
                .transpose()?,
            sub_category: non_blank(sub_category),
            completion: parse_completion(status.as_deref())?,
            owner: non_blank(owner_id).map(|raw| parse_id(&raw)).transpose()?,
            allocated_to: non_blank(allocated_to_id)
                .map(|raw| parse_id(&raw))
                .transpose()?,
        };
        let today = chrono::Local::now().date_naive();
        let items = maintenance_service(conn, ctx)?.list(&query)?;
        Ok(items
            .into_iter()
            .map(|item| MaintenanceRow {
                due_status: item.due_status(today),
                item,
            })
            .collect::<Vec<_>>())
    })
}

/// Distinct sub-categories used by one schedule kind.
#[flutter_rust_bridge::frb(sync)]
pub fn maintenance_sub_categories(category: String) -> RecordsResponse {
    query(RecordKind::MaintenanceItem.label(), |conn, ctx| {
        let kind = MaintenanceKind::parse(&category)
            .ok_or_else(|| unknown_option("category", category.clone()))?;
        maintenance_service(conn, ctx)?.list_sub_categories(kind)
    })
}

// ---- audit schedule ---------------------------------------------------------

#[flutter_rust_bridge::frb(sync)]
pub fn audit_create(session: ActionSession, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    audit_write(CREATE, &session, |conn, ctx| {
        audit_service(conn, ctx)?.create_from_form(&form)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn audit_update(session: ActionSession, id: String, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    audit_write(UPDATE, &session, |conn, ctx| {
        let id = parse_id(&id)?;
        audit_service(conn, ctx)?.update_from_form(id, &form)
    })
}

/// Lists audits by planned start. `status` filters on
/// `not_started|in_progress|completed`.
#[flutter_rust_bridge::frb(sync)]
pub fn audits_list(show_archived: Option<String>, status: Option<String>) -> RecordsResponse {
    let kind = RecordKind::Audit;
    query(kind.label(), |conn, ctx| {
        let query = AuditListQuery {
            view: ArchiveView::from_show_archived(kind, show_archived.as_deref()),
            status: non_blank(status)
                .map(|raw| AuditStatus::parse(&raw).ok_or_else(|| unknown_option("status", raw)))
                .transpose()?,
        };
        audit_service(conn, ctx)?.list(&query)
    })
}

// ---- legal register ---------------------------------------------------------

#[flutter_rust_bridge::frb(sync)]
pub fn legal_register_create(session: ActionSession, fields: Vec<FormField>) -> ActionResponse {
    let form = to_form(fields);
    respond(CREATE, RecordKind::LegalRegister.label(), &session, |conn, ctx| {
        Ok(legal_service(conn, ctx)?.create_from_form(&form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn legal_register_update(
    session: ActionSession,
    id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(UPDATE, RecordKind::LegalRegister.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(legal_service(conn, ctx)?.update_from_form(id, &form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn legal_register_approve(session: ActionSession, id: String) -> ActionResponse {
    respond(APPROVE, RecordKind::LegalRegister.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(legal_service(conn, ctx)?.approve(id)?.id)
    })
}

/// Records a review (`reviewDate`, `notes`) by the session user.
/// Returns the review id.
#[flutter_rust_bridge::frb(sync)]
pub fn legal_register_add_review(
    session: ActionSession,
    id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(REVIEW, RecordKind::LegalRegister.label(), &session, |conn, ctx| {
        let id = parse_id(&id)?;
        Ok(legal_service(conn, ctx)?.add_review_from_form(id, &form)?.id)
    })
}

/// Approved, awaiting-approval and archived sections in one payload.
#[flutter_rust_bridge::frb(sync)]
pub fn legal_register_views() -> RecordsResponse {
    query(RecordKind::LegalRegister.label(), |conn, ctx| {
        legal_service(conn, ctx)?.views()
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn legal_register_reviews(id: String) -> RecordsResponse {
    query(RecordKind::LegalRegister.label(), |conn, ctx| {
        let id = parse_id(&id)?;
        legal_service(conn, ctx)?.reviews(id)
    })
}

// ---- attachments ------------------------------------------------------------

/// Records an uploaded file (`fileName`, `fileUrl`, optional `title`) against a
/// maintenance item or audit. `owner_entity` uses register wire names.
#[flutter_rust_bridge::frb(sync)]
pub fn document_attach(
    session: ActionSession,
    owner_entity: String,
    owner_id: String,
    fields: Vec<FormField>,
) -> ActionResponse {
    let form = to_form(fields);
    respond(ATTACH, DOCUMENT_LABEL, &session, |conn, ctx| {
        let owner = parse_owner(&owner_entity, &owner_id)?;
        Ok(document_service(conn, ctx)?.attach_from_form(owner, &form)?.id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn document_delete(session: ActionSession, id: String) -> ActionResponse {
    respond(DELETE, DOCUMENT_LABEL, &session, |conn, ctx| {
        let id = parse_id(&id)?;
        document_service(conn, ctx)?.delete(id)?;
        Ok(id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn documents_list(owner_entity: String, owner_id: String) -> RecordsResponse {
    query(DOCUMENT_LABEL, |conn, ctx| {
        let owner = parse_owner(&owner_entity, &owner_id)?;
        document_service(conn, ctx)?.list(owner)
    })
}

// ---- shared lifecycle ---------------------------------------------------------

/// Archives any register record; `entity` is a register wire name such as
/// `interested_party` or `legal-register`.
#[flutter_rust_bridge::frb(sync)]
pub fn record_archive(session: ActionSession, entity: String, id: String) -> ActionResponse {
    lifecycle_action(ARCHIVE, &session, &entity, &id, |service, kind, id| {
        service.archive(kind, id).map(|change| archive_message(ARCHIVE, kind, change))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn record_unarchive(session: ActionSession, entity: String, id: String) -> ActionResponse {
    lifecycle_action(UNARCHIVE, &session, &entity, &id, |service, kind, id| {
        service
            .unarchive(kind, id)
            .map(|change| archive_message(UNARCHIVE, kind, change))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn record_toggle_archive(session: ActionSession, entity: String, id: String) -> ActionResponse {
    lifecycle_action(ARCHIVE, &session, &entity, &id, |service, kind, id| {
        service.toggle_archive(kind, id).map(|archived| {
            let action = if archived { ARCHIVE } else { UNARCHIVE };
            success_message(action, kind.label())
        })
    })
}

/// Permanently deletes any register record (requires `delete`).
#[flutter_rust_bridge::frb(sync)]
pub fn record_delete(session: ActionSession, entity: String, id: String) -> ActionResponse {
    lifecycle_action(DELETE, &session, &entity, &id, |service, kind, id| {
        service
            .delete(kind, id)
            .map(|()| success_message(DELETE, kind.label()))
    })
}

/// Loads one record of any register as JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn record_get(entity: String, id: String) -> RecordsResponse {
    let Some(kind) = RecordKind::parse(&entity) else {
        return RecordsResponse::failure(format!("Unknown register `{entity}`"));
    };
    let label = kind.label();
    let result = with_connection(label, "load", |conn, ctx| {
        let id = parse_id(&id)?;
        match kind {
            RecordKind::InterestedParty => to_json(&party_service(conn, ctx)?.get(id)?),
            RecordKind::OrganizationalContext => to_json(&context_service(conn, ctx)?.get(id)?),
            RecordKind::Improvement => to_json(&improvement_service(conn, ctx)?.get(id)?),
            RecordKind::MaintenanceItem => to_json(&maintenance_service(conn, ctx)?.get(id)?),
            RecordKind::Audit => to_json(&audit_service(conn, ctx)?.get(id)?),
            RecordKind::LegalRegister => to_json(&legal_service(conn, ctx)?.get(id)?),
        }
    });
    match result {
        Ok(payload_json) => RecordsResponse {
            ok: true,
            payload_json,
            message: String::new(),
        },
        Err(message) => RecordsResponse::failure(message),
    }
}

/// Active users by name, for owner/auditor pickers.
#[flutter_rust_bridge::frb(sync)]
pub fn users_list() -> RecordsResponse {
    query("user", |conn, _ctx| {
        Ok(SqliteUserRepository::try_new(conn)?.list_active_users()?)
    })
}

// ---- plumbing ---------------------------------------------------------------

const DOCUMENT_LABEL: &str = "document";

/// Wording for one action kind.
#[derive(Debug, Clone, Copy)]
struct Action {
    verb: &'static str,
    past: &'static str,
}

const CREATE: Action = Action {
    verb: "create",
    past: "created",
};
const UPDATE: Action = Action {
    verb: "update",
    past: "updated",
};
const REORDER: Action = Action {
    verb: "reorder",
    past: "moved",
};
const ARCHIVE: Action = Action {
    verb: "archive",
    past: "archived",
};
const UNARCHIVE: Action = Action {
    verb: "unarchive",
    past: "restored",
};
const DELETE: Action = Action {
    verb: "delete",
    past: "deleted",
};
const APPROVE: Action = Action {
    verb: "approve",
    past: "approved",
};
const REVIEW: Action = Action {
    verb: "review",
    past: "reviewed",
};
const ATTACH: Action = Action {
    verb: "attach",
    past: "attached",
};

#[derive(Serialize)]
struct MaintenanceRow {
    #[serde(flatten)]
    item: MaintenanceItem,
    due_status: DueStatus,
}

type LifecycleRepo<'conn> = SqliteRecordLifecycleRepository<'conn>;

fn party_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<
    InterestedPartyService<'a, SqliteInterestedPartyRepository<'a>, LifecycleRepo<'a>>,
> {
    Ok(InterestedPartyService::new(
        SqliteInterestedPartyRepository::try_new(conn)?,
        SqliteRecordLifecycleRepository::try_new(conn)?,
        ctx,
    ))
}

fn context_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<
    OrganizationalContextService<
        'a,
        SqliteOrganizationalContextRepository<'a>,
        LifecycleRepo<'a>,
    >,
> {
    Ok(OrganizationalContextService::new(
        SqliteOrganizationalContextRepository::try_new(conn)?,
        SqliteRecordLifecycleRepository::try_new(conn)?,
        ctx,
    ))
}

fn improvement_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<ImprovementService<'a, SqliteImprovementRepository<'a>, LifecycleRepo<'a>>>
{
    Ok(ImprovementService::new(
        SqliteImprovementRepository::try_new(conn)?,
        SqliteRecordLifecycleRepository::try_new(conn)?,
        ctx,
    ))
}

fn maintenance_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<MaintenanceService<'a, SqliteMaintenanceRepository<'a>, LifecycleRepo<'a>>>
{
    Ok(MaintenanceService::new(
        SqliteMaintenanceRepository::try_new(conn)?,
        SqliteRecordLifecycleRepository::try_new(conn)?,
        ctx,
    ))
}

fn audit_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<AuditService<'a, SqliteAuditRepository<'a>, LifecycleRepo<'a>>> {
    Ok(AuditService::new(
        SqliteAuditRepository::try_new(conn)?,
        SqliteRecordLifecycleRepository::try_new(conn)?,
        ctx,
    ))
}

fn legal_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<LegalRegisterService<'a, SqliteLegalRegisterRepository<'a>, LifecycleRepo<'a>>>
{
    Ok(LegalRegisterService::new(
        SqliteLegalRegisterRepository::try_new(conn)?,
        SqliteRecordLifecycleRepository::try_new(conn)?,
        ctx,
    ))
}

fn document_service<'a>(
    conn: &'a Connection,
    ctx: ServiceContext<'a>,
) -> ServiceResult<DocumentService<'a, SqliteDocumentRepository<'a>>> {
    Ok(DocumentService::new(
        SqliteDocumentRepository::try_new(conn)?,
        ctx,
    ))
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("IMSREG_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn invalidated_routes() -> &'static RecordingInvalidator {
    INVALIDATED_ROUTES.get_or_init(RecordingInvalidator::new)
}

fn to_form(fields: Vec<FormField>) -> FormData {
    FormData::from_pairs(fields.into_iter().map(|field| (field.key, field.value)))
}

/// Maps the shell session onto core access control.
///
/// A malformed user id yields an anonymous session, which every mutation
/// rejects as unauthorized.
fn session_access(session: &ActionSession) -> SessionAccess {
    let Ok(user_id) = Uuid::parse_str(session.user_id.trim()) else {
        return SessionAccess::anonymous();
    };
    let user = User::new(user_id, session.user_name.trim(), session.user_email.trim());
    let permissions = session
        .permissions
        .iter()
        .filter_map(|value| Permission::parse(value));
    SessionAccess::new(user, permissions)
}

/// Runs a mutation for `session` and maps its error to a UI message.
fn run_action<T>(
    action: Action,
    label: &'static str,
    session: &ActionSession,
    f: impl FnOnce(&Connection, ServiceContext<'_>) -> ServiceResult<T>,
) -> Result<T, String> {
    let access = session_access(session);
    let routes = invalidated_routes();
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| {
        log_failure(action.verb, label, "storage", &err.to_string());
        format!("Failed to {} {label}: {err}", action.verb)
    })?;

    let result = mirror_session_user(&conn, &access).and_then(|()| {
        let ctx = ServiceContext::new(&access, routes);
        f(&conn, ctx)
    });
    result.map_err(|err| failure_message(action.verb, label, &err))
}

fn respond(
    action: Action,
    label: &'static str,
    session: &ActionSession,
    f: impl FnOnce(&Connection, ServiceContext<'_>) -> ServiceResult<RecordId>,
) -> ActionResponse {
    match run_action(action, label, session, f) {
        Ok(id) => ActionResponse::success(success_message(action, label), id),
        Err(message) => ActionResponse::failure(message),
    }
}

fn audit_write(
    action: Action,
    session: &ActionSession,
    f: impl FnOnce(
        &Connection,
        ServiceContext<'_>,
    ) -> ServiceResult<imsreg_core::repo::audit_repo::SavedAudit>,
) -> ActionResponse {
    let label = RecordKind::Audit.label();
    match run_action(action, label, session, f) {
        Ok(saved) => {
            let mut message = success_message(action, label);
            if let Some(next) = &saved.scheduled_next {
                if let Some(planned) = next.planned_start_date {
                    message.push_str(&format!(" Next audit scheduled for {planned}."));
                }
            }
            ActionResponse::success(message, saved.audit.id)
        }
        Err(message) => ActionResponse::failure(message),
    }
}

fn lifecycle_action(
    action: Action,
    session: &ActionSession,
    entity: &str,
    id: &str,
    f: impl FnOnce(
        &RecordLifecycleService<'_, SqliteRecordLifecycleRepository<'_>>,
        RecordKind,
        RecordId,
    ) -> ServiceResult<String>,
) -> ActionResponse {
    let Some(kind) = RecordKind::parse(entity) else {
        return ActionResponse::failure(format!("Unknown register `{}`", entity.trim()));
    };
    let outcome = run_action(action, kind.label(), session, |conn, ctx| {
        let id = parse_id(id)?;
        let service =
            RecordLifecycleService::new(SqliteRecordLifecycleRepository::try_new(conn)?, ctx);
        Ok((id, f(&service, kind, id)?))
    });
    match outcome {
        Ok((id, message)) => ActionResponse::success(message, id),
        Err(message) => ActionResponse::failure(message),
    }
}

/// Runs a read and serializes its result.
fn query<T: Serialize>(
    label: &'static str,
    f: impl FnOnce(&Connection, ServiceContext<'_>) -> ServiceResult<T>,
) -> RecordsResponse {
    match with_connection(label, "load", |conn, ctx| to_json(&f(conn, ctx)?)) {
        Ok(payload_json) => RecordsResponse {
            ok: true,
            payload_json,
            message: String::new(),
        },
        Err(message) => RecordsResponse::failure(message),
    }
}

/// Opens the database for an anonymous read.
fn with_connection<T>(
    label: &'static str,
    verb: &'static str,
    f: impl FnOnce(&Connection, ServiceContext<'_>) -> ServiceResult<T>,
) -> Result<T, String> {
    let access = SessionAccess::anonymous();
    let routes = invalidated_routes();
    let conn = open_db(resolve_db_path()).map_err(|err| {
        log_failure(verb, label, "storage", &err.to_string());
        format!("Failed to {verb} {label}: {err}")
    })?;
    f(&conn, ServiceContext::new(&access, routes)).map_err(|err| failure_message(verb, label, &err))
}

fn mirror_session_user(conn: &Connection, access: &SessionAccess) -> ServiceResult<()> {
    use imsreg_core::AccessControl;

    if let Some(user) = access.current_user() {
        SqliteUserRepository::try_new(conn)?.upsert_user(&user)?;
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> ServiceResult<String> {
    serde_json::to_string(value).map_err(|err| {
        ServiceError::Storage(imsreg_core::RepoError::InvalidData(format!(
            "cannot encode payload: {err}"
        )))
    })
}

fn parse_id(raw: &str) -> ServiceResult<RecordId> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| invalid_field("id", format!("expected id, got `{}`", raw.trim())))
}

fn parse_owner(entity: &str, id: &str) -> ServiceResult<DocumentOwner> {
    let id = parse_id(id)?;
    RecordKind::parse(entity)
        .and_then(|kind| DocumentOwner::from_kind(kind, id))
        .ok_or_else(|| unknown_option("ownerEntity", entity.trim().to_string()))
}

fn parse_completion(raw: Option<&str>) -> ServiceResult<CompletionFilter> {
    match raw {
        None => Ok(CompletionFilter::All),
        Some(value) => {
            CompletionFilter::parse(value).ok_or_else(|| unknown_option("status", value.to_string()))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty() && raw != "all")
}

fn invalid_field(field: &'static str, reason: String) -> ServiceError {
    ServiceError::Validation(imsreg_core::ValidationError::InvalidField { field, reason })
}

fn unknown_option(field: &'static str, value: String) -> ServiceError {
    ServiceError::Validation(imsreg_core::ValidationError::UnknownOption { field, value })
}

fn success_message(action: Action, label: &str) -> String {
    format!("{} {}.", capitalize(label), action.past)
}

fn archive_message(action: Action, kind: RecordKind, change: ArchiveChange) -> String {
    match change {
        ArchiveChange::Changed => success_message(action, kind.label()),
        ArchiveChange::Unchanged => format!("{} already {}.", capitalize(kind.label()), action.past),
    }
}

fn failure_message(verb: &str, label: &str, err: &ServiceError) -> String {
    let (error_kind, message) = match err {
        ServiceError::Unauthorized => ("unauthorized", "Unauthorized".to_string()),
        ServiceError::NotFound { entity, .. } => {
            ("not_found", format!("{} not found", capitalize(entity)))
        }
        ServiceError::Validation(detail) => (
            "validation",
            format!("Failed to {verb} {label}: {detail}"),
        ),
        ServiceError::Storage(detail) => {
            ("storage", format!("Failed to {verb} {label}: {detail}"))
        }
    };
    log_failure(verb, label, error_kind, &err.to_string());
    message
}

fn log_failure(verb: &str, label: &str, error_kind: &str, detail: &str) {
    if error_kind == "storage" {
        error!(
            "event=action_failed module=ffi status=error action={verb} entity=\"{label}\" error_kind={error_kind} error={}",
            sanitize_message(detail, MAX_LOGGED_ERROR_CHARS)
        );
    } else {
        info!(
            "event=action_failed module=ffi status=error action={verb} entity=\"{label}\" error_kind={error_kind}"
        );
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! Audit schedule use-cases.
//!
//! A write that requests a follow-on audit returns it alongside the saved
//! audit; both rows are committed together.

use crate::intake::FormData;
use crate::model::audit::{Audit, AuditInput, AuditListQuery};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::repo::audit_repo::{AuditRepository, SavedAudit};
use crate::repo::lifecycle::RecordLifecycleRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::RecordLifecycleService;
use log::info;

const KIND: RecordKind = RecordKind::Audit;

pub struct AuditService<'ctx, R, L>
where
    R: AuditRepository,
    L: RecordLifecycleRepository,
{
    repo: R,
    lifecycle: RecordLifecycleService<'ctx, L>,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, R, L> AuditService<'ctx, R, L>
where
    R: AuditRepository,
    L: RecordLifecycleRepository,
{
    pub fn new(repo: R, lifecycle: L, ctx: ServiceContext<'ctx>) -> Self {
        Self {
            repo,
            lifecycle: RecordLifecycleService::new(lifecycle, ctx),
            ctx,
        }
    }

    pub fn list(&self, query: &AuditListQuery) -> ServiceResult<Vec<Audit>> {
        Ok(self.repo.list_audits(query)?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Audit> {
        self.repo.get_audit(id)?.ok_or(ServiceError::NotFound {
            entity: KIND.label(),
            id,
        })
    }

    pub fn create(&self, input: &AuditInput) -> ServiceResult<SavedAudit> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, input)
    }

    pub fn create_from_form(&self, form: &FormData) -> ServiceResult<SavedAudit> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, &AuditInput::from_form(form)?)
    }

    pub fn update(&self, id: RecordId, input: &AuditInput) -> ServiceResult<SavedAudit> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, input)
    }

    pub fn update_from_form(&self, id: RecordId, form: &FormData) -> ServiceResult<SavedAudit> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, &AuditInput::from_form(form)?)
    }

    pub fn archive(&self, id: RecordId) -> ServiceResult<Audit> {
        self.lifecycle.archive(KIND, id)?;
        self.get(id)
    }

    pub fn unarchive(&self, id: RecordId) -> ServiceResult<Audit> {
        self.lifecycle.unarchive(KIND, id)?;
        self.get(id)
    }

    pub fn toggle_archive(&self, id: RecordId) -> ServiceResult<Audit> {
        self.lifecycle.toggle_archive(KIND, id)?;
        self.get(id)
    }

    /// Deletes the audit, its document references and attachments.
    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.lifecycle.delete(KIND, id)
    }

    fn insert(&self, user: &User, input: &AuditInput) -> ServiceResult<SavedAudit> {
        let saved = self.repo.create_audit(input, user.id)?;
        info!(
            "event=record_create module=service status=ok kind={} id={} status={} documents={}",
            KIND.as_str(),
            saved.audit.id,
            saved.audit.status.as_db(),
            saved.audit.documents.len()
        );
        self.log_scheduled(&saved);
        self.ctx.invalidate_list(KIND);
        Ok(saved)
    }

    fn replace(&self, user: &User, id: RecordId, input: &AuditInput) -> ServiceResult<SavedAudit> {
        let saved = self.repo.update_audit(id, input, user.id)?;
        info!(
            "event=record_update module=service status=ok kind={} id={id} status={}",
            KIND.as_str(),
            saved.audit.status.as_db()
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(saved)
    }

    fn log_scheduled(&self, saved: &SavedAudit) {
        if let Some(next) = &saved.scheduled_next {
            info!(
                "event=audit_schedule_next module=service status=ok kind={} id={} source_id={}",
                KIND.as_str(),
                next.id,
                saved.audit.id
            );
        }
    }
}

//! Organizational context use-cases.

use crate::intake::FormData;
use crate::model::org_context::{
    group_by_category, ContextCategoryGroup, OrganizationalContextEntry,
    OrganizationalContextInput,
};
use crate::model::record::{ArchiveView, RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::repo::lifecycle::RecordLifecycleRepository;
use crate::repo::org_context_repo::OrganizationalContextRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::RecordLifecycleService;
use log::info;

const KIND: RecordKind = RecordKind::OrganizationalContext;

pub struct OrganizationalContextService<'ctx, R, L>
where
    R: OrganizationalContextRepository,
    L: RecordLifecycleRepository,
{
    repo: R,
    lifecycle: RecordLifecycleService<'ctx, L>,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, R, L> OrganizationalContextService<'ctx, R, L>
where
    R: OrganizationalContextRepository,
    L: RecordLifecycleRepository,
{
    pub fn new(repo: R, lifecycle: L, ctx: ServiceContext<'ctx>) -> Self {
        Self {
            repo,
            lifecycle: RecordLifecycleService::new(lifecycle, ctx),
            ctx,
        }
    }

    /// Newest first.
    pub fn list(&self, view: ArchiveView) -> ServiceResult<Vec<OrganizationalContextEntry>> {
        Ok(self.repo.list_entries(view)?)
    }

    /// Entries grouped by category, categories ascending.
    pub fn list_grouped(&self, view: ArchiveView) -> ServiceResult<Vec<ContextCategoryGroup>> {
        Ok(group_by_category(self.repo.list_entries(view)?))
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<OrganizationalContextEntry> {
        self.repo.get_entry(id)?.ok_or(ServiceError::NotFound {
            entity: KIND.label(),
            id,
        })
    }

    pub fn create(
        &self,
        input: &OrganizationalContextInput,
    ) -> ServiceResult<OrganizationalContextEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, input)
    }

    pub fn create_from_form(&self, form: &FormData) -> ServiceResult<OrganizationalContextEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, &OrganizationalContextInput::from_form(form)?)
    }

    pub fn update(
        &self,
        id: RecordId,
        input: &OrganizationalContextInput,
    ) -> ServiceResult<OrganizationalContextEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, input)
    }

    pub fn update_from_form(
        &self,
        id: RecordId,
        form: &FormData,
    ) -> ServiceResult<OrganizationalContextEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, &OrganizationalContextInput::from_form(form)?)
    }

    pub fn archive(&self, id: RecordId) -> ServiceResult<OrganizationalContextEntry> {
        self.lifecycle.archive(KIND, id)?;
        self.get(id)
    }

    pub fn unarchive(&self, id: RecordId) -> ServiceResult<OrganizationalContextEntry> {
        self.lifecycle.unarchive(KIND, id)?;
        self.get(id)
    }

    pub fn toggle_archive(&self, id: RecordId) -> ServiceResult<OrganizationalContextEntry> {
        self.lifecycle.toggle_archive(KIND, id)?;
        self.get(id)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.lifecycle.delete(KIND, id)
    }

    fn insert(
        &self,
        user: &User,
        input: &OrganizationalContextInput,
    ) -> ServiceResult<OrganizationalContextEntry> {
        let entry = self.repo.create_entry(input, user.id)?;
        info!(
            "event=record_create module=service status=ok kind={} id={} category={} objectives={}",
            KIND.as_str(),
            entry.id,
            entry.category,
            entry.objectives.len()
        );
        self.ctx.invalidate_list(KIND);
        Ok(entry)
    }

    fn replace(
        &self,
        user: &User,
        id: RecordId,
        input: &OrganizationalContextInput,
    ) -> ServiceResult<OrganizationalContextEntry> {
        let entry = self.repo.update_entry(id, input, user.id)?;
        info!(
            "event=record_update module=service status=ok kind={} id={id}",
            KIND.as_str()
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(entry)
    }
}

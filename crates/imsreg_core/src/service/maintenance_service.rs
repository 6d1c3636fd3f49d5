//! Maintenance and calibration schedule use-cases.

use crate::intake::FormData;
use crate::model::maintenance::{
    MaintenanceItem, MaintenanceItemInput, MaintenanceKind, MaintenanceListQuery,
};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::repo::lifecycle::RecordLifecycleRepository;
use crate::repo::maintenance_repo::MaintenanceRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::RecordLifecycleService;
use log::info;

const KIND: RecordKind = RecordKind::MaintenanceItem;

pub struct MaintenanceService<'ctx, R, L>
where
    R: MaintenanceRepository,
    L: RecordLifecycleRepository,
{
    repo: R,
    lifecycle: RecordLifecycleService<'ctx, L>,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, R, L> MaintenanceService<'ctx, R, L>
where
    R: MaintenanceRepository,
    L: RecordLifecycleRepository,
{
    pub fn new(repo: R, lifecycle: L, ctx: ServiceContext<'ctx>) -> Self {
        Self {
            repo,
            lifecycle: RecordLifecycleService::new(lifecycle, ctx),
            ctx,
        }
    }

    /// Soonest due first.
    pub fn list(&self, query: &MaintenanceListQuery) -> ServiceResult<Vec<MaintenanceItem>> {
        Ok(self.repo.list_items(query)?)
    }

    pub fn list_sub_categories(&self, kind: MaintenanceKind) -> ServiceResult<Vec<String>> {
        Ok(self.repo.list_sub_categories(kind)?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<MaintenanceItem> {
        self.repo.get_item(id)?.ok_or(ServiceError::NotFound {
            entity: KIND.label(),
            id,
        })
    }

    pub fn create(&self, input: &MaintenanceItemInput) -> ServiceResult<MaintenanceItem> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, input)
    }

    pub fn create_from_form(&self, form: &FormData) -> ServiceResult<MaintenanceItem> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, &MaintenanceItemInput::from_form(form)?)
    }

    pub fn update(
        &self,
        id: RecordId,
        input: &MaintenanceItemInput,
    ) -> ServiceResult<MaintenanceItem> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, input)
    }

    pub fn update_from_form(&self, id: RecordId, form: &FormData) -> ServiceResult<MaintenanceItem> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, &MaintenanceItemInput::from_form(form)?)
    }

    pub fn archive(&self, id: RecordId) -> ServiceResult<MaintenanceItem> {
        self.lifecycle.archive(KIND, id)?;
        self.get(id)
    }

    pub fn unarchive(&self, id: RecordId) -> ServiceResult<MaintenanceItem> {
        self.lifecycle.unarchive(KIND, id)?;
        self.get(id)
    }

    pub fn toggle_archive(&self, id: RecordId) -> ServiceResult<MaintenanceItem> {
        self.lifecycle.toggle_archive(KIND, id)?;
        self.get(id)
    }

    /// Deletes the item together with its attached documents.
    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.lifecycle.delete(KIND, id)
    }

    fn insert(&self, user: &User, input: &MaintenanceItemInput) -> ServiceResult<MaintenanceItem> {
        let item = self.repo.create_item(input, user.id)?;
        info!(
            "event=record_create module=service status=ok kind={} id={} schedule={} due_date={}",
            KIND.as_str(),
            item.id,
            item.kind.as_db(),
            item.due_date
        );
        self.ctx.invalidate_list(KIND);
        Ok(item)
    }

    fn replace(
        &self,
        user: &User,
        id: RecordId,
        input: &MaintenanceItemInput,
    ) -> ServiceResult<MaintenanceItem> {
        let item = self.repo.update_item(id, input, user.id)?;
        info!(
            "event=record_update module=service status=ok kind={} id={id} completed={}",
            KIND.as_str(),
            item.completed
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(item)
    }
}

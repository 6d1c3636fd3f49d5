//! Improvement register use-cases.

use crate::intake::FormData;
use crate::model::improvement::{Improvement, ImprovementInput, ImprovementListQuery};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::repo::improvement_repo::ImprovementRepository;
use crate::repo::lifecycle::RecordLifecycleRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::RecordLifecycleService;
use log::info;

const KIND: RecordKind = RecordKind::Improvement;

pub struct ImprovementService<'ctx, R, L>
where
    R: ImprovementRepository,
    L: RecordLifecycleRepository,
{
    repo: R,
    lifecycle: RecordLifecycleService<'ctx, L>,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, R, L> ImprovementService<'ctx, R, L>
where
    R: ImprovementRepository,
    L: RecordLifecycleRepository,
{
    pub fn new(repo: R, lifecycle: L, ctx: ServiceContext<'ctx>) -> Self {
        Self {
            repo,
            lifecycle: RecordLifecycleService::new(lifecycle, ctx),
            ctx,
        }
    }

    pub fn list(&self, query: &ImprovementListQuery) -> ServiceResult<Vec<Improvement>> {
        Ok(self.repo.list_improvements(query)?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Improvement> {
        self.repo.get_improvement(id)?.ok_or(ServiceError::NotFound {
            entity: KIND.label(),
            id,
        })
    }

    /// Number the next created report will receive.
    pub fn next_number(&self) -> ServiceResult<i64> {
        Ok(self.repo.latest_number()? + 1)
    }

    pub fn create(&self, input: &ImprovementInput) -> ServiceResult<Improvement> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, input)
    }

    pub fn create_from_form(&self, form: &FormData) -> ServiceResult<Improvement> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, &ImprovementInput::from_form(form)?)
    }

    pub fn update(&self, id: RecordId, input: &ImprovementInput) -> ServiceResult<Improvement> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, input)
    }

    pub fn update_from_form(&self, id: RecordId, form: &FormData) -> ServiceResult<Improvement> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, &ImprovementInput::from_form(form)?)
    }

    pub fn archive(&self, id: RecordId) -> ServiceResult<Improvement> {
        self.lifecycle.archive(KIND, id)?;
        self.get(id)
    }

    pub fn unarchive(&self, id: RecordId) -> ServiceResult<Improvement> {
        self.lifecycle.unarchive(KIND, id)?;
        self.get(id)
    }

    pub fn toggle_archive(&self, id: RecordId) -> ServiceResult<Improvement> {
        self.lifecycle.toggle_archive(KIND, id)?;
        self.get(id)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.lifecycle.delete(KIND, id)
    }

    fn insert(&self, user: &User, input: &ImprovementInput) -> ServiceResult<Improvement> {
        let improvement = self.repo.create_improvement(input, user.id)?;
        info!(
            "event=record_create module=service status=ok kind={} id={} number={}",
            KIND.as_str(),
            improvement.id,
            improvement.number
        );
        self.ctx.invalidate_list(KIND);
        Ok(improvement)
    }

    fn replace(
        &self,
        user: &User,
        id: RecordId,
        input: &ImprovementInput,
    ) -> ServiceResult<Improvement> {
        let improvement = self.repo.update_improvement(id, input, user.id)?;
        info!(
            "event=record_update module=service status=ok kind={} id={id} completed={}",
            KIND.as_str(),
            improvement.is_completed()
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(improvement)
    }
}

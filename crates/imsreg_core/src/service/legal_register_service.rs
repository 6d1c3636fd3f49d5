//! Legal register use-cases: CRUD, approval and periodic reviews.

use crate::intake::FormData;
use crate::model::legal_register::{
    LegalRegisterEntry, LegalRegisterInput, LegalRegisterViews, LegalReview, LegalReviewInput,
};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::repo::legal_register_repo::LegalRegisterRepository;
use crate::repo::lifecycle::RecordLifecycleRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::RecordLifecycleService;
use log::info;

const KIND: RecordKind = RecordKind::LegalRegister;

pub struct LegalRegisterService<'ctx, R, L>
where
    R: LegalRegisterRepository,
    L: RecordLifecycleRepository,
{
    repo: R,
    lifecycle: RecordLifecycleService<'ctx, L>,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, R, L> LegalRegisterService<'ctx, R, L>
where
    R: LegalRegisterRepository,
    L: RecordLifecycleRepository,
{
    pub fn new(repo: R, lifecycle: L, ctx: ServiceContext<'ctx>) -> Self {
        Self {
            repo,
            lifecycle: RecordLifecycleService::new(lifecycle, ctx),
            ctx,
        }
    }

    /// Approved, awaiting-approval and archived sections.
    pub fn views(&self) -> ServiceResult<LegalRegisterViews> {
        Ok(self.repo.load_views()?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<LegalRegisterEntry> {
        self.repo.get_entry(id)?.ok_or(ServiceError::NotFound {
            entity: KIND.label(),
            id,
        })
    }

    pub fn reviews(&self, id: RecordId) -> ServiceResult<Vec<LegalReview>> {
        self.get(id)?;
        Ok(self.repo.list_reviews(id)?)
    }

    pub fn create(&self, input: &LegalRegisterInput) -> ServiceResult<LegalRegisterEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, input)
    }

    pub fn create_from_form(&self, form: &FormData) -> ServiceResult<LegalRegisterEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, &LegalRegisterInput::from_form(form)?)
    }

    pub fn update(
        &self,
        id: RecordId,
        input: &LegalRegisterInput,
    ) -> ServiceResult<LegalRegisterEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, input)
    }

    pub fn update_from_form(
        &self,
        id: RecordId,
        form: &FormData,
    ) -> ServiceResult<LegalRegisterEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, &LegalRegisterInput::from_form(form)?)
    }

    pub fn approve(&self, id: RecordId) -> ServiceResult<LegalRegisterEntry> {
        let user = self.ctx.authorize(Permission::Write)?;
        let entry = self.repo.approve_entry(id, user.id)?;
        info!(
            "event=legal_register_approve module=service status=ok kind={} id={id}",
            KIND.as_str()
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(entry)
    }

    /// Records a review by the acting user.
    pub fn add_review(&self, id: RecordId, input: &LegalReviewInput) -> ServiceResult<LegalReview> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.record_review(&user, id, input)
    }

    pub fn add_review_from_form(&self, id: RecordId, form: &FormData) -> ServiceResult<LegalReview> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.record_review(&user, id, &LegalReviewInput::from_form(form)?)
    }

    pub fn archive(&self, id: RecordId) -> ServiceResult<LegalRegisterEntry> {
        self.lifecycle.archive(KIND, id)?;
        self.get(id)
    }

    pub fn unarchive(&self, id: RecordId) -> ServiceResult<LegalRegisterEntry> {
        self.lifecycle.unarchive(KIND, id)?;
        self.get(id)
    }

    pub fn toggle_archive(&self, id: RecordId) -> ServiceResult<LegalRegisterEntry> {
        self.lifecycle.toggle_archive(KIND, id)?;
        self.get(id)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.lifecycle.delete(KIND, id)
    }

    fn insert(&self, user: &User, input: &LegalRegisterInput) -> ServiceResult<LegalRegisterEntry> {
        let entry = self.repo.create_entry(input, user.id)?;
        info!(
            "event=record_create module=service status=ok kind={} id={} approved={}",
            KIND.as_str(),
            entry.id,
            entry.approved
        );
        self.ctx.invalidate_list(KIND);
        Ok(entry)
    }

    fn replace(
        &self,
        user: &User,
        id: RecordId,
        input: &LegalRegisterInput,
    ) -> ServiceResult<LegalRegisterEntry> {
        let entry = self.repo.update_entry(id, input, user.id)?;
        info!(
            "event=record_update module=service status=ok kind={} id={id}",
            KIND.as_str()
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(entry)
    }

    fn record_review(
        &self,
        user: &User,
        id: RecordId,
        input: &LegalReviewInput,
    ) -> ServiceResult<LegalReview> {
        let review = self.repo.add_review(id, input, user.id)?;
        info!(
            "event=legal_register_review module=service status=ok kind={} id={id} review_id={} review_date={}",
            KIND.as_str(),
            review.id,
            review.review_date
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(review)
    }
}

//! Interested party use-cases, including single-step reordering.
//!
//! # Invariants
//! - Every mutation runs guard, then validation, then persistence, then
//!   route invalidation.
//! - A reorder with no neighbor (list boundary) or on an archived party is
//!   a successful no-op.

use crate::intake::FormData;
use crate::model::interested_party::{
    InterestedParty, InterestedPartyInput, MoveDirection, ReorderOutcome,
};
use crate::model::record::{ArchiveView, RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::repo::interested_party_repo::InterestedPartyRepository;
use crate::repo::lifecycle::RecordLifecycleRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::lifecycle_service::RecordLifecycleService;
use log::info;

const KIND: RecordKind = RecordKind::InterestedParty;

pub struct InterestedPartyService<'ctx, R, L>
where
    R: InterestedPartyRepository,
    L: RecordLifecycleRepository,
{
    repo: R,
    lifecycle: RecordLifecycleService<'ctx, L>,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, R, L> InterestedPartyService<'ctx, R, L>
where
    R: InterestedPartyRepository,
    L: RecordLifecycleRepository,
{
    pub fn new(repo: R, lifecycle: L, ctx: ServiceContext<'ctx>) -> Self {
        Self {
            repo,
            lifecycle: RecordLifecycleService::new(lifecycle, ctx),
            ctx,
        }
    }

    pub fn list(&self, view: ArchiveView) -> ServiceResult<Vec<InterestedParty>> {
        Ok(self.repo.list_parties(view)?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<InterestedParty> {
        self.repo.get_party(id)?.ok_or(ServiceError::NotFound {
            entity: KIND.label(),
            id,
        })
    }

    pub fn create(&self, input: &InterestedPartyInput) -> ServiceResult<InterestedParty> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, input)
    }

    /// Parses the submitted form after the permission check.
    pub fn create_from_form(&self, form: &FormData) -> ServiceResult<InterestedParty> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.insert(&user, &InterestedPartyInput::from_form(form)?)
    }

    pub fn update(
        &self,
        id: RecordId,
        input: &InterestedPartyInput,
    ) -> ServiceResult<InterestedParty> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, input)
    }

    pub fn update_from_form(&self, id: RecordId, form: &FormData) -> ServiceResult<InterestedParty> {
        let user = self.ctx.authorize(Permission::Write)?;
        self.replace(&user, id, &InterestedPartyInput::from_form(form)?)
    }

    pub fn archive(&self, id: RecordId) -> ServiceResult<InterestedParty> {
        self.lifecycle.archive(KIND, id)?;
        self.get(id)
    }

    pub fn unarchive(&self, id: RecordId) -> ServiceResult<InterestedParty> {
        self.lifecycle.unarchive(KIND, id)?;
        self.get(id)
    }

    pub fn toggle_archive(&self, id: RecordId) -> ServiceResult<InterestedParty> {
        self.lifecycle.toggle_archive(KIND, id)?;
        self.get(id)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.lifecycle.delete(KIND, id)
    }

    /// Moves a party one step up or down the display order.
    pub fn reorder(&self, id: RecordId, direction: MoveDirection) -> ServiceResult<ReorderOutcome> {
        let user = self.ctx.authorize(Permission::Write)?;
        let outcome = self.repo.reorder_party(id, direction, user.id)?;
        match outcome {
            ReorderOutcome::Moved { from, to, neighbor } => info!(
                "event=record_reorder module=service status=ok kind={} id={id} from={from} to={to} neighbor={neighbor}",
                KIND.as_str()
            ),
            ReorderOutcome::Unchanged => info!(
                "event=record_reorder module=service status=noop kind={} id={id} direction={direction:?}",
                KIND.as_str()
            ),
        }
        self.ctx.invalidate_list(KIND);
        Ok(outcome)
    }

    fn insert(&self, user: &User, input: &InterestedPartyInput) -> ServiceResult<InterestedParty> {
        let party = self.repo.create_party(input, user.id)?;
        info!(
            "event=record_create module=service status=ok kind={} id={} order={} risk_level={}",
            KIND.as_str(),
            party.id,
            party.order,
            party.risk_level()
        );
        self.ctx.invalidate_list(KIND);
        Ok(party)
    }

    fn replace(
        &self,
        user: &User,
        id: RecordId,
        input: &InterestedPartyInput,
    ) -> ServiceResult<InterestedParty> {
        let party = self.repo.update_party(id, input, user.id)?;
        info!(
            "event=record_update module=service status=ok kind={} id={id}",
            KIND.as_str()
        );
        self.ctx.invalidate_record(KIND, id);
        Ok(party)
    }
}

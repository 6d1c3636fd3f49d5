//! Archive/unarchive/delete use-cases shared by all registers.
//!
//! # Invariants
//! - Archive transitions require `write`; delete requires `delete`.
//! - Every successful call invalidates the register's list route, including
//!   no-op archive transitions.

use crate::model::record::{RecordId, RecordKind};
use crate::model::user::Permission;
use crate::repo::lifecycle::{ArchiveChange, RecordLifecycleRepository};
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

pub struct RecordLifecycleService<'ctx, L: RecordLifecycleRepository> {
    repo: L,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, L: RecordLifecycleRepository> RecordLifecycleService<'ctx, L> {
    pub fn new(repo: L, ctx: ServiceContext<'ctx>) -> Self {
        Self { repo, ctx }
    }

    pub fn archive(&self, kind: RecordKind, id: RecordId) -> ServiceResult<ArchiveChange> {
        self.set_archived(kind, id, true)
    }

    pub fn unarchive(&self, kind: RecordKind, id: RecordId) -> ServiceResult<ArchiveChange> {
        self.set_archived(kind, id, false)
    }

    /// Flips the archive flag and returns the new state.
    pub fn toggle_archive(&self, kind: RecordKind, id: RecordId) -> ServiceResult<bool> {
        self.ctx.authorize(Permission::Write)?;
        let archived = self
            .repo
            .archived_state(kind, id)?
            .ok_or(ServiceError::NotFound {
                entity: kind.label(),
                id,
            })?;
        self.set_archived(kind, id, !archived)?;
        Ok(!archived)
    }

    pub fn delete(&self, kind: RecordKind, id: RecordId) -> ServiceResult<()> {
        self.ctx.authorize(Permission::Delete)?;
        self.repo.delete_record(kind, id)?;
        info!(
            "event=record_delete module=service status=ok kind={} id={id}",
            kind.as_str()
        );
        self.ctx.invalidate_list(kind);
        Ok(())
    }

    /// Counts records for status reporting; reads need no permission.
    pub fn count(&self, kind: RecordKind, include_archived: bool) -> ServiceResult<u64> {
        Ok(self.repo.count_records(kind, include_archived)?)
    }

    fn set_archived(
        &self,
        kind: RecordKind,
        id: RecordId,
        archived: bool,
    ) -> ServiceResult<ArchiveChange> {
        let user = self.ctx.authorize(Permission::Write)?;
        let change = self.repo.set_archived(kind, id, archived, user.id)?;
        let status = match change {
            ArchiveChange::Changed => "ok",
            ArchiveChange::Unchanged => "noop",
        };
        info!(
            "event=record_archive module=service status={status} kind={} id={id} archived={archived}",
            kind.as_str()
        );
        self.ctx.invalidate_list(kind);
        Ok(change)
    }
}

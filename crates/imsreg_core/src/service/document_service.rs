//! Attachment use-cases for maintenance items and audits.
//!
//! Binary upload happens outside the core; callers pass the stored file's
//! name and URL. Attach and detach both require `write`.

use crate::intake::FormData;
use crate::model::document::{DocumentInput, DocumentOwner, DocumentRecord};
use crate::model::record::RecordId;
use crate::model::user::Permission;
use crate::repo::document_repo::DocumentRepository;
use crate::service::context::ServiceContext;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

pub struct DocumentService<'ctx, D: DocumentRepository> {
    repo: D,
    ctx: ServiceContext<'ctx>,
}

impl<'ctx, D: DocumentRepository> DocumentService<'ctx, D> {
    pub fn new(repo: D, ctx: ServiceContext<'ctx>) -> Self {
        Self { repo, ctx }
    }

    pub fn list(&self, owner: DocumentOwner) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(self.repo.list_documents(owner)?)
    }

    pub fn attach(&self, owner: DocumentOwner, input: &DocumentInput) -> ServiceResult<DocumentRecord> {
        let user = self.ctx.authorize(Permission::Write)?;
        let document = self.repo.attach_document(owner, input, user.id)?;
        info!(
            "event=document_attach module=service status=ok owner_kind={} owner_id={} id={}",
            owner.kind().as_str(),
            owner.id(),
            document.id
        );
        self.ctx.invalidate_record(owner.kind(), owner.id());
        Ok(document)
    }

    pub fn attach_from_form(
        &self,
        owner: DocumentOwner,
        form: &FormData,
    ) -> ServiceResult<DocumentRecord> {
        self.ctx.authorize(Permission::Write)?;
        self.attach(owner, &DocumentInput::from_form(form)?)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<()> {
        self.ctx.authorize(Permission::Write)?;
        let document = self.repo.get_document(id)?.ok_or(ServiceError::NotFound {
            entity: "document",
            id,
        })?;
        self.repo.delete_document(id)?;
        info!(
            "event=document_delete module=service status=ok owner_kind={} owner_id={} id={id}",
            document.owner.kind().as_str(),
            document.owner.id()
        );
        self.ctx
            .invalidate_record(document.owner.kind(), document.owner.id());
        Ok(())
    }
}

//! Request-scoped permission guard and route invalidation.

use crate::access::{AccessControl, RouteInvalidator};
use crate::model::record::{RecordId, RecordKind};
use crate::model::user::{Permission, User};
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, warn};

/// Collaborators shared by every service in one request.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    access: &'a dyn AccessControl,
    routes: &'a dyn RouteInvalidator,
}

impl<'a> ServiceContext<'a> {
    pub fn new(access: &'a dyn AccessControl, routes: &'a dyn RouteInvalidator) -> Self {
        Self { access, routes }
    }

    /// Resolves the acting user and checks `permission`.
    ///
    /// # Errors
    /// - `Unauthorized` when no user is resolvable, the user is inactive or
    ///   the permission is not granted.
    pub fn authorize(&self, permission: Permission) -> ServiceResult<User> {
        let Some(user) = self.access.current_user() else {
            warn!(
                "event=access_denied module=service status=error reason=no_user permission={}",
                permission.as_str()
            );
            return Err(ServiceError::Unauthorized);
        };
        if !user.active || !self.access.has_permission(permission) {
            warn!(
                "event=access_denied module=service status=error reason=missing_permission user_id={} permission={}",
                user.id,
                permission.as_str()
            );
            return Err(ServiceError::Unauthorized);
        }
        Ok(user)
    }

    /// Invalidates the register's list page.
    pub(crate) fn invalidate_list(&self, kind: RecordKind) {
        self.invalidate(kind.list_route());
    }

    /// Invalidates the list page and the record's detail page.
    pub(crate) fn invalidate_record(&self, kind: RecordKind, id: RecordId) {
        self.invalidate(kind.list_route());
        self.invalidate(&kind.detail_route(id));
    }

    fn invalidate(&self, route: &str) {
        debug!("event=route_invalidate module=service status=ok route={route}");
        self.routes.invalidate(route);
    }
}

//! Collaborator seams for authentication and page cache invalidation.
//!
//! # Responsibility
//! - Define the narrow traits the services call (`AccessControl`,
//!   `RouteInvalidator`).
//! - Provide request-scoped implementations for callers that resolve the
//!   session up front (FFI, CLI, tests).
//!
//! # Invariants
//! - An inactive user never passes a permission check.
//! - Route invalidation never fails the mutation that triggered it.

use crate::model::user::{Permission, User};
use std::sync::Mutex;

/// Resolves the acting user and their grants.
pub trait AccessControl {
    fn current_user(&self) -> Option<User>;
    fn has_permission(&self, permission: Permission) -> bool;
}

/// Receives route paths whose cached pages are stale after a mutation.
pub trait RouteInvalidator {
    fn invalidate(&self, route_path: &str);
}

/// Session resolved before the request runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAccess {
    user: Option<User>,
    permissions: Vec<Permission>,
}

impl SessionAccess {
    pub fn new(user: User, permissions: impl IntoIterator<Item = Permission>) -> Self {
        let mut permissions: Vec<Permission> = permissions.into_iter().collect();
        permissions.dedup();
        Self {
            user: Some(user),
            permissions,
        }
    }

    /// Session without a signed-in user.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl AccessControl for SessionAccess {
    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }

    fn has_permission(&self, permission: Permission) -> bool {
        self.user.as_ref().is_some_and(|user| user.active) && self.permissions.contains(&permission)
    }
}

/// Collects invalidated routes in order, without duplicates.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    routes: Mutex<Vec<String>>,
}

impl RecordingInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the collected routes.
    pub fn take(&self) -> Vec<String> {
        let mut routes = self
            .routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *routes)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RouteInvalidator for RecordingInvalidator {
    fn invalidate(&self, route_path: &str) {
        let mut routes = self
            .routes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !routes.iter().any(|existing| existing == route_path) {
            routes.push(route_path.to_string());
        }
    }
}

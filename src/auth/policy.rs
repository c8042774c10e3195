//! Role and ownership rules for every protected operation.

use uuid::Uuid;

use crate::{
    domain::{Role, User},
    error::{AppError, Result},
};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self { id: user.id, role: user.role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Booking { owner: Uuid },
    Payment { owner: Uuid },
    Ticket { owner: Uuid },
    /// The trip catalogue.
    Trips,
    /// Every user's account.
    Users,
    /// Cross-user listings of bookings, payments and tickets.
    AllRecords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Cancel,
    Pay,
    Complete,
    Manage,
}

pub fn authorize(principal: &Principal, resource: Resource, action: Action) -> Result<()> {
    if principal.is_admin() {
        return Ok(());
    }

    let allowed = match (resource, action) {
        (Resource::Booking { owner }, Action::View | Action::Cancel | Action::Pay) => {
            owner == principal.id
        }
        (Resource::Payment { owner }, Action::View | Action::Pay) => owner == principal.id,
        (Resource::Ticket { owner }, Action::View) => owner == principal.id,
        (Resource::Trips, Action::View) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!(
            principal = %principal.id,
            ?resource,
            ?action,
            "Authorization denied"
        );
        Err(AppError::Forbidden)
    }
}

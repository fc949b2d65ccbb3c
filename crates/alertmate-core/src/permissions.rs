//! Platform permissions the core checks before acting.
//!
//! Permissions are preconditions, never assumptions. A missing permission
//! disables the dependent feature and surfaces a notice; it never panics.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// First platform API level that requires a runtime notification grant.
pub const NOTIFICATIONS_MIN_API: u32 = 33;
/// First platform API level with a separate background-location grant.
pub const BACKGROUND_LOCATION_MIN_API: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    FineLocation,
    CoarseLocation,
    BackgroundLocation,
    SendSms,
    ReadContacts,
    ForegroundService,
    ForegroundServiceLocation,
    PostNotifications,
}

impl Permission {
    /// Whether the platform at `api_level` asks for this permission at all.
    /// Older platforms grant gated permissions implicitly.
    pub fn is_runtime_gated(self, api_level: u32) -> bool {
        match self {
            Permission::PostNotifications => api_level >= NOTIFICATIONS_MIN_API,
            Permission::BackgroundLocation => api_level >= BACKGROUND_LOCATION_MIN_API,
            _ => true,
        }
    }

    /// Permissions the background service needs before it may start.
    pub fn service_requirements() -> [Permission; 3] {
        [
            Permission::ForegroundServiceLocation,
            Permission::FineLocation,
            Permission::ForegroundService,
        ]
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::FineLocation => "fine_location",
            Permission::CoarseLocation => "coarse_location",
            Permission::BackgroundLocation => "background_location",
            Permission::SendSms => "send_sms",
            Permission::ReadContacts => "read_contacts",
            Permission::ForegroundService => "foreground_service",
            Permission::ForegroundServiceLocation => "foreground_service_location",
            Permission::PostNotifications => "post_notifications",
        };
        f.write_str(name)
    }
}

/// Answers "is this permission currently granted?".
pub trait PermissionChecker {
    fn is_granted(&self, permission: Permission) -> bool;

    /// First permission from `required` that is missing, if any.
    fn first_missing(&self, required: &[Permission]) -> Option<Permission> {
        required.iter().copied().find(|p| !self.is_granted(*p))
    }
}

/// A fixed set of grants, version-gated by platform API level.
#[derive(Debug, Clone, Default)]
pub struct GrantedPermissions {
    granted: HashSet<Permission>,
    api_level: u32,
}

impl GrantedPermissions {
    pub fn new(api_level: u32) -> Self {
        Self {
            granted: HashSet::new(),
            api_level,
        }
    }

    /// Everything granted, on the newest platform.
    pub fn all() -> Self {
        let mut perms = Self::new(NOTIFICATIONS_MIN_API);
        for p in [
            Permission::FineLocation,
            Permission::CoarseLocation,
            Permission::BackgroundLocation,
            Permission::SendSms,
            Permission::ReadContacts,
            Permission::ForegroundService,
            Permission::ForegroundServiceLocation,
            Permission::PostNotifications,
        ] {
            perms.grant(p);
        }
        perms
    }

    pub fn grant(&mut self, permission: Permission) -> &mut Self {
        self.granted.insert(permission);
        self
    }

    pub fn revoke(&mut self, permission: Permission) -> &mut Self {
        self.granted.remove(&permission);
        self
    }

    pub fn api_level(&self) -> u32 {
        self.api_level
    }
}

impl PermissionChecker for GrantedPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        !permission.is_runtime_gated(self.api_level) || self.granted.contains(&permission)
    }
}

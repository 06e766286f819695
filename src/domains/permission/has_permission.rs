use serde::{Deserialize, Serialize};

// --- User Role Definition ---

/// UserRole enum for authorization in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    User,
}

// --- Permission Enum Definition ---

/// Permission enum representing individual permissions in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    // User management
    ViewUsers,
    ManageUsers,

    // Car listings
    ManageListings,

    // History
    ViewHistory,
    RecordHistory,
    DeleteHistory,

    // Bulk export
    ExportData,

    // Dashboards and scraper diagnostics
    ViewStatistics,
    ManageParsingErrors,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::User => "user",
        }
    }

    /// Case-insensitive parse of a stored or submitted role name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "manager" => Some(UserRole::Manager),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Manager => match permission {
                Permission::ManageUsers | Permission::DeleteHistory => false,
                _ => true,
            },
            UserRole::User => matches!(
                permission,
                Permission::ViewUsers
                    | Permission::ViewHistory
                    | Permission::RecordHistory
                    | Permission::ViewStatistics
            ),
        }
    }

    pub fn has_permissions(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(*p))
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

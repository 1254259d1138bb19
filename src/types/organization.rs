use serde::{Deserialize, Serialize};

use super::{require_range, require_text};
use crate::error::NexusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    Contributor,
    Viewer,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub industry: Option<String>,
    pub risk_appetite: Option<i64>,
}

impl CreateOrganization {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("name", &self.name)?;
        if let Some(appetite) = self.risk_appetite {
            require_range("risk_appetite", appetite, 1, 25)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub risk_appetite: Option<i64>,
}

impl UpdateOrganization {
    pub fn validate(&self) -> Result<(), NexusError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(appetite) = self.risk_appetite {
            require_range("risk_appetite", appetite, 1, 25)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub role: Option<UserRole>,
}

impl CreateUser {
    pub fn validate(&self) -> Result<(), NexusError> {
        require_text("name", &self.name)?;
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(NexusError::validation("`email` is not a valid address")),
        }
    }
}

//! Resource and operation names for the Clerk operations layer.
//!
//! Both enums use the camelCase names workflows refer to them by (`organizationMembership`,
//! `getAll`, `verifyTOTP`, ...). Which pairs are actually callable is decided by
//! [`crate::clerk::OperationTable`], not here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    AllowlistIdentifier,
    BlocklistIdentifier,
    EmailAddress,
    Invitation,
    JwtTemplate,
    Organization,
    OrganizationInvitation,
    OrganizationMembership,
    PhoneNumber,
    Session,
    User,
    Webhook,
}

impl Resource {
    pub const ALL: [Resource; 12] = [
        Self::AllowlistIdentifier,
        Self::BlocklistIdentifier,
        Self::EmailAddress,
        Self::Invitation,
        Self::JwtTemplate,
        Self::Organization,
        Self::OrganizationInvitation,
        Self::OrganizationMembership,
        Self::PhoneNumber,
        Self::Session,
        Self::User,
        Self::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowlistIdentifier => "allowlistIdentifier",
            Self::BlocklistIdentifier => "blocklistIdentifier",
            Self::EmailAddress => "emailAddress",
            Self::Invitation => "invitation",
            Self::JwtTemplate => "jwtTemplate",
            Self::Organization => "organization",
            Self::OrganizationInvitation => "organizationInvitation",
            Self::OrganizationMembership => "organizationMembership",
            Self::PhoneNumber => "phoneNumber",
            Self::Session => "session",
            Self::User => "user",
            Self::Webhook => "webhook",
        }
    }
}

// Operations that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Get,
    GetAll,
    Update,
    Delete,
    // User moderation
    Ban,
    Unban,
    Lock,
    Unlock,
    GetCount,
    VerifyPassword,
    #[serde(rename = "verifyTOTP")]
    VerifyTotp,
    #[serde(rename = "disableMFA")]
    DisableMfa,
    GetOrganizationMemberships,
    SetProfileImage,
    DeleteProfileImage,
    UpdateMetadata,
    // Organization logo
    UpdateLogo,
    DeleteLogo,
    // Invitations and sessions
    Revoke,
    GetBulk,
    Verify,
}

impl Operation {
    pub const ALL: [Operation; 22] = [
        Self::Create,
        Self::Get,
        Self::GetAll,
        Self::Update,
        Self::Delete,
        Self::Ban,
        Self::Unban,
        Self::Lock,
        Self::Unlock,
        Self::GetCount,
        Self::VerifyPassword,
        Self::VerifyTotp,
        Self::DisableMfa,
        Self::GetOrganizationMemberships,
        Self::SetProfileImage,
        Self::DeleteProfileImage,
        Self::UpdateMetadata,
        Self::UpdateLogo,
        Self::DeleteLogo,
        Self::Revoke,
        Self::GetBulk,
        Self::Verify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::GetAll => "getAll",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::GetCount => "getCount",
            Self::VerifyPassword => "verifyPassword",
            Self::VerifyTotp => "verifyTOTP",
            Self::DisableMfa => "disableMFA",
            Self::GetOrganizationMemberships => "getOrganizationMemberships",
            Self::SetProfileImage => "setProfileImage",
            Self::DeleteProfileImage => "deleteProfileImage",
            Self::UpdateMetadata => "updateMetadata",
            Self::UpdateLogo => "updateLogo",
            Self::DeleteLogo => "deleteLogo",
            Self::Revoke => "revoke",
            Self::GetBulk => "getBulk",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Unknown resource: {}", s))
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("Unknown operation: {}", s))
    }
}

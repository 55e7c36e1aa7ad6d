//! The `(Resource, Operation)` → Clerk endpoint table.
//!
//! Built once at startup. Anything not in the table is reported as
//! [`Error::UnsupportedOperation`] rather than silently doing nothing; the binary upload
//! operations (`user.setProfileImage`, `organization.updateLogo`) are deliberately absent.

use std::collections::HashMap;

use reqwest::Method;
use serde_json::{Map, Value};

use crate::clerk::params::{Field, FieldKind, OperationParams, build_object, clean_object};
use crate::errors::{Error, Result};
use crate::types::{Operation, Resource};

const ADDITIONAL: &str = "additionalFields";
const UPDATE: &str = "updateFields";
const FILTERS: &str = "filters";
const METADATA: &str = "metadata";

/// How an endpoint's response is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// One request, one response
    Single,
    /// Offset-paginated list honouring `returnAll` and `limit`
    Paged,
    /// Offset-paginated list, always fetched in full
    AllItems,
}

/// A single Clerk API call.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: Method,
    /// Path relative to the API base, with `{param}` placeholders
    pub path: &'static str,
    pub call: CallKind,
    pub body: Vec<Field>,
    pub query: Vec<Field>,
    /// Strip null and empty-string values from the body before sending
    pub clean_body: bool,
}

impl Endpoint {
    fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            call: CallKind::Single,
            body: Vec::new(),
            query: Vec::new(),
            clean_body: false,
        }
    }

    fn get(path: &'static str) -> Self {
        Self::new(Method::GET, path)
    }

    fn post(path: &'static str) -> Self {
        Self::new(Method::POST, path)
    }

    fn patch(path: &'static str) -> Self {
        Self::new(Method::PATCH, path)
    }

    fn delete(path: &'static str) -> Self {
        Self::new(Method::DELETE, path)
    }

    fn paged(mut self) -> Self {
        self.call = CallKind::Paged;
        self
    }

    fn all_items(mut self) -> Self {
        self.call = CallKind::AllItems;
        self
    }

    fn body(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.body.extend(fields);
        self
    }

    fn query(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.query.extend(fields);
        self
    }

    fn cleaned(mut self) -> Self {
        self.clean_body = true;
        self
    }

    /// Resolve the path template into URL segments.
    pub fn path_segments(&self, params: &OperationParams<'_>) -> Result<Vec<String>> {
        self.path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => params.required_id(name),
                None => Ok(segment.to_string()),
            })
            .collect()
    }

    pub fn build_body(&self, params: &OperationParams<'_>) -> Result<Map<String, Value>> {
        let body = build_object(&self.body, params)?;
        Ok(if self.clean_body { clean_object(body) } else { body })
    }

    pub fn build_query(&self, params: &OperationParams<'_>) -> Result<Map<String, Value>> {
        build_object(&self.query, params)
    }
}

fn optional(group: &'static str, names: &[&'static str]) -> Vec<Field> {
    names.iter().map(|&name| Field::optional(group, name)).collect()
}

fn flags(group: &'static str, names: &[&'static str]) -> Vec<Field> {
    names.iter().map(|&name| Field::optional(group, name).kind(FieldKind::Flag)).collect()
}

fn metadata(group: &'static str, names: &[&'static str]) -> Vec<Field> {
    names.iter().map(|&name| Field::optional(group, name).kind(FieldKind::Metadata)).collect()
}

fn required(names: &[&'static str]) -> Vec<Field> {
    names.iter().map(|&name| Field::required(name)).collect()
}

/// Lookup table of every supported operation.
#[derive(Debug, Clone)]
pub struct OperationTable {
    endpoints: HashMap<(Resource, Operation), Endpoint>,
}

impl Default for OperationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationTable {
    pub fn new() -> Self {
        use Operation as O;
        use Resource as R;

        let mut endpoints = HashMap::new();
        let mut add = |resource: Resource, operation: Operation, endpoint: Endpoint| {
            endpoints.insert((resource, operation), endpoint);
        };

        // --- User ---
        add(
            R::User,
            O::Create,
            Endpoint::post("/users")
                .body([
                    Field::optional(ADDITIONAL, "emailAddress").kind(FieldKind::Csv),
                    Field::optional(ADDITIONAL, "phoneNumber").kind(FieldKind::Csv),
                ])
                .body(optional(
                    ADDITIONAL,
                    &[
                        "username",
                        "password",
                        "firstName",
                        "lastName",
                        "externalId",
                        "skipPasswordChecks",
                        "skipPasswordRequirement",
                        "totpSecret",
                    ],
                ))
                .body([
                    Field::optional(ADDITIONAL, "backupCodes").kind(FieldKind::Csv),
                    Field::optional(ADDITIONAL, "createdAt").kind(FieldKind::IsoDate),
                ])
                .body(metadata(ADDITIONAL, &["publicMetadata", "privateMetadata", "unsafeMetadata"]))
                .cleaned(),
        );
        add(R::User, O::Get, Endpoint::get("/users/{userId}"));
        add(
            R::User,
            O::GetAll,
            Endpoint::get("/users")
                .paged()
                .query(optional(
                    FILTERS,
                    &[
                        "emailAddress",
                        "phoneNumber",
                        "externalId",
                        "username",
                        "web3Wallet",
                        "userId",
                        "query",
                        "orderBy",
                    ],
                ))
                .query(
                    ["lastActiveAtSince", "createdAtBefore", "createdAtAfter"]
                        .map(|name| Field::optional(FILTERS, name).kind(FieldKind::EpochMillis)),
                ),
        );
        add(
            R::User,
            O::Update,
            Endpoint::patch("/users/{userId}")
                .body(optional(
                    UPDATE,
                    &[
                        "username",
                        "password",
                        "firstName",
                        "lastName",
                        "externalId",
                        "primaryEmailAddressId",
                        "primaryPhoneNumberId",
                        "primaryWeb3WalletId",
                        "profileImageId",
                        "skipPasswordChecks",
                        "signOutOfOtherSessions",
                        "totpSecret",
                    ],
                ))
                .body(flags(
                    UPDATE,
                    &["deleteSelfEnabled", "createOrganizationEnabled", "createOrganizationsLimit"],
                ))
                .body([Field::optional(UPDATE, "backupCodes").kind(FieldKind::Csv)])
                .body(metadata(UPDATE, &["publicMetadata", "privateMetadata", "unsafeMetadata"]))
                .cleaned(),
        );
        add(R::User, O::Delete, Endpoint::delete("/users/{userId}"));
        add(R::User, O::Ban, Endpoint::post("/users/{userId}/ban"));
        add(R::User, O::Unban, Endpoint::post("/users/{userId}/unban"));
        add(R::User, O::Lock, Endpoint::post("/users/{userId}/lock"));
        add(R::User, O::Unlock, Endpoint::post("/users/{userId}/unlock"));
        add(R::User, O::GetCount, Endpoint::get("/users/count"));
        add(
            R::User,
            O::VerifyPassword,
            Endpoint::post("/users/{userId}/verify_password").body(required(&["password"])),
        );
        add(
            R::User,
            O::VerifyTotp,
            Endpoint::post("/users/{userId}/verify_totp").body(required(&["code"])),
        );
        add(R::User, O::DisableMfa, Endpoint::delete("/users/{userId}/mfa"));
        add(
            R::User,
            O::GetOrganizationMemberships,
            Endpoint::get("/users/{userId}/organization_memberships").all_items(),
        );
        add(R::User, O::DeleteProfileImage, Endpoint::delete("/users/{userId}/profile_image"));
        add(
            R::User,
            O::UpdateMetadata,
            Endpoint::patch("/users/{userId}/metadata")
                .body(metadata(METADATA, &["publicMetadata", "privateMetadata", "unsafeMetadata"]))
                .cleaned(),
        );

        // --- Organization ---
        add(
            R::Organization,
            O::Create,
            Endpoint::post("/organizations")
                .body(required(&["name", "createdBy"]))
                .body(optional(ADDITIONAL, &["slug", "maxAllowedMemberships"]))
                .body(metadata(ADDITIONAL, &["publicMetadata", "privateMetadata"]))
                .cleaned(),
        );
        add(R::Organization, O::Get, Endpoint::get("/organizations/{organizationId}"));
        add(
            R::Organization,
            O::GetAll,
            Endpoint::get("/organizations")
                .paged()
                .query([
                    Field::optional(FILTERS, "query"),
                    Field::optional(FILTERS, "userId").kind(FieldKind::Csv),
                    Field::optional(FILTERS, "orderBy"),
                    Field::optional(FILTERS, "includeMembersCount"),
                ]),
        );
        add(
            R::Organization,
            O::Update,
            Endpoint::patch("/organizations/{organizationId}")
                .body(optional(UPDATE, &["name", "slug"]))
                .body(flags(UPDATE, &["maxAllowedMemberships", "adminDeleteEnabled"]))
                .body(metadata(UPDATE, &["publicMetadata", "privateMetadata"]))
                .cleaned(),
        );
        add(R::Organization, O::Delete, Endpoint::delete("/organizations/{organizationId}"));
        add(
            R::Organization,
            O::DeleteLogo,
            Endpoint::delete("/organizations/{organizationId}/logo"),
        );
        add(
            R::Organization,
            O::UpdateMetadata,
            Endpoint::patch("/organizations/{organizationId}/metadata")
                .body(metadata(METADATA, &["publicMetadata", "privateMetadata"]))
                .cleaned(),
        );

        // --- Organization membership ---
        add(
            R::OrganizationMembership,
            O::Create,
            Endpoint::post("/organizations/{organizationId}/memberships").body(required(&["userId", "role"])),
        );
        add(
            R::OrganizationMembership,
            O::Get,
            Endpoint::get("/organizations/{organizationId}/memberships/{userId}"),
        );
        add(
            R::OrganizationMembership,
            O::GetAll,
            Endpoint::get("/organizations/{organizationId}/memberships")
                .paged()
                .query([
                    Field::optional(FILTERS, "query"),
                    Field::optional(FILTERS, "userId").kind(FieldKind::Csv),
                    Field::optional(FILTERS, "role").kind(FieldKind::Csv),
                    Field::optional(FILTERS, "orderBy"),
                ]),
        );
        add(
            R::OrganizationMembership,
            O::Update,
            Endpoint::patch("/organizations/{organizationId}/memberships/{userId}").body(required(&["role"])),
        );
        add(
            R::OrganizationMembership,
            O::Delete,
            Endpoint::delete("/organizations/{organizationId}/memberships/{userId}"),
        );

        // --- Organization invitation ---
        add(
            R::OrganizationInvitation,
            O::Create,
            Endpoint::post("/organizations/{organizationId}/invitations")
                .body(required(&["emailAddress", "role", "inviterUserId"]))
                .body(optional(ADDITIONAL, &["redirectUrl", "expiresInDays"]))
                .body(metadata(ADDITIONAL, &["publicMetadata", "privateMetadata"]))
                .cleaned(),
        );
        add(
            R::OrganizationInvitation,
            O::Get,
            Endpoint::get("/organizations/{organizationId}/invitations/{invitationId}"),
        );
        add(
            R::OrganizationInvitation,
            O::GetAll,
            Endpoint::get("/organizations/{organizationId}/invitations")
                .paged()
                .query(optional(FILTERS, &["status", "orderBy"])),
        );
        add(
            R::OrganizationInvitation,
            O::Revoke,
            Endpoint::post("/organizations/{organizationId}/invitations/{invitationId}/revoke")
                .body(required(&["requestingUserId"])),
        );
        add(
            R::OrganizationInvitation,
            O::GetBulk,
            Endpoint::get("/organization_invitations").query([Field::required("invitationIds")
                .kind(FieldKind::Csv)
                .wire("organization_invitation_id")]),
        );

        // --- Session ---
        add(R::Session, O::Get, Endpoint::get("/sessions/{sessionId}"));
        add(
            R::Session,
            O::GetAll,
            Endpoint::get("/sessions")
                .paged()
                .query(optional(FILTERS, &["clientId", "userId", "status"])),
        );
        add(R::Session, O::Revoke, Endpoint::post("/sessions/{sessionId}/revoke"));
        add(
            R::Session,
            O::Verify,
            Endpoint::post("/sessions/{sessionId}/verify").body(required(&["token"])),
        );

        // --- Email address ---
        add(
            R::EmailAddress,
            O::Create,
            Endpoint::post("/email_addresses")
                .body(required(&["userId", "emailAddress"]))
                .body(flags(ADDITIONAL, &["verified", "primary"]))
                .cleaned(),
        );
        add(R::EmailAddress, O::Get, Endpoint::get("/email_addresses/{emailAddressId}"));
        add(R::EmailAddress, O::Delete, Endpoint::delete("/email_addresses/{emailAddressId}"));
        add(
            R::EmailAddress,
            O::Update,
            Endpoint::patch("/email_addresses/{emailAddressId}")
                .body(flags(UPDATE, &["verified", "primary"]))
                .cleaned(),
        );

        // --- Phone number ---
        add(
            R::PhoneNumber,
            O::Create,
            Endpoint::post("/phone_numbers")
                .body(required(&["userId", "phoneNumber"]))
                .body(flags(ADDITIONAL, &["verified", "primary", "reservedForSecondFactor"]))
                .cleaned(),
        );
        add(R::PhoneNumber, O::Get, Endpoint::get("/phone_numbers/{phoneNumberId}"));
        add(R::PhoneNumber, O::Delete, Endpoint::delete("/phone_numbers/{phoneNumberId}"));
        add(
            R::PhoneNumber,
            O::Update,
            Endpoint::patch("/phone_numbers/{phoneNumberId}")
                .body(flags(
                    UPDATE,
                    &["verified", "primary", "reservedForSecondFactor", "defaultSecondFactor"],
                ))
                .cleaned(),
        );

        // --- Invitation ---
        add(
            R::Invitation,
            O::Create,
            Endpoint::post("/invitations")
                .body(required(&["emailAddress"]))
                .body(optional(ADDITIONAL, &["redirectUrl", "expiresInDays"]))
                .body(flags(ADDITIONAL, &["notify", "ignoreExisting"]))
                .body(metadata(ADDITIONAL, &["publicMetadata"]))
                .cleaned(),
        );
        add(R::Invitation, O::Get, Endpoint::get("/invitations/{invitationId}"));
        add(
            R::Invitation,
            O::GetAll,
            Endpoint::get("/invitations")
                .paged()
                .query(optional(FILTERS, &["status", "query", "orderBy"])),
        );
        add(R::Invitation, O::Revoke, Endpoint::post("/invitations/{invitationId}/revoke"));

        // --- Allowlist / blocklist ---
        add(
            R::AllowlistIdentifier,
            O::Create,
            Endpoint::post("/allowlist_identifiers")
                .body(required(&["identifier"]))
                .body(flags(ADDITIONAL, &["notify"]))
                .cleaned(),
        );
        add(
            R::AllowlistIdentifier,
            O::Get,
            Endpoint::get("/allowlist_identifiers/{identifierId}"),
        );
        add(R::AllowlistIdentifier, O::GetAll, Endpoint::get("/allowlist_identifiers").paged());
        add(
            R::AllowlistIdentifier,
            O::Delete,
            Endpoint::delete("/allowlist_identifiers/{identifierId}"),
        );

        add(
            R::BlocklistIdentifier,
            O::Create,
            Endpoint::post("/blocklist_identifiers").body(required(&["identifier"])),
        );
        add(
            R::BlocklistIdentifier,
            O::Get,
            Endpoint::get("/blocklist_identifiers/{identifierId}"),
        );
        add(R::BlocklistIdentifier, O::GetAll, Endpoint::get("/blocklist_identifiers").paged());
        add(
            R::BlocklistIdentifier,
            O::Delete,
            Endpoint::delete("/blocklist_identifiers/{identifierId}"),
        );

        // --- JWT template ---
        add(
            R::JwtTemplate,
            O::Create,
            Endpoint::post("/jwt_templates")
                .body([
                    Field::required("name"),
                    Field::required("claims").kind(FieldKind::Metadata),
                ])
                .body(optional(ADDITIONAL, &["lifetime", "allowedClockSkew"]))
                .body(flags(ADDITIONAL, &["customSigningKey"]))
                .body(optional(ADDITIONAL, &["signingAlgorithm", "signingKey"]))
                .cleaned(),
        );
        add(R::JwtTemplate, O::Get, Endpoint::get("/jwt_templates/{templateId}"));
        add(R::JwtTemplate, O::GetAll, Endpoint::get("/jwt_templates").paged());
        add(
            R::JwtTemplate,
            O::Update,
            Endpoint::patch("/jwt_templates/{templateId}")
                .body(optional(UPDATE, &["name"]))
                .body(metadata(UPDATE, &["claims"]))
                .body(optional(UPDATE, &["lifetime", "allowedClockSkew"]))
                .body(flags(UPDATE, &["customSigningKey"]))
                .body(optional(UPDATE, &["signingAlgorithm", "signingKey"]))
                .cleaned(),
        );
        add(R::JwtTemplate, O::Delete, Endpoint::delete("/jwt_templates/{templateId}"));

        // --- Webhook (SVIX endpoints) ---
        add(
            R::Webhook,
            O::Create,
            Endpoint::post("/webhooks/svix").body(required(&["endpointUrl"])),
        );
        add(R::Webhook, O::Get, Endpoint::get("/webhooks/svix/{webhookId}"));
        add(R::Webhook, O::GetAll, Endpoint::get("/webhooks/svix").paged());
        add(
            R::Webhook,
            O::Update,
            Endpoint::patch("/webhooks/svix/{webhookId}")
                .body(optional(UPDATE, &["endpointUrl"]))
                .cleaned(),
        );
        add(R::Webhook, O::Delete, Endpoint::delete("/webhooks/svix/{webhookId}"));

        Self { endpoints }
    }

    pub fn lookup(&self, resource: Resource, operation: Operation) -> Result<&Endpoint> {
        self.endpoints
            .get(&(resource, operation))
            .ok_or(Error::UnsupportedOperation { resource, operation })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Supported operations of one resource, in declaration order of [`Operation::ALL`]
    pub fn operations_for(&self, resource: Resource) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.endpoints.contains_key(&(resource, *op)))
            .collect()
    }
}

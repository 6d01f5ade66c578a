//! Organization users

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{mime, Link, Reference, XmlBody, XMLNS_VCLOUD};
use super::error::ApiError;
use super::href::require_href;
use super::Client;

pub const PROVIDER_INTEGRATED: &str = "INTEGRATED";
pub const PROVIDER_SAML: &str = "SAML";
pub const PROVIDER_OAUTH: &str = "OAUTH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "User")]
pub struct OrgUserType {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub type_: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "FullName", default)]
    pub full_name: Option<String>,
    #[serde(rename = "EmailAddress", default)]
    pub email_address: Option<String>,
    #[serde(rename = "Telephone", default)]
    pub telephone: Option<String>,
    #[serde(rename = "IsEnabled", default)]
    pub is_enabled: Option<bool>,
    #[serde(rename = "IsLocked", default)]
    pub is_locked: Option<bool>,
    #[serde(rename = "IsExternal", default)]
    pub is_external: Option<bool>,
    #[serde(rename = "ProviderType", default)]
    pub provider_type: Option<String>,
    #[serde(rename = "StoredVmQuota", default)]
    pub stored_vm_quota: Option<i32>,
    #[serde(rename = "DeployedVmQuota", default)]
    pub deployed_vm_quota: Option<i32>,
    #[serde(rename = "Role", default)]
    pub role: Option<Reference>,
}

/// Settings of a user to create
#[derive(Debug, Clone, Default)]
pub struct OrgUserConfiguration {
    pub name: String,
    pub role_name: String,
    /// Required for `INTEGRATED` users
    pub password: Option<String>,
    /// `INTEGRATED` when unset
    pub provider_type: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub email_address: Option<String>,
    pub telephone: Option<String>,
    pub is_enabled: bool,
    pub is_external: bool,
    pub stored_vm_quota: i32,
    pub deployed_vm_quota: i32,
}

impl OrgUserConfiguration {
    pub fn new(name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role_name: role_name.into(),
            is_enabled: true,
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub(crate) fn provider(&self) -> &str {
        self.provider_type.as_deref().unwrap_or(PROVIDER_INTEGRATED)
    }

    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.name.is_empty() {
            return Err(ApiError::InvalidRequest("user name is empty".to_string()));
        }
        if self.role_name.is_empty() {
            return Err(ApiError::InvalidRequest(format!(
                "user '{}' has no role",
                self.name
            )));
        }
        match self.provider() {
            PROVIDER_INTEGRATED => {
                if self.password.as_deref().unwrap_or_default().is_empty() {
                    return Err(ApiError::InvalidRequest(format!(
                        "integrated user '{}' needs a password",
                        self.name
                    )));
                }
            }
            PROVIDER_SAML | PROVIDER_OAUTH => {}
            other => {
                return Err(ApiError::InvalidRequest(format!(
                    "unknown provider type '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// The `User` element as sent to vCD; vCD rejects elements out of this order
#[derive(Debug, Serialize)]
#[serde(rename = "User")]
pub(crate) struct UserBody {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "FullName", skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(rename = "EmailAddress", skip_serializing_if = "Option::is_none")]
    email_address: Option<String>,
    #[serde(rename = "Telephone", skip_serializing_if = "Option::is_none")]
    telephone: Option<String>,
    #[serde(rename = "IsEnabled")]
    is_enabled: bool,
    #[serde(rename = "IsLocked")]
    is_locked: bool,
    #[serde(rename = "IsExternal")]
    is_external: bool,
    #[serde(rename = "ProviderType")]
    provider_type: String,
    #[serde(rename = "StoredVmQuota")]
    stored_vm_quota: i32,
    #[serde(rename = "DeployedVmQuota")]
    deployed_vm_quota: i32,
    #[serde(rename = "Role")]
    role: Reference,
    #[serde(rename = "Password", skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl UserBody {
    pub fn from_configuration(config: &OrgUserConfiguration, role: Reference) -> Self {
        Self {
            xmlns: XMLNS_VCLOUD.to_string(),
            name: config.name.clone(),
            description: config.description.clone(),
            full_name: config.full_name.clone(),
            email_address: config.email_address.clone(),
            telephone: config.telephone.clone(),
            is_enabled: config.is_enabled,
            is_locked: false,
            is_external: config.is_external,
            provider_type: config.provider().to_string(),
            stored_vm_quota: config.stored_vm_quota,
            deployed_vm_quota: config.deployed_vm_quota,
            role,
            password: config.password.clone(),
        }
    }

    fn from_user(user: &OrgUserType, password: Option<String>) -> Result<Self, ApiError> {
        let role = user.role.clone().ok_or_else(|| {
            ApiError::InvalidRequest(format!("user '{}' has no role", user.name))
        })?;
        Ok(Self {
            xmlns: XMLNS_VCLOUD.to_string(),
            name: user.name.clone(),
            description: user.description.clone(),
            full_name: user.full_name.clone(),
            email_address: user.email_address.clone(),
            telephone: user.telephone.clone(),
            is_enabled: user.is_enabled.unwrap_or(false),
            is_locked: user.is_locked.unwrap_or(false),
            is_external: user.is_external.unwrap_or(false),
            provider_type: user
                .provider_type
                .clone()
                .unwrap_or_else(|| PROVIDER_INTEGRATED.to_string()),
            stored_vm_quota: user.stored_vm_quota.unwrap_or(0),
            deployed_vm_quota: user.deployed_vm_quota.unwrap_or(0),
            role: Reference {
                id: None,
                ..role
            },
            password,
        })
    }
}

impl XmlBody for UserBody {
    fn xml_namespace(&self) -> &str {
        &self.xmlns
    }
}

#[derive(Clone)]
pub struct OrgUser {
    pub user: OrgUserType,
    client: Client,
}

impl fmt::Debug for OrgUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgUser").field("user", &self.user).finish()
    }
}

impl OrgUser {
    pub fn new(client: Client, user: OrgUserType) -> Self {
        Self { user, client }
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }

    pub fn href(&self) -> &str {
        &self.user.href
    }

    pub fn is_enabled(&self) -> bool {
        self.user.is_enabled.unwrap_or(false)
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        require_href(&self.user.href, "user")?;
        self.user = self.client.get_xml(&self.user.href).await?;
        Ok(())
    }

    async fn put_user(&mut self, body: &UserBody) -> Result<(), ApiError> {
        let href = require_href(&self.user.href, "user")?;
        self.user = self.client.put_xml(href, mime::ADMIN_USER, body).await?;
        Ok(())
    }

    /// Sends the current state of `self.user` to vCD
    pub async fn update(&mut self) -> Result<(), ApiError> {
        let body = UserBody::from_user(&self.user, None)?;
        self.put_user(&body).await
    }

    pub async fn enable(&mut self) -> Result<(), ApiError> {
        self.user.is_enabled = Some(true);
        self.update().await
    }

    pub async fn disable(&mut self) -> Result<(), ApiError> {
        self.user.is_enabled = Some(false);
        self.update().await
    }

    pub async fn change_password(&mut self, password: &str) -> Result<(), ApiError> {
        if password.is_empty() {
            return Err(ApiError::InvalidRequest("new password is empty".to_string()));
        }
        let body = UserBody::from_user(&self.user, Some(password.to_string()))?;
        self.put_user(&body).await
    }

    /// Deletes the user, disabling it first when needed
    pub async fn delete(mut self) -> Result<(), ApiError> {
        if self.is_enabled() {
            self.disable().await?;
        }
        tracing::info!("Deleting user {}", self.user.name);
        self.client
            .delete_no_content(require_href(&self.user.href, "user")?)
            .await
    }
}

impl Client {
    pub async fn get_user_by_href(&self, href: &str) -> Result<OrgUser, ApiError> {
        let user: OrgUserType = self.get_xml(href).await?;
        Ok(OrgUser::new(self.clone(), user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::{decode_xml, encode_xml};
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    fn user_xml(base: &str, enabled: bool) -> String {
        format!(
            r#"<User xmlns="http://www.vmware.com/vcloud/v1.5" href="{base}/api/admin/user/u1" name="alice" type="application/vnd.vmware.admin.user+xml">
    <FullName>Alice</FullName>
    <EmailAddress>alice@example.com</EmailAddress>
    <IsEnabled>{enabled}</IsEnabled>
    <IsLocked>false</IsLocked>
    <IsExternal>false</IsExternal>
    <ProviderType>INTEGRATED</ProviderType>
    <StoredVmQuota>0</StoredVmQuota>
    <DeployedVmQuota>0</DeployedVmQuota>
    <Role href="{base}/api/admin/role/r1" name="vApp Author" type="application/vnd.vmware.admin.role+xml"/>
</User>"#
        )
    }

    #[test]
    fn body_keeps_element_order() {
        let config = OrgUserConfiguration {
            full_name: Some("Bob".to_string()),
            description: Some("ops".to_string()),
            ..OrgUserConfiguration::new("bob", "Organization Administrator").with_password("s3cret")
        };
        let role = Reference::new("https://h/api/admin/role/r1");
        let xml = encode_xml(&UserBody::from_configuration(&config, role)).unwrap();
        let order = [
            "<Description>",
            "<FullName>",
            "<IsEnabled>true",
            "<IsLocked>",
            "<IsExternal>",
            "<ProviderType>INTEGRATED",
            "<StoredVmQuota>",
            "<DeployedVmQuota>",
            "<Role href=",
            "<Password>s3cret",
        ];
        let positions: Vec<usize> = order.iter().map(|tag| xml.find(tag).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", xml);
    }

    #[test]
    fn configuration_validation() {
        assert!(OrgUserConfiguration::new("a", "role").validate().is_err());
        assert!(OrgUserConfiguration::new("a", "role")
            .with_password("p")
            .validate()
            .is_ok());
        assert!(OrgUserConfiguration::new("", "role")
            .with_password("p")
            .validate()
            .is_err());
        let saml = OrgUserConfiguration {
            provider_type: Some(PROVIDER_SAML.to_string()),
            ..OrgUserConfiguration::new("a", "role")
        };
        assert!(saml.validate().is_ok());
        let ldap = OrgUserConfiguration {
            provider_type: Some("LDAP".to_string()),
            ..OrgUserConfiguration::new("a", "role")
        };
        assert!(ldap.validate().is_err());
    }

    #[tokio::test]
    async fn delete_disables_first() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let disable = server
            .mock("PUT", "/api/admin/user/u1")
            .match_header("content-type", "application/vnd.vmware.admin.user+xml")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("<IsEnabled>false</IsEnabled>".to_string()),
                Matcher::Regex(r#"<Role href="[^"]+/api/admin/role/r1""#.to_string()),
            ]))
            .with_status(200)
            .with_body(user_xml(&base, false))
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/admin/user/u1")
            .with_status(204)
            .create_async()
            .await;

        let user = OrgUser::new(
            create_test_client(&base),
            decode_xml(&user_xml(&base, true)).unwrap(),
        );
        assert!(user.is_enabled());
        assert_eq!(user.user.role.as_ref().unwrap().name_or_empty(), "vApp Author");
        user.delete().await.unwrap();
        disable.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn change_password_sends_password() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let put = server
            .mock("PUT", "/api/admin/user/u1")
            .match_body(Matcher::Regex("<Password>n3w</Password>".to_string()))
            .with_status(200)
            .with_body(user_xml(&base, true))
            .create_async()
            .await;

        let mut user = OrgUser::new(
            create_test_client(&base),
            decode_xml(&user_xml(&base, true)).unwrap(),
        );
        assert!(user.change_password("").await.is_err());
        user.change_password("n3w").await.unwrap();
        assert_eq!(user.user.email_address.as_deref(), Some("alice@example.com"));
        put.assert_async().await;
    }
}

//! Session login / logout against `/api/sessions`

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

use super::client::{AuthToken, HEADER_ACCESS_TOKEN, HEADER_VCLOUD_AUTHORIZATION};
use super::common::Link;
use super::error::ApiError;
use super::response::VcdResponseHandler;
use super::Client;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "Session")]
pub struct SessionInfo {
    #[serde(rename = "@href", default)]
    pub href: String,
    #[serde(rename = "@user", default)]
    pub user: String,
    #[serde(rename = "@org", default)]
    pub org: String,
    #[serde(rename = "@userId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "@roles", default)]
    pub roles: Option<String>,
    #[serde(rename = "Link", default)]
    pub links: Vec<Link>,
}

impl SessionInfo {
    pub fn is_sys_admin(&self) -> bool {
        self.org.eq_ignore_ascii_case("system")
    }
}

impl Client {
    /// Log in with `user@org` basic credentials and keep the returned token
    pub async fn authenticate(
        &self,
        user: &str,
        password: &str,
        org: &str,
    ) -> Result<SessionInfo, ApiError> {
        let url = self.href("/sessions");
        tracing::debug!("Authenticating {}@{} at {}", user, org, url);

        let response = self
            .http()
            .post(&url)
            .basic_auth(format!("{}@{}", user, org), Some(password))
            .header(ACCEPT, self.accept_header())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthError);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VcdResponseHandler::extract_error(status.as_u16(), &text));
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let token = match (header(HEADER_ACCESS_TOKEN), header(HEADER_VCLOUD_AUTHORIZATION)) {
            (Some(bearer), _) => AuthToken::Bearer(bearer),
            (None, Some(session)) => AuthToken::Session(session),
            (None, None) => {
                return Err(ApiError::ParseError(
                    "login response carried no authorization token".to_string(),
                ))
            }
        };

        let session: SessionInfo = VcdResponseHandler::extract_response(response).await?;
        self.set_auth(Some(token));
        self.set_sys_admin(session.is_sys_admin());
        tracing::debug!("Logged in as {} in org {}", session.user, session.org);

        Ok(session)
    }

    /// Fetch the current session, refreshing the sysadmin flag
    pub async fn refresh_session_info(&self) -> Result<SessionInfo, ApiError> {
        let session: SessionInfo = self.get_xml(&self.href("/session")).await?;
        self.set_sys_admin(session.is_sys_admin());
        Ok(session)
    }

    /// Use an existing `x-vcloud-authorization` session token
    pub fn set_token(&self, token: &str) {
        self.set_auth(Some(AuthToken::Session(token.to_string())));
    }

    /// Use an existing bearer access token
    pub fn set_bearer_token(&self, token: &str) {
        self.set_auth(Some(AuthToken::Bearer(token.to_string())));
    }

    /// Log out and forget the token
    pub async fn disconnect(&self) -> Result<(), ApiError> {
        if !self.is_authenticated() {
            return Ok(());
        }
        let result = self.delete_no_content(&self.href("/session")).await;
        self.set_auth(None);
        result
    }
}

use chrono::{DateTime, Utc};

use crate::models::nest::LoginResponse;

/// Login state for one account. Replaced wholesale on every login.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub transport_url: String,
    pub access_token: String,
    pub user_id: String,
    /// `transport_url + resource_path + user_id`
    pub resource_endpoint: String,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn from_login(login: LoginResponse, resource_path: &str) -> Self {
        let LoginResponse {
            urls,
            access_token,
            userid,
        } = login;
        let resource_endpoint = format!("{}{}{}", urls.transport_url, resource_path, userid);
        Session {
            transport_url: urls.transport_url,
            access_token,
            user_id: userid,
            resource_endpoint,
            established_at: Utc::now(),
        }
    }

    /// Headers sent with state reads and commands.
    pub fn auth_headers(&self, user_agent: &str) -> Vec<(String, String)> {
        vec![
            ("user-agent".to_string(), user_agent.to_string()),
            ("Authorization".to_string(), format!("Basic {}", self.access_token)),
            ("X-nl-user-id".to_string(), self.user_id.clone()),
            ("X-nl-protocol-version".to_string(), "1".to_string()),
        ]
    }
}

use tracing::{debug, warn};

use crate::error::Result;
use crate::resources::cognito::{
    AccountRecoverySetting, AdminCreateUserConfig, PasswordPolicy, RecoveryOption,
    UserPoolClientProperties, UserPoolDomainProperties, UserPoolGroupProperties, UserPoolPolicies,
    UserPoolProperties,
};
use crate::resources::{Resource, ResourceKind};
use crate::template::{Expr, Output, Template};

pub const USER_POOL_ID: &str = "NovaMuseUserPool";
pub const ADMINS_GROUP_ID: &str = "NovaMuseAdminsGroup";
pub const CLIENT_ID: &str = "NovaMuseUserPoolClient";
pub const DOMAIN_ID: &str = "NovaMuseUserPoolDomain";
pub const LOGIN_URL_OUTPUT: &str = "LoginUrl";

pub const ADMINS_GROUP: &str = "admins";
pub const DOMAIN_PREFIX: &str = "novamuse-auth";
pub const REDIRECT_URI: &str = "https://novamusequotes.c3devs.com/callback";
pub const OAUTH_SCOPES: [&str; 3] = ["email", "openid", "profile"];
pub const MIN_PASSWORD_LENGTH: u32 = 12;

#[derive(Debug, Clone)]
pub struct Identity {
    user_pool_id: String,
    client_id: String,
}

impl Identity {
    pub fn user_pool_arn(&self) -> Expr {
        Expr::get_att(&self.user_pool_id, "Arn")
    }

    pub fn client(&self) -> Expr {
        Expr::reference(&self.client_id)
    }
}

pub fn user_pool_properties() -> UserPoolProperties {
    UserPoolProperties::builder()
        .user_pool_name("NovaMuseUsers")
        .username_attributes(vec!["email".to_string()])
        .auto_verified_attributes(vec!["email".to_string()])
        .policies(UserPoolPolicies {
            password_policy: PasswordPolicy {
                minimum_length: MIN_PASSWORD_LENGTH,
                require_lowercase: true,
                require_numbers: true,
                require_symbols: true,
                require_uppercase: true,
            },
        })
        .account_recovery_setting(AccountRecoverySetting {
            recovery_mechanisms: vec![RecoveryOption {
                name: "verified_email".to_string(),
                priority: 1,
            }],
        })
        // Invitation only: users are created by an administrator
        .admin_create_user_config(AdminCreateUserConfig {
            allow_admin_create_user_only: true,
        })
        .build()
}

/// Hosted UI sign-in URL for the app client.
pub fn login_url(client: Expr) -> Expr {
    Expr::join(
        "",
        vec![
            Expr::literal(format!("https://{DOMAIN_PREFIX}.auth.")),
            Expr::region(),
            Expr::literal(".amazoncognito.com/login?client_id="),
            client,
            Expr::literal(format!("&response_type=code&redirect_uri={REDIRECT_URI}")),
        ],
    )
}

pub fn declare(template: &mut Template) -> Result<Identity> {
    let user_pool = Expr::reference(USER_POOL_ID);

    template.add(
        USER_POOL_ID,
        Resource::new(ResourceKind::UserPool(user_pool_properties())).retained(),
    )?;

    template.add(
        ADMINS_GROUP_ID,
        Resource::new(ResourceKind::UserPoolGroup(UserPoolGroupProperties {
            group_name: ADMINS_GROUP.to_string(),
            user_pool_id: user_pool.clone(),
            description: Some("NovaMuse administrators".to_string()),
        })),
    )?;
    warn!(
        "User pool group '{}' is not bound to any API permission; every signed-in user is authorized alike",
        ADMINS_GROUP
    );

    let client = UserPoolClientProperties::builder()
        .user_pool_id(user_pool.clone())
        .client_name("NovaMuseWebClient")
        .allowed_oauth_flows(vec!["code".to_string()])
        .allowed_oauth_flows_user_pool_client(true)
        .allowed_oauth_scopes(OAUTH_SCOPES.iter().map(|s| s.to_string()).collect())
        .callback_urls(vec![REDIRECT_URI.to_string()])
        .supported_identity_providers(vec!["COGNITO".to_string()])
        .build();
    template.add(CLIENT_ID, Resource::new(ResourceKind::UserPoolClient(client)))?;

    template.add(
        DOMAIN_ID,
        Resource::new(ResourceKind::UserPoolDomain(UserPoolDomainProperties {
            domain: DOMAIN_PREFIX.to_string(),
            user_pool_id: user_pool,
        })),
    )?;

    template.add_output(
        LOGIN_URL_OUTPUT,
        Output::new(login_url(Expr::reference(CLIENT_ID))).described("Hosted UI login URL"),
    )?;

    debug!("Declared user pool {} with hosted domain {}", USER_POOL_ID, DOMAIN_PREFIX);

    Ok(Identity {
        user_pool_id: USER_POOL_ID.to_string(),
        client_id: CLIENT_ID.to_string(),
    })
}

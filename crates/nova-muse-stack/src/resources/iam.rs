use serde::Serialize;

use crate::template::Expr;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServicePrincipal {
    #[serde(rename = "Service")]
    pub service: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: Vec<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<ServicePrincipal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Expr>,
}

impl PolicyStatement {
    pub fn allow<A: Into<String>>(actions: impl IntoIterator<Item = A>, resources: Vec<Expr>) -> Self {
        Self {
            action: actions.into_iter().map(Into::into).collect(),
            effect: Effect::Allow,
            principal: None,
            resource: resources,
        }
    }

    pub fn assume_role(service: impl Into<String>) -> Self {
        Self {
            action: vec!["sts:AssumeRole".to_string()],
            effect: Effect::Allow,
            principal: Some(ServicePrincipal {
                service: service.into(),
            }),
            resource: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub statement: Vec<PolicyStatement>,
    pub version: String,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            statement,
            version: POLICY_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_document: PolicyDocument,
    pub policy_name: String,
    pub roles: Vec<Expr>,
}

/// ARN of an AWS-managed policy, e.g. `service-role/AWSLambdaBasicExecutionRole`.
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::join(
        "",
        vec![
            Expr::literal("arn:"),
            Expr::partition(),
            Expr::literal(format!(":iam::aws:policy/{name}")),
        ],
    )
}

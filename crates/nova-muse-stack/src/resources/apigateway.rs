use std::collections::BTreeMap;

use bon::Builder;
use serde::Serialize;

use crate::template::Expr;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RestApiProperties {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResourceProperties {
    pub parent_id: Expr,
    pub path_part: String,
    pub rest_api_id: Expr,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum AuthorizationType {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "COGNITO_USER_POOLS")]
    CognitoUserPools,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum IntegrationType {
    #[serde(rename = "AWS_PROXY")]
    AwsProxy,
    #[serde(rename = "MOCK")]
    Mock,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct IntegrationResponse {
    pub status_code: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_parameters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_templates: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Integration {
    #[serde(rename = "Type")]
    pub integration_type: IntegrationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<Expr>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub request_templates: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integration_responses: Vec<IntegrationResponse>,
}

impl Integration {
    /// Lambda proxy integration; API Gateway always invokes lambdas with POST.
    pub fn lambda_proxy(function_arn: Expr) -> Self {
        Self {
            integration_type: IntegrationType::AwsProxy,
            integration_http_method: Some("POST".to_string()),
            uri: Some(Expr::join(
                "",
                vec![
                    Expr::literal("arn:"),
                    Expr::partition(),
                    Expr::literal(":apigateway:"),
                    Expr::region(),
                    Expr::literal(":lambda:path/2015-03-31/functions/"),
                    function_arn,
                    Expr::literal("/invocations"),
                ],
            )),
            request_templates: BTreeMap::new(),
            integration_responses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MethodResponse {
    pub status_code: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub response_parameters: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Builder)]
#[serde(rename_all = "PascalCase")]
pub struct MethodProperties {
    #[builder(into)]
    pub http_method: String,
    pub resource_id: Expr,
    pub rest_api_id: Expr,
    pub authorization_type: AuthorizationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer_id: Option<Expr>,
    pub integration: Integration,
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub method_responses: Vec<MethodResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorizerProperties {
    pub name: String,
    #[serde(rename = "Type")]
    pub authorizer_type: String,
    pub identity_source: String,
    #[serde(rename = "ProviderARNs")]
    pub provider_arns: Vec<Expr>,
    pub rest_api_id: Expr,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentProperties {
    pub rest_api_id: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StageProperties {
    pub rest_api_id: Expr,
    pub deployment_id: Expr,
    pub stage_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointConfiguration {
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DomainNameProperties {
    pub domain_name: String,
    pub endpoint_configuration: EndpointConfiguration,
    pub regional_certificate_arn: String,
    pub security_policy: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct BasePathMappingProperties {
    pub domain_name: Expr,
    pub rest_api_id: Expr,
    pub stage: Expr,
}

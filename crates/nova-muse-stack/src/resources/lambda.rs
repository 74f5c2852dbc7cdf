use std::collections::BTreeMap;

use bon::Builder;
use serde::Serialize;

use crate::template::Expr;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Runtime {
    #[serde(rename = "python3.11")]
    Python311,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Code {
    pub s3_bucket: Expr,
    pub s3_key: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    pub variables: BTreeMap<String, Expr>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Builder)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties {
    pub code: Code,
    #[builder(into)]
    pub handler: String,
    pub runtime: Runtime,
    pub role: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionProperties {
    pub action: String,
    pub function_name: Expr,
    pub principal: String,
    pub source_arn: Expr,
}

use serde::Serialize;

use crate::template::Expr;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: Expr,
    #[serde(rename = "HostedZoneId")]
    pub hosted_zone_id: Expr,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RecordSetProperties {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    /// Zone resolved by name when the stack is deployed.
    pub hosted_zone_name: String,
    pub alias_target: AliasTarget,
}

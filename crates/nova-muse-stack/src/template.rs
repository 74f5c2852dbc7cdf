use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, SynthError};
use crate::resources::Resource;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// A CloudFormation value: either a literal string or an intrinsic function
/// that the provisioning engine resolves at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Ref(String),
    GetAtt(String, String),
    Join(String, Vec<Expr>),
    Sub(String),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt(logical_id.into(), attribute.into())
    }

    pub fn join(separator: impl Into<String>, parts: Vec<Expr>) -> Self {
        Self::Join(separator.into(), parts)
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    pub fn partition() -> Self {
        Self::reference("AWS::Partition")
    }

    pub fn region() -> Self {
        Self::reference("AWS::Region")
    }

    pub fn account_id() -> Self {
        Self::reference("AWS::AccountId")
    }

    pub fn url_suffix() -> Self {
        Self::reference("AWS::URLSuffix")
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Logical id targeted by a `Ref`, if this is one.
    pub fn ref_target(&self) -> Option<&str> {
        match self {
            Self::Ref(target) => Some(target),
            _ => None,
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::Ref(target) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", target)?;
                map.end()
            }
            Self::GetAtt(target, attribute) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[target, attribute])?;
                map.end()
            }
            Self::Join(separator, parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &(separator, parts))?;
                map.end()
            }
            Self::Sub(template) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Sub", template)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Expr,
}

impl Output {
    pub fn new(value: Expr) -> Self {
        Self {
            description: None,
            value,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: Some(description.into()),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<()> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) || self.outputs.contains_key(&logical_id) {
            return Err(SynthError::DuplicateLogicalId(logical_id));
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> Result<()> {
        let name = name.into();
        if self.resources.contains_key(&name) || self.outputs.contains_key(&name) {
            return Err(SynthError::DuplicateLogicalId(name));
        }
        self.outputs.insert(name, output);
        Ok(())
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn resources_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = (&'a str, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, resource)| resource.type_name() == type_name)
            .map(|(id, resource)| (id.as_str(), resource))
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Checks that every `Ref`, `Fn::GetAtt`, `Fn::Sub` variable and
    /// `DependsOn` entry points at a declared resource.
    pub fn validate(&self) -> Result<()> {
        let declared: BTreeSet<&str> = self.resources.keys().map(String::as_str).collect();

        for (logical_id, resource) in &self.resources {
            for target in &resource.depends_on {
                if !declared.contains(target.as_str()) {
                    return Err(SynthError::DanglingReference {
                        from: logical_id.clone(),
                        target: target.clone(),
                    });
                }
            }

            let mut targets = Vec::new();
            collect_references(&serde_json::to_value(resource)?, &mut targets);
            if let Some(target) = targets.into_iter().find(|t| !declared.contains(t.as_str())) {
                return Err(SynthError::DanglingReference {
                    from: logical_id.clone(),
                    target,
                });
            }
        }

        for (name, output) in &self.outputs {
            let mut targets = Vec::new();
            collect_references(&serde_json::to_value(output)?, &mut targets);
            if let Some(target) = targets.into_iter().find(|t| !declared.contains(t.as_str())) {
                return Err(SynthError::DanglingReference {
                    from: name.clone(),
                    target,
                });
            }
        }

        Ok(())
    }
}

// Pseudo parameters are never declared resources.
fn collect_references(value: &Value, targets: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    targets.push(target.clone());
                }
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = parts.first() {
                    targets.push(target.clone());
                }
            }
            if let Some(Value::String(body)) = map.get("Fn::Sub") {
                targets.extend(sub_variables(body));
            }
            for nested in map.values() {
                collect_references(nested, targets);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, targets);
            }
        }
        _ => {}
    }
}

fn sub_variables(body: &str) -> Vec<String> {
    let mut variables = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        // `${!Literal}` is an escape, not a variable.
        if !name.starts_with('!') && !name.starts_with("AWS::") {
            let target = name.split('.').next().unwrap_or(name);
            variables.push(target.to_string());
        }
        rest = &after[end + 1..];
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::apigateway::RestApiProperties;
    use crate::resources::ResourceKind;
    use serde_json::json;

    fn rest_api() -> Resource {
        Resource::new(ResourceKind::RestApi(RestApiProperties {
            name: "api".to_string(),
            description: None,
        }))
    }

    #[test]
    fn test_intrinsic_serialization() {
        let value = serde_json::to_value(Expr::join(
            "",
            vec![
                Expr::literal("arn:"),
                Expr::partition(),
                Expr::get_att("Table", "Arn"),
                Expr::sub("${AWS::Region}"),
            ],
        ))
        .unwrap();

        assert_eq!(
            value,
            json!({"Fn::Join": ["", [
                "arn:",
                {"Ref": "AWS::Partition"},
                {"Fn::GetAtt": ["Table", "Arn"]},
                {"Fn::Sub": "${AWS::Region}"}
            ]]})
        );
    }

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut template = Template::new("test");
        template.add("Api", rest_api()).unwrap();

        let err = template.add("Api", rest_api()).unwrap_err();
        assert!(matches!(err, SynthError::DuplicateLogicalId(id) if id == "Api"));
    }

    #[test]
    fn test_validate_rejects_dangling_ref() {
        let mut template = Template::new("test");
        template.add("Api", rest_api()).unwrap();
        template
            .add_output("Endpoint", Output::new(Expr::reference("Missing")))
            .unwrap();

        let err = template.validate().unwrap_err();
        assert!(matches!(
            err,
            SynthError::DanglingReference { ref from, ref target } if from == "Endpoint" && target == "Missing"
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_depends_on() {
        let mut template = Template::new("test");
        template
            .add("Api", rest_api().depends_on(["Ghost"]))
            .unwrap();

        assert!(template.validate().is_err());
    }

    #[test]
    fn test_validate_ignores_pseudo_parameters() {
        let mut template = Template::new("test");
        template.add("Api", rest_api()).unwrap();
        template
            .add_output(
                "Url",
                Output::new(Expr::join(
                    "",
                    vec![Expr::reference("Api"), Expr::region(), Expr::url_suffix()],
                )),
            )
            .unwrap();

        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_sub_variables() {
        assert_eq!(
            sub_variables("cdk-${AWS::AccountId}-${Bucket.Arn}-${!Escaped}-${Other}"),
            vec!["Bucket".to_string(), "Other".to_string()]
        );
    }

    #[test]
    fn test_template_header() {
        let json = Template::new("quotes").to_json().unwrap();
        assert_eq!(json["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(json["Description"], "quotes");
        assert!(json.get("Outputs").is_none());
    }
}

//! Typed CloudFormation resource properties, one submodule per service.

pub mod apigateway;
pub mod cognito;
pub mod dynamodb;
pub mod iam;
pub mod lambda;
pub mod route53;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Properties of every resource type the stack declares. Serializes as the
/// bare `Properties` object; the type name is written by [`Resource`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceKind {
    Table(dynamodb::TableProperties),
    Role(iam::RoleProperties),
    Policy(iam::PolicyProperties),
    Function(lambda::FunctionProperties),
    Permission(lambda::PermissionProperties),
    UserPool(cognito::UserPoolProperties),
    UserPoolGroup(cognito::UserPoolGroupProperties),
    UserPoolClient(cognito::UserPoolClientProperties),
    UserPoolDomain(cognito::UserPoolDomainProperties),
    RestApi(apigateway::RestApiProperties),
    ApiResource(apigateway::ApiResourceProperties),
    Method(apigateway::MethodProperties),
    Authorizer(apigateway::AuthorizerProperties),
    Deployment(apigateway::DeploymentProperties),
    Stage(apigateway::StageProperties),
    DomainName(apigateway::DomainNameProperties),
    BasePathMapping(apigateway::BasePathMappingProperties),
    RecordSet(route53::RecordSetProperties),
}

impl ResourceKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Table(_) => "AWS::DynamoDB::Table",
            Self::Role(_) => "AWS::IAM::Role",
            Self::Policy(_) => "AWS::IAM::Policy",
            Self::Function(_) => "AWS::Lambda::Function",
            Self::Permission(_) => "AWS::Lambda::Permission",
            Self::UserPool(_) => "AWS::Cognito::UserPool",
            Self::UserPoolGroup(_) => "AWS::Cognito::UserPoolGroup",
            Self::UserPoolClient(_) => "AWS::Cognito::UserPoolClient",
            Self::UserPoolDomain(_) => "AWS::Cognito::UserPoolDomain",
            Self::RestApi(_) => "AWS::ApiGateway::RestApi",
            Self::ApiResource(_) => "AWS::ApiGateway::Resource",
            Self::Method(_) => "AWS::ApiGateway::Method",
            Self::Authorizer(_) => "AWS::ApiGateway::Authorizer",
            Self::Deployment(_) => "AWS::ApiGateway::Deployment",
            Self::Stage(_) => "AWS::ApiGateway::Stage",
            Self::DomainName(_) => "AWS::ApiGateway::DomainName",
            Self::BasePathMapping(_) => "AWS::ApiGateway::BasePathMapping",
            Self::RecordSet(_) => "AWS::Route53::RecordSet",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub kind: ResourceKind,
    pub depends_on: Vec<String>,
    /// Keep the physical resource when the stack is deleted or the
    /// resource is replaced.
    pub retain: bool,
}

impl Resource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            depends_on: Vec::new(),
            retain: false,
        }
    }

    pub fn depends_on<I, S>(mut self, logical_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(logical_ids.into_iter().map(Into::into));
        self.depends_on.sort();
        self.depends_on.dedup();
        self
    }

    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("Type", self.type_name())?;
        map.serialize_entry("Properties", &self.kind)?;
        if !self.depends_on.is_empty() {
            map.serialize_entry("DependsOn", &self.depends_on)?;
        }
        if self.retain {
            map.serialize_entry("UpdateReplacePolicy", "Retain")?;
            map.serialize_entry("DeletionPolicy", "Retain")?;
        }
        map.end()
    }
}

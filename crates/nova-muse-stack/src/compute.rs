use std::collections::BTreeMap;

use tracing::debug;

use crate::asset::CodeAsset;
use crate::error::Result;
use crate::resources::iam::{managed_policy_arn, PolicyDocument, PolicyProperties, PolicyStatement, RoleProperties};
use crate::resources::lambda::{Environment, FunctionProperties, Runtime};
use crate::resources::{Resource, ResourceKind};
use crate::storage::{QuotesTable, TableAccess};
use crate::template::{Expr, Template};

/// The one variable the handler code reads to find its table.
pub const TABLE_ENV_VAR: &str = "QUOTES_TABLE";
pub const RUNTIME: Runtime = Runtime::Python311;

const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    ReadOne,
    Create,
    Browse,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 3] = [Self::ReadOne, Self::Create, Self::Browse];

    pub fn logical_id(self) -> &'static str {
        match self {
            Self::ReadOne => "QuotesLambda",
            Self::Create => "CreateQuotesLambda",
            Self::Browse => "BrowseQuotesLambda",
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            Self::ReadOne => "quotes_handler.lambda_handler",
            Self::Create => "createquotes_handler.lambda_handler",
            Self::Browse => "browsequotes_handler.lambda_handler",
        }
    }

    /// Only the create handler may write.
    pub fn access(self) -> TableAccess {
        match self {
            Self::Create => TableAccess::ReadWrite,
            Self::ReadOne | Self::Browse => TableAccess::Read,
        }
    }

    pub fn role_id(self) -> String {
        format!("{}ServiceRole", self.logical_id())
    }

    pub fn policy_id(self) -> String {
        format!("{}ServiceRoleDefaultPolicy", self.logical_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub kind: HandlerKind,
    pub function_id: String,
}

impl Handler {
    pub fn function_arn(&self) -> Expr {
        Expr::get_att(&self.function_id, "Arn")
    }
}

#[derive(Debug, Clone)]
pub struct Handlers {
    pub read_one: Handler,
    pub create: Handler,
    pub browse: Handler,
}

impl Handlers {
    pub fn get(&self, kind: HandlerKind) -> &Handler {
        match kind {
            HandlerKind::ReadOne => &self.read_one,
            HandlerKind::Create => &self.create,
            HandlerKind::Browse => &self.browse,
        }
    }
}

pub fn declare(template: &mut Template, table: &QuotesTable, asset: &CodeAsset) -> Result<Handlers> {
    Ok(Handlers {
        read_one: declare_handler(template, HandlerKind::ReadOne, table, asset)?,
        create: declare_handler(template, HandlerKind::Create, table, asset)?,
        browse: declare_handler(template, HandlerKind::Browse, table, asset)?,
    })
}

fn declare_handler(
    template: &mut Template,
    kind: HandlerKind,
    table: &QuotesTable,
    asset: &CodeAsset,
) -> Result<Handler> {
    let function_id = kind.logical_id();
    let role_id = kind.role_id();
    let policy_id = kind.policy_id();

    template.add(
        &role_id,
        Resource::new(ResourceKind::Role(RoleProperties {
            assume_role_policy_document: PolicyDocument::new(vec![PolicyStatement::assume_role(
                "lambda.amazonaws.com",
            )]),
            managed_policy_arns: vec![managed_policy_arn(BASIC_EXECUTION_POLICY)],
        })),
    )?;

    template.add(
        &policy_id,
        Resource::new(ResourceKind::Policy(PolicyProperties {
            policy_document: PolicyDocument::new(vec![table.grant(kind.access())]),
            policy_name: policy_id.clone(),
            roles: vec![Expr::reference(&role_id)],
        })),
    )?;

    let mut variables = BTreeMap::new();
    variables.insert(TABLE_ENV_VAR.to_string(), table.table_name());

    let function = FunctionProperties::builder()
        .code(asset.code())
        .handler(kind.entry_point())
        .runtime(RUNTIME)
        .role(Expr::get_att(&role_id, "Arn"))
        .environment(Environment { variables })
        .build();

    // The role must carry its table grant before the function can start
    template.add(
        function_id,
        Resource::new(ResourceKind::Function(function)).depends_on([policy_id, role_id]),
    )?;

    debug!(
        "Declared handler {} ({}) with {:?} access",
        function_id,
        kind.entry_point(),
        kind.access()
    );

    Ok(Handler {
        kind,
        function_id: function_id.to_string(),
    })
}

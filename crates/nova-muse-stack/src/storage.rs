use tracing::debug;

use crate::error::Result;
use crate::resources::dynamodb::{
    AttributeDefinition, AttributeType, BillingMode, GlobalSecondaryIndex, KeySchemaElement,
    KeyType, Projection, ProjectionType, TableProperties,
};
use crate::resources::iam::PolicyStatement;
use crate::resources::{Resource, ResourceKind};
use crate::template::{Expr, Template};

pub const TABLE_LOGICAL_ID: &str = "QuotesTable";

// Handlers address the table and its indexes by these exact names.
pub const TABLE_NAME: &str = "NovaMuseQuotes";
pub const GENRE_INDEX: &str = "GSI1-Genre";
pub const AUTHOR_INDEX: &str = "GSI2-Author";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub partition: &'static str,
    pub sort: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub key: KeyPair,
}

pub const PRIMARY_KEY: KeyPair = KeyPair {
    partition: "PK",
    sort: "SK",
};

pub const SECONDARY_INDEXES: [IndexSpec; 2] = [
    IndexSpec {
        name: GENRE_INDEX,
        key: KeyPair {
            partition: "GSI1PK",
            sort: "GSI1SK",
        },
    },
    IndexSpec {
        name: AUTHOR_INDEX,
        key: KeyPair {
            partition: "GSI2PK",
            sort: "GSI2SK",
        },
    },
];

const READ_ACTIONS: [&str; 8] = [
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
];

const WRITE_ACTIONS: [&str; 5] = [
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

/// Data-plane access a principal is granted on the quotes table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAccess {
    Read,
    ReadWrite,
}

impl TableAccess {
    pub fn actions(self) -> Vec<&'static str> {
        let mut actions = READ_ACTIONS.to_vec();
        if self == Self::ReadWrite {
            for action in WRITE_ACTIONS {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        actions
    }
}

/// Handle to the declared table, used to wire grants and environment.
#[derive(Debug, Clone)]
pub struct QuotesTable {
    logical_id: String,
}

impl QuotesTable {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Physical table name as resolved at deploy time.
    pub fn table_name(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    pub fn table_arn(&self) -> Expr {
        Expr::get_att(&self.logical_id, "Arn")
    }

    /// Statement granting `access` on the table and all of its indexes.
    pub fn grant(&self, access: TableAccess) -> PolicyStatement {
        PolicyStatement::allow(
            access.actions(),
            vec![
                self.table_arn(),
                Expr::join("", vec![self.table_arn(), Expr::literal("/index/*")]),
            ],
        )
    }
}

fn key_schema(key: &KeyPair) -> Vec<KeySchemaElement> {
    vec![
        KeySchemaElement {
            attribute_name: key.partition.to_string(),
            key_type: KeyType::Hash,
        },
        KeySchemaElement {
            attribute_name: key.sort.to_string(),
            key_type: KeyType::Range,
        },
    ]
}

fn define_attributes(key: &KeyPair, definitions: &mut Vec<AttributeDefinition>) {
    for name in [key.partition, key.sort] {
        if !definitions.iter().any(|d| d.attribute_name == name) {
            definitions.push(AttributeDefinition {
                attribute_name: name.to_string(),
                attribute_type: AttributeType::String,
            });
        }
    }
}

pub fn table_properties() -> TableProperties {
    let mut attribute_definitions = Vec::new();
    define_attributes(&PRIMARY_KEY, &mut attribute_definitions);

    let global_secondary_indexes = SECONDARY_INDEXES
        .iter()
        .map(|index| {
            define_attributes(&index.key, &mut attribute_definitions);
            GlobalSecondaryIndex {
                index_name: index.name.to_string(),
                key_schema: key_schema(&index.key),
                projection: Projection {
                    projection_type: ProjectionType::All,
                },
            }
        })
        .collect();

    TableProperties {
        table_name: TABLE_NAME.to_string(),
        key_schema: key_schema(&PRIMARY_KEY),
        attribute_definitions,
        billing_mode: BillingMode::PayPerRequest,
        global_secondary_indexes,
    }
}

pub fn declare(template: &mut Template) -> Result<QuotesTable> {
    let properties = table_properties();
    debug!(
        "Declaring table {} with {} secondary indexes",
        properties.table_name,
        properties.global_secondary_indexes.len()
    );

    template.add(
        TABLE_LOGICAL_ID,
        Resource::new(ResourceKind::Table(properties)).retained(),
    )?;

    Ok(QuotesTable {
        logical_id: TABLE_LOGICAL_ID.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_definitions_are_unique() {
        let properties = table_properties();
        let names: Vec<&str> = properties
            .attribute_definitions
            .iter()
            .map(|d| d.attribute_name.as_str())
            .collect();

        assert_eq!(names, ["PK", "SK", "GSI1PK", "GSI1SK", "GSI2PK", "GSI2SK"]);
    }

    #[test]
    fn test_read_actions_exclude_writes() {
        let actions = TableAccess::Read.actions();
        assert!(actions.contains(&"dynamodb:Query"));
        assert!(!actions.contains(&"dynamodb:PutItem"));
    }

    #[test]
    fn test_read_write_is_superset_without_duplicates() {
        let read = TableAccess::Read.actions();
        let read_write = TableAccess::ReadWrite.actions();

        assert!(read.iter().all(|action| read_write.contains(action)));
        assert!(read_write.contains(&"dynamodb:PutItem"));
        assert_eq!(
            read_write
                .iter()
                .filter(|a| **a == "dynamodb:DescribeTable")
                .count(),
            1
        );
        assert_eq!(read_write.len(), 12);
    }

    #[test]
    fn test_grant_covers_indexes() {
        let mut template = Template::new("test");
        let table = declare(&mut template).unwrap();
        let statement = table.grant(TableAccess::Read);

        assert_eq!(statement.resource.len(), 2);
        assert_eq!(statement.resource[0], Expr::get_att(TABLE_LOGICAL_ID, "Arn"));
        let json = serde_json::to_value(&statement.resource[1]).unwrap();
        assert_eq!(json["Fn::Join"][1][1], "/index/*");
    }

    #[test]
    fn test_table_is_retained() {
        let mut template = Template::new("test");
        declare(&mut template).unwrap();

        let json = template.to_json().unwrap();
        assert_eq!(json["Resources"]["QuotesTable"]["DeletionPolicy"], "Retain");
        assert_eq!(json["Resources"]["QuotesTable"]["UpdateReplacePolicy"], "Retain");
    }
}

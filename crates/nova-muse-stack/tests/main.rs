use std::collections::HashMap;
use std::fs;

use nova_muse_stack::api::{self, CORS};
use nova_muse_stack::resources::ResourceKind;
use nova_muse_stack::{assembly, identity, storage};
use nova_muse_stack::{NovaMuseStack, Revision, StackEnv, StackProps, SynthError};
use serde_json::{json, Value};
use tempfile::TempDir;

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-east-1";
const CERTIFICATE: &str = "arn:aws:acm:us-east-1:123456789012:certificate/0f3c1c7e";

fn bundle() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in [
        "quotes_handler.py",
        "createquotes_handler.py",
        "browsequotes_handler.py",
    ] {
        fs::write(dir.path().join(name), format!("# {name}\n")).unwrap();
    }
    dir
}

fn synth_with(revision: Revision, env: StackEnv) -> Result<NovaMuseStack, SynthError> {
    let dir = bundle();
    NovaMuseStack::synth(
        StackProps::builder()
            .env(env)
            .revision(revision)
            .bundle_dir(dir.path())
            .build(),
    )
}

fn synth(revision: Revision) -> NovaMuseStack {
    synth_with(
        revision,
        StackEnv::new(ACCOUNT, REGION).with_certificate(CERTIFICATE),
    )
    .unwrap()
}

fn template_json(stack: &NovaMuseStack) -> Value {
    stack.template.to_json().unwrap()
}

fn resources_of_type<'a>(template: &'a Value, type_name: &str) -> Vec<(&'a String, &'a Value)> {
    template["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .filter(|(_, resource)| resource["Type"] == type_name)
        .collect()
}

#[test]
fn test_base_revision_from_environment() {
    let vars: HashMap<&str, &str> = [("AWS_ACCOUNT_ID", ACCOUNT), ("AWS_REGION", REGION)].into();
    let env = StackEnv::from_lookup(Revision::Base, |key| vars.get(key).map(|v| v.to_string())).unwrap();

    let stack = synth_with(Revision::Base, env).unwrap();
    let template = template_json(&stack);

    let tables = resources_of_type(&template, "AWS::DynamoDB::Table");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].1["Properties"]["TableName"], "NovaMuseQuotes");
}

#[test]
fn test_table_schema() {
    let template = template_json(&synth(Revision::Base));
    let tables = resources_of_type(&template, "AWS::DynamoDB::Table");
    let properties = &tables[0].1["Properties"];

    assert_eq!(properties["BillingMode"], "PAY_PER_REQUEST");
    assert_eq!(
        properties["KeySchema"],
        json!([
            {"AttributeName": "PK", "KeyType": "HASH"},
            {"AttributeName": "SK", "KeyType": "RANGE"}
        ])
    );

    let indexes = properties["GlobalSecondaryIndexes"].as_array().unwrap();
    let names: Vec<&str> = indexes
        .iter()
        .map(|index| index["IndexName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["GSI1-Genre", "GSI2-Author"]);
    assert_eq!(indexes[0]["KeySchema"][0]["AttributeName"], "GSI1PK");
    assert_eq!(indexes[1]["KeySchema"][1]["AttributeName"], "GSI2SK");
    assert!(properties["AttributeDefinitions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|definition| definition["AttributeType"] == "S"));
}

#[test]
fn test_synthesis_requires_account_and_region() {
    for vars in [
        vec![("AWS_REGION", REGION)],
        vec![("AWS_ACCOUNT_ID", ACCOUNT)],
        vec![],
    ] {
        let vars: HashMap<&str, &str> = vars.into_iter().collect();
        let result = StackEnv::from_lookup(Revision::Base, |key| vars.get(key).map(|v| v.to_string()));
        assert!(matches!(result, Err(SynthError::MissingAccountOrRegion)));
    }
}

#[test]
fn test_custom_domain_requires_certificate() {
    let vars: HashMap<&str, &str> = [("AWS_ACCOUNT_ID", ACCOUNT), ("AWS_REGION", REGION)].into();
    let result = StackEnv::from_lookup(Revision::CustomDomain, |key| {
        vars.get(key).map(|v| v.to_string())
    });
    assert!(matches!(result, Err(SynthError::MissingCertificateArn)));

    // An env built by hand is checked again at synthesis
    let result = synth_with(Revision::CustomDomain, StackEnv::new(ACCOUNT, REGION));
    assert!(matches!(result, Err(SynthError::MissingCertificateArn)));
}

#[test]
fn test_hand_built_env_without_account_or_region_fails_synthesis() {
    let result = synth_with(Revision::Base, StackEnv::new("", REGION));
    assert!(matches!(result, Err(SynthError::MissingAccountOrRegion)));

    let result = synth_with(Revision::Base, StackEnv::new(ACCOUNT, "  "));
    assert!(matches!(result, Err(SynthError::MissingAccountOrRegion)));
}

#[test]
fn test_missing_bundle_fails_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let result = NovaMuseStack::synth(
        StackProps::builder()
            .env(StackEnv::new(ACCOUNT, REGION))
            .revision(Revision::Base)
            .bundle_dir(dir.path().join("lambda"))
            .build(),
    );
    assert!(matches!(result, Err(SynthError::MissingBundle { .. })));
}

#[test]
fn test_route_table() {
    let stack = synth(Revision::Base);
    let routes: Vec<(String, String, Option<String>, Option<String>)> = api::routes_in(&stack.template)
        .into_iter()
        .map(|route| (route.method, route.path, route.authorizer, route.target))
        .collect();

    assert_eq!(
        routes,
        vec![
            (
                "GET".to_string(),
                "/quote".to_string(),
                None,
                Some("QuotesLambda".to_string())
            ),
            (
                "POST".to_string(),
                "/quote".to_string(),
                Some(api::AUTHORIZER_ID.to_string()),
                Some("CreateQuotesLambda".to_string())
            ),
            (
                "GET".to_string(),
                "/quote/browse".to_string(),
                None,
                Some("BrowseQuotesLambda".to_string())
            ),
        ]
    );
}

#[test]
fn test_authorizer_uses_user_pool() {
    let template = template_json(&synth(Revision::Base));
    let authorizers = resources_of_type(&template, "AWS::ApiGateway::Authorizer");

    assert_eq!(authorizers.len(), 1);
    let properties = &authorizers[0].1["Properties"];
    assert_eq!(properties["Type"], "COGNITO_USER_POOLS");
    assert_eq!(properties["IdentitySource"], "method.request.header.Authorization");
    assert_eq!(
        properties["ProviderARNs"][0],
        json!({"Fn::GetAtt": [identity::USER_POOL_ID, "Arn"]})
    );

    let authorized: Vec<_> = resources_of_type(&template, "AWS::ApiGateway::Method")
        .into_iter()
        .filter(|(_, method)| method["Properties"]["AuthorizationType"] != "NONE")
        .collect();
    assert_eq!(authorized.len(), 1);
    assert_eq!(authorized[0].1["Properties"]["HttpMethod"], "POST");
}

#[test]
fn test_cors_on_every_route() {
    let stack = synth(Revision::Base);
    let origins = api::preflight_origins_in(&stack.template);

    let mut expected: Vec<String> = CORS.allow_origins.iter().map(|o| o.to_string()).collect();
    expected.sort();

    for route in api::routes_in(&stack.template) {
        let mut allowed = origins
            .get(&route.path)
            .unwrap_or_else(|| panic!("no preflight for {}", route.path))
            .clone();
        allowed.sort();
        assert_eq!(allowed, expected, "origins for {}", route.path);
    }
    assert!(origins.contains_key("/"));
}

#[test]
fn test_handlers_receive_table_name() {
    let template = template_json(&synth(Revision::Base));
    let functions = resources_of_type(&template, "AWS::Lambda::Function");

    assert_eq!(functions.len(), 3);
    for (_, function) in functions {
        let properties = &function["Properties"];
        assert_eq!(properties["Runtime"], "python3.11");
        assert_eq!(
            properties["Environment"]["Variables"]["QUOTES_TABLE"],
            json!({"Ref": storage::TABLE_LOGICAL_ID})
        );
        assert!(properties["Code"]["S3Key"].as_str().unwrap().ends_with(".zip"));
    }

    assert_eq!(
        template["Resources"]["BrowseQuotesLambda"]["Properties"]["Handler"],
        "browsequotes_handler.lambda_handler"
    );
}

#[test]
fn test_least_privilege_grants() {
    let template = template_json(&synth(Revision::Base));
    let actions = |policy: &str| -> Vec<String> {
        template["Resources"][policy]["Properties"]["PolicyDocument"]["Statement"][0]["Action"]
            .as_array()
            .unwrap()
            .iter()
            .map(|action| action.as_str().unwrap().to_string())
            .collect()
    };

    let create = actions("CreateQuotesLambdaServiceRoleDefaultPolicy");
    assert!(create.contains(&"dynamodb:PutItem".to_string()));
    assert!(create.contains(&"dynamodb:GetItem".to_string()));

    for policy in [
        "QuotesLambdaServiceRoleDefaultPolicy",
        "BrowseQuotesLambdaServiceRoleDefaultPolicy",
    ] {
        let read = actions(policy);
        assert!(read.contains(&"dynamodb:Query".to_string()));
        assert!(!read.iter().any(|action| action == "dynamodb:PutItem"
            || action == "dynamodb:DeleteItem"
            || action == "dynamodb:UpdateItem"
            || action == "dynamodb:BatchWriteItem"));
    }
}

#[test]
fn test_admins_group_declared_but_unbound() {
    let template = template_json(&synth(Revision::Base));
    let groups = resources_of_type(&template, "AWS::Cognito::UserPoolGroup");

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].1["Properties"]["GroupName"], "admins");

    // Nothing else in the stack refers to the group
    for (id, resource) in template["Resources"].as_object().unwrap() {
        if id == identity::ADMINS_GROUP_ID {
            continue;
        }
        let serialized = serde_json::to_string(resource).unwrap();
        assert!(!serialized.contains(identity::ADMINS_GROUP_ID), "{id} references the group");
        assert!(!serialized.contains("\"admins\""), "{id} references the group name");
    }
}

#[test]
fn test_login_url_output() {
    let template = template_json(&synth(Revision::Base));
    let url = &template["Outputs"][identity::LOGIN_URL_OUTPUT]["Value"]["Fn::Join"][1];

    assert!(url
        .as_array()
        .unwrap()
        .contains(&json!({"Ref": identity::CLIENT_ID})));
}

#[test]
fn test_base_revision_has_no_edge_resources() {
    let stack = synth(Revision::Base);
    let template = template_json(&stack);

    assert!(resources_of_type(&template, "AWS::ApiGateway::DomainName").is_empty());
    assert!(resources_of_type(&template, "AWS::Route53::RecordSet").is_empty());
    assert!(template["Outputs"].get("CustomDomainUrl").is_none());
}

#[test]
fn test_custom_domain_revision() {
    let template = template_json(&synth(Revision::CustomDomain));

    let domains = resources_of_type(&template, "AWS::ApiGateway::DomainName");
    assert_eq!(domains.len(), 1);
    let domain = &domains[0].1["Properties"];
    assert_eq!(domain["DomainName"], "novamuseapi.c3devs.com");
    assert_eq!(domain["RegionalCertificateArn"], CERTIFICATE);
    assert_eq!(domain["SecurityPolicy"], "TLS_1_2");

    let mappings = resources_of_type(&template, "AWS::ApiGateway::BasePathMapping");
    assert_eq!(mappings.len(), 1);
    assert_eq!(
        mappings[0].1["Properties"]["Stage"],
        json!({"Ref": api::STAGE_ID})
    );

    let records = resources_of_type(&template, "AWS::Route53::RecordSet");
    assert_eq!(records.len(), 1);
    let record = &records[0].1["Properties"];
    assert_eq!(record["Type"], "A");
    assert_eq!(record["HostedZoneName"], "c3devs.com.");
    assert_eq!(
        record["AliasTarget"]["DNSName"],
        json!({"Fn::GetAtt": ["NovaMuseCustomDomain", "RegionalDomainName"]})
    );
}

#[test]
fn test_synthesis_is_deterministic() {
    let first = serde_json::to_string(&synth(Revision::CustomDomain).template).unwrap();
    let second = serde_json::to_string(&synth(Revision::CustomDomain).template).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_stage_points_at_hashed_deployment() {
    let template = template_json(&synth(Revision::Base));
    let deployments = resources_of_type(&template, "AWS::ApiGateway::Deployment");

    assert_eq!(deployments.len(), 1);
    let (deployment_id, deployment) = deployments[0];
    assert!(deployment_id.starts_with(api::DEPLOYMENT_PREFIX));
    assert_eq!(deployment_id.len(), api::DEPLOYMENT_PREFIX.len() + 32);

    let depends_on = deployment["DependsOn"].as_array().unwrap();
    assert!(depends_on.contains(&json!("NovaMuseApiquotePOST")));
    assert!(depends_on.contains(&json!("NovaMuseApiquotebrowse")));

    assert_eq!(
        template["Resources"][api::STAGE_ID]["Properties"]["DeploymentId"],
        json!({"Ref": deployment_id})
    );
    assert_eq!(template["Resources"][api::STAGE_ID]["Properties"]["StageName"], "prod");
}

#[test]
fn test_every_lambda_route_can_invoke() {
    let template = template_json(&synth(Revision::Base));
    let permissions = resources_of_type(&template, "AWS::Lambda::Permission");

    // One for the stage and one for console test invocations, per route
    assert_eq!(permissions.len(), 6);
    assert!(permissions.iter().all(|(_, permission)| {
        permission["Properties"]["Principal"] == "apigateway.amazonaws.com"
            && permission["Properties"]["Action"] == "lambda:InvokeFunction"
    }));
}

#[test]
fn test_write_assembly() {
    let stack = synth(Revision::CustomDomain);
    let out = tempfile::tempdir().unwrap();

    let paths = assembly::write(&stack, out.path()).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&paths.template).unwrap()).unwrap();
    assert_eq!(written, template_json(&stack));
    assert!(paths.template.ends_with("NovaMuseStack.template.json"));

    let manifest: Value = serde_json::from_str(&fs::read_to_string(&paths.manifest).unwrap()).unwrap();
    let artifact = &manifest["artifacts"]["NovaMuseStack"];
    assert_eq!(artifact["type"], "aws:cloudformation:stack");
    assert_eq!(artifact["environment"], "aws://123456789012/us-east-1");
    assert_eq!(artifact["properties"]["templateFile"], "NovaMuseStack.template.json");

    let assets: Value = serde_json::from_str(&fs::read_to_string(&paths.assets).unwrap()).unwrap();
    let file = &assets["files"][stack.asset.hash()];
    assert_eq!(file["source"]["packaging"], "zip");
    assert_eq!(
        file["destinations"]["123456789012-us-east-1"]["objectKey"],
        stack.asset.object_key()
    );
}

#[test]
fn test_typed_access_to_table() {
    let stack = synth(Revision::Base);
    let (_, table) = stack
        .template
        .resources_of_type("AWS::DynamoDB::Table")
        .next()
        .unwrap();

    match &table.kind {
        ResourceKind::Table(properties) => {
            assert_eq!(properties.table_name, storage::TABLE_NAME);
            assert_eq!(properties.global_secondary_indexes.len(), 2);
        }
        other => panic!("unexpected resource kind {other:?}"),
    }
}

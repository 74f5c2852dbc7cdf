use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::compute::{Handler, HandlerKind, Handlers};
use crate::error::Result;
use crate::identity::Identity;
use crate::resources::apigateway::{
    ApiResourceProperties, AuthorizationType, AuthorizerProperties, DeploymentProperties,
    Integration, IntegrationResponse, IntegrationType, MethodProperties, MethodResponse,
    RestApiProperties, StageProperties,
};
use crate::resources::lambda::PermissionProperties;
use crate::resources::{Resource, ResourceKind};
use crate::template::{Expr, Output, Template};

pub const API_ID: &str = "NovaMuseApi";
pub const API_NAME: &str = "NovaMuse Quotes Service";
pub const API_DESCRIPTION: &str = "Serves inspirational sci-fi and fantasy quotes";
pub const AUTHORIZER_ID: &str = "NovaMuseAuthorizer";
pub const DEPLOYMENT_PREFIX: &str = "NovaMuseApiDeployment";
pub const STAGE_ID: &str = "NovaMuseApiDeploymentStageprod";
pub const STAGE_NAME: &str = "prod";
pub const ENDPOINT_OUTPUT: &str = "NovaMuseApiEndpoint";

const ORIGIN_HEADER: &str = "method.response.header.Access-Control-Allow-Origin";
const JSON_CONTENT: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allow_origins: &'static [&'static str],
    pub allow_methods: &'static [&'static str],
    pub allow_headers: &'static [&'static str],
}

pub const CORS: CorsPolicy = CorsPolicy {
    allow_origins: &[
        "http://localhost:3000",
        "http://localhost:5173",
        "https://novamusequotes.c3devs.com",
    ],
    allow_methods: &["GET", "POST", "OPTIONS"],
    allow_headers: &["Content-Type", "Authorization"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAuth {
    Public,
    /// Bearer token checked against the user pool.
    UserPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    pub path: &'static str,
    pub auth: RouteAuth,
    pub handler: HandlerKind,
}

pub const ROUTES: [Route; 3] = [
    Route {
        method: HttpMethod::Get,
        path: "/quote",
        auth: RouteAuth::Public,
        handler: HandlerKind::ReadOne,
    },
    Route {
        method: HttpMethod::Post,
        path: "/quote",
        auth: RouteAuth::UserPool,
        handler: HandlerKind::Create,
    },
    Route {
        method: HttpMethod::Get,
        path: "/quote/browse",
        auth: RouteAuth::Public,
        handler: HandlerKind::Browse,
    },
];

/// A route as it appears in a synthesized template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    pub method: String,
    pub path: String,
    pub authorizer: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Api {
    deployment_id: String,
}

impl Api {
    pub fn rest_api(&self) -> Expr {
        Expr::reference(API_ID)
    }

    pub fn stage(&self) -> Expr {
        Expr::reference(STAGE_ID)
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn endpoint(&self) -> Expr {
        Expr::join(
            "",
            vec![
                Expr::literal("https://"),
                self.rest_api(),
                Expr::literal(".execute-api."),
                Expr::region(),
                Expr::literal("."),
                Expr::url_suffix(),
                Expr::literal("/"),
                self.stage(),
                Expr::literal("/"),
            ],
        )
    }
}

fn root_resource() -> Expr {
    Expr::get_att(API_ID, "RootResourceId")
}

fn quoted(value: &str) -> String {
    format!("'{value}'")
}

/// Response template that echoes the caller's origin back when it is one of
/// `extra_origins`; the first allowed origin is the static default.
fn origin_echo_template(extra_origins: &[&str]) -> String {
    let condition = extra_origins
        .iter()
        .map(|origin| format!("$origin == \"{origin}\""))
        .collect::<Vec<_>>()
        .join(" || ");

    format!(
        "#set($origin = $input.params().header.get(\"Origin\"))\n\
         #if($origin == \"\")\n  #set($origin = $input.params().header.get(\"origin\"))\n#end\n\
         #if({condition})\n  #set($context.responseOverride.header.Access-Control-Allow-Origin = $origin)\n#end"
    )
}

pub fn cors_preflight(resource: Expr) -> MethodProperties {
    let mut response_parameters = BTreeMap::new();
    response_parameters.insert(
        "method.response.header.Access-Control-Allow-Headers".to_string(),
        quoted(&CORS.allow_headers.join(",")),
    );
    response_parameters.insert(ORIGIN_HEADER.to_string(), quoted(CORS.allow_origins[0]));
    response_parameters.insert("method.response.header.Vary".to_string(), quoted("Origin"));
    response_parameters.insert(
        "method.response.header.Access-Control-Allow-Methods".to_string(),
        quoted(&CORS.allow_methods.join(",")),
    );

    let method_parameters = response_parameters
        .keys()
        .map(|name| (name.clone(), true))
        .collect();

    let mut response_templates = BTreeMap::new();
    if CORS.allow_origins.len() > 1 {
        response_templates.insert(
            JSON_CONTENT.to_string(),
            origin_echo_template(&CORS.allow_origins[1..]),
        );
    }

    let mut request_templates = BTreeMap::new();
    request_templates.insert(JSON_CONTENT.to_string(), "{ statusCode: 200 }".to_string());

    MethodProperties::builder()
        .http_method("OPTIONS")
        .resource_id(resource)
        .rest_api_id(Expr::reference(API_ID))
        .authorization_type(AuthorizationType::None)
        .integration(Integration {
            integration_type: IntegrationType::Mock,
            integration_http_method: None,
            uri: None,
            request_templates,
            integration_responses: vec![IntegrationResponse {
                status_code: "204".to_string(),
                response_parameters,
                response_templates,
            }],
        })
        .method_responses(vec![MethodResponse {
            status_code: "204".to_string(),
            response_parameters: method_parameters,
        }])
        .build()
}

/// Origins a preflight method lets through: the static header value plus
/// every origin its response template echoes.
pub fn preflight_origins(method: &MethodProperties) -> Vec<String> {
    let mut origins = Vec::new();
    let Some(response) = method.integration.integration_responses.first() else {
        return origins;
    };

    if let Some(value) = response.response_parameters.get(ORIGIN_HEADER) {
        origins.push(value.trim_matches('\'').to_string());
    }

    for template in response.response_templates.values() {
        let marker = "$origin == \"";
        let mut rest = template.as_str();
        while let Some(start) = rest.find(marker) {
            let after = &rest[start + marker.len()..];
            let Some(end) = after.find('"') else {
                break;
            };
            if end > 0 {
                origins.push(after[..end].to_string());
            }
            rest = &after[end + 1..];
        }
    }
    origins
}

struct ResourceTree {
    // path -> logical id of its AWS::ApiGateway::Resource
    paths: BTreeMap<String, String>,
    members: Vec<String>,
}

impl ResourceTree {
    /// Declares any missing resources along `path` (each with its CORS
    /// preflight) and returns the resource expression and method id prefix.
    fn ensure(&mut self, template: &mut Template, path: &str) -> Result<(Expr, String)> {
        let mut parent = root_resource();
        let mut prefix = API_ID.to_string();
        let mut current = String::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            prefix.extend(segment.chars().filter(char::is_ascii_alphanumeric));

            if !self.paths.contains_key(&current) {
                template.add(
                    &prefix,
                    Resource::new(ResourceKind::ApiResource(ApiResourceProperties {
                        parent_id: parent.clone(),
                        path_part: segment.to_string(),
                        rest_api_id: Expr::reference(API_ID),
                    })),
                )?;
                self.members.push(prefix.clone());

                let preflight_id = format!("{prefix}OPTIONS");
                template.add(
                    &preflight_id,
                    Resource::new(ResourceKind::Method(cors_preflight(Expr::reference(&prefix)))),
                )?;
                self.members.push(preflight_id);

                self.paths.insert(current.clone(), prefix.clone());
            }
            parent = Expr::reference(&prefix);
        }

        Ok((parent, prefix))
    }
}

fn execute_api_arn(stage: Expr, route: &Route) -> Expr {
    Expr::join(
        "",
        vec![
            Expr::literal("arn:"),
            Expr::partition(),
            Expr::literal(":execute-api:"),
            Expr::region(),
            Expr::literal(":"),
            Expr::account_id(),
            Expr::literal(":"),
            Expr::reference(API_ID),
            Expr::literal("/"),
            stage,
            Expr::literal(format!("/{}{}", route.method.as_str(), route.path)),
        ],
    )
}

fn add_invoke_permissions(
    template: &mut Template,
    method_id: &str,
    route: &Route,
    handler: &Handler,
) -> Result<()> {
    let sources = [
        ("ApiPermission", Expr::reference(STAGE_ID)),
        ("ApiPermissionTest", Expr::literal("test-invoke-stage")),
    ];

    for (suffix, stage) in sources {
        template.add(
            format!("{method_id}{suffix}"),
            Resource::new(ResourceKind::Permission(PermissionProperties {
                action: "lambda:InvokeFunction".to_string(),
                function_name: handler.function_arn(),
                principal: "apigateway.amazonaws.com".to_string(),
                source_arn: execute_api_arn(stage, route),
            })),
        )?;
    }
    Ok(())
}

pub fn declare(template: &mut Template, handlers: &Handlers, identity: &Identity) -> Result<Api> {
    let rest_api = Expr::reference(API_ID);

    template.add(
        API_ID,
        Resource::new(ResourceKind::RestApi(RestApiProperties {
            name: API_NAME.to_string(),
            description: Some(API_DESCRIPTION.to_string()),
        })),
    )?;

    let mut tree = ResourceTree {
        paths: BTreeMap::new(),
        members: Vec::new(),
    };

    if ROUTES.iter().any(|route| route.auth == RouteAuth::UserPool) {
        template.add(
            AUTHORIZER_ID,
            Resource::new(ResourceKind::Authorizer(AuthorizerProperties {
                name: AUTHORIZER_ID.to_string(),
                authorizer_type: "COGNITO_USER_POOLS".to_string(),
                identity_source: "method.request.header.Authorization".to_string(),
                provider_arns: vec![identity.user_pool_arn()],
                rest_api_id: rest_api.clone(),
            })),
        )?;
        tree.members.push(AUTHORIZER_ID.to_string());
    }

    let root_preflight = format!("{API_ID}OPTIONS");
    template.add(
        &root_preflight,
        Resource::new(ResourceKind::Method(cors_preflight(root_resource()))),
    )?;
    tree.members.push(root_preflight);

    for route in &ROUTES {
        let (resource, prefix) = tree.ensure(template, route.path)?;
        let handler = handlers.get(route.handler);
        let method_id = format!("{prefix}{}", route.method.as_str());

        let (authorization_type, authorizer_id) = match route.auth {
            RouteAuth::Public => (AuthorizationType::None, None),
            RouteAuth::UserPool => (
                AuthorizationType::CognitoUserPools,
                Some(Expr::reference(AUTHORIZER_ID)),
            ),
        };

        let method = MethodProperties::builder()
            .http_method(route.method.as_str())
            .resource_id(resource)
            .rest_api_id(rest_api.clone())
            .authorization_type(authorization_type)
            .maybe_authorizer_id(authorizer_id)
            .integration(Integration::lambda_proxy(handler.function_arn()))
            .build();

        template.add(&method_id, Resource::new(ResourceKind::Method(method)))?;
        tree.members.push(method_id.clone());
        add_invoke_permissions(template, &method_id, route, handler)?;

        debug!(
            "Routed {} {} to {} ({:?})",
            route.method.as_str(),
            route.path,
            handler.function_id,
            route.auth
        );
    }

    // Deployments are immutable: any route change must yield a new logical id
    tree.members.sort();
    let mut hasher = Sha256::new();
    for member in &tree.members {
        hasher.update(member.as_bytes());
        if let Some(resource) = template.get(member) {
            hasher.update(serde_json::to_vec(resource)?);
        }
    }
    let digest = format!("{:x}", hasher.finalize());
    let deployment_id = format!("{DEPLOYMENT_PREFIX}{}", &digest[..32]);

    template.add(
        &deployment_id,
        Resource::new(ResourceKind::Deployment(DeploymentProperties {
            rest_api_id: rest_api.clone(),
            description: Some(API_DESCRIPTION.to_string()),
        }))
        .depends_on(tree.members.iter().cloned()),
    )?;

    template.add(
        STAGE_ID,
        Resource::new(ResourceKind::Stage(StageProperties {
            rest_api_id: rest_api,
            deployment_id: Expr::reference(&deployment_id),
            stage_name: STAGE_NAME.to_string(),
        })),
    )?;

    let api = Api { deployment_id };
    template.add_output(
        ENDPOINT_OUTPUT,
        Output::new(api.endpoint()).described("Invoke URL of the prod stage"),
    )?;

    Ok(api)
}

fn resolve_path(template: &Template, resource: &Expr) -> Option<String> {
    match resource {
        Expr::GetAtt(_, attribute) if attribute == "RootResourceId" => Some("/".to_string()),
        Expr::Ref(id) => match &template.get(id)?.kind {
            ResourceKind::ApiResource(properties) => {
                let parent = resolve_path(template, &properties.parent_id)?;
                Some(if parent == "/" {
                    format!("/{}", properties.path_part)
                } else {
                    format!("{parent}/{}", properties.path_part)
                })
            }
            _ => None,
        },
        _ => None,
    }
}

fn integration_target(integration: &Integration) -> Option<String> {
    match integration.uri.as_ref()? {
        Expr::Join(_, parts) => parts.iter().find_map(|part| match part {
            Expr::GetAtt(id, _) => Some(id.clone()),
            _ => None,
        }),
        _ => None,
    }
}

/// Rebuilds the route table (every non-preflight method) from a template.
pub fn routes_in(template: &Template) -> Vec<RouteSummary> {
    let mut routes: Vec<RouteSummary> = template
        .resources
        .values()
        .filter_map(|resource| match &resource.kind {
            ResourceKind::Method(method) if method.http_method != "OPTIONS" => Some(RouteSummary {
                method: method.http_method.clone(),
                path: resolve_path(template, &method.resource_id)?,
                authorizer: method
                    .authorizer_id
                    .as_ref()
                    .and_then(|expr| expr.ref_target())
                    .map(str::to_string),
                target: integration_target(&method.integration),
            }),
            _ => None,
        })
        .collect();
    routes.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));
    routes
}

/// Allowed CORS origins per path, read from the preflight methods.
pub fn preflight_origins_in(template: &Template) -> BTreeMap<String, Vec<String>> {
    template
        .resources
        .values()
        .filter_map(|resource| match &resource.kind {
            ResourceKind::Method(method) if method.http_method == "OPTIONS" => Some((
                resolve_path(template, &method.resource_id)?,
                preflight_origins(method),
            )),
            _ => None,
        })
        .collect()
}

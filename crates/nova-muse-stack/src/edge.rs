use tracing::debug;

use crate::api::Api;
use crate::error::Result;
use crate::resources::apigateway::{BasePathMappingProperties, DomainNameProperties, EndpointConfiguration};
use crate::resources::route53::{AliasTarget, RecordSetProperties};
use crate::resources::{Resource, ResourceKind};
use crate::template::{Expr, Output, Template};

pub const CUSTOM_DOMAIN: &str = "novamuseapi.c3devs.com";
pub const HOSTED_ZONE: &str = "c3devs.com";
pub const SECURITY_POLICY: &str = "TLS_1_2";

pub const DOMAIN_ID: &str = "NovaMuseCustomDomain";
pub const MAPPING_ID: &str = "NovaMuseCustomDomainMapping";
pub const ALIAS_RECORD_ID: &str = "NovaMuseApiAliasRecord";
pub const CUSTOM_DOMAIN_OUTPUT: &str = "CustomDomainUrl";

fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Maps the custom domain onto the API's stage and aliases it in DNS. The
/// certificate and hosted zone must already exist; a bad ARN or zone name
/// fails the deployment, not synthesis.
pub fn declare(template: &mut Template, api: &Api, certificate_arn: &str) -> Result<()> {
    template.add(
        DOMAIN_ID,
        Resource::new(ResourceKind::DomainName(DomainNameProperties {
            domain_name: CUSTOM_DOMAIN.to_string(),
            endpoint_configuration: EndpointConfiguration {
                types: vec!["REGIONAL".to_string()],
            },
            regional_certificate_arn: certificate_arn.to_string(),
            security_policy: SECURITY_POLICY.to_string(),
        })),
    )?;

    template.add(
        MAPPING_ID,
        Resource::new(ResourceKind::BasePathMapping(BasePathMappingProperties {
            domain_name: Expr::reference(DOMAIN_ID),
            rest_api_id: api.rest_api(),
            stage: api.stage(),
        })),
    )?;

    template.add(
        ALIAS_RECORD_ID,
        Resource::new(ResourceKind::RecordSet(RecordSetProperties {
            name: fqdn(CUSTOM_DOMAIN),
            record_type: "A".to_string(),
            hosted_zone_name: fqdn(HOSTED_ZONE),
            alias_target: AliasTarget {
                dns_name: Expr::get_att(DOMAIN_ID, "RegionalDomainName"),
                hosted_zone_id: Expr::get_att(DOMAIN_ID, "RegionalHostedZoneId"),
            },
        })),
    )?;

    template.add_output(
        CUSTOM_DOMAIN_OUTPUT,
        Output::new(Expr::literal(format!("https://{CUSTOM_DOMAIN}"))).described("Custom domain for the API"),
    )?;

    debug!("Aliased {} in zone {}", CUSTOM_DOMAIN, HOSTED_ZONE);
    Ok(())
}

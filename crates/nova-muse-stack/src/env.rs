use std::fmt;

use crate::error::{Result, SynthError};

pub const ACCOUNT_VAR: &str = "AWS_ACCOUNT_ID";
pub const REGION_VAR: &str = "AWS_REGION";
pub const CERTIFICATE_VAR: &str = "ACM_ARN";

/// Which generation of the stack to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Revision {
    /// Table, handlers, user pool and REST gateway.
    Base,
    /// Everything in `Base` plus the custom domain, certificate and DNS alias.
    #[default]
    CustomDomain,
}

impl Revision {
    pub fn requires_certificate(self) -> bool {
        matches!(self, Self::CustomDomain)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::CustomDomain => write!(f, "custom-domain"),
        }
    }
}

/// Deployment target and externally supplied references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEnv {
    pub account: String,
    pub region: String,
    pub certificate_arn: Option<String>,
}

impl StackEnv {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            certificate_arn: None,
        }
    }

    pub fn with_certificate(mut self, arn: impl Into<String>) -> Self {
        self.certificate_arn = Some(arn.into());
        self
    }

    pub fn from_env(revision: Revision) -> Result<Self> {
        Self::from_lookup(revision, |key| std::env::var(key).ok())
    }

    /// Reads the environment through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(revision: Revision, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !is_blank(value));

        let (Some(account), Some(region)) = (present(ACCOUNT_VAR), present(REGION_VAR)) else {
            return Err(SynthError::MissingAccountOrRegion);
        };

        let env = Self {
            account,
            region,
            certificate_arn: present(CERTIFICATE_VAR),
        };
        env.check(revision)?;
        Ok(env)
    }

    /// Fails unless account and region are set, and the certificate too when
    /// `revision` needs one. Blank values count as unset.
    pub fn check(&self, revision: Revision) -> Result<()> {
        if is_blank(&self.account) || is_blank(&self.region) {
            return Err(SynthError::MissingAccountOrRegion);
        }
        if revision.requires_certificate() && self.certificate().is_none() {
            return Err(SynthError::MissingCertificateArn);
        }
        Ok(())
    }

    /// The certificate ARN, if set and not blank.
    pub fn certificate(&self) -> Option<&str> {
        self.certificate_arn
            .as_deref()
            .filter(|arn| !is_blank(arn))
    }

    /// `aws://<account>/<region>`, as recorded in the assembly manifest.
    pub fn environment_uri(&self) -> String {
        format!("aws://{}/{}", self.account, self.region)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_base_revision_without_certificate() {
        let env = StackEnv::from_lookup(
            Revision::Base,
            lookup(&[("AWS_ACCOUNT_ID", "123456789012"), ("AWS_REGION", "us-east-1")]),
        )
        .unwrap();

        assert_eq!(env, StackEnv::new("123456789012", "us-east-1"));
        assert_eq!(env.environment_uri(), "aws://123456789012/us-east-1");
    }

    #[test]
    fn test_check_rejects_hand_built_env() {
        let blank = StackEnv::new(" ", "us-east-1");
        assert!(matches!(blank.check(Revision::Base), Err(SynthError::MissingAccountOrRegion)));

        let env = StackEnv::new("123456789012", "us-east-1").with_certificate("");
        assert!(env.check(Revision::Base).is_ok());
        assert_eq!(env.certificate(), None);
        assert!(matches!(
            env.check(Revision::CustomDomain),
            Err(SynthError::MissingCertificateArn)
        ));
    }

    #[test]
    fn test_missing_region() {
        let err = StackEnv::from_lookup(Revision::Base, lookup(&[("AWS_ACCOUNT_ID", "123456789012")]))
            .unwrap_err();
        assert!(matches!(err, SynthError::MissingAccountOrRegion));
        assert_eq!(err.to_string(), "AWS_ACCOUNT_ID and AWS_REGION must be set");
    }

    #[test]
    fn test_blank_account_counts_as_missing() {
        let err = StackEnv::from_lookup(
            Revision::Base,
            lookup(&[("AWS_ACCOUNT_ID", "  "), ("AWS_REGION", "us-east-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, SynthError::MissingAccountOrRegion));
    }

    #[test]
    fn test_account_checked_before_certificate() {
        let err = StackEnv::from_lookup(Revision::CustomDomain, lookup(&[])).unwrap_err();
        assert!(matches!(err, SynthError::MissingAccountOrRegion));
    }

    #[test]
    fn test_custom_domain_requires_certificate() {
        let err = StackEnv::from_lookup(
            Revision::CustomDomain,
            lookup(&[("AWS_ACCOUNT_ID", "123456789012"), ("AWS_REGION", "us-east-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, SynthError::MissingCertificateArn));
    }

    #[test]
    fn test_custom_domain_with_certificate() {
        let arn = "arn:aws:acm:us-east-1:123456789012:certificate/abc";
        let env = StackEnv::from_lookup(
            Revision::CustomDomain,
            lookup(&[
                ("AWS_ACCOUNT_ID", "123456789012"),
                ("AWS_REGION", "us-east-1"),
                ("ACM_ARN", arn),
            ]),
        )
        .unwrap();
        assert_eq!(env.certificate_arn.as_deref(), Some(arn));
    }

    #[test]
    fn test_revision_display() {
        assert_eq!(Revision::Base.to_string(), "base");
        assert_eq!(Revision::default().to_string(), "custom-domain");
    }
}

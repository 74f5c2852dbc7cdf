use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoClient};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_dynamo::to_item;
use tracing::info;

pub const METADATA_SK: &str = "METADATA";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct QuoteInput {
    pub text: String,
    pub author: String,
    pub genre: String,
    pub source: String,
}

impl QuoteInput {
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            genre: genre.into(),
            source: source.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [&self.text, &self.author, &self.genre, &self.source];
        if fields.iter().any(|field| field.trim().is_empty()) {
            bail!("text, author, genre, and source are required");
        }
        Ok(())
    }
}

/// A quote as stored in the table, with its primary and index keys.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuoteItem {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: String,
    #[serde(rename = "quoteId")]
    pub quote_id: String,
    #[serde(rename = "GSI1PK")]
    pub gsi1pk: String,
    #[serde(rename = "GSI1SK")]
    pub gsi1sk: String,
    #[serde(rename = "GSI2PK")]
    pub gsi2pk: String,
    #[serde(rename = "GSI2SK")]
    pub gsi2sk: String,
    pub text: String,
    pub author: String,
    pub genre: String,
    pub source: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl QuoteItem {
    pub fn new(quote: &QuoteInput, now: DateTime<Utc>) -> Self {
        let quote_id = quote_id(&quote.text);
        let created_at = timestamp(now);

        Self {
            pk: format!("QUOTE#{quote_id}"),
            sk: METADATA_SK.to_string(),
            gsi1pk: format!("GENRE#{}", quote.genre),
            gsi1sk: format!("CREATED#{created_at}"),
            gsi2pk: format!("AUTHOR#{}", quote.author),
            gsi2sk: format!("CREATED#{created_at}"),
            quote_id,
            text: quote.text.clone(),
            author: quote.author.clone(),
            genre: quote.genre.clone(),
            source: quote.source.clone(),
            created_at,
        }
    }
}

/// First eight hex digits of the MD5 of the quote text. Identical text
/// always maps to the same id, which is what makes seeding idempotent.
pub fn quote_id(text: &str) -> String {
    let digest = format!("{:x}", Md5::digest(text.as_bytes()));
    digest[..8].to_string()
}

/// ISO-8601 UTC with microseconds, omitting the fraction when it is zero,
/// the same shape the request handlers write.
pub fn timestamp(now: DateTime<Utc>) -> String {
    if now.timestamp_subsec_micros() == 0 {
        now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    }
}

pub fn sample_quotes() -> Vec<QuoteInput> {
    vec![
        QuoteInput::new(
            "Do or do not. There is no try.",
            "Yoda",
            "sci-fi",
            "Star Wars: The Empire Strikes Back",
        ),
        QuoteInput::new("Fear is the mind-killer.", "Paul Atreides", "sci-fi", "Dune Messiah"),
        QuoteInput::new(
            "All we have to decide is what to do with the time that is given us.",
            "Gandalf",
            "fantasy",
            "The Lord of the Rings",
        ),
        QuoteInput::new(
            "It is our choices, Harry, that show what we truly are, far more than our abilities.",
            "Dumbledore",
            "fantasy",
            "Harry Potter and the Chamber of Secrets",
        ),
        QuoteInput::new("I am Groot.", "Groot", "sci-fi", "Guardians of the Galaxy"),
        QuoteInput::new(
            "Not all those who wander are lost.",
            "Bilbo Baggins",
            "fantasy",
            "The Hobbit",
        ),
    ]
}

/// Reads a JSON array of quotes, rejecting any entry with a blank field.
pub fn load_quotes(path: &Path) -> Result<Vec<QuoteInput>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let quotes: Vec<QuoteInput> = serde_json::from_str(&body)
        .with_context(|| format!("failed to parse quotes from {}", path.display()))?;

    for (index, quote) in quotes.iter().enumerate() {
        quote
            .validate()
            .with_context(|| format!("invalid quote at index {index}"))?;
    }
    Ok(quotes)
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn exists(&self, pk: &str, sk: &str) -> Result<bool>;

    /// Writes the item unless its key is already taken. Returns whether it
    /// was written.
    async fn put(&self, item: &QuoteItem) -> Result<bool>;
}

pub struct DynamoQuoteStore {
    client: DynamoClient,
    table_name: String,
    endpoint_url: Option<String>,
}

impl DynamoQuoteStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            endpoint_url: None,
        }
    }

    /// Builds a client for `region` from the shared AWS config, which also
    /// picks up `AWS_ENDPOINT_URL` (e.g. DynamoDB Local).
    pub async fn connect(region: &str, table_name: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_config(&config, table_name)
    }

    pub fn from_config(config: &SdkConfig, table_name: impl Into<String>) -> Self {
        let endpoint_url = config.endpoint_url().map(str::to_string);
        if let Some(endpoint) = &endpoint_url {
            info!("Using DynamoDB endpoint {}", endpoint);
        }

        Self {
            endpoint_url,
            ..Self::new(DynamoClient::new(config), table_name)
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Endpoint override in effect, if any.
    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }
}

#[async_trait]
impl QuoteStore for DynamoQuoteStore {
    async fn exists(&self, pk: &str, sk: &str) -> Result<bool> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.to_string()))
            .key("SK", AttributeValue::S(sk.to_string()))
            .send()
            .await?;

        Ok(result.item.is_some())
    }

    async fn put(&self, item: &QuoteItem) -> Result<bool> {
        let attributes = to_item(item)?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(attributes))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            // Someone else wrote the same quote between our check and put
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

pub async fn seed<S>(store: &S, quotes: &[QuoteInput], now: DateTime<Utc>) -> Result<SeedReport>
where
    S: QuoteStore + ?Sized,
{
    let mut report = SeedReport::default();

    for quote in quotes {
        quote.validate()?;
        let item = QuoteItem::new(quote, now);
        let preview: String = quote.text.chars().take(30).collect();

        if store.exists(&item.pk, &item.sk).await? {
            info!("Quote already exists: {} - {}...", quote.author, preview);
            report.skipped.push(item.quote_id);
            continue;
        }

        if store.put(&item).await? {
            info!("Inserted quote {} by {}", item.quote_id, quote.author);
            report.inserted.push(item.quote_id);
        } else {
            info!("Quote already exists: {} - {}...", quote.author, preview);
            report.skipped.push(item.quote_id);
        }
    }

    Ok(report)
}

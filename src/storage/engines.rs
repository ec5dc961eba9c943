//! Storage engine types and the field table that governs their configuration

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Storage backend kind
///
/// Engine names the editor does not know are kept as `Other` so a document
/// written by a newer server survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
#[non_exhaustive]
pub enum EngineType {
    LocalStorage,
    S3Storage,
    AzureStorage,
    GoogleCloudStorage,
    RHOCSStorage,
    RadosGWStorage,
    SwiftStorage,
    CloudFrontedS3Storage,
    Other(String),
}

impl EngineType {
    /// All engine types the builtin table describes
    pub const KNOWN: [Self; 8] = [
        Self::LocalStorage,
        Self::S3Storage,
        Self::AzureStorage,
        Self::GoogleCloudStorage,
        Self::RHOCSStorage,
        Self::RadosGWStorage,
        Self::SwiftStorage,
        Self::CloudFrontedS3Storage,
    ];

    /// The name used in the raw document
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        match *self {
            Self::LocalStorage => "LocalStorage",
            Self::S3Storage => "S3Storage",
            Self::AzureStorage => "AzureStorage",
            Self::GoogleCloudStorage => "GoogleCloudStorage",
            Self::RHOCSStorage => "RHOCSStorage",
            Self::RadosGWStorage => "RadosGWStorage",
            Self::SwiftStorage => "SwiftStorage",
            Self::CloudFrontedS3Storage => "CloudFrontedS3Storage",
            Self::Other(ref name) => name,
        }
    }

    /// Whether this engine stores blobs on a locally mounted directory
    #[must_use]
    #[inline]
    pub const fn is_local(&self) -> bool {
        matches!(*self, Self::LocalStorage)
    }
}

impl From<String> for EngineType {
    #[inline]
    fn from(name: String) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|known| known.as_str() == name)
            .unwrap_or(Self::Other(name))
    }
}

impl From<EngineType> for String {
    #[inline]
    fn from(engine: EngineType) -> Self {
        match engine {
            EngineType::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for EngineType {
    type Err = core::convert::Infallible;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl fmt::Display for EngineType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input kind of an engine configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum FieldKind {
    Text,
    Password,
    Bool,
    Option,
    Map,
    File,
}

/// One configuration field accepted by a storage engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct EngineField {
    pub name: String,
    pub kind: FieldKind,

    /// Optional fields may be left out entirely
    #[serde(default)]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Allowed values for `option` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,

    /// Allowed keys for `map` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,

    /// For `file` fields, the suffix of the uploaded file's name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_suffix: Option<String>,
}

impl EngineField {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            optional: false,
            pattern: None,
            values: Vec::new(),
            keys: Vec::new(),
            file_suffix: None,
        }
    }

    fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_owned());
        self
    }

    /// Whether the field is a boolean that defaults to `false` when absent
    #[must_use]
    #[inline]
    pub fn defaults_to_false(&self) -> bool {
        self.kind == FieldKind::Bool
    }
}

/// Engine type to allowed fields
///
/// The host passes this table in; [`EngineSchemaTable::builtin`] is the
/// table the registry ships with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineSchemaTable(BTreeMap<EngineType, Vec<EngineField>>);

const PORT_PATTERN: &str = "^[0-9]+$";

impl EngineSchemaTable {
    /// Fields accepted by an engine type, if the table knows it
    #[must_use]
    #[inline]
    pub fn fields_for(&self, engine: &EngineType) -> Option<&[EngineField]> {
        self.0.get(engine).map(Vec::as_slice)
    }

    /// Number of engine types described
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Engine types described by the table
    #[inline]
    pub fn engines(&self) -> impl Iterator<Item = &EngineType> {
        self.0.keys()
    }

    /// The table shipped with the registry
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = BTreeMap::new();

        table.insert(EngineType::LocalStorage, vec![EngineField::text("storage_path")]);

        table.insert(EngineType::S3Storage, s3_fields());

        table.insert(
            EngineType::AzureStorage,
            vec![
                EngineField::text("azure_container"),
                EngineField::text("storage_path"),
                EngineField::text("azure_account_name"),
                EngineField::text("azure_account_key").optional(),
                EngineField::text("sas_token").optional(),
            ],
        );

        table.insert(
            EngineType::GoogleCloudStorage,
            vec![
                EngineField::text("access_key"),
                EngineField::text("secret_key"),
                EngineField::text("bucket_name"),
                EngineField::text("storage_path"),
            ],
        );

        table.insert(EngineType::RHOCSStorage, rados_fields());
        table.insert(EngineType::RadosGWStorage, rados_fields());

        let mut auth_version = EngineField::new("auth_version", FieldKind::Option);
        auth_version.values = vec![json!(1), json!(2), json!(3)];
        let mut os_options = EngineField::new("os_options", FieldKind::Map);
        os_options.keys = [
            "tenant_id",
            "auth_token",
            "service_type",
            "endpoint_type",
            "tenant_name",
            "object_storage_url",
            "region_name",
            "project_id",
            "project_name",
            "project_domain_name",
            "user_domain_name",
            "user_domain_id",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();
        table.insert(
            EngineType::SwiftStorage,
            vec![
                auth_version,
                EngineField::text("auth_url"),
                EngineField::text("swift_container"),
                EngineField::text("storage_path"),
                EngineField::text("swift_user"),
                EngineField::text("swift_password"),
                EngineField::text("ca_cert_path").optional(),
                EngineField::text("temp_url_key").optional(),
                os_options,
            ],
        );

        let mut cloudfront = s3_fields();
        // CloudFront keeps the secret key as plain text, unlike S3
        if let Some(secret) = cloudfront.iter_mut().find(|f| f.name == "s3_secret_key") {
            secret.kind = FieldKind::Text;
        }
        cloudfront.push(
            EngineField::text("cloudfront_distribution_domain")
                .pattern(r"^([0-9a-zA-Z]+\.)+[0-9a-zA-Z]+$"),
        );
        cloudfront.push(EngineField::text("cloudfront_key_id"));
        let mut private_key = EngineField::new("cloudfront_privatekey_filename", FieldKind::File);
        private_key.file_suffix = Some("cloudfront-signing-key.pem".to_owned());
        cloudfront.push(private_key);
        table.insert(EngineType::CloudFrontedS3Storage, cloudfront);

        Self(table)
    }
}

impl FromIterator<(EngineType, Vec<EngineField>)> for EngineSchemaTable {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (EngineType, Vec<EngineField>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn s3_fields() -> Vec<EngineField> {
    vec![
        EngineField::text("s3_bucket"),
        EngineField::text("storage_path"),
        EngineField::text("s3_access_key").optional(),
        EngineField::new("s3_secret_key", FieldKind::Password).optional(),
        EngineField::text("host").optional(),
        EngineField::text("port").pattern(PORT_PATTERN).optional(),
    ]
}

fn rados_fields() -> Vec<EngineField> {
    vec![
        EngineField::text("hostname"),
        EngineField::text("port").pattern(PORT_PATTERN).optional(),
        EngineField::new("is_secure", FieldKind::Bool),
        EngineField::text("access_key"),
        EngineField::text("secret_key"),
        EngineField::text("bucket_name"),
        EngineField::text("storage_path"),
    ]
}

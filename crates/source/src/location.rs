//! Object storage connection strings.

use crate::error::{Error, ErrorKind};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Where the envelope lives in an S3-compatible bucket.
///
/// Parsed from a connection string of space-separated `name=value` pairs:
///
/// ```
/// use flagcache_source::S3Location;
///
/// let location: S3Location = "region=us-east-1 bucket=flags key=prod/flags.json".parse().unwrap();
/// assert_eq!(location.bucket, "flags");
/// assert_eq!(location.key, "prod/flags.json");
/// assert!(location.endpoint.is_none());
/// ```
///
/// `bucket`, `key` and `region` are required. `endpoint` points the client at
/// a non-AWS service; `access_key_id` and `secret_access_key` are handed to
/// the client untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Location {
    pub region: String,
    pub bucket: String,
    pub key: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}
impl FromStr for S3Location {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mut region, mut bucket, mut key) = (None, None, None);
        let (mut endpoint, mut access_key_id, mut secret_access_key) = (None, None, None);
        for pair in s.split_whitespace() {
            let Some((name, value)) = pair.split_once('=') else {
                exn::bail!(ErrorKind::InvalidConnection(format!("expected name=value, found `{pair}`")));
            };
            let value = Some(value.to_string()).filter(|v| !v.is_empty());
            match name {
                "region" => region = value,
                "bucket" => bucket = value,
                "key" => key = value,
                "endpoint" => endpoint = value,
                "access_key_id" => access_key_id = value,
                "secret_access_key" => secret_access_key = value,
                other => exn::bail!(ErrorKind::InvalidConnection(format!("unknown field `{other}`"))),
            }
        }
        let required = |field: Option<String>, name: &str| match field {
            Some(value) => Ok(value),
            None => Err(Error::from(ErrorKind::InvalidConnection(format!("missing `{name}`")))),
        };
        Ok(Self {
            region: required(region, "region")?,
            bucket: required(bucket, "bucket")?,
            key: required(key, "key")?,
            endpoint,
            access_key_id,
            secret_access_key,
        })
    }
}
impl Debug for S3Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        // Never print the secret.
        f.debug_struct("S3Location")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_full_connection_string() {
        let location: S3Location = "bucket=flags key=a/b.json region=us-west-004 \
            endpoint=https://s3.us-west-004.backblazeb2.com access_key_id=id secret_access_key=shh"
            .parse()
            .unwrap();
        assert_eq!(location.region, "us-west-004");
        assert_eq!(location.bucket, "flags");
        assert_eq!(location.key, "a/b.json");
        assert_eq!(location.endpoint.as_deref(), Some("https://s3.us-west-004.backblazeb2.com"));
        assert_eq!(location.access_key_id.as_deref(), Some("id"));
        assert_eq!(location.secret_access_key.as_deref(), Some("shh"));
        assert!(!format!("{location:?}").contains("shh"));
    }

    #[rstest]
    #[case("bucket=flags key=flags.json", "missing `region`")]
    #[case("region=eu-west-1 key=flags.json", "missing `bucket`")]
    #[case("region=eu-west-1 bucket=flags key=", "missing `key`")]
    #[case("region=eu-west-1 bucket=flags key=k color=blue", "unknown field `color`")]
    #[case("region=eu-west-1 flags", "expected name=value, found `flags`")]
    fn test_parse_invalid(#[case] input: &str, #[case] message: &str) {
        let err = input.parse::<S3Location>().unwrap_err();
        match &*err {
            ErrorKind::InvalidConnection(m) => assert_eq!(m, message),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

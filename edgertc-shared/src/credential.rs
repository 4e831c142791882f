//! Credential providers (spec.md §9): the source presents three
//! concrete C providers sharing an "abstract base" struct with a
//! function-pointer `getCredentialsFn`. Here that collapses into one
//! trait with three value-typed implementations; no raw-pointer packing,
//! no internal fix-up on serialize/deserialize — `Credentials` owns its
//! three strings outright.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// AWS-style temporary credentials: access key, secret key, optional
/// session token, and an absolute expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: SystemTime,
}

impl Credentials {
    pub fn is_expired(&self, now: SystemTime, skew: Duration) -> bool {
        match self.expiration.checked_sub(skew) {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }
}

/// Replaces the source's function-pointer v-table
/// (`getCredentialsFn`) with a plain trait object.
pub trait CredentialProvider: Send {
    fn get_credentials(&mut self) -> Result<Credentials>;
}

/// Credentials supplied once by the embedder and returned unchanged.
/// Grounded on `static_credential_provider.c`.
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_credentials(&mut self) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Reads a `access_key,secret_key,session_token,expiration_epoch_secs`
/// line from a local file on every call. Grounded on
/// `file_credential_provider.c`. The actual filesystem read is the only
/// I/O this crate performs on behalf of credentials — HTTP-backed
/// providers (IoT) stay external per spec.md §1.
pub struct FileCredentialProvider {
    path: PathBuf,
}

impl FileCredentialProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(contents: &str) -> Result<Credentials> {
        let fields: Vec<&str> = contents.trim().split(',').collect();
        if fields.len() < 4 {
            return Err(Error::InvalidArgument(
                "credential file must have 4 comma-separated fields".into(),
            ));
        }
        let expiration_epoch: u64 = fields[3]
            .parse()
            .map_err(|_| Error::InvalidArgument("invalid expiration epoch".into()))?;
        Ok(Credentials {
            access_key_id: fields[0].to_string(),
            secret_access_key: fields[1].to_string(),
            session_token: if fields[2].is_empty() {
                None
            } else {
                Some(fields[2].to_string())
            },
            expiration: SystemTime::UNIX_EPOCH + Duration::from_secs(expiration_epoch),
        })
    }
}

impl CredentialProvider for FileCredentialProvider {
    fn get_credentials(&mut self) -> Result<Credentials> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Other(format!("reading credential file: {e}")))?;
        Self::parse(&contents)
    }
}

/// Identifies an AWS IoT Core certificate-based role-alias exchange.
/// The HTTPS call itself (`http_iot_credentials.c`) is an external
/// collaborator; this type only carries the parameters needed to make
/// it and the result of the most recent exchange.
#[derive(Debug, Clone)]
pub struct IotCertificateConfig {
    pub iot_endpoint: String,
    pub cert_path: PathBuf,
    pub private_key_path: PathBuf,
    pub ca_cert_path: Option<PathBuf>,
    pub role_alias: String,
    pub thing_name: String,
}

/// The exchange is delegated to an embedder-supplied closure so this
/// crate never links an HTTP client; `IotCredentialProvider` only owns
/// retry bookkeeping (spec.md §7: "Retries are applied only by
/// components that own a retry budget: ... the IoT-credential fetcher
/// (3 attempts)").
pub struct IotCredentialProvider<F>
where
    F: FnMut(&IotCertificateConfig) -> Result<Credentials> + Send,
{
    config: IotCertificateConfig,
    exchange: F,
    max_attempts: u32,
}

impl<F> IotCredentialProvider<F>
where
    F: FnMut(&IotCertificateConfig) -> Result<Credentials> + Send,
{
    pub fn new(config: IotCertificateConfig, exchange: F) -> Self {
        Self {
            config,
            exchange,
            max_attempts: 3,
        }
    }
}

impl<F> CredentialProvider for IotCredentialProvider<F>
where
    F: FnMut(&IotCertificateConfig) -> Result<Credentials> + Send,
{
    fn get_credentials(&mut self) -> Result<Credentials> {
        let mut last_err = Error::Other("iot credential exchange never attempted".into());
        for _ in 0..self.max_attempts {
            match (self.exchange)(&self.config) {
                Ok(creds) => return Ok(creds),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_returns_same_credentials() {
        let creds = Credentials {
            access_key_id: "AKIA".into(),
            secret_access_key: "secret".into(),
            session_token: None,
            expiration: SystemTime::now() + Duration::from_secs(3600),
        };
        let mut provider = StaticCredentialProvider::new(creds.clone());
        assert_eq!(provider.get_credentials().unwrap(), creds);
    }

    #[test]
    fn file_provider_parses_four_fields() {
        let parsed =
            FileCredentialProvider::parse("AKIA,secret,,1700000000").expect("should parse");
        assert_eq!(parsed.access_key_id, "AKIA");
        assert_eq!(parsed.session_token, None);
    }

    #[test]
    fn file_provider_rejects_short_line() {
        assert!(FileCredentialProvider::parse("AKIA,secret").is_err());
    }

    #[test]
    fn iot_provider_retries_up_to_three_times() {
        let config = IotCertificateConfig {
            iot_endpoint: "endpoint".into(),
            cert_path: "cert.pem".into(),
            private_key_path: "key.pem".into(),
            ca_cert_path: None,
            role_alias: "alias".into(),
            thing_name: "thing".into(),
        };
        use std::sync::atomic::{AtomicI32, Ordering};
        use std::sync::Arc;
        let attempts = Arc::new(AtomicI32::new(0));
        let counter = attempts.clone();
        let mut provider = IotCredentialProvider::new(config, move |_cfg| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Other("network down".into()))
        });
        assert!(provider.get_credentials().is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}

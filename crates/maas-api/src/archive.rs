// Ubuntu archive client
//
// Resolves a binary package through the `-updates` pocket's package index
// and downloads it, verifying the SHA256 recorded in the index.

use std::io::Read;

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::error::Error;
use crate::packages::{find_package, parse_index};
use crate::transport::TransportConfig;

/// HTTP client for an Ubuntu (ports) archive mirror.
pub struct ArchiveClient {
    http: reqwest::Client,
    release: String,
}

impl ArchiveClient {
    /// Create a new archive client for the given Ubuntu release codename.
    pub fn new(release: impl Into<String>, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            release: release.into(),
        })
    }

    /// Create an archive client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(release: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            release: release.into(),
        }
    }

    /// The release codename whose `-updates` pocket is searched.
    pub fn release(&self) -> &str {
        &self.release
    }

    /// URL of the compressed package index for `component`/`arch`.
    pub fn index_url(&self, archive: &Url, component: &str, arch: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/dists/{}-updates/{}/binary-{}/Packages.gz",
            archive.as_str().trim_end_matches('/'),
            self.release,
            component,
            arch
        );
        Ok(Url::parse(&full)?)
    }

    /// Download `package` from the archive.
    ///
    /// Returns the package bytes and its file name, or `None` when the
    /// index is missing or does not list the package.
    pub async fn get_updates_package(
        &self,
        package: &str,
        archive: &Url,
        component: &str,
        arch: &str,
    ) -> Result<Option<(Vec<u8>, String)>, Error> {
        let index_url = self.index_url(archive, component, arch)?;
        debug!("GET {}", index_url);

        let resp = self.http.get(index_url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let compressed = resp.error_for_status()?.bytes().await?;

        let mut text = String::new();
        GzDecoder::new(compressed.as_ref()).read_to_string(&mut text)?;

        let stanzas = parse_index(&text);
        let Some(stanza) = find_package(&stanzas, package) else {
            debug!(package, "package not listed in index");
            return Ok(None);
        };
        let Some(path) = stanza.filename() else {
            return Ok(None);
        };

        let package_url = Url::parse(&format!(
            "{}/{}",
            archive.as_str().trim_end_matches('/'),
            path
        ))?;
        debug!("GET {}", package_url);
        let data = self
            .http
            .get(package_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec();

        let filename = path.rsplit('/').next().unwrap_or(path).to_owned();

        if let Some(expected) = stanza.sha256() {
            let actual = hex::encode(Sha256::digest(&data));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(Error::Checksum {
                    filename,
                    expected: expected.to_owned(),
                    actual,
                });
            }
        }

        info!(
            package,
            version = stanza.version().unwrap_or("unknown"),
            bytes = data.len(),
            "downloaded package"
        );
        Ok(Some((data, filename)))
    }
}

use std::time::Duration;

use crate::error::DeployResult;

/// Seconds each external probe waits for a response.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Issues a GET and reports the HTTP status.
pub trait HttpProbe {
    fn get(&self, url: &str) -> DeployResult<u16>;
}

/// [`HttpProbe`] backed by a blocking reqwest client.
pub struct ReqwestProbe {
    client: reqwest::blocking::Client,
}

impl ReqwestProbe {
    pub fn new() -> DeployResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    fn get(&self, url: &str) -> DeployResult<u16> {
        let response = self.client.get(url).send()?;
        Ok(response.status().as_u16())
    }
}

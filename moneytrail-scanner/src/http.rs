use crate::driver::{Navigation, PageDriver};
use crate::error::DriverError;
use crate::links::collect_anchor_targets;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "moneytrail/0.1 (https://github.com/trapdoorsec/moneytrail)";
const MIN_CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

struct LoadedPage {
    url: String,
    body: String,
}

/// Page driver backed by plain HTTP fetches.
///
/// No script execution and no screenshots; the fetched body is the page
/// content. Cookies persist for the lifetime of the session so a login
/// performed through this driver carries over to the crawl.
pub struct HttpDriver {
    client: Option<Client>,
    timeout: Duration,
    current: Option<LoadedPage>,
}

impl HttpDriver {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(
            crate::policy::DEFAULT_NAVIGATION_TIMEOUT_MS,
        ))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: None,
            timeout,
            current: None,
        }
    }

    /// Half the request timeout, never below [`MIN_CONNECT_TIMEOUT`].
    fn connect_timeout(&self) -> Duration {
        (self.timeout / 2).max(MIN_CONNECT_TIMEOUT)
    }

    fn client(&self) -> Result<&Client, DriverError> {
        self.client.as_ref().ok_or(DriverError::Closed)
    }

    fn page(&self) -> Result<&LoadedPage, DriverError> {
        self.current
            .as_ref()
            .ok_or_else(|| DriverError::Capture("no page loaded".to_string()))
    }
}

impl Default for HttpDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDriver for HttpDriver {
    async fn open(&mut self) -> Result<(), DriverError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout())
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        self.client = Some(client);
        debug!("HTTP driver session opened");
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<Navigation, DriverError> {
        debug!("Fetching {}", url);
        let response = self.client()?.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::timeout(self.timeout, "navigating")
            } else {
                DriverError::Navigation(e.to_string())
            }
        })?;

        let final_url = response.url().to_string();
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        self.current = Some(LoadedPage {
            url: final_url.clone(),
            body,
        });

        Ok(Navigation {
            final_url,
            status_code: Some(status_code),
        })
    }

    fn current_url(&self) -> Option<String> {
        self.current.as_ref().map(|page| page.url.clone())
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        Ok(self.page()?.body.clone())
    }

    async fn screenshot(&mut self, _path: &Path) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("screenshot"))
    }

    async fn anchor_targets(&mut self) -> Result<Vec<String>, DriverError> {
        Ok(collect_anchor_targets(&self.page()?.body))
    }

    fn supports_screenshots(&self) -> bool {
        false
    }

    async fn close(&mut self) {
        self.current = None;
        if self.client.take().is_some() {
            debug!("HTTP driver session closed");
        }
    }
}

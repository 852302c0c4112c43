use crate::error::{Error, Result, TransportError};
use crate::provider::{PagesApi, Project};
use async_trait::async_trait;
use cloudflare::framework::Environment;
use cloudflare::framework::auth::Credentials;
use cloudflare::framework::client::ClientConfig;
use cloudflare::framework::client::async_api::Client;
use cloudflare::framework::endpoint::Method;
use cloudflare::framework::endpoint::spec::EndpointSpec;
use cloudflare::framework::response::{ApiFailure, ApiResult, ApiSuccess, ResponseInfo};
use serde::Deserialize;
use serde_json::Value;
use sweeper_config::constants;
use tracing::{debug, warn};

/// Picks the authentication scheme from whichever credentials are present,
/// preferring a scoped API token.
pub fn select_credentials(
    api_token: Option<String>,
    email: Option<String>,
    api_key: Option<String>,
) -> Result<Credentials> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    if let Some(token) = non_empty(api_token) {
        return Ok(Credentials::UserAuthToken { token });
    }

    match (non_empty(email), non_empty(api_key)) {
        (Some(email), Some(key)) => Ok(Credentials::UserAuthKey { email, key }),
        (None, Some(_)) => Err(Error::InvalidCredentials(
            "CLOUDFLARE_API_KEY requires CLOUDFLARE_EMAIL".to_string(),
        )),
        _ => Err(Error::InvalidCredentials(
            "set CLOUDFLARE_API_TOKEN or CLOUDFLARE_EMAIL and CLOUDFLARE_API_KEY".to_string(),
        )),
    }
}

/// The `result` member of a Cloudflare response, left undecoded so the
/// retention engine can judge its shape.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct PagesResult(Option<Value>);

impl ApiResult for PagesResult {}

impl PagesResult {
    fn into_value(self) -> Value {
        self.0.unwrap_or(Value::Null)
    }
}

type PagesResponse = ApiSuccess<PagesResult>;

#[derive(Debug)]
struct ListProjects<'a> {
    account_identifier: &'a str,
    page: u32,
}

impl EndpointSpec for ListProjects<'_> {
    type JsonResponse = PagesResult;
    type ResponseType = PagesResponse;

    fn method(&self) -> Method {
        Method::GET
    }

    fn path(&self) -> String {
        format!("accounts/{}/pages/projects", self.account_identifier)
    }

    #[inline]
    fn query(&self) -> Option<String> {
        Some(format!("page={}", self.page))
    }
}

#[derive(Debug)]
struct ListDeployments<'a> {
    account_identifier: &'a str,
    project_name: &'a str,
    page: u32,
}

impl EndpointSpec for ListDeployments<'_> {
    type JsonResponse = PagesResult;
    type ResponseType = PagesResponse;

    fn method(&self) -> Method {
        Method::GET
    }

    fn path(&self) -> String {
        format!(
            "accounts/{}/pages/projects/{}/deployments",
            self.account_identifier, self.project_name
        )
    }

    #[inline]
    fn query(&self) -> Option<String> {
        Some(format!("page={}", self.page))
    }
}

#[derive(Debug)]
struct DeleteDeployment<'a> {
    account_identifier: &'a str,
    project_name: &'a str,
    deployment_id: &'a str,
}

impl EndpointSpec for DeleteDeployment<'_> {
    type JsonResponse = PagesResult;
    type ResponseType = PagesResponse;

    fn method(&self) -> Method {
        Method::DELETE
    }

    fn path(&self) -> String {
        format!(
            "accounts/{}/pages/projects/{}/deployments/{}",
            self.account_identifier, self.project_name, self.deployment_id
        )
    }
}

pub struct CloudflareClient {
    client: Client,
    account_identifier: String,
}

impl CloudflareClient {
    pub fn new(account_id: String, credentials: Credentials) -> Result<Self> {
        Self::with_environment(account_id, credentials, Environment::Production)
    }

    /// Client against a non-production API root, such as a local mock server.
    pub fn with_base_url(
        base_url: &str,
        account_id: String,
        credentials: Credentials,
    ) -> Result<Self> {
        let environment = Environment::Custom(normalize_base_url(base_url)?);
        Self::with_environment(account_id, credentials, environment)
    }

    fn with_environment(
        account_id: String,
        credentials: Credentials,
        environment: Environment,
    ) -> Result<Self> {
        let config = ClientConfig {
            http_timeout: constants::HTTP_REQUEST_TIMEOUT,
            ..ClientConfig::default()
        };
        let client = Client::new(credentials, config, environment)?;

        Ok(Self {
            client,
            account_identifier: account_id,
        })
    }

    /// Sends one request, turning HTTP failures and error-bearing 2xx
    /// envelopes into a `TransportError`.
    async fn send<E>(&self, endpoint: &E) -> Result<PagesResponse>
    where
        E: EndpointSpec<JsonResponse = PagesResult, ResponseType = PagesResponse> + Send + Sync,
    {
        let name = format!("{} /{}", endpoint.method(), endpoint.path());
        debug!("Cloudflare request: {}", name);

        let response = self
            .client
            .request(endpoint)
            .await
            .map_err(|failure| transport_error(&name, failure))?;

        // `success: false` can arrive with a 2xx status; its errors array is
        // what tells it apart
        if !response.errors.is_empty() {
            return Err(TransportError {
                endpoint: name,
                status: None,
                reasons: response.errors.iter().map(describe).collect(),
            }
            .into());
        }

        Ok(response)
    }

    /// Fetches page 1, then appends the `result` arrays of the following
    /// pages onto it. Returns the merged result and the advertised page count.
    async fn collect_pages<E, F>(&self, max_pages: u32, endpoint_for: F) -> Result<(Value, u32)>
    where
        F: Fn(u32) -> E + Send + Sync,
        E: EndpointSpec<JsonResponse = PagesResult, ResponseType = PagesResponse> + Send + Sync,
    {
        let first = self.send(&endpoint_for(1)).await?;
        let advertised = total_pages(first.result_info.as_ref());
        let mut merged = first.result.into_value();

        for page in 2..=advertised.min(max_pages) {
            let Value::Array(all) = &mut merged else {
                break;
            };

            let next = self.send(&endpoint_for(page)).await?;
            match next.result.into_value() {
                Value::Array(more) => all.extend(more),
                _ => break,
            }
        }

        Ok((merged, advertised))
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let mut url = url::Url::parse(base_url.trim())
        .map_err(|e| Error::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

    if url.cannot_be_a_base() {
        return Err(Error::InvalidBaseUrl(base_url.to_string()));
    }

    // Endpoint paths are joined relative to the root
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url.to_string())
}

fn describe(info: &ResponseInfo) -> String {
    format!("{} (code {})", info.message, info.code)
}

fn transport_error(endpoint: &str, failure: ApiFailure) -> TransportError {
    match failure {
        ApiFailure::Error(status, api_errors) => {
            let mut reasons: Vec<String> = api_errors.errors.iter().map(describe).collect();
            if reasons.is_empty() {
                reasons.push(
                    status
                        .canonical_reason()
                        .unwrap_or("request unsuccessful")
                        .to_string(),
                );
            }

            TransportError {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                reasons,
            }
        }
        ApiFailure::Invalid(e) => TransportError {
            endpoint: endpoint.to_string(),
            status: e.status().map(|s| s.as_u16()),
            reasons: vec![e.to_string()],
        },
    }
}

/// Total page count advertised in `result_info`.
fn total_pages(result_info: Option<&Value>) -> u32 {
    result_info
        .and_then(|info| info.get("total_pages"))
        .and_then(Value::as_u64)
        .and_then(|pages| u32::try_from(pages).ok())
        .unwrap_or(1)
        .max(1)
}

#[async_trait]
impl PagesApi for CloudflareClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let endpoint_for = |page| ListProjects {
            account_identifier: &self.account_identifier,
            page,
        };
        let name = format!("GET /{}", endpoint_for(1).path());

        let (result, pages) = self
            .collect_pages(constants::MAX_PROJECT_PAGES, endpoint_for)
            .await?;

        if pages > constants::MAX_PROJECT_PAGES {
            warn!(
                "Project listing has {} pages; only the first {} were read",
                pages,
                constants::MAX_PROJECT_PAGES
            );
        }

        let projects: Vec<Project> = serde_json::from_value(result)
            .map_err(|e| TransportError::new(name, format!("unexpected project list: {}", e)))?;

        Ok(projects)
    }

    async fn list_deployments(&self, project_name: &str) -> Result<Value> {
        let (result, pages) = self
            .collect_pages(constants::MAX_DEPLOYMENT_PAGES, |page| ListDeployments {
                account_identifier: &self.account_identifier,
                project_name,
                page,
            })
            .await?;

        if pages > constants::MAX_DEPLOYMENT_PAGES {
            warn!(
                "Deployment listing for {} has {} pages; only the first {} were read",
                project_name,
                pages,
                constants::MAX_DEPLOYMENT_PAGES
            );
        }

        Ok(result)
    }

    async fn delete_deployment(&self, project_name: &str, deployment_id: &str) -> Result<()> {
        self.send(&DeleteDeployment {
            account_identifier: &self.account_identifier,
            project_name,
            deployment_id,
        })
        .await?;

        Ok(())
    }
}

use crate::cancel::CancelFlag;
use crate::project::{Project, ProjectCatalog};
use anyhow::{bail, Context, Result};
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::Client;
use std::time::Duration;

pub fn make_http_client(api_token: &str) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "PRIVATE_TOKEN",
        HeaderValue::from_str(api_token)
            .with_context(|| "Invalid token: cannot be set as HTTP header")?,
    );

    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .default_headers(headers)
        .build()
        .with_context(|| "Failed to create http client")
}

async fn fetch_projects_page(
    client: &Client,
    gitlab_url: &str,
    page: Option<&str>,
) -> Result<(Vec<Project>, Option<String>)> {
    let mut req = client.get(format!("{}/projects", gitlab_url)).query(&[
        ("simple", "true"),
        ("archived", "false"),
        ("per_page", "100"),
        ("sort_by", "id"),
        ("sort", "asc"),
    ]);
    if let Some(page) = page {
        req = req.query(&[("page", page)]);
    }
    log::debug!("page={:?}", page);

    let response = req.send().await?;
    // The cursor must be read before the body consumes the response.
    let next_page = response
        .headers()
        .get("X-Next-Page")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from);

    let json = response.text().await?;
    let projects: Vec<Project> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse projects from JSON: json={}", json))?;

    log::debug!(
        "Fetched projects: count={} next_page={:?}",
        projects.len(),
        next_page
    );
    Ok((projects, next_page))
}

/// Walks the listing endpoint page by page until a response carries an empty
/// `X-Next-Page` cursor. Any request or decode failure aborts the whole
/// enumeration; a partial catalog is never returned.
pub async fn fetch_projects(
    client: &Client,
    gitlab_url: &str,
    cancel: &CancelFlag,
) -> Result<ProjectCatalog> {
    let mut catalog = ProjectCatalog::new();
    let mut page: Option<String> = None;
    loop {
        if cancel.is_cancelled() {
            bail!("Interrupted while fetching projects");
        }

        let (projects, next_page) = fetch_projects_page(client, gitlab_url, page.as_deref())
            .await
            .with_context(|| "Failed to fetch projects")?;

        // Last write wins when two pages report the same path.
        for project in projects {
            catalog.insert(project.path_with_namespace.clone(), project);
        }

        match next_page {
            Some(next) => page = Some(next),
            None => break,
        }
    }

    log::info!("Found projects: count={}", catalog.len());
    Ok(catalog)
}

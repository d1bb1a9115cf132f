//! Jenkins REST client.
//!
//! [`JenkinsClient`] is bound to one resolved server and one [`Transport`].
//! It builds requests against the Jenkins JSON API, maps responses into the
//! records in [`crate::types`], and turns 404s into the matching
//! [`JenkinsError`] variant.
//!
//! ## Job addressing
//!
//! A full job name `a/b/c` lives at `{base}/job/a/job/b/job/c`. Every
//! endpoint below hangs off that path.
//!
//! ## Polling
//!
//! Two operations wait on the server: a triggered build waiting to leave the
//! queue, and a 403 on stop waiting to see whether the build ended anyway.
//! Both run under the client's [`RetryPolicy`] (ten attempts, one second
//! apart by default).

use std::ops::ControlFlow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::JenkinsError;
use crate::registry::ServerConfig;
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::{
    BuildInfo, JobChange, JobChangeStatus, JobInfo, JobParameter, QueueInfo, QueueStatus,
    StopResult, StopStatus, TriggerResult, TriggerStatus, CHOICE_PARAMETER,
};

const JOB_INFO_TREE: &str =
    "name,fullName,url,description,buildable,color,lastBuild[number,url]";
const PARAMETERIZED_TREE: &str = "property[parameterDefinitions[name]]";
const PARAMETERS_TREE: &str = "actions[parameterDefinitions[name,type,defaultParameterValue[value],choices]],property[parameterDefinitions[name,type,defaultParameterValue[value],choices]]";
const JOB_TREE: &str =
    "jobs[name,url,fullName,jobs[name,url,fullName,jobs[name,url,fullName,jobs[name,url,fullName]]]]";
const FOLDER_MODE: &str = "com.cloudbees.hudson.plugins.folder.Folder";

const FOLDER_CONFIG: &str = r#"<?xml version='1.1' encoding='UTF-8'?>
<com.cloudbees.hudson.plugins.folder.Folder plugin="cloudbees-folder">
  <actions/>
  <description></description>
  <properties/>
  <folderViews class="com.cloudbees.hudson.plugins.folder.views.DefaultFolderViewHolder">
    <views>
      <hudson.model.AllView>
        <owner class="com.cloudbees.hudson.plugins.folder.Folder" reference="../../../.."/>
        <name>all</name>
        <filterExecutors>false</filterExecutors>
        <filterQueue>false</filterQueue>
        <properties class="hudson.model.View$PropertyList"/>
      </hudson.model.AllView>
    </views>
    <tabBar class="hudson.views.DefaultViewsTabBar"/>
  </folderViews>
  <healthMetrics/>
  <icon class="com.cloudbees.hudson.plugins.folder.icons.StockFolderIcon"/>
</com.cloudbees.hudson.plugins.folder.Folder>"#;

static QUEUE_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/queue/item/(\d+)/").expect("queue item pattern is valid"));

/// `a/b` -> `/job/a/job/b`.
pub fn job_path(full_name: &str) -> String {
    full_name.split('/').map(|part| format!("/job/{part}")).collect()
}

/// Pipeline job config running `script` in the Groovy sandbox.
pub fn pipeline_config(description: &str, script: &str) -> String {
    format!(
        r#"<?xml version='1.1' encoding='UTF-8'?>
<flow-definition plugin="workflow-job">
  <actions/>
  <description>{}</description>
  <keepDependencies>false</keepDependencies>
  <properties/>
  <definition class="org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition" plugin="workflow-cps">
    <script>{}</script>
    <sandbox>true</sandbox>
  </definition>
  <triggers/>
  <disabled>false</disabled>
</flow-definition>"#,
        xml_escape(description),
        xml_escape(script)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Render a build parameter value for the query string. Nulls are dropped.
fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Extract the queue id from a build submission's `Location` header.
pub fn parse_queue_id(location: &str) -> Option<u64> {
    QUEUE_ITEM
        .captures(location)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// A job reference from the recursive job tree.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRef {
    pub name: String,
    pub full_name: String,
}

/// Flatten the nested `jobs` tree, qualifying names the server left bare.
pub fn collect_jobs(jobs: &[Value], parent: &str) -> Vec<JobRef> {
    let mut out = Vec::new();
    for job in jobs {
        let name = str_field(job, "name");
        let full_name = match job.get("fullName").and_then(Value::as_str) {
            Some(full) if !full.is_empty() => full.to_string(),
            _ if parent.is_empty() => name.clone(),
            _ => format!("{parent}/{name}"),
        };
        out.push(JobRef {
            name,
            full_name: full_name.clone(),
        });
        if let Some(children) = job.get("jobs").and_then(Value::as_array) {
            out.extend(collect_jobs(children, &full_name));
        }
    }
    out
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn bool_field(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn parse_parameter(def: &Value) -> JobParameter {
    let param_type = str_field(def, "type");
    let choices = if param_type == CHOICE_PARAMETER {
        def.get("choices").and_then(Value::as_array).cloned()
    } else {
        None
    };
    JobParameter {
        name: str_field(def, "name"),
        default: def
            .get("defaultParameterValue")
            .and_then(|d| d.get("value"))
            .filter(|v| !v.is_null())
            .cloned(),
        param_type,
        choices,
    }
}

/// Parameter definitions under `key` (`property` or `actions`).
fn definitions<'a>(data: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    data.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("parameterDefinitions").and_then(Value::as_array))
        .flatten()
}

/// Client for one Jenkins server.
pub struct JenkinsClient<T> {
    server_name: String,
    base_url: String,
    transport: T,
    poll: RetryPolicy,
}

impl<T: Transport> JenkinsClient<T> {
    pub fn new(server: &ServerConfig, transport: T) -> Self {
        Self {
            server_name: server.name.clone(),
            base_url: server.uri.trim_end_matches('/').to_string(),
            transport,
            poll: RetryPolicy::default(),
        }
    }

    /// Replace the policy used by both polling loops.
    pub fn with_poll_policy(mut self, poll: RetryPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn job_url(&self, full_name: &str) -> String {
        format!("{}{}", self.base_url, job_path(full_name))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, JenkinsError> {
        self.transport.send(request).await
    }

    fn job_not_found(&self, job: &str) -> JenkinsError {
        JenkinsError::JobNotFound {
            job: job.to_string(),
            server: self.server_name.clone(),
        }
    }

    fn build_not_found(&self, job: &str, number: u64) -> JenkinsError {
        JenkinsError::BuildNotFound {
            number,
            job: job.to_string(),
            server: self.server_name.clone(),
        }
    }

    pub async fn get_job_info(&self, full_name: &str) -> Result<JobInfo, JenkinsError> {
        let url = format!("{}/api/json", self.job_url(full_name));
        let resp = self
            .send(HttpRequest::get(&url).query("tree", JOB_INFO_TREE))
            .await?;
        if resp.status == 404 {
            return Err(self.job_not_found(full_name));
        }
        let data: Value = resp.error_for_status(&url)?.json()?;

        let last_build = data.get("lastBuild").filter(|v| v.is_object());
        Ok(JobInfo {
            name: str_field(&data, "name"),
            full_name: data
                .get("fullName")
                .and_then(Value::as_str)
                .unwrap_or(full_name)
                .to_string(),
            url: str_field(&data, "url"),
            description: data
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            buildable: bool_field(&data, "buildable"),
            color: data
                .get("color")
                .and_then(Value::as_str)
                .unwrap_or("grey")
                .to_string(),
            is_parameterized: self.is_job_parameterized(full_name).await,
            last_build_number: last_build.and_then(|b| b.get("number")).and_then(Value::as_u64),
            last_build_url: last_build
                .and_then(|b| b.get("url"))
                .and_then(Value::as_str)
                .map(String::from),
        })
    }

    /// Best effort: any failure reads as "not parameterized".
    async fn is_job_parameterized(&self, full_name: &str) -> bool {
        let url = format!("{}/api/json", self.job_url(full_name));
        let check = async {
            let resp = self
                .send(HttpRequest::get(&url).query("tree", PARAMETERIZED_TREE))
                .await?
                .error_for_status(&url)?;
            let data: Value = resp.json()?;
            let found = definitions(&data, "property").next().is_some();
            Ok::<_, JenkinsError>(found)
        };
        check.await.unwrap_or_else(|e| {
            tracing::warn!("Failed to check if job {} is parameterized: {}", full_name, e);
            false
        })
    }

    /// Parameter definitions from `property` then `actions`, not deduplicated.
    pub async fn get_job_parameters(
        &self,
        full_name: &str,
    ) -> Result<Vec<JobParameter>, JenkinsError> {
        let url = format!("{}/api/json", self.job_url(full_name));
        let data: Value = self
            .send(HttpRequest::get(&url).query("tree", PARAMETERS_TREE))
            .await?
            .error_for_status(&url)?
            .json()?;

        Ok(definitions(&data, "property")
            .chain(definitions(&data, "actions"))
            .map(parse_parameter)
            .collect())
    }

    /// Submit a build and wait for it to leave the queue.
    pub async fn trigger_build(
        &self,
        full_name: &str,
        params: &Map<String, Value>,
    ) -> Result<TriggerResult, JenkinsError> {
        let job_url = self.job_url(full_name);
        let parameterized = !self.get_job_parameters(full_name).await?.is_empty();

        let url = if parameterized {
            format!("{job_url}/buildWithParameters")
        } else {
            format!("{job_url}/build")
        };
        let mut request = HttpRequest::post(&url);
        if parameterized {
            for (key, value) in params {
                if let Some(v) = param_value(value) {
                    request = request.query(key.as_str(), v);
                }
            }
        }

        let resp = self.send(request).await?.error_for_status(&url)?;
        let location = resp.header("location").unwrap_or_default().to_string();
        let queue_id = parse_queue_id(&location);
        tracing::info!(
            "Triggered {} on {} (queue id {:?})",
            full_name,
            self.server_name,
            queue_id
        );

        self.wait_for_build_start(queue_id, location).await
    }

    /// Poll the queue until a build number appears. Without a queue id the
    /// full budget is still spent before reporting `QUEUED`.
    pub async fn wait_for_build_start(
        &self,
        queue_id: Option<u64>,
        queue_url: String,
    ) -> Result<TriggerResult, JenkinsError> {
        let started = self
            .poll
            .run(|_| async move {
                let Some(id) = queue_id else {
                    return ControlFlow::Continue(());
                };
                match self.get_queue_info(id).await {
                    Ok(QueueInfo {
                        build_number: Some(number),
                        build_url,
                        ..
                    }) => ControlFlow::Break(Ok((number, build_url))),
                    Ok(_) => ControlFlow::Continue(()),
                    Err(e) => ControlFlow::Break(Err(e)),
                }
            })
            .await;

        match started {
            Some(Ok((number, build_url))) => Ok(TriggerResult {
                status: TriggerStatus::BuildStarted,
                build_number: Some(number),
                build_url,
                queue_id,
                queue_url: Some(queue_url),
                message: None,
            }),
            Some(Err(e)) => Err(e),
            None => Ok(TriggerResult {
                status: TriggerStatus::Queued,
                build_number: None,
                build_url: None,
                queue_id,
                queue_url: Some(queue_url),
                message: Some("Build is queued but did not start within 10 seconds".to_string()),
            }),
        }
    }

    /// A 404 is reported as `NOT_FOUND`, not as an error.
    pub async fn get_queue_info(&self, queue_id: u64) -> Result<QueueInfo, JenkinsError> {
        let url = format!("{}/queue/item/{}/api/json", self.base_url, queue_id);
        let resp = self.send(HttpRequest::get(&url)).await?;
        if resp.status == 404 {
            return Ok(QueueInfo {
                queue_id,
                blocked: false,
                buildable: false,
                stuck: false,
                why: Some("Item not found".to_string()),
                build_number: None,
                build_url: None,
                status: QueueStatus::NotFound,
            });
        }
        let data: Value = resp.error_for_status(&url)?.json()?;

        let executable = data
            .get("executable")
            .and_then(Value::as_object)
            .filter(|e| !e.is_empty());
        Ok(QueueInfo {
            queue_id,
            blocked: bool_field(&data, "blocked"),
            buildable: bool_field(&data, "buildable"),
            stuck: bool_field(&data, "stuck"),
            why: data.get("why").and_then(Value::as_str).map(String::from),
            build_number: executable.and_then(|e| e.get("number")).and_then(Value::as_u64),
            build_url: executable
                .and_then(|e| e.get("url"))
                .and_then(Value::as_str)
                .map(String::from),
            status: if executable.is_some() {
                QueueStatus::BuildStarted
            } else {
                QueueStatus::Queued
            },
        })
    }

    pub async fn get_build_status(
        &self,
        full_name: &str,
        number: u64,
    ) -> Result<BuildInfo, JenkinsError> {
        let url = format!("{}/{}/api/json", self.job_url(full_name), number);
        let resp = self.send(HttpRequest::get(&url)).await?;
        if resp.status == 404 {
            return Err(self.build_not_found(full_name, number));
        }
        let data: Value = resp.error_for_status(&url)?.json()?;
        Ok(BuildInfo {
            number: data.get("number").and_then(Value::as_u64).unwrap_or(number),
            result: data.get("result").and_then(Value::as_str).map(String::from),
            building: bool_field(&data, "building"),
            url: str_field(&data, "url"),
            timestamp: data.get("timestamp").and_then(Value::as_i64).unwrap_or(0),
            duration: data.get("duration").and_then(Value::as_i64).unwrap_or(0),
        })
    }

    pub async fn stop_build(&self, full_name: &str, number: u64) -> Result<StopResult, JenkinsError> {
        let url = format!("{}/{}/stop", self.job_url(full_name), number);
        let resp = self.send(HttpRequest::post(&url)).await?;
        match resp.status {
            404 => Ok(StopResult::with_status(StopStatus::NotFound)),
            403 => self.reconcile_stop(full_name, number).await,
            _ => {
                resp.error_for_status(&url)?;
                Ok(StopResult {
                    status: StopStatus::StopRequested,
                    url: Some(url),
                })
            }
        }
    }

    /// After a 403 on stop, watch the build. If it is no longer running, or
    /// can no longer be looked up, it counts as terminated. Only a build that
    /// keeps running through the whole budget is a real permission failure.
    async fn reconcile_stop(&self, full_name: &str, number: u64) -> Result<StopResult, JenkinsError> {
        let terminated = self
            .poll
            .run(|attempt| async move {
                match self.get_build_status(full_name, number).await {
                    Ok(build) if !build.building => ControlFlow::Break(()),
                    Ok(_) => {
                        tracing::debug!(
                            "Build {}#{} still running after denied stop (check {})",
                            full_name,
                            number,
                            attempt
                        );
                        ControlFlow::Continue(())
                    }
                    Err(e) => {
                        tracing::debug!("Build {}#{} lookup failed: {}", full_name, number, e);
                        ControlFlow::Break(())
                    }
                }
            })
            .await;

        match terminated {
            Some(()) => Ok(StopResult::with_status(StopStatus::AlreadyTerminated)),
            None => Err(JenkinsError::Permission {
                operation: "stop build".to_string(),
                resource: format!("{full_name}#{number}"),
            }),
        }
    }

    /// Raw console text, unparsed.
    pub async fn get_build_log(&self, full_name: &str, number: u64) -> Result<String, JenkinsError> {
        let url = format!("{}/{}/consoleText", self.job_url(full_name), number);
        let resp = self.send(HttpRequest::get(&url)).await?;
        if resp.status == 404 {
            return Err(self.build_not_found(full_name, number));
        }
        Ok(resp.error_for_status(&url)?.body)
    }

    /// Case-insensitive match on name or full name across four folder
    /// levels. Each match is re-fetched for its full [`JobInfo`].
    pub async fn search_jobs(&self, keyword: &str) -> Result<Vec<JobInfo>, JenkinsError> {
        let url = format!("{}/api/json", self.base_url);
        let data: Value = self
            .send(HttpRequest::get(&url).query("tree", JOB_TREE))
            .await?
            .error_for_status(&url)?
            .json()?;

        let jobs = data
            .get("jobs")
            .and_then(Value::as_array)
            .map(|jobs| collect_jobs(jobs, ""))
            .unwrap_or_default();

        let needle = keyword.to_lowercase();
        let mut matches = Vec::new();
        for job in jobs.iter().filter(|j| {
            j.name.to_lowercase().contains(&needle) || j.full_name.to_lowercase().contains(&needle)
        }) {
            matches.push(self.get_job_info(&job.full_name).await?);
        }
        Ok(matches)
    }

    /// Create `job_name` inside `folder_path`, creating missing folders first.
    pub async fn create_job(
        &self,
        job_name: &str,
        config_xml: &str,
        folder_path: &str,
    ) -> Result<JobChange, JenkinsError> {
        let (create_url, job_url) = if folder_path.is_empty() {
            (
                format!("{}/createItem", self.base_url),
                format!("{}/job/{}", self.base_url, job_name),
            )
        } else {
            self.ensure_folders_exist(folder_path).await?;
            let folder_url = self.job_url(folder_path);
            (
                format!("{folder_url}/createItem"),
                format!("{folder_url}/job/{job_name}"),
            )
        };

        let resp = self
            .send(HttpRequest::post(&create_url).query("name", job_name).xml(config_xml))
            .await?;
        if resp.status == 400 {
            return Err(JenkinsError::Failed(format!(
                "Job creation failed: Job '{job_name}' already exists or invalid configuration"
            )));
        }
        resp.error_for_status(&create_url)?;
        tracing::info!("Created job {} on {}", job_url, self.server_name);

        Ok(JobChange {
            status: JobChangeStatus::Created,
            job_name: job_name.to_string(),
            job_url,
            folder_path: folder_path.to_string(),
        })
    }

    /// Walk `a/b/c` creating `a`, `a/b`, `a/b/c` as needed.
    async fn ensure_folders_exist(&self, folder_path: &str) -> Result<(), JenkinsError> {
        let mut current = String::new();
        for segment in folder_path.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            if !self.folder_exists(&current).await {
                self.create_folder(&current, segment).await?;
            }
        }
        Ok(())
    }

    /// Best effort: any failure reads as "absent".
    async fn folder_exists(&self, folder_path: &str) -> bool {
        let url = format!("{}/api/json", self.job_url(folder_path));
        match self.send(HttpRequest::get(&url)).await {
            Ok(resp) => (200..300).contains(&resp.status),
            Err(e) => {
                tracing::debug!("Folder lookup for {} failed: {}", folder_path, e);
                false
            }
        }
    }

    async fn create_folder(&self, folder_path: &str, folder_name: &str) -> Result<(), JenkinsError> {
        let create_url = match folder_path.rsplit_once('/') {
            Some((parent, _)) => format!("{}/createItem", self.job_url(parent)),
            None => format!("{}/createItem", self.base_url),
        };
        let resp = self
            .send(
                HttpRequest::post(&create_url)
                    .query("name", folder_name)
                    .query("mode", FOLDER_MODE)
                    .xml(FOLDER_CONFIG),
            )
            .await?;

        if resp.status == 400 {
            // Lost a race or the folder already exists under another type.
            if !self.folder_exists(folder_path).await {
                return Err(JenkinsError::Failed(format!(
                    "Failed to create folder '{folder_name}'"
                )));
            }
            return Ok(());
        }
        resp.error_for_status(&create_url)?;
        tracing::info!("Created folder {} on {}", folder_path, self.server_name);
        Ok(())
    }

    /// Replace the config of an existing job, attaching a CSRF crumb when
    /// the server issues one.
    pub async fn update_job(
        &self,
        job_name: &str,
        config_xml: &str,
        folder_path: &str,
    ) -> Result<JobChange, JenkinsError> {
        let job_url = if folder_path.is_empty() {
            format!("{}/job/{}", self.base_url, job_name)
        } else {
            format!("{}/job/{}", self.job_url(folder_path), job_name)
        };
        let update_url = format!("{job_url}/config.xml");

        let mut request = HttpRequest::post(&update_url).xml(config_xml);
        if let Some((field, crumb)) = self.get_crumb().await {
            request = request.header(field, crumb);
        }

        let resp = self.send(request).await?;
        if resp.status == 404 {
            return Err(JenkinsError::Failed(format!(
                "Job update failed: Job '{job_name}' not found"
            )));
        }
        resp.error_for_status(&update_url)?;
        tracing::info!("Updated job {} on {}", job_url, self.server_name);

        Ok(JobChange {
            status: JobChangeStatus::Updated,
            job_name: job_name.to_string(),
            job_url,
            folder_path: folder_path.to_string(),
        })
    }

    /// `(header, value)` from the crumb issuer, or `None` if CSRF protection
    /// is off or the lookup fails.
    async fn get_crumb(&self) -> Option<(String, String)> {
        let url = format!("{}/crumbIssuer/api/json", self.base_url);
        let resp = self.send(HttpRequest::get(&url)).await.ok()?;
        if resp.status != 200 {
            return None;
        }
        let data: Value = resp.json().ok()?;
        let field = data.get("crumbRequestField")?.as_str()?.to_string();
        let crumb = data.get("crumb")?.as_str()?.to_string();
        Some((field, crumb))
    }
}

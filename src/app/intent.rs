use super::flow::{DownloadFlow, FlowOutcome};
use crate::beatmap::Backend;
use crate::error::Result;
use crate::source::SourceResolver;
use regex::Regex;

/// Result of handling launch arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    /// No deep link in the arguments
    NoLink,
    NotFound { backend: Backend, set_id: u64 },
    Declined,
    Download(FlowOutcome),
}

/// Extract the set id from a `<scheme>://<digits>/` deep link.
///
/// Arguments are joined with spaces first, since shells and browsers split
/// the link unpredictably.
pub fn parse_set_id(args: &[String], scheme: &str) -> Option<u64> {
    let joined = args.join(" ");
    let pattern = format!(r"{}://(\d+)/", regex::escape(scheme));
    let re = Regex::new(&pattern).ok()?;
    re.captures(&joined)?.get(1)?.as_str().parse().ok()
}

/// Turns a deep link into a confirmed download
pub struct IntentHandler {
    resolver: SourceResolver,
    flow: DownloadFlow,
    scheme: String,
}

impl IntentHandler {
    pub fn new(resolver: SourceResolver, flow: DownloadFlow, scheme: impl Into<String>) -> Self {
        Self {
            resolver,
            flow,
            scheme: scheme.into(),
        }
    }

    pub async fn handle(&self, args: &[String]) -> Result<IntentOutcome> {
        let Some(set_id) = parse_set_id(args, &self.scheme) else {
            return Ok(IntentOutcome::NoLink);
        };
        tracing::info!(set_id, "Handling deep link");

        let backend = self.resolver.active_backend().await;
        let Some(set) = self.resolver.resolve_by_id(set_id).await? else {
            tracing::warn!(set_id, %backend, "Deep link points at an unknown set");
            return Ok(IntentOutcome::NotFound { backend, set_id });
        };

        if !self.flow.ask(&set, |p, s| p.confirm_download(s)).await {
            return Ok(IntentOutcome::Declined);
        }

        Ok(IntentOutcome::Download(self.flow.download_set(&set).await?))
    }
}

use std::time::Duration;

use crate::api::moderation::build_classifier;
use crate::config::PipelineConfig;
use crate::core::pipeline::{Orchestrator, OrchestratorSettings};
use crate::core::remote::{AirtableClient, DriveUploader, HttpFetcher, RemoteError};
use crate::core::video::FfmpegCompiler;

/// Wire the production collaborators from `config`
pub fn build_orchestrator(config: &PipelineConfig) -> Result<Orchestrator, RemoteError> {
    let store = AirtableClient::new(&config.airtable)?;
    let fetcher = HttpFetcher::new(Duration::from_secs(config.pipeline.fetch_timeout_secs))?;
    let uploader = DriveUploader::new(&config.drive)?;
    let compiler = FfmpegCompiler::new(config.compile.settings());

    Ok(Orchestrator::new(
        Box::new(store),
        Box::new(fetcher),
        Box::new(uploader),
        build_classifier(config),
        Box::new(compiler),
        orchestrator_settings(config),
    ))
}

fn orchestrator_settings(config: &PipelineConfig) -> OrchestratorSettings {
    OrchestratorSettings {
        downloads_dir: config.pipeline.downloads_dir.clone(),
        batch_size: config.pipeline.batch_size,
        max_batches: config.pipeline.max_batches,
        tos_field: config.airtable.tos_field.clone(),
        template_field: config.airtable.template_field.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_follow_config() {
        let mut config = PipelineConfig::default();
        config.pipeline.batch_size = 5;
        config.pipeline.max_batches = Some(2);
        config.airtable.tos_field = "Flagged".into();

        let settings = orchestrator_settings(&config);
        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.max_batches, Some(2));
        assert_eq!(settings.tos_field, "Flagged");
        assert_eq!(settings.template_field, "BABE PAGE TEMPLATE USED");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(matches!(
            build_orchestrator(&PipelineConfig::default()),
            Err(RemoteError::MissingField(_))
        ));
    }
}

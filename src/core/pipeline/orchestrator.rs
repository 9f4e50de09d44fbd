use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde_json::Value;

use crate::core::pipeline::batch::{compilation_name, AcceptedVideo, BatchAccumulator};
use crate::core::pipeline::error::PipelineError;
use crate::core::remote::{BlobFetch, BlobStore, RecordStore};
use crate::core::video::classifier::ViolationClassifier;
use crate::core::video::compiler::VideoCompiler;
use crate::core::video::frame::VideoSource;
use crate::core::video::workspace::sanitize_id;
use crate::models::record::CandidateVideo;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub downloads_dir: PathBuf,
    pub batch_size: usize,
    pub max_batches: Option<usize>,
    pub tos_field: String,
    pub template_field: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            downloads_dir: PathBuf::from("downloads"),
            batch_size: 3,
            max_batches: None,
            tos_field: "TOS DETECTED".to_string(),
            template_field: "BABE PAGE TEMPLATE USED".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledBatch {
    pub record_ids: Vec<String>,
    pub output_name: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Candidates processed before the run ended
    pub candidates: usize,
    /// No download URL
    pub skipped: usize,
    pub violations: usize,
    /// Download, save or classification failures
    pub failures: usize,
    pub accepted: usize,
    /// Accepted videos dropped because their batch never filled
    pub leftover: usize,
    pub batches: Vec<CompiledBatch>,
}

enum Outcome {
    Skipped,
    Violation,
    Accepted(AcceptedVideo),
}

pub struct Orchestrator {
    store: Box<dyn RecordStore>,
    fetcher: Box<dyn BlobFetch>,
    uploader: Box<dyn BlobStore>,
    classifier: ViolationClassifier,
    compiler: Box<dyn VideoCompiler>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        store: Box<dyn RecordStore>,
        fetcher: Box<dyn BlobFetch>,
        uploader: Box<dyn BlobStore>,
        classifier: ViolationClassifier,
        compiler: Box<dyn VideoCompiler>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            uploader,
            classifier,
            compiler,
            settings,
        }
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let candidates = self
            .store
            .fetch_candidates()
            .map_err(PipelineError::Candidates)?;
        info!("🚀 {} candidate video(s) to review", candidates.len());

        let mut summary = RunSummary::default();
        let mut batch = BatchAccumulator::new(self.settings.batch_size);

        for candidate in &candidates {
            if let Some(max) = self.settings.max_batches {
                if summary.batches.len() >= max {
                    info!("🛑 Reached {} batch(es), stopping", max);
                    break;
                }
            }

            summary.candidates += 1;
            match self.process_candidate(candidate) {
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Ok(Outcome::Violation) => summary.violations += 1,
                Ok(Outcome::Accepted(video)) => {
                    summary.accepted += 1;
                    if batch.push(video) {
                        if let Some(compiled) = self.flush(&mut batch)? {
                            summary.batches.push(compiled);
                        }
                    }
                }
                Err(e) => {
                    error!("❌ {}", e);
                    summary.failures += 1;
                }
            }
        }

        if !batch.is_empty() {
            let leftover = batch.take();
            let ids: Vec<&str> = leftover.iter().map(|v| v.record_id.as_str()).collect();
            warn!(
                "⏳ {} accepted video(s) left without a full batch: {:?}",
                leftover.len(),
                ids
            );
            summary.leftover = leftover.len();
            remove_videos(&leftover);
        }

        info!(
            "🏁 Done: {} candidate(s), {} violation(s), {} failure(s), {} skipped, {} batch(es)",
            summary.candidates,
            summary.violations,
            summary.failures,
            summary.skipped,
            summary.batches.len()
        );
        Ok(summary)
    }

    fn process_candidate(&self, candidate: &CandidateVideo) -> Result<Outcome, PipelineError> {
        let record_id = candidate.record_id.as_str();
        let Some(url) = candidate.download_url.as_deref() else {
            warn!("⏭️ {} has no download URL, skipping", record_id);
            return Ok(Outcome::Skipped);
        };

        let bytes = self
            .fetcher
            .fetch(url)
            .map_err(|source| PipelineError::Fetch {
                record_id: record_id.to_string(),
                source,
            })?;

        let path = self
            .save_video(record_id, &bytes)
            .map_err(|source| PipelineError::Save {
                record_id: record_id.to_string(),
                source,
            })?;
        drop(bytes);

        let verdict = match self
            .classifier
            .classify(record_id, &VideoSource::Path(path.clone()))
        {
            Ok(classification) => classification.into_verdict(),
            Err(source) => {
                remove_file(&path);
                return Err(PipelineError::Classify {
                    record_id: record_id.to_string(),
                    source,
                });
            }
        };

        if verdict.violation {
            warn!(
                "🚫 {} violates ToS: {:?}",
                record_id,
                verdict.offending_text.as_deref().unwrap_or_default()
            );
            if let Err(e) = self.mark(record_id, &self.settings.tos_field) {
                error!("❌ {}", e);
            }
            remove_file(&path);
            return Ok(Outcome::Violation);
        }

        info!("👍 {} accepted", record_id);
        Ok(Outcome::Accepted(AcceptedVideo {
            record_id: record_id.to_string(),
            path,
        }))
    }

    fn save_video(&self, record_id: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.settings.downloads_dir)?;
        let path = self
            .settings
            .downloads_dir
            .join(format!("{}.mp4", sanitize_id(record_id)));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    fn mark(&self, record_id: &str, field: &str) -> Result<(), PipelineError> {
        self.store
            .mark(record_id, field, Value::Bool(true))
            .map_err(|source| PipelineError::Mark {
                record_id: record_id.to_string(),
                field: field.to_string(),
                source,
            })
    }

    /// Compile, upload and mark a full batch. The batch is always emptied.
    fn flush(&self, batch: &mut BatchAccumulator) -> Result<Option<CompiledBatch>, PipelineError> {
        let videos = batch.take();
        let record_ids: Vec<String> = videos.iter().map(|v| v.record_id.clone()).collect();

        if let Some(missing) = videos.iter().find(|v| !v.path.is_file()) {
            warn!(
                "⚠️ {:?} for {} disappeared, dropping batch {:?}",
                missing.path, missing.record_id, record_ids
            );
            remove_videos(&videos);
            return Ok(None);
        }

        let output_name = compilation_name(&videos);
        let output = self.settings.downloads_dir.join(&output_name);
        let inputs: Vec<PathBuf> = videos.iter().map(|v| v.path.clone()).collect();

        if let Err(source) = self.compiler.compile(&inputs, &output) {
            remove_videos(&videos);
            remove_file(&output);
            return Err(PipelineError::Compile { record_ids, source });
        }

        let link = match self.uploader.upload(&output, &output_name) {
            Ok(link) => link,
            Err(source) => {
                remove_videos(&videos);
                remove_file(&output);
                return Err(PipelineError::Upload {
                    name: output_name,
                    source,
                });
            }
        };
        info!("📦 Uploaded {} -> {}", output_name, link);

        for record_id in &record_ids {
            if let Err(e) = self.mark(record_id, &self.settings.template_field) {
                error!("❌ {}", e);
            }
        }

        remove_videos(&videos);
        remove_file(&output);

        Ok(Some(CompiledBatch {
            record_ids,
            output_name,
            link,
        }))
    }
}

fn remove_videos(videos: &[AcceptedVideo]) {
    for video in videos {
        remove_file(&video.path);
    }
}

fn remove_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("⚠️ Failed to remove {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::remote::RemoteError;
    use crate::core::video::error::VideoError;
    use crate::core::video::sampler::FrameSampler;
    use crate::core::video::testing::ScriptedDecoder;
    use crate::core::video::text_detector::MockTextDetector;
    use crate::core::video::workspace::{CleanupPolicy, WorkspaceFactory};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    // Video bodies are frame scripts for ScriptedDecoder: `|` separates frames
    const CLEAN: &[u8] = b"||";
    const DIRTY: &[u8] = b"||SUBSCRIBE NOW|";

    #[derive(Default)]
    struct FakeStore {
        candidates: Vec<CandidateVideo>,
        fail_listing: bool,
        fail_marks: bool,
        marks: Mutex<Vec<(String, String)>>,
    }

    impl FakeStore {
        fn with(ids: &[&str]) -> Self {
            Self {
                candidates: ids
                    .iter()
                    .map(|id| CandidateVideo {
                        record_id: id.to_string(),
                        download_url: Some(format!("https://cdn.test/{}.mp4", id)),
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn marks(&self) -> Vec<(String, String)> {
            self.marks.lock().unwrap().clone()
        }
    }

    impl RecordStore for FakeStore {
        fn fetch_candidates(&self) -> Result<Vec<CandidateVideo>, RemoteError> {
            if self.fail_listing {
                return Err(RemoteError::Status {
                    status: 401,
                    body: "AUTHENTICATION_REQUIRED".into(),
                });
            }
            Ok(self.candidates.clone())
        }

        fn mark(&self, record_id: &str, field: &str, value: Value) -> Result<(), RemoteError> {
            assert_eq!(value, Value::Bool(true));
            if self.fail_marks {
                return Err(RemoteError::Status {
                    status: 422,
                    body: "INVALID_VALUE_FOR_COLUMN".into(),
                });
            }
            self.marks
                .lock()
                .unwrap()
                .push((record_id.to_string(), field.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        bodies: HashMap<String, Vec<u8>>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn serve(mut self, id: &str, body: &[u8]) -> Self {
            self.bodies
                .insert(format!("https://cdn.test/{}.mp4", id), body.to_vec());
            self
        }

        fn fetched(&self) -> usize {
            self.fetched.lock().unwrap().len()
        }
    }

    impl BlobFetch for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
            self.fetched.lock().unwrap().push(url.to_string());
            self.bodies.get(url).cloned().ok_or(RemoteError::Status {
                status: 404,
                body: "Not Found".into(),
            })
        }
    }

    #[derive(Default)]
    struct FakeUploader {
        fail: bool,
        uploads: Mutex<Vec<String>>,
    }

    impl BlobStore for FakeUploader {
        fn upload(&self, path: &Path, name: &str) -> Result<String, RemoteError> {
            assert!(path.is_file(), "compiled output must exist at upload time");
            if self.fail {
                return Err(RemoteError::Status {
                    status: 503,
                    body: "backendError".into(),
                });
            }
            self.uploads.lock().unwrap().push(name.to_string());
            Ok(format!("https://drive.test/{}", name))
        }
    }

    #[derive(Default)]
    struct FakeCompiler {
        fail: bool,
        calls: Mutex<Vec<Vec<PathBuf>>>,
    }

    impl FakeCompiler {
        fn calls(&self) -> Vec<Vec<PathBuf>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl VideoCompiler for FakeCompiler {
        fn compile(&self, inputs: &[PathBuf], output: &Path) -> Result<(), VideoError> {
            self.calls.lock().unwrap().push(inputs.to_vec());
            if self.fail {
                return Err(VideoError::CompileFailed("encoder exploded".into()));
            }
            fs::write(output, b"compiled")?;
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        downloads: PathBuf,
        store: Arc<FakeStore>,
        fetcher: Arc<FakeFetcher>,
        uploader: Arc<FakeUploader>,
        compiler: Arc<FakeCompiler>,
        orchestrator: Orchestrator,
    }

    fn harness(
        store: FakeStore,
        fetcher: FakeFetcher,
        compiler: FakeCompiler,
        max_batches: Option<usize>,
    ) -> Harness {
        harness_with_uploader(store, fetcher, FakeUploader::default(), compiler, max_batches)
    }

    fn harness_with_uploader(
        store: FakeStore,
        fetcher: FakeFetcher,
        uploader: FakeUploader,
        compiler: FakeCompiler,
        max_batches: Option<usize>,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        let store = Arc::new(store);
        let fetcher = Arc::new(fetcher);
        let uploader = Arc::new(uploader);
        let compiler = Arc::new(compiler);

        let sampler = FrameSampler::new(
            Box::new(ScriptedDecoder),
            WorkspaceFactory::new(dir.path().join("frames"), CleanupPolicy::Erase),
        );
        let classifier =
            ViolationClassifier::new(sampler, Box::new(MockTextDetector::reading_frame_files()));

        let orchestrator = Orchestrator::new(
            Box::new(store.clone()),
            Box::new(fetcher.clone()),
            Box::new(uploader.clone()),
            classifier,
            Box::new(compiler.clone()),
            OrchestratorSettings {
                downloads_dir: downloads.clone(),
                max_batches,
                ..OrchestratorSettings::default()
            },
        );

        Harness {
            _dir: dir,
            downloads,
            store,
            fetcher,
            uploader,
            compiler,
            orchestrator,
        }
    }

    fn leftover_files(dir: &Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_three_clean_videos_make_one_compilation() {
        let fetcher = FakeFetcher::default()
            .serve("recA", CLEAN)
            .serve("recB", CLEAN)
            .serve("recC", CLEAN);
        let h = harness(
            FakeStore::with(&["recA", "recB", "recC"]),
            fetcher,
            FakeCompiler::default(),
            None,
        );

        let summary = h.orchestrator.run().unwrap();

        let calls = h.compiler.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec![
                h.downloads.join("recA.mp4"),
                h.downloads.join("recB.mp4"),
                h.downloads.join("recC.mp4"),
            ]
        );
        assert_eq!(
            *h.uploader.uploads.lock().unwrap(),
            vec!["minicomp_recA_recB_recC.mp4".to_string()]
        );
        assert_eq!(
            summary.batches,
            vec![CompiledBatch {
                record_ids: vec!["recA".into(), "recB".into(), "recC".into()],
                output_name: "minicomp_recA_recB_recC.mp4".into(),
                link: "https://drive.test/minicomp_recA_recB_recC.mp4".into(),
            }]
        );

        let marks = h.store.marks();
        assert_eq!(marks.len(), 3);
        assert!(marks.iter().all(|(_, f)| f == "BABE PAGE TEMPLATE USED"));
        assert!(leftover_files(&h.downloads).is_empty());
    }

    #[test]
    fn test_violation_is_marked_and_not_batched() {
        let fetcher = FakeFetcher::default()
            .serve("recA", CLEAN)
            .serve("recX", DIRTY)
            .serve("recB", CLEAN)
            .serve("recC", CLEAN);
        let h = harness(
            FakeStore::with(&["recA", "recX", "recB", "recC"]),
            fetcher,
            FakeCompiler::default(),
            None,
        );

        let summary = h.orchestrator.run().unwrap();

        assert_eq!(summary.violations, 1);
        assert_eq!(summary.accepted, 3);
        assert!(h
            .store
            .marks()
            .contains(&("recX".to_string(), "TOS DETECTED".to_string())));

        let calls = h.compiler.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].contains(&h.downloads.join("recX.mp4")));
        assert!(!h.downloads.join("recX.mp4").exists());
    }

    #[test]
    fn test_fetch_failure_and_missing_url_are_skipped() {
        let mut store = FakeStore::with(&["recGone", "recA", "recB", "recC"]);
        store.candidates.insert(
            0,
            CandidateVideo {
                record_id: "recNoUrl".into(),
                download_url: None,
            },
        );
        let fetcher = FakeFetcher::default()
            .serve("recA", CLEAN)
            .serve("recB", CLEAN)
            .serve("recC", CLEAN);
        let h = harness(store, fetcher, FakeCompiler::default(), None);

        let summary = h.orchestrator.run().unwrap();

        assert_eq!(summary.candidates, 5);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.batches.len(), 1);
        assert_eq!(h.fetcher.fetched(), 4);
    }

    #[test]
    fn test_unreadable_video_counts_as_failure() {
        let fetcher = FakeFetcher::default().serve("recBad", b"");
        let h = harness(
            FakeStore::with(&["recBad"]),
            fetcher,
            FakeCompiler::default(),
            None,
        );

        let summary = h.orchestrator.run().unwrap();

        assert_eq!(summary.failures, 1);
        assert_eq!(summary.accepted, 0);
        assert!(h.store.marks().is_empty());
        assert!(!h.downloads.join("recBad.mp4").exists());
    }

    #[test]
    fn test_compile_failure_halts_run() {
        let fetcher = FakeFetcher::default()
            .serve("recA", CLEAN)
            .serve("recB", CLEAN)
            .serve("recC", CLEAN)
            .serve("recD", CLEAN);
        let h = harness(
            FakeStore::with(&["recA", "recB", "recC", "recD"]),
            fetcher,
            FakeCompiler {
                fail: true,
                ..FakeCompiler::default()
            },
            None,
        );

        let err = h.orchestrator.run().unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(
            err,
            PipelineError::Compile { ref record_ids, .. } if record_ids.len() == 3
        ));
        assert_eq!(h.fetcher.fetched(), 3);
        assert!(h.uploader.uploads.lock().unwrap().is_empty());
        assert!(h.store.marks().is_empty());
        assert!(leftover_files(&h.downloads).is_empty());
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let h = harness(
            FakeStore {
                fail_listing: true,
                ..FakeStore::default()
            },
            FakeFetcher::default(),
            FakeCompiler::default(),
            None,
        );

        let err = h.orchestrator.run().unwrap_err();
        assert!(matches!(err, PipelineError::Candidates(_)));
    }

    #[test]
    fn test_max_batches_stops_early() {
        let ids = ["r1", "r2", "r3", "r4", "r5", "r6"];
        let fetcher = ids
            .iter()
            .fold(FakeFetcher::default(), |f, id| f.serve(id, CLEAN));
        let h = harness(FakeStore::with(&ids), fetcher, FakeCompiler::default(), Some(1));

        let summary = h.orchestrator.run().unwrap();

        assert_eq!(summary.batches.len(), 1);
        assert_eq!(summary.candidates, 3);
        assert_eq!(h.fetcher.fetched(), 3);
    }

    #[test]
    fn test_partial_batch_is_discarded() {
        let fetcher = FakeFetcher::default()
            .serve("recA", CLEAN)
            .serve("recB", CLEAN);
        let h = harness(
            FakeStore::with(&["recA", "recB"]),
            fetcher,
            FakeCompiler::default(),
            None,
        );

        let summary = h.orchestrator.run().unwrap();

        assert_eq!(summary.leftover, 2);
        assert!(summary.batches.is_empty());
        assert!(h.compiler.calls().is_empty());
        assert!(leftover_files(&h.downloads).is_empty());
    }

    #[test]
    fn test_upload_failure_halts_run() {
        let ids = ["recA", "recB", "recC", "recD"];
        let fetcher = ids
            .iter()
            .fold(FakeFetcher::default(), |f, id| f.serve(id, CLEAN));
        let h = harness_with_uploader(
            FakeStore::with(&ids),
            fetcher,
            FakeUploader {
                fail: true,
                ..FakeUploader::default()
            },
            FakeCompiler::default(),
            None,
        );

        let err = h.orchestrator.run().unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(
            err,
            PipelineError::Upload { ref name, .. } if name == "minicomp_recA_recB_recC.mp4"
        ));
        assert_eq!(h.compiler.calls().len(), 1);
        assert_eq!(h.fetcher.fetched(), 3);
        assert!(h.store.marks().is_empty());
        assert!(leftover_files(&h.downloads).is_empty());
    }

    #[test]
    fn test_mark_failure_does_not_stop_run() {
        let fetcher = FakeFetcher::default()
            .serve("recX", DIRTY)
            .serve("recA", CLEAN)
            .serve("recB", CLEAN)
            .serve("recC", CLEAN);
        let h = harness(
            FakeStore {
                fail_marks: true,
                ..FakeStore::with(&["recX", "recA", "recB", "recC"])
            },
            fetcher,
            FakeCompiler::default(),
            None,
        );

        let summary = h.orchestrator.run().unwrap();

        assert_eq!(summary.candidates, 4);
        assert_eq!(summary.violations, 1);
        assert_eq!(summary.failures, 0);
        assert_eq!(summary.batches.len(), 1);
        assert_eq!(h.uploader.uploads.lock().unwrap().len(), 1);
        assert!(h.store.marks().is_empty());
        assert!(leftover_files(&h.downloads).is_empty());
    }

    #[test]
    fn test_similar_record_ids_keep_separate_downloads() {
        let clean = ["rec_A", "rec/A", "rec.A"];
        let fetcher = clean
            .iter()
            .fold(FakeFetcher::default(), |f, id| f.serve(id, CLEAN));
        let h = harness(FakeStore::with(&clean), fetcher, FakeCompiler::default(), None);

        let summary = h.orchestrator.run().unwrap();

        let calls = h.compiler.calls();
        assert_eq!(calls.len(), 1);
        let mut inputs = calls[0].clone();
        inputs.sort();
        inputs.dedup();
        assert_eq!(inputs.len(), 3);
        assert_eq!(summary.batches[0].record_ids, clean.to_vec());
        assert_eq!(h.store.marks().len(), 3);
    }
}
